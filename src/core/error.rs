//! Errors raised by user and message operations.

use crate::models::policy::PolicyViolation;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no such user: {0}")]
    UnknownUser(String),

    #[error("invalid password for user {0}")]
    InvalidPassword(String),

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("invalid username '{name}': {reason}")]
    InvalidUsername { name: String, reason: String },

    #[error("password rejected by policy: {0}")]
    Policy(#[from] PolicyViolation),

    #[error("recipient id {0} not found")]
    UnknownRecipient(u64),

    #[error("message id {0} not found")]
    MessageNotFound(u64),

    #[error("message {0} was neither sent nor received by you")]
    NotParticipant(u64),

    #[error("message text cannot be empty")]
    EmptyMessage,

    #[error("message exceeds maximum size ({size} bytes, max {max} bytes)")]
    MessageTooLarge { size: usize, max: usize },
}
