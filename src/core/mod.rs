//! Core logic: credential codec, store access, accounts, messages, audit.

pub mod audit_log;
pub mod codec;
pub mod error;
pub mod messages;
pub mod paths;
pub mod store;
pub mod users;
