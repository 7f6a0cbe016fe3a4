use crate::models::credential::CredentialRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub hashed_password: CredentialRecord,
    pub created_at: Option<DateTime<Utc>>,
    pub password_changed_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Build a new user. The caller is responsible for running the password
    /// policy first.
    pub fn new(
        id: u64,
        username: impl Into<String>,
        email: Option<String>,
        password: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            email,
            hashed_password: CredentialRecord::derive(password),
            created_at: Some(now),
            password_changed_at: None,
        }
    }

    /// Replace the stored credential with one derived from `password`.
    pub fn set_password(&mut self, password: &str, now: DateTime<Utc>) {
        self.hashed_password = CredentialRecord::derive(password);
        self.password_changed_at = Some(now);
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        self.hashed_password.verify(candidate)
    }
}
