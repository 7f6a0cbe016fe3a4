//! On-disk layout of users.toml.

use crate::models::message::Message;
use crate::models::policy::PasswordPolicy;
use crate::models::user::UserRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Newest users.toml layout this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreFormatError {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("format version {found} is newer than supported version {}", FORMAT_VERSION)]
    UnsupportedVersion { found: u32 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFile {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub policy: PasswordPolicy,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl StoreFile {
    /// Parse users.toml and bring id counters ahead of every stored id.
    pub fn from_toml(content: &str) -> Result<Self, StoreFormatError> {
        let mut file: StoreFile = toml::from_str(content)?;
        match file.store.version {
            0 => file.store.version = FORMAT_VERSION,
            v if v > FORMAT_VERSION => {
                return Err(StoreFormatError::UnsupportedVersion { found: v })
            }
            _ => {}
        }
        file.repair_counters();
        Ok(file)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    // hand-edited files may carry ids at or past the counters
    fn repair_counters(&mut self) {
        let max_user = self.users.iter().map(|u| u.id).max().unwrap_or(0);
        let max_message = self.messages.iter().map(|m| m.id).max().unwrap_or(0);
        let section = &mut self.store;
        section.next_user_id = section.next_user_id.max(max_user + 1);
        section.next_message_id = section.next_message_id.max(max_message + 1);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "first_id")]
    pub next_user_id: u64,
    #[serde(default = "first_id")]
    pub next_message_id: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            version: default_version(),
            next_user_id: first_id(),
            next_message_id: first_id(),
        }
    }
}

impl StoreSection {
    pub fn allocate_user_id(&mut self) -> u64 {
        let id = self.next_user_id;
        self.next_user_id += 1;
        id
    }

    pub fn allocate_message_id(&mut self) -> u64 {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id
    }
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

fn first_id() -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default_store() {
        let file = StoreFile::from_toml("").unwrap();
        assert_eq!(file.store.version, FORMAT_VERSION);
        assert_eq!(file.store.next_user_id, 1);
        assert_eq!(file.policy.min_length, 8);
        assert!(file.users.is_empty());
    }

    #[test]
    fn test_version_zero_is_upgraded() {
        let file = StoreFile::from_toml("[store]\nversion = 0\n").unwrap();
        assert_eq!(file.store.version, FORMAT_VERSION);
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = StoreFile::from_toml("[store]\nversion = 2\n").unwrap_err();
        assert!(matches!(err, StoreFormatError::UnsupportedVersion { found: 2 }));
        assert!(err.to_string().contains("newer than supported version 1"));
    }

    #[test]
    fn test_counters_repaired_past_stored_ids() {
        let content = format!(
            "[store]\nnext_message_id = 2\n\n[[users]]\nid = 7\nusername = \"bob\"\n\
             hashed_password = \"{}\"\n\n[[messages]]\nid = 5\ntext = \"hi\"\n\
             from_id = 7\nto_id = 7\ncreated_at = \"2024-01-01T00:00:00Z\"\n",
            "A".repeat(80)
        );
        let mut file = StoreFile::from_toml(&content).unwrap();
        assert_eq!(file.store.allocate_user_id(), 8);
        assert_eq!(file.store.allocate_message_id(), 6);
        assert!(file.users[0].created_at.is_none());
        assert!(file.messages[0].is_visible);
    }

    #[test]
    fn test_policy_section_survives_serialization() {
        let mut file = StoreFile::default();
        file.policy.min_length = 12;
        let parsed = StoreFile::from_toml(&file.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.policy.min_length, 12);
        assert_eq!(parsed.policy.alphabet, file.policy.alphabet);
    }
}
