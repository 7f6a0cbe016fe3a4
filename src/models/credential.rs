use crate::constants::RECORD_LEN;
use crate::core::codec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted salt+digest string for one password.
///
/// Stored byte-for-byte; loading never validates the shape, so a damaged
/// record just fails verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRecord(String);

impl CredentialRecord {
    /// Derive a record for `password` with a freshly generated salt.
    pub fn derive(password: &str) -> Self {
        Self(codec::hash_password(password, None))
    }

    pub fn derive_with_salt(password: &str, salt: &str) -> Self {
        Self(codec::hash_password(password, Some(salt)))
    }

    pub fn from_stored(record: impl Into<String>) -> Self {
        Self(record.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn salt(&self) -> &str {
        codec::split_record(&self.0).0
    }

    pub fn is_well_formed(&self) -> bool {
        let (salt, digest) = codec::split_record(&self.0);
        self.0.chars().count() == RECORD_LEN
            && salt.chars().all(|c| c.is_ascii_alphanumeric())
            && digest
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    pub fn verify(&self, candidate: &str) -> bool {
        codec::check_password(candidate, &self.0)
    }
}

// Only the salt is shown; the digest stays out of debug output.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialRecord({}…)", self.salt())
    }
}

impl fmt::Display for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_well_formed() {
        let record = CredentialRecord::derive("Abcdef12");
        assert!(record.is_well_formed());
        assert!(record.verify("Abcdef12"));
        assert!(!record.verify("Abcdef13"));
    }

    #[test]
    fn test_new_record_on_each_derive() {
        let a = CredentialRecord::derive("Abcdef12");
        let b = CredentialRecord::derive("Abcdef12");
        assert_ne!(a.salt(), b.salt());
    }

    #[test]
    fn test_from_stored_malformed() {
        let record = CredentialRecord::from_stored("garbage");
        assert!(!record.is_well_formed());
        assert!(!record.verify("garbage"));
    }

    #[test]
    fn test_serde_transparent() {
        #[derive(Serialize, Deserialize)]
        struct Row {
            hashed_password: CredentialRecord,
        }
        let record = CredentialRecord::derive_with_salt("alamakota1", &"A".repeat(16));
        let toml_str = toml::to_string(&Row {
            hashed_password: record.clone(),
        })
        .unwrap();
        assert!(toml_str.contains(record.as_str()));
        let row: Row = toml::from_str(&toml_str).unwrap();
        assert_eq!(row.hashed_password, record);
    }

    #[test]
    fn test_debug_hides_digest() {
        let record = CredentialRecord::derive_with_salt("alamakota1", &"A".repeat(16));
        let debug = format!("{:?}", record);
        assert!(debug.contains("AAAAAAAAAAAAAAAA"));
        assert!(!debug.contains("53f36685"));
    }
}
