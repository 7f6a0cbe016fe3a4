//! Salted SHA-256 password credentials.
//!
//! A credential record is a 16-character salt followed by the 64-character
//! lowercase hex SHA-256 digest of `salt ++ password` (both UTF-8). Deriving
//! and verifying never fail: odd salts are normalized and malformed records
//! simply do not verify.
//!
//! Digest comparison is plain string equality and is not constant-time.

use crate::constants::{SALT_LEN, SALT_PAD};
use crate::models::policy::Alphabet;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Generate a 16-character alphanumeric salt from the thread-local RNG.
pub fn generate_salt() -> String {
    generate_salt_with(&mut rand::thread_rng(), &Alphabet::alphanumeric())
}

/// Generate a salt drawing from `rng` and `alphabet`.
pub fn generate_salt_with<R: Rng>(rng: &mut R, alphabet: &Alphabet) -> String {
    alphabet.sample(rng, SALT_LEN)
}

/// Pad with `'a'` or truncate so the salt is exactly `SALT_LEN` characters.
pub fn normalize_salt(salt: &str) -> String {
    let mut normalized: String = salt.chars().take(SALT_LEN).collect();
    let missing = SALT_LEN - normalized.chars().count();
    normalized.extend(std::iter::repeat(SALT_PAD).take(missing));
    normalized
}

/// Derive a credential record for `password`.
///
/// When `salt` is `None` a fresh one is generated.
pub fn hash_password(password: &str, salt: Option<&str>) -> String {
    let salt = match salt {
        Some(s) => normalize_salt(s),
        None => generate_salt(),
    };
    let digest = digest_hex(&salt, password);
    format!("{}{}", salt, digest)
}

/// Check `candidate` against a stored credential record.
pub fn check_password(candidate: &str, record: &str) -> bool {
    let (salt, expected) = split_record(record);
    digest_hex(&normalize_salt(salt), candidate) == expected
}

/// Split a record into its salt and digest parts on a character boundary.
///
/// Records shorter than a salt yield an empty digest part.
pub fn split_record(record: &str) -> (&str, &str) {
    let at = record
        .char_indices()
        .nth(SALT_LEN)
        .map(|(i, _)| i)
        .unwrap_or(record.len());
    record.split_at(at)
}

fn digest_hex(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:064x}", hasher.finalize())
}
