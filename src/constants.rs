//! Centralized constants for the credential format, paths, and limits.

/// Number of characters in a salt.
pub const SALT_LEN: usize = 16;

/// Number of hex characters in a SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Total length of a credential record (salt followed by digest).
pub const RECORD_LEN: usize = SALT_LEN + DIGEST_HEX_LEN;

/// Character used to right-pad salts shorter than `SALT_LEN`.
pub const SALT_PAD: char = 'a';

/// Default minimum password length enforced by the policy gate.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;

/// Default store root directory.
pub const DEFAULT_STORE_ROOT: &str = "/var/lib/user-vault";

/// Store file name inside the root.
pub const STORE_FILE_NAME: &str = "users.toml";

/// Permission mode for the store root directory.
pub const STORE_DIR_MODE: u32 = 0o700;

/// Permission mode for users.toml.
pub const STORE_FILE_MODE: u32 = 0o600;

/// Permission mode for the audit log.
pub const AUDIT_LOG_MODE: u32 = 0o640;

/// Maximum password size in bytes accepted from stdin or a prompt.
pub const MAX_PASSWORD_SIZE: usize = 4096;

/// Maximum message body size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 65_536;
