//! Where the store lives and the files inside it.

use crate::constants;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const ROOT_ENV: &str = "USER_VAULT_ROOT";

#[derive(Debug, Clone)]
pub struct StorePaths {
    pub root: PathBuf,
    pub store_toml: PathBuf,
    pub store_lock: PathBuf,
    pub audit_log: PathBuf,
    pub audit_lock: PathBuf,
}

impl StorePaths {
    /// Resolve against the process environment and working directory.
    pub fn resolve(root_arg: Option<PathBuf>) -> Self {
        let cwd = env::current_dir().ok();
        Self::from_root(resolve_root(
            root_arg,
            env::var_os(ROOT_ENV),
            cwd.as_deref(),
        ))
    }

    pub fn from_root(root: PathBuf) -> Self {
        Self {
            store_toml: root.join(constants::STORE_FILE_NAME),
            store_lock: root.join("users.lock"),
            audit_log: root.join("audit.log"),
            audit_lock: root.join("audit.lock"),
            root,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.store_toml.is_file()
    }
}

/// Pick the store root: `--root`, then `$USER_VAULT_ROOT` (ignored when
/// empty), then the nearest ancestor of `cwd` holding users.toml, then
/// [`constants::DEFAULT_STORE_ROOT`].
pub fn resolve_root(
    root_arg: Option<PathBuf>,
    env_root: Option<OsString>,
    cwd: Option<&Path>,
) -> PathBuf {
    root_arg
        .or_else(|| env_root.filter(|v| !v.is_empty()).map(PathBuf::from))
        .or_else(|| cwd.and_then(enclosing_store))
        .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_STORE_ROOT))
}

fn enclosing_store(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .find(|p| p.join(constants::STORE_FILE_NAME).is_file())
        .map(Path::to_path_buf)
}

impl std::fmt::Display for StorePaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store@{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_root() {
        let paths = StorePaths::from_root(PathBuf::from("/test"));
        assert_eq!(paths.root, PathBuf::from("/test"));
        assert_eq!(paths.store_toml, PathBuf::from("/test/users.toml"));
        assert_eq!(paths.store_lock, PathBuf::from("/test/users.lock"));
        assert_eq!(paths.audit_log, PathBuf::from("/test/audit.log"));
        assert_eq!(paths.audit_lock, PathBuf::from("/test/audit.lock"));
    }

    #[test]
    fn test_explicit_root_wins() {
        let root = resolve_root(
            Some(PathBuf::from("/explicit")),
            Some(OsString::from("/from-env")),
            None,
        );
        assert_eq!(root, PathBuf::from("/explicit"));
    }

    #[test]
    fn test_env_root_used_unless_empty() {
        let root = resolve_root(None, Some(OsString::from("/from-env")), None);
        assert_eq!(root, PathBuf::from("/from-env"));

        let root = resolve_root(None, Some(OsString::new()), None);
        assert_eq!(root, PathBuf::from(constants::DEFAULT_STORE_ROOT));
    }

    #[test]
    fn test_enclosing_store_found_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(constants::STORE_FILE_NAME), "").unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let root = resolve_root(None, None, Some(&nested));
        assert_eq!(root, dir.path());
        assert!(StorePaths::from_root(root).is_initialized());
    }

    #[test]
    fn test_default_root_when_nothing_found() {
        let dir = TempDir::new().unwrap();
        let root = resolve_root(None, None, Some(dir.path()));
        assert_eq!(root, PathBuf::from(constants::DEFAULT_STORE_ROOT));
        assert!(!StorePaths::from_root(dir.path().to_path_buf()).is_initialized());
    }

    #[test]
    fn test_display() {
        let paths = StorePaths::from_root(PathBuf::from("/srv/users"));
        assert_eq!(paths.to_string(), "store@/srv/users");
    }
}
