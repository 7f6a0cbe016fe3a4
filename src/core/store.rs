//! Loading, saving, and locked transactions over users.toml.
//!
//! A [`StoreTransaction`] holds an exclusive `flock(2)` on `users.lock` from
//! the moment it is opened until it is dropped. Changes reach disk only
//! through [`StoreTransaction::commit`], which writes a temp file and renames
//! it over users.toml.

use crate::constants;
use crate::core::paths::StorePaths;
use crate::models::store_file::StoreFile;
use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Read users.toml. A store that has never been committed reads as empty.
pub fn load(path: &Path) -> Result<StoreFile> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoreFile::default()),
        Err(e) => return Err(e).with_context(|| format!("read user store {}", path.display())),
    };
    StoreFile::from_toml(&content).with_context(|| format!("parse user store {}", path.display()))
}

pub fn save(path: &Path, store: &StoreFile) -> Result<()> {
    let content = store.to_toml().context("serialize user store")?;
    replace_private(path, content.as_bytes())
}

/// Atomically replace `path` with `bytes`, readable by the owner only.
///
/// The temp file lives next to `path` so the final rename stays on one
/// filesystem; on error it is removed when dropped.
fn replace_private(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".users.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;

    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(constants::STORE_FILE_MODE);
        tmp.as_file()
            .set_permissions(perm)
            .context("restrict temp user store")?;
    }

    tmp.write_all(bytes).context("write user store")?;
    tmp.as_file().sync_all().context("sync user store")?;
    tmp.persist(path)
        .map_err(|err| anyhow::anyhow!("replace {}: {}", path.display(), err.error))?;
    Ok(())
}

/// Create the store root with restrictive permissions if it is missing.
pub fn ensure_root(paths: &StorePaths) -> Result<()> {
    if !paths.root.exists() {
        fs::create_dir_all(&paths.root)
            .with_context(|| format!("create directory {}", paths.root.display()))?;
    }
    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(constants::STORE_DIR_MODE);
        fs::set_permissions(&paths.root, perm).with_context(|| {
            format!(
                "set permissions {:o} on {}",
                constants::STORE_DIR_MODE,
                paths.root.display()
            )
        })?;
    }
    Ok(())
}

fn open_lock(paths: &StorePaths) -> Result<File> {
    if !paths.root.is_dir() {
        bail!(
            "store root {} does not exist (run `user-vault init`)",
            paths.root.display()
        );
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&paths.store_lock)
        .with_context(|| format!("open lock file {}", paths.store_lock.display()))
}

/// Exclusive, scoped access to the user store.
pub struct StoreTransaction {
    file: StoreFile,
    path: std::path::PathBuf,
    // flock is released when the descriptor closes on drop
    _lock: File,
}

impl StoreTransaction {
    pub fn begin(paths: &StorePaths) -> Result<Self> {
        let lock = open_lock(paths)?;
        lock.lock_exclusive()
            .with_context(|| format!("acquire lock {}", paths.store_lock.display()))?;
        let file = load(&paths.store_toml)?;
        Ok(Self {
            file,
            path: paths.store_toml.clone(),
            _lock: lock,
        })
    }

    pub fn store(&self) -> &StoreFile {
        &self.file
    }

    pub fn store_mut(&mut self) -> &mut StoreFile {
        &mut self.file
    }

    /// Persist changes and release the lock.
    pub fn commit(self) -> Result<()> {
        save(&self.path, &self.file)
    }
}

/// Run `f` inside a transaction, committing only if it succeeds.
pub fn with_transaction<T>(
    paths: &StorePaths,
    f: impl FnOnce(&mut StoreFile) -> Result<T>,
) -> Result<T> {
    let mut tx = StoreTransaction::begin(paths)?;
    let out = f(tx.store_mut())?;
    tx.commit()?;
    Ok(out)
}

/// Run `f` against a consistent snapshot under a shared lock.
pub fn with_snapshot<T>(paths: &StorePaths, f: impl FnOnce(&StoreFile) -> Result<T>) -> Result<T> {
    let lock = open_lock(paths)?;
    lock.lock_shared()
        .with_context(|| format!("acquire shared lock {}", paths.store_lock.display()))?;
    let file = load(&paths.store_toml)?;
    f(&file)
}
