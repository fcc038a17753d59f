//! File-backed implementation of the `KeyValueStore` trait.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use storyloom_core::error::DomainError;
use storyloom_core::store::KeyValueStore;
use tracing::debug;

/// Environment variable overriding the storage directory.
pub const STORAGE_DIR_ENV: &str = "STORYLOOM_STORAGE_DIR";

/// Stores each key as `<root>/<sanitized key>.json`.
///
/// Writes go to a temporary sibling that is flushed to disk and then renamed
/// into place, so a crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Creates a store rooted at `root`. The directory is created on first
    /// write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a store rooted at `STORYLOOM_STORAGE_DIR`, or at the platform
    /// data directory when unset:
    /// - Linux: `~/.local/share/storyloom`
    /// - macOS: `~/Library/Application Support/io.storyloom.storyloom`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\storyloom\storyloom\data`
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the variable is unset and no
    /// home directory can be determined.
    pub fn from_env() -> Result<Self, DomainError> {
        match std::env::var(STORAGE_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => Ok(Self::new(dir)),
            _ => Self::default_dir().map(Self::new),
        }
    }

    /// Returns the platform data directory for Storyloom.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if no home directory is known.
    pub fn default_dir() -> Result<PathBuf, DomainError> {
        ProjectDirs::from("io", "storyloom", "storyloom")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| {
                DomainError::Configuration(format!(
                    "no home directory found; set {STORAGE_DIR_ENV}"
                ))
            })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Maps a key onto a safe file stem: anything outside `[A-Za-z0-9._-]`
/// becomes `_`.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> DomainError {
    DomainError::Infrastructure(format!("failed to {action} {}: {err}", path.display()))
}

fn write_synced(path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

/// Makes a completed rename durable. Directories cannot be opened for
/// syncing on Windows, where the rename is left to the filesystem.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error("read", &path, &err)),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), DomainError> {
        fs::create_dir_all(&self.root).map_err(|e| io_error("create", &self.root, &e))?;

        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        write_synced(&staging, value).map_err(|e| io_error("write", &staging, &e))?;
        fs::rename(&staging, &path).map_err(|e| io_error("replace", &path, &e))?;
        sync_dir(&self.root).map_err(|e| io_error("sync", &self.root, &e))?;

        debug!(key, path = %path.display(), bytes = value.len(), "stored document");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DomainError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error("remove", &path, &err)),
        }
    }
}
