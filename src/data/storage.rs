use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors raised while persisting text.
#[derive(Debug)]
pub enum StorageError {
    Write { path: PathBuf, reason: String },
    CreateDir { path: PathBuf, reason: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StorageError::Write { path, reason } => {
                write!(f, "Failed to write {}: {}", path.display(), reason)
            }
            StorageError::CreateDir { path, reason } => {
                write!(f, "Failed to create directory {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// Text storage used by the publishing pipeline.
///
/// The pipeline only needs whole-file reads and writes plus a directory
/// listing, so a local directory, an object store or an in-memory map all fit.
pub trait Storage {
    /// Reads the text stored at `path`.
    ///
    /// # Returns
    /// * `Some(String)` - The stored text
    /// * `None` - If nothing is stored there or it cannot be read
    fn read_text(&self, path: &Path) -> Option<String>;

    /// Stores `contents` at `path`, replacing anything already there.
    fn write_text(&self, path: &Path, contents: &str) -> Result<(), StorageError>;

    /// Names of the entries directly inside `dir`. Empty when `dir` does not exist.
    fn list_names(&self, dir: &Path) -> BTreeSet<String>;

    /// Makes sure `path` exists as a directory.
    fn ensure_dir(&self, path: &Path) -> Result<(), StorageError>;

    fn exists(&self, path: &Path) -> bool {
        self.read_text(path).is_some()
    }
}

impl<S: Storage + ?Sized> Storage for &S {
    fn read_text(&self, path: &Path) -> Option<String> {
        (**self).read_text(path)
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        (**self).write_text(path, contents)
    }

    fn list_names(&self, dir: &Path) -> BTreeSet<String> {
        (**self).list_names(dir)
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), StorageError> {
        (**self).ensure_dir(path)
    }
}
