use crate::data::{Storage, StorageError};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// FileStorage keeps text files under a root directory.
///
/// Relative paths handed to the [`Storage`] methods are resolved against the root.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Creates a new FileStorage
    ///
    /// # Arguments
    /// * `root` - Optional root folder. If None, defaults to the current directory
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root: root.unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl Storage for FileStorage {
    fn read_text(&self, path: &Path) -> Option<String> {
        // Missing or unreadable files are both treated as absent
        fs::read_to_string(self.resolve(path)).ok()
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::CreateDir {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        fs::write(&full, contents).map_err(|e| StorageError::Write {
            path: full,
            reason: e.to_string(),
        })
    }

    fn list_names(&self, dir: &Path) -> BTreeSet<String> {
        let Ok(entries) = fs::read_dir(self.resolve(dir)) else {
            return BTreeSet::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect()
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), StorageError> {
        let full = self.resolve(path);
        fs::create_dir_all(&full).map_err(|e| StorageError::CreateDir {
            path: full,
            reason: e.to_string(),
        })
    }
}

/// Map-backed storage, used by tests and as the write overlay of [`DryRunStorage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<PathBuf, String>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file, for building fixtures.
    pub fn with_file(self, path: impl Into<PathBuf>, contents: &str) -> Self {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), contents.to_string());
        }
        self
    }

    /// Paths of every stored file, in sorted order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Storage for MemoryStorage {
    fn read_text(&self, path: &Path) -> Option<String> {
        self.files.lock().ok()?.get(path).cloned()
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        let mut files = self.files.lock().map_err(|e| StorageError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn list_names(&self, dir: &Path) -> BTreeSet<String> {
        let Ok(files) = self.files.lock() else {
            return BTreeSet::new();
        };
        files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), StorageError> {
        let mut dirs = self.dirs.lock().map_err(|e| StorageError::CreateDir {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        dirs.insert(path.to_path_buf());
        Ok(())
    }
}

/// Reads through to an inner storage but keeps every write in memory.
///
/// Backs `--dry-run`: the pipeline runs unchanged and the captured writes
/// are reported instead of touching the site.
#[derive(Debug)]
pub struct DryRunStorage<S> {
    inner: S,
    overlay: MemoryStorage,
}

impl<S: Storage> DryRunStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            overlay: MemoryStorage::new(),
        }
    }

    /// Paths that would have been written.
    pub fn captured(&self) -> Vec<PathBuf> {
        self.overlay.paths()
    }
}

impl<S: Storage> Storage for DryRunStorage<S> {
    fn read_text(&self, path: &Path) -> Option<String> {
        self.overlay
            .read_text(path)
            .or_else(|| self.inner.read_text(path))
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        tracing::debug!(path = %path.display(), bytes = contents.len(), "dry run: write captured");
        self.overlay.write_text(path, contents)
    }

    fn list_names(&self, dir: &Path) -> BTreeSet<String> {
        let mut names = self.inner.list_names(dir);
        names.extend(self.overlay.list_names(dir));
        names
    }

    fn ensure_dir(&self, _path: &Path) -> Result<(), StorageError> {
        Ok(())
    }
}
