//! Mock system implementation for testing

use super::System;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// In-memory implementation of System trait for testing
///
/// `MockSystem` provides an in-memory filesystem, perfect for fast,
/// isolated unit tests without side effects. Clones share state, so a clone
/// handed to a fetch can be inspected by the test afterwards.
///
/// # Example
/// ```
/// use subpull::system::{mock::MockSystem, System};
/// use std::path::Path;
///
/// let system = MockSystem::new()
///     .with_file("/test/file.txt", b"Hello, world!").unwrap()
///     .with_dir("/test/subdir").unwrap();
///
/// assert!(system.exists(Path::new("/test/file.txt")));
/// assert!(system.is_dir(Path::new("/test/subdir")));
/// ```
#[derive(Clone)]
pub struct MockSystem {
    state: Arc<RwLock<MockSystemState>>,
}

struct MockSystemState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    read_only: BTreeSet<PathBuf>,
}

impl MockSystem {
    /// Create a new `MockSystem` with default state
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockSystemState {
                files: BTreeMap::new(),
                dirs: BTreeSet::from([PathBuf::from("/")]),
                read_only: BTreeSet::new(),
            })),
        }
    }

    /// Add a file with contents (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned
    #[inline]
    pub fn with_file<P: AsRef<Path>>(self, path: P, contents: &[u8]) -> io::Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;

        // Ensure parent directories exist
        if let Some(parent) = path_buf.parent() {
            Self::ensure_parent_dirs(&mut state.dirs, parent);
        }

        state.files.insert(path_buf, contents.to_vec());
        drop(state);
        Ok(self)
    }

    /// Add a directory (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned
    #[inline]
    pub fn with_dir<P: AsRef<Path>>(self, path: P) -> io::Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;
        Self::ensure_parent_dirs(&mut state.dirs, &path_buf);
        drop(state);
        Ok(self)
    }

    /// Refuse writes and directory creation at or below `path` (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned
    #[inline]
    pub fn with_read_only<P: AsRef<Path>>(self, path: P) -> io::Result<Self> {
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;
        state.read_only.insert(path.as_ref().to_path_buf());
        drop(state);
        Ok(self)
    }

    /// All file paths currently stored, in sorted order
    #[must_use]
    #[inline]
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.state
            .read()
            .map(|state| state.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[inline]
    fn ensure_parent_dirs(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
    }

    fn check_writable(state: &MockSystemState, path: &Path) -> io::Result<()> {
        if state.read_only.iter().any(|ro| path.starts_with(ro)) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("Permission denied: {}", path.display()),
            ));
        }
        Ok(())
    }
}

impl Default for MockSystem {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl System for MockSystem {
    #[inline]
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {e}")))
    }

    #[inline]
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let state = self
            .state
            .read()
            .map_err(|e| io::Error::other(e.to_string()))?;
        let bytes = state.files.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )
        })?;
        let result = bytes.clone();
        drop(state);
        Ok(result)
    }

    #[inline]
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;

        Self::check_writable(&state, path)?;

        // Parent directories must already exist, like on a real filesystem
        if let Some(parent) = path.parent()
            && !state.dirs.contains(parent)
        {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Parent directory does not exist: {}", parent.display()),
            ));
        }

        if state.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("Is a directory: {}", path.display()),
            ));
        }

        state.files.insert(path.to_path_buf(), contents.to_vec());
        drop(state);
        Ok(())
    }

    #[inline]
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;

        if state.dirs.contains(path) {
            return Ok(());
        }
        Self::check_writable(&state, path)?;

        if let Some(file) = path.ancestors().find(|a| state.files.contains_key(*a)) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Not a directory: {}", file.display()),
            ));
        }

        Self::ensure_parent_dirs(&mut state.dirs, path);
        drop(state);
        Ok(())
    }

    #[inline]
    fn exists(&self, path: &Path) -> bool {
        self.state
            .read()
            .is_ok_and(|state| state.files.contains_key(path) || state.dirs.contains(path))
    }

    #[inline]
    fn is_dir(&self, path: &Path) -> bool {
        self.state
            .read()
            .is_ok_and(|state| state.dirs.contains(path))
    }
}
