//! Cloud-storage-style contract served from a local directory.
//!
//! `Store` is the flat, key-addressed surface remote object stores expose:
//! keys are slash-separated paths relative to the store root, and listings
//! return root-relative paths. `LocalStore` serves that contract from a local
//! directory through a `DiskOps` collaborator, so tests can substitute the
//! disk. Operations a flat local mapping cannot honor (visibility and bulk
//! directory deletion) fail with `FsError::Unsupported` instead of silently
//! doing nothing.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::disk::{DiskOps, LocalDisk};
use crate::error::{FsError, FsResult};

// ============================================================================
// Store Contract
// ============================================================================

/// Key-addressed file storage.
pub trait Store {
    /// Whether `key` exists.
    fn exists(&self, key: &str) -> bool;

    /// Read the contents of `key`. Missing keys are `FsError::PathNotFound`.
    fn get(&self, key: &str) -> FsResult<Vec<u8>>;

    /// Write `contents` to `key`, creating or truncating it. Returns the
    /// number of bytes written.
    fn put(&self, key: &str, contents: &[u8]) -> FsResult<u64>;

    /// Insert `data` before the current contents of `key`. A missing key is
    /// treated as empty.
    fn prepend(&self, key: &str, data: &[u8]) -> FsResult<u64>;

    /// Add `data` after the current contents of `key`. A missing key is
    /// treated as empty.
    fn append(&self, key: &str, data: &[u8]) -> FsResult<u64>;

    /// Remove `key`. Deleting a missing key is a no-op.
    fn delete(&self, key: &str) -> FsResult<()>;

    /// Copy `from` to `to`, returning the number of bytes copied.
    fn copy(&self, from: &str, to: &str) -> FsResult<u64>;

    /// Move `from` to `to`.
    fn rename(&self, from: &str, to: &str) -> FsResult<()>;

    /// Size of `key` in bytes.
    fn size(&self, key: &str) -> FsResult<u64>;

    /// Last modification time of `key`.
    fn last_modified(&self, key: &str) -> FsResult<SystemTime>;

    /// Files directly under `dir`, as root-relative paths.
    fn files(&self, dir: &str) -> FsResult<Vec<PathBuf>>;

    /// Files anywhere under `dir`, as root-relative paths.
    fn all_files(&self, dir: &str) -> FsResult<Vec<PathBuf>>;

    /// Directories directly under `dir`, as root-relative paths.
    fn directories(&self, dir: &str) -> FsResult<Vec<PathBuf>>;

    /// Directories anywhere under `dir`, as root-relative paths.
    fn all_directories(&self, dir: &str) -> FsResult<Vec<PathBuf>>;

    /// Create `dir` and any missing parents.
    fn make_directory(&self, dir: &str) -> FsResult<()>;

    /// Visibility of `key`. Always `FsError::Unsupported` on local stores.
    fn visibility(&self, key: &str) -> FsResult<String>;

    /// Set the visibility of `key`. Always `FsError::Unsupported` on local
    /// stores.
    fn set_visibility(&self, key: &str, visibility: &str) -> FsResult<()>;

    /// Remove `dir` and everything under it. Always `FsError::Unsupported`
    /// on local stores.
    fn delete_directory(&self, dir: &str) -> FsResult<()>;
}

// ============================================================================
// Local Store
// ============================================================================

/// `Store` backed by a directory on the local filesystem.
#[derive(Debug)]
pub struct LocalStore<D: DiskOps = LocalDisk> {
    root: PathBuf,
    disk: D,
}

impl LocalStore<LocalDisk> {
    /// Store rooted at `root`, using the local disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_disk(root, LocalDisk)
    }
}

impl<D: DiskOps> LocalStore<D> {
    /// Store rooted at `root`, using `disk` for all filesystem access.
    pub fn with_disk(root: impl Into<PathBuf>, disk: D) -> Self {
        LocalStore {
            root: root.into(),
            disk,
        }
    }

    /// The store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key.trim_start_matches('/'))
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }

    fn list(&self, dir: &str, want_dirs: bool, recursive: bool) -> FsResult<Vec<PathBuf>> {
        let root = self.resolve(dir);
        if !self.disk.exists(&root) {
            return Err(FsError::not_found(root));
        }
        let mut out = Vec::new();
        self.collect(&root, want_dirs, recursive, &mut out)?;
        out.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        Ok(out)
    }

    fn collect(
        &self,
        dir: &Path,
        want_dirs: bool,
        recursive: bool,
        out: &mut Vec<PathBuf>,
    ) -> FsResult<()> {
        for entry in self.disk.list_directory(dir)? {
            if self.disk.is_dir(&entry) {
                if want_dirs {
                    out.push(self.relative(&entry));
                }
                if recursive {
                    self.collect(&entry, want_dirs, recursive, out)?;
                }
            } else if !want_dirs {
                out.push(self.relative(&entry));
            }
        }
        Ok(())
    }
}

impl<D: DiskOps> Store for LocalStore<D> {
    fn exists(&self, key: &str) -> bool {
        self.disk.exists(&self.resolve(key))
    }

    fn get(&self, key: &str) -> FsResult<Vec<u8>> {
        let path = self.resolve(key);
        if !self.disk.exists(&path) {
            return Err(FsError::not_found(path));
        }
        self.disk.read_file(&path)
    }

    fn put(&self, key: &str, contents: &[u8]) -> FsResult<u64> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            if !self.disk.exists(parent) {
                self.disk.make_directory(parent, 0o755, true)?;
            }
        }
        self.disk.write_file(&path, contents)
    }

    fn prepend(&self, key: &str, data: &[u8]) -> FsResult<u64> {
        let existing = if self.exists(key) {
            self.get(key)?
        } else {
            Vec::new()
        };
        let mut combined = data.to_vec();
        combined.extend_from_slice(&existing);
        self.put(key, &combined)
    }

    fn append(&self, key: &str, data: &[u8]) -> FsResult<u64> {
        let mut combined = if self.exists(key) {
            self.get(key)?
        } else {
            Vec::new()
        };
        combined.extend_from_slice(data);
        self.put(key, &combined)
    }

    fn delete(&self, key: &str) -> FsResult<()> {
        let path = self.resolve(key);
        if !self.disk.exists(&path) {
            return Ok(());
        }
        self.disk.delete_file(&path)
    }

    fn copy(&self, from: &str, to: &str) -> FsResult<u64> {
        self.disk.copy_file(&self.resolve(from), &self.resolve(to))
    }

    fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        self.disk.move_file(&self.resolve(from), &self.resolve(to))
    }

    fn size(&self, key: &str) -> FsResult<u64> {
        self.disk.file_size(&self.resolve(key))
    }

    fn last_modified(&self, key: &str) -> FsResult<SystemTime> {
        self.disk.last_modified(&self.resolve(key))
    }

    fn files(&self, dir: &str) -> FsResult<Vec<PathBuf>> {
        self.list(dir, false, false)
    }

    fn all_files(&self, dir: &str) -> FsResult<Vec<PathBuf>> {
        self.list(dir, false, true)
    }

    fn directories(&self, dir: &str) -> FsResult<Vec<PathBuf>> {
        self.list(dir, true, false)
    }

    fn all_directories(&self, dir: &str) -> FsResult<Vec<PathBuf>> {
        self.list(dir, true, true)
    }

    fn make_directory(&self, dir: &str) -> FsResult<()> {
        self.disk.make_directory(&self.resolve(dir), 0o755, true)
    }

    fn visibility(&self, _key: &str) -> FsResult<String> {
        Err(FsError::unsupported("visibility"))
    }

    fn set_visibility(&self, _key: &str, _visibility: &str) -> FsResult<()> {
        Err(FsError::unsupported("set_visibility"))
    }

    fn delete_directory(&self, _dir: &str) -> FsResult<()> {
        Err(FsError::unsupported("delete_directory"))
    }
}

// ============================================================================
// Tests
// ============================================================================
