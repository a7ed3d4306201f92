//! Disk operations collaborator.
//!
//! `DiskOps` is the explicit capability surface the rest of the crate needs
//! from a filesystem backend. It replaces a dynamic forwarding facade with a
//! trait that can be statically verified and swapped in tests; `LocalDisk`
//! is the `std::fs` implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{FsError, FsResult};

// ============================================================================
// DiskOps Trait
// ============================================================================

/// Filesystem operations required by the temp-run manager and the store
/// adapter.
///
/// Every method that touches disk returns `FsResult`; `exists`, `is_dir`,
/// and `is_file` are infallible queries, mirroring their `Path` namesakes.
pub trait DiskOps {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether a path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether a path exists and is a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Create an empty file, truncating any existing one.
    fn create_file(&self, path: &Path) -> FsResult<()>;

    /// Read the full contents of a file.
    fn read_file(&self, path: &Path) -> FsResult<Vec<u8>>;

    /// Write `bytes` to a file, creating it if absent. Returns bytes written.
    fn write_file(&self, path: &Path, bytes: &[u8]) -> FsResult<u64>;

    /// Delete a single file.
    fn delete_file(&self, path: &Path) -> FsResult<()>;

    /// Delete a directory, optionally with its entire contents.
    fn delete_directory(&self, path: &Path, recursive: bool) -> FsResult<()>;

    /// Copy a file. Returns the number of bytes copied.
    fn copy_file(&self, from: &Path, to: &Path) -> FsResult<u64>;

    /// Move (rename) a file.
    fn move_file(&self, from: &Path, to: &Path) -> FsResult<()>;

    /// Create a directory with the given Unix mode bits.
    fn make_directory(&self, path: &Path, mode: u32, recursive: bool) -> FsResult<()>;

    /// Set Unix permission bits on a path. No-op on non-Unix platforms.
    fn change_permissions(&self, path: &Path, mode: u32) -> FsResult<()>;

    /// List the immediate entries of a directory (unsorted).
    fn list_directory(&self, path: &Path) -> FsResult<Vec<PathBuf>>;

    /// Size of a file in bytes.
    fn file_size(&self, path: &Path) -> FsResult<u64>;

    /// Last modification time of a path.
    fn last_modified(&self, path: &Path) -> FsResult<SystemTime>;
}

// ============================================================================
// LocalDisk
// ============================================================================

/// `DiskOps` over the real local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDisk;

impl LocalDisk {
    pub fn new() -> Self {
        LocalDisk
    }
}

impl DiskOps for LocalDisk {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_file(&self, path: &Path) -> FsResult<()> {
        fs::File::create(path)
            .map(|_| ())
            .map_err(|e| FsError::io(path, e))
    }

    fn read_file(&self, path: &Path) -> FsResult<Vec<u8>> {
        fs::read(path).map_err(|e| FsError::io(path, e))
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> FsResult<u64> {
        fs::write(path, bytes).map_err(|e| FsError::io(path, e))?;
        Ok(bytes.len() as u64)
    }

    fn delete_file(&self, path: &Path) -> FsResult<()> {
        fs::remove_file(path).map_err(|e| FsError::io(path, e))
    }

    fn delete_directory(&self, path: &Path, recursive: bool) -> FsResult<()> {
        let result = if recursive {
            fs::remove_dir_all(path)
        } else {
            fs::remove_dir(path)
        };
        result.map_err(|e| FsError::io(path, e))
    }

    fn copy_file(&self, from: &Path, to: &Path) -> FsResult<u64> {
        fs::copy(from, to).map_err(|e| FsError::io(from, e))
    }

    fn move_file(&self, from: &Path, to: &Path) -> FsResult<()> {
        fs::rename(from, to).map_err(|e| FsError::io(from, e))
    }

    fn make_directory(&self, path: &Path, mode: u32, recursive: bool) -> FsResult<()> {
        let result = if recursive {
            fs::create_dir_all(path)
        } else {
            fs::create_dir(path)
        };
        result.map_err(|e| FsError::io(path, e))?;
        self.change_permissions(path, mode)
    }

    #[cfg(unix)]
    fn change_permissions(&self, path: &Path, mode: u32) -> FsResult<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| FsError::io(path, e))
    }

    #[cfg(not(unix))]
    fn change_permissions(&self, _path: &Path, _mode: u32) -> FsResult<()> {
        Ok(())
    }

    fn list_directory(&self, path: &Path) -> FsResult<Vec<PathBuf>> {
        let entries = fs::read_dir(path).map_err(|e| FsError::io(path, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FsError::io(path, e))?;
            paths.push(entry.path());
        }
        Ok(paths)
    }

    fn file_size(&self, path: &Path) -> FsResult<u64> {
        let metadata = fs::metadata(path).map_err(|e| FsError::io(path, e))?;
        Ok(metadata.len())
    }

    fn last_modified(&self, path: &Path) -> FsResult<SystemTime> {
        let metadata = fs::metadata(path).map_err(|e| FsError::io(path, e))?;
        metadata.modified().map_err(|e| FsError::io(path, e))
    }
}

// ============================================================================
// Tests
// ============================================================================
