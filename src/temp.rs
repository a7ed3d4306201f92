//! Per-run temporary folders with tracked files and scope-exit cleanup.
//!
//! A `TempRun` owns one uniquely named folder under the system temp
//! directory. The folder is created lazily, files created through the run are
//! tracked, and everything not explicitly preserved is removed when the run
//! is dropped. Cleanup is best effort: failures are logged, never propagated.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::disk::{DiskOps, LocalDisk};
use crate::error::FsResult;
use crate::util;

// ============================================================================
// Tracked Files
// ============================================================================

/// A file created under a run folder, with its cleanup disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// When true, cleanup leaves the file (and its folder) in place.
    pub preserve: bool,
}

// ============================================================================
// Temp Runs
// ============================================================================

/// One temporary run folder and the files tracked under it.
///
/// The folder name is the run id, optionally prepended with a caller prefix,
/// under the system temp directory. Nothing touches the disk until
/// `ensure_run_folder` or `create_tracked_file` is called.
#[derive(Debug)]
pub struct TempRun<D: DiskOps = LocalDisk> {
    id: String,
    prefix: Option<String>,
    base: PathBuf,
    files: Vec<TrackedFile>,
    preserve_run_folder: bool,
    disk: D,
    cleaned: bool,
}

impl TempRun<LocalDisk> {
    /// New run with a fresh unique id, backed by the local disk.
    pub fn new() -> Self {
        Self::with_disk(LocalDisk)
    }

    /// New run whose folder name starts with `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let mut run = Self::new();
        run.prefix = Some(prefix.into());
        run
    }
}

impl Default for TempRun<LocalDisk> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DiskOps> TempRun<D> {
    /// New run backed by `disk`.
    pub fn with_disk(disk: D) -> Self {
        TempRun {
            id: util::run_id(),
            prefix: None,
            base: std::env::temp_dir(),
            files: Vec::new(),
            preserve_run_folder: false,
            disk,
            cleaned: false,
        }
    }

    /// The run id, e.g. `run_1a2b3c4d5e6f7081`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Override the generated id, for deterministic folder names.
    pub fn set_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = id.into();
        self
    }

    /// Absolute path of the run folder. Does not create it.
    pub fn run_path(&self) -> PathBuf {
        let name = match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, self.id),
            None => self.id.clone(),
        };
        self.base.join(name)
    }

    /// Create the run folder if it does not exist yet. Idempotent.
    pub fn ensure_run_folder(&mut self) -> FsResult<PathBuf> {
        let path = self.run_path();
        if !self.disk.exists(&path) {
            self.disk.make_directory(&path, 0o755, true)?;
        }
        Ok(path)
    }

    /// Write `contents` to `name` inside the run folder and track it.
    ///
    /// The file is owner-only (mode 0600) and carries `preserve` as its
    /// cleanup disposition; `set_preserve` can flip it later.
    pub fn create_tracked_file(
        &mut self,
        name: &str,
        contents: &[u8],
        preserve: bool,
    ) -> FsResult<PathBuf> {
        let folder = self.ensure_run_folder()?;
        let path = folder.join(name);
        self.disk.write_file(&path, contents)?;
        self.disk.change_permissions(&path, 0o600)?;
        self.files.push(TrackedFile {
            path: path.clone(),
            preserve,
        });
        Ok(path)
    }

    /// Write `contents` to a randomly named tracked file in the run folder.
    pub fn create_tmp_file(&mut self, contents: &[u8], preserve: bool) -> FsResult<PathBuf> {
        let name = format!("tmp_{}", util::unique_token());
        self.create_tracked_file(&name, contents, preserve)
    }

    /// Track an existing file so cleanup knows about it.
    pub fn track_file(&mut self, path: impl Into<PathBuf>, preserve: bool) {
        self.files.push(TrackedFile {
            path: path.into(),
            preserve,
        });
    }

    /// Flip the preserve flag on a tracked file, addressed by full path or
    /// bare file name. Returns whether anything matched.
    pub fn set_preserve(&mut self, file: impl AsRef<Path>, preserve: bool) -> bool {
        let file = file.as_ref();
        let mut found = false;
        for tracked in &mut self.files {
            if tracked.path == file || tracked.path.file_name() == Some(file.as_os_str()) {
                tracked.preserve = preserve;
                found = true;
            }
        }
        found
    }

    /// Flip the preserve flag on every tracked file at once.
    pub fn set_preserve_all(&mut self, preserve: bool) {
        for tracked in &mut self.files {
            tracked.preserve = preserve;
        }
    }

    /// Keep the run folder at cleanup. Non-preserved tracked files are still
    /// removed; only the directory itself survives.
    pub fn set_preserve_run_folder(&mut self, preserve: bool) {
        self.preserve_run_folder = preserve;
    }

    /// The files tracked so far, in creation order.
    pub fn files(&self) -> &[TrackedFile] {
        &self.files
    }

    /// Remove non-preserved files and, when neither the run folder nor any
    /// file is preserved, the run folder itself. Failures are logged and
    /// swallowed; calling twice is a no-op. Drop runs this automatically.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        for tracked in &self.files {
            if tracked.preserve {
                continue;
            }
            // A tracked path may have been deleted, or replaced by something
            // that is no longer a regular file, since creation.
            if !self.disk.is_file(&tracked.path) {
                continue;
            }
            if let Err(e) = self.disk.delete_file(&tracked.path) {
                warn!(
                    path = %tracked.path.display(),
                    error = %e,
                    "failed to remove tracked temp file"
                );
            }
        }

        let folder = self.run_path();
        if !self.disk.exists(&folder) {
            return;
        }
        if self.preserve_run_folder || self.files.iter().any(|f| f.preserve) {
            debug!(path = %folder.display(), "run folder preserved");
            return;
        }
        if let Err(e) = self.disk.delete_directory(&folder, true) {
            warn!(
                path = %folder.display(),
                error = %e,
                "failed to remove run folder"
            );
        }
    }
}

impl<D: DiskOps> Drop for TempRun<D> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

// ============================================================================
// Run Factories
// ============================================================================

/// Seam for swapping how runs are produced, e.g. to inject a fake disk or a
/// fixed id in tests.
pub trait RunFactory {
    type Disk: DiskOps;

    fn create_run(&self) -> TempRun<Self::Disk>;
}

/// Produces local-disk runs, optionally with a folder name prefix.
#[derive(Debug, Default)]
pub struct DefaultRunFactory {
    prefix: Option<String>,
}

impl DefaultRunFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        DefaultRunFactory {
            prefix: Some(prefix.into()),
        }
    }
}

impl RunFactory for DefaultRunFactory {
    type Disk = LocalDisk;

    fn create_run(&self) -> TempRun<LocalDisk> {
        match &self.prefix {
            Some(prefix) => TempRun::with_prefix(prefix.clone()),
            None => TempRun::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn run_folder_is_lazy() {
            let run = TempRun::new();
            assert!(!run.run_path().exists());
        }

        #[test]
        fn ensure_run_folder_is_idempotent() {
            let mut run = TempRun::new();
            let first = run.ensure_run_folder().unwrap();
            let second = run.ensure_run_folder().unwrap();
            assert_eq!(first, second);
            assert!(first.is_dir());
        }

        #[test]
        fn prefix_prepends_folder_name() {
            let run = TempRun::with_prefix("fskit-");
            let name = run.run_path().file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("fskit-run_"));
        }

        #[test]
        fn set_id_gives_deterministic_path() {
            let mut a = TempRun::new();
            let mut b = TempRun::new();
            a.set_id("run_fixed");
            b.set_id("run_fixed");
            assert_eq!(a.run_path(), b.run_path());
        }

        #[test]
        fn ids_are_unique_across_runs() {
            let a = TempRun::new();
            let b = TempRun::new();
            assert_ne!(a.id(), b.id());
        }

        #[test]
        fn tracked_file_round_trip() {
            let mut run = TempRun::new();
            let path = run.create_tracked_file("note.txt", b"hello", false).unwrap();
            assert_eq!(std::fs::read(&path).unwrap(), b"hello");
            assert_eq!(run.files().len(), 1);
            assert!(!run.files()[0].preserve);
        }

        #[cfg(unix)]
        #[test]
        fn tracked_files_are_owner_only() {
            use std::os::unix::fs::PermissionsExt;

            let mut run = TempRun::new();
            let path = run.create_tracked_file("secret.txt", b"s", false).unwrap();
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        #[test]
        fn tmp_files_get_unique_names() {
            let mut run = TempRun::new();
            let a = run.create_tmp_file(b"1", false).unwrap();
            let b = run.create_tmp_file(b"2", false).unwrap();
            assert_ne!(a, b);
            assert!(a
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("tmp_"));
        }

        #[test]
        fn set_preserve_matches_bare_file_name() {
            let mut run = TempRun::new();
            run.create_tracked_file("a.txt", b"a", false).unwrap();
            assert!(run.set_preserve("a.txt", true));
            assert!(run.files()[0].preserve);
            assert!(!run.set_preserve("absent.txt", true));
            run.set_preserve("a.txt", false);
        }
    }

    mod cleanup_tests {
        use super::*;
        use crate::error::FsError;
        use std::io;
        use std::path::Path;
        use std::time::SystemTime;

        /// Disk that refuses every deletion, for exercising best-effort
        /// cleanup.
        struct StickyDisk(LocalDisk);

        impl DiskOps for StickyDisk {
            fn exists(&self, path: &Path) -> bool {
                self.0.exists(path)
            }
            fn is_dir(&self, path: &Path) -> bool {
                self.0.is_dir(path)
            }
            fn is_file(&self, path: &Path) -> bool {
                self.0.is_file(path)
            }
            fn create_file(&self, path: &Path) -> crate::FsResult<()> {
                self.0.create_file(path)
            }
            fn read_file(&self, path: &Path) -> crate::FsResult<Vec<u8>> {
                self.0.read_file(path)
            }
            fn write_file(&self, path: &Path, bytes: &[u8]) -> crate::FsResult<u64> {
                self.0.write_file(path, bytes)
            }
            fn delete_file(&self, path: &Path) -> crate::FsResult<()> {
                Err(FsError::io(
                    path,
                    io::Error::new(io::ErrorKind::PermissionDenied, "sticky"),
                ))
            }
            fn delete_directory(&self, path: &Path, _recursive: bool) -> crate::FsResult<()> {
                Err(FsError::io(
                    path,
                    io::Error::new(io::ErrorKind::PermissionDenied, "sticky"),
                ))
            }
            fn copy_file(&self, from: &Path, to: &Path) -> crate::FsResult<u64> {
                self.0.copy_file(from, to)
            }
            fn move_file(&self, from: &Path, to: &Path) -> crate::FsResult<()> {
                self.0.move_file(from, to)
            }
            fn make_directory(&self, path: &Path, mode: u32, recursive: bool) -> crate::FsResult<()> {
                self.0.make_directory(path, mode, recursive)
            }
            fn change_permissions(&self, path: &Path, mode: u32) -> crate::FsResult<()> {
                self.0.change_permissions(path, mode)
            }
            fn list_directory(&self, path: &Path) -> crate::FsResult<Vec<std::path::PathBuf>> {
                self.0.list_directory(path)
            }
            fn file_size(&self, path: &Path) -> crate::FsResult<u64> {
                self.0.file_size(path)
            }
            fn last_modified(&self, path: &Path) -> crate::FsResult<SystemTime> {
                self.0.last_modified(path)
            }
        }

        /// Disk that records which paths `delete_file` is asked to remove.
        struct RecordingDisk {
            inner: LocalDisk,
            deletes: std::rc::Rc<std::cell::RefCell<Vec<std::path::PathBuf>>>,
        }

        impl DiskOps for RecordingDisk {
            fn exists(&self, path: &Path) -> bool {
                self.inner.exists(path)
            }
            fn is_dir(&self, path: &Path) -> bool {
                self.inner.is_dir(path)
            }
            fn is_file(&self, path: &Path) -> bool {
                self.inner.is_file(path)
            }
            fn create_file(&self, path: &Path) -> crate::FsResult<()> {
                self.inner.create_file(path)
            }
            fn read_file(&self, path: &Path) -> crate::FsResult<Vec<u8>> {
                self.inner.read_file(path)
            }
            fn write_file(&self, path: &Path, bytes: &[u8]) -> crate::FsResult<u64> {
                self.inner.write_file(path, bytes)
            }
            fn delete_file(&self, path: &Path) -> crate::FsResult<()> {
                self.deletes.borrow_mut().push(path.to_path_buf());
                self.inner.delete_file(path)
            }
            fn delete_directory(&self, path: &Path, recursive: bool) -> crate::FsResult<()> {
                self.inner.delete_directory(path, recursive)
            }
            fn copy_file(&self, from: &Path, to: &Path) -> crate::FsResult<u64> {
                self.inner.copy_file(from, to)
            }
            fn move_file(&self, from: &Path, to: &Path) -> crate::FsResult<()> {
                self.inner.move_file(from, to)
            }
            fn make_directory(&self, path: &Path, mode: u32, recursive: bool) -> crate::FsResult<()> {
                self.inner.make_directory(path, mode, recursive)
            }
            fn change_permissions(&self, path: &Path, mode: u32) -> crate::FsResult<()> {
                self.inner.change_permissions(path, mode)
            }
            fn list_directory(&self, path: &Path) -> crate::FsResult<Vec<std::path::PathBuf>> {
                self.inner.list_directory(path)
            }
            fn file_size(&self, path: &Path) -> crate::FsResult<u64> {
                self.inner.file_size(path)
            }
            fn last_modified(&self, path: &Path) -> crate::FsResult<SystemTime> {
                self.inner.last_modified(path)
            }
        }

        #[test]
        fn tracked_path_replaced_by_directory_is_not_deleted() {
            let deletes = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
            let disk = RecordingDisk {
                inner: LocalDisk,
                deletes: std::rc::Rc::clone(&deletes),
            };
            let mut run = TempRun::with_disk(disk);
            let file = run.create_tracked_file("a.txt", b"a", false).unwrap();

            // Something else swapped the tracked file for a directory.
            std::fs::remove_file(&file).unwrap();
            std::fs::create_dir(&file).unwrap();

            run.cleanup();
            assert!(
                !deletes.borrow().iter().any(|p| p == &file),
                "cleanup should not attempt file deletion on a directory"
            );
            assert!(!run.run_path().exists());
        }

        #[test]
        fn cleanup_failures_are_swallowed() {
            let mut run = TempRun::with_disk(StickyDisk(LocalDisk));
            let file = run.create_tracked_file("a.txt", b"a", false).unwrap();
            let folder = run.run_path();

            // Both deletions fail inside cleanup; neither error escapes.
            run.cleanup();
            assert!(file.exists());
            assert!(folder.exists());

            std::fs::remove_dir_all(folder).unwrap();
        }

        #[test]
        fn drop_removes_folder_and_files() {
            let mut run = TempRun::new();
            let file = run.create_tracked_file("a.txt", b"a", false).unwrap();
            let folder = run.run_path();
            drop(run);
            assert!(!file.exists());
            assert!(!folder.exists());
        }

        #[test]
        fn preserved_files_survive_cleanup() {
            let mut run = TempRun::new();
            let gone = run.create_tracked_file("a.txt", b"a", false).unwrap();
            let kept = run.create_tracked_file("b.txt", b"b", true).unwrap();
            let folder = run.run_path();
            drop(run);

            assert!(!gone.exists());
            assert!(kept.exists());
            assert!(folder.exists());

            std::fs::remove_dir_all(folder).unwrap();
        }

        #[test]
        fn preserved_run_folder_still_loses_files() {
            let mut run = TempRun::new();
            let file = run.create_tracked_file("a.txt", b"a", false).unwrap();
            run.set_preserve_run_folder(true);
            let folder = run.run_path();
            drop(run);

            // The directory outlives the run; its non-preserved contents
            // do not.
            assert!(!file.exists());
            assert!(folder.is_dir());
            std::fs::remove_dir_all(folder).unwrap();
        }

        #[test]
        fn set_preserve_via_bare_name_survives_drop() {
            let mut run = TempRun::new();
            let kept = run.create_tracked_file("b.txt", b"b", false).unwrap();
            run.set_preserve("b.txt", true);
            let folder = run.run_path();
            drop(run);

            assert!(kept.exists());
            std::fs::remove_dir_all(folder).unwrap();
        }

        #[test]
        fn preserve_all_keeps_everything() {
            let mut run = TempRun::new();
            let a = run.create_tracked_file("a.txt", b"a", false).unwrap();
            let b = run.create_tracked_file("b.txt", b"b", false).unwrap();
            run.set_preserve_all(true);
            let folder = run.run_path();
            drop(run);

            assert!(a.exists());
            assert!(b.exists());
            std::fs::remove_dir_all(folder).unwrap();
        }

        #[test]
        fn cleanup_runs_when_a_panic_unwinds() {
            use std::panic::{catch_unwind, AssertUnwindSafe};
            use std::sync::Mutex;

            let escaped: Mutex<Option<(std::path::PathBuf, std::path::PathBuf)>> =
                Mutex::new(None);
            let result = catch_unwind(AssertUnwindSafe(|| {
                let mut run = TempRun::new();
                let file = run.create_tracked_file("a.txt", b"a", false).unwrap();
                *escaped.lock().unwrap() = Some((file, run.run_path()));
                panic!("boom");
            }));
            assert!(result.is_err());

            let (file, folder) = escaped.lock().unwrap().take().unwrap();
            assert!(!file.exists());
            assert!(!folder.exists());
        }

        #[test]
        fn cleanup_twice_is_harmless() {
            let mut run = TempRun::new();
            run.create_tracked_file("a.txt", b"a", false).unwrap();
            run.cleanup();
            run.cleanup();
            assert!(!run.run_path().exists());
        }

        #[test]
        fn cleanup_without_folder_is_harmless() {
            let mut run = TempRun::new();
            run.cleanup();
        }

        #[test]
        fn already_deleted_tracked_file_is_skipped() {
            let mut run = TempRun::new();
            let file = run.create_tracked_file("a.txt", b"a", false).unwrap();
            std::fs::remove_file(&file).unwrap();
            run.cleanup();
            assert!(!run.run_path().exists());
        }
    }

    mod factory_tests {
        use super::*;

        #[test]
        fn default_factory_creates_unique_runs() {
            let factory = DefaultRunFactory::new();
            let a = factory.create_run();
            let b = factory.create_run();
            assert_ne!(a.run_path(), b.run_path());
        }

        #[test]
        fn prefixed_factory_applies_prefix() {
            let factory = DefaultRunFactory::with_prefix("batch-");
            let run = factory.create_run();
            let name = run.run_path().file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("batch-"));
        }
    }
}
