//! Filesystem helpers for tools that shuffle files around: globstar pattern
//! expansion, recursive regex search, per-run temp folders with guaranteed
//! cleanup, and a cloud-storage-style store served from a local directory.
//!
//! The pieces compose but stand alone:
//!
//! - [`glob::expand`] turns `**` patterns into ordinary glob matches with
//!   selectable result ordering ([`GlobFlags`]).
//! - [`search::search`] walks a tree and collects regex hits against file paths.
//! - [`TempRun`] owns a uniquely named temp folder whose tracked files are
//!   removed on drop unless preserved.
//! - [`LocalStore`] exposes the flat key-addressed [`Store`] contract over a
//!   local root, refusing what local disks cannot honor.
//!
//! All disk access behind [`TempRun`] and [`LocalStore`] goes through the
//! [`DiskOps`] trait, so tests can substitute the filesystem.

pub mod disk;
pub mod error;
pub mod glob;
pub mod search;
pub mod store;
pub mod temp;
pub mod util;

pub use disk::{DiskOps, LocalDisk};
pub use error::{FsError, FsResult};
pub use glob::{expand, glob, GlobFlags};
pub use search::search;
pub use store::{LocalStore, Store};
pub use temp::{DefaultRunFactory, RunFactory, TempRun, TrackedFile};
