//! Recursive regex search over file paths.

use std::path::Path;

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{FsError, FsResult};

/// Walk every file under `root` and collect regex hits against the full
/// path string.
///
/// For a pattern with capture groups, each group's text is collected; for a
/// pattern without groups, the file path itself is collected once per match.
/// The walk is sorted so results are deterministic. A missing or non-directory
/// `root` is `FsError::PathNotFound`.
pub fn search(root: impl AsRef<Path>, pattern: &Regex) -> FsResult<Vec<String>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(FsError::not_found(root));
    }

    let mut hits = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path().to_string_lossy();
        for caps in pattern.captures_iter(&path) {
            if caps.len() > 1 {
                for group in caps.iter().skip(1).flatten() {
                    hits.push(group.as_str().to_string());
                }
            } else {
                hits.push(path.to_string());
            }
        }
    }
    debug!(root = %root.display(), hits = hits.len(), "path search finished");
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// a.log, b.txt, sub/c.log
    fn create_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.log"), b"").unwrap();
        fs::write(dir.path().join("b.txt"), b"").unwrap();
        fs::write(dir.path().join("sub/c.log"), b"").unwrap();
        dir
    }

    #[test]
    fn collects_full_paths_without_groups() {
        let tree = create_tree();
        let re = Regex::new(r"\.log$").unwrap();
        let hits = search(tree.path(), &re).unwrap();
        assert_eq!(
            hits,
            vec![
                tree.path().join("a.log").to_string_lossy().into_owned(),
                tree.path().join("sub/c.log").to_string_lossy().into_owned(),
            ]
        );
    }

    #[test]
    fn collects_capture_groups_when_present() {
        let tree = create_tree();
        let re = Regex::new(r"([^/]+)\.log$").unwrap();
        let hits = search(tree.path(), &re).unwrap();
        assert_eq!(hits, vec!["a", "c"]);
    }

    #[test]
    fn directories_are_not_matched() {
        let tree = create_tree();
        let re = Regex::new(r"sub$").unwrap();
        assert!(search(tree.path(), &re).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_path_not_found() {
        let tree = create_tree();
        let re = Regex::new(r".").unwrap();
        let err = search(tree.path().join("absent"), &re).unwrap_err();
        assert!(matches!(err, FsError::PathNotFound { .. }));
    }

    #[test]
    fn no_matches_is_empty() {
        let tree = create_tree();
        let re = Regex::new(r"\.rs$").unwrap();
        assert!(search(tree.path(), &re).unwrap().is_empty());
    }
}
