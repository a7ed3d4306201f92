//! Glob matching with globstar (`**`) emulation.
//!
//! The native glob primitive (`glob`) matches a single pattern against the
//! filesystem: brace alternation, per-segment wildcards, and a directory-only
//! filter, with `*` never crossing a path separator. It has no recursive
//! wildcard; a `**` handed to it degrades to `*`.
//!
//! `expand` adds the globstar: a `**` in the pattern is rewritten into one
//! ordinary pattern per directory depth under the prefix, the per-depth
//! results are merged and deduplicated, and the final ordering is selected
//! by `GlobFlags` (shallow-first, deep-first, or lexicographic).

use std::collections::HashSet;
use std::ops::{BitOr, BitOrAssign};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::GlobBuilder;
use regex::{Captures, Regex};
use walkdir::WalkDir;

use crate::error::{FsError, FsResult};

// ============================================================================
// Flags
// ============================================================================

/// Bitset of glob matching and ordering options.
///
/// Ordering flags apply to `expand` output only; the native primitive always
/// returns lexicographically sorted paths. When both ordering flags are set,
/// `ROOT_FIRST` wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlobFlags(u32);

impl GlobFlags {
    /// No options.
    pub const NONE: GlobFlags = GlobFlags(0);
    /// Enable `{a,b}` alternation.
    pub const BRACE: GlobFlags = GlobFlags(1);
    /// Match directories only.
    pub const ONLY_DIRS: GlobFlags = GlobFlags(1 << 1);
    /// Order expansion results shallow-to-deep.
    pub const ROOT_FIRST: GlobFlags = GlobFlags(1 << 2);
    /// Order expansion results deep-to-shallow.
    pub const CHILD_FIRST: GlobFlags = GlobFlags(1 << 3);

    /// Whether every bit of `other` is set in `self`.
    pub fn contains(self, other: GlobFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// These flags with the ordering bits cleared.
    fn without_ordering(self) -> GlobFlags {
        GlobFlags(self.0 & !(Self::ROOT_FIRST.0 | Self::CHILD_FIRST.0))
    }
}

impl BitOr for GlobFlags {
    type Output = GlobFlags;

    fn bitor(self, rhs: GlobFlags) -> GlobFlags {
        GlobFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for GlobFlags {
    fn bitor_assign(&mut self, rhs: GlobFlags) {
        self.0 |= rhs.0;
    }
}

// ============================================================================
// Native Glob Primitive
// ============================================================================

/// Match a single glob pattern against the filesystem.
///
/// Leading wildcard-free segments become the walk root; the remaining
/// segments are matched level by level, so results sit at exactly the
/// pattern's depth. A fully literal pattern matches itself if it exists.
///
/// A missing root or a pattern with no matches yields an empty vec, never an
/// error; only an unparseable pattern is `FsError::InvalidPattern`. Results
/// are sorted lexicographically and deduplicated across brace alternates.
pub fn glob(pattern: &str, flags: GlobFlags) -> FsResult<Vec<PathBuf>> {
    if pattern.is_empty() {
        return Ok(Vec::new());
    }

    let variants = if flags.contains(GlobFlags::BRACE) {
        expand_braces(pattern)
    } else {
        vec![pattern.to_string()]
    };

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut results = Vec::new();
    for variant in &variants {
        // Brace alternates with an empty branch leave a double slash behind.
        let variant = variant.replace("//", "/");
        for path in glob_one(&variant, flags)? {
            if seen.insert(path.clone()) {
                results.push(path);
            }
        }
    }
    results.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    Ok(results)
}

/// Match one brace-free pattern.
fn glob_one(pattern: &str, flags: GlobFlags) -> FsResult<Vec<PathBuf>> {
    let only_dirs = flags.contains(GlobFlags::ONLY_DIRS);
    let trimmed = if pattern.len() > 1 {
        pattern.trim_end_matches('/')
    } else {
        pattern
    };
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    let split = segments
        .iter()
        .position(|s| s.contains(['*', '?', '[', '\\']))
        .unwrap_or(segments.len());

    // Fully literal: the path matches itself if it exists.
    if split == segments.len() {
        let path = PathBuf::from(trimmed);
        let hit = if only_dirs {
            path.is_dir()
        } else {
            path.exists()
        };
        return Ok(if hit { vec![path] } else { Vec::new() });
    }

    let literal = segments[..split].join("/");
    let (root, relative_results) = if literal.is_empty() {
        if trimmed.starts_with('/') {
            (PathBuf::from("/"), false)
        } else {
            (PathBuf::from("."), true)
        }
    } else {
        (PathBuf::from(literal), false)
    };

    // The primitive has no recursive wildcard: `**` collapses to `*`, and
    // any brace that survived alternation expansion is literal text.
    let mut rel_pattern = segments[split..].join("/");
    while rel_pattern.contains("**") {
        rel_pattern = rel_pattern.replace("**", "*");
    }
    let rel_pattern = rel_pattern.replace('{', "\\{").replace('}', "\\}");

    let matcher = GlobBuilder::new(&rel_pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map_err(|e| FsError::invalid_pattern(pattern, e.to_string()))?
        .compile_matcher();

    let depth = segments.len() - split;
    let mut results = Vec::new();
    for entry in WalkDir::new(&root)
        .min_depth(depth)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if only_dirs && !entry.file_type().is_dir() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(&root) else {
            continue;
        };
        if matcher.is_match(rel) {
            if relative_results {
                results.push(rel.to_path_buf());
            } else {
                results.push(entry.path().to_path_buf());
            }
        }
    }
    Ok(results)
}

/// Expand `{a,b}` alternation into one pattern per alternate.
///
/// Handles nesting; an unmatched `{` leaves the pattern untouched. An empty
/// alternate (`{a,}`) produces a branch whose leftover `//` the caller
/// collapses.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut close = None;
    let mut depth = 0usize;
    for (i, b) in pattern.bytes().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let body = &pattern[open + 1..close];
    let suffix = &pattern[close + 1..];

    let mut alternates = Vec::new();
    let mut level = 0usize;
    let mut start = 0usize;
    for (i, b) in body.bytes().enumerate() {
        match b {
            b'{' => level += 1,
            b'}' => level = level.saturating_sub(1),
            b',' if level == 0 => {
                alternates.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    alternates.push(&body[start..]);

    let mut out = Vec::new();
    for alt in alternates {
        out.extend(expand_braces(&format!("{}{}{}", prefix, alt, suffix)));
    }
    out
}

// ============================================================================
// Globstar Expansion
// ============================================================================

/// Matches a brace group containing a globstar, e.g. `{a,**}`.
static GLOBSTAR_IN_BRACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(.+)?(\*\*[^,]?)(.?)\}").unwrap());

/// Captures the surroundings of a globstar-bearing brace group for rewrite.
static GLOBSTAR_BRACE_REWRITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+)?\{(.+)?(\*\*[^,]?)(.?)\}(.?)").unwrap());

/// Extended glob supporting the `**` (globstar) wildcard.
///
/// Without `**` in the pattern this is the native `glob` with braces enabled,
/// reordered per `flags`. With `**`, every directory depth under the prefix
/// (including zero levels) contributes a candidate pattern; candidates are
/// globbed, merged, deduplicated, and ordered.
pub fn expand(pattern: &str, flags: GlobFlags) -> FsResult<Vec<PathBuf>> {
    let flags = flags | GlobFlags::BRACE;

    if !pattern.contains("**") {
        let files = glob(pattern, flags.without_ordering())?;
        return Ok(order(files, flags));
    }

    let mut candidates: Vec<String> = Vec::new();
    let mut pattern = pattern.to_string();

    // A globstar inside a brace group would nest expansion endlessly, so the
    // globstar is pulled out of the group first: one candidate keeps the
    // remaining alternates, and the main pattern keeps just the globstar.
    if GLOBSTAR_IN_BRACE.is_match(&pattern) {
        let kept = GLOBSTAR_BRACE_REWRITE.replace_all(&pattern, |caps: &Captures<'_>| {
            let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());
            let brace = format!("{{{}{}}}", group(2), group(4));
            let brace = if brace == "{,}" || brace == "{}" {
                ""
            } else {
                brace.as_str()
            }
            .to_string();
            format!("{}{}{}", group(1), brace, group(5)).replace("//", "/")
        });
        candidates.push(kept.into_owned());

        pattern = GLOBSTAR_IN_BRACE
            .replace_all(&pattern, |caps: &Captures<'_>| caps[2].to_string())
            .into_owned();
    }

    let Some(pos) = pattern.find("**") else {
        // Rewrite consumed the globstar entirely; fall back to native glob.
        let files = glob(&pattern, flags.without_ordering())?;
        return Ok(order(files, flags));
    };
    let prefix = pattern[..pos].to_string();
    let rest = pattern[pos + 2..].to_string();

    // Zero directory levels: the globstar collapses away.
    let zero = if prefix.is_empty() {
        rest.trim_start_matches('/').to_string()
    } else {
        format!("{}{}", prefix, rest).replace("//", "/")
    };
    if !zero.is_empty() {
        candidates.push(zero);
    }

    // One or more levels: enumerate directories depth by depth until a depth
    // has none, appending the rest of the pattern to each directory found.
    let mut root_pattern = format!("{}*", prefix);
    loop {
        let dirs = glob(
            &root_pattern,
            flags.without_ordering() | GlobFlags::ONLY_DIRS,
        )?;
        if dirs.is_empty() {
            break;
        }
        root_pattern.push_str("/*");
        for dir in dirs {
            candidates.push(format!("{}{}", dir.to_string_lossy(), rest));
        }
    }

    tracing::debug!(
        pattern = %pattern,
        candidates = candidates.len(),
        "expanded globstar pattern"
    );

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut merged = Vec::new();
    for candidate in &candidates {
        for path in glob(candidate, flags.without_ordering())? {
            if seen.insert(path.clone()) {
                merged.push(path);
            }
        }
    }
    Ok(order(merged, flags))
}

/// Number of path components, the depth used by the ordering flags.
fn path_depth(path: &Path) -> usize {
    path.components().count()
}

/// Apply the ordering selected by `flags`.
///
/// Depth sorts tie-break lexicographically so output is deterministic
/// regardless of merge order.
fn order(mut files: Vec<PathBuf>, flags: GlobFlags) -> Vec<PathBuf> {
    if flags.contains(GlobFlags::ROOT_FIRST) {
        files.sort_by(|a, b| {
            path_depth(a)
                .cmp(&path_depth(b))
                .then_with(|| a.as_os_str().cmp(b.as_os_str()))
        });
    } else if flags.contains(GlobFlags::CHILD_FIRST) {
        files.sort_by(|a, b| {
            path_depth(b)
                .cmp(&path_depth(a))
                .then_with(|| a.as_os_str().cmp(b.as_os_str()))
        });
    } else {
        files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    }
    files
}

// ============================================================================
// Tests
// ============================================================================
