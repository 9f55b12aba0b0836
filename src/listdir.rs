//! Directory listing under pluggable inclusion filters.
//!
//! Filters are strategy objects with a single `included` capability; the
//! crash-dump filter composes the directories-only filter by delegation.
//! Results are always sorted: on-disk enumeration order is unspecified and
//! must not leak into observable behavior.

use std::fs::{self, DirEntry};
use std::path::Path;

use tracing::trace;

use crate::error::ListDirError;

/// Decides whether a directory entry appears in a listing.
pub trait DirFilter {
    fn included(&self, entry: &DirEntry) -> bool;
}

/// Excludes the `.` and `..` entries, includes everything else.
pub struct FilterDots;

impl DirFilter for FilterDots {
    fn included(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name();
        name != "." && name != ".."
    }
}

/// Includes only subdirectories (symlinks to directories excluded).
///
/// Uses the readdir type hint where the filesystem reports one; otherwise
/// `DirEntry::file_type` falls back to an lstat of the entry.
pub struct FilterDirs;

impl DirFilter for FilterDirs {
    fn included(&self, entry: &DirEntry) -> bool {
        if !FilterDots.included(entry) {
            return false;
        }
        match entry.file_type() {
            Ok(file_type) => file_type.is_dir(),
            Err(_) => false,
        }
    }
}

/// Includes only subdirectories holding a saved crash dump, identified by
/// an immediate `vmcore` child.
pub struct FilterDumpDirs;

impl DirFilter for FilterDumpDirs {
    fn included(&self, entry: &DirEntry) -> bool {
        if !FilterDirs.included(entry) {
            return false;
        }
        fs::metadata(entry.path().join("vmcore")).is_ok()
    }
}

/// List the names in `path` accepted by `filter`, lexicographically sorted.
///
/// The directory handle is released on every exit path, including a read
/// error mid-iteration.
pub fn list_dir(path: &Path, filter: &dyn DirFilter) -> Result<Vec<String>, ListDirError> {
    trace!(path = %path.display(), "list_dir");

    let entries = fs::read_dir(path).map_err(|source| ListDirError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ListDirError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if filter.included(&entry) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn test_list_all_sorted() {
        let td = TempDir::new().unwrap();
        fs::write(td.path().join("zeta"), b"").unwrap();
        fs::write(td.path().join("alpha"), b"").unwrap();
        fs::create_dir(td.path().join("mid")).unwrap();

        let names = list_dir(td.path(), &FilterDots).unwrap();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_directories_only() {
        let td = TempDir::new().unwrap();
        fs::write(td.path().join("file"), b"").unwrap();
        fs::create_dir(td.path().join("dir")).unwrap();
        fs::create_dir(td.path().join("other")).unwrap();
        // A symlink to a directory is not itself a directory.
        symlink("dir", td.path().join("link")).unwrap();

        let names = list_dir(td.path(), &FilterDirs).unwrap();
        assert_eq!(names, vec!["dir", "other"]);
    }

    #[test]
    fn test_dump_directories() {
        let td = TempDir::new().unwrap();
        // A vmcore at the top level does not make the parent a dump dir.
        fs::write(td.path().join("vmcore"), b"").unwrap();
        fs::create_dir(td.path().join("20240101")).unwrap();
        fs::write(td.path().join("20240101/vmcore"), b"").unwrap();
        fs::create_dir(td.path().join("20231231")).unwrap();
        fs::write(td.path().join("20231231/vmcore"), b"").unwrap();
        fs::create_dir(td.path().join("incomplete")).unwrap();

        let names = list_dir(td.path(), &FilterDumpDirs).unwrap();
        assert_eq!(names, vec!["20231231", "20240101"]);
    }

    #[test]
    fn test_missing_directory_fails_open() {
        let td = TempDir::new().unwrap();
        let missing = td.path().join("nope");
        assert!(matches!(
            list_dir(&missing, &FilterDots),
            Err(ListDirError::Open { .. })
        ));
    }
}
