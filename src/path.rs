//! Path canonicalization and directory-lifecycle helpers.
//!
//! The canonicalizer is a realpath equivalent rather than the OS primitive
//! because it must operate relative to an explicit root directory (the
//! staging area of an initrd build, or `/` at dump time) and must tolerate
//! a non-existent tail: paths that will be created later are valid targets.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::trace;

use crate::error::PathError;

/// Bound on symlink expansions during canonicalization, matching the usual
/// kernel MAXSYMLINKS limit.
pub const MAX_SYMLINKS: u32 = 40;

/// Canonicalize `path` against the filesystem root.
///
/// See [`canonicalize_under`].
pub fn canonicalize(path: &Path) -> Result<PathBuf, PathError> {
    canonicalize_under(path, Path::new("/"))
}

/// Canonicalize `path`, treating `root` as the top of the tree.
///
/// Returns an absolute path with no `.` or `..` components and no repeated
/// separators, with every symlink in existing prefixes resolved. Traversal
/// never rises above `root`; an absolute symlink target restarts resolution
/// at `root`, not at `/`. Components that do not exist on disk are kept
/// literally, as are all components after them.
///
/// Relative input is resolved against the current working directory, which
/// must itself lie under `root`.
pub fn canonicalize_under(path: &Path, root: &Path) -> Result<PathBuf, PathError> {
    let input = path.to_string_lossy();
    trace!(path = %input, root = %root.display(), "canonicalize");

    if input.is_empty() {
        return Ok(PathBuf::new());
    }

    let root_s = normalize_root(root);

    // Seed the accumulator: the current directory for relative paths, the
    // root for absolute ones.
    let mut ret: String = if !input.starts_with('/') {
        let cwd = env::current_dir().map_err(|_| PathError::NoCurrentDirectory)?;
        let cwd = cwd.to_string_lossy().into_owned();
        if !is_under(&cwd, &root_s) {
            return Err(PathError::NoCurrentDirectory);
        }
        cwd
    } else {
        root_s.clone()
    };

    // `pending` is the unresolved remainder of the path. Symlink targets are
    // spliced into it in place of the unconsumed suffix; the caller's input
    // is never touched.
    let mut pending: String = input.into_owned();
    let mut pos: usize = 0;
    let mut num_links: u32 = 0;

    while pos < pending.len() {
        // Skip any run of separators.
        while pos < pending.len() && pending.as_bytes()[pos] == b'/' {
            pos += 1;
        }

        // Find the end of the next component.
        let start = pos;
        while pos < pending.len() && pending.as_bytes()[pos] != b'/' {
            pos += 1;
        }
        let dir = &pending[start..pos];

        if dir.is_empty() || dir == "." {
            continue;
        }

        if dir == ".." {
            // Back up to the previous component, never above the root.
            if ret.len() > root_s.len() {
                if let Some(cut) = ret.rfind('/') {
                    ret.truncate(cut.max(root_s.len()));
                }
            }
            continue;
        }

        if !ret.ends_with('/') {
            ret.push('/');
        }
        ret.push_str(dir);

        match fs::symlink_metadata(&ret) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                // Non-existent elements will be created later.
            }
            Err(err) => {
                return Err(PathError::Stat {
                    path: PathBuf::from(ret),
                    source: err,
                });
            }
            Ok(md) if md.file_type().is_symlink() => {
                let target = fs::read_link(&ret).map_err(|err| PathError::Stat {
                    path: PathBuf::from(ret.clone()),
                    source: err,
                })?;
                let target = target.to_string_lossy();

                num_links += 1;
                if num_links > MAX_SYMLINKS {
                    return Err(PathError::Loop {
                        path: PathBuf::from(ret),
                    });
                }

                // Splice the link target in place of the unconsumed suffix
                // and restart the walk from it.
                let absolute = target.starts_with('/');
                let mut spliced = target.into_owned();
                spliced.push_str(&pending[pos..]);
                pending = spliced;
                pos = 0;

                if absolute {
                    ret.truncate(root_s.len());
                } else if let Some(cut) = ret.rfind('/') {
                    ret.truncate(cut.max(root_s.len()));
                }
            }
            Ok(md) if !md.is_dir() && pos < pending.len() => {
                return Err(PathError::NotADirectory {
                    path: PathBuf::from(ret),
                });
            }
            Ok(_) => {}
        }
    }

    Ok(PathBuf::from(ret))
}

/// Root string with trailing separators removed; `/` stays `/`.
fn normalize_root(root: &Path) -> String {
    let s = root.to_string_lossy();
    let trimmed = s.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_under(path: &str, root: &str) -> bool {
    if root == "/" {
        return path.starts_with('/');
    }
    path == root
        || (path.starts_with(root) && path.as_bytes().get(root.len()) == Some(&b'/'))
}

/// Join `name` onto `dir`, treating `name` as relative even when it begins
/// with a separator. `Path::join` would discard `dir` for an absolute name.
pub fn join_under(dir: &Path, name: &Path) -> PathBuf {
    let name = name.to_string_lossy();
    dir.join(name.trim_start_matches('/'))
}

/// Create `path` and every missing ancestor, tolerating directories that
/// already exist.
pub fn mkdir_p(path: &Path) -> Result<()> {
    let mut current = PathBuf::new();
    for component in path.components() {
        current.push(component);
        match fs::create_dir(&current) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => {
                return Err(err).with_context(|| format!("mkdir of {} failed", current.display()))
            }
        }
    }
    Ok(())
}

/// Remove `path` and everything below it.
///
/// Entries are classified by the readdir type hint where the filesystem
/// provides one; otherwise the entry is lstat'ed.
pub fn remove_dir_recursive(path: &Path) -> Result<()> {
    trace!(path = %path.display(), "remove_dir_recursive");

    let entries =
        fs::read_dir(path).with_context(|| format!("cannot opendir {}", path.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("cannot read directory {}", path.display()))?;
        let child = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("cannot stat {}", child.display()))?;
        if file_type.is_dir() {
            remove_dir_recursive(&child)?;
        } else {
            fs::remove_file(&child)
                .with_context(|| format!("cannot remove {}", child.display()))?;
        }
    }
    fs::remove_dir(path).with_context(|| format!("cannot rmdir {}", path.display()))
}
