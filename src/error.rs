//! Error types for the dumprd library.
//!
//! Each subsystem has its own error enum so callers can match on the
//! failure mode; the underlying OS error is carried as a source where one
//! exists. The build driver decides retry/abort policy, nothing here does.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the path canonicalization algorithm.
#[derive(Debug, Error)]
pub enum PathError {
    /// Symlink expansion exceeded [`crate::path::MAX_SYMLINKS`].
    #[error("too many levels of symbolic links while resolving {}", path.display())]
    Loop { path: PathBuf },

    /// An intermediate component exists but is not a directory.
    #[error("{}: not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// A relative path was given but the current directory is unreadable
    /// or lies outside the resolution root.
    #[error("cannot get current directory")]
    NoCurrentDirectory,

    /// `lstat` or `readlink` failed with something other than ENOENT.
    #[error("stat failed on {}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures while listing a directory.
#[derive(Debug, Error)]
pub enum ListDirError {
    #[error("cannot open directory {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read directory {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The dependency reporter failed with a diagnostic.
#[derive(Debug, Error)]
#[error("cannot get shared dependencies: {0}")]
pub struct DependencyError(pub String);

/// A mount or umount subprocess failed; carries the trimmed diagnostic.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MountError(pub String);
