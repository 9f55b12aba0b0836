//! Dependency-closure installer.
//!
//! Decides, for each requested program or file, which on-disk artifacts go
//! into the image: the file itself, its interpreter when it is a script,
//! and the shared libraries the dependency reporter lists for whichever of
//! the two is the real binary. Destinations are deduplicated, which both
//! prevents duplicate archive members for libraries shared by several
//! programs and bounds the closure.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, trace};

use crate::cpio::{ArchiveSink, EntrySource};
use crate::deps;
use crate::path::join_under;

/// Default location of fixed support assets shipped with the tool.
pub const DATA_DIRECTORY: &str = "/usr/lib/dumprd";

/// What the shebang sniff learned about a program file.
enum Sniff {
    /// No `#!` marker: treat the file itself as the binary.
    Binary,
    /// `#!` with an interpreter path.
    Script(PathBuf),
    /// `#!` with an unreadable or empty interpreter line: install the file
    /// but skip dependency resolution.
    Opaque,
}

/// Builds the install manifest for one image, streaming entries into an
/// archive sink as they are first seen.
pub struct Installer<'a> {
    sink: &'a mut dyn ArchiveSink,
    installed: HashSet<PathBuf>,
    reporter: String,
    data_dir: PathBuf,
}

impl<'a> Installer<'a> {
    pub fn new(sink: &'a mut dyn ArchiveSink) -> Self {
        Self {
            sink,
            installed: HashSet::new(),
            reporter: deps::DEFAULT_REPORTER.to_string(),
            data_dir: PathBuf::from(DATA_DIRECTORY),
        }
    }

    /// Use a different dependency reporter than `ldd`.
    pub fn with_reporter(mut self, reporter: &str) -> Self {
        self.reporter = reporter.to_string();
        self
    }

    /// Use a different support-data directory.
    pub fn with_data_dir(mut self, data_dir: &Path) -> Self {
        self.data_dir = data_dir.to_path_buf();
        self
    }

    /// Install a single file at `dest_dir`/basename(`source`).
    ///
    /// Returns `false` without touching the sink if that destination is
    /// already present.
    pub fn install_file(&mut self, source: &Path, dest_dir: &Path) -> Result<bool> {
        let name = source
            .file_name()
            .with_context(|| format!("{} has no file name", source.display()))?;
        let dest = join_under(dest_dir, Path::new(name));

        if self.installed.contains(&dest) {
            trace!(dest = %dest.display(), "already installed");
            return Ok(false);
        }

        debug!(source = %source.display(), dest = %dest.display(), "install file");
        self.sink
            .add_entry(&dest, EntrySource::FileCopy(source.to_path_buf()))?;
        self.installed.insert(dest);
        Ok(true)
    }

    /// Install a program together with its runtime closure.
    ///
    /// If the program is an interpreter script, the interpreter is installed
    /// at its own path and becomes the root for dependency resolution; the
    /// reporter is never run against the script text. Every reported library
    /// is installed under `/`. The reporter already lists the transitive
    /// set, so libraries are installed as plain files without recursing.
    pub fn install_program(&mut self, path: &Path, dest_dir: &Path) -> Result<bool> {
        if !self.install_file(path, dest_dir)? {
            // Already present, so its closure was already computed.
            return Ok(false);
        }

        let dep_root = match sniff_interpreter(path) {
            Sniff::Opaque => return Ok(true),
            Sniff::Script(interpreter) => {
                let interp_dir = interpreter
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("/"));
                self.install_file(&interpreter, &interp_dir)?;
                interpreter
            }
            Sniff::Binary => path.to_path_buf(),
        };

        for lib in deps::dependencies_via(&self.reporter, &dep_root)? {
            self.install_file(Path::new(&lib), Path::new("/"))?;
        }
        Ok(true)
    }

    /// Install a fixed asset from the support-data directory. `name` may
    /// contain subdirectories; it is preserved below `dest_dir`.
    pub fn install_data(&mut self, name: &str, dest_dir: &Path) -> Result<bool> {
        let source = join_under(&self.data_dir, Path::new(name));
        let dest = join_under(dest_dir, Path::new(name));

        if self.installed.contains(&dest) {
            return Ok(false);
        }

        debug!(source = %source.display(), dest = %dest.display(), "install data");
        self.sink.add_entry(&dest, EntrySource::FileCopy(source))?;
        self.installed.insert(dest);
        Ok(true)
    }
}

/// Read the first line of `path` and extract a `#!` interpreter.
///
/// The interpreter path starts after any spaces or tabs following the
/// marker and ends at the next space, tab, or newline.
fn sniff_interpreter(path: &Path) -> Sniff {
    let Ok(file) = File::open(path) else {
        return Sniff::Opaque;
    };
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 2];
    if reader.read_exact(&mut magic).is_err() {
        return Sniff::Opaque;
    }
    if &magic != b"#!" {
        return Sniff::Binary;
    }

    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line).is_err() {
        return Sniff::Opaque;
    }
    let line = String::from_utf8_lossy(&line);
    let rest = line.trim_start_matches([' ', '\t']);
    let end = rest
        .find([' ', '\t', '\n', '\r'])
        .unwrap_or(rest.len());
    let interpreter = &rest[..end];

    if interpreter.is_empty() {
        Sniff::Opaque
    } else {
        Sniff::Script(PathBuf::from(interpreter))
    }
}
