//! newc (SVR4) cpio archive writer, the format the Linux kernel unpacks as
//! an initramfs.
//!
//! Headers are 110 bytes of ASCII with 8-hex-digit fields; name and data
//! are padded to 4-byte alignment and the archive ends with a `TRAILER!!!`
//! member. File contents are read at write time, so adding an entry never
//! touches the source; a build that is never serialized never reads it.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;

/// Where the bytes of an archived file come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    /// Copy the contents of this on-disk file.
    FileCopy(PathBuf),
    /// Embed this raw payload.
    InlineBytes(Vec<u8>),
}

/// Consumer of installer output: one entry per destination path, in the
/// order emitted. Implemented by [`CpioArchive`] for real builds and by
/// recording fakes in tests.
pub trait ArchiveSink {
    fn add_entry(&mut self, dest: &Path, source: EntrySource) -> Result<()>;
}

enum Member {
    File { source: EntrySource },
    Dir { mode: u32 },
    Symlink { target: String },
}

/// In-memory member list serialized on [`CpioArchive::write`].
pub struct CpioArchive {
    members: Vec<(String, Member)>,
}

impl CpioArchive {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Add a directory member.
    pub fn add_directory(&mut self, path: &str, mode: u32) {
        let name = archive_name(path);
        self.members.push((name, Member::Dir { mode: mode & 0o7777 }));
    }

    /// Add a symlink member pointing at `target`.
    pub fn add_symlink(&mut self, target: &str, path: &str) {
        let name = archive_name(path);
        self.members.push((
            name,
            Member::Symlink {
                target: target.to_string(),
            },
        ));
    }

    /// Number of members added so far.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Destination and source-description pairs, in emission order.
    pub fn contents(&self) -> Vec<(String, String)> {
        self.members
            .iter()
            .map(|(name, member)| {
                let desc = match member {
                    Member::File {
                        source: EntrySource::FileCopy(src),
                    } => format!("copy {}", src.display()),
                    Member::File {
                        source: EntrySource::InlineBytes(data),
                    } => format!("inline {} bytes", data.len()),
                    Member::Dir { .. } => "directory".to_string(),
                    Member::Symlink { target } => format!("symlink -> {target}"),
                };
                (name.clone(), desc)
            })
            .collect()
    }

    /// Serialize all members followed by the trailer. Returns the number of
    /// bytes written.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<u64> {
        let mut total = 0u64;
        let mut ino = 1u32;

        for (name, member) in &self.members {
            let (mode, data) = match member {
                Member::File { source } => match source {
                    EntrySource::FileCopy(src) => {
                        let md = fs::metadata(src)
                            .with_context(|| format!("cannot stat {}", src.display()))?;
                        let mode = S_IFREG | (md.permissions().mode() & 0o7777);
                        let data = fs::read(src)
                            .with_context(|| format!("cannot read {}", src.display()))?;
                        (mode, data)
                    }
                    EntrySource::InlineBytes(data) => (S_IFREG | 0o644, data.clone()),
                },
                Member::Dir { mode } => (S_IFDIR | mode, Vec::new()),
                Member::Symlink { target } => (S_IFLNK | 0o777, target.as_bytes().to_vec()),
            };

            total += write_member(writer, ino, name, mode, &data)?;
            ino += 1;
        }

        total += write_member(writer, 0, "TRAILER!!!", 0, &[])?;
        Ok(total)
    }
}

impl Default for CpioArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveSink for CpioArchive {
    fn add_entry(&mut self, dest: &Path, source: EntrySource) -> Result<()> {
        let name = archive_name(&dest.to_string_lossy());
        self.members.push((name, Member::File { source }));
        Ok(())
    }
}

fn write_member<W: Write>(writer: &mut W, ino: u32, name: &str, mode: u32, data: &[u8]) -> Result<u64> {
    let namesize = name.len() + 1;
    let header = format_header(ino, mode, data.len() as u32, namesize as u32);

    writer.write_all(header.as_bytes())?;
    writer.write_all(name.as_bytes())?;
    writer.write_all(&[0])?;
    let mut written = header.len() + namesize;

    // Header plus name is padded to a 4-byte boundary, as is the data.
    let pad = align4(110 + namesize) - (110 + namesize);
    writer.write_all(&vec![0u8; pad])?;
    written += pad;

    if !data.is_empty() {
        writer.write_all(data)?;
        let pad = align4(data.len()) - data.len();
        writer.write_all(&vec![0u8; pad])?;
        written += data.len() + pad;
    }

    Ok(written as u64)
}

/// Format a newc header: "070701" magic followed by 13 fields of 8 uppercase
/// hex digits. All entries are root-owned with a zero mtime so the archive
/// is reproducible.
fn format_header(ino: u32, mode: u32, filesize: u32, namesize: u32) -> String {
    format!(
        "070701\
         {ino:08X}\
         {mode:08X}\
         {:08X}\
         {:08X}\
         {:08X}\
         {:08X}\
         {filesize:08X}\
         {:08X}\
         {:08X}\
         {:08X}\
         {:08X}\
         {namesize:08X}\
         {:08X}",
        0, // c_uid
        0, // c_gid
        1, // c_nlink
        0, // c_mtime
        0, // c_devmajor
        0, // c_devminor
        0, // c_rdevmajor
        0, // c_rdevminor
        0, // c_check (always 0 for newc)
    )
}

/// Archive member names are root-relative without a leading slash; the root
/// itself is `.`.
fn archive_name(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        ".".to_string()
    } else {
        trimmed.to_string()
    }
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}
