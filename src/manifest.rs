//! JSON build manifest: a record of what went into the image, in the order
//! the archive received it. Useful for diffing two builds or auditing what
//! a failing initrd actually contained.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cpio::CpioArchive;

/// One archive member in the build manifest.
#[derive(Debug, Serialize)]
pub struct ManifestEntry {
    /// Destination path inside the image.
    pub destination: String,
    /// Human-readable source description (copy source, inline size, ...).
    pub source: String,
}

/// Collect manifest entries from an archive, in emission order.
pub fn entries_for(archive: &CpioArchive) -> Vec<ManifestEntry> {
    archive
        .contents()
        .into_iter()
        .map(|(destination, source)| ManifestEntry {
            destination,
            source,
        })
        .collect()
}

/// Write the manifest as pretty-printed JSON.
pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    let json = serde_json::to_string_pretty(entries).context("cannot serialize manifest")?;
    fs::write(path, json)
        .with_context(|| format!("cannot write manifest {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpio::{ArchiveSink, EntrySource};
    use tempfile::TempDir;

    #[test]
    fn test_manifest_preserves_emission_order() {
        let mut archive = CpioArchive::new();
        archive
            .add_entry(Path::new("/bin/prog"), EntrySource::InlineBytes(vec![0]))
            .unwrap();
        archive
            .add_entry(Path::new("/libc.so.6"), EntrySource::InlineBytes(vec![0]))
            .unwrap();

        let entries = entries_for(&archive);
        let destinations: Vec<&str> =
            entries.iter().map(|e| e.destination.as_str()).collect();
        assert_eq!(destinations, vec!["bin/prog", "libc.so.6"]);
    }

    #[test]
    fn test_write_manifest_roundtrips_as_json() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("manifest.json");

        let entries = vec![ManifestEntry {
            destination: "bin/sh".to_string(),
            source: "copy /bin/sh".to_string(),
        }];
        write_manifest(&path, &entries).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0]["destination"], "bin/sh");
        assert_eq!(parsed[0]["source"], "copy /bin/sh");
    }
}
