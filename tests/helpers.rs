//! Shared test utilities for dumprd integration tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test environment: a temp tree holding fake binaries, libraries, and a
/// scripted dependency reporter standing in for ldd.
pub struct TestEnv {
    /// Kept alive for the lifetime of the environment.
    pub _temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    /// Write a file and mark it executable.
    pub fn write_executable(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write file");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod");
        path
    }

    /// Create a fake dependency reporter: a shell script that appends its
    /// argument to `calls.txt` and prints ldd-style lines for `libs`.
    pub fn fake_reporter(&self, libs: &[&Path]) -> PathBuf {
        let mut script = String::from("#!/bin/sh\n");
        script.push_str(&format!(
            "echo \"$1\" >> {}\n",
            self.calls_file().display()
        ));
        for lib in libs {
            script.push_str(&format!(
                "echo \"\tlib => {} (0x00007f0000000000)\"\n",
                lib.display()
            ));
        }
        self.write_executable("reporter", script.as_bytes())
    }

    /// Create a fake reporter that exits nonzero. With `stderr_text` empty
    /// this models the static-binary quirk.
    pub fn failing_reporter(&self, stderr_text: &str) -> PathBuf {
        let mut script = String::from("#!/bin/sh\n");
        if !stderr_text.is_empty() {
            script.push_str(&format!("echo \"{stderr_text}\" >&2\n"));
        }
        script.push_str("exit 1\n");
        self.write_executable("reporter", script.as_bytes())
    }

    /// File recording every path the fake reporter was invoked with.
    pub fn calls_file(&self) -> PathBuf {
        self.root.join("calls.txt")
    }

    /// Paths the fake reporter was invoked with, in order.
    pub fn reporter_calls(&self) -> Vec<String> {
        match fs::read_to_string(self.calls_file()) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }
}
