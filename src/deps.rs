//! Shared-library dependency scanning.
//!
//! Runs the dynamic-linker dependency reporter (`ldd` by default) against a
//! binary and extracts the absolute paths from its output. The reporter is
//! trusted to list the full transitive closure, so nothing here recurses.
//! The parsing is split from the subprocess call so it can be tested
//! against canned output.

use std::path::Path;

use tracing::trace;

use crate::error::DependencyError;
use crate::process::{Cmd, CommandResult};

/// Default dependency reporter.
pub const DEFAULT_REPORTER: &str = "ldd";

/// List the shared objects `binary` needs, using the default reporter.
pub fn dependencies_of(binary: &Path) -> Result<Vec<String>, DependencyError> {
    dependencies_via(DEFAULT_REPORTER, binary)
}

/// List the shared objects `binary` needs, using `reporter`.
///
/// Duplicates in the reporter output are preserved; deduplication is the
/// installer's job, keyed by destination path.
pub fn dependencies_via(reporter: &str, binary: &Path) -> Result<Vec<String>, DependencyError> {
    trace!(reporter, binary = %binary.display(), "dependencies_via");

    let result = Cmd::new(reporter)
        .arg_path(binary)
        .allow_fail()
        .run()
        .map_err(|err| DependencyError(format!("{err:#}")))?;
    scan_report(&result)
}

/// Extract dependency paths from a captured reporter invocation.
///
/// A nonzero exit with a diagnostic on stderr is an error. A nonzero exit
/// with *empty* stderr is a statically linked binary: some reporters exit
/// nonzero for those while printing nothing, and that is a success with no
/// dependencies.
pub fn scan_report(result: &CommandResult) -> Result<Vec<String>, DependencyError> {
    if result.success() {
        return Ok(parse_ldd_output(&result.stdout));
    }

    let diagnostic = result.stderr_trimmed();
    if diagnostic.is_empty() {
        Ok(Vec::new())
    } else {
        Err(DependencyError(diagnostic.to_string()))
    }
}

/// Parse ldd-style output: per line, the first token starting with `/` up
/// to the next whitespace is an absolute dependency path. Lines with no
/// absolute path ("not found", the vdso entry) contribute nothing.
///
/// Example:
/// ```text
///     linux-vdso.so.1 (0x00007ffee9bfe000)
///     libc.so.6 => /lib64/libc.so.6 (0x00007f1234000000)
///     /lib64/ld-linux-x86-64.so.2 (0x00007f1234500000)
/// ```
pub fn parse_ldd_output(output: &str) -> Vec<String> {
    let mut paths = Vec::new();

    for line in output.lines() {
        if let Some(slash) = line.find('/') {
            let rest = &line[slash..];
            let end = rest
                .find(|c: char| c.is_whitespace())
                .unwrap_or(rest.len());
            paths.push(rest[..end].to_string());
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn report(code: i32, stdout: &str, stderr: &str) -> CommandResult {
        CommandResult {
            status: ExitStatus::from_raw(code << 8),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_parse_ldd_standard_format() {
        let output = r#"
        linux-vdso.so.1 (0x00007ffee9bfe000)
        libc.so.6 => /lib64/libc.so.6 (0x00007f1234000000)
        /lib64/ld-linux-x86-64.so.2 (0x00007f1234500000)
    "#;

        let libs = parse_ldd_output(output);

        assert_eq!(
            libs,
            vec!["/lib64/libc.so.6", "/lib64/ld-linux-x86-64.so.2"]
        );
    }

    #[test]
    fn test_parse_ldd_not_found_lines_skipped() {
        let output = r#"
        libfoo.so.1 => not found
        libc.so.6 => /lib64/libc.so.6 (0x00007f1234000000)
    "#;

        let libs = parse_ldd_output(output);

        assert_eq!(libs, vec!["/lib64/libc.so.6"]);
    }

    #[test]
    fn test_parse_ldd_empty_output() {
        assert!(parse_ldd_output("").is_empty());
    }

    #[test]
    fn test_parse_ldd_statically_linked() {
        let libs = parse_ldd_output("    not a dynamic executable");
        assert!(libs.is_empty());
    }

    #[test]
    fn test_parse_ldd_preserves_duplicates() {
        let output = "\t/lib/libc.so.6 (0x1)\n\t/lib/libc.so.6 (0x1)\n";
        let libs = parse_ldd_output(output);
        assert_eq!(libs, vec!["/lib/libc.so.6", "/lib/libc.so.6"]);
    }

    #[test]
    fn test_scan_report_success() {
        let result = report(0, "\tlibc.so.6 => /lib/libc.so.6 (0x1)\n", "");
        assert_eq!(scan_report(&result).unwrap(), vec!["/lib/libc.so.6"]);
    }

    #[test]
    fn test_scan_report_nonzero_empty_stderr_is_static() {
        let result = report(1, "", "");
        assert!(scan_report(&result).unwrap().is_empty());
    }

    #[test]
    fn test_scan_report_nonzero_with_diagnostic() {
        let result = report(1, "", "ldd: /bin/frob: No such file or directory\n");
        let err = scan_report(&result).unwrap_err();
        assert!(err.to_string().contains("No such file or directory"));
        // The diagnostic is trimmed.
        assert!(!err.to_string().ends_with('\n'));
    }
}
