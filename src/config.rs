//! Configuration management for dumprd.
//!
//! Reads configuration from a .env file and environment variables;
//! environment variables take precedence over the .env file (the .env file
//! is loaded into the environment by `main` before this runs).

use std::env;
use std::path::PathBuf;

use crate::deps::DEFAULT_REPORTER;
use crate::install::DATA_DIRECTORY;

/// dumprd configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding fixed support assets (default: /usr/lib/dumprd).
    pub data_dir: PathBuf,
    /// Dependency reporter command (default: ldd).
    pub reporter: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Self {
        let data_dir = env::var("DUMPRD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DATA_DIRECTORY));

        let reporter =
            env::var("DUMPRD_REPORTER").unwrap_or_else(|_| DEFAULT_REPORTER.to_string());

        Self { data_dir, reporter }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  DUMPRD_DATA_DIR: {}", self.data_dir.display());
        println!("  DUMPRD_REPORTER: {}", self.reporter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_overrides() {
        env::remove_var("DUMPRD_DATA_DIR");
        env::remove_var("DUMPRD_REPORTER");
        let config = Config::load();
        assert_eq!(config.data_dir, PathBuf::from(DATA_DIRECTORY));
        assert_eq!(config.reporter, DEFAULT_REPORTER);

        env::set_var("DUMPRD_DATA_DIR", "/opt/dumprd-data");
        env::set_var("DUMPRD_REPORTER", "lddtree");
        let config = Config::load();
        assert_eq!(config.data_dir, PathBuf::from("/opt/dumprd-data"));
        assert_eq!(config.reporter, "lddtree");
        env::remove_var("DUMPRD_DATA_DIR");
        env::remove_var("DUMPRD_REPORTER");
    }
}
