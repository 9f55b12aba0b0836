//! dumprd library exports.
//!
//! The binary and the integration tests both build on these modules; the
//! core is the canonicalizer (`path`), the listing filters (`listdir`), the
//! dependency scanner (`deps`), and the closure installer (`install`)
//! feeding the cpio archive writer (`cpio`).

pub mod config;
pub mod cpio;
pub mod deps;
pub mod error;
pub mod install;
pub mod listdir;
pub mod manifest;
pub mod mount;
pub mod path;
pub mod process;
