//! Error types for the mimeinfo crate.
//!
//! Errors are only produced while loading or reloading cache files. Matching
//! operations are total: an unknown filename or unrecognized content is a
//! normal result (`None` / empty list), never an `Err`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the mimeinfo crate.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while reading or mapping a cache file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Structurally invalid cache file (too short, misaligned, not a cache)
    #[error("invalid cache file {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// Cache file version this engine does not understand
    #[error("unsupported cache version {major}.{minor} in {path}")]
    Version {
        path: PathBuf,
        major: u16,
        minor: u16,
    },

    /// A section offset or length points outside the cache file
    #[error("truncated cache file {path}: {section} at offset {offset:#x} is out of bounds")]
    Truncated {
        path: PathBuf,
        section: &'static str,
        offset: u64,
    },
}

/// Specialized Result type for mimeinfo operations.
pub type Result<T> = std::result::Result<T, Error>;
