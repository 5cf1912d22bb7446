//! Shared MIME-info cache matching engine with async-first file sniffing.
//!
//! This crate determines the MIME type of a file from its name and/or
//! content, consuming the pre-built binary cache form of the shared
//! MIME-info database:
//! - Filename glob matching (literal, extension and wildcard tiers) with
//!   weighted tie-breaking
//! - Content-signature ("magic") sniffing over a bounded prefix
//! - Alias canonicalization and subclass ("is-a") queries
//! - Icon name lookup
//!
//! Cache files are validated end to end at load time, so corrupt or
//! adversarial files fail the load with a typed error instead of risking
//! out-of-bounds reads during matching. Loaded caches are immutable and
//! queried lock-free from any number of threads; reloading swaps the whole
//! cache set atomically.
//!
//! File I/O for content sniffing is async using tokio; matching itself is
//! pure and synchronous.

pub mod cache;
pub mod engine;
pub mod error;
pub mod glob;
pub mod grammar;
mod magic;
pub mod mime_type;
mod subclass;

#[doc(hidden)]
pub mod test_support;

// Re-export commonly used types
pub use cache::Cache;
pub use engine::{Engine, HIGH_CONFIDENCE_WEIGHT};
pub use error::{Error, Result};
pub use glob::glob_match;
pub use mime_type::{MimeType, OCTET_STREAM, TEXT_PLAIN};
