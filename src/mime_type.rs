//! Interned MIME type names.
//!
//! A [`MimeType`] is an immutable, reference-counted `kind/subkind` string.
//! Names are lowercased at construction so equality and hashing are plain
//! string operations; comparison of MIME types is ASCII case-insensitive by
//! convention and this bakes that in.

use crate::grammar::is_valid_mime_type;
use once_cell::sync::Lazy;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// The conventional fallback for content of unknown type.
pub static OCTET_STREAM: Lazy<MimeType> =
    Lazy::new(|| MimeType::new_unchecked("application/octet-stream"));

/// The conventional fallback for content that looks like text.
pub static TEXT_PLAIN: Lazy<MimeType> = Lazy::new(|| MimeType::new_unchecked("text/plain"));

/// An interned MIME type name such as `text/plain`.
///
/// Cloning is cheap (an `Arc` bump). The stored form is always lowercase, so
/// `==`, `Ord` and `Hash` all behave case-insensitively with respect to the
/// original spelling.
///
/// # Examples
///
/// ```
/// use mimeinfo::MimeType;
///
/// let a = MimeType::parse("Text/Plain").unwrap();
/// let b = MimeType::parse("text/plain").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "text/plain");
/// assert!(MimeType::parse("not a type").is_none());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MimeType(Arc<str>);

impl MimeType {
    /// Parses and validates a MIME type name, lowercasing it.
    ///
    /// Returns `None` when the name is not a structurally valid
    /// `kind/subkind` pair of RFC 2045 tokens.
    pub fn parse(name: &str) -> Option<MimeType> {
        if is_valid_mime_type(name) {
            Some(Self::new_unchecked(name))
        } else {
            None
        }
    }

    /// Builds a MimeType from a name already known to be well-formed
    /// (e.g. decoded from a cache file where a malformed name is handled
    /// by the caller, or a compile-time constant).
    pub(crate) fn new_unchecked(name: &str) -> MimeType {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            MimeType(Arc::from(name.to_ascii_lowercase().as_str()))
        } else {
            MimeType(Arc::from(name))
        }
    }

    /// The canonical (lowercase) name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `kind` half of the name, e.g. `text` for `text/plain`.
    pub fn media(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// The `subkind` half of the name, e.g. `plain` for `text/plain`.
    pub fn subtype(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or("")
    }

    /// Whether both names share the same `kind` half, ignoring subtypes.
    ///
    /// # Examples
    ///
    /// ```
    /// use mimeinfo::MimeType;
    ///
    /// let html = MimeType::parse("text/html").unwrap();
    /// let plain = MimeType::parse("text/plain").unwrap();
    /// let png = MimeType::parse("image/png").unwrap();
    /// assert!(html.media_type_equal(&plain));
    /// assert!(!html.media_type_equal(&png));
    /// ```
    pub fn media_type_equal(&self, other: &MimeType) -> bool {
        self.media() == other.media()
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MimeType({})", self.0)
    }
}

impl Borrow<str> for MimeType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MimeType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
