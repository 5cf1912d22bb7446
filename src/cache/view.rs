//! Bounds-checked reads over a raw cache buffer.
//!
//! Every table and tree in a cache file is reached through offsets stored in
//! the file itself, so nothing here trusts an offset: each read is validated
//! against the buffer length and reports the section it was decoding when a
//! bound is exceeded. All integers are big-endian, the one byte order the
//! cache format uses.

use crate::error::{Error, Result};
use std::path::Path;

/// A read-only window over the raw bytes of one cache file.
///
/// `CacheView` carries the path purely for error reporting; it never touches
/// the filesystem.
pub(crate) struct CacheView<'a> {
    buf: &'a [u8],
    path: &'a Path,
}

impl<'a> CacheView<'a> {
    pub(crate) fn new(buf: &'a [u8], path: &'a Path) -> CacheView<'a> {
        CacheView { buf, path }
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn path(&self) -> &Path {
        self.path
    }

    fn truncated(&self, section: &'static str, offset: u32) -> Error {
        Error::Truncated {
            path: self.path.to_path_buf(),
            section,
            offset: offset as u64,
        }
    }

    pub(crate) fn format_error(&self, reason: impl Into<String>) -> Error {
        Error::Format {
            path: self.path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Reads a big-endian u16 at `offset`.
    pub(crate) fn u16_at(&self, offset: u32, section: &'static str) -> Result<u16> {
        let start = offset as usize;
        match self.buf.get(start..start + 2) {
            Some(b) => Ok(u16::from_be_bytes([b[0], b[1]])),
            None => Err(self.truncated(section, offset)),
        }
    }

    /// Reads a big-endian u32 at `offset`.
    pub(crate) fn u32_at(&self, offset: u32, section: &'static str) -> Result<u32> {
        let start = offset as usize;
        match self.buf.get(start..start + 4) {
            Some(b) => Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]])),
            None => Err(self.truncated(section, offset)),
        }
    }

    /// Reads `len` raw bytes starting at `offset` (magic values and masks,
    /// which carry an explicit length and are never NUL-terminated).
    pub(crate) fn bytes_at(&self, offset: u32, len: u32, section: &'static str) -> Result<&'a [u8]> {
        let start = offset as usize;
        let end = start.checked_add(len as usize).ok_or_else(|| self.truncated(section, offset))?;
        self.buf.get(start..end).ok_or_else(|| self.truncated(section, offset))
    }

    /// Reads the NUL-terminated UTF-8 string at `offset`.
    ///
    /// Returns `None` (rather than an error) when the offset is out of
    /// bounds, no terminator exists before end-of-buffer, or the bytes are
    /// not UTF-8: a bad string in one entry degrades to skipping that entry,
    /// it must not fail the whole load.
    pub(crate) fn str_at(&self, offset: u32) -> Option<&'a str> {
        let start = offset as usize;
        let tail = self.buf.get(start..)?;
        let nul = tail.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&tail[..nul]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn view(buf: &[u8]) -> CacheView<'_> {
        CacheView::new(buf, Path::new("test.cache"))
    }

    #[test]
    fn test_u16_u32_big_endian() {
        let buf = [0x00, 0x01, 0x00, 0x00, 0x00, 0x2a];
        let v = view(&buf);
        assert_eq!(v.u16_at(0, "header").unwrap(), 1);
        assert_eq!(v.u32_at(2, "header").unwrap(), 42);
    }

    #[test]
    fn test_out_of_bounds_is_truncated_error() {
        let buf = [0u8; 4];
        let v = view(&buf);
        let err = v.u32_at(2, "alias list").unwrap_err();
        match err {
            Error::Truncated { section, offset, path } => {
                assert_eq!(section, "alias list");
                assert_eq!(offset, 2);
                assert_eq!(path, PathBuf::from("test.cache"));
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn test_offset_overflow() {
        let buf = [0u8; 8];
        let v = view(&buf);
        assert!(v.bytes_at(u32::MAX, u32::MAX, "magic").is_err());
        assert!(v.u32_at(u32::MAX, "magic").is_err());
    }

    #[test]
    fn test_str_at() {
        let buf = b"text/plain\0junk";
        let v = view(buf);
        assert_eq!(v.str_at(0), Some("text/plain"));
        assert_eq!(v.str_at(5), Some("plain"));
    }

    #[test]
    fn test_str_at_degrades_to_none() {
        // No terminator before end of buffer
        let v = view(b"abc");
        assert_eq!(v.str_at(0), None);
        // Offset out of range
        assert_eq!(v.str_at(100), None);
        // Invalid UTF-8
        let bad = [0xff, 0xfe, 0x00];
        let v = view(&bad);
        assert_eq!(v.str_at(0), None);
    }

    #[test]
    fn test_bytes_at_exact_length() {
        let v = view(b"\x89PNG\r\n");
        assert_eq!(v.bytes_at(0, 4, "magic").unwrap(), b"\x89PNG");
        assert!(v.bytes_at(4, 4, "magic").is_err());
    }
}
