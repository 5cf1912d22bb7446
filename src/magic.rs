//! Content-signature ("magic") matching.
//!
//! Rules are evaluated against a bounded prefix of file content, highest
//! priority first; the first rule that matches wins. A rule holds one or
//! more matchlets: a matchlet matches when its (optionally masked) value is
//! found at some offset in its configured window, and all of its child
//! matchlets match as well. Matching is a pure function of the buffer and
//! the loaded caches: no state is carried between calls, and nothing here
//! can fail.

use crate::cache::Cache;
use crate::mime_type::MimeType;
use std::sync::Arc;

/// One signature rule: a type, a priority (0-100) and the matchlets that
/// can prove it.
#[derive(Clone, Debug)]
pub(crate) struct MagicRule {
    pub priority: u32,
    pub mime: MimeType,
    pub matchlets: Vec<MagicMatchlet>,
}

/// One byte-range condition. The value is probed at every offset in
/// `[range_start, range_start + range_length)`; the mask, when present, is
/// applied to both sides of the comparison. Word-order swaps for multi-byte
/// values were already applied when the cache was decoded.
#[derive(Clone, Debug)]
pub(crate) struct MagicMatchlet {
    pub range_start: usize,
    pub range_length: usize,
    pub value: Box<[u8]>,
    pub mask: Option<Box<[u8]>>,
    pub children: Vec<MagicMatchlet>,
}

impl MagicMatchlet {
    /// How far into a buffer this matchlet (including children) can read.
    pub(crate) fn extent(&self) -> usize {
        let own = self.range_start + self.range_length + self.value.len();
        self.children
            .iter()
            .map(MagicMatchlet::extent)
            .fold(own, usize::max)
    }

    /// Whether the value occurs at any offset of the window, under the mask.
    fn value_found(&self, buf: &[u8]) -> bool {
        for offset in self.range_start..self.range_start + self.range_length {
            let Some(window) = buf.get(offset..offset + self.value.len()) else {
                // Out of buffer; every later offset is too.
                return false;
            };
            let hit = match &self.mask {
                Some(mask) => window
                    .iter()
                    .zip(self.value.iter())
                    .zip(mask.iter())
                    .all(|((&b, &v), &m)| b & m == v & m),
                None => window == &*self.value,
            };
            if hit {
                return true;
            }
        }
        false
    }

    /// A matchlet is satisfied when its own value is found and every child
    /// is satisfied against the same buffer.
    fn matches(&self, buf: &[u8]) -> bool {
        self.value_found(buf) && self.children.iter().all(|c| c.matches(buf))
    }
}

impl MagicRule {
    /// A rule matches when any one of its matchlets does.
    fn matches(&self, buf: &[u8]) -> bool {
        self.matchlets.iter().any(|m| m.matches(buf))
    }
}

/// Runs every magic rule across the cache set against `buf`, returning the
/// type of the best match, or `None` when nothing matches.
///
/// Priority decides between rules; ties go to the earlier cache, then to
/// encoding order within a cache, so repeated calls are deterministic. The
/// replacement test is strict-greater, which is what makes the tie-break
/// stable while still letting a later cache's higher-priority rule win.
pub(crate) fn match_data(buf: &[u8], caches: &[Arc<Cache>]) -> Option<MimeType> {
    let mut best: Option<(u32, &MagicRule)> = None;
    for cache in caches {
        for rule in &cache.magic {
            if let Some((best_priority, _)) = best {
                if rule.priority <= best_priority {
                    continue;
                }
            }
            if rule.matches(buf) {
                best = Some((rule.priority, rule));
            }
        }
    }
    best.map(|(_, rule)| rule.mime.clone())
}

/// The largest prefix any rule across the cache set can examine. Callers
/// reading file content for sniffing need at most this many bytes.
pub(crate) fn max_extent(caches: &[Arc<Cache>]) -> usize {
    caches.iter().map(|c| c.max_magic_extent()).max().unwrap_or(0)
}

/// Whether a content prefix looks like text: valid UTF-8 (ignoring a
/// truncated trailing code point) containing no control bytes other than
/// whitespace and escape. Used as the last-resort fallback when neither
/// globs nor magic recognize the content.
pub(crate) fn looks_like_text(buf: &[u8]) -> bool {
    if buf.is_empty() {
        return true;
    }
    // The prefix may end mid-code-point; an incomplete sequence at the very
    // end is tolerated, invalid bytes anywhere else are not.
    let text = match std::str::from_utf8(buf) {
        Ok(text) => text,
        Err(e) if e.error_len().is_none() => {
            match std::str::from_utf8(&buf[..e.valid_up_to()]) {
                Ok(text) => text,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };
    text.chars()
        .all(|c| c >= ' ' || matches!(c, '\t' | '\n' | '\r' | '\x0c' | '\x1b'))
}
