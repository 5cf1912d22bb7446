//! Loading and decoding of binary MIME-info cache files.
//!
//! A cache file is the pre-built form of one installed MIME database
//! (`mime.cache`, format version 1.2). The loader memory-maps the file,
//! validates the header and every section offset against the buffer bounds,
//! and decodes the tables into an immutable [`Cache`] the matchers operate
//! on. Cache files are ordinary filesystem content and may be stale, corrupt
//! or adversarial: anything structurally wrong fails the load with a typed
//! error, while a bad string or rule payload inside an otherwise sound table
//! only drops that entry.
//!
//! All integers in the file are big-endian. Strings are NUL-terminated at
//! their recorded offset; magic values and masks carry an explicit length.

mod view;

use crate::error::{Error, Result};
use crate::glob::{GlobEntry, LiteralEntry, SuffixEntry};
use crate::magic::{MagicMatchlet, MagicRule};
use crate::mime_type::MimeType;
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use view::CacheView;

/// The one major.minor pair this engine understands.
const MAJOR_VERSION: u16 = 1;
const MINOR_VERSION: u16 = 2;

/// Size of the fixed header: two CARD16 version words plus nine CARD32
/// section offsets.
const HEADER_LEN: usize = 40;

/// Suffix-tree nodes deeper than this are dropped rather than followed.
const MAX_SUFFIX_DEPTH: u32 = 128;

/// Magic matchlet trees deeper than this are truncated.
const MAX_MATCHLET_DEPTH: u32 = 32;

const ALIAS_ENTRY: u32 = 8;
const PARENT_ENTRY: u32 = 8;
const LITERAL_ENTRY: u32 = 12;
const GLOB_ENTRY: u32 = 12;
const SUFFIX_NODE: u32 = 12;
const MAGIC_MATCH: u32 = 16;
const MAGIC_MATCHLET: u32 = 32;
const ICON_ENTRY: u32 = 8;

/// An immutable, fully validated snapshot of one MIME database.
///
/// A `Cache` never changes after [`Cache::load`] returns; any number of
/// threads may match against it concurrently. Reloading a database means
/// loading a fresh `Cache` and swapping the reference (see
/// [`Engine::reload`](crate::Engine::reload)).
pub struct Cache {
    path: PathBuf,
    pub(crate) aliases: HashMap<MimeType, MimeType>,
    pub(crate) parents: HashMap<MimeType, Vec<MimeType>>,
    /// Literal filename entries, keyed exactly as stored.
    pub(crate) literals: HashMap<String, Vec<LiteralEntry>>,
    /// Case-insensitive literal entries only, keyed lowercased.
    pub(crate) literals_fold: HashMap<String, Vec<LiteralEntry>>,
    /// Suffix entries keyed by the full suffix including its leading dot.
    pub(crate) suffixes: HashMap<String, Vec<SuffixEntry>>,
    /// Case-insensitive suffix entries only, keyed lowercased.
    pub(crate) suffixes_fold: HashMap<String, Vec<SuffixEntry>>,
    /// Full-wildcard patterns in registration order.
    pub(crate) globs: Vec<GlobEntry>,
    /// Magic rules exactly in encoded (priority-sorted) order.
    pub(crate) magic: Vec<MagicRule>,
    magic_max_extent: usize,
    pub(crate) icons: HashMap<MimeType, String>,
    pub(crate) generic_icons: HashMap<MimeType, String>,
}

impl Cache {
    /// Maps the cache file at `path` and decodes it.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be opened or mapped,
    /// [`Error::Format`] if it is structurally not a cache file,
    /// [`Error::Version`] for an unsupported version and
    /// [`Error::Truncated`] when a section offset points outside the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Cache> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // Safety: the mapping is read-only and lives only for the duration
        // of the decode; a concurrent writer can corrupt the bytes we read,
        // which the decoder treats the same as a corrupt file on disk.
        let map = unsafe { Mmap::map(&file)? };
        Self::from_bytes(&map, path)
    }

    /// Decodes a cache from an in-memory buffer. `path` labels errors and
    /// log lines only.
    pub fn from_bytes(buf: &[u8], path: impl AsRef<Path>) -> Result<Cache> {
        let path = path.as_ref();
        let view = CacheView::new(buf, path);

        if buf.len() < HEADER_LEN {
            return Err(view.format_error(format!(
                "{} bytes is too short for a cache header",
                buf.len()
            )));
        }
        let major = view.u16_at(0, "header")?;
        let minor = view.u16_at(2, "header")?;
        if major != MAJOR_VERSION || minor != MINOR_VERSION {
            return Err(Error::Version {
                path: path.to_path_buf(),
                major,
                minor,
            });
        }

        let alias_off = view.u32_at(4, "header")?;
        let parent_off = view.u32_at(8, "header")?;
        let literal_off = view.u32_at(12, "header")?;
        let suffix_off = view.u32_at(16, "header")?;
        let glob_off = view.u32_at(20, "header")?;
        let magic_off = view.u32_at(24, "header")?;
        // Namespace section: present in the format, not consumed here.
        let _namespace_off = view.u32_at(28, "header")?;
        let icons_off = view.u32_at(32, "header")?;
        let generic_icons_off = view.u32_at(36, "header")?;

        let aliases = decode_aliases(&view, alias_off)?;
        let parents = decode_parents(&view, parent_off)?;
        let (literals, literals_fold) = decode_literals(&view, literal_off)?;
        let (suffixes, suffixes_fold) = decode_suffix_tree(&view, suffix_off)?;
        let globs = decode_globs(&view, glob_off)?;
        let (magic, magic_max_extent) = decode_magic(&view, magic_off)?;
        let icons = decode_icons(&view, icons_off, "icon list")?;
        let generic_icons = decode_icons(&view, generic_icons_off, "generic icon list")?;

        debug!(
            path = %path.display(),
            aliases = aliases.len(),
            parents = parents.len(),
            literals = literals.len(),
            suffixes = suffixes.len(),
            globs = globs.len(),
            magic_rules = magic.len(),
            "loaded MIME cache"
        );

        Ok(Cache {
            path: path.to_path_buf(),
            aliases,
            parents,
            literals,
            literals_fold,
            suffixes,
            suffixes_fold,
            globs,
            magic,
            magic_max_extent,
            icons,
            generic_icons,
        })
    }

    /// The path this cache was loaded from (a label for in-memory caches).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The largest content prefix any magic rule in this cache can examine.
    /// Callers sizing a read buffer need at most this many bytes.
    pub fn max_magic_extent(&self) -> usize {
        self.magic_max_extent
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("path", &self.path)
            .field("aliases", &self.aliases.len())
            .field("literals", &self.literals.len())
            .field("suffixes", &self.suffixes.len())
            .field("globs", &self.globs.len())
            .field("magic_rules", &self.magic.len())
            .finish()
    }
}

/// Validates a table count against the buffer size before anything is
/// allocated for it. A count that could not possibly fit is structural
/// corruption, not a skippable entry.
fn check_count(view: &CacheView<'_>, n: u32, entry_size: u32, offset: u32, section: &'static str) -> Result<()> {
    if (n as u64) * (entry_size as u64) > view.len() as u64 {
        return Err(Error::Truncated {
            path: view.path().to_path_buf(),
            section,
            offset: offset as u64,
        });
    }
    Ok(())
}

fn weight_of(word: u32) -> u32 {
    (word & 0xff).min(100)
}

fn case_sensitive_of(word: u32) -> bool {
    word & 0x100 != 0
}

/// Reads the MIME type name at `type_off`, dropping the entry on a dangling
/// or malformed name.
fn mime_at(view: &CacheView<'_>, type_off: u32, section: &'static str) -> Option<MimeType> {
    match view.str_at(type_off).and_then(MimeType::parse) {
        Some(m) => Some(m),
        None => {
            warn!(
                path = %view.path().display(),
                section,
                offset = type_off,
                "skipping entry with unreadable MIME type name"
            );
            None
        }
    }
}

fn decode_aliases(view: &CacheView<'_>, offset: u32) -> Result<HashMap<MimeType, MimeType>> {
    const SEC: &str = "alias list";
    let n = view.u32_at(offset, SEC)?;
    check_count(view, n, ALIAS_ENTRY, offset, SEC)?;
    let mut out = HashMap::with_capacity(n as usize);
    for i in 0..n {
        let entry = offset + 4 + i * ALIAS_ENTRY;
        let alias_off = view.u32_at(entry, SEC)?;
        let type_off = view.u32_at(entry + 4, SEC)?;
        let (Some(alias), Some(canonical)) = (mime_at(view, alias_off, SEC), mime_at(view, type_off, SEC)) else {
            continue;
        };
        out.insert(alias, canonical);
    }
    Ok(out)
}

fn decode_parents(view: &CacheView<'_>, offset: u32) -> Result<HashMap<MimeType, Vec<MimeType>>> {
    const SEC: &str = "parent list";
    let n = view.u32_at(offset, SEC)?;
    check_count(view, n, PARENT_ENTRY, offset, SEC)?;
    let mut out = HashMap::with_capacity(n as usize);
    for i in 0..n {
        let entry = offset + 4 + i * PARENT_ENTRY;
        let type_off = view.u32_at(entry, SEC)?;
        let parents_off = view.u32_at(entry + 4, SEC)?;
        let Some(child) = mime_at(view, type_off, SEC) else {
            continue;
        };
        let k = view.u32_at(parents_off, SEC)?;
        check_count(view, k, 4, parents_off, SEC)?;
        let mut parents = Vec::with_capacity(k as usize);
        for j in 0..k {
            let parent_off = view.u32_at(parents_off + 4 + j * 4, SEC)?;
            if let Some(parent) = mime_at(view, parent_off, SEC) {
                parents.push(parent);
            }
        }
        if !parents.is_empty() {
            out.insert(child, parents);
        }
    }
    Ok(out)
}

type LiteralTables = (
    HashMap<String, Vec<LiteralEntry>>,
    HashMap<String, Vec<LiteralEntry>>,
);

fn decode_literals(view: &CacheView<'_>, offset: u32) -> Result<LiteralTables> {
    const SEC: &str = "literal list";
    let n = view.u32_at(offset, SEC)?;
    check_count(view, n, LITERAL_ENTRY, offset, SEC)?;
    let mut exact: HashMap<String, Vec<LiteralEntry>> = HashMap::new();
    let mut fold: HashMap<String, Vec<LiteralEntry>> = HashMap::new();
    for i in 0..n {
        let entry = offset + 4 + i * LITERAL_ENTRY;
        let literal_off = view.u32_at(entry, SEC)?;
        let type_off = view.u32_at(entry + 4, SEC)?;
        let word = view.u32_at(entry + 8, SEC)?;
        let Some(literal) = view.str_at(literal_off) else {
            warn!(path = %view.path().display(), offset = literal_off, "skipping literal with unreadable pattern");
            continue;
        };
        let Some(mime) = mime_at(view, type_off, SEC) else {
            continue;
        };
        let le = LiteralEntry {
            literal: literal.to_string(),
            mime,
            weight: weight_of(word),
            case_sensitive: case_sensitive_of(word),
        };
        if !le.case_sensitive {
            fold.entry(literal.to_lowercase()).or_default().push(le.clone());
        }
        exact.entry(literal.to_string()).or_default().push(le);
    }
    Ok((exact, fold))
}

type SuffixTables = (
    HashMap<String, Vec<SuffixEntry>>,
    HashMap<String, Vec<SuffixEntry>>,
);

fn decode_suffix_tree(view: &CacheView<'_>, offset: u32) -> Result<SuffixTables> {
    const SEC: &str = "suffix tree";
    let n_roots = view.u32_at(offset, SEC)?;
    let first_root = view.u32_at(offset + 4, SEC)?;
    check_count(view, n_roots, SUFFIX_NODE, offset, SEC)?;
    let mut entries = Vec::new();
    let mut reversed = Vec::new();
    // A legitimate tree stores every node once, so it cannot hold more
    // nodes than fit in the file; a crafted file aliasing child groups
    // could otherwise blow the walk up combinatorially.
    let mut budget = (view.len() / SUFFIX_NODE as usize) as u64 + 1;
    for i in 0..n_roots {
        decode_suffix_node(
            view,
            first_root + i * SUFFIX_NODE,
            &mut reversed,
            0,
            &mut budget,
            &mut entries,
        )?;
    }

    let mut exact: HashMap<String, Vec<SuffixEntry>> = HashMap::new();
    let mut fold: HashMap<String, Vec<SuffixEntry>> = HashMap::new();
    for entry in entries {
        if !entry.case_sensitive {
            fold.entry(entry.suffix.to_lowercase()).or_default().push(entry.clone());
        }
        exact.entry(entry.suffix.clone()).or_default().push(entry);
    }
    Ok((exact, fold))
}

/// Walks one node of the reversed-suffix tree. Characters accumulate in
/// `reversed` root-to-leaf; a leaf (character 0) re-reads its last two words
/// as the MIME type offset and weight, and records the suffix read back
/// front-to-back.
fn decode_suffix_node(
    view: &CacheView<'_>,
    offset: u32,
    reversed: &mut Vec<char>,
    depth: u32,
    budget: &mut u64,
    out: &mut Vec<SuffixEntry>,
) -> Result<()> {
    const SEC: &str = "suffix tree";
    if *budget == 0 {
        return Err(view.format_error("suffix tree holds more nodes than the file can contain"));
    }
    *budget -= 1;
    let character = view.u32_at(offset, SEC)?;
    if character == 0 {
        let type_off = view.u32_at(offset + 4, SEC)?;
        let word = view.u32_at(offset + 8, SEC)?;
        if let Some(mime) = mime_at(view, type_off, SEC) {
            let suffix: String = reversed.iter().rev().collect();
            out.push(SuffixEntry {
                suffix,
                mime,
                weight: weight_of(word),
                case_sensitive: case_sensitive_of(word),
            });
        }
        return Ok(());
    }

    let Some(c) = char::from_u32(character) else {
        warn!(path = %view.path().display(), offset, character, "skipping suffix node with invalid character");
        return Ok(());
    };
    if depth >= MAX_SUFFIX_DEPTH {
        warn!(path = %view.path().display(), offset, "suffix tree deeper than limit, pruning");
        return Ok(());
    }
    let n_children = view.u32_at(offset + 4, SEC)?;
    let first_child = view.u32_at(offset + 8, SEC)?;
    check_count(view, n_children, SUFFIX_NODE, offset, SEC)?;
    reversed.push(c);
    for i in 0..n_children {
        decode_suffix_node(view, first_child + i * SUFFIX_NODE, reversed, depth + 1, budget, out)?;
    }
    reversed.pop();
    Ok(())
}

fn decode_globs(view: &CacheView<'_>, offset: u32) -> Result<Vec<GlobEntry>> {
    const SEC: &str = "glob list";
    let n = view.u32_at(offset, SEC)?;
    check_count(view, n, GLOB_ENTRY, offset, SEC)?;
    let mut out = Vec::with_capacity(n as usize);
    for i in 0..n {
        let entry = offset + 4 + i * GLOB_ENTRY;
        let glob_off = view.u32_at(entry, SEC)?;
        let type_off = view.u32_at(entry + 4, SEC)?;
        let word = view.u32_at(entry + 8, SEC)?;
        let Some(pattern) = view.str_at(glob_off) else {
            warn!(path = %view.path().display(), offset = glob_off, "skipping glob with unreadable pattern");
            continue;
        };
        let Some(mime) = mime_at(view, type_off, SEC) else {
            continue;
        };
        out.push(GlobEntry {
            pattern: pattern.to_string(),
            mime,
            weight: weight_of(word),
            case_sensitive: case_sensitive_of(word),
        });
    }
    Ok(out)
}

fn decode_magic(view: &CacheView<'_>, offset: u32) -> Result<(Vec<MagicRule>, usize)> {
    const SEC: &str = "magic list";
    let n = view.u32_at(offset, SEC)?;
    let mut max_extent = view.u32_at(offset + 4, SEC)? as usize;
    let first_match = view.u32_at(offset + 8, SEC)?;
    check_count(view, n, MAGIC_MATCH, offset, SEC)?;
    let mut rules = Vec::with_capacity(n as usize);
    // Same capacity argument as the suffix tree: a file cannot legitimately
    // encode more matchlets than fit in it, and aliased child pointers must
    // not turn decode into exponential work.
    let mut budget = (view.len() / MAGIC_MATCHLET as usize) as u64 + 1;
    for i in 0..n {
        let entry = first_match + i * MAGIC_MATCH;
        let priority = view.u32_at(entry, SEC)?;
        let type_off = view.u32_at(entry + 4, SEC)?;
        let n_matchlets = view.u32_at(entry + 8, SEC)?;
        let first_matchlet = view.u32_at(entry + 12, SEC)?;
        let Some(mime) = mime_at(view, type_off, SEC) else {
            continue;
        };
        check_count(view, n_matchlets, MAGIC_MATCHLET, entry, SEC)?;
        let mut matchlets = Vec::new();
        for j in 0..n_matchlets {
            if let Some(m) = decode_matchlet(view, first_matchlet + j * MAGIC_MATCHLET, 0, &mut budget)? {
                max_extent = max_extent.max(m.extent());
                matchlets.push(m);
            }
        }
        if matchlets.is_empty() {
            // A rule with no usable matchlets can never fire.
            warn!(path = %view.path().display(), mime = %mime, "skipping magic rule with no valid matchlets");
            continue;
        }
        rules.push(MagicRule {
            priority: priority.min(100),
            mime,
            matchlets,
        });
    }
    Ok((rules, max_extent))
}

/// Decodes one matchlet record. Returns `Ok(None)` when this matchlet is
/// individually corrupt (bad word size, dangling value offset) so the rest
/// of the rule list survives.
fn decode_matchlet(
    view: &CacheView<'_>,
    offset: u32,
    depth: u32,
    budget: &mut u64,
) -> Result<Option<MagicMatchlet>> {
    const SEC: &str = "magic list";
    if *budget == 0 {
        return Err(view.format_error("magic list holds more matchlets than the file can contain"));
    }
    *budget -= 1;
    let range_start = view.u32_at(offset, SEC)?;
    let range_length = view.u32_at(offset + 4, SEC)?;
    let word_size = view.u32_at(offset + 8, SEC)?;
    let value_length = view.u32_at(offset + 12, SEC)?;
    let value_off = view.u32_at(offset + 16, SEC)?;
    let mask_off = view.u32_at(offset + 20, SEC)?;
    let n_children = view.u32_at(offset + 24, SEC)?;
    let first_child = view.u32_at(offset + 28, SEC)?;

    if !matches!(word_size, 1 | 2 | 4) || value_length == 0 || value_length % word_size != 0 {
        warn!(path = %view.path().display(), offset, word_size, value_length, "skipping malformed matchlet");
        return Ok(None);
    }
    let Ok(value) = view.bytes_at(value_off, value_length, SEC) else {
        warn!(path = %view.path().display(), offset = value_off, "skipping matchlet with dangling value");
        return Ok(None);
    };
    let mut value = value.to_vec();
    let mask = if mask_off != 0 {
        let Ok(mask) = view.bytes_at(mask_off, value_length, SEC) else {
            warn!(path = %view.path().display(), offset = mask_off, "skipping matchlet with dangling mask");
            return Ok(None);
        };
        Some(mask.to_vec())
    } else {
        None
    };
    // Multi-byte values are stored as big-endian words; compare order is
    // little-endian, so swap once here instead of on every probe.
    if word_size > 1 {
        swap_words(&mut value, word_size as usize);
    }
    let mask = mask.map(|mut m| {
        if word_size > 1 {
            swap_words(&mut m, word_size as usize);
        }
        m.into_boxed_slice()
    });

    let mut children = Vec::new();
    if n_children > 0 {
        if depth >= MAX_MATCHLET_DEPTH {
            warn!(path = %view.path().display(), offset, "matchlet tree deeper than limit, pruning");
        } else {
            check_count(view, n_children, MAGIC_MATCHLET, offset, SEC)?;
            for i in 0..n_children {
                if let Some(child) = decode_matchlet(view, first_child + i * MAGIC_MATCHLET, depth + 1, budget)? {
                    children.push(child);
                }
            }
        }
    }

    Ok(Some(MagicMatchlet {
        range_start: range_start as usize,
        range_length: (range_length.max(1)) as usize,
        value: value.into_boxed_slice(),
        mask,
        children,
    }))
}

fn swap_words(bytes: &mut [u8], word_size: usize) {
    for word in bytes.chunks_exact_mut(word_size) {
        word.reverse();
    }
}

fn decode_icons(view: &CacheView<'_>, offset: u32, section: &'static str) -> Result<HashMap<MimeType, String>> {
    let n = view.u32_at(offset, section)?;
    check_count(view, n, ICON_ENTRY, offset, section)?;
    let mut out = HashMap::with_capacity(n as usize);
    for i in 0..n {
        let entry = offset + 4 + i * ICON_ENTRY;
        let type_off = view.u32_at(entry, section)?;
        let icon_off = view.u32_at(entry + 4, section)?;
        let Some(mime) = mime_at(view, type_off, section) else {
            continue;
        };
        let Some(icon) = view.str_at(icon_off) else {
            warn!(path = %view.path().display(), offset = icon_off, "skipping icon with unreadable name");
            continue;
        };
        out.insert(mime, icon.to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CacheWriter, MatchletSpec};

    fn t(s: &str) -> MimeType {
        MimeType::parse(s).unwrap()
    }

    #[test]
    fn test_short_buffer_is_format_error() {
        let err = Cache::from_bytes(&[0u8; 10], "short.cache").unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
        assert!(err.to_string().contains("short.cache"));
    }

    #[test]
    fn test_wrong_version_is_version_error() {
        let mut buf = CacheWriter::new().finish();
        buf[0..2].copy_from_slice(&2u16.to_be_bytes());
        let err = Cache::from_bytes(&buf, "v2.cache").unwrap_err();
        match err {
            Error::Version { major, minor, .. } => {
                assert_eq!(major, 2);
                assert_eq!(minor, MINOR_VERSION);
            }
            other => panic!("expected Version, got {other:?}"),
        }

        let mut buf = CacheWriter::new().finish();
        buf[2..4].copy_from_slice(&9u16.to_be_bytes());
        assert!(matches!(
            Cache::from_bytes(&buf, "v1.9.cache").unwrap_err(),
            Error::Version { minor: 9, .. }
        ));
    }

    #[test]
    fn test_section_offset_past_eof_is_truncated() {
        let mut buf = CacheWriter::new().finish();
        // Point the alias list far past the end of the buffer
        buf[4..8].copy_from_slice(&0x00ff_0000u32.to_be_bytes());
        let err = Cache::from_bytes(&buf, "trunc.cache").unwrap_err();
        match err {
            Error::Truncated { section, .. } => assert_eq!(section, "alias list"),
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn test_impossible_count_is_truncated() {
        let mut w = CacheWriter::new();
        w.add_alias("a/b", "c/d");
        let mut buf = w.finish();
        let alias_off = u32::from_be_bytes(buf[4..8].try_into().unwrap()) as usize;
        // Claim more entries than the file could possibly hold
        buf[alias_off..alias_off + 4].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            Cache::from_bytes(&buf, "count.cache").unwrap_err(),
            Error::Truncated { .. }
        ));
    }

    #[test]
    fn test_empty_cache_loads() {
        let cache = Cache::from_bytes(&CacheWriter::new().finish(), "empty.cache").unwrap();
        assert!(cache.aliases.is_empty());
        assert!(cache.literals.is_empty());
        assert!(cache.suffixes.is_empty());
        assert!(cache.globs.is_empty());
        assert!(cache.magic.is_empty());
        assert_eq!(cache.max_magic_extent(), 0);
    }

    #[test]
    fn test_tables_round_trip() {
        let mut w = CacheWriter::new();
        w.add_alias("application/x-foo", "application/foo");
        w.add_parent("text/html", &["text/plain"]);
        w.add_literal("Makefile", "text/x-makefile", 50, true);
        w.add_suffix(".tar.gz", "application/x-compressed-tar", 55, false);
        w.add_suffix(".gz", "application/gzip", 50, false);
        w.add_glob("Makefile.*", "text/x-makefile", 50, true);
        w.add_icon("text/html", "text-html");
        let cache = Cache::from_bytes(&w.finish(), "round.cache").unwrap();

        assert_eq!(
            cache.aliases.get(&t("application/x-foo")),
            Some(&t("application/foo"))
        );
        assert_eq!(
            cache.parents.get(&t("text/html")),
            Some(&vec![t("text/plain")])
        );
        let lit = &cache.literals["Makefile"][0];
        assert_eq!(lit.mime, t("text/x-makefile"));
        assert_eq!(lit.weight, 50);
        assert!(lit.case_sensitive);
        assert!(!cache.literals_fold.contains_key("makefile"));

        let tgz = &cache.suffixes[".tar.gz"][0];
        assert_eq!(tgz.mime, t("application/x-compressed-tar"));
        assert_eq!(tgz.weight, 55);
        assert!(cache.suffixes_fold.contains_key(".gz"));

        assert_eq!(cache.globs.len(), 1);
        assert_eq!(cache.globs[0].pattern, "Makefile.*");
        assert_eq!(cache.icons.get(&t("text/html")).unwrap(), "text-html");
    }

    #[test]
    fn test_shared_suffix_tree_prefixes() {
        // ".gz" is a stored-reversed prefix of ".tar.gz"; both must decode
        let mut w = CacheWriter::new();
        w.add_suffix(".gz", "application/gzip", 50, false);
        w.add_suffix(".tar.gz", "application/x-compressed-tar", 55, false);
        w.add_suffix(".tgz", "application/x-compressed-tar", 50, false);
        let cache = Cache::from_bytes(&w.finish(), "tree.cache").unwrap();

        assert_eq!(cache.suffixes.len(), 3);
        assert!(cache.suffixes.contains_key(".gz"));
        assert!(cache.suffixes.contains_key(".tar.gz"));
        assert!(cache.suffixes.contains_key(".tgz"));
    }

    #[test]
    fn test_corrupt_string_skips_entry_only() {
        let mut w = CacheWriter::new();
        w.add_alias("application/x-aaa", "application/aaa");
        w.add_alias("application/x-bbb", "application/bbb");
        let mut buf = w.finish();
        let alias_off = u32::from_be_bytes(buf[4..8].try_into().unwrap()) as usize;
        // Dangle the first alias entry's name offset; the second survives
        buf[alias_off + 4..alias_off + 8].copy_from_slice(&0x00ff_0000u32.to_be_bytes());
        let cache = Cache::from_bytes(&buf, "corrupt.cache").unwrap();
        assert_eq!(cache.aliases.len(), 1);
        assert_eq!(
            cache.aliases.get(&t("application/x-bbb")),
            Some(&t("application/bbb"))
        );
    }

    #[test]
    fn test_magic_round_trip_with_mask_and_children() {
        let mut w = CacheWriter::new();
        w.add_magic(
            "image/png",
            50,
            vec![MatchletSpec::new(0, 1, b"\x89PNG\r\n\x1a\n")],
        );
        w.add_magic(
            "application/x-thing",
            80,
            vec![MatchletSpec::new(0, 4, b"AB")
                .with_mask(b"\xff\xf0")
                .with_children(vec![MatchletSpec::new(8, 1, b"Z")])],
        );
        let cache = Cache::from_bytes(&w.finish(), "magic.cache").unwrap();

        // Encoded priority-descending
        assert_eq!(cache.magic.len(), 2);
        assert_eq!(cache.magic[0].priority, 80);
        assert_eq!(cache.magic[0].mime, t("application/x-thing"));
        let m = &cache.magic[0].matchlets[0];
        assert_eq!(&*m.value, b"AB");
        assert_eq!(m.mask.as_deref(), Some(&b"\xff\xf0"[..]));
        assert_eq!(m.children.len(), 1);
        assert_eq!(cache.magic[1].priority, 50);
    }

    #[test]
    fn test_word_size_values_are_swapped_at_decode() {
        // A 2-byte word stored big-endian (0x1234) must decode to the
        // little-endian compare order (0x34, 0x12)
        let mut w = CacheWriter::new();
        w.add_magic(
            "application/x-word",
            50,
            vec![MatchletSpec::new(0, 1, &[0x12, 0x34]).with_word_size(2)],
        );
        let cache = Cache::from_bytes(&w.finish(), "word.cache").unwrap();
        assert_eq!(&*cache.magic[0].matchlets[0].value, &[0x34, 0x12]);
    }

    #[test]
    fn test_bad_word_size_skips_matchlet() {
        let mut w = CacheWriter::new();
        w.add_magic(
            "application/x-bad",
            50,
            vec![MatchletSpec::new(0, 1, b"abc").with_word_size(3)],
        );
        w.add_magic("application/x-good", 40, vec![MatchletSpec::new(0, 1, b"ok")]);
        let cache = Cache::from_bytes(&w.finish(), "badword.cache").unwrap();
        // The malformed rule is dropped entirely, the good one survives
        assert_eq!(cache.magic.len(), 1);
        assert_eq!(cache.magic[0].mime, t("application/x-good"));
    }

    #[test]
    fn test_load_from_disk() {
        let mut w = CacheWriter::new();
        w.add_suffix(".txt", "text/plain", 50, false);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mime.cache");
        std::fs::write(&path, w.finish()).unwrap();

        let cache = Cache::load(&path).unwrap();
        assert_eq!(cache.path(), path.as_path());
        assert!(cache.suffixes.contains_key(".txt"));

        let err = Cache::load(dir.path().join("missing.cache")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
