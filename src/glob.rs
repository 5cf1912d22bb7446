//! Filename glob matching.
//!
//! Patterns come in three shapes, each with its own tier and algorithm:
//! exact literal filenames (hash lookup), `*.suffix` extensions (suffix
//! index walked longest-first) and general wildcard patterns (tested one by
//! one). All three tiers run for every query; candidates are merged and
//! ranked by weight, then by pattern length, so a literal hit and a suffix
//! hit can both compete and the more specific one wins a weight tie.

use crate::cache::Cache;
use crate::mime_type::MimeType;
use std::sync::Arc;

/// A literal-filename pattern, e.g. `Makefile`.
#[derive(Clone, Debug)]
pub(crate) struct LiteralEntry {
    pub literal: String,
    pub mime: MimeType,
    pub weight: u32,
    pub case_sensitive: bool,
}

/// A single-extension pattern, stored as its suffix, e.g. `.tar.gz`.
#[derive(Clone, Debug)]
pub(crate) struct SuffixEntry {
    pub suffix: String,
    pub mime: MimeType,
    pub weight: u32,
    pub case_sensitive: bool,
}

/// A general wildcard pattern, e.g. `Makefile.*` or `*.c??`.
#[derive(Clone, Debug)]
pub(crate) struct GlobEntry {
    pub pattern: String,
    pub mime: MimeType,
    pub weight: u32,
    pub case_sensitive: bool,
}

/// One filename-match candidate: the type, the pattern's weight, its length
/// (specificity) and whether the pattern matched case-sensitively, all used
/// for tie-breaking in that order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobCandidate {
    pub mime: MimeType,
    pub weight: u32,
    pub(crate) pattern_len: usize,
    pub(crate) case_sensitive: bool,
}

/// Collects every glob candidate for `name` across the cache set, ranked
/// weight-descending, then pattern-length-descending, then case-sensitive
/// before case-insensitive, preserving encounter order past that. Duplicate
/// types keep only their best-ranked entry.
///
/// Never fails: a filename matching nothing yields an empty list.
pub(crate) fn match_file_name(name: &str, caches: &[Arc<Cache>]) -> Vec<GlobCandidate> {
    let mut candidates = Vec::new();
    literal_tier(name, caches, &mut candidates);
    suffix_tier(name, caches, &mut candidates);
    full_glob_tier(name, caches, &mut candidates);

    candidates.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| b.pattern_len.cmp(&a.pattern_len))
            .then_with(|| b.case_sensitive.cmp(&a.case_sensitive))
    });
    // Stable sort keeps encounter order inside equal groups; now drop
    // lower-ranked duplicates of the same type.
    let mut seen: Vec<MimeType> = Vec::new();
    candidates.retain(|c| {
        if seen.contains(&c.mime) {
            false
        } else {
            seen.push(c.mime.clone());
            true
        }
    });
    candidates
}

/// The leading group of equally-plausible best candidates: all entries tied
/// with the head on weight, specificity and case-sensitivity. More than one
/// entry means the filename alone is ambiguous.
pub(crate) fn best_candidates(ranked: &[GlobCandidate]) -> &[GlobCandidate] {
    let Some(head) = ranked.first() else {
        return ranked;
    };
    let end = ranked
        .iter()
        .position(|c| {
            c.weight != head.weight
                || c.pattern_len != head.pattern_len
                || c.case_sensitive != head.case_sensitive
        })
        .unwrap_or(ranked.len());
    &ranked[..end]
}

fn literal_tier(name: &str, caches: &[Arc<Cache>], out: &mut Vec<GlobCandidate>) {
    for cache in caches {
        if let Some(entries) = cache.literals.get(name) {
            for e in entries {
                out.push(GlobCandidate {
                    mime: e.mime.clone(),
                    weight: e.weight,
                    pattern_len: e.literal.chars().count(),
                    case_sensitive: e.case_sensitive,
                });
            }
        }
    }
    // Case-insensitive retry, only over entries not marked case-sensitive.
    let lower = name.to_lowercase();
    for cache in caches {
        if let Some(entries) = cache.literals_fold.get(&lower) {
            for e in entries {
                out.push(GlobCandidate {
                    mime: e.mime.clone(),
                    weight: e.weight,
                    pattern_len: e.literal.chars().count(),
                    case_sensitive: false,
                });
            }
        }
    }
}

fn suffix_tier(name: &str, caches: &[Arc<Cache>], out: &mut Vec<GlobCandidate>) {
    let lower = name.to_lowercase();
    // Walk the extension chain longest suffix first: "a.tar.gz" tries
    // ".tar.gz" before ".gz". A leading dot participates too: a file named
    // exactly ".txt" carries the ".txt" suffix.
    for (i, _) in name.char_indices().filter(|&(_, c)| c == '.') {
        let suffix = &name[i..];
        for cache in caches {
            if let Some(entries) = cache.suffixes.get(suffix) {
                for e in entries {
                    out.push(GlobCandidate {
                        mime: e.mime.clone(),
                        weight: e.weight,
                        pattern_len: e.suffix.chars().count() + 1, // counts the "*"
                        case_sensitive: e.case_sensitive,
                    });
                }
            }
        }
    }
    for (i, _) in lower.char_indices().filter(|&(_, c)| c == '.') {
        let suffix = &lower[i..];
        for cache in caches {
            if let Some(entries) = cache.suffixes_fold.get(suffix) {
                for e in entries {
                    out.push(GlobCandidate {
                        mime: e.mime.clone(),
                        weight: e.weight,
                        pattern_len: e.suffix.chars().count() + 1,
                        case_sensitive: false,
                    });
                }
            }
        }
    }
}

fn full_glob_tier(name: &str, caches: &[Arc<Cache>], out: &mut Vec<GlobCandidate>) {
    for cache in caches {
        for e in &cache.globs {
            if glob_match(&e.pattern, name, e.case_sensitive) {
                out.push(GlobCandidate {
                    mime: e.mime.clone(),
                    weight: e.weight,
                    pattern_len: e.pattern.chars().count(),
                    case_sensitive: e.case_sensitive,
                });
            }
        }
    }
}

/// Matches `name` against a shell-style glob pattern.
///
/// `*` matches any run of characters (including none), `?` matches exactly
/// one character and `[...]` matches a character class, with ranges (`a-z`)
/// and leading `!` or `^` negation. An unterminated `[` matches itself
/// literally.
///
/// # Examples
///
/// ```
/// use mimeinfo::glob_match;
///
/// assert!(glob_match("*.tar.gz", "backup.tar.gz", true));
/// assert!(glob_match("Makefile.*", "Makefile.am", true));
/// assert!(glob_match("*.[ch]", "main.c", true));
/// assert!(!glob_match("*.[ch]", "main.rs", true));
/// assert!(glob_match("*.PNG", "shot.png", false));
/// ```
pub fn glob_match(pattern: &str, name: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        let p: Vec<char> = pattern.chars().collect();
        let n: Vec<char> = name.chars().collect();
        glob_match_chars(&p, &n)
    } else {
        let p: Vec<char> = pattern.to_lowercase().chars().collect();
        let n: Vec<char> = name.to_lowercase().chars().collect();
        glob_match_chars(&p, &n)
    }
}

/// Iterative fnmatch-style walk: one cursor per side, plus the position of
/// the most recent `*` so a mismatch re-expands that star by one character
/// instead of recursing. Worst case `pattern.len() * name.len()` steps and
/// constant stack, whatever an adversarial cache puts in a pattern.
fn glob_match_chars(pattern: &[char], name: &[char]) -> bool {
    let mut p = 0;
    let mut n = 0;
    // Pattern index just past the last '*' and the name index to retry from
    let mut retry: Option<(usize, usize)> = None;

    while n < name.len() {
        let matched = match pattern.get(p) {
            Some(&'*') => {
                retry = Some((p + 1, n));
                p += 1;
                continue;
            }
            Some(&'?') => true,
            Some(&'[') => match parse_class(&pattern[p..]) {
                Some((class, rest)) => {
                    if class.contains(name[n]) {
                        p = pattern.len() - rest.len();
                        n += 1;
                        continue;
                    }
                    false
                }
                // No closing bracket: literal '['
                None => name[n] == '[',
            },
            Some(&pc) => pc == name[n],
            None => false,
        };
        if matched {
            p += 1;
            n += 1;
        } else {
            let Some((after_star, from)) = retry else {
                return false;
            };
            p = after_star;
            n = from + 1;
            retry = Some((after_star, from + 1));
        }
    }
    // Name exhausted: only trailing stars may remain
    pattern[p..].iter().all(|&c| c == '*')
}

struct CharClass {
    negated: bool,
    singles: Vec<char>,
    ranges: Vec<(char, char)>,
}

impl CharClass {
    fn contains(&self, c: char) -> bool {
        let inside =
            self.singles.contains(&c) || self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        inside != self.negated
    }
}

/// Parses a `[...]` class starting at `pattern[0] == '['`, returning the
/// class and the rest of the pattern, or `None` when unterminated.
fn parse_class(pattern: &[char]) -> Option<(CharClass, &[char])> {
    let mut i = 1;
    let negated = matches!(pattern.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }
    let mut singles = Vec::new();
    let mut ranges = Vec::new();
    let mut first = true;
    loop {
        let &c = pattern.get(i)?;
        if c == ']' && !first {
            return Some((
                CharClass {
                    negated,
                    singles,
                    ranges,
                },
                &pattern[i + 1..],
            ));
        }
        first = false;
        // Range when the next char is '-' and a bound follows
        if let (Some('-'), Some(&hi)) = (pattern.get(i + 1), pattern.get(i + 2)) {
            if hi != ']' {
                ranges.push((c, hi));
                i += 3;
                continue;
            }
        }
        singles.push(c);
        i += 1;
    }
}
