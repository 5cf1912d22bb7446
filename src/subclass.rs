//! Alias resolution and parent-type ("is-a") queries.
//!
//! Aliases resolve in exactly one table lookup: a well-formed cache never
//! maps an alias to another alias, and a malformed one that does simply gets
//! one hop, not a walk. Parent graphs come from untrusted cache data and may
//! contain cycles, so every walk carries a visited set and terminates in
//! bounded time regardless.

use crate::cache::Cache;
use crate::mime_type::MimeType;
use std::collections::HashSet;
use std::sync::Arc;

/// Resolves `t` through the alias tables, returning it unchanged when no
/// cache knows it as an alias. Single hop by construction: the result is
/// never re-resolved, so resolution is idempotent.
pub(crate) fn resolve_alias(t: &MimeType, caches: &[Arc<Cache>]) -> MimeType {
    for cache in caches {
        if let Some(canonical) = cache.aliases.get(t) {
            return canonical.clone();
        }
    }
    t.clone()
}

/// The immediate parents of `t` across the cache set, deduplicated, in
/// cache order.
pub(crate) fn parents_of(t: &MimeType, caches: &[Arc<Cache>]) -> Vec<MimeType> {
    let resolved = resolve_alias(t, caches);
    let mut out = Vec::new();
    for cache in caches {
        if let Some(parents) = cache.parents.get(&resolved) {
            for p in parents {
                if !out.contains(p) {
                    out.push(p.clone());
                }
            }
        }
    }
    out
}

/// Whether `child` is `ancestor` or has it among its transitive parents.
///
/// Both sides are unaliased first, so `is_subclass` of an alias behaves as
/// the canonical name would. Reflexive: every type is a subclass of itself.
/// Only explicit parent edges are walked; no type string is special-cased.
pub(crate) fn is_subclass(child: &MimeType, ancestor: &MimeType, caches: &[Arc<Cache>]) -> bool {
    let child = resolve_alias(child, caches);
    let ancestor = resolve_alias(ancestor, caches);
    if child == ancestor {
        return true;
    }

    // Iterative walk with a visited set: a cyclic or adversarial parent
    // graph yields a deterministic answer instead of hanging.
    let mut visited: HashSet<MimeType> = HashSet::new();
    let mut stack = vec![child];
    while let Some(current) = stack.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        for cache in caches {
            if let Some(parents) = cache.parents.get(&current) {
                for p in parents {
                    if *p == ancestor {
                        return true;
                    }
                    if !visited.contains(p) {
                        stack.push(p.clone());
                    }
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CacheWriter;

    fn t(s: &str) -> MimeType {
        MimeType::parse(s).unwrap()
    }

    fn cache(w: &CacheWriter) -> Vec<Arc<Cache>> {
        vec![Arc::new(Cache::from_bytes(&w.finish(), "sub.cache").unwrap())]
    }

    #[test]
    fn test_resolve_alias() {
        let mut w = CacheWriter::new();
        w.add_alias("application/x-foo", "application/foo");
        let caches = cache(&w);

        assert_eq!(
            resolve_alias(&t("application/x-foo"), &caches),
            t("application/foo")
        );
        // Unknown names pass through unchanged
        assert_eq!(resolve_alias(&t("image/png"), &caches), t("image/png"));
    }

    #[test]
    fn test_resolve_alias_idempotent() {
        let mut w = CacheWriter::new();
        w.add_alias("text/x-markdown", "text/markdown");
        let caches = cache(&w);

        let once = resolve_alias(&t("text/x-markdown"), &caches);
        let twice = resolve_alias(&once, &caches);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_alias_chain_gets_one_hop() {
        // A malformed cache where the canonical side is itself an alias:
        // resolution still terminates after a single lookup.
        let mut w = CacheWriter::new();
        w.add_alias("a/one", "a/two");
        w.add_alias("a/two", "a/three");
        let caches = cache(&w);

        assert_eq!(resolve_alias(&t("a/one"), &caches), t("a/two"));
    }

    #[test]
    fn test_is_subclass_reflexive() {
        let caches = cache(&CacheWriter::new());
        assert!(is_subclass(&t("text/plain"), &t("text/plain"), &caches));
        assert!(is_subclass(&t("x/y"), &t("x/y"), &[]));
    }

    #[test]
    fn test_is_subclass_walks_edges() {
        let mut w = CacheWriter::new();
        w.add_parent("text/html", &["text/plain"]);
        w.add_parent("text/plain", &["application/octet-stream"]);
        let caches = cache(&w);

        assert!(is_subclass(&t("text/html"), &t("text/plain"), &caches));
        assert!(is_subclass(
            &t("text/html"),
            &t("application/octet-stream"),
            &caches
        ));
        assert!(!is_subclass(&t("text/plain"), &t("text/html"), &caches));
        assert!(!is_subclass(&t("image/png"), &t("text/plain"), &caches));
    }

    #[test]
    fn test_is_subclass_multiple_parents() {
        let mut w = CacheWriter::new();
        w.add_parent("application/x-sqlite3", &["application/octet-stream", "application/vnd.sqlite3"]);
        let caches = cache(&w);

        assert!(is_subclass(
            &t("application/x-sqlite3"),
            &t("application/vnd.sqlite3"),
            &caches
        ));
    }

    #[test]
    fn test_is_subclass_unaliases_both_sides() {
        let mut w = CacheWriter::new();
        w.add_alias("text/x-html", "text/html");
        w.add_parent("text/html", &["text/plain"]);
        let caches = cache(&w);

        assert!(is_subclass(&t("text/x-html"), &t("text/plain"), &caches));
    }

    #[test]
    fn test_is_subclass_survives_cycles() {
        let mut w = CacheWriter::new();
        w.add_parent("a/b", &["c/d"]);
        w.add_parent("c/d", &["a/b"]);
        let caches = cache(&w);

        // Deterministic answers in bounded time, repeated calls agree
        for _ in 0..3 {
            assert!(is_subclass(&t("a/b"), &t("c/d"), &caches));
            assert!(is_subclass(&t("c/d"), &t("a/b"), &caches));
            assert!(!is_subclass(&t("a/b"), &t("x/y"), &caches));
        }
    }

    #[test]
    fn test_parents_of() {
        let mut w = CacheWriter::new();
        w.add_parent("text/html", &["text/plain", "application/xml"]);
        let caches = cache(&w);

        assert_eq!(
            parents_of(&t("text/html"), &caches),
            vec![t("text/plain"), t("application/xml")]
        );
        assert!(parents_of(&t("image/png"), &caches).is_empty());
    }
}
