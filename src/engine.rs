//! The engine facade: one handle over an ordered set of loaded caches.
//!
//! An [`Engine`] owns an immutable snapshot of every cache it was loaded
//! from and answers all query operations against that snapshot. Queries are
//! lock-free and safe to run from any number of threads; [`Engine::reload`]
//! builds a complete new snapshot and publishes it with a single atomic
//! swap, so in-flight queries always observe either the fully-old or the
//! fully-new cache set, never a mix.

use crate::cache::Cache;
use crate::error::Result;
use crate::glob;
use crate::magic;
use crate::mime_type::{MimeType, OCTET_STREAM, TEXT_PLAIN};
use crate::subclass;
use arc_swap::ArcSwap;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Glob weight at or above which a single unambiguous filename match is
/// trusted without looking at content.
pub const HIGH_CONFIDENCE_WEIGHT: u32 = 50;

/// Smallest content prefix [`Engine::read_prefix`] will request, even when
/// the loaded magic rules need less. Keeps headroom for the text/binary
/// fallback heuristic.
const MIN_SNIFF_LEN: usize = 16 * 1024;

struct EngineState {
    paths: Vec<PathBuf>,
    caches: Vec<Arc<Cache>>,
}

impl EngineState {
    fn load(paths: &[PathBuf]) -> Result<EngineState> {
        let mut caches = Vec::with_capacity(paths.len());
        for path in paths {
            caches.push(Arc::new(Cache::load(path)?));
        }
        debug!(caches = caches.len(), "engine cache set ready");
        Ok(EngineState {
            paths: paths.to_vec(),
            caches,
        })
    }
}

/// A loaded MIME database engine.
///
/// # Examples
///
/// ```no_run
/// use mimeinfo::{Engine, MimeType};
///
/// # fn main() -> mimeinfo::Result<()> {
/// let engine = Engine::load(["/usr/share/mime/mime.cache"])?;
/// let t = engine.type_for_file("notes.txt", None);
/// assert_eq!(t.as_str(), "text/plain");
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    state: ArcSwap<EngineState>,
}

impl Engine {
    /// Loads the cache files at `paths`, in precedence order (earlier paths
    /// win ties). An empty list yields an engine that knows nothing and
    /// falls back to the default type for every query.
    ///
    /// # Errors
    ///
    /// Any cache that cannot be read or validated fails the whole load; see
    /// [`Cache::load`] for the error taxonomy.
    pub fn load<I, P>(paths: I) -> Result<Engine>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        let state = EngineState::load(&paths)?;
        Ok(Engine {
            state: ArcSwap::from_pointee(state),
        })
    }

    /// Re-reads every cache file this engine was loaded from and atomically
    /// swaps the new snapshot in. On error the previous snapshot stays
    /// active and untouched.
    pub fn reload(&self) -> Result<()> {
        let paths = self.state.load().paths.clone();
        let fresh = EngineState::load(&paths)?;
        self.state.store(Arc::new(fresh));
        Ok(())
    }

    /// Every filename-glob candidate for `name`, best first, resolved
    /// through the alias tables. Candidates that unalias to the same
    /// canonical type keep only their best-ranked entry. Unknown names
    /// yield an empty list.
    pub fn mime_types_for_file_name(&self, name: &str) -> Vec<(MimeType, u32)> {
        let state = self.state.load();
        let mut out: Vec<(MimeType, u32)> = Vec::new();
        for c in glob::match_file_name(name, &state.caches) {
            let resolved = subclass::resolve_alias(&c.mime, &state.caches);
            if !out.iter().any(|(m, _)| *m == resolved) {
                out.push((resolved, c.weight));
            }
        }
        out
    }

    /// The single best glob match for `name`, or `None` when the name is
    /// unknown or ambiguous (several patterns tie on weight and
    /// specificity). Ambiguity is the caller's cue to sniff content.
    pub fn type_for_file_name(&self, name: &str) -> Option<MimeType> {
        let state = self.state.load();
        let ranked = glob::match_file_name(name, &state.caches);
        match glob::best_candidates(&ranked) {
            [single] => Some(subclass::resolve_alias(&single.mime, &state.caches)),
            _ => None,
        }
    }

    /// Matches `data` against the loaded magic rules, best priority first.
    /// Returns `None` when no rule matches; unrecognized content is a
    /// normal outcome, not an error.
    pub fn type_for_data(&self, data: &[u8]) -> Option<MimeType> {
        let state = self.state.load();
        magic::match_data(data, &state.caches)
            .map(|t| subclass::resolve_alias(&t, &state.caches))
    }

    /// Determines the type of a file from its name and, when inconclusive,
    /// its content. Always produces a type.
    ///
    /// Filename globs run first: a single high-confidence match (weight at
    /// least [`HIGH_CONFIDENCE_WEIGHT`]) is returned without touching
    /// content. Otherwise magic sniffing, when `content` is supplied, takes
    /// precedence over a weak or ambiguous glob result. When everything
    /// else fails: the best remaining glob candidate, then `text/plain`
    /// for textual-looking content, then `application/octet-stream`.
    pub fn type_for_file(&self, name: &str, content: Option<&[u8]>) -> MimeType {
        let state = self.state.load();
        let caches = &state.caches;

        let ranked = glob::match_file_name(name, caches);
        let best = glob::best_candidates(&ranked);
        if let [single] = best {
            if single.weight >= HIGH_CONFIDENCE_WEIGHT {
                return subclass::resolve_alias(&single.mime, caches);
            }
        }

        if let Some(data) = content {
            if let Some(t) = magic::match_data(data, caches) {
                return subclass::resolve_alias(&t, caches);
            }
        }

        // Low-confidence or ambiguous glob result: still better than
        // nothing. Ambiguity resolves to the first-ranked candidate, which
        // is deterministic (registration order).
        if let Some(candidate) = best.first() {
            return subclass::resolve_alias(&candidate.mime, caches);
        }

        match content {
            Some(data) if magic::looks_like_text(data) => TEXT_PLAIN.clone(),
            _ => OCTET_STREAM.clone(),
        }
    }

    /// Reads the bounded content prefix sniffing needs from `path`: at most
    /// [`Engine::max_magic_extent`] bytes (with a small floor), never the
    /// whole file.
    pub async fn read_prefix(&self, path: impl AsRef<Path>) -> Result<Bytes> {
        let limit = self.max_magic_extent().max(MIN_SNIFF_LEN);
        let file = tokio::fs::File::open(path.as_ref()).await?;
        let mut data = Vec::new();
        file.take(limit as u64).read_to_end(&mut data).await?;
        Ok(Bytes::from(data))
    }

    /// Determines the type of the file at `path` from its name and a
    /// bounded prefix of its content.
    ///
    /// # Errors
    ///
    /// Only I/O failures opening or reading the file; matching itself never
    /// fails.
    pub async fn sniff_path(&self, path: impl AsRef<Path>) -> Result<MimeType> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let prefix = self.read_prefix(path).await?;
        Ok(self.type_for_file(&name, Some(&prefix)))
    }

    /// Resolves `t` to its canonical name, or returns it unchanged.
    pub fn resolve_alias(&self, t: &MimeType) -> MimeType {
        let state = self.state.load();
        subclass::resolve_alias(t, &state.caches)
    }

    /// Whether two names refer to the same canonical type.
    pub fn mime_type_equal(&self, a: &MimeType, b: &MimeType) -> bool {
        let state = self.state.load();
        subclass::resolve_alias(a, &state.caches) == subclass::resolve_alias(b, &state.caches)
    }

    /// Whether `child` is `ancestor` or inherits from it through the
    /// declared parent edges. Reflexive; cycle-safe.
    pub fn is_subclass(&self, child: &MimeType, ancestor: &MimeType) -> bool {
        let state = self.state.load();
        subclass::is_subclass(child, ancestor, &state.caches)
    }

    /// The immediate declared parents of `t`, deduplicated across caches.
    pub fn parents(&self, t: &MimeType) -> Vec<MimeType> {
        let state = self.state.load();
        subclass::parents_of(t, &state.caches)
    }

    /// The icon name registered for `t`, if any.
    pub fn icon(&self, t: &MimeType) -> Option<String> {
        let state = self.state.load();
        let resolved = subclass::resolve_alias(t, &state.caches);
        state
            .caches
            .iter()
            .find_map(|c| c.icons.get(&resolved).cloned())
    }

    /// The generic (category) icon name registered for `t`, if any.
    pub fn generic_icon(&self, t: &MimeType) -> Option<String> {
        let state = self.state.load();
        let resolved = subclass::resolve_alias(t, &state.caches);
        state
            .caches
            .iter()
            .find_map(|c| c.generic_icons.get(&resolved).cloned())
    }

    /// The largest content prefix any loaded magic rule can examine.
    /// Callers doing their own reads need at most this many bytes.
    pub fn max_magic_extent(&self) -> usize {
        let state = self.state.load();
        magic::max_extent(&state.caches)
    }

    /// The cache file paths this engine draws from, in precedence order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.state.load().paths.clone()
    }

    #[cfg(test)]
    pub(crate) fn with_caches(caches: Vec<Arc<Cache>>) -> Engine {
        Engine {
            state: ArcSwap::from_pointee(EngineState {
                paths: Vec::new(),
                caches,
            }),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.load();
        f.debug_struct("Engine")
            .field("paths", &state.paths)
            .field("caches", &state.caches.len())
            .finish()
    }
}
