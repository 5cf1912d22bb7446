//! In-memory cache image builder, used by this crate's tests and benches.
//!
//! Builds byte buffers in the version 1.2 cache layout that
//! [`Cache::from_bytes`](crate::Cache::from_bytes) consumes. This is test
//! scaffolding, not a database authoring tool: it exists so fixtures can be
//! described declaratively instead of being checked in as opaque binaries.

use std::collections::{BTreeMap, HashMap};

const MAJOR_VERSION: u16 = 1;
const MINOR_VERSION: u16 = 2;
const HEADER_LEN: usize = 40;

/// One magic matchlet for [`CacheWriter::add_magic`].
#[derive(Clone, Debug)]
pub struct MatchletSpec {
    pub range_start: u32,
    pub range_length: u32,
    pub word_size: u32,
    pub value: Vec<u8>,
    pub mask: Option<Vec<u8>>,
    pub children: Vec<MatchletSpec>,
}

impl MatchletSpec {
    /// A plain byte-sequence matchlet with word size 1, no mask, no children.
    pub fn new(range_start: u32, range_length: u32, value: &[u8]) -> MatchletSpec {
        MatchletSpec {
            range_start,
            range_length,
            word_size: 1,
            value: value.to_vec(),
            mask: None,
            children: Vec::new(),
        }
    }

    pub fn with_mask(mut self, mask: &[u8]) -> MatchletSpec {
        self.mask = Some(mask.to_vec());
        self
    }

    pub fn with_word_size(mut self, word_size: u32) -> MatchletSpec {
        self.word_size = word_size;
        self
    }

    pub fn with_children(mut self, children: Vec<MatchletSpec>) -> MatchletSpec {
        self.children = children;
        self
    }
}

#[derive(Clone)]
struct MagicSpec {
    mime: String,
    priority: u32,
    matchlets: Vec<MatchletSpec>,
}

/// Declarative builder for cache file images.
#[derive(Default)]
pub struct CacheWriter {
    aliases: Vec<(String, String)>,
    parents: Vec<(String, Vec<String>)>,
    literals: Vec<(String, String, u32, bool)>,
    suffixes: Vec<(String, String, u32, bool)>,
    globs: Vec<(String, String, u32, bool)>,
    magic: Vec<MagicSpec>,
    icons: Vec<(String, String)>,
    generic_icons: Vec<(String, String)>,
}

impl CacheWriter {
    pub fn new() -> CacheWriter {
        CacheWriter::default()
    }

    pub fn add_alias(&mut self, alias: &str, canonical: &str) -> &mut Self {
        self.aliases.push((alias.to_string(), canonical.to_string()));
        self
    }

    pub fn add_parent(&mut self, child: &str, parents: &[&str]) -> &mut Self {
        self.parents
            .push((child.to_string(), parents.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn add_literal(&mut self, literal: &str, mime: &str, weight: u32, case_sensitive: bool) -> &mut Self {
        self.literals
            .push((literal.to_string(), mime.to_string(), weight, case_sensitive));
        self
    }

    /// Registers a `*.suffix` pattern; `suffix` includes the leading dot.
    pub fn add_suffix(&mut self, suffix: &str, mime: &str, weight: u32, case_sensitive: bool) -> &mut Self {
        self.suffixes
            .push((suffix.to_string(), mime.to_string(), weight, case_sensitive));
        self
    }

    pub fn add_glob(&mut self, pattern: &str, mime: &str, weight: u32, case_sensitive: bool) -> &mut Self {
        self.globs
            .push((pattern.to_string(), mime.to_string(), weight, case_sensitive));
        self
    }

    /// Registers one magic rule. Rules are encoded sorted by priority
    /// descending, preserving insertion order within a priority, the order
    /// the matcher expects caches to carry.
    pub fn add_magic(&mut self, mime: &str, priority: u32, matchlets: Vec<MatchletSpec>) -> &mut Self {
        self.magic.push(MagicSpec {
            mime: mime.to_string(),
            priority,
            matchlets,
        });
        self
    }

    pub fn add_icon(&mut self, mime: &str, icon: &str) -> &mut Self {
        self.icons.push((mime.to_string(), icon.to_string()));
        self
    }

    pub fn add_generic_icon(&mut self, mime: &str, icon: &str) -> &mut Self {
        self.generic_icons.push((mime.to_string(), icon.to_string()));
        self
    }

    /// Serializes the cache image.
    pub fn finish(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&MAJOR_VERSION.to_be_bytes());
        buf[2..4].copy_from_slice(&MINOR_VERSION.to_be_bytes());

        let mut strings = StringPool::default();

        // Intern every string up front so table records can refer to them.
        for (a, b) in &self.aliases {
            strings.intern(&mut buf, a);
            strings.intern(&mut buf, b);
        }
        for (child, parents) in &self.parents {
            strings.intern(&mut buf, child);
            for p in parents {
                strings.intern(&mut buf, p);
            }
        }
        for (lit, mime, _, _) in &self.literals {
            strings.intern(&mut buf, lit);
            strings.intern(&mut buf, mime);
        }
        for (_, mime, _, _) in &self.suffixes {
            strings.intern(&mut buf, mime);
        }
        for (pat, mime, _, _) in &self.globs {
            strings.intern(&mut buf, pat);
            strings.intern(&mut buf, mime);
        }
        for spec in &self.magic {
            strings.intern(&mut buf, &spec.mime);
        }
        for (mime, icon) in self.icons.iter().chain(&self.generic_icons) {
            strings.intern(&mut buf, mime);
            strings.intern(&mut buf, icon);
        }

        let alias_off = self.write_aliases(&mut buf, &strings);
        let parent_off = self.write_parents(&mut buf, &strings);
        let literal_off = self.write_weighted_list(&mut buf, &strings, &self.literals);
        let suffix_off = self.write_suffix_tree(&mut buf, &strings);
        let glob_off = self.write_weighted_list(&mut buf, &strings, &self.globs);
        let magic_off = self.write_magic(&mut buf, &strings);
        let icons_off = write_icon_list(&mut buf, &strings, &self.icons);
        let generic_icons_off = write_icon_list(&mut buf, &strings, &self.generic_icons);

        for (i, off) in [
            alias_off,
            parent_off,
            literal_off,
            suffix_off,
            glob_off,
            magic_off,
            0, // namespace list, not consumed by the loader
            icons_off,
            generic_icons_off,
        ]
        .into_iter()
        .enumerate()
        {
            let at = 4 + i * 4;
            buf[at..at + 4].copy_from_slice(&off.to_be_bytes());
        }
        buf
    }

    fn write_aliases(&self, buf: &mut Vec<u8>, strings: &StringPool) -> u32 {
        let mut sorted = self.aliases.clone();
        sorted.sort();
        let off = buf.len() as u32;
        push_u32(buf, sorted.len() as u32);
        for (alias, canonical) in &sorted {
            push_u32(buf, strings.offset(alias));
            push_u32(buf, strings.offset(canonical));
        }
        off
    }

    fn write_parents(&self, buf: &mut Vec<u8>, strings: &StringPool) -> u32 {
        // Per-child parent records precede the table that points at them.
        let mut records = Vec::new();
        for (child, parents) in &self.parents {
            let rec_off = buf.len() as u32;
            push_u32(buf, parents.len() as u32);
            for p in parents {
                push_u32(buf, strings.offset(p));
            }
            records.push((child, rec_off));
        }
        let off = buf.len() as u32;
        push_u32(buf, records.len() as u32);
        for (child, rec_off) in records {
            push_u32(buf, strings.offset(child));
            push_u32(buf, rec_off);
        }
        off
    }

    fn write_weighted_list(
        &self,
        buf: &mut Vec<u8>,
        strings: &StringPool,
        entries: &[(String, String, u32, bool)],
    ) -> u32 {
        let off = buf.len() as u32;
        push_u32(buf, entries.len() as u32);
        for (pattern, mime, weight, case_sensitive) in entries {
            push_u32(buf, strings.offset(pattern));
            push_u32(buf, strings.offset(mime));
            push_u32(buf, pack_weight(*weight, *case_sensitive));
        }
        off
    }

    fn write_suffix_tree(&self, buf: &mut Vec<u8>, strings: &StringPool) -> u32 {
        #[derive(Default)]
        struct Trie {
            children: BTreeMap<char, Trie>,
            leaves: Vec<(u32, u32)>, // (type string offset, packed weight)
        }

        let mut root = Trie::default();
        for (suffix, mime, weight, case_sensitive) in &self.suffixes {
            let mut node = &mut root;
            // Suffixes are stored reversed: walked from the end of the name.
            for c in suffix.chars().rev() {
                node = node.children.entry(c).or_default();
            }
            node.leaves
                .push((strings.offset(mime), pack_weight(*weight, *case_sensitive)));
        }

        // Flatten sibling groups breadth-first so each group is contiguous;
        // leaves (character 0) sort before real characters like the real
        // encoder's output.
        struct FlatNode {
            character: u32,
            a: u32, // leaf: type offset; inner: n_children
            b: u32, // leaf: weight; inner: child group index (patched to offset)
        }
        let mut groups: Vec<Vec<FlatNode>> = Vec::new();
        let mut queue: Vec<&Trie> = vec![&root];
        let mut group_of_trie: Vec<usize> = vec![0];
        let mut cursor = 0;
        while cursor < queue.len() {
            let trie = queue[cursor];
            let group_index = group_of_trie[cursor];
            cursor += 1;
            let mut group = Vec::new();
            for &(type_off, weight) in &trie.leaves {
                group.push(FlatNode { character: 0, a: type_off, b: weight });
            }
            for (c, child) in &trie.children {
                // A trie's group index is its queue position.
                let child_group = queue.len();
                group.push(FlatNode {
                    character: *c as u32,
                    a: (child.leaves.len() + child.children.len()) as u32,
                    b: child_group as u32,
                });
                queue.push(child);
                group_of_trie.push(child_group);
            }
            debug_assert_eq!(group_index, groups.len());
            groups.push(group);
        }

        // Group offsets: sequential, starting right after the section header.
        let section_off = buf.len() as u32;
        let first_group_off = section_off + 8;
        let mut group_offs = Vec::with_capacity(groups.len());
        let mut next = first_group_off;
        for g in &groups {
            group_offs.push(next);
            next += 12 * g.len() as u32;
        }

        push_u32(buf, groups[0].len() as u32);
        push_u32(buf, first_group_off);
        for g in &groups {
            for node in g {
                push_u32(buf, node.character);
                if node.character == 0 {
                    push_u32(buf, node.a);
                    push_u32(buf, node.b);
                } else {
                    push_u32(buf, node.a);
                    push_u32(buf, group_offs[node.b as usize]);
                }
            }
        }
        section_off
    }

    fn write_magic(&self, buf: &mut Vec<u8>, strings: &StringPool) -> u32 {
        let mut rules: Vec<&MagicSpec> = self.magic.iter().collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));

        // Value and mask payloads first (explicit length, no terminator).
        let mut payload_offs: HashMap<*const MatchletSpec, (u32, u32)> = HashMap::new();
        fn write_payloads(
            buf: &mut Vec<u8>,
            m: &MatchletSpec,
            offs: &mut HashMap<*const MatchletSpec, (u32, u32)>,
        ) {
            let value_off = buf.len() as u32;
            buf.extend_from_slice(&m.value);
            let mask_off = match &m.mask {
                Some(mask) => {
                    let off = buf.len() as u32;
                    buf.extend_from_slice(mask);
                    off
                }
                None => 0,
            };
            offs.insert(m as *const _, (value_off, mask_off));
            for child in &m.children {
                write_payloads(buf, child, offs);
            }
        }
        for rule in &rules {
            for m in &rule.matchlets {
                write_payloads(buf, m, &mut payload_offs);
            }
        }

        // Matchlet groups, children after their parents so every group is
        // contiguous. Two passes: compute group offsets, then emit.
        fn collect_groups<'a>(group: Vec<&'a MatchletSpec>, out: &mut Vec<Vec<&'a MatchletSpec>>) {
            if group.is_empty() {
                return;
            }
            let children: Vec<Vec<&MatchletSpec>> = group
                .iter()
                .map(|m| m.children.iter().collect())
                .collect();
            out.push(group);
            for c in children {
                collect_groups(c, out);
            }
        }
        let mut groups: Vec<Vec<&MatchletSpec>> = Vec::new();
        for rule in &rules {
            collect_groups(rule.matchlets.iter().collect(), &mut groups);
        }

        let section_off = buf.len() as u32;
        let first_match_off = section_off + 12;
        let matchlet_base = first_match_off + 16 * rules.len() as u32;
        let mut group_offs: HashMap<*const MatchletSpec, u32> = HashMap::new();
        let mut next = matchlet_base;
        for g in &groups {
            for m in g {
                group_offs.insert(*m as *const _, next);
                next += 32;
            }
        }

        let max_extent = rules
            .iter()
            .flat_map(|r| r.matchlets.iter())
            .map(spec_extent)
            .max()
            .unwrap_or(0);

        push_u32(buf, rules.len() as u32);
        push_u32(buf, max_extent);
        push_u32(buf, first_match_off);
        for rule in &rules {
            push_u32(buf, rule.priority);
            push_u32(buf, strings.offset(&rule.mime));
            push_u32(buf, rule.matchlets.len() as u32);
            let first = rule
                .matchlets
                .first()
                .map(|m| group_offs[&(m as *const _)])
                .unwrap_or(0);
            push_u32(buf, first);
        }
        for g in &groups {
            for m in g {
                let (value_off, mask_off) = payload_offs[&(*m as *const _)];
                push_u32(buf, m.range_start);
                push_u32(buf, m.range_length);
                push_u32(buf, m.word_size);
                push_u32(buf, m.value.len() as u32);
                push_u32(buf, value_off);
                push_u32(buf, mask_off);
                push_u32(buf, m.children.len() as u32);
                let first_child = m
                    .children
                    .first()
                    .map(|c| group_offs[&(c as *const _)])
                    .unwrap_or(0);
                push_u32(buf, first_child);
            }
        }
        section_off
    }
}

fn spec_extent(m: &MatchletSpec) -> u32 {
    let own = m.range_start + m.range_length + m.value.len() as u32;
    m.children.iter().map(spec_extent).fold(own, u32::max)
}

fn write_icon_list(buf: &mut Vec<u8>, strings: &StringPool, entries: &[(String, String)]) -> u32 {
    let off = buf.len() as u32;
    push_u32(buf, entries.len() as u32);
    for (mime, icon) in entries {
        push_u32(buf, strings.offset(mime));
        push_u32(buf, strings.offset(icon));
    }
    off
}

fn pack_weight(weight: u32, case_sensitive: bool) -> u32 {
    (weight & 0xff) | if case_sensitive { 0x100 } else { 0 }
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

#[derive(Default)]
struct StringPool {
    offsets: HashMap<String, u32>,
}

impl StringPool {
    fn intern(&mut self, buf: &mut Vec<u8>, s: &str) -> u32 {
        if let Some(&off) = self.offsets.get(s) {
            return off;
        }
        let off = buf.len() as u32;
        buf.extend_from_slice(s.as_bytes());
        buf.push(0);
        self.offsets.insert(s.to_string(), off);
        off
    }

    fn offset(&self, s: &str) -> u32 {
        self.offsets[s]
    }
}
