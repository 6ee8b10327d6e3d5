//! Prefix-trie hash table of unbounded depth.
//!
//! Every level is a fixed-width table of `alphabet_size` slots. A key is
//! addressed at depth `d` by its `d`-th character code modulo
//! `alphabet_size - 1`; once the key is exhausted it addresses the last slot,
//! the terminal slot, so a key that is a strict prefix of another still has a
//! place of its own.
//!
//! Two keys meeting in one slot are separated by replacing the slot with an
//! internal node owning a child table one level deeper (and further levels
//! while their addresses keep agreeing). Removal undoes this: an internal node
//! left holding a single leaf is replaced by that leaf, bottom-up.

use std::borrow::Borrow;
use std::fmt;
use std::fmt::Write as _;
use std::mem;

use smallvec::SmallVec;

use crate::config::TrieConfig;
use crate::error::{invariant_violation, Error, Result};
use crate::hash::CharKey;

/// Character codes of the key prefix an internal node was split on.
type Prefix = SmallVec<[u32; 8]>;

enum Node<K, V> {
    Empty,
    Leaf { key: K, value: V },
    Internal { prefix: Prefix, children: Box<[Node<K, V>]> },
}

impl<K, V> Node<K, V> {
    #[inline]
    fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }
}

impl<K: Clone, V: Clone> Clone for Node<K, V> {
    fn clone(&self) -> Self {
        match self {
            Node::Empty => Node::Empty,
            Node::Leaf { key, value } => Node::Leaf {
                key: key.clone(),
                value: value.clone(),
            },
            Node::Internal { prefix, children } => Node::Internal {
                prefix: prefix.clone(),
                children: children.clone(),
            },
        }
    }
}

fn empty_table<K, V>(alphabet_size: usize) -> Box<[Node<K, V>]> {
    (0..alphabet_size).map(|_| Node::Empty).collect()
}

/// Slot of `key` in a table at `depth`.
#[inline]
fn address<Q: CharKey + ?Sized>(key: &Q, depth: usize, alphabet_size: usize) -> usize {
    let terminal = alphabet_size - 1;
    if depth < key.char_len() {
        key.char_code(depth) as usize % terminal
    } else {
        terminal
    }
}

/// First depth at or below `from` where `a` and `b` take different slots.
///
/// `None` when the keys agree at every depth, which happens for equal-length
/// keys whose codes are pairwise congruent modulo the character slot count.
fn divergence_depth<A, B>(a: &A, b: &B, from: usize, alphabet_size: usize) -> Option<usize>
where
    A: CharKey + ?Sized,
    B: CharKey + ?Sized,
{
    let mut depth = from;
    loop {
        if address(a, depth, alphabet_size) != address(b, depth, alphabet_size) {
            return Some(depth);
        }
        if depth >= a.char_len() && depth >= b.char_len() {
            return None;
        }
        depth += 1;
    }
}

fn prefix_through<Q: CharKey + ?Sized>(key: &Q, depth: usize) -> Prefix {
    let end = (depth + 1).min(key.char_len());
    (0..end).map(|i| key.char_code(i)).collect()
}

#[inline]
fn key_matches<K, Q>(stored: &K, key: &Q) -> bool
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
{
    Borrow::<Q>::borrow(stored) == key
}

enum Occupancy {
    Vacant,
    SingleLeaf(usize),
    Several,
}

fn occupancy<K, V>(table: &[Node<K, V>]) -> Occupancy {
    let mut occupied = table
        .iter()
        .enumerate()
        .filter(|(_, node)| !node.is_empty());
    match (occupied.next(), occupied.next()) {
        (None, _) => Occupancy::Vacant,
        (Some((i, Node::Leaf { .. })), None) => Occupancy::SingleLeaf(i),
        _ => Occupancy::Several,
    }
}

/// Replace an internal node whose child table holds one leaf (or nothing)
/// with that leaf (or an empty slot). Returns whether the node was replaced.
fn collapse<K, V>(node: &mut Node<K, V>) -> bool {
    let Node::Internal { children, .. } = node else {
        return false;
    };
    match occupancy(children) {
        Occupancy::Vacant => *node = Node::Empty,
        Occupancy::SingleLeaf(i) => {
            let leaf = mem::replace(&mut children[i], Node::Empty);
            *node = leaf;
        }
        Occupancy::Several => return false,
    }
    true
}

/// Counters describing the shape of a [`PrefixTrieTable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrieStats {
    pub leaves: usize,
    pub internal_nodes: usize,
    /// Tables allocated, including the root.
    pub tables: usize,
    /// Deepest table level holding a leaf (root is 0).
    pub max_depth: usize,
}

/// Hash table over string-like keys whose depth grows with key collisions.
#[derive(Clone)]
pub struct PrefixTrieTable<K, V> {
    root: Box<[Node<K, V>]>,
    count: usize,
    alphabet_size: usize,
}

impl<K, V> PrefixTrieTable<K, V> {
    /// Create an empty table with the default alphabet.
    pub fn new() -> Self {
        Self::from_valid_config(TrieConfig::default())
    }

    /// Create an empty table with the given configuration.
    pub fn with_config(config: TrieConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: TrieConfig) -> Self {
        Self {
            root: empty_table(config.alphabet_size),
            count: 0,
            alphabet_size: config.alphabet_size,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Slots per table, including the terminal slot.
    #[inline]
    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    /// Entries in depth-first slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            stack: vec![self.root.iter()],
            remaining: self.count,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn stats(&self) -> TrieStats {
        let mut stats = TrieStats {
            tables: 1,
            ..TrieStats::default()
        };
        let mut stack: Vec<(&[Node<K, V>], usize)> = vec![(&self.root[..], 0)];
        while let Some((table, depth)) = stack.pop() {
            for node in table.iter() {
                match node {
                    Node::Empty => {}
                    Node::Leaf { .. } => {
                        stats.leaves += 1;
                        stats.max_depth = stats.max_depth.max(depth);
                    }
                    Node::Internal { children, .. } => {
                        stats.internal_nodes += 1;
                        stats.tables += 1;
                        stack.push((&children[..], depth + 1));
                    }
                }
            }
        }
        stats
    }
}

impl<K, V> PrefixTrieTable<K, V>
where
    K: CharKey + Eq,
{
    pub fn get<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: CharKey + Eq + ?Sized,
    {
        let mut table: &[Node<K, V>] = &self.root;
        let mut depth = 0;
        loop {
            match &table[address(key, depth, self.alphabet_size)] {
                Node::Empty => return Err(Error::NotFound),
                Node::Leaf { key: stored, value } => {
                    return if key_matches(stored, key) {
                        Ok(value)
                    } else {
                        Err(Error::NotFound)
                    };
                }
                Node::Internal { children, .. } => {
                    table = &children[..];
                    depth += 1;
                }
            }
        }
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: CharKey + Eq + ?Sized,
    {
        let alphabet_size = self.alphabet_size;
        let mut table: &mut [Node<K, V>] = &mut self.root;
        let mut depth = 0;
        loop {
            match &mut table[address(key, depth, alphabet_size)] {
                Node::Empty => return Err(Error::NotFound),
                Node::Leaf { key: stored, value } => {
                    return if key_matches(stored, key) {
                        Ok(value)
                    } else {
                        Err(Error::NotFound)
                    };
                }
                Node::Internal { children, .. } => {
                    table = &mut children[..];
                    depth += 1;
                }
            }
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: CharKey + Eq + ?Sized,
    {
        self.get(key).is_ok()
    }

    /// Slot indices visited from the root down to the key's leaf.
    pub fn location<Q>(&self, key: &Q) -> Result<Vec<usize>>
    where
        K: Borrow<Q>,
        Q: CharKey + Eq + ?Sized,
    {
        let mut path = Vec::new();
        let mut table: &[Node<K, V>] = &self.root;
        let mut depth = 0;
        loop {
            let slot = address(key, depth, self.alphabet_size);
            match &table[slot] {
                Node::Empty => return Err(Error::NotFound),
                Node::Leaf { key: stored, .. } => {
                    if !key_matches(stored, key) {
                        return Err(Error::NotFound);
                    }
                    path.push(slot);
                    return Ok(path);
                }
                Node::Internal { children, .. } => {
                    path.push(slot);
                    table = &children[..];
                    depth += 1;
                }
            }
        }
    }

    /// Insert or overwrite `key`, returning the previous value.
    ///
    /// Fails with [`Error::Full`], leaving the table unchanged, when `key`
    /// addresses the same slot as a different stored key at every depth.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        let old = insert_at(&mut self.root, key, value, 0, self.alphabet_size)?;
        if old.is_none() {
            self.count += 1;
        }
        Ok(old)
    }

    /// Remove `key`, collapsing internal nodes left with a single leaf.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: CharKey + Eq + ?Sized,
    {
        let value = remove_at(&mut self.root, key, 0, self.alphabet_size)?;
        self.count -= 1;
        Ok(value)
    }

    /// Indented rendering of the table structure, one occupied slot per line.
    pub fn dump_tree(&self) -> String
    where
        K: fmt::Debug,
    {
        let mut out = String::new();
        dump_table(&self.root, 0, &mut out);
        out
    }
}

fn insert_at<K, V>(
    table: &mut [Node<K, V>],
    key: K,
    value: V,
    depth: usize,
    alphabet_size: usize,
) -> Result<Option<V>>
where
    K: CharKey + Eq,
{
    let slot = address(&key, depth, alphabet_size);
    match &mut table[slot] {
        Node::Empty => {
            table[slot] = Node::Leaf { key, value };
            Ok(None)
        }
        Node::Leaf {
            key: stored,
            value: current,
        } if *stored == key => Ok(Some(mem::replace(current, value))),
        Node::Leaf { .. } => {
            split(table, slot, key, value, depth, alphabet_size)?;
            Ok(None)
        }
        Node::Internal { children, .. } => insert_at(children, key, value, depth + 1, alphabet_size),
    }
}

/// Turn the leaf at `table[slot]` into a chain of internal nodes deep enough
/// to hold both it and `key` in distinct slots.
fn split<K, V>(
    table: &mut [Node<K, V>],
    slot: usize,
    key: K,
    value: V,
    depth: usize,
    alphabet_size: usize,
) -> Result<()>
where
    K: CharKey + Eq,
{
    let diverge = match &table[slot] {
        Node::Leaf { key: stored, .. } => divergence_depth(stored, &key, depth + 1, alphabet_size),
        _ => invariant_violation("split target is not a leaf"),
    };
    let Some(diverge) = diverge else {
        return Err(Error::Full);
    };

    // Slots and prefixes of the single-child levels between the split point
    // and the level where the keys part.
    let links: Vec<(usize, Prefix)> = (depth + 1..diverge)
        .map(|d| (address(&key, d, alphabet_size), prefix_through(&key, d)))
        .collect();
    let top_prefix = prefix_through(&key, depth);
    if diverge > depth + 1 {
        log::debug!(
            "trie split at depth {depth} needs {} extra levels",
            diverge - depth - 1
        );
    }

    let existing = mem::replace(&mut table[slot], Node::Empty);
    let Node::Leaf {
        key: existing_key,
        value: existing_value,
    } = existing
    else {
        invariant_violation("split target is not a leaf");
    };

    let existing_slot = address(&existing_key, diverge, alphabet_size);
    let new_slot = address(&key, diverge, alphabet_size);
    let mut children = empty_table(alphabet_size);
    children[existing_slot] = Node::Leaf {
        key: existing_key,
        value: existing_value,
    };
    children[new_slot] = Node::Leaf { key, value };

    for (link_slot, prefix) in links.into_iter().rev() {
        let mut level = empty_table(alphabet_size);
        level[link_slot] = Node::Internal { prefix, children };
        children = level;
    }
    table[slot] = Node::Internal {
        prefix: top_prefix,
        children,
    };
    Ok(())
}

fn remove_at<K, V, Q>(table: &mut [Node<K, V>], key: &Q, depth: usize, alphabet_size: usize) -> Result<V>
where
    K: Borrow<Q>,
    Q: CharKey + Eq + ?Sized,
{
    let slot = address(key, depth, alphabet_size);
    match &mut table[slot] {
        Node::Empty => Err(Error::NotFound),
        Node::Leaf { key: stored, .. } => {
            if !key_matches(stored, key) {
                return Err(Error::NotFound);
            }
            match mem::replace(&mut table[slot], Node::Empty) {
                Node::Leaf { value, .. } => Ok(value),
                _ => invariant_violation("removed slot is not a leaf"),
            }
        }
        Node::Internal { children, .. } => {
            let value = remove_at(children, key, depth + 1, alphabet_size)?;
            // An internal node that survives here blocks every level above.
            if collapse(&mut table[slot]) {
                log::trace!("collapsed internal node at depth {depth}, slot {slot}");
            }
            Ok(value)
        }
    }
}

#[cfg(test)]
impl<K: CharKey + Eq, V> PrefixTrieTable<K, V> {
    /// Panic unless every leaf sits on its own address path, no internal node
    /// is collapsible and the entry count matches the reachable leaves.
    pub(crate) fn assert_invariants(&self) {
        fn walk<K: CharKey, V>(
            table: &[Node<K, V>],
            path: &mut Vec<usize>,
            alphabet_size: usize,
            leaves: &mut usize,
        ) {
            assert_eq!(table.len(), alphabet_size, "table width must match alphabet");
            for (slot, node) in table.iter().enumerate() {
                match node {
                    Node::Empty => {}
                    Node::Leaf { key, .. } => {
                        *leaves += 1;
                        path.push(slot);
                        for (depth, &expected) in path.iter().enumerate() {
                            assert_eq!(
                                address(key, depth, alphabet_size),
                                expected,
                                "leaf stored off its address path at depth {depth}"
                            );
                        }
                        path.pop();
                    }
                    Node::Internal { children, .. } => {
                        assert!(
                            matches!(occupancy(children), Occupancy::Several),
                            "internal node at path {path:?}/{slot} should have collapsed"
                        );
                        path.push(slot);
                        walk(children, path, alphabet_size, leaves);
                        path.pop();
                    }
                }
            }
        }

        let mut leaves = 0;
        walk(&self.root, &mut Vec::new(), self.alphabet_size, &mut leaves);
        assert_eq!(leaves, self.count, "reachable leaf count must match len");
    }
}

fn dump_table<K: fmt::Debug, V>(table: &[Node<K, V>], depth: usize, out: &mut String) {
    for (slot, node) in table.iter().enumerate() {
        match node {
            Node::Empty => {}
            Node::Leaf { key, .. } => {
                let _ = writeln!(out, "{:indent$}[{slot}] {key:?}", "", indent = depth * 2);
            }
            Node::Internal { prefix, children } => {
                let prefix: String = prefix
                    .iter()
                    .map(|&c| char::from_u32(c).unwrap_or('?'))
                    .collect();
                let _ = writeln!(out, "{:indent$}[{slot}] {prefix:?} ->", "", indent = depth * 2);
                dump_table(children, depth + 1, out);
            }
        }
    }
}

impl<K, V> Default for PrefixTrieTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PrefixTrieTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, K, V> {
    stack: Vec<std::slice::Iter<'a, Node<K, V>>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                None => {
                    self.stack.pop();
                }
                Some(Node::Empty) => {}
                Some(Node::Leaf { key, value }) => {
                    self.remaining = self.remaining.saturating_sub(1);
                    return Some((key, value));
                }
                Some(Node::Internal { children, .. }) => self.stack.push(children.iter()),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a PrefixTrieTable<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
