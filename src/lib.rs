//! # nested-tables
//!
//! Hash tables for composite and variable-depth keys, built on open
//! addressing with linear probing.
//!
//! - [`LinearProbeTable`]: single-key table that grows through a prime size
//!   sequence once it is more than half full.
//! - [`CompositeKeyTable`]: `(outer, inner)` keys; each outer slot owns a
//!   private `LinearProbeTable` for its inner keys.
//! - [`PrefixTrieTable`]: string-like keys hashed one character per level;
//!   levels are added where keys collide and collapsed again on removal.
//!
//! ## Example
//!
//! ```rust
//! use nested_tables::{CompositeKeyTable, PrefixTrieTable};
//!
//! let mut pairs: CompositeKeyTable<String, String, u64> = CompositeKeyTable::new();
//! pairs.set("x".into(), "1".into(), 10).unwrap();
//! pairs.set("x".into(), "2".into(), 20).unwrap();
//! assert_eq!(pairs.get(&"x".into(), &"2".into()), Ok(&20));
//! assert_eq!(pairs.len(), 2);
//!
//! let mut trie: PrefixTrieTable<String, u64> = PrefixTrieTable::new();
//! trie.insert("cat".into(), 1).unwrap();
//! trie.insert("car".into(), 2).unwrap();
//! trie.remove("car").unwrap();
//! assert_eq!(trie.get("cat"), Ok(&1));
//! ```

#![warn(clippy::all)]

pub mod composite;
pub mod config;
pub mod error;
pub mod hash;
pub mod linear_probe;
pub mod trie;

pub use composite::CompositeKeyTable;
pub use config::{CompositeConfig, TableSizes, TrieConfig};
pub use error::{Error, Result};
pub use hash::{CharKey, KeyHasher, RollingHash};
pub use linear_probe::LinearProbeTable;
pub use trie::{PrefixTrieTable, TrieStats};

#[cfg(test)]
mod proptests;
