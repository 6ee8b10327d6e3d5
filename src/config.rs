//! Table configuration.

use std::sync::Arc;

use crate::error::{Error, Result};

/// Default capacity sequence: primes, roughly doubling.
pub const DEFAULT_TABLE_SIZES: [usize; 19] = [
    5, 13, 29, 53, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613,
    393241, 786433, 1572869,
];

/// Default trie alphabet: 26 character slots plus the terminal slot.
pub const DEFAULT_ALPHABET_SIZE: usize = 27;

/// Largest capacity accepted in a size sequence.
///
/// Keeps the rolling hash arithmetic inside `u64`.
pub const MAX_TABLE_SIZE: usize = u32::MAX as usize;

/// An ascending sequence of capacities a table grows through.
///
/// Cloning is cheap; every inner table of a composite table shares one
/// sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSizes(Arc<[usize]>);

impl TableSizes {
    /// Validate and wrap a size sequence.
    ///
    /// Sizes must be non-empty, strictly ascending, each at least 2 and at
    /// most [`MAX_TABLE_SIZE`].
    pub fn new(sizes: Vec<usize>) -> Result<Self> {
        if sizes.is_empty() {
            return Err(Error::invalid_config("size sequence is empty"));
        }
        for (i, &size) in sizes.iter().enumerate() {
            if !(2..=MAX_TABLE_SIZE).contains(&size) {
                return Err(Error::invalid_config(format!(
                    "table size {size} at position {i} is out of range"
                )));
            }
            if i > 0 && sizes[i - 1] >= size {
                return Err(Error::invalid_config(format!(
                    "table sizes must be strictly ascending ({} then {size})",
                    sizes[i - 1]
                )));
            }
        }
        Ok(Self(sizes.into()))
    }

    /// A single fixed capacity; tables using it never grow.
    pub fn fixed(size: usize) -> Result<Self> {
        Self::new(vec![size])
    }

    /// Capacity at `index`, if the sequence reaches that far.
    #[inline]
    pub fn get(&self, index: usize) -> Option<usize> {
        self.0.get(index).copied()
    }

    /// Number of capacities in the sequence.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl Default for TableSizes {
    fn default() -> Self {
        Self(Arc::from(DEFAULT_TABLE_SIZES.as_slice()))
    }
}

/// Configuration for a [`crate::CompositeKeyTable`].
#[derive(Debug, Clone, Default)]
pub struct CompositeConfig {
    /// Capacities of the outer table
    pub outer_sizes: TableSizes,
    /// Capacities of every inner table
    pub inner_sizes: TableSizes,
}

/// Configuration for a [`crate::PrefixTrieTable`].
#[derive(Debug, Clone)]
pub struct TrieConfig {
    /// Slots per trie table, including the terminal slot.
    pub alphabet_size: usize,
}

impl TrieConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.alphabet_size < 2 {
            return Err(Error::invalid_config(format!(
                "alphabet size {} leaves no character slots",
                self.alphabet_size
            )));
        }
        Ok(())
    }
}

impl Default for TrieConfig {
    fn default() -> Self {
        Self {
            alphabet_size: DEFAULT_ALPHABET_SIZE,
        }
    }
}
