//! Key addressing: string-like keys and the hash functions over them.
//!
//! Both the linear-probing tables and the prefix trie address keys one
//! character at a time. [`CharKey`] is the small view of a key they need: a
//! length and the integer code at each position. Hashing goes through
//! [`KeyHasher`] so callers can swap in their own function for keys that are
//! not string-like.

/// Multiplier base of the rolling hash.
pub const HASH_BASE: u64 = 31;

/// Initial multiplier of the rolling hash.
pub const HASH_SEED: u64 = 31415;

/// A key that can be indexed by character position.
///
/// `str` and `String` are addressed by UTF-8 byte, which coincides with the
/// character code for ASCII text.
pub trait CharKey {
    /// Number of addressable characters.
    fn char_len(&self) -> usize;

    /// Integer code of the character at `index`.
    ///
    /// `index` is always below [`CharKey::char_len`].
    fn char_code(&self, index: usize) -> u32;
}

impl CharKey for str {
    #[inline]
    fn char_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn char_code(&self, index: usize) -> u32 {
        u32::from(self.as_bytes()[index])
    }
}

impl CharKey for String {
    #[inline]
    fn char_len(&self) -> usize {
        self.as_str().char_len()
    }

    #[inline]
    fn char_code(&self, index: usize) -> u32 {
        self.as_str().char_code(index)
    }
}

impl CharKey for [u8] {
    #[inline]
    fn char_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn char_code(&self, index: usize) -> u32 {
        u32::from(self[index])
    }
}

impl CharKey for Vec<u8> {
    #[inline]
    fn char_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn char_code(&self, index: usize) -> u32 {
        u32::from(self[index])
    }
}

impl CharKey for [char] {
    #[inline]
    fn char_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn char_code(&self, index: usize) -> u32 {
        u32::from(self[index])
    }
}

impl CharKey for Vec<char> {
    #[inline]
    fn char_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn char_code(&self, index: usize) -> u32 {
        u32::from(self[index])
    }
}

impl<T: CharKey + ?Sized> CharKey for &T {
    #[inline]
    fn char_len(&self) -> usize {
        (**self).char_len()
    }

    #[inline]
    fn char_code(&self, index: usize) -> u32 {
        (**self).char_code(index)
    }
}

/// Maps a key to a home slot in a table of `table_size` slots.
///
/// Implementations must return a value below `table_size` and must be
/// deterministic for a given `(key, table_size)`. Any
/// `Fn(&K, usize) -> usize` closure is a `KeyHasher`.
pub trait KeyHasher<K: ?Sized> {
    /// Home slot of `key` in a table with `table_size` slots.
    fn hash(&self, key: &K, table_size: usize) -> usize;
}

impl<K: ?Sized, F> KeyHasher<K> for F
where
    F: Fn(&K, usize) -> usize,
{
    #[inline]
    fn hash(&self, key: &K, table_size: usize) -> usize {
        self(key, table_size)
    }
}

/// The built-in polynomial hash over a key's characters.
///
/// For each character: `h = (code + a * h) mod size`, then
/// `a = a * 31 mod (size - 1)`, starting from `a = 31415`. Updating the
/// multiplier per step spreads keys that differ only slightly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollingHash;

impl<K: CharKey + ?Sized> KeyHasher<K> for RollingHash {
    fn hash(&self, key: &K, table_size: usize) -> usize {
        rolling_hash(key, table_size)
    }
}

/// Rolling hash of `key` for a table of `table_size` slots (`table_size >= 2`).
pub fn rolling_hash<K: CharKey + ?Sized>(key: &K, table_size: usize) -> usize {
    debug_assert!(table_size >= 2, "rolling hash needs at least two slots");
    let size = table_size as u64;
    let mut value = 0u64;
    let mut a = HASH_SEED;
    for i in 0..key.char_len() {
        value = (u64::from(key.char_code(i)) + a * value) % size;
        a = a * HASH_BASE % (size - 1);
    }
    value as usize
}
