//! TokenSet: the key-only variant of the chained engine.

use crate::error::Result;
use crate::raw_table::{self, RawTable};
use crate::strategy::{F64Bits, Hashed, KeyStrategy};
use crate::token::Token;
use core::fmt;
use core::hash::{Hash, Hasher};

/// Hash set over the chained engine. Like [`TokenMap`](crate::TokenMap) it
/// may also contain the null key.
#[derive(Clone)]
pub struct TokenSet<K, S = Hashed> {
    table: RawTable<K, (), S>,
}

/// Set of `f64` keys compared bitwise.
pub type DoubleSet = TokenSet<f64, F64Bits>;

impl<K> TokenSet<K>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        Self::with_strategy(Hashed::default())
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_and_strategy(capacity, Hashed::default())
    }
}

impl<K> Default for TokenSet<K>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl Default for DoubleSet {
    fn default() -> Self {
        Self::with_strategy(F64Bits)
    }
}

/// Borrowing iterator over members; `None` is the null key and comes last.
pub struct Iter<'a, K> {
    inner: raw_table::Iter<'a, K, ()>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = Option<&'a K>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

impl<K, S> TokenSet<K, S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            table: RawTable::with_strategy(strategy),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn high_water_mark(&self) -> usize {
        self.table.high_water_mark()
    }

    pub fn contains_null(&self) -> bool {
        self.table.contains_null_key()
    }

    /// Adds the null key; `false` if it was already present.
    pub fn add_null(&mut self) -> bool {
        self.table.put_null(()).is_none()
    }

    pub fn remove_null(&mut self) -> bool {
        self.table.remove_null().is_some()
    }

    pub fn clear(&mut self) {
        self.table.clear()
    }

    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.table.iter(),
        }
    }

    pub fn token_first(&self) -> Option<Token> {
        self.table.token_first()
    }

    pub fn token_next(&self, token: Token) -> Result<Option<Token>> {
        self.table.token_next(token)
    }

    pub fn token_of_null(&self) -> Option<Token> {
        self.table.token_of_null()
    }

    /// `Ok(None)` designates the null key.
    pub fn key_at(&self, token: Token) -> Result<Option<&K>> {
        self.table.key_at(token)
    }

    pub fn raw_next(&self, prev: Option<usize>) -> Option<usize> {
        self.table.raw_next(prev)
    }

    pub fn raw_key(&self, index: usize) -> Result<&K> {
        self.table.raw_key(index)
    }
}

impl<K, S> TokenSet<K, S>
where
    S: KeyStrategy<K>,
{
    pub fn with_capacity_and_strategy(capacity: usize, strategy: S) -> Result<Self> {
        Ok(Self {
            table: RawTable::with_capacity_and_strategy(capacity, strategy)?,
        })
    }

    pub fn contains(&self, key: &K) -> Result<bool> {
        self.table.contains_key(key)
    }

    pub fn token_of(&self, key: &K) -> Result<Option<Token>> {
        self.table.token_of(key)
    }

    /// Adds `key`; `false` if an equal key was already present, in which
    /// case the stored key is kept.
    pub fn add(&mut self, key: K) -> Result<bool> {
        Ok(self.table.insert(key, ())?.is_none())
    }

    pub fn remove(&mut self, key: &K) -> Result<bool> {
        Ok(self.table.remove(key)?.is_some())
    }

    pub fn trim(&mut self, capacity: usize) -> Result<()> {
        self.table.trim(capacity)
    }

    pub fn fit(&mut self) -> Result<()> {
        self.table.trim(self.table.len())
    }

    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<()> {
        self.table.ensure_capacity(capacity)
    }

    /// Hash of the member set, independent of insertion order.
    pub fn content_hash(&self) -> u64 {
        self.table.content_hash(|_| 0)
    }
}

impl<'a, K, S> IntoIterator for &'a TokenSet<K, S> {
    type Item = Option<&'a K>;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, S, S2> PartialEq<TokenSet<K, S2>> for TokenSet<K, S>
where
    S: KeyStrategy<K>,
    S2: KeyStrategy<K>,
{
    fn eq(&self, other: &TokenSet<K, S2>) -> bool {
        self.table.same_entries(&other.table, |_, _| true)
    }
}

impl<K, S> Eq for TokenSet<K, S> where S: KeyStrategy<K> {}

impl<K, S> Hash for TokenSet<K, S>
where
    S: KeyStrategy<K>,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.content_hash());
    }
}

impl<K, S> fmt::Debug for TokenSet<K, S>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
