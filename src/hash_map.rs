//! TokenMap: key/value map over the chained engine, with a null-key channel.

use crate::error::Result;
use crate::hashing::value_hash;
pub use crate::raw_table::Iter;
use crate::raw_table::RawTable;
use crate::strategy::{Hashed, KeyStrategy};
use crate::token::Token;
use core::fmt;
use core::hash::{Hash, Hasher};

/// Hash map that stores keys and values in flat parallel arrays and hands
/// out versioned [`Token`]s for iteration.
///
/// Besides ordinary keys, the map holds at most one entry for the *null
/// key*, addressed through the `*_null` methods. It is never hashed.
///
/// Every operation that walks a collision chain returns `Result`; the only
/// error it can produce is `Error::ConcurrentStructuralChange`, which
/// signals corrupted links rather than a caller mistake.
#[derive(Clone)]
pub struct TokenMap<K, V, S = Hashed> {
    table: RawTable<K, V, S>,
}

/// `long -> long` map.
pub type LongLongMap<S = Hashed> = TokenMap<i64, i64, S>;
/// `int -> object` map.
pub type IntObjectMap<V, S = Hashed> = TokenMap<i32, V, S>;

impl<K, V> TokenMap<K, V>
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

impl<K, V> Default for TokenMap<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> TokenMap<K, V, S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            table: RawTable::with_strategy(strategy),
        }
    }

    /// Entry count, the null key included.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Slots handed out since the last resize; freed slots are reused below it.
    pub fn high_water_mark(&self) -> usize {
        self.table.high_water_mark()
    }

    pub fn strategy(&self) -> &S {
        self.table.strategy()
    }

    pub fn contains_null_key(&self) -> bool {
        self.table.contains_null_key()
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.table.contains_value(value)
    }

    pub fn get_null(&self) -> Option<&V> {
        self.table.get_null()
    }

    pub fn get_null_mut(&mut self) -> Option<&mut V> {
        self.table.get_null_mut()
    }

    pub fn put_null(&mut self, value: V) -> Option<V> {
        self.table.put_null(value)
    }

    pub fn remove_null(&mut self) -> Option<V> {
        self.table.remove_null()
    }

    pub fn clear(&mut self) {
        self.table.clear()
    }

    /// Borrowing iterator over `(key, value)`; `None` is the null key and
    /// comes last.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.table.iter()
    }

    /// First token of a safe walk, or `None` for an empty map.
    pub fn token_first(&self) -> Option<Token> {
        self.table.token_first()
    }

    /// Token after `token`. Fails if the map changed structurally since
    /// `token` was issued. The null key is visited last.
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

    pub fn value_at(&self, token: Token) -> Result<&V> {
        self.table.value_at(token)
    }

    pub fn value_at_mut(&mut self, token: Token) -> Result<&mut V> {
        self.table.value_at_mut(token)
    }

    /// Unchecked walk over slot indices, excluding the null key. No version
    /// check: mutating between calls may skip or repeat entries.
    pub fn raw_next(&self, prev: Option<usize>) -> Option<usize> {
        self.table.raw_next(prev)
    }

    pub fn raw_key(&self, index: usize) -> Result<&K> {
        self.table.raw_key(index)
    }

    pub fn raw_value(&self, index: usize) -> Result<&V> {
        self.table.raw_value(index)
    }
}

impl<K, V, S> TokenMap<K, V, S>
where
    S: KeyStrategy<K>,
{
    pub fn with_capacity_and_strategy(capacity: usize, strategy: S) -> Result<Self> {
        Ok(Self {
            table: RawTable::with_capacity_and_strategy(capacity, strategy)?,
        })
    }

    pub fn contains_key(&self, key: &K) -> Result<bool> {
        self.table.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Result<Option<&V>> {
        self.table.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Result<Option<&mut V>> {
        self.table.get_mut(key)
    }

    pub fn token_of(&self, key: &K) -> Result<Option<Token>> {
        self.table.token_of(key)
    }

    /// Inserts or overwrites; returns the previous value.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.table.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Result<Option<V>> {
        Ok(self.table.remove(key)?.map(|(_, v)| v))
    }

    /// Removes and returns the stored key along with its value.
    pub fn remove_entry(&mut self, key: &K) -> Result<Option<(K, V)>> {
        self.table.remove(key)
    }

    pub fn trim(&mut self, capacity: usize) -> Result<()> {
        self.table.trim(capacity)
    }

    /// Trims to the current size.
    pub fn fit(&mut self) -> Result<()> {
        self.table.trim(self.table.len())
    }

    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<()> {
        self.table.ensure_capacity(capacity)
    }

    /// Hash of the entry set, independent of insertion order.
    pub fn content_hash(&self) -> u64
    where
        V: Hash,
    {
        self.table.content_hash(value_hash)
    }
}

impl<'a, K, V, S> IntoIterator for &'a TokenMap<K, V, S> {
    type Item = (Option<&'a K>, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S, S2> PartialEq<TokenMap<K, V, S2>> for TokenMap<K, V, S>
where
    V: PartialEq,
    S: KeyStrategy<K>,
    S2: KeyStrategy<K>,
{
    fn eq(&self, other: &TokenMap<K, V, S2>) -> bool {
        self.table.same_entries(&other.table, |a, b| a == b)
    }
}

impl<K, V, S> Eq for TokenMap<K, V, S>
where
    V: Eq,
    S: KeyStrategy<K>,
{
}

impl<K, V, S> Hash for TokenMap<K, V, S>
where
    V: Hash,
    S: KeyStrategy<K>,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.content_hash());
    }
}

impl<K, V, S> fmt::Debug for TokenMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
