//! ByteMap: `u8 -> Option<V>` map with two value layouts.
//!
//! Presence of a key and presence of a non-null value are tracked
//! separately: `put(k, None)` stores `k` with a null value.
//!
//! Values start *compressed*: a bitset marks the keys holding a non-null
//! value and a dense vector stores those values in ascending key order, so
//! key `k` lives at `values[rank(k)]`. Once the dense vector already holds
//! `FLAT_THRESHOLD` values and another one arrives, the map migrates to a
//! *flat* 256-entry array indexed by key. The hot path never migrates back;
//! [`ByteMap::fit`] rebuilds compressed storage on request.

use crate::bits::KeyBits;
use crate::error::{Error, Result};
use crate::hashing::{entry_hash, fmix64, value_hash, Unordered, NULL_KEY_HASH};
use crate::token::{Token, Version};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::mem;
use tracing::debug;

/// Compressed cardinality at which the next new value forces flat storage.
pub const FLAT_THRESHOLD: usize = 127;

const DOMAIN: usize = 256;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StorageMode {
    Compressed,
    Flat,
}

#[derive(Clone)]
enum Store<V> {
    Compressed { nulls: KeyBits, values: Vec<V> },
    Flat { values: Vec<Option<V>>, cardinality: usize },
}

impl<V> Store<V> {
    fn empty() -> Self {
        Store::Compressed {
            nulls: KeyBits::default(),
            values: Vec::new(),
        }
    }

    fn mode(&self) -> StorageMode {
        match self {
            Store::Compressed { .. } => StorageMode::Compressed,
            Store::Flat { .. } => StorageMode::Flat,
        }
    }

    fn cardinality(&self) -> usize {
        match self {
            Store::Compressed { values, .. } => values.len(),
            Store::Flat { cardinality, .. } => *cardinality,
        }
    }

    fn get(&self, k: u8) -> Option<&V> {
        match self {
            Store::Compressed { nulls, values } => nulls.contains(k).then(|| &values[nulls.rank(k)]),
            Store::Flat { values, .. } => values[k as usize].as_ref(),
        }
    }

    fn get_mut(&mut self, k: u8) -> Option<&mut V> {
        match self {
            Store::Compressed { nulls, values } => {
                if nulls.contains(k) {
                    let r = nulls.rank(k);
                    Some(&mut values[r])
                } else {
                    None
                }
            }
            Store::Flat { values, .. } => values[k as usize].as_mut(),
        }
    }

    fn values(&self) -> Box<dyn Iterator<Item = &V> + '_> {
        match self {
            Store::Compressed { values, .. } => Box::new(values.iter()),
            Store::Flat { values, .. } => Box::new(values.iter().flatten()),
        }
    }

    /// True if storing a new non-null value at `k` would push compressed
    /// storage past the threshold.
    fn needs_flat(&self, k: u8) -> bool {
        matches!(self, Store::Compressed { nulls, values }
            if !nulls.contains(k) && values.len() >= FLAT_THRESHOLD)
    }

    /// Sets `k`'s value and returns the previous non-null one.
    fn replace(&mut self, k: u8, value: Option<V>) -> Option<V> {
        match self {
            Store::Compressed { nulls, values } => {
                let rank = nulls.rank(k);
                match (nulls.contains(k), value) {
                    (true, Some(v)) => Some(mem::replace(&mut values[rank], v)),
                    (true, None) => {
                        nulls.remove(k);
                        Some(values.remove(rank))
                    }
                    (false, Some(v)) => {
                        values.insert(rank, v);
                        nulls.insert(k);
                        None
                    }
                    (false, None) => None,
                }
            }
            Store::Flat {
                values,
                cardinality,
            } => {
                let slot = &mut values[k as usize];
                let now_some = value.is_some();
                let prev = mem::replace(slot, value);
                match (prev.is_some(), now_some) {
                    (false, true) => *cardinality += 1,
                    (true, false) => *cardinality -= 1,
                    _ => {}
                }
                prev
            }
        }
    }

    fn into_flat(self) -> Self {
        match self {
            Store::Compressed { nulls, values } => {
                let cardinality = values.len();
                let mut flat: Vec<Option<V>> = (0..DOMAIN).map(|_| None).collect();
                for (k, v) in nulls.iter().zip(values) {
                    flat[k as usize] = Some(v);
                }
                Store::Flat {
                    values: flat,
                    cardinality,
                }
            }
            flat => flat,
        }
    }

    fn into_compressed(self) -> Self {
        match self {
            Store::Flat {
                values,
                cardinality,
            } => {
                let mut nulls = KeyBits::default();
                let mut compact = Vec::with_capacity(cardinality);
                for (k, v) in values.into_iter().enumerate() {
                    if let Some(v) = v {
                        nulls.insert(k as u8);
                        compact.push(v);
                    }
                }
                Store::Compressed {
                    nulls,
                    values: compact,
                }
            }
            compressed => compressed,
        }
    }
}

/// Map from `u8` keys, plus a null key, to nullable values.
#[derive(Clone)]
pub struct ByteMap<V> {
    keys: KeyBits,
    store: Store<V>,
    null_value: Option<Option<V>>,
    version: Version,
}

impl<V> Default for ByteMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ByteMap<V> {
    pub fn new() -> Self {
        Self {
            keys: KeyBits::default(),
            store: Store::empty(),
            null_value: None,
            version: Version::default(),
        }
    }

    /// Entry count, the null key included.
    pub fn len(&self) -> usize {
        self.keys.count() + usize::from(self.null_value.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mode(&self) -> StorageMode {
        self.store.mode()
    }

    /// Number of byte keys holding a non-null value.
    pub fn cardinality(&self) -> usize {
        self.store.cardinality()
    }

    pub fn contains_key(&self, key: u8) -> bool {
        self.keys.contains(key)
    }

    pub fn contains_null_key(&self) -> bool {
        self.null_value.is_some()
    }

    /// `None` looks for an entry whose value is null.
    pub fn contains_value(&self, value: Option<&V>) -> bool
    where
        V: PartialEq,
    {
        match value {
            Some(v) => {
                self.store.values().any(|x| x == v)
                    || matches!(&self.null_value, Some(Some(n)) if n == v)
            }
            None => {
                self.keys.count() > self.store.cardinality()
                    || matches!(self.null_value, Some(None))
            }
        }
    }

    /// Non-null value for `key`; `None` if absent or null.
    pub fn get(&self, key: u8) -> Option<&V> {
        self.store.get(key)
    }

    pub fn get_mut(&mut self, key: u8) -> Option<&mut V> {
        self.store.get_mut(key)
    }

    pub fn get_null(&self) -> Option<&V> {
        self.null_value.as_ref().and_then(Option::as_ref)
    }

    /// Stores `value` for `key`. Returns `None` if the key was new, else the
    /// previous (possibly null) value.
    pub fn put(&mut self, key: u8, value: Option<V>) -> Option<Option<V>> {
        if value.is_some() && self.store.needs_flat(key) {
            self.migrate_to_flat();
        }
        let prev = self.store.replace(key, value);
        if self.keys.contains(key) {
            Some(prev)
        } else {
            debug_assert!(prev.is_none());
            self.keys.insert(key);
            self.version.bump();
            None
        }
    }

    pub fn put_null(&mut self, value: Option<V>) -> Option<Option<V>> {
        let prev = self.null_value.replace(value);
        if prev.is_none() {
            self.version.bump();
        }
        prev
    }

    /// Removes `key`; `Some(previous value)` if it was present.
    pub fn remove(&mut self, key: u8) -> Option<Option<V>> {
        if !self.keys.contains(key) {
            return None;
        }
        let prev = self.store.replace(key, None);
        self.keys.remove(key);
        self.version.bump();
        Some(prev)
    }

    pub fn remove_null(&mut self) -> Option<Option<V>> {
        let prev = self.null_value.take();
        if prev.is_some() {
            self.version.bump();
        }
        prev
    }

    /// Drops every entry and returns to compressed storage.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.store = Store::empty();
        self.null_value = None;
        self.version.bump();
    }

    /// Rebuilds compressed storage when flat storage is no longer dense
    /// enough to pay for itself, and releases spare capacity.
    pub fn fit(&mut self) {
        let cardinality = self.store.cardinality();
        if self.mode() == StorageMode::Flat && cardinality <= FLAT_THRESHOLD {
            let store = mem::replace(&mut self.store, Store::empty());
            self.store = store.into_compressed();
            self.version.bump();
            debug!(cardinality, "byte map compressed");
        }
        if let Store::Compressed { values, .. } = &mut self.store {
            values.shrink_to_fit();
        }
    }

    fn migrate_to_flat(&mut self) {
        let store = mem::replace(&mut self.store, Store::empty());
        self.store = store.into_flat();
        self.version.bump();
        debug!(
            cardinality = self.store.cardinality(),
            "byte map switched to flat storage"
        );
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            map: self,
            next: 0,
            null_done: false,
        }
    }

    // ---- safe token protocol ----

    pub fn token_first(&self) -> Option<Token> {
        self.token_from(0)
    }

    pub fn token_next(&self, token: Token) -> Result<Option<Token>> {
        match self.resolve(token)? {
            None => Ok(None),
            Some(k) => Ok(self.token_from(k as usize + 1)),
        }
    }

    pub fn token_of(&self, key: u8) -> Option<Token> {
        self.keys
            .contains(key)
            .then(|| Token::new(self.version, key as u32))
    }

    pub fn token_of_null(&self) -> Option<Token> {
        self.null_value.as_ref().map(|_| Token::null(self.version))
    }

    /// `Ok(None)` designates the null key.
    pub fn key_at(&self, token: Token) -> Result<Option<u8>> {
        self.resolve(token)
    }

    /// `Ok(None)` is a null value.
    pub fn value_at(&self, token: Token) -> Result<Option<&V>> {
        Ok(match self.resolve(token)? {
            None => self.get_null(),
            Some(k) => self.store.get(k),
        })
    }

    pub fn has_value(&self, token: Token) -> Result<bool> {
        Ok(self.value_at(token)?.is_some())
    }

    fn token_from(&self, start: usize) -> Option<Token> {
        match self.keys.next_from(start) {
            Some(k) => Some(Token::new(self.version, k as u32)),
            None => self.token_of_null(),
        }
    }

    fn resolve(&self, token: Token) -> Result<Option<u8>> {
        if !self.version.stamps(token) {
            return Err(Error::ConcurrentStructuralChange);
        }
        if token.is_null_key() {
            return match self.null_value {
                Some(_) => Ok(None),
                None => Err(Error::ConcurrentStructuralChange),
            };
        }
        match u8::try_from(token.index()) {
            Ok(k) if self.keys.contains(k) => Ok(Some(k)),
            _ => Err(Error::ConcurrentStructuralChange),
        }
    }

    // ---- unchecked walk ----

    /// Next present byte key after `prev`; never reports the null key.
    pub fn raw_next(&self, prev: Option<u8>) -> Option<u8> {
        self.keys.next_from(prev.map_or(0, |p| p as usize + 1))
    }

    pub fn raw_value(&self, index: usize) -> Result<Option<&V>> {
        match u8::try_from(index) {
            Ok(k) if self.keys.contains(k) => Ok(self.store.get(k)),
            _ => Err(Error::IndexOutOfBounds { index, len: DOMAIN }),
        }
    }

    /// Hash of the entry set, independent of insertion order and layout.
    pub fn content_hash(&self) -> u64
    where
        V: Hash,
    {
        let mut acc = Unordered::new();
        for k in self.keys.iter() {
            acc.add(entry_hash(fmix64(k as u64), value_hash(&self.store.get(k))));
        }
        if let Some(v) = &self.null_value {
            acc.add(entry_hash(NULL_KEY_HASH, value_hash(&v.as_ref())));
        }
        acc.finish(self.len())
    }
}

/// Borrowing iterator in ascending key order; the null key comes last.
pub struct Iter<'a, V> {
    map: &'a ByteMap<V>,
    next: usize,
    null_done: bool,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Option<u8>, Option<&'a V>);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(k) = self.map.keys.next_from(self.next) {
            self.next = k as usize + 1;
            return Some((Some(k), self.map.store.get(k)));
        }
        self.next = DOMAIN;
        if !self.null_done {
            self.null_done = true;
            if let Some(v) = &self.map.null_value {
                return Some((None, v.as_ref()));
            }
        }
        None
    }
}

impl<'a, V> IntoIterator for &'a ByteMap<V> {
    type Item = (Option<u8>, Option<&'a V>);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: PartialEq> PartialEq for ByteMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
            && self.null_value == other.null_value
            && self.keys.iter().all(|k| self.store.get(k) == other.store.get(k))
    }
}

impl<V: Eq> Eq for ByteMap<V> {}

impl<V: Hash> Hash for ByteMap<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.content_hash());
    }
}

impl<V: fmt::Debug> fmt::Debug for ByteMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
