//! RawTable: chained hash engine with an embedded free list and versioned
//! tokens. `TokenMap` and `TokenSet` are thin typed layers over it.
//!
//! Layout
//! - `buckets[hash % capacity]` holds `slot + 1` of the chain head (0 = empty).
//! - `keys`, `values` and `links` are parallel and indexed by slot. Their
//!   length is the high-water mark; slots past it have never been used.
//! - `links[slot]` is a chain successor for live slots and a free-list
//!   successor for released ones (see `Link`).
//! - The null key lives outside the slots in `null_value`.
//!
//! Slots hold `Option<K>` and `Option<V>` so removal can move the pair out
//! without requiring `K: Default` or `V: Default`, and so released slots drop
//! their contents at once. The cost is a discriminant per slot, which for
//! small primitives like `i64` doubles the slot size; `links` alone would be
//! enough to tell live slots apart.

use crate::error::{Error, Result};
use crate::hashing::{entry_hash, Unordered, NULL_KEY_HASH};
use crate::prime::next_prime;
use crate::strategy::{Hashed, KeyStrategy};
use crate::token::{Token, Version};
use core::mem;
use tracing::{debug, trace};

/// Smallest capacity allocated on first insert.
pub const MIN_CAPACITY: usize = 3;
/// Largest capacity; slot ids must fit the `Link` free-list encoding.
pub const MAX_CAPACITY: usize = i32::MAX as usize - 1;

const START_OF_FREE: i32 = -3;

/// Slot link. `>= 0` is the next slot in the chain, `-1` ends the chain,
/// and `< -1` marks a released slot, encoded as `START_OF_FREE - next_free`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Link(i32);

impl Link {
    const END: Link = Link(-1);

    #[inline]
    fn to(next: Option<usize>) -> Link {
        Link(next.map_or(-1, |i| i as i32))
    }

    #[inline]
    fn free(next_free: Option<usize>) -> Link {
        Link(START_OF_FREE - next_free.map_or(-1, |i| i as i32))
    }

    #[inline]
    fn is_live(self) -> bool {
        self.0 >= -1
    }

    #[inline]
    fn next(self) -> Option<usize> {
        (self.0 >= 0).then_some(self.0 as usize)
    }

    #[inline]
    fn next_free(self) -> Option<usize> {
        let i = START_OF_FREE - self.0;
        (i >= 0).then_some(i as usize)
    }
}

enum Probe {
    Found {
        bucket: usize,
        prev: Option<usize>,
        slot: usize,
    },
    Vacant,
}

enum Target {
    Null,
    Slot(usize),
}

#[derive(Clone)]
pub struct RawTable<K, V, S = Hashed> {
    strategy: S,
    buckets: Vec<u32>,
    keys: Vec<Option<K>>,
    values: Vec<Option<V>>,
    links: Vec<Link>,
    free_head: Option<usize>,
    free_count: usize,
    null_value: Option<V>,
    version: Version,
}

/// Borrowing iterator; the null key, if present, comes last.
pub struct Iter<'a, K, V> {
    slots: core::iter::Zip<core::slice::Iter<'a, Option<K>>, core::slice::Iter<'a, Option<V>>>,
    null: Option<&'a V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Option<&'a K>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for (k, v) in self.slots.by_ref() {
            if let (Some(k), Some(v)) = (k, v) {
                return Some((Some(k), v));
            }
        }
        self.null.take().map(|v| (None, v))
    }
}

impl<K, V, S> RawTable<K, V, S> {
    /// Empty table; nothing is allocated until the first insert.
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            strategy,
            buckets: Vec::new(),
            keys: Vec::new(),
            values: Vec::new(),
            links: Vec::new(),
            free_head: None,
            free_count: 0,
            null_value: None,
            version: Version::default(),
        }
    }

    #[inline]
    fn live_slots(&self) -> usize {
        self.keys.len() - self.free_count
    }

    pub fn len(&self) -> usize {
        self.live_slots() + usize::from(self.null_value.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Number of slots ever handed out since the last resize.
    pub fn high_water_mark(&self) -> usize {
        self.keys.len()
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn contains_null_key(&self) -> bool {
        self.null_value.is_some()
    }

    pub fn get_null(&self) -> Option<&V> {
        self.null_value.as_ref()
    }

    pub fn get_null_mut(&mut self) -> Option<&mut V> {
        self.null_value.as_mut()
    }

    /// Sets the null key's value; returns the previous one if it was present.
    pub fn put_null(&mut self, value: V) -> Option<V> {
        let prev = self.null_value.replace(value);
        if prev.is_none() {
            self.version.bump();
        }
        prev
    }

    pub fn remove_null(&mut self) -> Option<V> {
        let prev = self.null_value.take();
        if prev.is_some() {
            self.version.bump();
        }
        prev
    }

    /// Drops every entry; capacity is kept.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.values.clear();
        self.links.clear();
        self.buckets.fill(0);
        self.free_head = None;
        self.free_count = 0;
        self.null_value = None;
        self.version.bump();
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values.iter().flatten().any(|v| v == value) || self.null_value.as_ref() == Some(value)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.keys.iter().zip(self.values.iter()),
            null: self.null_value.as_ref(),
        }
    }

    // ---- safe token protocol ----

    pub fn token_first(&self) -> Option<Token> {
        self.token_from(0)
    }

    pub fn token_next(&self, token: Token) -> Result<Option<Token>> {
        match self.resolve(token)? {
            Target::Null => Ok(None),
            Target::Slot(i) => Ok(self.token_from(i + 1)),
        }
    }

    pub fn token_of_null(&self) -> Option<Token> {
        self.null_value.as_ref().map(|_| Token::null(self.version))
    }

    /// Key behind `token`; `Ok(None)` designates the null key.
    pub fn key_at(&self, token: Token) -> Result<Option<&K>> {
        match self.resolve(token)? {
            Target::Null => Ok(None),
            Target::Slot(i) => self.live_key(i).map(Some).ok_or(Error::ConcurrentStructuralChange),
        }
    }

    pub fn value_at(&self, token: Token) -> Result<&V> {
        let v = match self.resolve(token)? {
            Target::Null => self.null_value.as_ref(),
            Target::Slot(i) => self.values[i].as_ref(),
        };
        v.ok_or(Error::ConcurrentStructuralChange)
    }

    pub fn value_at_mut(&mut self, token: Token) -> Result<&mut V> {
        let v = match self.resolve(token)? {
            Target::Null => self.null_value.as_mut(),
            Target::Slot(i) => self.values[i].as_mut(),
        };
        v.ok_or(Error::ConcurrentStructuralChange)
    }

    fn token_from(&self, start: usize) -> Option<Token> {
        match self.raw_next_from(start) {
            Some(i) => Some(Token::new(self.version, i as u32)),
            None => self.token_of_null(),
        }
    }

    fn resolve(&self, token: Token) -> Result<Target> {
        if !self.version.stamps(token) {
            return Err(Error::ConcurrentStructuralChange);
        }
        if token.is_null_key() {
            return match self.null_value {
                Some(_) => Ok(Target::Null),
                None => Err(Error::ConcurrentStructuralChange),
            };
        }
        let i = token.index() as usize;
        match self.links.get(i) {
            Some(l) if l.is_live() => Ok(Target::Slot(i)),
            _ => Err(Error::ConcurrentStructuralChange),
        }
    }

    // ---- unchecked slot walk ----

    /// Next live slot after `prev` (from the start when `None`). No version
    /// check, and the null key is never reported. The caller must not
    /// mutate the table between calls; doing so may skip or repeat entries.
    pub fn raw_next(&self, prev: Option<usize>) -> Option<usize> {
        self.raw_next_from(prev.map_or(0, |p| p.saturating_add(1)))
    }

    pub fn raw_key(&self, index: usize) -> Result<&K> {
        self.live_key(index).ok_or(Error::IndexOutOfBounds {
            index,
            len: self.keys.len(),
        })
    }

    pub fn raw_value(&self, index: usize) -> Result<&V> {
        self.values
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: self.values.len(),
            })
    }

    fn raw_next_from(&self, start: usize) -> Option<usize> {
        (start..self.links.len()).find(|&i| self.links[i].is_live())
    }

    #[inline]
    fn live_key(&self, i: usize) -> Option<&K> {
        self.keys.get(i).and_then(Option::as_ref)
    }

    #[inline]
    fn head(&self, bucket: usize) -> Option<usize> {
        self.buckets[bucket].checked_sub(1).map(|i| i as usize)
    }
}

impl<K, V, S> RawTable<K, V, S>
where
    S: KeyStrategy<K>,
{
    /// Table with room for `capacity` slots, rounded up to a prime.
    pub fn with_capacity_and_strategy(capacity: usize, strategy: S) -> Result<Self> {
        let mut table = Self::with_strategy(strategy);
        if capacity > 0 {
            let target = Self::prime_at_least(capacity)?;
            table.resize(target);
        }
        Ok(table)
    }

    fn prime_at_least(n: usize) -> Result<usize> {
        if n > MAX_CAPACITY {
            return Err(Error::CapacityOverflow { requested: n });
        }
        next_prime(n.max(MIN_CAPACITY), MAX_CAPACITY).ok_or(Error::CapacityOverflow { requested: n })
    }

    #[inline]
    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    /// Walks `key`'s chain. A walk longer than the capacity, or one that
    /// lands on a released slot, means the links were corrupted.
    fn probe(&self, hash: u64, key: &K) -> Result<Probe> {
        if self.buckets.is_empty() {
            return Ok(Probe::Vacant);
        }
        let bucket = self.bucket_of(hash);
        let mut prev = None;
        let mut cur = self.head(bucket);
        let mut steps = 0usize;
        while let Some(i) = cur {
            steps += 1;
            if steps > self.buckets.len() {
                return Err(Error::ConcurrentStructuralChange);
            }
            let link = match self.links.get(i) {
                Some(&l) if l.is_live() => l,
                _ => return Err(Error::ConcurrentStructuralChange),
            };
            let stored = self.live_key(i).ok_or(Error::ConcurrentStructuralChange)?;
            if self.strategy.equals(stored, key) {
                return Ok(Probe::Found {
                    bucket,
                    prev,
                    slot: i,
                });
            }
            prev = Some(i);
            cur = link.next();
        }
        Ok(Probe::Vacant)
    }

    pub fn find(&self, key: &K) -> Result<Option<usize>> {
        match self.probe(self.strategy.hash(key), key)? {
            Probe::Found { slot, .. } => Ok(Some(slot)),
            Probe::Vacant => Ok(None),
        }
    }

    pub fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.find(key)?.is_some())
    }

    pub fn token_of(&self, key: &K) -> Result<Option<Token>> {
        Ok(self.find(key)?.map(|i| Token::new(self.version, i as u32)))
    }

    pub fn get(&self, key: &K) -> Result<Option<&V>> {
        Ok(self.find(key)?.and_then(|i| self.values[i].as_ref()))
    }

    pub fn get_mut(&mut self, key: &K) -> Result<Option<&mut V>> {
        match self.find(key)? {
            Some(i) => Ok(self.values[i].as_mut()),
            None => Ok(None),
        }
    }

    /// Inserts or overwrites. An overwrite keeps the stored key, returns the
    /// old value and is not a structural change.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        let hash = self.strategy.hash(&key);
        if let Probe::Found { slot, .. } = self.probe(hash, &key)? {
            return Ok(self.values[slot].replace(value));
        }
        let slot = self.allocate()?;
        let bucket = self.bucket_of(hash);
        self.links[slot] = Link::to(self.head(bucket));
        self.buckets[bucket] = slot as u32 + 1;
        self.keys[slot] = Some(key);
        self.values[slot] = Some(value);
        self.version.bump();
        Ok(None)
    }

    pub fn remove(&mut self, key: &K) -> Result<Option<(K, V)>> {
        let (bucket, prev, slot) = match self.probe(self.strategy.hash(key), key)? {
            Probe::Found { bucket, prev, slot } => (bucket, prev, slot),
            Probe::Vacant => return Ok(None),
        };
        let next = self.links[slot];
        match prev {
            None => self.buckets[bucket] = next.next().map_or(0, |n| n as u32 + 1),
            Some(p) => self.links[p] = next,
        }
        self.links[slot] = Link::free(self.free_head);
        self.free_head = Some(slot);
        self.free_count += 1;
        self.version.bump();
        let key = self.keys[slot].take();
        let value = self.values[slot].take();
        Ok(key.zip(value))
    }

    /// Shrinks to the smallest prime `>= capacity`. Fails if that would not
    /// hold the current entries.
    pub fn trim(&mut self, capacity: usize) -> Result<()> {
        let len = self.len();
        if capacity < len {
            return Err(Error::InvalidCapacity {
                requested: capacity,
                len,
            });
        }
        if capacity >= self.buckets.len() {
            return Ok(());
        }
        let target = if capacity == 0 {
            0
        } else {
            Self::prime_at_least(capacity)?
        };
        if target < self.buckets.len() {
            self.resize(target);
        }
        Ok(())
    }

    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity <= self.buckets.len() {
            return Ok(());
        }
        let target = Self::prime_at_least(capacity)?;
        self.resize(target);
        Ok(())
    }

    fn allocate(&mut self) -> Result<usize> {
        if let Some(i) = self.free_head {
            self.free_head = self.links[i].next_free();
            self.free_count -= 1;
            trace!(slot = i, "reusing free slot");
            return Ok(i);
        }
        if self.keys.len() == self.buckets.len() {
            let target = Self::prime_at_least(self.keys.len().saturating_mul(2))?;
            self.resize(target);
        }
        let i = self.keys.len();
        self.keys.push(None);
        self.values.push(None);
        self.links.push(Link::END);
        Ok(i)
    }

    /// Rebuilds every array at `new_capacity`, compacting live slots to the
    /// front and discarding the free list.
    fn resize(&mut self, new_capacity: usize) {
        debug_assert!(new_capacity >= self.live_slots());
        self.version.bump();
        let old_capacity = self.buckets.len();
        let mut keys = Vec::with_capacity(new_capacity);
        let mut values = Vec::with_capacity(new_capacity);
        let mut links = Vec::with_capacity(new_capacity);
        let mut buckets = vec![0u32; new_capacity];
        let old_keys = mem::take(&mut self.keys);
        let old_values = mem::take(&mut self.values);
        for (k, v) in old_keys.into_iter().zip(old_values) {
            let (Some(k), Some(v)) = (k, v) else {
                continue;
            };
            let slot = keys.len();
            let b = (self.strategy.hash(&k) % new_capacity as u64) as usize;
            links.push(Link::to(buckets[b].checked_sub(1).map(|i| i as usize)));
            buckets[b] = slot as u32 + 1;
            keys.push(Some(k));
            values.push(Some(v));
        }
        self.keys = keys;
        self.values = values;
        self.links = links;
        self.buckets = buckets;
        self.free_head = None;
        self.free_count = 0;
        self.version.bump();
        debug!(
            old_capacity,
            new_capacity,
            live = self.keys.len(),
            "resized table"
        );
    }

    /// Hash of the entry set; independent of slot layout and insert order.
    pub fn content_hash(&self, value_hash: impl Fn(&V) -> u64) -> u64 {
        let mut acc = Unordered::new();
        for (k, v) in self.keys.iter().zip(&self.values) {
            if let (Some(k), Some(v)) = (k, v) {
                acc.add(entry_hash(self.strategy.hash(k), value_hash(v)));
            }
        }
        if let Some(v) = &self.null_value {
            acc.add(entry_hash(NULL_KEY_HASH, value_hash(v)));
        }
        acc.finish(self.len())
    }

    /// Same entries by key lookup, regardless of layout.
    pub fn same_entries<S2>(&self, other: &RawTable<K, V, S2>, eq: impl Fn(&V, &V) -> bool) -> bool
    where
        S2: KeyStrategy<K>,
    {
        if self.len() != other.len() {
            return false;
        }
        match (&self.null_value, &other.null_value) {
            (None, None) => {}
            (Some(a), Some(b)) if eq(a, b) => {}
            _ => return false,
        }
        self.keys.iter().zip(&self.values).all(|(k, v)| match (k, v) {
            (Some(k), Some(v)) => matches!(other.get(k), Ok(Some(o)) if eq(v, o)),
            _ => true,
        })
    }

    /// Checks bucket, chain and free-list invariants; panics on violation.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let cap = self.buckets.len();
        assert!(self.keys.len() <= cap, "high-water mark past capacity");
        assert_eq!(self.keys.len(), self.values.len());
        assert_eq!(self.keys.len(), self.links.len());
        let mut seen = vec![false; self.keys.len()];
        for b in 0..cap {
            let mut cur = self.head(b);
            let mut steps = 0;
            while let Some(i) = cur {
                steps += 1;
                assert!(steps <= cap, "chain longer than capacity");
                assert!(!seen[i], "slot {i} reachable twice");
                seen[i] = true;
                assert!(self.links[i].is_live());
                let k = self.keys[i].as_ref().expect("live slot has a key");
                assert!(self.values[i].is_some(), "live slot has a value");
                assert_eq!(self.bucket_of(self.strategy.hash(k)), b, "slot in wrong chain");
                cur = self.links[i].next();
            }
        }
        let mut free = 0;
        let mut cur = self.free_head;
        while let Some(i) = cur {
            assert!(!self.links[i].is_live(), "free slot {i} marked live");
            assert!(self.keys[i].is_none() && self.values[i].is_none());
            assert!(!seen[i], "slot {i} both live and free");
            seen[i] = true;
            free += 1;
            assert!(free <= self.keys.len(), "free list cycles");
            cur = self.links[i].next_free();
        }
        assert_eq!(free, self.free_count);
        assert!(seen.iter().all(|&s| s), "slot neither live nor free");
    }
}
