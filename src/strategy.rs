//! Hash/equality strategy objects.
//!
//! The table never calls `Hash` or `Eq` on keys directly; it asks the
//! strategy it was built with. This lets key types without a lawful `Eq`
//! (floating point) live in the same engine as integers and strings.

use crate::hashing::fmix64;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Hashing and equality for keys of type `K`.
///
/// `equals(a, b)` must imply `hash(a) == hash(b)`. Two containers only hash
/// alike if their strategies produce the same hashes.
pub trait KeyStrategy<K: ?Sized> {
    fn hash(&self, key: &K) -> u64;
    fn equals(&self, a: &K, b: &K) -> bool;
}

/// Strategy for `K: Hash + Eq` driven by a `BuildHasher`.
///
/// The default builder is hashbrown's, which uses fixed keys, so every
/// table in a process agrees on key hashes.
#[derive(Clone, Debug, Default)]
pub struct Hashed<S = DefaultHashBuilder> {
    build: S,
}

impl<S> Hashed<S> {
    pub fn with_hasher(build: S) -> Self {
        Self { build }
    }
}

impl<K, S> KeyStrategy<K> for Hashed<S>
where
    K: Hash + Eq + ?Sized,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.build.hash_one(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Bitwise identity for `f64` keys: every NaN is one key, and `0.0` and
/// `-0.0` are distinct keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct F64Bits;

impl F64Bits {
    #[inline]
    fn canonical(x: f64) -> u64 {
        if x.is_nan() {
            f64::NAN.to_bits()
        } else {
            x.to_bits()
        }
    }
}

impl KeyStrategy<f64> for F64Bits {
    #[inline]
    fn hash(&self, key: &f64) -> u64 {
        fmix64(Self::canonical(*key))
    }

    #[inline]
    fn equals(&self, a: &f64, b: &f64) -> bool {
        Self::canonical(*a) == Self::canonical(*b)
    }
}
