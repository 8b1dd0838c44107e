//! Order-independent content hashing.
//!
//! Each entry contributes one mixed 64-bit hash; the accumulator combines
//! them with commutative operations (sum, xor, odd product) so the result
//! depends only on the set of entries, never on slot layout or insertion
//! order.

use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Key hash contributed by the null key.
pub(crate) const NULL_KEY_HASH: u64 = 0x6a09_e667_f3bc_c908;

/// Murmur3 64-bit finalizer.
#[inline]
pub(crate) fn fmix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

/// Deterministic hash for stored values. Fixed keys, so two containers built
/// in the same process agree.
#[inline]
pub(crate) fn value_hash<V: Hash + ?Sized>(v: &V) -> u64 {
    DefaultHashBuilder::default().hash_one(v)
}

#[inline]
pub(crate) fn entry_hash(key_hash: u64, value_hash: u64) -> u64 {
    fmix64(key_hash.wrapping_add(value_hash.rotate_left(31)))
}

#[derive(Debug)]
pub(crate) struct Unordered {
    sum: u64,
    xor: u64,
    product: u64,
}

impl Unordered {
    pub(crate) fn new() -> Self {
        Self {
            sum: 0,
            xor: 0,
            product: 1,
        }
    }

    #[inline]
    pub(crate) fn add(&mut self, h: u64) {
        self.sum = self.sum.wrapping_add(h);
        self.xor ^= h;
        self.product = self.product.wrapping_mul(h | 1);
    }

    pub(crate) fn finish(&self, len: usize) -> u64 {
        let h = fmix64(self.sum ^ len as u64);
        let h = fmix64(h.wrapping_add(self.xor.rotate_left(23)));
        fmix64(h ^ self.product.rotate_left(47))
    }
}
