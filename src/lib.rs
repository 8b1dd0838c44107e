//! token-hashmap: memory-dense hash containers with a null-key channel and
//! versioned iteration tokens.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: primitive-keyed maps and sets whose storage is a handful of flat
//!   arrays, iterated through small `Token`s that detect concurrent
//!   structural change instead of silently misbehaving.
//! - Layers:
//!   - RawTable<K, V, S>: chained engine. Bucket heads point into parallel
//!     key/value/link arrays; released slots are threaded into a free list
//!     through the same link array and reused before the high-water mark
//!     grows.
//!   - TokenMap<K, V, S> / TokenSet<K, S>: typed surfaces over RawTable.
//!     Sets store `()` values.
//!   - ByteMap<V>: `u8` keys with nullable values, stored compressed
//!     (bitset + dense rank-indexed vector) until dense enough to switch to
//!     a flat 256-entry array.
//!
//! Constraints
//! - No per-entry heap allocation beyond the containers' own arrays.
//! - Capacities are primes in `[MIN_CAPACITY, MAX_CAPACITY]`; growth targets
//!   the next prime at least twice the occupied count.
//! - Key hashing and equality go through a `KeyStrategy`, so `f64` keys can
//!   compare bitwise (`DoubleSet`).
//! - Single-threaded. Mutation needs `&mut`; the version check only catches
//!   stale tokens and corrupt chains.
//!
//! Tokens
//! - A token packs the container version (high 32 bits) with a slot index
//!   (low 32 bits); the null key uses index `u32::MAX`.
//! - Any structural change (insert of a new key, removal, resize, clear)
//!   bumps the version. Overwriting a value does not.
//! - The safe walk visits the null key last. The raw walk (`raw_*`) skips
//!   it and performs no version check.
//!
//! Equality and hashing
//! - `PartialEq` and `Hash` depend only on the entry set. Per-entry hashes
//!   are combined commutatively, so slot layout and insertion order never
//!   leak into the result.
//!
//! Notes and non-goals
//! - No thread-safe mutation, no persistence.
//! - With the `serde` feature, containers implement `Serialize`; the null
//!   key is written first.

mod bits;
pub mod byte_map;
mod error;
pub mod hash_map;
pub mod hash_set;
mod hashing;
mod prime;
#[cfg(feature = "bench_internal")]
pub mod raw_table;
#[cfg(not(feature = "bench_internal"))]
mod raw_table;
mod raw_table_proptest;
#[cfg(feature = "serde")]
mod serde_impls;
mod strategy;
mod token;

// Public surface
pub use byte_map::{ByteMap, StorageMode, FLAT_THRESHOLD};
pub use error::{Error, Result};
pub use hash_map::{IntObjectMap, LongLongMap, TokenMap};
pub use hash_set::{DoubleSet, TokenSet};
pub use raw_table::{MAX_CAPACITY, MIN_CAPACITY};
#[cfg(feature = "serde")]
pub use serde_impls::NULL_KEY_MARKER;
pub use strategy::{F64Bits, Hashed, KeyStrategy};
pub use token::Token;
