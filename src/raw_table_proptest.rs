#![cfg(test)]

// Property tests for RawTable kept inside the crate so they can check
// internal invariants after every operation.

use crate::error::Error;
use crate::raw_table::RawTable;
use crate::strategy::Hashed;
use crate::token::Token;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations: indices shrink to earlier keys, and op lists
// shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    PutNull(i32),
    RemoveNull,
    Walk,
    RawWalk,
    StaleToken(usize),
    Trim(usize),
    Ensure(usize),
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<i64>, Vec<OpI>)> {
    proptest::collection::vec(any::<i64>(), 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            8 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            4 => idx.clone().prop_map(OpI::Remove),
            3 => idx.clone().prop_map(OpI::Get),
            1 => any::<i32>().prop_map(OpI::PutNull),
            1 => Just(OpI::RemoveNull),
            1 => Just(OpI::Walk),
            1 => Just(OpI::RawWalk),
            1 => idx.clone().prop_map(OpI::StaleToken),
            1 => (0usize..40).prop_map(OpI::Trim),
            1 => (0usize..80).prop_map(OpI::Ensure),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn walk<S>(sut: &RawTable<i64, i32, S>) -> (Vec<Option<i64>>, Vec<i32>) {
    let mut keys = Vec::new();
    let mut values = Vec::new();
    let mut tok = sut.token_first();
    while let Some(t) = tok {
        keys.push(sut.key_at(t).unwrap().copied());
        values.push(*sut.value_at(t).unwrap());
        tok = sut.token_next(t).unwrap();
    }
    (keys, values)
}

fn run<S>(mut sut: RawTable<i64, i32, S>, pool: Vec<i64>, ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    S: crate::strategy::KeyStrategy<i64>,
{
    let mut model: HashMap<i64, i32> = HashMap::new();
    let mut null: Option<i32> = None;

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = pool[i];
                let prev = sut.insert(k, v).unwrap();
                prop_assert_eq!(prev, model.insert(k, v));
            }
            OpI::Remove(i) => {
                let k = pool[i];
                let got = sut.remove(&k).unwrap();
                prop_assert_eq!(got, model.remove(&k).map(|v| (k, v)));
            }
            OpI::Get(i) => {
                let k = pool[i];
                prop_assert_eq!(sut.get(&k).unwrap(), model.get(&k));
                prop_assert_eq!(sut.contains_key(&k).unwrap(), model.contains_key(&k));
                let tok = sut.token_of(&k).unwrap();
                prop_assert_eq!(tok.is_some(), model.contains_key(&k));
                if let Some(t) = tok {
                    prop_assert_eq!(sut.key_at(t).unwrap(), Some(&k));
                }
            }
            OpI::PutNull(v) => {
                prop_assert_eq!(sut.put_null(v), null.replace(v));
            }
            OpI::RemoveNull => {
                prop_assert_eq!(sut.remove_null(), null.take());
            }
            OpI::Walk => {
                let (keys, values) = walk(&sut);
                // Null key, when present, is last.
                prop_assert_eq!(keys.last() == Some(&None), null.is_some());
                let got: BTreeMap<Option<i64>, i32> = keys.into_iter().zip(values).collect();
                let mut want: BTreeMap<Option<i64>, i32> =
                    model.iter().map(|(k, v)| (Some(*k), *v)).collect();
                if let Some(v) = null {
                    want.insert(None, v);
                }
                prop_assert_eq!(got, want);
            }
            OpI::RawWalk => {
                let mut seen = BTreeSet::new();
                let mut i = sut.raw_next(None);
                while let Some(idx) = i {
                    prop_assert!(seen.insert(*sut.raw_key(idx).unwrap()));
                    i = sut.raw_next(Some(idx));
                }
                let want: BTreeSet<i64> = model.keys().copied().collect();
                prop_assert_eq!(seen, want);
            }
            OpI::StaleToken(i) => {
                let k = pool[i];
                let before: Option<Token> = sut.token_first();
                // A structural change on a fresh key must invalidate tokens.
                if !model.contains_key(&k) {
                    sut.insert(k, 0).unwrap();
                    model.insert(k, 0);
                    if let Some(t) = before {
                        prop_assert_eq!(sut.token_next(t), Err(Error::ConcurrentStructuralChange));
                    }
                }
            }
            OpI::Trim(c) => {
                let len = sut.len();
                let cap = sut.capacity();
                match sut.trim(c) {
                    Ok(()) => prop_assert!(c >= len),
                    Err(Error::InvalidCapacity { requested, len: l }) => {
                        prop_assert!(c < len);
                        prop_assert_eq!((requested, l), (c, len));
                        prop_assert_eq!(sut.capacity(), cap);
                    }
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            OpI::Ensure(c) => {
                sut.ensure_capacity(c).unwrap();
                prop_assert!(sut.capacity() >= c);
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                null = None;
            }
        }

        sut.assert_invariants();
        prop_assert_eq!(sut.len(), model.len() + usize::from(null.is_some()));
        prop_assert_eq!(sut.is_empty(), model.is_empty() && null.is_none());
        prop_assert_eq!(sut.get_null(), null.as_ref());
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// Exercised invariants:
// - insert/remove/get parity and previous-value reporting.
// - Every live slot reachable from exactly one chain; free list exact.
// - Safe walk visits each entry once with the null key last; raw walk
//   visits each slot entry once and never the null key.
// - Tokens go stale on structural change; trim rejects sizes below len.
proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(RawTable::<i64, i32>::with_strategy(Hashed::default()), pool, ops)?;
    }
}

// Collision variant: every key lands in one chain.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same invariants under worst-case collisions.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run(RawTable::with_strategy(Hashed::with_hasher(ConstBuildHasher)), pool, ops)?;
    }
}

// Property: content hash and equality ignore insertion order.
proptest! {
    #[test]
    fn prop_order_independent_hash(entries in proptest::collection::btree_map(any::<i64>(), any::<i32>(), 0..40), null in any::<Option<i32>>(), seed in any::<u64>()) {
        let forward: Vec<(i64, i32)> = entries.iter().map(|(k, v)| (*k, *v)).collect();
        let mut shuffled = forward.clone();
        // Deterministic shuffle from the seed.
        let mut s = seed | 1;
        for i in (1..shuffled.len()).rev() {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            shuffled.swap(i, (s >> 33) as usize % (i + 1));
        }
        let mut a: RawTable<i64, i32> = RawTable::with_strategy(Hashed::default());
        let mut b: RawTable<i64, i32> = RawTable::with_strategy(Hashed::default());
        for (k, v) in &forward { a.insert(*k, *v).unwrap(); }
        for (k, v) in &shuffled { b.insert(*k, *v).unwrap(); }
        if let Some(v) = null {
            b.put_null(v);
            a.put_null(v);
        }
        let vh = |v: &i32| crate::hashing::value_hash(v);
        prop_assert_eq!(a.content_hash(vh), b.content_hash(vh));
        prop_assert!(a.same_entries(&b, |x, y| x == y));
        prop_assert!(b.same_entries(&a, |x, y| x == y));
    }
}
