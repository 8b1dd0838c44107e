// TokenMap integration suite.
//
// Core invariants exercised:
// - Size: len() counts distinct keys plus one for the null key.
// - Growth: prime capacities; content survives every resize.
// - Free list: released slots are recycled before the high-water mark grows.
// - Tokens: valid until the next structural change, then rejected.
// - Equality/hash: depend on the entry set only.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use token_hashmap::{Error, IntObjectMap, LongLongMap, TokenMap, MAX_CAPACITY};

fn std_hash<T: Hash>(t: &T) -> u64 {
    let mut h = DefaultHasher::new();
    t.hash(&mut h);
    h.finish()
}

// Test: put/get/remove round trip.
// Verifies: get after put returns the value; contains_key false after remove.
#[test]
fn put_get_remove_round_trip() {
    let mut m: LongLongMap = TokenMap::new();
    assert_eq!(m.capacity(), 0);
    assert_eq!(m.put(10, 100).unwrap(), None);
    assert_eq!(m.put(-3, 30).unwrap(), None);
    assert_eq!(m.get(&10).unwrap(), Some(&100));
    assert_eq!(m.put(10, 101).unwrap(), Some(100));
    assert_eq!(m.len(), 2);

    assert_eq!(m.remove(&10).unwrap(), Some(101));
    assert!(!m.contains_key(&10).unwrap());
    assert_eq!(m.remove(&10).unwrap(), None);
    assert_eq!(m.len(), 1);
}

// Test: growth preserves content.
// Assumes: capacity starts at MIN_CAPACITY and at least doubles per growth.
// Verifies: several growth events happen, each to a prime, and every key
// keeps its value.
#[test]
fn growth_preserves_content() {
    let mut m: LongLongMap = TokenMap::new();
    let mut capacities = Vec::new();
    for k in 0..500i64 {
        m.put(k * 7919, k).unwrap();
        if capacities.last() != Some(&m.capacity()) {
            capacities.push(m.capacity());
        }
    }
    assert!(capacities.len() >= 3, "capacities: {capacities:?}");
    assert_eq!(&capacities[..3], &[3, 7, 17]);
    for c in &capacities {
        assert!((2..*c).all(|d| c % d != 0), "{c} is not prime");
    }
    for k in 0..500i64 {
        assert_eq!(m.get(&(k * 7919)).unwrap(), Some(&k));
    }
}

// Test: free-list reuse.
// Verifies: removing N keys then inserting N new ones does not raise the
// high-water mark.
#[test]
fn removed_slots_are_recycled() {
    let mut m: IntObjectMap<String> = TokenMap::new();
    for k in 0..64 {
        m.put(k, k.to_string()).unwrap();
    }
    let high_water = m.high_water_mark();
    let capacity = m.capacity();
    for k in 0..64 {
        assert!(m.remove(&k).unwrap().is_some());
    }
    assert!(m.is_empty());
    for k in 1000..1064 {
        m.put(k, k.to_string()).unwrap();
    }
    assert!(m.high_water_mark() <= high_water);
    assert_eq!(m.capacity(), capacity);
    assert_eq!(m.get(&1032).unwrap().map(String::as_str), Some("1032"));
}

// Test: the null key is a separate channel.
// Verifies: it counts toward len, comes last in the safe walk and never
// appears in the raw walk.
#[test]
fn null_key_channel() {
    let mut m: IntObjectMap<&str> = TokenMap::new();
    assert_eq!(m.put_null("n"), None);
    m.put(1, "one").unwrap();
    m.put(2, "two").unwrap();
    assert_eq!(m.len(), 3);
    assert!(m.contains_null_key());
    assert!(m.contains_value(&"n"));

    let mut keys = Vec::new();
    let mut tok = m.token_first();
    while let Some(t) = tok {
        keys.push(m.key_at(t).unwrap().copied());
        tok = m.token_next(t).unwrap();
    }
    assert_eq!(keys.last(), Some(&None));
    assert_eq!(keys.len(), 3);

    let mut raw = Vec::new();
    let mut i = m.raw_next(None);
    while let Some(idx) = i {
        raw.push(*m.raw_key(idx).unwrap());
        i = m.raw_next(Some(idx));
    }
    raw.sort();
    assert_eq!(raw, vec![1, 2]);

    let t = m.token_of_null().unwrap();
    assert!(t.is_null_key());
    assert_eq!(m.value_at(t).unwrap(), &"n");
    assert_eq!(m.put_null("m"), Some("n"));
    assert_eq!(m.remove_null(), Some("m"));
    assert_eq!(m.remove_null(), None);
    assert_eq!(m.len(), 2);
}

// Test: stale tokens.
// Verifies: overwriting a value keeps tokens valid; adding a key or the null
// key invalidates them.
#[test]
fn tokens_go_stale_on_structural_change() {
    let mut m: LongLongMap = TokenMap::new();
    m.put(1, 10).unwrap();
    m.put(2, 20).unwrap();
    let t = m.token_of(&1).unwrap().unwrap();

    m.put(1, 11).unwrap();
    assert_eq!(m.value_at(t).unwrap(), &11);

    *m.value_at_mut(t).unwrap() = 12;
    assert_eq!(m.get(&1).unwrap(), Some(&12));

    m.put(3, 30).unwrap();
    assert_eq!(m.token_next(t), Err(Error::ConcurrentStructuralChange));
    assert_eq!(m.key_at(t), Err(Error::ConcurrentStructuralChange));

    let t = m.token_first().unwrap();
    m.put_null(0);
    assert_eq!(m.value_at(t), Err(Error::ConcurrentStructuralChange));
}

// Test: a token for a removed entry is rejected even after its slot is reused.
#[test]
fn token_for_reused_slot_is_rejected() {
    let mut m: LongLongMap = TokenMap::new();
    m.put(1, 1).unwrap();
    let t = m.token_of(&1).unwrap().unwrap();
    m.remove(&1).unwrap();
    m.put(2, 2).unwrap();
    assert_eq!(m.high_water_mark(), 1);
    assert_eq!(m.key_at(t), Err(Error::ConcurrentStructuralChange));
}

// Test: trim bounds.
// Verifies: trimming below len is rejected with state unchanged; trimming to
// len shrinks to the smallest prime that fits.
#[test]
fn trim_rejects_capacity_below_len() {
    let mut m: LongLongMap = TokenMap::new();
    for k in 0..5 {
        m.put(k, k).unwrap();
    }
    assert_eq!(m.capacity(), 7);
    assert_eq!(
        m.trim(4),
        Err(Error::InvalidCapacity {
            requested: 4,
            len: 5
        })
    );
    assert_eq!(m.capacity(), 7);
    m.trim(5).unwrap();
    assert_eq!(m.capacity(), 5);
    for k in 0..5 {
        assert_eq!(m.get(&k).unwrap(), Some(&k));
    }
}

#[test]
fn capacity_hints() {
    let m: LongLongMap = TokenMap::with_capacity(0).unwrap();
    assert_eq!(m.capacity(), 0);
    let m: LongLongMap = TokenMap::with_capacity(10).unwrap();
    assert_eq!(m.capacity(), 11);
    let err = LongLongMap::with_capacity(MAX_CAPACITY + 1).unwrap_err();
    assert_eq!(
        err,
        Error::CapacityOverflow {
            requested: MAX_CAPACITY + 1
        }
    );

    let mut m: LongLongMap = TokenMap::new();
    m.ensure_capacity(20).unwrap();
    assert_eq!(m.capacity(), 23);
    m.ensure_capacity(4).unwrap();
    assert_eq!(m.capacity(), 23);
}

// Test: raw accessors reject indices that are not live slots.
#[test]
fn raw_access_out_of_bounds() {
    let mut m: LongLongMap = TokenMap::new();
    m.put(5, 50).unwrap();
    m.put(6, 60).unwrap();
    m.remove(&5).unwrap();
    assert!(matches!(m.raw_key(0), Err(Error::IndexOutOfBounds { index: 0, .. })));
    assert_eq!(
        m.raw_value(99),
        Err(Error::IndexOutOfBounds { index: 99, len: 2 })
    );
    assert_eq!(m.raw_value(1), Ok(&60));
}

// Test: clone is a deep copy of the table arrays.
#[test]
fn clone_is_independent() {
    let mut a: IntObjectMap<Vec<u8>> = TokenMap::new();
    a.put(1, vec![1]).unwrap();
    let mut b = a.clone();
    b.put(2, vec![2]).unwrap();
    b.get_mut(&1).unwrap().unwrap().push(9);
    assert_eq!(a.len(), 1);
    assert_eq!(a.get(&1).unwrap(), Some(&vec![1]));
    assert_eq!(b.get(&1).unwrap(), Some(&vec![1, 9]));
}

// Test: order independence of equality and hashing.
// Verifies: same entries inserted forwards, backwards and after churn
// compare equal and hash alike; a differing value breaks equality.
#[test]
fn equality_ignores_insertion_order() {
    let mut a: LongLongMap = TokenMap::new();
    let mut b: LongLongMap = TokenMap::new();
    for k in 0..40 {
        a.put(k, k * 2).unwrap();
    }
    for k in (-10..40).rev() {
        b.put(k, k * 2).unwrap();
    }
    for k in -10..0 {
        b.remove(&k).unwrap();
    }
    a.put_null(-1);
    b.put_null(-1);
    assert_eq!(a, b);
    assert_eq!(a.content_hash(), b.content_hash());
    assert_eq!(std_hash(&a), std_hash(&b));

    b.put(0, 1).unwrap();
    assert_ne!(a, b);
    b.put(0, 0).unwrap();
    b.remove_null();
    assert_ne!(a, b);
}

#[test]
fn clear_keeps_capacity() {
    let mut m: LongLongMap = TokenMap::new();
    for k in 0..10 {
        m.put(k, k).unwrap();
    }
    m.put_null(1);
    let cap = m.capacity();
    m.clear();
    assert!(m.is_empty());
    assert_eq!(m.capacity(), cap);
    assert_eq!(m.high_water_mark(), 0);
    assert_eq!(m.token_first(), None);
    m.put(3, 3).unwrap();
    assert_eq!(m.get(&3).unwrap(), Some(&3));
}

#[test]
fn iter_matches_token_walk() {
    let mut m: TokenMap<String, usize> = TokenMap::new();
    for w in ["a", "bb", "ccc"] {
        m.put(w.to_string(), w.len()).unwrap();
    }
    m.put_null(0);
    let from_iter: Vec<(Option<&String>, &usize)> = m.iter().collect();
    let mut from_tokens = Vec::new();
    let mut tok = m.token_first();
    while let Some(t) = tok {
        from_tokens.push((m.key_at(t).unwrap(), m.value_at(t).unwrap()));
        tok = m.token_next(t).unwrap();
    }
    assert_eq!(from_iter, from_tokens);
    assert_eq!((&m).into_iter().count(), 4);
}
