// ByteMap integration suite.
//
// Core invariants exercised:
// - Mode: compressed while at most FLAT_THRESHOLD keys hold values, flat
//   after the next one arrives; fit() is the only way back.
// - Strategy equivalence: lookups and cardinality agree across a migration.
// - Null values are stored, counted in len() and reported as null.
use token_hashmap::{ByteMap, Error, StorageMode, FLAT_THRESHOLD};

// Test: keys 1..200 cross the threshold once.
// Verifies: compressed up to key 127, flat from key 128 on, get(50) stable.
#[test]
fn migrates_at_threshold() {
    let mut m = ByteMap::new();
    let mut before = None;
    for k in 1..200u8 {
        m.put(k, Some(u32::from(k) * 3));
        if (k as usize) <= FLAT_THRESHOLD {
            assert_eq!(m.mode(), StorageMode::Compressed, "key {k}");
            before = m.get(50).copied();
        } else {
            assert_eq!(m.mode(), StorageMode::Flat, "key {k}");
        }
    }
    assert_eq!(before, Some(150));
    assert_eq!(m.get(50).copied(), before);
    assert_eq!(m.cardinality(), 199);
    assert_eq!(m.len(), 199);
}

// Test: strategy equivalence across migration.
// Verifies: every key reads the same before and after the migrating insert.
#[test]
fn lookups_survive_migration() {
    let mut m = ByteMap::new();
    for k in 0..FLAT_THRESHOLD as u8 {
        m.put(k * 2, Some(k));
    }
    m.put(1, None);
    assert_eq!(m.mode(), StorageMode::Compressed);
    let before: Vec<Option<u8>> = (0..=255u8).map(|k| m.get(k).copied()).collect();
    let cardinality = m.cardinality();

    m.put(255, Some(255));
    assert_eq!(m.mode(), StorageMode::Flat);
    for k in 0..=254u8 {
        assert_eq!(m.get(k).copied(), before[k as usize], "key {k}");
    }
    assert_eq!(m.cardinality(), cardinality + 1);
    assert!(m.contains_key(1));
    assert!(m.contains_value(None));
}

#[test]
fn fit_recompresses_sparse_flat_map() {
    let mut m = ByteMap::new();
    for k in 0..=200u8 {
        m.put(k, Some(k));
    }
    assert_eq!(m.mode(), StorageMode::Flat);
    for k in 10..=200u8 {
        m.remove(k);
    }
    // Removal never migrates back on its own.
    assert_eq!(m.mode(), StorageMode::Flat);
    m.fit();
    assert_eq!(m.mode(), StorageMode::Compressed);
    assert_eq!(m.cardinality(), 10);
    for k in 0..10u8 {
        assert_eq!(m.get(k), Some(&k));
    }
    assert_eq!(m.get(10), None);
}

#[test]
fn null_values_and_null_key() {
    let mut m: ByteMap<&str> = ByteMap::new();
    assert_eq!(m.put(7, None), None);
    assert_eq!(m.put(7, Some("seven")), Some(None));
    assert_eq!(m.put(7, None), Some(Some("seven")));
    assert!(m.contains_key(7));
    assert!(m.contains_value(None));
    assert_eq!(m.get(7), None);

    assert_eq!(m.put_null(Some("n")), None);
    assert!(m.contains_null_key());
    assert_eq!(m.get_null(), Some(&"n"));
    assert!(m.contains_value(Some(&"n")));
    assert_eq!(m.len(), 2);
    assert_eq!(m.cardinality(), 0);

    assert_eq!(m.remove(7), Some(None));
    assert_eq!(m.remove(7), None);
    assert_eq!(m.remove_null(), Some(Some("n")));
    assert!(m.is_empty());
}

// Test: token walk over byte keys.
// Verifies: ascending order, null key last, stale after a structural change,
// but not after a value overwrite.
#[test]
fn token_walk() {
    let mut m: ByteMap<i8> = ByteMap::new();
    m.put(200, Some(-1));
    m.put(3, None);
    m.put_null(Some(9));

    let mut seen = Vec::new();
    let mut tok = m.token_first();
    while let Some(t) = tok {
        seen.push((m.key_at(t).unwrap(), m.has_value(t).unwrap()));
        tok = m.token_next(t).unwrap();
    }
    assert_eq!(seen, vec![(Some(3), false), (Some(200), true), (None, true)]);

    let t = m.token_of(200).unwrap();
    m.put(200, Some(-2));
    assert_eq!(m.value_at(t).unwrap(), Some(&-2));
    m.put(4, Some(4));
    assert_eq!(m.value_at(t), Err(Error::ConcurrentStructuralChange));
    assert_eq!(m.token_of(5), None);
}

#[test]
fn raw_walk_skips_null_key() {
    let mut m: ByteMap<u16> = ByteMap::new();
    m.put_null(Some(0));
    m.put(9, Some(90));
    m.put(255, None);
    let mut keys = Vec::new();
    let mut k = m.raw_next(None);
    while let Some(key) = k {
        keys.push(key);
        k = m.raw_next(Some(key));
    }
    assert_eq!(keys, vec![9, 255]);
    assert_eq!(m.raw_value(9), Ok(Some(&90)));
    assert_eq!(m.raw_value(255), Ok(None));
    assert_eq!(
        m.raw_value(10),
        Err(Error::IndexOutOfBounds { index: 10, len: 256 })
    );
    assert_eq!(
        m.raw_value(256),
        Err(Error::IndexOutOfBounds { index: 256, len: 256 })
    );
}

// Test: equality and hashing ignore storage mode.
#[test]
fn equality_across_modes() {
    let mut flat = ByteMap::new();
    for k in 0..=FLAT_THRESHOLD as u8 {
        flat.put(k, Some(k));
    }
    for k in 20..=FLAT_THRESHOLD as u8 {
        flat.remove(k);
    }
    assert_eq!(flat.mode(), StorageMode::Flat);

    let mut compressed = ByteMap::new();
    for k in (0..20u8).rev() {
        compressed.put(k, Some(k));
    }
    assert_eq!(compressed.mode(), StorageMode::Compressed);
    assert_eq!(flat, compressed);
    assert_eq!(flat.content_hash(), compressed.content_hash());

    compressed.put(5, None);
    assert_ne!(flat, compressed);
    assert_ne!(flat.content_hash(), compressed.content_hash());
}

#[test]
fn clear_returns_to_compressed() {
    let mut m = ByteMap::new();
    for k in 0..=255u8 {
        m.put(k, Some(k));
    }
    m.put_null(None);
    assert_eq!(m.len(), 257);
    m.clear();
    assert!(m.is_empty());
    assert_eq!(m.mode(), StorageMode::Compressed);
    assert_eq!(m.token_first(), None);
}
