//! `Serialize` for the containers, built on the raw walk.
//!
//! The null key is written first. In maps it appears under
//! [`NULL_KEY_MARKER`]; in sets it is a unit `none` element.

use crate::byte_map::ByteMap;
use crate::hash_map::TokenMap;
use crate::hash_set::TokenSet;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Map key written for the null-key entry.
///
/// Only distinguishable from real keys whose serialized form is not the
/// string `"null"`. A string-keyed map holding both the null key and the key
/// `"null"` writes that map key twice; formats that reject duplicate keys
/// will fail on it, and `serde_json::Value` keeps the last one.
pub const NULL_KEY_MARKER: &str = "null";

enum MapKey<'a, K> {
    Null,
    Key(&'a K),
}

impl<K: Serialize> Serialize for MapKey<'_, K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            MapKey::Null => serializer.serialize_str(NULL_KEY_MARKER),
            MapKey::Key(k) => k.serialize(serializer),
        }
    }
}

impl<K, V, H> Serialize for TokenMap<K, V, H>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.len()))?;
        if let Some(v) = self.get_null() {
            state.serialize_entry(&MapKey::<K>::Null, v)?;
        }
        let mut slot = self.raw_next(None);
        while let Some(i) = slot {
            let key = self.raw_key(i).map_err(S::Error::custom)?;
            let value = self.raw_value(i).map_err(S::Error::custom)?;
            state.serialize_entry(&MapKey::Key(key), value)?;
            slot = self.raw_next(Some(i));
        }
        state.end()
    }
}

impl<K, H> Serialize for TokenSet<K, H>
where
    K: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_seq(Some(self.len()))?;
        if self.contains_null() {
            state.serialize_element(&None::<&K>)?;
        }
        let mut slot = self.raw_next(None);
        while let Some(i) = slot {
            let key = self.raw_key(i).map_err(S::Error::custom)?;
            state.serialize_element(&Some(key))?;
            slot = self.raw_next(Some(i));
        }
        state.end()
    }
}

impl<V> Serialize for ByteMap<V>
where
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.len()))?;
        if self.contains_null_key() {
            state.serialize_entry(&MapKey::<u8>::Null, &self.get_null())?;
        }
        let mut key = self.raw_next(None);
        while let Some(k) = key {
            state.serialize_entry(&MapKey::Key(&k), &self.get(k))?;
            key = self.raw_next(Some(k));
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_key_comes_first() {
        let mut m: TokenMap<u32, &str> = TokenMap::new();
        m.put(7, "seven").unwrap();
        m.put_null("nothing");
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"null":"nothing","7":"seven"}"#);
    }

    #[test]
    fn marker_repeats_for_string_key_null() {
        let mut m: TokenMap<String, u8> = TokenMap::new();
        m.put(NULL_KEY_MARKER.to_string(), 2).unwrap();
        m.put_null(1);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"null":1,"null":2}"#);
    }

    #[test]
    fn set_writes_none_first() {
        let mut s: TokenSet<i32> = TokenSet::new();
        s.add(1).unwrap();
        s.add_null();
        assert_eq!(serde_json::to_string(&s).unwrap(), "[null,1]");
    }

    #[test]
    fn byte_map_keeps_null_values() {
        let mut m: ByteMap<u16> = ByteMap::new();
        m.put(2, Some(20));
        m.put(1, None);
        assert_eq!(serde_json::to_string(&m).unwrap(), r#"{"1":null,"2":20}"#);
    }
}
