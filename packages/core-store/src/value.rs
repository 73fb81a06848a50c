//! The Value type - the state tree held by a store.
//!
//! Interior nodes are maps keyed by string or arrays indexed by decimal
//! fragment. Everything else is a leaf.

use std::collections::BTreeMap;

use crate::StorePath;

/// A tree-shaped value that can be stored, derived and observed.
///
/// # Design Notes
///
/// - Uses `BTreeMap` for deterministic ordering (comparison, debug output)
/// - Includes `Bytes` for binary leaves
/// - Uses `i64` for integers
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absence of a value. Distinct from "path doesn't exist".
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Key-value map with string keys.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a map.
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_map(self) -> Option<BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Look up a single child: a key of a map, or a decimal index of an array.
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            Value::Array(arr) => arr.get(key.parse::<usize>().ok()?),
            _ => None,
        }
    }

    /// Get a reference to a nested value by path.
    ///
    /// Returns `None` as soon as a fragment is missing or the traversal hits a
    /// leaf. Never fails.
    pub fn get(&self, path: &StorePath) -> Option<&Value> {
        let mut current = self;
        for fragment in path.iter() {
            current = current.get_key(fragment)?;
        }
        Some(current)
    }

    /// Take the child at `key` out of this node, if there is one.
    ///
    /// Map entries are removed; array elements are swapped for `Null` so the
    /// indices of their siblings do not shift.
    pub fn take_child(&mut self, key: &str) -> Option<Value> {
        match self {
            Value::Map(map) => map.remove(key),
            Value::Array(items) => items.get_mut(key.parse::<usize>().ok()?).map(std::mem::take),
            _ => None,
        }
    }

    /// Store `value` as the child at `key`.
    ///
    /// An array accepts an in-range index, or the index one past its end,
    /// which appends. Any other key turns the node into a map first; see
    /// [`Value::coerce_to_map`].
    pub fn set_child(&mut self, key: &str, value: Value) {
        let index = self.writable_index(key);
        match (self, index) {
            (Value::Map(map), _) => {
                map.insert(key.to_string(), value);
            }
            (Value::Array(items), Some(index)) if index == items.len() => items.push(value),
            (Value::Array(items), Some(index)) => items[index] = value,
            (node, _) => {
                node.coerce_to_map();
                node.set_child(key, value);
            }
        }
    }

    /// Borrow the child at `key` for writing, creating an empty map there if
    /// it is missing. Indexing follows [`Value::set_child`].
    pub fn child_mut(&mut self, key: &str) -> &mut Value {
        let index = self.writable_index(key);
        match (self, index) {
            (Value::Map(map), _) => map.entry(key.to_string()).or_insert_with(Value::map),
            (Value::Array(items), Some(index)) => {
                if index == items.len() {
                    items.push(Value::map());
                }
                &mut items[index]
            }
            (node, _) => {
                node.coerce_to_map();
                node.child_mut(key)
            }
        }
    }

    /// Walk `fragments` from this node with [`Value::child_mut`] and return
    /// the node reached at the end.
    pub fn descend_mut(&mut self, fragments: &[String]) -> &mut Value {
        let mut cursor = self;
        for fragment in fragments {
            cursor = cursor.child_mut(fragment);
        }
        cursor
    }

    /// Turn this node into a map unless it already is one.
    ///
    /// Array elements are kept under their decimal index. Any other value is
    /// discarded.
    pub fn coerce_to_map(&mut self) {
        let map = match std::mem::take(self) {
            Value::Map(map) => map,
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item))
                .collect(),
            _ => BTreeMap::new(),
        };
        *self = Value::Map(map);
    }

    fn writable_index(&self, key: &str) -> Option<usize> {
        match self {
            Value::Array(items) => key.parse::<usize>().ok().filter(|index| *index <= items.len()),
            _ => None,
        }
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> StorePath {
        StorePath::parse(s)
    }

    fn map_of<const N: usize>(entries: [(&str, Value); N]) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn get_nested_value() {
        let mut value = Value::map();
        value.child_mut("foo").set_child("bar", Value::from("hello"));

        assert_eq!(value.get(&path("foo/bar")), Some(&Value::from("hello")));
        assert!(value.get(&path("foo")).unwrap().is_map());
        assert_eq!(value.get(&path("nonexistent")), None);
        assert_eq!(value.get(&path("")), Some(&value));
    }

    #[test]
    fn get_through_leaf_is_none() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::from("test"));
        let value = Value::Map(map);

        assert_eq!(value.get(&path("a/b/c/d")), None);
    }

    #[test]
    fn array_index_reads() {
        let mut map = BTreeMap::new();
        map.insert(
            "items".to_string(),
            Value::Array(vec![Value::from("a"), Value::from("b")]),
        );
        let value = Value::Map(map);

        assert_eq!(value.get(&path("items/1")), Some(&Value::from("b")));
        assert_eq!(value.get(&path("items/2")), None);
        assert_eq!(value.get(&path("items/first")), None);
    }

    #[test]
    fn descend_mut_creates_intermediates() {
        let mut value = Value::map();
        let fragments: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        value
            .descend_mut(&fragments)
            .set_child("d", Value::from(42i64));

        assert_eq!(value.get(&path("a/b/c/d")), Some(&Value::from(42i64)));
        assert!(value.get(&path("a")).unwrap().is_map());
        assert!(value.get(&path("a/b")).unwrap().is_map());
    }

    #[test]
    fn writes_through_arrays_keep_siblings() {
        let mut value = Value::Array(vec![Value::from("a"), Value::from("b"), Value::from("c")]);

        assert_eq!(value.take_child("0"), Some(Value::from("a")));
        value.set_child("0", Value::from("z"));
        value.set_child("3", Value::from("d"));
        value.child_mut("1").set_child("x", Value::Bool(true));

        assert_eq!(
            value,
            Value::Array(vec![
                Value::from("z"),
                map_of([("x", Value::Bool(true))]),
                Value::from("c"),
                Value::from("d"),
            ])
        );
    }

    #[test]
    fn array_appends_only_at_its_end() {
        let mut value = Value::Array(vec![Value::from(1i64)]);
        value.child_mut("1").set_child("k", Value::Null);
        assert_eq!(value.get(&path("1/k")), Some(&Value::Null));
        assert!(matches!(&value, Value::Array(items) if items.len() == 2));
    }

    #[test]
    fn array_with_foreign_key_becomes_indexed_map() {
        let mut value = Value::Array(vec![Value::from("a"), Value::from("b")]);
        value.set_child("9", Value::from("far"));

        assert_eq!(
            value,
            map_of([
                ("0", Value::from("a")),
                ("1", Value::from("b")),
                ("9", Value::from("far")),
            ])
        );
        assert_eq!(value.take_child("name"), None);
    }

    #[test]
    fn writing_through_a_leaf_replaces_it() {
        let mut value = Value::from(3i64);
        assert_eq!(value.take_child("k"), None);
        value.set_child("k", Value::Bool(true));
        assert_eq!(value, map_of([("k", Value::Bool(true))]));

        let mut value = Value::from("leaf");
        value.child_mut("a").set_child("b", Value::from(1i64));
        assert_eq!(value.get(&path("a/b")), Some(&Value::from(1i64)));
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(7i32).as_i64(), Some(7));
        assert!(Value::Null.is_null());
        assert!(Value::map().into_map().unwrap().is_empty());
        assert!(Value::from(1.5).as_map().is_none());
    }
}
