//! Typed attribute values and the per-node attribute store.
//!
//! Attribute values form a closed set of semantic types. Anything outside
//! that set is not representable, which keeps metadata statically checkable.

use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

use crate::util::Chrono;

/// Semantic type of an attribute value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// UTF-8 string
    Text,
    /// Scalar real number
    Real,
    /// Fixed-length real vector of the given length
    Vector(usize),
    /// Point in time, seconds
    Timestamp,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("string"),
            Self::Real => f.write_str("real"),
            Self::Vector(n) => write!(f, "vector[{}]", n),
            Self::Timestamp => f.write_str("timestamp"),
        }
    }
}

/// Value of a single attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    /// UTF-8 string.
    Text(String),
    /// Scalar real number.
    Real(f64),
    /// Fixed-length real vector (`coordinate` / `orientation` use length 3).
    Vector(SmallVec<[f64; 3]>),
    /// Timestamp in seconds.
    Timestamp(Chrono),
}

impl AttributeValue {
    /// Create a timestamp value.
    pub fn timestamp(seconds: Chrono) -> Self {
        Self::Timestamp(seconds)
    }

    /// Semantic type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Text(_) => ValueType::Text,
            Self::Real(_) => ValueType::Real,
            Self::Vector(v) => ValueType::Vector(v.len()),
            Self::Timestamp(_) => ValueType::Timestamp,
        }
    }

    /// Get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as scalar real.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as a real vector.
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Get as a 3-element vector.
    pub fn as_vector3(&self) -> Option<[f64; 3]> {
        match self.as_vector()? {
            [x, y, z] => Some([*x, *y, *z]),
            _ => None,
        }
    }

    /// Time value of a `Timestamp` or a `Real` (seconds).
    pub fn as_time(&self) -> Option<Chrono> {
        match self {
            Self::Timestamp(t) | Self::Real(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<[f64; 3]> for AttributeValue {
    fn from(v: [f64; 3]) -> Self {
        Self::Vector(SmallVec::from_buf(v))
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(SmallVec::from_vec(v))
    }
}

impl From<&[f64]> for AttributeValue {
    fn from(v: &[f64]) -> Self {
        Self::Vector(SmallVec::from_slice(v))
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{:?}", s),
            Self::Real(v) => write!(f, "{}", v),
            Self::Vector(v) => write!(f, "{:?}", v.as_slice()),
            Self::Timestamp(t) => write!(f, "t={}s", t),
        }
    }
}

/// Key/value attributes of one node.
///
/// Keys are unique; setting an existing key overwrites it. Iteration is in
/// lexicographic key order so serialization is reproducible.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeStore {
    entries: BTreeMap<String, AttributeValue>,
}

impl AttributeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Option<AttributeValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.get(key)
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over key-value pairs in lexicographic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> + Clone + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over keys in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a AttributeStore {
    type Item = (&'a String, &'a AttributeValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut attrs = AttributeStore::new();
        assert_eq!(attrs.set("unit", "V"), None);
        assert_eq!(attrs.set("unit", "mV"), Some(AttributeValue::from("V")));
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("unit").and_then(AttributeValue::as_str), Some("mV"));
    }

    #[test]
    fn test_lexicographic_order() {
        let mut attrs = AttributeStore::new();
        attrs.set("unit", "m/s^2");
        attrs.set("coordinate", [0.0, 1.0, 2.0]);
        attrs.set("name", "A1");
        attrs.set("conversion", 0.5);

        let keys: Vec<&str> = attrs.keys().collect();
        assert_eq!(keys, vec!["conversion", "coordinate", "name", "unit"]);

        let again: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, again);
    }

    #[test]
    fn test_value_types() {
        assert_eq!(AttributeValue::from("x").value_type(), ValueType::Text);
        assert_eq!(AttributeValue::from(1.5).value_type(), ValueType::Real);
        assert_eq!(AttributeValue::from([1.0, 0.0, 0.0]).value_type(), ValueType::Vector(3));
        assert_eq!(AttributeValue::from(vec![1.0, 0.0]).value_type(), ValueType::Vector(2));
        assert_eq!(AttributeValue::timestamp(3.0).value_type(), ValueType::Timestamp);
        assert_eq!(ValueType::Vector(3).to_string(), "vector[3]");
    }

    #[test]
    fn test_accessors() {
        let v = AttributeValue::from([1.0, 2.0, 3.0]);
        assert_eq!(v.as_vector3(), Some([1.0, 2.0, 3.0]));
        assert_eq!(AttributeValue::from(vec![1.0, 2.0]).as_vector3(), None);
        assert_eq!(AttributeValue::from(0.25).as_time(), Some(0.25));
        assert_eq!(AttributeValue::timestamp(10.0).as_time(), Some(10.0));
        assert_eq!(AttributeValue::from("0.25").as_time(), None);
    }
}
