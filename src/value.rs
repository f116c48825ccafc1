//! Native structured values and their JSON wire encoding.
//!
//! Every payload the client sends or receives crosses this boundary. The
//! value set is closed: null, booleans, numbers, strings, sequences and
//! string-keyed mappings. Mappings keep insertion order so that bodies are
//! emitted in the order the caller built them, while equality ignores order.

use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::{CimiError, Result};

/// Maximum number of characters kept on each side of a decode error.
const FRAGMENT_RADIUS: usize = 24;

/// Ordered mapping of string keys to values.
pub type Mapping = IndexMap<String, Value>;

/// A caller-facing structured value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Mapping),
}

/// A JSON number that remembers whether it was integral.
///
/// `Unsigned` only holds values above `i64::MAX`; the `From` conversions
/// normalize everything else to `Integer`.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Integer(i64),
    Unsigned(u64),
    Float(f64),
}

impl Number {
    /// Returns the value as `i64` if it is an integer that fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Integer(i) => Some(i),
            Self::Unsigned(u) => i64::try_from(u).ok(),
            Self::Float(_) => None,
        }
    }

    /// Returns the value as `u64` if it is a non-negative integer.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Integer(i) => u64::try_from(i).ok(),
            Self::Unsigned(u) => Some(u),
            Self::Float(_) => None,
        }
    }

    /// Returns the value as `f64`, possibly losing precision for large integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Integer(i) => i as f64,
            Self::Unsigned(u) => u as f64,
            Self::Float(f) => f,
        }
    }

    /// Returns true for floating-point numbers.
    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Float(_), _) | (_, Self::Float(_)) => false,
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => x == y,
                (None, None) => a.as_u64() == b.as_u64(),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Unsigned(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl Value {
    /// Build a mapping from key/value pairs, keeping their order.
    pub fn mapping<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Convert any serializable type into a value.
    pub fn from_serializable<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        serde_json::to_value(data)
            .map(Self::from)
            .map_err(|e| CimiError::UnsupportedValue(e.to_string()))
    }

    /// Deserialize this value into a typed structure.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        let json = self.to_json()?;
        serde_json::from_value(json).map_err(|e| CimiError::MalformedDocument {
            message: e.to_string(),
            fragment: excerpt(&self.to_string(), 0),
        })
    }

    /// Look up a key in a mapping. Returns `None` for non-mappings.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Look up a string member of a mapping.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_sequence(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert to a `serde_json` value, rejecting non-finite floats.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| CimiError::UnsupportedValue(e.to_string()))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        match *self {
            Self::Integer(i) => serializer.serialize_i64(i),
            Self::Unsigned(u) => serializer.serialize_u64(u),
            Self::Float(f) if f.is_finite() => serializer.serialize_f64(f),
            Self::Float(f) => Err(S::Error::custom(format!(
                "non-finite number {f} has no JSON representation"
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(if let Some(i) = n.as_i64() {
                Number::Integer(i)
            } else if let Some(u) = n.as_u64() {
                Number::Unsigned(u)
            } else {
                Number::Float(n.as_f64().unwrap_or(f64::NAN))
            }),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Sequence(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(entries) => {
                Self::Mapping(entries.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Number(Number::Integer(i64::from(i)))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Number(Number::Integer(i))
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Self::Number(Number::Integer(i64::from(u)))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Self::Number(match i64::try_from(u) {
            Ok(i) => Number::Integer(i),
            Err(_) => Number::Unsigned(u),
        })
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Number(Number::Float(f))
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Self::Mapping(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::mapping(iter)
    }
}

/// Encode a value as compact JSON text.
///
/// # Errors
///
/// Returns [`CimiError::UnsupportedValue`] for non-finite floats.
pub fn encode(value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| CimiError::UnsupportedValue(e.to_string()))
}

/// Decode JSON text into a value.
///
/// # Errors
///
/// Returns [`CimiError::MalformedDocument`] carrying an excerpt of the input
/// around the point where parsing failed.
pub fn decode(text: &str) -> Result<Value> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(Value::from)
        .map_err(|e| CimiError::MalformedDocument {
            message: e.to_string(),
            fragment: fragment_at(text, e.line(), e.column()),
        })
}

/// Extract the text around a 1-based line/column position.
fn fragment_at(text: &str, line: usize, column: usize) -> String {
    let line_text = text
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or(text);
    excerpt(line_text, column.saturating_sub(1))
}

fn excerpt(text: &str, position: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let center = position.min(chars.len());
    let start = center.saturating_sub(FRAGMENT_RADIUS);
    let end = center.saturating_add(FRAGMENT_RADIUS).min(chars.len());
    chars[start..end].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        Value::mapping([
            ("name", Value::from("ssh key")),
            ("count", Value::from(3)),
            ("ratio", Value::from(0.5)),
            ("whole", Value::from(2.0)),
            ("enabled", Value::from(true)),
            ("missing", Value::Null),
            (
                "tags",
                Value::from(vec![Value::from("a"), Value::from(1), Value::Null]),
            ),
            (
                "nested",
                Value::mapping([("href", "credential-template/generate-ssh-key-pair")]),
            ),
        ])
    }

    #[test]
    fn test_round_trip_preserves_value() {
        let value = sample();
        let decoded = decode(&encode(&value).unwrap()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_integer_and_float_stay_distinct() {
        let decoded = decode(r#"{"i": 2, "f": 2.0, "big": 18446744073709551615}"#).unwrap();
        assert_eq!(decoded.get("i"), Some(&Value::Number(Number::Integer(2))));
        assert_eq!(decoded.get("f"), Some(&Value::Number(Number::Float(2.0))));
        assert_eq!(decoded.get("big").and_then(Value::as_u64), Some(u64::MAX));
        assert_ne!(Value::from(2), Value::from(2.0));

        let encoded = encode(&decoded).unwrap();
        assert!(encoded.contains(r#""f":2.0"#));
    }

    #[test]
    fn test_unsigned_and_integer_compare_numerically() {
        assert_eq!(Number::Unsigned(5), Number::Integer(5));
        assert_ne!(Number::Integer(-1), Number::Unsigned(u64::MAX));
    }

    #[test]
    fn test_encode_keeps_insertion_order() {
        let value = Value::mapping([("z", 1), ("a", 2), ("m", 3)]);
        assert_eq!(encode(&value).unwrap(), r#"{"z":1,"a":2,"m":3}"#);

        let decoded = decode(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        let keys: Vec<&str> = decoded.as_mapping().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_mapping_equality_ignores_order() {
        let a = Value::mapping([("x", 1), ("y", 2)]);
        let b = Value::mapping([("y", 2), ("x", 1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        let value = Value::mapping([("bad", f64::NAN)]);
        let err = encode(&value).unwrap_err();
        assert!(matches!(err, CimiError::UnsupportedValue(_)));

        let err = encode(&Value::from(f64::INFINITY)).unwrap_err();
        assert!(matches!(err, CimiError::UnsupportedValue(_)));
    }

    #[test]
    fn test_malformed_document_carries_fragment() {
        let err = decode(r#"{"baseURI": "https://example.com/api/", oops}"#).unwrap_err();
        match err {
            CimiError::MalformedDocument { fragment, .. } => {
                assert!(fragment.contains("oops"), "fragment was {fragment:?}");
            }
            other => panic!("expected MalformedDocument, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_multiline_document_points_at_line() {
        let text = "{\n  \"a\": 1,\n  \"b\": tru\n}";
        match decode(text).unwrap_err() {
            CimiError::MalformedDocument { fragment, .. } => assert!(fragment.contains("tru")),
            other => panic!("expected MalformedDocument, got {other:?}"),
        }
    }

    #[test]
    fn test_serde_bridge() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Template {
            href: String,
            username: String,
        }

        let template = Template {
            href: "session-template/internal".to_string(),
            username: "u".to_string(),
        };
        let value = Value::from_serializable(&template).unwrap();
        assert_eq!(value.get_str("href"), Some("session-template/internal"));

        let back: Template = value.deserialize_into().unwrap();
        assert_eq!(back, template);

        let err = Value::from(5).deserialize_into::<Template>().unwrap_err();
        assert!(matches!(err, CimiError::MalformedDocument { .. }));
    }

    #[test]
    fn test_display_is_compact_json() {
        let value = Value::mapping([("a", Value::from(vec![1, 2]))]);
        assert_eq!(value.to_string(), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
