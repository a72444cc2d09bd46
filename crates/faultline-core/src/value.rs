//! Loosely typed values carried inside a notice
//!
//! Request parameters, session data and environment snapshots come from the
//! host as untyped trees. `Value` models them, including the two kinds that
//! can never be encoded on the wire (type references and open handles).

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Error as SerError, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Ordered mapping used for every nested structure in a notice.
pub type Map = BTreeMap<Key, Value>;

/// A mapping key.
///
/// Hosts hand over maps whose keys are either plain strings or symbol-like
/// identifiers. Both render the same text, but they stay distinct inside a
/// map so that redaction never changes a key's form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Str(String),
    Sym(String),
}

impl Key {
    pub fn str(s: impl Into<String>) -> Self {
        Key::Str(s.into())
    }

    pub fn sym(s: impl Into<String>) -> Self {
        Key::Sym(s.into())
    }

    /// The key's string form, regardless of kind.
    pub fn as_str(&self) -> &str {
        match self {
            Key::Str(s) | Key::Sym(s) => s,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Key::Sym(_))
    }

    /// Returns the string-kind equivalent of this key.
    pub fn stringified(&self) -> Key {
        Key::Str(self.as_str().to_string())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => f.write_str(s),
            Key::Sym(s) => write!(f, ":{s}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A node in a notice's data tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
    /// A reference to a type rather than an instance of one.
    TypeRef(String),
    /// An open I/O resource (file, socket, pipe).
    Handle(String),
}

impl Value {
    /// Whether this value can be written to the wire at all.
    ///
    /// Only the top-level kind is inspected; containers are serializable
    /// even if some of their children are not.
    pub fn is_serializable(&self) -> bool {
        !matches!(self, Value::TypeRef(_) | Value::Handle(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::TypeRef(name) => Err(S::Error::custom(format!(
                "type reference `{name}` cannot be serialized"
            ))),
            Value::Handle(name) => Err(S::Error::custom(format!(
                "open handle `{name}` cannot be serialized"
            ))),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::String).collect())
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => Value::Map(
                obj.into_iter()
                    .map(|(k, v)| (Key::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Builds a [`Map`] with string keys from `(key, value)` pairs.
pub fn map_of<K, V, I>(pairs: I) -> Map
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (Key::Str(k.into()), v.into()))
        .collect()
}

/// Looks up `name` under either key form, string first.
pub fn lookup<'a>(map: &'a Map, name: &str) -> Option<&'a Value> {
    map.get(&Key::Str(name.to_string()))
        .or_else(|| map.get(&Key::Sym(name.to_string())))
}

/// Snapshot of the process environment as a string-keyed map.
pub fn process_environment() -> Map {
    std::env::vars()
        .map(|(k, v)| (Key::Str(k), Value::String(v)))
        .collect()
}
