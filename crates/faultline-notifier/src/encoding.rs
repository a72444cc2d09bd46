//! Wire encoding of notices
//!
//! The filtered notice is wrapped as `{"notice": {...}}`, every key is
//! converted to its string form, and the result is encoded in the
//! configured [`WireFormat`].

use faultline_core::{Key, Map, Notice, Value, WireFormat};

use crate::error::NotifierError;

/// Converts every key in the tree to a string key, including maps nested
/// inside lists. When a string and a symbol key share a name, the symbol's
/// value wins.
pub fn stringify_keys(value: Value) -> Value {
    match value {
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k.stringified(), stringify_keys(v)))
                .collect(),
        ),
        Value::List(items) => Value::List(items.into_iter().map(stringify_keys).collect()),
        other => other,
    }
}

/// The outbound payload: the stringified notice under a `notice` key.
pub fn payload(notice: &Notice) -> Value {
    let mut root = Map::new();
    root.insert(Key::str("notice"), stringify_keys(notice.to_value()));
    Value::Map(root)
}

/// Encodes `value` in `format`.
pub fn encode(value: &Value, format: WireFormat) -> Result<String, NotifierError> {
    Ok(match format {
        WireFormat::Yaml => serde_yaml::to_string(value)?,
        WireFormat::Json => serde_json::to_string(value)?,
    })
}

/// Builds and encodes the payload for `notice`.
pub fn encode_notice(notice: &Notice, format: WireFormat) -> Result<String, NotifierError> {
    encode(&payload(notice), format)
}
