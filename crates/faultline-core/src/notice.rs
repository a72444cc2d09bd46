//! The canonical fault report
//!
//! A `Notice` is built fresh for every reported fault, flows through the
//! filter pipeline, is encoded once and then dropped.

use crate::value::{Key, Map, Value};

/// Request details attached to a notice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub params: Map,
    pub url: Option<String>,
    /// Host project root at the time of the request.
    pub root_path: Option<String>,
    /// Params supplied as something other than a mapping. Sent as given,
    /// without key redaction; only unsendable values are stripped.
    pub unmapped_params: Option<Value>,
}

impl Request {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
            && self.unmapped_params.is_none()
            && self.url.is_none()
            && self.root_path.is_none()
    }

    fn to_map(&self) -> Map {
        let mut map = Map::new();
        if !self.params.is_empty() {
            map.insert(Key::sym("params"), Value::Map(self.params.clone()));
        } else if let Some(raw) = &self.unmapped_params {
            map.insert(Key::sym("params"), raw.clone());
        }
        if let Some(url) = &self.url {
            map.insert(Key::sym("url"), Value::from(url.as_str()));
        }
        if let Some(root) = &self.root_path {
            map.insert(Key::sym("root_path"), Value::from(root.as_str()));
        }
        map
    }
}

/// Session details attached to a notice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub key: Option<String>,
    pub data: Map,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.data.is_empty()
    }

    fn to_map(&self) -> Map {
        let mut map = Map::new();
        if let Some(key) = &self.key {
            map.insert(Key::sym("key"), Value::from(key.as_str()));
        }
        if !self.data.is_empty() {
            map.insert(Key::sym("data"), Value::Map(self.data.clone()));
        }
        map
    }
}

/// A single fault report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notice {
    pub api_key: Option<String>,
    pub error_class: Option<String>,
    pub error_message: String,
    pub backtrace: Vec<String>,
    pub request: Request,
    pub session: Session,
    pub environment: Map,
}

impl Notice {
    /// Renders the notice as a mapping with symbol keys.
    ///
    /// `request`, `session` and `environment` are always present as
    /// mappings, empty when there is nothing to report.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(Key::sym("api_key"), Value::from(self.api_key.clone()));
        map.insert(Key::sym("error_class"), Value::from(self.error_class.clone()));
        map.insert(
            Key::sym("error_message"),
            Value::from(self.error_message.as_str()),
        );
        map.insert(
            Key::sym("backtrace"),
            Value::from(self.backtrace.clone()),
        );
        map.insert(Key::sym("request"), Value::Map(self.request.to_map()));
        map.insert(Key::sym("session"), Value::Map(self.session.to_map()));
        map.insert(
            Key::sym("environment"),
            Value::Map(self.environment.clone()),
        );
        Value::Map(map)
    }
}
