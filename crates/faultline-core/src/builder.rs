//! Notice construction
//!
//! Turns either a fault object ([`Exception`]) or a loosely typed mapping
//! into a [`Notice`], layering caller-supplied fields over defaults taken
//! from the configuration and the process environment.

use crate::backtrace::{capture_frames, split_frames};
use crate::config::Configuration;
use crate::error::NoticeError;
use crate::notice::{Notice, Request, Session};
use crate::value::{lookup, process_environment, Map, Value};

/// Message used when the caller supplies none.
pub const DEFAULT_ERROR_MESSAGE: &str = "Notification";

// ============================================================================
// Inputs
// ============================================================================

/// A fault object: something with a type, a message and a backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    /// Fully qualified type identifier, e.g. `std::io::error::Error`.
    pub type_id: String,
    /// Short type name, e.g. `Error`.
    pub type_name: String,
    pub message: String,
    pub backtrace: Vec<String>,
}

impl Exception {
    /// Creates an exception whose identifier and name are both `type_name`.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            type_id: type_name.clone(),
            type_name,
            message: message.into(),
            backtrace: Vec::new(),
        }
    }

    pub fn with_type_id(mut self, type_id: impl Into<String>) -> Self {
        self.type_id = type_id.into();
        self
    }

    pub fn with_backtrace(mut self, frames: Vec<String>) -> Self {
        self.backtrace = frames;
        self
    }

    /// Describes any error value, using its Rust type as the fault type.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized + 'static,
    {
        let type_id = std::any::type_name::<E>().to_string();
        Self {
            type_name: short_type_name(&type_id).to_string(),
            type_id,
            message: err.to_string(),
            backtrace: Vec::new(),
        }
    }
}

/// `alloc::boxed::Box<dyn Error>` -> `Box`, `my_app::db::NotFound` -> `NotFound`.
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Anything the reporter accepts as input.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    Exception(Exception),
    Map(Map),
}

impl Fault {
    /// Type identifiers used by the ignore policy: the exact identifier and
    /// the short name. Mappings only offer their `error_class`.
    pub fn type_identifiers(&self) -> Vec<&str> {
        match self {
            Fault::Exception(e) => vec![e.type_id.as_str(), e.type_name.as_str()],
            Fault::Map(map) => lookup(map, "error_class")
                .and_then(Value::as_str)
                .into_iter()
                .collect(),
        }
    }
}

impl From<Exception> for Fault {
    fn from(e: Exception) -> Self {
        Fault::Exception(e)
    }
}

impl From<Map> for Fault {
    fn from(map: Map) -> Self {
        Fault::Map(map)
    }
}

impl TryFrom<Value> for Fault {
    type Error = NoticeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Map(map) => Ok(Fault::Map(map)),
            other => Err(NoticeError::MalformedInput(describe_kind(&other).to_string())),
        }
    }
}

fn describe_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Integer(_) | Value::Float(_) => "a number",
        Value::String(_) => "a string",
        Value::List(_) => "a list",
        Value::Map(_) => "a mapping",
        Value::TypeRef(_) => "a type reference",
        Value::Handle(_) => "an open handle",
    }
}

/// Request-scoped details supplied by the host at the call site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub params: Map,
    pub url: Option<String>,
    pub root_path: Option<String>,
    pub user_agent: Option<String>,
    /// Request environment, merged over the process environment.
    pub env: Map,
    pub session: Option<Session>,
}

// ============================================================================
// NoticeBuilder
// ============================================================================

/// Builds notices against a configuration.
pub struct NoticeBuilder<'a> {
    config: &'a Configuration,
    environment: Option<Map>,
}

impl<'a> NoticeBuilder<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            environment: None,
        }
    }

    /// Uses `env` instead of a snapshot of the process environment.
    pub fn with_environment(mut self, env: Map) -> Self {
        self.environment = Some(env);
        self
    }

    /// Builds a notice with every required field populated.
    pub fn build(&self, fault: &Fault, ctx: Option<&RequestContext>) -> Notice {
        let mut notice = self.defaults();

        if let Some(ctx) = ctx {
            apply_context(&mut notice, ctx);
        }

        match fault {
            Fault::Exception(e) => apply_exception(&mut notice, e),
            Fault::Map(map) => apply_map(&mut notice, map),
        }

        if notice.backtrace.is_empty() {
            notice.backtrace = capture_frames();
        }
        notice.backtrace = normalize_backtrace(std::mem::take(&mut notice.backtrace));
        notice
    }

    fn defaults(&self) -> Notice {
        Notice {
            api_key: self.config.api_key().map(String::from),
            error_class: None,
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            backtrace: Vec::new(),
            request: Request::default(),
            session: Session::default(),
            environment: self
                .environment
                .clone()
                .unwrap_or_else(process_environment),
        }
    }
}

fn apply_context(notice: &mut Notice, ctx: &RequestContext) {
    notice.request = Request {
        params: ctx.params.clone(),
        url: ctx.url.clone(),
        root_path: ctx.root_path.clone(),
        unmapped_params: None,
    };
    notice
        .environment
        .extend(ctx.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    if let Some(session) = &ctx.session {
        notice.session = session.clone();
    }
}

fn apply_exception(notice: &mut Notice, e: &Exception) {
    notice.error_class = Some(e.type_name.clone());
    notice.error_message = format!("{}: {}", e.type_name, e.message);
    notice.backtrace = e.backtrace.clone();
}

fn apply_map(notice: &mut Notice, map: &Map) {
    if let Some(api_key) = lookup(map, "api_key").and_then(Value::as_str) {
        notice.api_key = Some(api_key.to_string());
    }
    if let Some(class) = lookup(map, "error_class").and_then(Value::as_str) {
        notice.error_class = Some(class.to_string());
    }
    if let Some(message) = lookup(map, "error_message").and_then(Value::as_str) {
        notice.error_message = message.to_string();
    }
    match lookup(map, "backtrace") {
        Some(Value::String(text)) => notice.backtrace = vec![text.clone()],
        Some(Value::List(frames)) => {
            notice.backtrace = frames
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect();
        }
        _ => {}
    }
    if let Some(request) = lookup(map, "request").and_then(Value::as_map) {
        notice.request = request_from_map(request);
    }
    if let Some(session) = lookup(map, "session").and_then(Value::as_map) {
        notice.session = session_from_map(session);
    }
    if let Some(env) = lookup(map, "environment").and_then(Value::as_map) {
        notice.environment = env.clone();
    }
}

fn request_from_map(map: &Map) -> Request {
    let mut request = Request {
        url: lookup(map, "url").and_then(Value::as_str).map(String::from),
        root_path: lookup(map, "root_path")
            .and_then(Value::as_str)
            .map(String::from),
        ..Request::default()
    };
    match lookup(map, "params") {
        Some(Value::Map(params)) => request.params = params.clone(),
        Some(Value::Null) | None => {}
        Some(other) => request.unmapped_params = Some(other.clone()),
    }
    request
}

fn session_from_map(map: &Map) -> Session {
    Session {
        key: lookup(map, "key")
            .or_else(|| lookup(map, "id"))
            .and_then(Value::as_str)
            .map(String::from),
        data: lookup(map, "data")
            .and_then(Value::as_map)
            .cloned()
            .unwrap_or_default(),
    }
}

/// A single frame holding embedded line breaks is split into one trimmed
/// frame per line. Any other backtrace is returned unchanged.
pub fn normalize_backtrace(frames: Vec<String>) -> Vec<String> {
    match frames.as_slice() {
        [only] if only.contains('\n') => split_frames(only),
        _ => frames,
    }
}
