//! Faultline Core - Notice model, configuration and filtering
//!
//! Provides:
//! - `Configuration` / `ConfigBuilder`: endpoint, credentials, filter and ignore lists
//! - `Notice`: the canonical fault report
//! - `NoticeBuilder`: turns an `Exception` or a loose `Map` into a `Notice`
//! - `FilterPipeline`: backtrace rewriting, redaction and serializability stripping
//! - `IgnorePolicy`: suppression by fault type or user agent
//!
//! Nothing in this crate performs I/O beyond reading the configuration file;
//! delivery lives in `faultline-notifier`.

pub mod backtrace;
pub mod builder;
pub mod config;
pub mod environment;
pub mod error;
pub mod filters;
pub mod ignore;
pub mod notice;
pub mod value;

pub use backtrace::{BacktraceFilter, BacktraceFilters};
pub use builder::{Exception, Fault, NoticeBuilder, RequestContext};
pub use config::{ConfigBuilder, Configuration, ProxyConfig, UserAgentPattern, WireFormat};
pub use error::NoticeError;
pub use filters::{FilterPipeline, FILTERED};
pub use ignore::IgnorePolicy;
pub use notice::{Notice, Request, Session};
pub use value::{Key, Map, Value};
