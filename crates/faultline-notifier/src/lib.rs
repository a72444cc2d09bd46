//! Faultline Notifier - Delivery of fault reports
//!
//! Provides:
//! - `Notifier`: the report entry point (ignore policy → builder → filters → transport)
//! - `HttpTransport`: bounded-timeout POST of an encoded notice
//! - `Catcher`: interceptor for hooking into a host framework
//! - `install_panic_hook`: reports panics on the current tokio runtime
//!
//! ## Usage
//!
//! ```rust,no_run
//! use faultline_core::{ConfigBuilder, Exception};
//! use faultline_notifier::Notifier;
//!
//! # async fn example() {
//! let notifier = Notifier::new(ConfigBuilder::new().api_key("1234567890abcdef").build());
//! let outcome = notifier.notify(Exception::new("RuntimeError", "something broke")).await;
//! println!("{outcome:?}");
//! # }
//! ```

pub mod catcher;
pub mod encoding;
pub mod error;
pub mod notifier;
pub mod panic_hook;
pub mod transport;

pub use catcher::{Catcher, FaultInterceptor};
pub use error::NotifierError;
pub use notifier::{Notifier, Outcome};
pub use panic_hook::install_panic_hook;
pub use transport::{Delivery, HttpTransport, Transport};
