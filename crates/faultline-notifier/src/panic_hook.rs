//! Panic reporting
//!
//! Turns panics into notices. The hook never blocks the panicking thread:
//! delivery is spawned on the current tokio runtime, and panics raised
//! outside a runtime are left to the previous hook alone.

use faultline_core::backtrace::split_frames;
use faultline_core::{Exception, Fault};
use tracing::debug;

use crate::notifier::Notifier;

/// Fault type reported for panics.
pub const PANIC_TYPE: &str = "Panic";

/// Builds the fault reported for a panic.
pub fn panic_fault(message: &str, location: &str, backtrace: &str) -> Fault {
    let message = if location.is_empty() {
        message.to_string()
    } else {
        format!("{message} at {location}")
    };

    Fault::from(
        Exception::new(PANIC_TYPE, message)
            .with_type_id("core::panic")
            .with_backtrace(split_frames(backtrace)),
    )
}

/// Installs a panic hook that reports panics through `notifier`.
///
/// Chains with the existing panic hook so default behavior (stderr output)
/// is preserved.
pub fn install_panic_hook(notifier: Notifier) {
    let previous_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_default();

        let backtrace = std::backtrace::Backtrace::force_capture().to_string();
        let fault = panic_fault(&message, &location, &backtrace);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let notifier = notifier.clone();
                handle.spawn(async move {
                    notifier.notify(fault).await;
                });
            }
            Err(_) => debug!("Panic outside a tokio runtime, not reported"),
        }

        previous_hook(panic_info);
    }));
}
