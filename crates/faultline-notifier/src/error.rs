//! Error types for notice delivery

use faultline_core::NoticeError;
use thiserror::Error;

/// Errors that can occur while preparing or delivering a notice.
///
/// None of these ever reach the host: the notifier logs them and reports an
/// [`Outcome`](crate::notifier::Outcome) instead.
#[derive(Debug, Error)]
pub enum NotifierError {
    /// The input could not be turned into a notice
    #[error(transparent)]
    Notice(#[from] NoticeError),

    /// The notice could not be encoded in the configured wire format
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// The open or read timeout elapsed
    #[error("Timeout while contacting {url}")]
    Timeout { url: String },

    /// The collector answered with a non-success status
    #[error("Collector rejected notice with status {status}")]
    Rejected {
        status: u16,
        /// Response body, when one could be read
        body: Option<String>,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl From<serde_yaml::Error> for NotifierError {
    fn from(e: serde_yaml::Error) -> Self {
        NotifierError::Encoding(e.to_string())
    }
}

impl From<serde_json::Error> for NotifierError {
    fn from(e: serde_json::Error) -> Self {
        NotifierError::Encoding(e.to_string())
    }
}
