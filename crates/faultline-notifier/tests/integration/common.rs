//! Shared test helpers for collector integration tests
//!
//! Provides a wiremock collector and a notifier configured to post to it.

use faultline_core::{ConfigBuilder, Configuration};
use faultline_notifier::Notifier;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "1234567890abcdef";

/// Configuration pointing at `server` with one second timeouts.
pub fn collector_config(server: &MockServer) -> ConfigBuilder {
    ConfigBuilder::new()
        .host("127.0.0.1")
        .port(server.address().port())
        .api_key(API_KEY)
        .open_timeout(1)
        .read_timeout(1)
        .environment_name("production")
}

/// Starts a collector answering every notice with `status`.
pub async fn setup_collector(status: u16) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/notices/"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;

    server
}

pub fn notifier(config: Configuration) -> Notifier {
    Notifier::new(config)
}

/// The body of the single request `server` received, parsed as YAML.
pub async fn received_yaml(server: &MockServer) -> serde_yaml::Value {
    let requests = server
        .received_requests()
        .await
        .expect("request recording enabled");
    assert_eq!(requests.len(), 1, "expected exactly one notice");
    serde_yaml::from_slice(&requests[0].body).expect("body is valid YAML")
}
