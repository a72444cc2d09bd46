//! Integration tests for posting notices to the collector

use std::time::Duration;

use faultline_core::{Exception, WireFormat};
use faultline_notifier::Outcome;
use wiremock::matchers::{header, headers, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_notice_is_posted_as_yaml() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notices/"))
        .and(header("content-type", "application/x-yaml"))
        .and(headers("accept", vec!["text/xml", "application/xml"]))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = common::notifier(common::collector_config(&server).build());
    let outcome = notifier
        .notify(Exception::new("RuntimeError", "This is an error message"))
        .await;

    assert_eq!(outcome, Outcome::Delivered { status: 200 });

    let body = common::received_yaml(&server).await;
    let notice = &body["notice"];
    assert_eq!(notice["api_key"].as_str(), Some(common::API_KEY));
    assert_eq!(notice["error_class"].as_str(), Some("RuntimeError"));
    assert_eq!(
        notice["error_message"].as_str(),
        Some("RuntimeError: This is an error message")
    );
    assert!(notice["backtrace"].as_sequence().is_some());
}

#[tokio::test]
async fn test_any_2xx_is_delivered() {
    let server = common::setup_collector(201).await;
    let notifier = common::notifier(common::collector_config(&server).build());

    let outcome = notifier.notify(Exception::new("RuntimeError", "x")).await;

    assert_eq!(outcome, Outcome::Delivered { status: 201 });
}

#[tokio::test]
async fn test_rejected_notice_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notices/"))
        .respond_with(ResponseTemplate::new(422).set_body_string("Invalid API key"))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = common::notifier(common::collector_config(&server).build());
    let outcome = notifier.notify(Exception::new("RuntimeError", "x")).await;

    assert_eq!(outcome, Outcome::Failed);
}

#[tokio::test]
async fn test_slow_collector_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notices/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(4)))
        .mount(&server)
        .await;

    let notifier = common::notifier(common::collector_config(&server).build());
    let outcome = notifier.notify(Exception::new("RuntimeError", "x")).await;

    assert_eq!(outcome, Outcome::Failed);
}

#[tokio::test]
async fn test_ignored_fault_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let notifier = common::notifier(common::collector_config(&server).build());
    let outcome = notifier
        .notify(Exception::new("RecordNotFound", "no such row"))
        .await;

    assert_eq!(outcome, Outcome::Suppressed);
}

#[tokio::test]
async fn test_json_wire_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notices/"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = common::collector_config(&server)
        .wire_format(WireFormat::Json)
        .build();
    let outcome = common::notifier(config)
        .notify(Exception::new("RuntimeError", "x"))
        .await;
    assert_eq!(outcome, Outcome::Delivered { status: 200 });

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["notice"]["error_class"], "RuntimeError");
}
