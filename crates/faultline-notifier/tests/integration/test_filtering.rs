//! Integration tests for what filtering leaves in the posted body

use faultline_core::value::map_of;
use faultline_core::{Exception, Fault, RequestContext, Value, FILTERED};
use faultline_notifier::Outcome;

use crate::common;

#[tokio::test]
async fn test_filtered_params_are_redacted_on_the_wire() {
    let server = common::setup_collector(200).await;
    let config = common::collector_config(&server)
        .params_filter("credit_card")
        .build();

    let ctx = RequestContext {
        params: map_of([
            ("password", "hunter2"),
            ("credit_card_number", "4111111111111111"),
            ("q", "shoes"),
        ]),
        url: Some("http://shop.example.com/search".into()),
        ..RequestContext::default()
    };

    let outcome = common::notifier(config)
        .notify_with_context(Fault::from(Exception::new("RuntimeError", "x")), Some(&ctx))
        .await;
    assert_eq!(outcome, Outcome::Delivered { status: 200 });

    let body = common::received_yaml(&server).await;
    let params = &body["notice"]["request"]["params"];
    assert_eq!(params["password"].as_str(), Some(FILTERED));
    assert_eq!(params["credit_card_number"].as_str(), Some(FILTERED));
    assert_eq!(params["q"].as_str(), Some("shoes"));
    assert_eq!(
        body["notice"]["request"]["url"].as_str(),
        Some("http://shop.example.com/search")
    );
}

#[tokio::test]
async fn test_unserializable_values_never_reach_the_wire() {
    let server = common::setup_collector(200).await;
    let config = common::collector_config(&server).build();

    let ctx = RequestContext {
        params: map_of([
            ("upload", Value::Handle("File:/tmp/upload.bin".into())),
            ("name", Value::from("report")),
        ]),
        ..RequestContext::default()
    };

    let outcome = common::notifier(config)
        .notify_with_context(Fault::from(Exception::new("RuntimeError", "x")), Some(&ctx))
        .await;
    assert_eq!(outcome, Outcome::Delivered { status: 200 });

    let body = common::received_yaml(&server).await;
    let params = &body["notice"]["request"]["params"];
    assert!(params.get("upload").is_none());
    assert_eq!(params["name"].as_str(), Some("report"));
}

#[tokio::test]
async fn test_backtrace_filters_apply_before_sending() {
    let server = common::setup_collector(200).await;
    let config = common::collector_config(&server)
        .project_root("/srv/app")
        .build();

    let fault = Fault::Map(map_of([
        ("error_class", Value::from("Timeout")),
        (
            "backtrace",
            Value::from(vec![
                "/srv/app/src/handlers.rs:10".to_string(),
                "./src/main.rs:3".to_string(),
            ]),
        ),
    ]));

    common::notifier(config).notify(fault).await;

    let body = common::received_yaml(&server).await;
    let frames: Vec<&str> = body["notice"]["backtrace"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|f| f.as_str())
        .collect();
    assert_eq!(frames, vec!["[PROJECT_ROOT]/src/handlers.rs:10", "src/main.rs:3"]);
}
