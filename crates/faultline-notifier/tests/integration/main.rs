//! Integration tests for faultline-notifier
//!
//! Uses wiremock to stand in for the collector and verifies what the
//! notifier actually puts on the wire.

mod common;

mod test_delivery;
mod test_filtering;
