//! Notice filter pipeline
//!
//! Four stages, always run in this order:
//! 1. backtrace rewriting through the configured line filters
//! 2. request parameter redaction
//! 3. environment variable redaction
//! 4. removal of values that cannot be serialized
//!
//! Redaction runs before stripping so that it sees every entry the host
//! supplied. Each stage is a no-op on empty input, and the whole pipeline is
//! idempotent.

use tracing::trace;

use crate::backtrace::BacktraceFilters;
use crate::config::Configuration;
use crate::notice::Notice;
use crate::value::{Map, Value};

/// Placeholder written over redacted values.
pub const FILTERED: &str = "[FILTERED]";

/// Applies the configured filters to notices.
pub struct FilterPipeline<'a> {
    config: &'a Configuration,
}

impl<'a> FilterPipeline<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// Runs all four stages on `notice` in place.
    pub fn apply(&self, notice: &mut Notice) {
        notice.backtrace = clean_backtrace(
            std::mem::take(&mut notice.backtrace),
            self.config.backtrace_filters(),
        );

        let params = redact_keys(&mut notice.request.params, self.config.params_filters());
        let env = redact_keys(&mut notice.environment, self.config.environment_filters());

        let stripped = strip_non_serializable(&mut notice.request.params)
            + strip_unmapped(&mut notice.request.unmapped_params)
            + strip_non_serializable(&mut notice.session.data)
            + strip_non_serializable(&mut notice.environment);

        trace!(
            frames = notice.backtrace.len(),
            redacted_params = params,
            redacted_env = env,
            stripped,
            "Notice filtered"
        );
    }
}

/// Stage 1: run every frame through the chain, dropping rejected frames.
pub fn clean_backtrace(frames: Vec<String>, filters: &BacktraceFilters) -> Vec<String> {
    frames
        .iter()
        .filter_map(|frame| filters.apply(frame))
        .collect()
}

/// Stages 2 and 3: replace the value of every key whose string form
/// contains one of `patterns` with [`FILTERED`]. Keys keep their form.
///
/// Returns the number of entries redacted.
pub fn redact_keys(map: &mut Map, patterns: &[String]) -> usize {
    if map.is_empty() || patterns.is_empty() {
        return 0;
    }

    let mut redacted = 0;
    for (key, value) in map.iter_mut() {
        if patterns.iter().any(|p| key.as_str().contains(p.as_str())) {
            *value = Value::from(FILTERED);
            redacted += 1;
        }
    }
    redacted
}

/// Stage 4: remove type references and open handles, recursing into nested
/// mappings and lists. Other values are left untouched.
///
/// Returns the number of entries removed.
pub fn strip_non_serializable(map: &mut Map) -> usize {
    let before = map.len();
    map.retain(|_, value| value.is_serializable());
    let mut removed = before - map.len();

    for value in map.values_mut() {
        removed += strip_value(value);
    }
    removed
}

/// Non-mapping params skip redaction but are still made sendable.
fn strip_unmapped(raw: &mut Option<Value>) -> usize {
    match raw {
        Some(value) if !value.is_serializable() => {
            *raw = None;
            1
        }
        Some(value) => strip_value(value),
        None => 0,
    }
}

fn strip_value(value: &mut Value) -> usize {
    match value {
        Value::Map(inner) => strip_non_serializable(inner),
        Value::List(items) => {
            let before = items.len();
            items.retain(Value::is_serializable);
            let mut removed = before - items.len();
            for item in items.iter_mut() {
                removed += strip_value(item);
            }
            removed
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Fault, NoticeBuilder};
    use crate::value::{lookup, map_of, Key};

    fn bare_config() -> Configuration {
        let mut cfg = Configuration::default();
        cfg.backtrace_filters_mut().clear();
        cfg
    }

    #[test]
    fn test_backtrace_filters_modify_matching_lines() {
        let mut cfg = bare_config();
        cfg.filter_backtrace(|line| Some(line.replace("FOO", "BAR")));

        let fault = Fault::Map(map_of([("backtrace", "FOO\nBAZ\nwhatFOO\nawesome\n")]));
        let mut notice = NoticeBuilder::new(&cfg)
            .with_environment(Map::new())
            .build(&fault, None);
        FilterPipeline::new(&cfg).apply(&mut notice);

        assert_eq!(notice.backtrace, vec!["BAR", "BAZ", "whatBAR", "awesome"]);
    }

    #[test]
    fn test_backtrace_filter_can_drop_frames() {
        let mut filters = BacktraceFilters::new();
        filters.push(|l| (!l.contains("skip")).then(|| l.to_string()));
        let frames = vec!["keep".to_string(), "skip me".to_string(), "also keep".to_string()];
        assert_eq!(clean_backtrace(frames, &filters), vec!["keep", "also keep"]);
    }

    #[test]
    fn test_param_filters_preserve_key_forms() {
        let mut cfg = bare_config();
        cfg.params_filters_mut().push("credit_card".into());

        let mut params = Map::new();
        params.insert(Key::str("password"), Value::from("12345"));
        params.insert(Key::sym("credit_card"), Value::from("12345"));
        params.insert(Key::str("non_sensitive"), Value::from("Whee!"));

        let mut notice = Notice::default();
        notice.request.params = params;
        FilterPipeline::new(&cfg).apply(&mut notice);

        let params = &notice.request.params;
        assert_eq!(params.get(&Key::str("password")), Some(&Value::from(FILTERED)));
        assert_eq!(params.get(&Key::sym("credit_card")), Some(&Value::from(FILTERED)));
        assert_eq!(params.get(&Key::str("non_sensitive")), Some(&Value::from("Whee!")));
        assert!(params.get(&Key::str("credit_card")).is_none());
    }

    #[test]
    fn test_environment_filters_are_independent() {
        let mut cfg = bare_config();
        cfg.environment_filters_mut().push("credit_card".into());

        let mut env = Map::new();
        env.insert(Key::str("password"), Value::from("12345"));
        env.insert(Key::sym("credit_card"), Value::from("12345"));
        env.insert(Key::str("non_sensitive"), Value::from("Whee!"));

        let mut notice = Notice::default();
        notice.environment = env;
        notice.request.params = map_of([("credit_card", "4111")]);
        FilterPipeline::new(&cfg).apply(&mut notice);

        assert_eq!(
            notice.environment.get(&Key::str("password")),
            Some(&Value::from("12345"))
        );
        assert_eq!(
            notice.environment.get(&Key::sym("credit_card")),
            Some(&Value::from(FILTERED))
        );
        assert_eq!(
            notice.environment.get(&Key::str("non_sensitive")),
            Some(&Value::from("Whee!"))
        );
        assert_eq!(
            lookup(&notice.request.params, "credit_card"),
            Some(&Value::from("4111"))
        );
    }

    #[test]
    fn test_redaction_matches_substrings() {
        let mut map = map_of([("user_password_confirmation", "x"), ("name", "y")]);
        assert_eq!(redact_keys(&mut map, &["password".to_string()]), 1);
        assert_eq!(
            lookup(&map, "user_password_confirmation"),
            Some(&Value::from(FILTERED))
        );
    }

    #[test]
    fn test_strip_non_serializable_recurses() {
        let nested = map_of([
            ("log", Value::Handle("log.txt".into())),
            ("kept", Value::from("yes")),
        ]);
        let mut map = map_of([
            ("klass", Value::TypeRef("String".into())),
            ("stdin", Value::Handle("stdin".into())),
            ("nested", Value::Map(nested)),
            ("list", Value::List(vec![Value::from(1_i64), Value::TypeRef("X".into())])),
            ("name", Value::from("ok")),
        ]);

        assert_eq!(strip_non_serializable(&mut map), 4);
        assert!(lookup(&map, "klass").is_none());
        assert!(lookup(&map, "stdin").is_none());
        assert_eq!(lookup(&map, "name"), Some(&Value::from("ok")));

        let nested = lookup(&map, "nested").and_then(Value::as_map).unwrap();
        assert!(lookup(nested, "log").is_none());
        assert_eq!(lookup(nested, "kept"), Some(&Value::from("yes")));
        assert_eq!(
            lookup(&map, "list"),
            Some(&Value::List(vec![Value::from(1_i64)]))
        );
    }

    #[test]
    fn test_stages_skip_empty_input() {
        let cfg = bare_config();
        let mut notice = Notice::default();
        FilterPipeline::new(&cfg).apply(&mut notice);
        assert_eq!(notice, Notice::default());
    }

    #[test]
    fn test_pipeline_is_idempotent() {
        let mut cfg = Configuration::default();
        cfg.params_filters_mut().push("token".into());
        cfg.environment_filters_mut().push("SECRET".into());
        cfg.filter_backtrace(|l| (!l.contains("internal")).then(|| l.replace("FOO", "BAR")));

        let mut notice = Notice {
            backtrace: vec!["FOO".into(), "internal".into(), "./src/a.rs".into()],
            environment: map_of([
                ("AWS_SECRET", Value::from("s")),
                ("TTY", Value::Handle("/dev/tty".into())),
            ]),
            ..Notice::default()
        };
        notice.request.params = map_of([
            ("api_token", Value::from("t")),
            ("klass", Value::TypeRef("Foo".into())),
            ("page", Value::from(2_i64)),
        ]);

        let pipeline = FilterPipeline::new(&cfg);
        pipeline.apply(&mut notice);
        let once = notice.clone();
        pipeline.apply(&mut notice);

        assert_eq!(notice, once);
        assert_eq!(once.backtrace, vec!["BAR", "src/a.rs"]);
        assert_eq!(lookup(&once.request.params, "api_token"), Some(&Value::from(FILTERED)));
        assert!(lookup(&once.request.params, "klass").is_none());
        assert_eq!(lookup(&once.environment, "AWS_SECRET"), Some(&Value::from(FILTERED)));
        assert!(lookup(&once.environment, "TTY").is_none());
    }

    #[test]
    fn test_unmapped_params_skip_redaction() {
        let cfg = bare_config();
        let mut notice = Notice::default();
        notice.request.unmapped_params = Some(Value::List(vec![
            Value::from("password=hunter2"),
            Value::Handle("File:/tmp/upload".into()),
        ]));

        FilterPipeline::new(&cfg).apply(&mut notice);

        assert_eq!(
            notice.request.unmapped_params,
            Some(Value::List(vec![Value::from("password=hunter2")]))
        );

        notice.request.unmapped_params = Some(Value::TypeRef("Params".into()));
        FilterPipeline::new(&cfg).apply(&mut notice);
        assert!(notice.request.unmapped_params.is_none());
    }
}
