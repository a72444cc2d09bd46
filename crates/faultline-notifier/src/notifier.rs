//! Report entry point
//!
//! [`Notifier`] runs a fault through the whole pipeline: ignore policy,
//! notice builder, filter pipeline, transport. Every failure along the way
//! is logged and folded into an [`Outcome`]; nothing is returned as an error
//! and nothing panics into the host.

use std::sync::{Arc, RwLock};

use faultline_core::environment::{environment_info, VERSION};
use faultline_core::{
    Configuration, Fault, FilterPipeline, IgnorePolicy, Notice, NoticeBuilder, RequestContext,
    Value,
};
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

use crate::error::NotifierError;
use crate::transport::{HttpTransport, Transport};

/// What happened to a reported fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The ignore policy matched; nothing was built or sent
    Suppressed,
    /// The input was unusable, or reporting is disabled here
    Skipped,
    /// The collector accepted the notice
    Delivered { status: u16 },
    /// Delivery failed; the notice was dropped
    Failed,
}

/// Shared handle to the reporter.
///
/// Cheap to clone. The configuration sits behind a single lock which is
/// only held while reading a snapshot or applying [`configure`](Self::configure);
/// network I/O always runs without it.
#[derive(Clone)]
pub struct Notifier {
    config: Arc<RwLock<Configuration>>,
    transport: Arc<dyn Transport>,
}

impl Notifier {
    /// Creates a notifier delivering over HTTP.
    pub fn new(config: Configuration) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    /// Creates a notifier with a custom transport.
    pub fn with_transport(config: Configuration, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            transport,
        }
    }

    /// Reinstalls the default backtrace filters, then lets `f` adjust the
    /// configuration.
    ///
    /// ```rust,no_run
    /// use faultline_core::Configuration;
    /// use faultline_notifier::Notifier;
    ///
    /// let notifier = Notifier::new(Configuration::default());
    /// notifier.configure(|config| {
    ///     config.set_api_key("1234567890abcdef");
    ///     config.set_secure(true);
    ///     config.params_filters_mut().push("credit_card".into());
    /// });
    /// ```
    pub fn configure<F>(&self, f: F)
    where
        F: FnOnce(&mut Configuration),
    {
        let mut guard = match self.config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.add_default_filters();
        f(&mut guard);

        if guard.verbose() {
            info!(version = VERSION, "Notifier ready to catch errors");
        }
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> Configuration {
        match self.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether `fault` would be dropped by the ignore policy.
    pub fn should_suppress(&self, fault: &Fault, ctx: Option<&RequestContext>) -> bool {
        let config = self.config();
        IgnorePolicy::from_config(&config).should_suppress(fault, ctx)
    }

    /// Builds and filters the notice for `fault` without sending it.
    pub fn build_notice(&self, fault: &Fault, ctx: Option<&RequestContext>) -> Notice {
        prepare(&self.config(), fault, ctx)
    }

    /// Reports a fault outside any request.
    pub async fn notify(&self, fault: impl Into<Fault>) -> Outcome {
        self.notify_with_context(fault.into(), None).await
    }

    /// Reports a fault raised while handling a request.
    pub async fn notify_with_context(
        &self,
        fault: Fault,
        ctx: Option<&RequestContext>,
    ) -> Outcome {
        let config = self.config();

        if IgnorePolicy::from_config(&config).should_suppress(&fault, ctx) {
            trace!("Fault suppressed by ignore policy");
            return Outcome::Suppressed;
        }

        let notice = prepare(&config, &fault, ctx);
        self.deliver(&config, &notice).await
    }

    /// Reports a loosely typed value; anything but a mapping is skipped.
    pub async fn notify_value(&self, value: Value) -> Outcome {
        match Fault::try_from(value) {
            Ok(fault) => self.notify_with_context(fault, None).await,
            Err(e) => {
                warn!(error = %e, "Skipping notice");
                Outcome::Skipped
            }
        }
    }

    /// Reports on a background task so the caller never waits on the network.
    pub fn spawn_notify(&self, fault: Fault, ctx: Option<RequestContext>) -> JoinHandle<Outcome> {
        let notifier = self.clone();
        tokio::spawn(async move { notifier.notify_with_context(fault, ctx.as_ref()).await })
    }

    async fn deliver(&self, config: &Configuration, notice: &Notice) -> Outcome {
        let outcome = match self.transport.send(config, notice).await {
            Ok(delivery) => {
                info!(status = delivery.status, "Success: notice delivered");
                Outcome::Delivered {
                    status: delivery.status,
                }
            }
            Err(NotifierError::Timeout { url }) => {
                error!(url = %url, "Timeout while contacting the collector");
                Outcome::Failed
            }
            Err(NotifierError::Rejected { status, body }) => {
                error!(
                    status,
                    body = body.as_deref().unwrap_or(""),
                    "Failure: collector rejected notice"
                );
                Outcome::Failed
            }
            Err(e) => {
                error!(error = %e, "Failure: notice not delivered");
                Outcome::Failed
            }
        };

        if config.verbose() {
            info!("Environment Info: {}", environment_info(config.environment_name()));
        }
        outcome
    }
}

/// Builder and filter pipeline, in that order.
fn prepare(config: &Configuration, fault: &Fault, ctx: Option<&RequestContext>) -> Notice {
    let mut notice = NoticeBuilder::new(config).build(fault, ctx);
    FilterPipeline::new(config).apply(&mut notice);
    notice
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use faultline_core::value::map_of;
    use faultline_core::{ConfigBuilder, Exception, Map, FILTERED};

    use super::*;
    use crate::transport::Delivery;

    /// Records every notice instead of sending it.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<Notice>>,
        reply: Option<u16>,
    }

    impl RecordingTransport {
        fn replying(status: u16) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                reply: Some(status),
            }
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(
            &self,
            _config: &Configuration,
            notice: &Notice,
        ) -> Result<Delivery, NotifierError> {
            self.sent.lock().unwrap().push(notice.clone());
            match self.reply {
                Some(status) if (200..300).contains(&status) => Ok(Delivery { status }),
                Some(status) => Err(NotifierError::Rejected {
                    status,
                    body: Some("bad api key".into()),
                }),
                None => Err(NotifierError::Timeout {
                    url: "http://localhost/notices/".into(),
                }),
            }
        }
    }

    fn notifier_with(transport: Arc<RecordingTransport>) -> Notifier {
        let config = ConfigBuilder::new().api_key("test-key").build();
        Notifier::with_transport(config, transport)
    }

    #[tokio::test]
    async fn test_ignored_fault_never_reaches_transport() {
        let transport = Arc::new(RecordingTransport::replying(200));
        let notifier = notifier_with(Arc::clone(&transport));

        let outcome = notifier
            .notify(Exception::new("RecordNotFound", "no such row"))
            .await;

        assert_eq!(outcome, Outcome::Suppressed);
        assert_eq!(transport.count(), 0);
    }

    #[tokio::test]
    async fn test_delivered_notice_is_filtered() {
        let transport = Arc::new(RecordingTransport::replying(201));
        let notifier = notifier_with(Arc::clone(&transport));

        let ctx = RequestContext {
            params: map_of([("password", "hunter2"), ("q", "shoes")]),
            ..RequestContext::default()
        };
        let outcome = notifier
            .notify_with_context(
                Fault::from(Exception::new("RuntimeError", "boom")),
                Some(&ctx),
            )
            .await;

        assert_eq!(outcome, Outcome::Delivered { status: 201 });
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let params = &sent[0].request.params;
        assert_eq!(
            faultline_core::value::lookup(params, "password"),
            Some(&Value::from(FILTERED))
        );
        assert_eq!(sent[0].api_key.as_deref(), Some("test-key"));
        assert_eq!(sent[0].error_message, "RuntimeError: boom");
    }

    #[tokio::test]
    async fn test_rejection_and_timeout_are_failures() {
        let rejected = Arc::new(RecordingTransport::replying(403));
        let outcome = notifier_with(Arc::clone(&rejected))
            .notify(Exception::new("RuntimeError", "x"))
            .await;
        assert_eq!(outcome, Outcome::Failed);

        let timed_out = Arc::new(RecordingTransport::default());
        let outcome = notifier_with(Arc::clone(&timed_out))
            .notify(Exception::new("RuntimeError", "x"))
            .await;
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(timed_out.count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_value_is_skipped() {
        let transport = Arc::new(RecordingTransport::replying(200));
        let notifier = notifier_with(Arc::clone(&transport));

        assert_eq!(notifier.notify_value(Value::from("oops")).await, Outcome::Skipped);
        assert_eq!(transport.count(), 0);

        let outcome = notifier
            .notify_value(Value::Map(map_of([("error_message", "manual")])))
            .await;
        assert_eq!(outcome, Outcome::Delivered { status: 200 });
    }

    #[tokio::test]
    async fn test_configure_mutations_are_observed() {
        let transport = Arc::new(RecordingTransport::replying(200));
        let notifier = notifier_with(Arc::clone(&transport));

        notifier.configure(|c| c.ignore_only(["RuntimeError"]));
        let outcome = notifier.notify(Exception::new("RuntimeError", "x")).await;
        assert_eq!(outcome, Outcome::Suppressed);

        notifier.configure(|c| {
            c.ignore_mut().clear();
            c.filter_backtrace(|l| Some(l.to_uppercase()));
        });
        let notice = notifier.build_notice(
            &Fault::Map(map_of([("backtrace", "a\nb\n")])),
            None,
        );
        assert_eq!(notice.backtrace, vec!["A", "B"]);
        assert_eq!(notifier.config().backtrace_filters().len(), 5);
    }

    #[tokio::test]
    async fn test_spawn_notify_runs_in_background() {
        let transport = Arc::new(RecordingTransport::replying(200));
        let notifier = notifier_with(Arc::clone(&transport));

        let handle = notifier.spawn_notify(
            Fault::Map(Map::new()),
            Some(RequestContext::default()),
        );
        assert_eq!(handle.await.unwrap(), Outcome::Delivered { status: 200 });
        assert_eq!(transport.count(), 1);
    }
}
