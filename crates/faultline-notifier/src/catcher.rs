//! Interceptor interface for host frameworks
//!
//! A host wires [`FaultInterceptor::on_unhandled`] into whatever hook its
//! framework offers for faults escaping request dispatch. [`Catcher`] is the
//! stock implementation: silent outside public environments, otherwise gated
//! by the ignore policy and reported through a [`Notifier`].

use async_trait::async_trait;
use faultline_core::{Fault, RequestContext};
use tracing::trace;

use crate::notifier::{Notifier, Outcome};

/// Reaction to a fault the host did not handle itself.
#[async_trait]
pub trait FaultInterceptor: Send + Sync {
    async fn on_unhandled(&self, fault: Fault, ctx: Option<&RequestContext>) -> Outcome;
}

/// Reports unhandled faults in public environments.
#[derive(Clone)]
pub struct Catcher {
    notifier: Notifier,
}

impl Catcher {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

#[async_trait]
impl FaultInterceptor for Catcher {
    async fn on_unhandled(&self, fault: Fault, ctx: Option<&RequestContext>) -> Outcome {
        let config = self.notifier.config();
        if !config.is_public_environment() {
            trace!(
                environment = config.environment_name(),
                "Not reporting outside a public environment"
            );
            return Outcome::Skipped;
        }

        self.notifier.notify_with_context(fault, ctx).await
    }
}
