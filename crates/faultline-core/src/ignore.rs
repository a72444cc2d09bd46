//! Ignore policy
//!
//! Decides, before any notice is built, whether a fault should be dropped.
//! Two independent gates: the fault's type, and the requesting user agent.
//! Either one suppresses the report entirely.

use tracing::trace;

use crate::builder::{Fault, RequestContext};
use crate::config::{Configuration, UserAgentPattern};

/// Snapshot of the ignore lists taken from a configuration.
pub struct IgnorePolicy<'a> {
    classes: &'a [String],
    user_agents: &'a [UserAgentPattern],
}

impl<'a> IgnorePolicy<'a> {
    pub fn from_config(config: &'a Configuration) -> Self {
        Self {
            classes: config.ignore(),
            user_agents: config.ignore_user_agent(),
        }
    }

    /// True when the fault's exact type identifier or its short name is on
    /// the ignore list.
    pub fn ignores_fault(&self, fault: &Fault) -> bool {
        fault
            .type_identifiers()
            .into_iter()
            .any(|id| self.classes.iter().any(|c| c == id))
    }

    /// True when `user_agent` equals or matches any ignored pattern.
    pub fn ignores_user_agent(&self, user_agent: Option<&str>) -> bool {
        match user_agent {
            Some(ua) => self.user_agents.iter().any(|p| p.matches(ua)),
            None => false,
        }
    }

    /// Combined gate evaluated before any notice is built.
    pub fn should_suppress(&self, fault: &Fault, ctx: Option<&RequestContext>) -> bool {
        if self.ignores_fault(fault) {
            trace!(types = ?fault.type_identifiers(), "Fault type is ignored");
            return true;
        }

        let user_agent = ctx.and_then(|c| c.user_agent.as_deref());
        if self.ignores_user_agent(user_agent) {
            trace!(user_agent = ?user_agent, "User agent is ignored");
            return true;
        }

        false
    }
}
