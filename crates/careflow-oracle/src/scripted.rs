use std::time::Duration;

use crate::{Oracle, OracleError, Result};

/// What a scripted route answers with.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    Text(String),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Route {
    needle: String,
    reply: ScriptedReply,
}

/// Deterministic oracle for offline runs and tests.
///
/// Routes are checked in insertion order; the first route whose needle occurs
/// in the prompt answers. With no match the default reply is used, and with no
/// default the call fails. Routing by prompt content (rather than by call
/// order) keeps replies stable when packages are dispatched concurrently.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    routes: Vec<Route>,
    default: Option<ScriptedReply>,
    delay: Option<Duration>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `reply` whenever the prompt contains `needle`.
    pub fn route(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.routes.push(Route {
            needle: needle.into(),
            reply: ScriptedReply::Text(reply.into()),
        });
        self
    }

    /// Fail with `reason` whenever the prompt contains `needle`.
    pub fn fail_on(mut self, needle: impl Into<String>, reason: impl Into<String>) -> Self {
        self.routes.push(Route {
            needle: needle.into(),
            reply: ScriptedReply::Fail(reason.into()),
        });
        self
    }

    pub fn with_default(mut self, reply: impl Into<String>) -> Self {
        self.default = Some(ScriptedReply::Text(reply.into()));
        self
    }

    /// Sleep before every reply. Used to exercise caller-side timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn pick(&self, prompt: &str) -> Option<&ScriptedReply> {
        self.routes
            .iter()
            .find(|r| prompt.contains(&r.needle))
            .map(|r| &r.reply)
            .or(self.default.as_ref())
    }
}

#[async_trait::async_trait]
impl Oracle for ScriptedOracle {
    fn label(&self) -> String {
        "scripted".into()
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.pick(prompt) {
            Some(ScriptedReply::Text(text)) => Ok(text.clone()),
            Some(ScriptedReply::Fail(reason)) => Err(OracleError::Scripted(reason.clone())),
            None => Err(OracleError::Scripted("no scripted reply matches prompt".into())),
        }
    }
}
