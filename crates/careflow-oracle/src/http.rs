use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Oracle, OracleError, Result};

// ─── HttpOracleOptions ────────────────────────────────────────────────────

/// Connection settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct HttpOracleOptions {
    /// Full URL of the completions endpoint, e.g.
    /// `https://api.openai.com/v1/chat/completions`.
    pub endpoint: String,
    pub model: String,
    /// Bearer token; omitted from the request when `None`.
    pub api_key: Option<String>,
    /// Extra attempts after the first one for retryable failures.
    pub max_retries: u32,
    /// Base delay between attempts; attempt `n` waits `n * retry_delay`.
    pub retry_delay: Duration,
    pub temperature: f32,
    /// Optional system message sent ahead of every prompt.
    pub system_prompt: Option<String>,
}

impl Default for HttpOracleOptions {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            temperature: 0.0,
            system_prompt: None,
        }
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ─── HttpOracle ───────────────────────────────────────────────────────────

/// Oracle backed by an OpenAI-compatible `/chat/completions` endpoint.
///
/// Transport errors, `429` and `5xx` responses are retried up to
/// `max_retries` times with linear backoff. Everything else fails fast.
pub struct HttpOracle {
    client: reqwest::Client,
    opts: HttpOracleOptions,
}

impl HttpOracle {
    pub fn new(opts: HttpOracleOptions) -> Result<Self> {
        if opts.endpoint.trim().is_empty() {
            return Err(OracleError::Config("endpoint must not be empty".into()));
        }
        if opts.model.trim().is_empty() {
            return Err(OracleError::Config("model must not be empty".into()));
        }
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, opts })
    }

    async fn attempt(&self, prompt: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.opts.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let body = ChatRequest {
            model: &self.opts.model,
            messages,
            temperature: self.opts.temperature,
        };

        let mut req = self.client.post(&self.opts.endpoint).json(&body);
        if let Some(key) = self.opts.api_key.as_deref() {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(OracleError::EmptyReply);
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl Oracle for HttpOracle {
    fn label(&self) -> String {
        format!("http:{}", self.opts.model)
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        let attempts = self.opts.max_retries.saturating_add(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match self.attempt(prompt).await {
                Ok(text) => {
                    debug!(attempt, "oracle replied");
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(attempt, error = %e, "oracle call failed, retrying");
                    tokio::time::sleep(self.opts.retry_delay.saturating_mul(attempt)).await;
                    last_err = Some(e);
                }
                Err(e) if attempt > 1 => {
                    return Err(OracleError::Exhausted {
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Err(OracleError::Exhausted {
            attempts,
            last: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
