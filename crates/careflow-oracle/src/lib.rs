//! `careflow-oracle`: clients for the external reasoning oracle.
//!
//! The oracle is a black box to the orchestration core: it receives a prompt
//! describing one task package and answers with a single action string such as
//! `CollectUserInfo: name=Alice, gender=F, age=30, contact=123`.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher
//!     │  prompt
//!     ▼
//! dyn Oracle      ← object-safe async trait, shared as Arc<dyn Oracle>
//!     │
//!     ├── HttpOracle      ← OpenAI-compatible /chat/completions, retries + backoff
//!     └── ScriptedOracle  ← deterministic replies routed by prompt substring
//! ```
//!
//! Retry and backoff live here, inside the client. The core never retries an
//! oracle call; a returned `Err` is final for that package.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use careflow_oracle::{Oracle, ScriptedOracle};
//!
//! let oracle = ScriptedOracle::new().with_default("ProvideHealthAdvice: topic=sleep");
//! let action = oracle.invoke("any prompt").await?;
//! ```

pub mod error;
pub mod http;
pub mod scripted;

#[cfg(test)]
mod tests;

pub use error::OracleError;
pub use http::{HttpOracle, HttpOracleOptions};
pub use scripted::{ScriptedOracle, ScriptedReply};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, OracleError>;

/// An external reasoning oracle: prompt in, action string out.
///
/// Implementations must be safe to call concurrently; the dispatcher runs one
/// call per task package and several packages may be in flight at once.
#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    /// Short label used in logs (`"http:gpt-4o-mini"`, `"scripted"`).
    fn label(&self) -> String;

    /// Turn `prompt` into an action string.
    async fn invoke(&self, prompt: &str) -> Result<String>;
}
