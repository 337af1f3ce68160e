use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("oracle returned an empty reply")]
    EmptyReply,

    #[error("oracle gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    #[error("oracle configuration error: {0}")]
    Config(String),

    #[error("scripted oracle failure: {0}")]
    Scripted(String),
}

impl OracleError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            OracleError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            OracleError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
