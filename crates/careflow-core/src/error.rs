use thiserror::Error;

#[derive(Debug, Error)]
pub enum CareflowError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("duplicate action '{action}' in executor '{executor}'")]
    DuplicateAction { executor: String, action: String },

    #[error("duplicate executor id: {0}")]
    DuplicateExecutor(String),

    #[error("invalid completion transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("invalid task type: {0}")]
    InvalidTaskType(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("oracle setup failed: {0}")]
    Oracle(#[from] careflow_oracle::OracleError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CareflowError>;

/// Per-package failure taxonomy.
///
/// Every variant is caught by the dispatcher and turned into a terminal
/// package state; none of them aborts the surrounding chat turn.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    #[error("missing required parameter: {0}")]
    ParameterMissing(String),

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("executor not found: {0}")]
    ExecutorNotFound(String),

    #[error("external call failed: {0}")]
    ExternalCallFailure(String),

    /// The action body faulted outside its own validation.
    #[error("action failed: {0}")]
    ActionFault(String),
}

impl DispatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::ParameterMissing(_) => "parameter_missing",
            DispatchError::ActionNotFound(_) => "action_not_found",
            DispatchError::ExecutorNotFound(_) => "executor_not_found",
            DispatchError::ExternalCallFailure(_) => "external_call_failure",
            DispatchError::ActionFault(_) => "action_fault",
        }
    }
}
