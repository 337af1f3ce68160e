use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use careflow_oracle::{HttpOracle, HttpOracleOptions, Oracle, ScriptedOracle};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actions::BUILTIN_IDS;
use crate::error::{CareflowError, Result};
use crate::session::SessionLimits;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "careflow.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// OracleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OracleConfig {
    OpenaiCompatible {
        #[serde(default = "default_endpoint")]
        endpoint: String,
        #[serde(default = "default_model")]
        model: String,
        /// Name of the environment variable holding the API key.
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
        #[serde(default = "default_max_retries")]
        max_retries: u32,
        #[serde(default)]
        temperature: f32,
    },
    Scripted {
        #[serde(default)]
        responses: Vec<ScriptedResponse>,
    },
}

/// One scripted reply. Without `contains` it becomes the default reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    pub reply: String,
}

fn default_endpoint() -> String {
    HttpOracleOptions::default().endpoint
}

fn default_model() -> String {
    HttpOracleOptions::default().model
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_retries() -> u32 {
    2
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig::OpenaiCompatible {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_retries: default_max_retries(),
            temperature: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// DispatchConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_oracle_timeout")]
    pub oracle_timeout_secs: u64,
    #[serde(default = "default_action_timeout")]
    pub action_timeout_secs: u64,
    /// Number of recent turns included in each executor prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Mark packages whose action rejected its input as failed.
    #[serde(default)]
    pub fail_on_rejection: bool,
    /// Creator recorded on every task package.
    #[serde(default = "default_creator")]
    pub creator: String,
}

fn default_oracle_timeout() -> u64 {
    30
}

fn default_action_timeout() -> u64 {
    10
}

fn default_history_window() -> usize {
    5
}

fn default_creator() -> String {
    "careflow".to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            oracle_timeout_secs: default_oracle_timeout(),
            action_timeout_secs: default_action_timeout(),
            history_window: default_history_window(),
            fail_on_rejection: false,
            creator: default_creator(),
        }
    }
}

impl DispatchConfig {
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default = "default_retain_turns")]
    pub retain_turns: usize,
}

fn default_max_turns() -> usize {
    50
}

fn default_retain_turns() -> usize {
    30
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            retain_turns: default_retain_turns(),
        }
    }
}

impl SessionConfig {
    pub fn limits(&self) -> SessionLimits {
        SessionLimits {
            max_turns: self.max_turns,
            retain_turns: self.retain_turns,
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutorOverride
// ---------------------------------------------------------------------------

/// Presentation overrides for a built-in executor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutorOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub executors: BTreeMap<String, ExecutorOverride>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Build the configured oracle. The API key is read from the environment
    /// here so it never lives in the config file.
    pub fn build_oracle(&self) -> Result<Arc<dyn Oracle>> {
        match &self.oracle {
            OracleConfig::OpenaiCompatible {
                endpoint,
                model,
                api_key_env,
                max_retries,
                temperature,
            } => {
                let api_key = std::env::var(api_key_env).ok().filter(|k| !k.is_empty());
                if api_key.is_none() {
                    warn!(env = %api_key_env, "no API key in environment; requests are sent unauthenticated");
                }
                let oracle = HttpOracle::new(HttpOracleOptions {
                    endpoint: endpoint.clone(),
                    model: model.clone(),
                    api_key,
                    max_retries: *max_retries,
                    temperature: *temperature,
                    ..HttpOracleOptions::default()
                })?;
                Ok(Arc::new(oracle))
            }
            OracleConfig::Scripted { responses } => {
                let mut oracle = ScriptedOracle::new();
                for r in responses {
                    oracle = match &r.contains {
                        Some(needle) => oracle.route(needle.clone(), r.reply.clone()),
                        None => oracle.with_default(r.reply.clone()),
                    };
                }
                Ok(Arc::new(oracle))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.session.retain_turns >= self.session.max_turns {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "session.retain_turns ({}) must be smaller than session.max_turns ({})",
                    self.session.retain_turns, self.session.max_turns
                ),
            });
        }

        if self.dispatch.oracle_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "dispatch.oracle_timeout_secs is 0; every oracle call would time out"
                    .to_string(),
            });
        }
        if self.dispatch.action_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "dispatch.action_timeout_secs is 0; every action would time out"
                    .to_string(),
            });
        }

        for id in self.executors.keys() {
            if !BUILTIN_IDS.contains(&id.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("unknown executor '{id}' in executors"),
                });
            }
        }

        match &self.oracle {
            OracleConfig::Scripted { responses } if responses.is_empty() => {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "scripted oracle has no responses; every package will fail"
                        .to_string(),
                });
            }
            OracleConfig::OpenaiCompatible { model, .. } if model.trim().is_empty() => {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "oracle.model is empty".to_string(),
                });
            }
            _ => {}
        }

        warnings
    }

    /// Fail on the first error-level warning.
    pub fn check(&self) -> Result<()> {
        match self
            .validate()
            .into_iter()
            .find(|w| w.level == WarnLevel::Error)
        {
            Some(w) => Err(CareflowError::InvalidConfig(w.message)),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
