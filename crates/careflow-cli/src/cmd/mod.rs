pub mod chat;
pub mod classify;
pub mod config;
pub mod executors;
pub mod serve;

use anyhow::Context;
use careflow_core::config::Config;
use std::path::Path;

/// Load `path`, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load_or_default(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}
