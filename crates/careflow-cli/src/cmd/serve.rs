use careflow_core::Orchestrator;
use std::path::Path;

pub fn run(config_path: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let port = port.unwrap_or(config.server.port);
    let orchestrator = Orchestrator::from_config(&config)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(careflow_server::serve(orchestrator, port))
}
