use crate::output::print_json;
use careflow_core::types::Completion;
use careflow_core::Orchestrator;
use careflow_oracle::ScriptedOracle;
use std::path::Path;
use std::sync::Arc;

pub fn run(
    config_path: &Path,
    user_id: &str,
    message: &str,
    reply: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let orchestrator = match reply {
        Some(action) => {
            Orchestrator::with_oracle(&config, Arc::new(ScriptedOracle::new().with_default(action)))?
        }
        None => Orchestrator::from_config(&config)?,
    };

    let rt = tokio::runtime::Runtime::new()?;
    let reply = rt.block_on(orchestrator.chat(user_id, message))?;

    if json {
        print_json(&reply)?;
        return Ok(());
    }

    println!("{}", reply.response);
    for p in &reply.packages {
        if p.completion() == Completion::Failed {
            eprintln!("[failed] {} ({}): {}", p.executor, p.task_type, p.answer());
        }
    }
    Ok(())
}
