use crate::output::{print_json, print_table};
use careflow_core::actions::default_executors;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ExecutorInfo {
    id: String,
    name: String,
    role: String,
    handles: Vec<String>,
    actions: Vec<String>,
}

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let executors = default_executors(&config)?;

    let infos: Vec<ExecutorInfo> = executors
        .iter()
        .map(|e| ExecutorInfo {
            id: e.id().to_string(),
            name: e.name().to_string(),
            role: e.role().to_string(),
            handles: e.handled_types().iter().map(|t| t.to_string()).collect(),
            actions: e
                .registry()
                .descriptors()
                .iter()
                .map(|d| d.signature())
                .collect(),
        })
        .collect();

    if json {
        return print_json(&infos);
    }

    if infos.is_empty() {
        println!("No executors registered.");
        return Ok(());
    }

    let rows = infos
        .iter()
        .map(|i| {
            vec![
                i.id.clone(),
                i.name.clone(),
                i.handles.join(", "),
                i.actions.len().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "HANDLES", "ACTIONS"], rows);
    Ok(())
}
