use crate::output::{print_json, print_table};
use careflow_core::actions::default_executors;
use careflow_core::classifier::Classifier;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Route {
    task_type: String,
    executors: Vec<String>,
}

#[derive(Serialize)]
struct ClassifyOutput {
    rule: &'static str,
    routes: Vec<Route>,
}

pub fn run(config_path: &Path, text: &str, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let executors = default_executors(&config)?;
    let classification = Classifier::default().classify_detailed(text);

    let routes: Vec<Route> = classification
        .task_types
        .iter()
        .map(|&t| Route {
            task_type: t.to_string(),
            executors: executors
                .handling(t)
                .iter()
                .map(|e| e.id().to_string())
                .collect(),
        })
        .collect();

    if json {
        return print_json(&ClassifyOutput {
            rule: classification.rule,
            routes,
        });
    }

    println!("rule: {}", classification.rule);
    let rows = routes
        .into_iter()
        .map(|r| {
            let executors = if r.executors.is_empty() {
                "-".to_string()
            } else {
                r.executors.join(", ")
            };
            vec![r.task_type, executors]
        })
        .collect();
    print_table(&["TASK TYPE", "EXECUTORS"], rows);
    Ok(())
}
