//! Built-in executors and their actions.
//!
//! Every handler follows the same shape: read and validate parameters, query
//! the directory, and only then write to executor memory. A handler that
//! returns early never leaves partial state behind.

mod appointment;
mod consultation;
mod guide;

use tracing::debug;

use crate::config::Config;
use crate::directory::DirectoryError;
use crate::error::Result;
use crate::executor::{Executor, ExecutorSet};
use crate::registry::{ActionError, ActionRegistry, ParamSpec};
use crate::types::TaskType;

pub const APPOINTMENT_ID: &str = "appointment";
pub const GUIDE_ID: &str = "guide";
pub const CONSULTATION_ID: &str = "consultation";

/// Ids of the executors [`builtin_executors`] registers.
pub const BUILTIN_IDS: &[&str] = &[APPOINTMENT_ID, GUIDE_ID, CONSULTATION_ID];

pub fn appointment_executor() -> Result<Executor> {
    let mut registry = ActionRegistry::new(APPOINTMENT_ID);
    appointment::register(&mut registry)?;
    Ok(Executor::new(
        APPOINTMENT_ID,
        "Appointment Agent",
        "Helps patients book outpatient appointments: collects their details, \
         recommends a department and doctor, and reserves a slot.",
        registry,
    )
    .handling(&[TaskType::Appointment])
    .with_brief(appointment::BRIEF))
}

pub fn guide_executor() -> Result<Executor> {
    let mut registry = ActionRegistry::new(GUIDE_ID);
    guide::register(&mut registry)?;
    Ok(Executor::new(
        GUIDE_ID,
        "Guidance Agent",
        "Triage guide: gathers symptoms and history, assesses the situation and \
         points the patient to the right department and doctor.",
        registry,
    )
    .handling(&[TaskType::Guidance])
    .with_brief(guide::BRIEF))
}

pub fn consultation_executor() -> Result<Executor> {
    let mut registry = ActionRegistry::new(CONSULTATION_ID);
    consultation::register(&mut registry)?;
    Ok(Executor::new(
        CONSULTATION_ID,
        "Consultation Agent",
        "Answers general health questions, explains medication use and test \
         results, and suggests follow-up.",
        registry,
    )
    .handling(&[TaskType::Consultation])
    .with_brief(consultation::BRIEF))
}

pub fn builtin_executors() -> Result<Vec<Executor>> {
    Ok(vec![
        appointment_executor()?,
        guide_executor()?,
        consultation_executor()?,
    ])
}

/// Built-in team with the display overrides from `config` applied.
pub fn default_executors(config: &Config) -> Result<ExecutorSet> {
    let mut executors = builtin_executors()?;
    for exec in &mut executors {
        if let Some(ov) = config.executors.get(exec.id().as_str()) {
            if let Some(name) = &ov.name {
                debug!(executor = %exec.id(), name = %name, "overriding executor name");
                exec.rename(name.clone());
            }
            if let Some(role) = &ov.role {
                exec.set_role(role.clone());
            }
        }
    }
    ExecutorSet::new(executors)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn required(name: &'static str, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        description,
        required: true,
    }
}

fn optional(name: &'static str, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        description,
        required: false,
    }
}

fn backend(e: DirectoryError) -> ActionError {
    ActionError::Backend(e.to_string())
}

fn invalid(name: &str, reason: impl Into<String>) -> ActionError {
    ActionError::InvalidParameter {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    let text = text.to_lowercase();
    needles.iter().any(|n| text.contains(n))
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::NaiveDate;

    use crate::directory::{
        Department, Directory, DirectoryError, DirectoryResult, Doctor, Slot, StaticDirectory,
    };
    use crate::executor::ExecutorMemory;
    use crate::registry::{ActionContext, ActionError, ActionFn, Params};

    pub fn directory() -> StaticDirectory {
        StaticDirectory::with_base_date(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
    }

    /// A directory whose every lookup fails.
    pub struct DownDirectory;

    impl Directory for DownDirectory {
        fn departments(&self) -> DirectoryResult<Vec<Department>> {
            Err(DirectoryError("directory offline".into()))
        }
        fn doctors(&self) -> DirectoryResult<Vec<Doctor>> {
            Err(DirectoryError("directory offline".into()))
        }
        fn slots(&self, _: &str) -> DirectoryResult<Vec<Slot>> {
            Err(DirectoryError("directory offline".into()))
        }
    }

    pub fn call_with(
        handler: ActionFn,
        directory: &dyn Directory,
        params: &[(&str, &str)],
        memory: &mut ExecutorMemory,
    ) -> Result<String, ActionError> {
        let params: Params = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut ctx = ActionContext {
            params: &params,
            memory,
            directory,
        };
        handler(&mut ctx)
    }

    pub fn call(
        handler: ActionFn,
        params: &[(&str, &str)],
        memory: &mut ExecutorMemory,
    ) -> Result<String, ActionError> {
        call_with(handler, &directory(), params, memory)
    }
}
