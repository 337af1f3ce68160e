//! Task package: the unit of work passed from the dispatcher to an executor.
//!
//! The completion state only ever moves forward:
//! `Incomplete → Completed` or `Incomplete → Failed`. A package's
//! instruction is fixed at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CareflowError, Result};
use crate::executor::ExecutorId;
use crate::types::{Completion, TaskType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPackage {
    pub id: Uuid,
    instruction: String,
    pub task_type: TaskType,
    completion: Completion,
    pub creator: String,
    pub executor: ExecutorId,
    pub created_at: DateTime<Utc>,
    /// Set when the dispatcher hands the package to the oracle.
    #[serde(default)]
    pub dispatched_at: Option<DateTime<Utc>>,
    /// Set when the package reaches a terminal state.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Result text when completed; diagnostic when failed.
    #[serde(default)]
    answer: String,
}

impl TaskPackage {
    pub fn create(
        instruction: impl Into<String>,
        task_type: TaskType,
        creator: impl Into<String>,
        executor: ExecutorId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instruction: instruction.into(),
            task_type,
            completion: Completion::Incomplete,
            creator: creator.into(),
            executor,
            created_at: Utc::now(),
            dispatched_at: None,
            timestamp: None,
            answer: String::new(),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn completion(&self) -> Completion {
        self.completion
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn is_completed(&self) -> bool {
        self.completion == Completion::Completed
    }

    pub fn mark_dispatched(&mut self) {
        if self.dispatched_at.is_none() {
            self.dispatched_at = Some(Utc::now());
        }
    }

    pub fn complete(&mut self, answer: impl Into<String>) -> Result<()> {
        self.finish(Completion::Completed, answer.into())
    }

    pub fn fail(&mut self, diagnostic: impl Into<String>) -> Result<()> {
        self.finish(Completion::Failed, diagnostic.into())
    }

    fn finish(&mut self, to: Completion, answer: String) -> Result<()> {
        if self.completion.is_terminal() {
            return Err(CareflowError::InvalidTransition {
                from: self.completion.to_string(),
                to: to.to_string(),
            });
        }
        self.completion = to;
        self.answer = answer;
        self.timestamp = Some(Utc::now());
        Ok(())
    }
}
