use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TaskType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Appointment,
    Guidance,
    Consultation,
    /// Fallback tag; matches every registered executor.
    Generic,
}

impl TaskType {
    pub fn all() -> &'static [TaskType] {
        &[
            TaskType::Appointment,
            TaskType::Guidance,
            TaskType::Consultation,
            TaskType::Generic,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Appointment => "appointment",
            TaskType::Guidance => "guidance",
            TaskType::Consultation => "consultation",
            TaskType::Generic => "generic",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = crate::error::CareflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appointment" => Ok(TaskType::Appointment),
            "guidance" => Ok(TaskType::Guidance),
            "consultation" => Ok(TaskType::Consultation),
            "generic" => Ok(TaskType::Generic),
            _ => Err(crate::error::CareflowError::InvalidTaskType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Completion state of a task package.
///
/// Transitions: `Incomplete → Completed | Failed`. Both targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Completion {
    Incomplete,
    Completed,
    Failed,
}

impl Completion {
    pub fn as_str(self) -> &'static str {
        match self {
            Completion::Incomplete => "Incomplete",
            Completion::Completed => "Completed",
            Completion::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Completion::Incomplete)
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TurnRole
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    System,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::System => "system",
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
