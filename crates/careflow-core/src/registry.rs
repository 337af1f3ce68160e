//! Per-executor action registry.
//!
//! An executor declares its invocable actions once at startup. The registry
//! maps each action name to its handler and declared parameter contract, and
//! rejects duplicate names. Required-ness is informational here: validation
//! happens inside each action body, never in the registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::directory::Directory;
use crate::error::{CareflowError, Result};
use crate::executor::ExecutorMemory;

/// Prefix marking an action result as a rejection rather than a success.
pub const ERROR_PREFIX: &str = "error: ";

/// Parsed `key=value` parameters of one action call.
pub type Params = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Declared parameters, in documentation order.
    pub params: Vec<ParamSpec>,
}

impl ActionDescriptor {
    /// One-line signature used in prompts: `Name(a, b?, c?) - description`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                if p.required {
                    p.name.to_string()
                } else {
                    format!("{}?", p.name)
                }
            })
            .collect();
        format!("{}({}) - {}", self.name, params.join(", "), self.description)
    }
}

// ---------------------------------------------------------------------------
// ActionError / ActionContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionError {
    #[error("missing required parameter: {0}")]
    ParameterMissing(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The directory (or another backing service) failed.
    #[error("backend lookup failed: {0}")]
    Backend(String),

    /// Unexpected fault inside the action body.
    #[error("action fault: {0}")]
    Fault(String),
}

impl ActionError {
    /// Expected validation failures are reported to the user as text; the rest
    /// are infrastructure failures.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ActionError::ParameterMissing(_) | ActionError::InvalidParameter { .. }
        )
    }
}

/// Everything an action body may read or touch during one call.
pub struct ActionContext<'a> {
    pub params: &'a Params,
    /// The executor's known state for the calling user.
    pub memory: &'a mut ExecutorMemory,
    pub directory: &'a dyn Directory,
}

impl<'a> ActionContext<'a> {
    pub fn require(&self, key: &str) -> std::result::Result<&'a str, ActionError> {
        self.params
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| ActionError::ParameterMissing(key.to_string()))
    }

    pub fn optional(&self, key: &str) -> Option<&'a str> {
        self.params.get(key).map(|s| s.as_str())
    }

    pub fn or(&self, key: &str, default: &'a str) -> &'a str {
        self.optional(key).unwrap_or(default)
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

pub trait Action: Send + Sync {
    fn descriptor(&self) -> &ActionDescriptor;

    /// Run the action. Must not mutate `ctx.memory` before its own
    /// parameter validation has succeeded.
    fn invoke(&self, ctx: &mut ActionContext<'_>) -> std::result::Result<String, ActionError>;
}

/// Handler signature for [`FnAction`].
pub type ActionFn = fn(&mut ActionContext<'_>) -> std::result::Result<String, ActionError>;

/// A fn-pointer action. Every built-in action takes this form.
pub struct FnAction {
    descriptor: ActionDescriptor,
    handler: ActionFn,
}

impl FnAction {
    pub fn new(descriptor: ActionDescriptor, handler: ActionFn) -> Self {
        Self {
            descriptor,
            handler,
        }
    }
}

impl Action for FnAction {
    fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }

    fn invoke(&self, ctx: &mut ActionContext<'_>) -> std::result::Result<String, ActionError> {
        (self.handler)(ctx)
    }
}

// ---------------------------------------------------------------------------
// ActionRegistry
// ---------------------------------------------------------------------------

pub struct ActionRegistry {
    owner: String,
    actions: HashMap<String, Arc<dyn Action>>,
    order: Vec<String>,
}

impl ActionRegistry {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            actions: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Add an action. Names are unique per registry.
    pub fn register(&mut self, action: impl Action + 'static) -> Result<()> {
        let name = action.descriptor().name.to_string();
        if self.actions.contains_key(&name) {
            return Err(CareflowError::DuplicateAction {
                executor: self.owner.clone(),
                action: name,
            });
        }
        self.order.push(name.clone());
        self.actions.insert(name, Arc::new(action));
        Ok(())
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<&ActionDescriptor> {
        self.order
            .iter()
            .filter_map(|n| self.actions.get(n))
            .map(|a| a.descriptor())
            .collect()
    }
}
