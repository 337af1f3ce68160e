//! Executors: specialized handling units with their own action registries.
//!
//! Executors are identified by an opaque [`ExecutorId`]. The display name is
//! presentation-only and may collide between executors. Each executor keeps
//! a per-user [`ExecutorMemory`] which actions update after validating their
//! parameters, and which is fed back to the oracle as the executor's known
//! state.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::{CareflowError, Result};
use crate::registry::ActionRegistry;
use crate::types::TaskType;

// ---------------------------------------------------------------------------
// ExecutorId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutorId(String);

impl ExecutorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ExecutorMemory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutorMemory {
    pub facts: BTreeMap<String, String>,
    pub stage: Option<String>,
}

impl ExecutorMemory {
    pub fn remember(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.facts.insert(key.into(), value.into());
    }

    pub fn set_stage(&mut self, stage: impl Into<String>) {
        self.stage = Some(stage.into());
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.stage.is_none()
    }

    /// Render as prompt text.
    pub fn describe(&self) -> String {
        let facts = if self.facts.is_empty() {
            "none".to_string()
        } else {
            self.facts
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "known facts: {facts}; stage: {}",
            self.stage.as_deref().unwrap_or("initial")
        )
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor {
    id: ExecutorId,
    name: String,
    role: String,
    /// Task types this executor declares it handles.
    handles: Vec<TaskType>,
    /// Prompt lines describing what the executor should accomplish.
    brief: Vec<String>,
    registry: ActionRegistry,
    memory: Mutex<HashMap<String, ExecutorMemory>>,
}

impl Executor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
        registry: ActionRegistry,
    ) -> Self {
        Self {
            id: ExecutorId::new(id),
            name: name.into(),
            role: role.into(),
            handles: Vec::new(),
            brief: Vec::new(),
            registry,
            memory: Mutex::new(HashMap::new()),
        }
    }

    pub fn handling(mut self, types: &[TaskType]) -> Self {
        self.handles = types.to_vec();
        self
    }

    pub fn with_brief(mut self, lines: &[&str]) -> Self {
        self.brief = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_role(&mut self, role: impl Into<String>) {
        self.role = role.into();
    }

    pub fn id(&self) -> &ExecutorId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn handled_types(&self) -> &[TaskType] {
        &self.handles
    }

    pub fn brief(&self) -> &[String] {
        &self.brief
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Whether this executor is selected for `task_type`. `Generic` selects
    /// every executor.
    pub fn handles(&self, task_type: TaskType) -> bool {
        task_type == TaskType::Generic || self.handles.contains(&task_type)
    }

    /// Copy of the executor's known state for `user_id`.
    ///
    /// Actions run against such a copy and the result is written back with
    /// [`Executor::commit_memory`], so the map lock is never held while an
    /// action body runs.
    pub fn memory_snapshot(&self, user_id: &str) -> ExecutorMemory {
        self.lock_memory()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the user's state with `memory`. Empty state is dropped.
    pub fn commit_memory(&self, user_id: &str, memory: ExecutorMemory) {
        let mut guard = self.lock_memory();
        if memory.is_empty() {
            guard.remove(user_id);
        } else {
            guard.insert(user_id.to_string(), memory);
        }
    }

    /// Drop everything the executor knows about `user_id`.
    pub fn forget(&self, user_id: &str) -> bool {
        self.lock_memory().remove(user_id).is_some()
    }

    fn lock_memory(&self) -> MutexGuard<'_, HashMap<String, ExecutorMemory>> {
        // Only clone, insert and remove run under this lock; none of them
        // can leave the map half-written.
        self.memory.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("handles", &self.handles)
            .field("actions", &self.registry.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ExecutorSet
// ---------------------------------------------------------------------------

/// The registered team, fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct ExecutorSet {
    executors: Vec<Arc<Executor>>,
}

impl ExecutorSet {
    pub fn new(executors: Vec<Executor>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for e in &executors {
            if !seen.insert(e.id().clone()) {
                return Err(CareflowError::DuplicateExecutor(e.id().to_string()));
            }
        }
        Ok(Self {
            executors: executors.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn get(&self, id: &ExecutorId) -> Option<Arc<Executor>> {
        self.executors.iter().find(|e| e.id() == id).cloned()
    }

    /// Executors selected for `task_type`, in registration order.
    pub fn handling(&self, task_type: TaskType) -> Vec<Arc<Executor>> {
        self.executors
            .iter()
            .filter(|e| e.handles(task_type))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Executor>> {
        self.executors.iter()
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    /// Clear every executor's memory for `user_id`.
    pub fn forget_user(&self, user_id: &str) {
        for e in &self.executors {
            e.forget(user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(id: &str, handles: &[TaskType]) -> Executor {
        Executor::new(id, format!("{id} agent"), "test role", ActionRegistry::new(id))
            .handling(handles)
    }

    #[test]
    fn generic_selects_every_executor() {
        let set = ExecutorSet::new(vec![
            exec("a", &[TaskType::Appointment]),
            exec("b", &[TaskType::Guidance]),
        ])
        .unwrap();
        assert_eq!(set.handling(TaskType::Generic).len(), 2);
        assert_eq!(set.handling(TaskType::Guidance).len(), 1);
        assert!(set.handling(TaskType::Consultation).is_empty());
    }

    #[test]
    fn duplicate_ids_rejected_but_names_may_collide() {
        let err = ExecutorSet::new(vec![exec("a", &[]), exec("a", &[])]).unwrap_err();
        assert!(matches!(err, CareflowError::DuplicateExecutor(_)));

        let mut one = exec("a", &[]);
        let mut two = exec("b", &[]);
        one.rename("Same");
        two.rename("Same");
        assert!(ExecutorSet::new(vec![one, two]).is_ok());
    }

    #[test]
    fn memory_is_per_user() {
        let e = exec("a", &[]);
        let mut m = e.memory_snapshot("u1");
        m.remember("name", "Alice");
        e.commit_memory("u1", m);
        assert_eq!(e.memory_snapshot("u1").facts["name"], "Alice");
        assert!(e.memory_snapshot("u2").is_empty());
        assert!(e.forget("u1"));
        assert!(e.memory_snapshot("u1").is_empty());
    }

    #[test]
    fn untouched_memory_is_not_retained() {
        let e = exec("a", &[]);
        e.commit_memory("u1", e.memory_snapshot("u1"));
        assert!(!e.forget("u1"));
    }

    #[test]
    fn snapshot_edits_are_invisible_until_committed() {
        let e = exec("a", &[]);
        let mut working = e.memory_snapshot("u1");
        working.set_stage("booking");
        assert!(e.memory_snapshot("u1").is_empty());
        e.commit_memory("u1", working);
        assert_eq!(e.memory_snapshot("u1").stage.as_deref(), Some("booking"));
    }

    #[test]
    fn describe_lists_facts_and_stage() {
        let mut m = ExecutorMemory::default();
        assert_eq!(m.describe(), "known facts: none; stage: initial");
        m.remember("age", "30");
        m.set_stage("collected");
        assert_eq!(m.describe(), "known facts: age=30; stage: collected");
    }
}
