//! Dispatcher: classify an instruction, build task packages and drive each
//! package through one oracle round-trip and one action invocation.
//!
//! Every package is isolated. Whatever happens to one package (oracle error,
//! timeout, unknown action, panicking action) ends in that package's own
//! terminal state and never affects its siblings. Packages of one turn run
//! concurrently and are all collected before the turn is integrated.

use std::sync::Arc;
use std::time::Duration;

use careflow_oracle::Oracle;
use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::classifier::Classifier;
use crate::config::DispatchConfig;
use crate::directory::Directory;
use crate::error::DispatchError;
use crate::executor::ExecutorSet;
use crate::invoker::{self, Invocation};
use crate::package::TaskPackage;
use crate::prompt::executor_prompt;
use crate::registry::ERROR_PREFIX;
use crate::session::Turn;

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub oracle_timeout: Duration,
    pub action_timeout: Duration,
    pub history_window: usize,
    pub fail_on_rejection: bool,
    pub creator: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for DispatchSettings {
    fn from(cfg: &DispatchConfig) -> Self {
        Self {
            oracle_timeout: cfg.oracle_timeout(),
            action_timeout: cfg.action_timeout(),
            history_window: cfg.history_window,
            fail_on_rejection: cfg.fail_on_rejection,
            creator: cfg.creator.clone(),
        }
    }
}

pub struct Dispatcher {
    classifier: Classifier,
    executors: ExecutorSet,
    oracle: Arc<dyn Oracle>,
    directory: Arc<dyn Directory>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        executors: ExecutorSet,
        oracle: Arc<dyn Oracle>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            classifier: Classifier::default(),
            executors,
            oracle,
            directory,
            settings: DispatchSettings::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn executors(&self) -> &ExecutorSet {
        &self.executors
    }

    pub fn oracle(&self) -> &Arc<dyn Oracle> {
        &self.oracle
    }

    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.directory
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// One fresh package per selected `(task type, executor)` pair.
    pub fn plan(&self, instruction: &str) -> Vec<TaskPackage> {
        let classification = self.classifier.classify_detailed(instruction);
        debug!(rule = classification.rule, types = ?classification.task_types, "classified instruction");

        let mut packages = Vec::new();
        for task_type in classification.task_types {
            let selected = self.executors.handling(task_type);
            if selected.is_empty() {
                warn!(task_type = %task_type, "no executor handles task type");
            }
            for executor in selected {
                packages.push(TaskPackage::create(
                    instruction,
                    task_type,
                    self.settings.creator.as_str(),
                    executor.id().clone(),
                ));
            }
        }
        packages
    }

    /// Run one turn. `history` is the user's conversation so far; only the
    /// last `history_window` turns reach the prompt.
    pub async fn dispatch(
        &self,
        user_id: &str,
        instruction: &str,
        history: &[Turn],
    ) -> Vec<TaskPackage> {
        let packages = self.plan(instruction);
        info!(user_id, packages = packages.len(), "dispatching");

        let start = history.len().saturating_sub(self.settings.history_window);
        let window = &history[start..];
        join_all(
            packages
                .into_iter()
                .map(|p| self.run_package(user_id, p, window)),
        )
        .await
    }

    /// Drive a single package to a terminal state.
    pub async fn run_package(
        &self,
        user_id: &str,
        mut package: TaskPackage,
        history: &[Turn],
    ) -> TaskPackage {
        let outcome = self.execute(user_id, &mut package, history).await;
        settle(&mut package, outcome, self.settings.fail_on_rejection);
        info!(
            package = %package.id,
            executor = %package.executor,
            completion = %package.completion(),
            "package finished"
        );
        package
    }

    async fn execute(
        &self,
        user_id: &str,
        package: &mut TaskPackage,
        history: &[Turn],
    ) -> Result<Invocation, DispatchError> {
        let Some(executor) = self.executors.get(&package.executor) else {
            return Err(DispatchError::ExecutorNotFound(package.executor.to_string()));
        };

        package.mark_dispatched();
        let memory = executor.memory_snapshot(user_id);
        let prompt = executor_prompt(&executor, package, history, &memory);

        let reply = match timeout(self.settings.oracle_timeout, self.oracle.invoke(&prompt)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(executor = %executor.id(), oracle = %self.oracle.label(), error = %e, "oracle call failed");
                return Err(DispatchError::ExternalCallFailure(format!("oracle: {e}")));
            }
            Err(_) => {
                warn!(executor = %executor.id(), "oracle call timed out");
                return Err(DispatchError::ExternalCallFailure(format!(
                    "oracle timed out after {}s",
                    self.settings.oracle_timeout.as_secs_f32()
                )));
            }
        };
        let action = action_line(&reply).to_string();
        debug!(executor = %executor.id(), action = %action, "oracle chose action");

        // The action works on its own copy of the user's state. The copy is
        // committed only when the result arrives in time; a blocking task
        // that outlives the timeout keeps running but its writes are dropped.
        let directory = Arc::clone(&self.directory);
        let exec = Arc::clone(&executor);
        let mut working = memory;
        let task = tokio::task::spawn_blocking(move || {
            let result = invoker::invoke_on(&exec, &mut working, directory.as_ref(), &action);
            (result, working)
        });

        match timeout(self.settings.action_timeout, task).await {
            Ok(Ok((result, working))) => {
                if result.is_ok() {
                    executor.commit_memory(user_id, working);
                }
                result
            }
            Ok(Err(join)) => {
                error!(executor = %executor.id(), error = %join, "action task aborted");
                let reason = if join.is_panic() {
                    "action panicked".to_string()
                } else {
                    join.to_string()
                };
                Err(DispatchError::ActionFault(reason))
            }
            Err(_) => {
                warn!(executor = %executor.id(), "action timed out");
                Err(DispatchError::ExternalCallFailure(format!(
                    "action timed out after {}s",
                    self.settings.action_timeout.as_secs_f32()
                )))
            }
        }
    }
}

/// The first non-empty line of an oracle reply, with code fences stripped.
fn action_line(reply: &str) -> &str {
    reply
        .lines()
        .map(|l| l.trim().trim_matches('`').trim())
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

fn settle(
    package: &mut TaskPackage,
    outcome: Result<Invocation, DispatchError>,
    fail_on_rejection: bool,
) {
    let res = match outcome {
        Ok(Invocation::Rejected(text)) if fail_on_rejection => package.fail(text),
        Ok(inv) => package.complete(inv.text()),
        Err(e) => {
            warn!(package = %package.id, kind = e.kind(), error = %e, "package failed");
            package.fail(format!("{ERROR_PREFIX}{e}"))
        }
    };
    if let Err(e) = res {
        error!(package = %package.id, error = %e, "package already settled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions;
    use crate::directory::StaticDirectory;
    use crate::executor::{Executor, ExecutorId};
    use crate::registry::{
        ActionContext, ActionDescriptor, ActionError, ActionFn, ActionRegistry, FnAction,
    };
    use crate::types::{Completion, TaskType};
    use careflow_oracle::ScriptedOracle;

    const COLLECT: &str = "CollectUserInfo: name=Alice, gender=F, age=30, contact=123";

    fn team() -> ExecutorSet {
        ExecutorSet::new(actions::builtin_executors().unwrap()).unwrap()
    }

    fn dispatcher(oracle: ScriptedOracle) -> Dispatcher {
        Dispatcher::new(team(), Arc::new(oracle), Arc::new(StaticDirectory::builtin()))
    }

    #[tokio::test]
    async fn appointment_request_completes_one_package() {
        let d = dispatcher(ScriptedOracle::new().route("id: appointment", COLLECT));
        let packages = d.dispatch("u1", "I want to book a doctor", &[]).await;
        assert_eq!(packages.len(), 1);
        let p = &packages[0];
        assert_eq!(p.task_type, TaskType::Appointment);
        assert_eq!(p.completion(), Completion::Completed);
        assert!(p.answer().contains("name=Alice"));
        assert!(p.dispatched_at.is_some());
        assert!(p.timestamp.is_some());

        let exec = d.executors().get(&ExecutorId::new("appointment")).unwrap();
        assert_eq!(exec.memory_snapshot("u1").facts["age"], "30");
    }

    #[tokio::test]
    async fn generic_request_reaches_every_executor() {
        let d = dispatcher(ScriptedOracle::new().with_default("Nothing"));
        let packages = d.dispatch("u1", "hello", &[]).await;
        assert_eq!(packages.len(), 3);
        assert!(packages.iter().all(|p| p.task_type == TaskType::Generic));
        assert!(packages
            .iter()
            .all(|p| p.completion() == Completion::Failed && p.answer().contains("action not found")));
    }

    #[tokio::test]
    async fn one_failure_does_not_affect_siblings() {
        let d = dispatcher(
            ScriptedOracle::new()
                .route("id: appointment", COLLECT)
                .fail_on("id: guide", "upstream exploded")
                .route("id: consultation", "ProvideHealthAdvice: topic=sleep"),
        );
        let packages = d.dispatch("u1", "hello", &[]).await;
        let by_exec = |id: &str| {
            packages
                .iter()
                .find(|p| p.executor.as_str() == id)
                .unwrap()
                .clone()
        };
        assert!(by_exec("appointment").is_completed());
        assert!(by_exec("consultation").is_completed());
        let guide = by_exec("guide");
        assert_eq!(guide.completion(), Completion::Failed);
        assert!(guide.answer().contains("external call failed"));
    }

    #[tokio::test]
    async fn dispatch_order_follows_registration() {
        let d = dispatcher(ScriptedOracle::new().with_default("x"));
        let ids: Vec<String> = d
            .dispatch("u1", "hi", &[])
            .await
            .into_iter()
            .map(|p| p.executor.to_string())
            .collect();
        assert_eq!(ids, vec!["appointment", "guide", "consultation"]);
    }

    #[tokio::test]
    async fn slow_oracle_times_out() {
        let d = dispatcher(
            ScriptedOracle::new()
                .with_default(COLLECT)
                .with_delay(Duration::from_millis(500)),
        )
        .with_settings(DispatchSettings {
            oracle_timeout: Duration::from_millis(20),
            ..DispatchSettings::default()
        });
        let packages = d.dispatch("u1", "book", &[]).await;
        assert_eq!(packages[0].completion(), Completion::Failed);
        assert!(packages[0].answer().contains("timed out"));
    }

    #[tokio::test]
    async fn unknown_executor_fails_package() {
        let d = dispatcher(ScriptedOracle::new().with_default(COLLECT));
        let package = TaskPackage::create(
            "book",
            TaskType::Appointment,
            "careflow",
            ExecutorId::new("ghost"),
        );
        let out = d.run_package("u1", package, &[]).await;
        assert_eq!(out.completion(), Completion::Failed);
        assert!(out.answer().contains("executor not found: ghost"));
        assert!(out.dispatched_at.is_none());
    }

    #[tokio::test]
    async fn rejection_completes_unless_configured_to_fail() {
        let oracle = ScriptedOracle::new().with_default("CollectUserInfo: name=Alice");
        let d = dispatcher(oracle.clone());
        let p = d.dispatch("u1", "book", &[]).await.remove(0);
        assert_eq!(p.completion(), Completion::Completed);
        assert!(p.answer().starts_with(ERROR_PREFIX));
        assert!(p.answer().contains("gender"));

        let strict = dispatcher(oracle).with_settings(DispatchSettings {
            fail_on_rejection: true,
            ..DispatchSettings::default()
        });
        let p = strict.dispatch("u1", "book", &[]).await.remove(0);
        assert_eq!(p.completion(), Completion::Failed);
    }

    #[tokio::test]
    async fn specific_type_without_handler_selects_nobody() {
        let only_guide = ExecutorSet::new(vec![actions::guide_executor().unwrap()]).unwrap();
        let d = Dispatcher::new(
            only_guide,
            Arc::new(ScriptedOracle::new().with_default("x")),
            Arc::new(StaticDirectory::builtin()),
        );
        assert!(d.dispatch("u1", "book an appointment", &[]).await.is_empty());
    }

    fn explode(_: &mut ActionContext<'_>) -> Result<String, ActionError> {
        panic!("boom")
    }

    #[tokio::test]
    async fn panicking_action_is_contained() {
        let mut registry = ActionRegistry::new("fragile");
        registry
            .register(FnAction::new(
                ActionDescriptor {
                    name: "Explode",
                    description: "panics",
                    params: vec![],
                },
                explode,
            ))
            .unwrap();
        let set = ExecutorSet::new(vec![
            Executor::new("fragile", "Fragile", "test", registry),
            actions::consultation_executor().unwrap(),
        ])
        .unwrap();
        let d = Dispatcher::new(
            set,
            Arc::new(
                ScriptedOracle::new()
                    .route("id: fragile", "Explode")
                    .route("id: consultation", "SuggestFollowUp: condition=flu"),
            ),
            Arc::new(StaticDirectory::builtin()),
        );
        let packages = d.dispatch("u1", "hello", &[]).await;
        assert_eq!(packages[0].completion(), Completion::Failed);
        assert!(packages[0].answer().contains("action panicked"));
        assert!(packages[1].is_completed());
    }

    fn slow_booking(ctx: &mut ActionContext<'_>) -> Result<String, ActionError> {
        std::thread::sleep(Duration::from_millis(400));
        ctx.memory.remember("booked", "yes");
        Ok("booked".to_string())
    }

    fn quick_note(ctx: &mut ActionContext<'_>) -> Result<String, ActionError> {
        ctx.memory.remember("noted", "yes");
        Ok("noted".to_string())
    }

    fn desk() -> ExecutorSet {
        let mut registry = ActionRegistry::new("desk");
        for (name, handler) in [("Book", slow_booking as ActionFn), ("Note", quick_note as ActionFn)] {
            registry
                .register(FnAction::new(
                    ActionDescriptor {
                        name,
                        description: "test",
                        params: vec![],
                    },
                    handler,
                ))
                .unwrap();
        }
        ExecutorSet::new(vec![Executor::new("desk", "Desk", "test", registry)]).unwrap()
    }

    fn desk_dispatcher(action_timeout: Duration) -> Dispatcher {
        Dispatcher::new(
            desk(),
            Arc::new(
                ScriptedOracle::new()
                    .route("slow please", "Book")
                    .route("quick please", "Note"),
            ),
            Arc::new(StaticDirectory::builtin()),
        )
        .with_settings(DispatchSettings {
            action_timeout,
            ..DispatchSettings::default()
        })
    }

    #[tokio::test]
    async fn timed_out_action_fails_and_leaves_memory_untouched() {
        let d = desk_dispatcher(Duration::from_millis(100));
        let p = d.dispatch("u1", "slow please", &[]).await.remove(0);
        assert_eq!(p.completion(), Completion::Failed);
        assert!(p.answer().contains("action timed out"), "{}", p.answer());

        // Let the abandoned blocking task run to completion.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let exec = d.executors().get(&ExecutorId::new("desk")).unwrap();
        assert!(exec.memory_snapshot("u1").is_empty());
    }

    #[tokio::test]
    async fn slow_action_does_not_block_other_users() {
        let d = desk_dispatcher(Duration::from_secs(5));
        let slow = d.dispatch("alice", "slow please", &[]);
        let quick = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let started = std::time::Instant::now();
            let packages = d.dispatch("bob", "quick please", &[]).await;
            (packages, started.elapsed())
        };
        let (alice, (bob, bob_elapsed)) = tokio::join!(slow, quick);

        assert!(alice[0].is_completed());
        assert!(bob[0].is_completed());
        assert!(bob_elapsed < Duration::from_millis(250), "{bob_elapsed:?}");

        let exec = d.executors().get(&ExecutorId::new("desk")).unwrap();
        assert_eq!(exec.memory_snapshot("alice").facts["booked"], "yes");
        assert_eq!(exec.memory_snapshot("bob").facts["noted"], "yes");
    }

    #[tokio::test]
    async fn prompt_sees_only_history_window() {
        let oracle = ScriptedOracle::new()
            .fail_on("turn-0\n", "too much history")
            .with_default(COLLECT);
        let d = dispatcher(oracle);
        let history: Vec<Turn> = (0..8).map(|i| Turn::user(format!("turn-{i}"))).collect();
        let p = d.dispatch("u1", "book", &history).await.remove(0);
        assert!(p.is_completed(), "{}", p.answer());
    }

    #[test]
    fn action_line_takes_first_non_empty_line() {
        assert_eq!(action_line("\n  ```\nFoo: a=1\nBar"), "Foo: a=1");
        assert_eq!(action_line("   "), "");
    }
}
