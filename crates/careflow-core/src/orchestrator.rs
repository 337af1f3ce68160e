//! Orchestrator: one chat turn end to end.
//!
//! `chat` appends the user message, dispatches, integrates the results and
//! appends the response. Turns of the same user are serialized by a per-user
//! async mutex; different users proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use careflow_oracle::Oracle;
use serde::Serialize;
use tracing::{info, instrument};

use crate::actions;
use crate::config::Config;
use crate::directory::{Directory, StaticDirectory};
use crate::dispatcher::{DispatchSettings, Dispatcher};
use crate::error::{CareflowError, Result};
use crate::integrator::integrate_with;
use crate::package::TaskPackage;
use crate::session::{InMemorySessionStore, Session, SessionStore, Turn};

/// Local-time format of [`ChatReply::timestamp`].
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub user_id: String,
    pub timestamp: String,
    /// Packages of this turn, in dispatch order.
    pub packages: Vec<TaskPackage>,
}

pub struct Orchestrator {
    dispatcher: Dispatcher,
    sessions: Arc<dyn SessionStore>,
    turn_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(dispatcher: Dispatcher, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            dispatcher,
            sessions,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Built-in executors, the configured oracle and an in-memory store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let oracle = config.build_oracle()?;
        Self::with_oracle(config, oracle)
    }

    /// Like [`Orchestrator::from_config`] with the oracle supplied by the caller.
    pub fn with_oracle(config: &Config, oracle: Arc<dyn Oracle>) -> Result<Self> {
        config.check()?;
        let executors = actions::default_executors(config)?;
        let directory: Arc<dyn Directory> = Arc::new(StaticDirectory::builtin());
        let dispatcher = Dispatcher::new(executors, oracle, directory)
            .with_settings(DispatchSettings::from(&config.dispatch));
        let sessions = Arc::new(InMemorySessionStore::new(config.session.limits()));
        info!(
            executors = dispatcher.executors().len(),
            oracle = %dispatcher.oracle().label(),
            "orchestrator ready"
        );
        Ok(Self::new(dispatcher, sessions))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    #[instrument(skip(self, message))]
    pub async fn chat(&self, user_id: &str, message: &str) -> Result<ChatReply> {
        if user_id.is_empty() {
            return Err(CareflowError::InvalidRequest("user_id is required".into()));
        }
        if message.is_empty() {
            return Err(CareflowError::InvalidRequest("message is required".into()));
        }

        let lock = self.turn_lock(user_id);
        let _turn = lock.lock().await;

        self.sessions.append(user_id, Turn::user(message));
        let window = self.dispatcher.settings().history_window;
        let history = self.sessions.recent(user_id, window);

        let packages = self.dispatcher.dispatch(user_id, message, &history).await;
        let response = integrate_with(&packages, self.dispatcher.executors());

        let len = self.sessions.append(user_id, Turn::system(response.as_str()));
        info!(packages = packages.len(), history = len, "turn complete");

        Ok(ChatReply {
            response,
            user_id: user_id.to_string(),
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            packages,
        })
    }

    /// Drop the user's history and everything the executors know about them.
    pub fn reset_session(&self, user_id: &str) -> bool {
        self.dispatcher.executors().forget_user(user_id);
        let mut locks = self.lock_turns();
        if locks.get(user_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(user_id);
        }
        self.sessions.reset(user_id)
    }

    pub fn history(&self, user_id: &str) -> Result<Session> {
        self.sessions
            .snapshot(user_id)
            .ok_or_else(|| CareflowError::SessionNotFound(user_id.to_string()))
    }

    /// The user's turn lock. Locks nobody holds or waits on are pruned here,
    /// so the map only tracks users with a turn in flight.
    fn turn_lock(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.lock_turns();
        locks.retain(|_, l| Arc::strong_count(l) > 1);
        Arc::clone(locks.entry(user_id.to_string()).or_default())
    }

    fn lock_turns(&self) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.turn_locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    fn tracked_turn_locks(&self) -> usize {
        self.lock_turns().len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::OracleConfig;
    use crate::executor::{ExecutorId, ExecutorSet};
    use crate::integrator::FALLBACK_MESSAGE;
    use crate::types::TurnRole;
    use careflow_oracle::ScriptedOracle;

    const COLLECT: &str = "CollectUserInfo: name=Alice, gender=F, age=30, contact=123";

    fn orchestrator(oracle: ScriptedOracle) -> Orchestrator {
        Orchestrator::with_oracle(&Config::default(), Arc::new(oracle)).unwrap()
    }

    #[tokio::test]
    async fn zero_executors_yield_fallback() {
        let dispatcher = Dispatcher::new(
            ExecutorSet::new(vec![]).unwrap(),
            Arc::new(ScriptedOracle::new().with_default("x")),
            Arc::new(StaticDirectory::builtin()),
        );
        let orch = Orchestrator::new(dispatcher, Arc::new(InMemorySessionStore::default()));
        let reply = orch.chat("u1", "hello").await.unwrap();
        assert_eq!(reply.response, FALLBACK_MESSAGE);
        assert!(reply.packages.is_empty());

        let session = orch.history("u1").unwrap();
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[1].content, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn appointment_turn_is_integrated() {
        let orch = orchestrator(ScriptedOracle::new().route("id: appointment", COLLECT));
        let reply = orch.chat("u1", "Please book me an appointment").await.unwrap();
        assert!(reply
            .response
            .starts_with("【appointment - Appointment Agent】: Collected patient details"));
        assert_eq!(reply.user_id, "u1");
        assert_eq!(reply.timestamp.len(), "2026-01-01 00:00:00".len());
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let orch = orchestrator(ScriptedOracle::new());
        assert!(matches!(
            orch.chat("u1", "").await,
            Err(CareflowError::InvalidRequest(_))
        ));
        assert!(matches!(
            orch.chat("", "hi").await,
            Err(CareflowError::InvalidRequest(_))
        ));
        assert!(orch.history("u1").is_err());
    }

    #[tokio::test]
    async fn reset_clears_history_and_executor_memory() {
        let orch = orchestrator(ScriptedOracle::new().route("id: appointment", COLLECT));
        orch.chat("u1", "book").await.unwrap();
        let exec = orch
            .dispatcher()
            .executors()
            .get(&ExecutorId::new("appointment"))
            .unwrap();
        assert!(!exec.memory_snapshot("u1").is_empty());

        assert!(orch.reset_session("u1"));
        assert!(matches!(
            orch.history("u1"),
            Err(CareflowError::SessionNotFound(_))
        ));
        assert!(exec.memory_snapshot("u1").is_empty());
        assert!(!orch.reset_session("u1"));
    }

    #[tokio::test]
    async fn same_user_turns_do_not_interleave() {
        let orch = orchestrator(
            ScriptedOracle::new()
                .with_default(COLLECT)
                .with_delay(Duration::from_millis(30)),
        );
        let (a, b) = tokio::join!(orch.chat("u1", "book one"), orch.chat("u1", "book two"));
        a.unwrap();
        b.unwrap();
        let roles: Vec<TurnRole> = orch
            .history("u1")
            .unwrap()
            .history
            .into_iter()
            .map(|t| t.role)
            .collect();
        assert_eq!(
            roles,
            vec![TurnRole::User, TurnRole::System, TurnRole::User, TurnRole::System]
        );
    }

    #[tokio::test]
    async fn prompt_history_includes_current_message() {
        let orch = orchestrator(
            ScriptedOracle::new()
                .route("[user] book please", COLLECT)
                .with_default("Nope"),
        );
        let reply = orch.chat("u1", "book please").await.unwrap();
        assert_ne!(reply.response, FALLBACK_MESSAGE);
        assert!(reply.packages[0].is_completed());
        assert!(reply.packages[0].answer().contains("name=Alice"));
    }

    #[tokio::test]
    async fn whitespace_input_is_a_regular_turn() {
        let orch = orchestrator(ScriptedOracle::new().with_default("Nope"));
        let reply = orch.chat("u1", "   ").await.unwrap();
        assert_eq!(reply.response, FALLBACK_MESSAGE);
        assert_eq!(orch.history("u1").unwrap().history.len(), 2);
    }

    #[tokio::test]
    async fn idle_turn_locks_are_released() {
        let orch = orchestrator(ScriptedOracle::new().with_default(COLLECT));
        for i in 0..5 {
            orch.chat(&format!("user-{i}"), "book").await.unwrap();
        }
        // Earlier users' locks are pruned when the next turn starts.
        assert_eq!(orch.tracked_turn_locks(), 1);

        orch.reset_session("user-4");
        assert_eq!(orch.tracked_turn_locks(), 0);
    }

    #[tokio::test]
    async fn long_conversations_stay_bounded() {
        let orch = orchestrator(ScriptedOracle::new().with_default(COLLECT));
        for i in 0..26 {
            orch.chat("u1", &format!("book {i}")).await.unwrap();
        }
        // 52 appends: truncated to 30 at the 51st, then one more.
        assert_eq!(orch.history("u1").unwrap().history.len(), 31);
    }

    #[test]
    fn invalid_config_is_refused() {
        let mut config = Config::default();
        config.session.retain_turns = 60;
        config.oracle = OracleConfig::Scripted { responses: vec![] };
        assert!(matches!(
            Orchestrator::from_config(&config),
            Err(CareflowError::InvalidConfig(_))
        ));
    }
}
