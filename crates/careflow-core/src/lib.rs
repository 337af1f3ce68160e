//! careflow-core: orchestration core of the careflow medical assistant.
//!
//! A chat turn flows through:
//!
//! ```text
//! message ─▶ SessionStore::append
//!         ─▶ Dispatcher (Classifier ─▶ TaskPackage per executor
//!                        ─▶ Oracle ─▶ invoker ─▶ Action)
//!         ─▶ integrator ─▶ SessionStore::append ─▶ reply
//! ```
//!
//! The HTTP surface lives in `careflow-server`, the oracle clients in
//! `careflow-oracle`.

pub mod actions;
pub mod classifier;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod integrator;
pub mod invoker;
pub mod io;
pub mod orchestrator;
pub mod package;
pub mod prompt;
pub mod registry;
pub mod rules;
pub mod session;
pub mod types;

pub use error::{CareflowError, DispatchError, Result};
pub use orchestrator::{ChatReply, Orchestrator};
