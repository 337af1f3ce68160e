//! Action invoker: parse an oracle action string and run it against one
//! executor's registry.
//!
//! Grammar: `<ActionName>: <k1>=<v1>, <k2>=<v2>, ...`
//!
//! Values are not escaped. A comma or `=` inside a value breaks the
//! fragment apart; this is a known limitation of the protocol and callers
//! that need such values must move to a structured encoding.

use tracing::{debug, info, warn};

use crate::directory::Directory;
use crate::error::DispatchError;
use crate::executor::{Executor, ExecutorMemory};
use crate::registry::{ActionContext, ActionError, Params, ERROR_PREFIX};

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAction {
    pub name: String,
    pub params: Params,
}

/// Split at the first colon into name and parameter list, then split the list
/// on commas and each fragment at its first `=`. Fragments without `=` are
/// dropped; a repeated key keeps its last value.
pub fn parse_action(action: &str) -> ParsedAction {
    let (name, rest) = match action.split_once(':') {
        Some((name, rest)) => (name.trim(), rest.trim()),
        None => (action.trim(), ""),
    };

    let mut params = Params::new();
    if !rest.is_empty() {
        for fragment in rest.split(',') {
            if let Some((k, v)) = fragment.split_once('=') {
                params.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
    }

    ParsedAction {
        name: name.to_string(),
        params,
    }
}

/// Outcome of an action that ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Success(String),
    /// The action rejected its input; text is error-prefixed.
    Rejected(String),
}

impl Invocation {
    pub fn text(&self) -> &str {
        match self {
            Invocation::Success(t) | Invocation::Rejected(t) => t,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Invocation::Rejected(_))
    }
}

/// Parse `action` and run it as `user_id` against `executor`, committing the
/// user's executor state when the action ran.
///
/// Validation failures inside the action come back as
/// [`Invocation::Rejected`]; unknown actions and backend or internal faults
/// come back as `Err` and fail the package.
pub fn invoke(
    executor: &Executor,
    user_id: &str,
    directory: &dyn Directory,
    action: &str,
) -> Result<Invocation, DispatchError> {
    let mut memory = executor.memory_snapshot(user_id);
    let invocation = invoke_on(executor, &mut memory, directory, action)?;
    executor.commit_memory(user_id, memory);
    Ok(invocation)
}

/// Like [`invoke`], but against a caller-owned working copy of the user's
/// state. Nothing is written back; the caller decides whether to commit.
pub fn invoke_on(
    executor: &Executor,
    memory: &mut ExecutorMemory,
    directory: &dyn Directory,
    action: &str,
) -> Result<Invocation, DispatchError> {
    let parsed = parse_action(action);
    debug!(executor = %executor.id(), action = %parsed.name, params = ?parsed.params, "invoking action");

    let Some(handler) = executor.registry().get(&parsed.name) else {
        warn!(executor = %executor.id(), action = %parsed.name, "action not found");
        return Err(DispatchError::ActionNotFound(parsed.name));
    };

    let mut ctx = ActionContext {
        params: &parsed.params,
        memory,
        directory,
    };
    let result = handler.invoke(&mut ctx);

    match result {
        Ok(text) => {
            info!(executor = %executor.id(), action = %parsed.name, "action completed");
            Ok(Invocation::Success(text))
        }
        Err(ActionError::ParameterMissing(key)) => {
            warn!(executor = %executor.id(), action = %parsed.name, param = %key, "missing parameter");
            let e = DispatchError::ParameterMissing(key);
            Ok(Invocation::Rejected(format!("{ERROR_PREFIX}{e}")))
        }
        Err(e) if e.is_rejection() => {
            warn!(executor = %executor.id(), action = %parsed.name, error = %e, "action rejected input");
            Ok(Invocation::Rejected(format!("{ERROR_PREFIX}{e}")))
        }
        Err(ActionError::Backend(msg)) => Err(DispatchError::ExternalCallFailure(msg)),
        Err(e) => Err(DispatchError::ActionFault(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions;
    use crate::directory::StaticDirectory;

    #[test]
    fn parses_name_and_params() {
        let p = parse_action("CollectUserInfo: name=Alice, gender=F, age=30, contact=123");
        assert_eq!(p.name, "CollectUserInfo");
        assert_eq!(p.params.len(), 4);
        assert_eq!(p.params["name"], "Alice");
        assert_eq!(p.params["contact"], "123");
    }

    #[test]
    fn name_without_colon_has_no_params() {
        let p = parse_action("  ProvideGuidance  ");
        assert_eq!(p.name, "ProvideGuidance");
        assert!(p.params.is_empty());
    }

    #[test]
    fn splits_only_at_first_colon_and_first_equals() {
        let p = parse_action("ScheduleAppointment: doctor_id=D001, prefer_time=09:00=late");
        assert_eq!(p.name, "ScheduleAppointment");
        assert_eq!(p.params["prefer_time"], "09:00=late");
    }

    #[test]
    fn fragments_without_equals_are_ignored() {
        let p = parse_action("X: a=1, junk, b = 2 ");
        assert_eq!(p.params.len(), 2);
        assert_eq!(p.params["b"], "2");
    }

    #[test]
    fn comma_inside_value_breaks_the_value() {
        let p = parse_action("AnalyzeSymptoms: symptoms=cough, fever");
        assert_eq!(p.params["symptoms"], "cough");
        assert!(!p.params.contains_key("fever"));
    }

    #[test]
    fn repeated_key_keeps_last_value() {
        let p = parse_action("X: a=1, a=2");
        assert_eq!(p.params["a"], "2");
    }

    #[test]
    fn unknown_action_is_action_not_found() {
        let exec = actions::appointment_executor().unwrap();
        let dir = StaticDirectory::builtin();
        let err = invoke(&exec, "u1", &dir, "DoMagic: x=1").unwrap_err();
        assert_eq!(err, DispatchError::ActionNotFound("DoMagic".into()));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let exec = actions::appointment_executor().unwrap();
        let dir = StaticDirectory::builtin();
        assert!(invoke(&exec, "u1", &dir, "collectuserinfo: name=A").is_err());
    }

    #[test]
    fn collect_user_info_reports_values_in_order() {
        let exec = actions::appointment_executor().unwrap();
        let dir = StaticDirectory::builtin();
        let out = invoke(
            &exec,
            "u1",
            &dir,
            "CollectUserInfo: name=Alice, gender=F, age=30, contact=123",
        )
        .unwrap();
        let Invocation::Success(text) = out else {
            panic!("expected success, got {out:?}")
        };
        let positions: Vec<usize> = ["Alice", "F", "30", "123"]
            .iter()
            .map(|v| text.find(&format!("={v}")).expect("value present"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn missing_parameter_is_rejected_without_side_effects() {
        let exec = actions::appointment_executor().unwrap();
        let dir = StaticDirectory::builtin();
        let before = exec.memory_snapshot("u1");
        let out = invoke(&exec, "u1", &dir, "CollectUserInfo: name=Alice, gender=F, contact=123")
            .unwrap();
        assert!(out.is_rejection());
        assert!(out.text().starts_with(ERROR_PREFIX));
        assert!(out.text().contains("age"));
        assert_eq!(exec.memory_snapshot("u1"), before);
    }

    #[test]
    fn successful_call_updates_memory() {
        let exec = actions::appointment_executor().unwrap();
        let dir = StaticDirectory::builtin();
        invoke(
            &exec,
            "u1",
            &dir,
            "CollectUserInfo: name=Alice, gender=F, age=30, contact=123",
        )
        .unwrap();
        let mem = exec.memory_snapshot("u1");
        assert_eq!(mem.facts["name"], "Alice");
        assert!(exec.memory_snapshot("u2").is_empty());
    }

    #[test]
    fn working_copy_is_not_committed() {
        let exec = actions::appointment_executor().unwrap();
        let dir = StaticDirectory::builtin();
        let mut working = exec.memory_snapshot("u1");
        let out = invoke_on(
            &exec,
            &mut working,
            &dir,
            "CollectUserInfo: name=Alice, gender=F, age=30, contact=123",
        )
        .unwrap();
        assert!(!out.is_rejection());
        assert_eq!(working.facts["name"], "Alice");
        assert!(exec.memory_snapshot("u1").is_empty());
    }
}
