use crate::executor::{Executor, ExecutorMemory};
use crate::package::TaskPackage;
use crate::session::Turn;

/// Build the prompt that asks the oracle for the executor's next action.
///
/// The reply is expected to be a single line in the action-string grammar
/// parsed by [`crate::invoker::parse_action`].
pub fn executor_prompt(
    executor: &Executor,
    package: &TaskPackage,
    history: &[Turn],
    memory: &ExecutorMemory,
) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "You are {} (id: {}).\nRole: {}\n",
        executor.name(),
        executor.id(),
        executor.role()
    ));
    if !executor.brief().is_empty() {
        out.push_str("\nGoals:\n");
        for line in executor.brief() {
            out.push_str(&format!("- {line}\n"));
        }
    }

    out.push_str(&format!(
        "\nTask type: {}\nUser request: {}\n",
        package.task_type,
        package.instruction()
    ));

    out.push_str("\nRecent conversation:\n");
    if history.is_empty() {
        out.push_str("(none)\n");
    }
    for turn in history {
        out.push_str(&format!("[{}] {}\n", turn.role, turn.content));
    }

    out.push_str(&format!("\nCurrent state: {}\n", memory.describe()));

    out.push_str("\nAvailable actions:\n");
    for d in executor.registry().descriptors() {
        out.push_str(&format!("- {}\n", d.signature()));
    }

    out.push_str(
        "\nReply with exactly one line naming the next action and its parameters, \
         in the form:\nActionName: key1=value1, key2=value2\n\
         Parameters marked ? are optional. Do not use commas or '=' inside values.\n",
    );
    out
}
