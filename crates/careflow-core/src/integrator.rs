use tracing::{info, warn};

use crate::executor::ExecutorSet;
use crate::package::TaskPackage;

/// Reply used when no package of a turn completed.
pub const FALLBACK_MESSAGE: &str =
    "Sorry, unable to process your request. Please provide more information.";

/// Fold completed packages into the response text, in dispatch order.
///
/// Each completed package renders as `【<task type> - <executor name>】: <answer>`.
/// Failed and incomplete packages are left out. `executor_name` resolves an
/// executor id to its display name; unknown ids render as the id itself.
pub fn integrate<F>(packages: &[TaskPackage], executor_name: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let sections: Vec<String> = packages
        .iter()
        .filter(|p| p.is_completed())
        .map(|p| {
            let name = executor_name(p.executor.as_str())
                .unwrap_or_else(|| p.executor.to_string());
            format!("【{} - {}】: {}", p.task_type, name, p.answer())
        })
        .collect();

    if sections.is_empty() {
        warn!(packages = packages.len(), "no completed packages to integrate");
        return FALLBACK_MESSAGE.to_string();
    }
    info!(completed = sections.len(), total = packages.len(), "integrated results");
    sections.join("\n\n")
}

/// [`integrate`] with names looked up in `executors`.
pub fn integrate_with(packages: &[TaskPackage], executors: &ExecutorSet) -> String {
    integrate(packages, |id| {
        executors
            .iter()
            .find(|e| e.id().as_str() == id)
            .map(|e| e.name().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorId;
    use crate::types::TaskType;

    fn package(exec: &str, task_type: TaskType) -> TaskPackage {
        TaskPackage::create("x", task_type, "careflow", ExecutorId::new(exec))
    }

    fn names(id: &str) -> Option<String> {
        match id {
            "e" => Some("E".into()),
            "g" => Some("Guide".into()),
            _ => None,
        }
    }

    #[test]
    fn single_completed_package_with_failed_sibling() {
        let mut ok = package("e", TaskType::Appointment);
        ok.complete("A").unwrap();
        let mut bad = package("g", TaskType::Guidance);
        bad.fail("oracle down").unwrap();

        let out = integrate(&[ok, bad], names);
        assert_eq!(out, "【appointment - E】: A");
    }

    #[test]
    fn sections_keep_dispatch_order() {
        let mut first = package("g", TaskType::Generic);
        first.complete("one").unwrap();
        let mut second = package("e", TaskType::Generic);
        second.complete("two").unwrap();
        let out = integrate(&[first, second], names);
        assert_eq!(out, "【generic - Guide】: one\n\n【generic - E】: two");
    }

    #[test]
    fn nothing_completed_yields_fallback() {
        assert_eq!(integrate(&[], names), FALLBACK_MESSAGE);
        let pending = package("e", TaskType::Consultation);
        assert_eq!(integrate(&[pending], names), FALLBACK_MESSAGE);
    }

    #[test]
    fn unknown_executor_renders_id() {
        let mut p = package("ghost", TaskType::Consultation);
        p.complete("hi").unwrap();
        assert_eq!(integrate(&[p], names), "【consultation - ghost】: hi");
    }
}
