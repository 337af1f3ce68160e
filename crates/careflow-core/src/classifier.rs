use serde::Serialize;

use crate::types::TaskType;

// ---------------------------------------------------------------------------
// Classification (output)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Id of the rule that matched, or `"fallback"`.
    pub rule: &'static str,
    pub task_types: Vec<TaskType>,
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A fn-pointer rule evaluated against the case-normalized instruction.
pub struct Rule {
    pub id: &'static str,
    pub condition: fn(&str) -> bool,
    pub task_types: &'static [TaskType],
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Ordered rule list; the first rule whose condition holds decides the tags.
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn classify(&self, instruction: &str) -> Vec<TaskType> {
        self.classify_detailed(instruction).task_types
    }

    pub fn classify_detailed(&self, instruction: &str) -> Classification {
        let text = normalize(instruction);
        for rule in &self.rules {
            if (rule.condition)(&text) {
                return Classification {
                    rule: rule.id,
                    task_types: rule.task_types.to_vec(),
                };
            }
        }

        // Rule lists without a catch-all still yield a tag.
        Classification {
            rule: "fallback",
            task_types: vec![TaskType::Generic],
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(crate::rules::default_rules())
    }
}

/// Single case-folding policy for every rule: Unicode lower-case.
pub fn normalize(instruction: &str) -> String {
    instruction.to_lowercase()
}
