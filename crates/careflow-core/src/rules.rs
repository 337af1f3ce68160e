use crate::classifier::Rule;
use crate::types::TaskType;

// ---------------------------------------------------------------------------
// Keyword tables (lower-case)
// ---------------------------------------------------------------------------

pub const APPOINTMENT_KEYWORDS: &[&str] = &["预约", "挂号", "appointment", "book", "register"];

pub const SYMPTOM_KEYWORDS: &[&str] = &["症状", "诊断", "symptom", "diagnos"];

pub const CONSULTATION_KEYWORDS: &[&str] = &["咨询", "建议", "consult", "advice", "advise"];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

fn mentions_appointment(text: &str) -> bool {
    contains_any(text, APPOINTMENT_KEYWORDS)
}

fn mentions_symptoms(text: &str) -> bool {
    contains_any(text, SYMPTOM_KEYWORDS)
}

fn mentions_consultation(text: &str) -> bool {
    contains_any(text, CONSULTATION_KEYWORDS)
}

fn always(_: &str) -> bool {
    true
}

/// Priority order: appointment, symptoms/diagnosis, consultation, generic.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "appointment-keywords",
            condition: mentions_appointment,
            task_types: &[TaskType::Appointment],
        },
        Rule {
            id: "symptom-keywords",
            condition: mentions_symptoms,
            task_types: &[TaskType::Guidance],
        },
        Rule {
            id: "consultation-keywords",
            condition: mentions_consultation,
            task_types: &[TaskType::Consultation],
        },
        Rule {
            id: "generic",
            condition: always,
            task_types: &[TaskType::Generic],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_stored_lower_case() {
        for k in APPOINTMENT_KEYWORDS
            .iter()
            .chain(SYMPTOM_KEYWORDS)
            .chain(CONSULTATION_KEYWORDS)
        {
            assert_eq!(*k, k.to_lowercase());
        }
    }

    #[test]
    fn last_rule_is_catch_all() {
        let rules = default_rules();
        let last = rules.last().unwrap();
        assert!((last.condition)("anything at all"));
        assert_eq!(last.task_types, &[TaskType::Generic]);
    }
}
