use super::{contains_any, invalid, optional, required};
use crate::error::Result;
use crate::registry::{ActionContext, ActionDescriptor, ActionError, ActionRegistry, FnAction};

type Outcome = std::result::Result<String, ActionError>;

pub(super) const BRIEF: &[&str] = &[
    "Work out what the health question is really about.",
    "Give practical advice, medication guidance or a reading of a test result.",
    "Suggest when to follow up with a doctor.",
];

const DISCLAIMER: &str = "This is general information and does not replace a doctor's advice.";

pub(super) fn register(registry: &mut ActionRegistry) -> Result<()> {
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "AnalyzeHealthQuestion",
            description: "classify a health question by topic",
            params: vec![
                required("question", "the question as asked"),
                optional("age", "age in years"),
                optional("gender", "patient gender"),
            ],
        },
        analyze_health_question,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "ProvideHealthAdvice",
            description: "give lifestyle advice on a topic",
            params: vec![
                required("topic", "sleep, diet, exercise, stress or general"),
                optional("condition", "related condition"),
            ],
        },
        provide_health_advice,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "ProvideMedicationGuidance",
            description: "explain how to take a medication safely",
            params: vec![
                required("medication", "medication name"),
                optional("condition", "what it is taken for"),
                optional("allergies", "known drug allergies"),
            ],
        },
        provide_medication_guidance,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "InterpretMedicalTest",
            description: "compare a test value with its reference range",
            params: vec![
                required("test_name", "e.g. fasting glucose, hemoglobin"),
                required("value", "numeric result"),
                optional("unit", "unit of the value"),
            ],
        },
        interpret_medical_test,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "SuggestFollowUp",
            description: "suggest a follow-up interval",
            params: vec![
                required("condition", "condition being followed"),
                optional("severity", "mild, moderate or severe"),
            ],
        },
        suggest_follow_up,
    ))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reference tables
// ---------------------------------------------------------------------------

struct Medication {
    names: &'static [&'static str],
    class: &'static str,
    usage: &'static str,
    cautions: &'static str,
}

const MEDICATIONS: &[Medication] = &[
    Medication {
        names: &["ibuprofen", "布洛芬"],
        class: "non-steroidal anti-inflammatory",
        usage: "Take with food. Adults usually 200-400 mg every 6-8 hours.",
        cautions: "Avoid with stomach ulcers, kidney disease or late pregnancy.",
    },
    Medication {
        names: &["paracetamol", "acetaminophen", "对乙酰氨基酚"],
        class: "analgesic and antipyretic",
        usage: "Adults usually 500-1000 mg every 4-6 hours, at most 4 g a day.",
        cautions: "Avoid alcohol. Check combination cold remedies for hidden doses.",
    },
    Medication {
        names: &["amoxicillin", "阿莫西林"],
        class: "penicillin antibiotic",
        usage: "Prescription only. Finish the full course as prescribed.",
        cautions: "Do not take with a penicillin allergy.",
    },
    Medication {
        names: &["omeprazole", "奥美拉唑"],
        class: "proton pump inhibitor",
        usage: "Take 30-60 minutes before breakfast.",
        cautions: "Long-term use should be reviewed by a doctor.",
    },
];

struct Reference {
    names: &'static [&'static str],
    unit: &'static str,
    low: f64,
    high: f64,
}

const REFERENCES: &[Reference] = &[
    Reference {
        names: &["fasting glucose", "glucose", "血糖"],
        unit: "mmol/L",
        low: 3.9,
        high: 6.1,
    },
    Reference {
        names: &["total cholesterol", "cholesterol", "胆固醇"],
        unit: "mmol/L",
        low: 0.0,
        high: 5.2,
    },
    Reference {
        names: &["hemoglobin", "haemoglobin", "血红蛋白"],
        unit: "g/L",
        low: 120.0,
        high: 175.0,
    },
    Reference {
        names: &["white blood cell", "wbc", "白细胞"],
        unit: "10^9/L",
        low: 4.0,
        high: 10.0,
    },
    Reference {
        names: &["alt", "谷丙转氨酶"],
        unit: "U/L",
        low: 0.0,
        high: 40.0,
    },
];

fn lookup<'t, T>(
    table: &'t [T],
    names: fn(&T) -> &'static [&'static str],
    key: &str,
) -> Option<&'t T> {
    let key = key.trim().to_lowercase();
    table.iter().find(|entry| names(entry).iter().any(|n| *n == key))
}

fn topic_of(question: &str) -> &'static str {
    if contains_any(question, &["medicine", "medication", "drug", "pill", "dose", "药"]) {
        "medication"
    } else if contains_any(question, &["test", "report", "result", "level", "检查", "化验", "报告"]) {
        "test result"
    } else if contains_any(
        question,
        &["sleep", "diet", "exercise", "weight", "stress", "睡眠", "饮食", "运动", "体重", "压力"],
    ) {
        "lifestyle"
    } else {
        "symptom"
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn analyze_health_question(ctx: &mut ActionContext<'_>) -> Outcome {
    let question = ctx.require("question")?;
    let age = ctx.optional("age");
    let gender = ctx.optional("gender");

    let topic = topic_of(question);
    let next = match topic {
        "medication" => "ProvideMedicationGuidance",
        "test result" => "InterpretMedicalTest",
        _ => "ProvideHealthAdvice",
    };

    ctx.memory.remember("question", question);
    ctx.memory.remember("topic", topic);
    if let Some(a) = age {
        ctx.memory.remember("age", a);
    }
    if let Some(g) = gender {
        ctx.memory.remember("gender", g);
    }
    ctx.memory.set_stage("question_analyzed");

    Ok(format!(
        "Question: {question}\nTopic: {topic}\nSuggested next step: {next}"
    ))
}

fn provide_health_advice(ctx: &mut ActionContext<'_>) -> Outcome {
    let topic = ctx.require("topic")?;
    let condition = ctx.optional("condition");

    let tips: &[&str] = if contains_any(topic, &["sleep", "睡眠"]) {
        &[
            "Keep a fixed bedtime and wake time, including weekends.",
            "Avoid caffeine after noon and screens in the hour before bed.",
            "Keep the bedroom dark, quiet and cool.",
        ]
    } else if contains_any(topic, &["diet", "饮食", "weight", "体重"]) {
        &[
            "Fill half the plate with vegetables at each meal.",
            "Limit salt to 5 g and added sugar to 25 g a day.",
            "Prefer whole grains and lean protein.",
        ]
    } else if contains_any(topic, &["exercise", "运动"]) {
        &[
            "Aim for 150 minutes of moderate activity a week.",
            "Add strength training twice a week.",
            "Warm up first and increase intensity gradually.",
        ]
    } else if contains_any(topic, &["stress", "压力", "anxiety", "焦虑"]) {
        &[
            "Take short breaks and try slow breathing exercises.",
            "Keep regular physical activity and social contact.",
            "Seek professional help if low mood lasts more than two weeks.",
        ]
    } else {
        &[
            "Keep a balanced diet and regular sleep.",
            "Stay active most days of the week.",
            "Have a routine check-up once a year.",
        ]
    };

    ctx.memory.remember("topic", topic);
    ctx.memory.set_stage("advice_given");

    let mut out = format!("Advice on {topic}");
    if let Some(c) = condition {
        out.push_str(&format!(" (with {c})"));
    }
    out.push_str(":\n");
    for t in tips {
        out.push_str(&format!("- {t}\n"));
    }
    out.push('\n');
    out.push_str(DISCLAIMER);
    Ok(out)
}

fn provide_medication_guidance(ctx: &mut ActionContext<'_>) -> Outcome {
    let medication = ctx.require("medication")?;
    let condition = ctx.optional("condition");
    let allergies = ctx.or("allergies", "");

    let known = lookup(MEDICATIONS, |m| m.names, medication);
    let allergic = !allergies.is_empty()
        && (contains_any(allergies, &[medication.to_lowercase().as_str()])
            || known
                .map(|m| m.class.contains("penicillin") && contains_any(allergies, &["penicillin", "青霉素"]))
                .unwrap_or(false));

    ctx.memory.remember("medication", medication);
    ctx.memory.set_stage("medication_explained");

    let mut out = format!("Medication guidance: {medication}");
    if let Some(c) = condition {
        out.push_str(&format!(" for {c}"));
    }
    out.push('\n');
    if allergic {
        out.push_str(
            "\nWARNING: the reported allergies conflict with this medication. Do not take it; \
             ask a doctor for an alternative.\n",
        );
    }
    match known {
        Some(m) => out.push_str(&format!(
            "\nClass: {}\nUsage: {}\nCautions: {}\n",
            m.class, m.usage, m.cautions
        )),
        None => out.push_str(
            "\nNo reference entry for this medication. Follow the package insert and your \
             pharmacist's instructions.\n",
        ),
    }
    out.push('\n');
    out.push_str(DISCLAIMER);
    Ok(out)
}

fn interpret_medical_test(ctx: &mut ActionContext<'_>) -> Outcome {
    let test = ctx.require("test_name")?;
    let raw = ctx.require("value")?;
    let unit = ctx.optional("unit");
    let value: f64 = raw
        .parse()
        .map_err(|_| invalid("value", format!("'{raw}' is not a number")))?;

    let Some(reference) = lookup(REFERENCES, |r| r.names, test) else {
        return Ok(format!(
            "{test} = {raw}{}: no reference range on file. Ask the ordering doctor to interpret it.",
            unit.map(|u| format!(" {u}")).unwrap_or_default()
        ));
    };
    if let Some(u) = unit {
        if !u.eq_ignore_ascii_case(reference.unit) {
            return Err(invalid(
                "unit",
                format!("expected {} for {test}, got {u}", reference.unit),
            ));
        }
    }

    let verdict = if value < reference.low {
        "below the reference range"
    } else if value > reference.high {
        "above the reference range"
    } else {
        "within the reference range"
    };

    ctx.memory.remember(format!("test:{}", test.trim().to_lowercase()), raw);
    ctx.memory.set_stage("test_interpreted");

    Ok(format!(
        "{test} = {value} {unit}: {verdict} ({low}-{high} {unit}).\n\n{DISCLAIMER}",
        unit = reference.unit,
        low = reference.low,
        high = reference.high,
    ))
}

fn suggest_follow_up(ctx: &mut ActionContext<'_>) -> Outcome {
    let condition = ctx.require("condition")?;
    let severity = ctx.or("severity", "mild");

    let days = if contains_any(severity, &["severe", "严重"]) {
        3
    } else if contains_any(severity, &["moderate", "中"]) {
        7
    } else {
        14
    };

    ctx.memory.remember("follow_up_days", days.to_string());
    ctx.memory.set_stage("follow_up_suggested");

    Ok(format!(
        "Follow up on {condition} within {days} days. Come back sooner if the symptoms \
         worsen or new ones appear."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::call;
    use crate::executor::ExecutorMemory;

    #[test]
    fn questions_are_classified_by_topic() {
        assert_eq!(topic_of("What dose of ibuprofen?"), "medication");
        assert_eq!(topic_of("My blood test report"), "test result");
        assert_eq!(topic_of("How can I sleep better"), "lifestyle");
        assert_eq!(topic_of("my knee hurts"), "symptom");
    }

    #[test]
    fn analyze_question_suggests_next_action() {
        let mut mem = ExecutorMemory::default();
        let out = call(
            analyze_health_question,
            &[("question", "Is this medication safe?")],
            &mut mem,
        )
        .unwrap();
        assert!(out.contains("ProvideMedicationGuidance"));
        assert_eq!(mem.facts["topic"], "medication");
    }

    #[test]
    fn advice_follows_topic() {
        let mut mem = ExecutorMemory::default();
        let out = call(provide_health_advice, &[("topic", "sleep")], &mut mem).unwrap();
        assert!(out.contains("bedtime"));
        assert!(out.ends_with(DISCLAIMER));
    }

    #[test]
    fn penicillin_allergy_blocks_amoxicillin() {
        let mut mem = ExecutorMemory::default();
        let out = call(
            provide_medication_guidance,
            &[("medication", "Amoxicillin"), ("allergies", "penicillin")],
            &mut mem,
        )
        .unwrap();
        assert!(out.contains("WARNING"));
        assert!(out.contains("penicillin antibiotic"));
    }

    #[test]
    fn unknown_medication_has_generic_guidance() {
        let mut mem = ExecutorMemory::default();
        let out = call(provide_medication_guidance, &[("medication", "zzz")], &mut mem).unwrap();
        assert!(out.contains("No reference entry"));
        assert!(!out.contains("WARNING"));
    }

    #[test]
    fn test_values_are_compared_with_range() {
        let mut mem = ExecutorMemory::default();
        let out = call(
            interpret_medical_test,
            &[("test_name", "Fasting Glucose"), ("value", "7.2")],
            &mut mem,
        )
        .unwrap();
        assert!(out.contains("above the reference range"));
        assert_eq!(mem.facts["test:fasting glucose"], "7.2");
    }

    #[test]
    fn non_numeric_test_value_is_rejected() {
        let mut mem = ExecutorMemory::default();
        let err = call(
            interpret_medical_test,
            &[("test_name", "glucose"), ("value", "high")],
            &mut mem,
        )
        .unwrap_err();
        assert!(err.is_rejection());
        assert!(mem.is_empty());
    }

    #[test]
    fn mismatched_unit_is_rejected() {
        let mut mem = ExecutorMemory::default();
        let err = call(
            interpret_medical_test,
            &[("test_name", "glucose"), ("value", "110"), ("unit", "mg/dL")],
            &mut mem,
        )
        .unwrap_err();
        assert!(err.to_string().contains("mmol/L"));
    }

    #[test]
    fn follow_up_interval_depends_on_severity() {
        let mut mem = ExecutorMemory::default();
        let out = call(
            suggest_follow_up,
            &[("condition", "bronchitis"), ("severity", "severe")],
            &mut mem,
        )
        .unwrap();
        assert!(out.contains("within 3 days"));
        assert_eq!(mem.facts["follow_up_days"], "3");
    }
}
