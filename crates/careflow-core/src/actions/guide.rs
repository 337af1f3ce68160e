use super::{backend, contains_any, invalid, optional, required};
use crate::error::Result;
use crate::registry::{ActionContext, ActionDescriptor, ActionError, ActionRegistry, FnAction};

type Outcome = std::result::Result<String, ActionError>;

pub(super) const BRIEF: &[&str] = &[
    "Gather the main symptom, its duration and severity, and the medical history.",
    "Assess the health condition and its urgency.",
    "Match a department and doctor, then give step-by-step visit guidance.",
];

const URGENT_SIGNS: &[&str] = &[
    "chest pain",
    "shortness of breath",
    "faint",
    "bleeding",
    "胸痛",
    "呼吸困难",
    "昏厥",
    "出血",
];

pub(super) fn register(registry: &mut ActionRegistry) -> Result<()> {
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "CollectSymptoms",
            description: "record the main symptom and its characteristics",
            params: vec![
                required("main_symptom", "the main complaint"),
                required("duration", "how long it has lasted"),
                required("severity", "mild, moderate or severe"),
                optional("related_symptoms", "accompanying symptoms"),
            ],
        },
        collect_symptoms,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "CollectMedicalHistory",
            description: "record past illnesses, allergies and medication",
            params: vec![
                required("past_diseases", "previous illnesses"),
                required("allergies", "known allergies"),
                required("medications", "current medication"),
                optional("family_history", "relevant family history"),
            ],
        },
        collect_medical_history,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "AnalyzeHealthCondition",
            description: "assess the condition from symptoms and history",
            params: vec![
                required("main_symptom", "the main complaint"),
                optional("related_symptoms", "accompanying symptoms"),
                optional("past_diseases", "previous illnesses"),
                optional("age", "age in years"),
                optional("gender", "patient gender"),
            ],
        },
        analyze_health_condition,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "MatchDepartment",
            description: "match a department to the symptoms and suspected conditions",
            params: vec![
                required("main_symptom", "the main complaint"),
                optional("possible_conditions", "suspected conditions"),
                optional("previous_treatment", "treatment already received"),
            ],
        },
        match_department,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "MatchDoctor",
            description: "match doctors in a department to the condition",
            params: vec![
                required("department", "department name or id"),
                required("specific_condition", "the condition to treat"),
                optional("prefer_expertise", "preferred area of expertise"),
                optional("prefer_gender", "preferred doctor gender"),
            ],
        },
        match_doctor,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "ProvideGuidance",
            description: "give visit guidance for the chosen department",
            params: vec![
                required("symptoms", "symptom summary"),
                required("suggested_department", "department to visit"),
                optional("suggested_doctor", "doctor to see"),
                optional("urgency_level", "routine or urgent"),
            ],
        },
        provide_guidance,
    ))?;
    Ok(())
}

fn collect_symptoms(ctx: &mut ActionContext<'_>) -> Outcome {
    let main = ctx.require("main_symptom")?;
    let duration = ctx.require("duration")?;
    let severity = ctx.require("severity")?;
    let related = ctx.or("related_symptoms", "none");

    ctx.memory.remember("main_symptom", main);
    ctx.memory.remember("duration", duration);
    ctx.memory.remember("severity", severity);
    if related != "none" {
        ctx.memory.remember("related_symptoms", related);
    }
    ctx.memory.set_stage("symptoms_collected");

    Ok(format!(
        "Recorded symptoms: main={main}, duration={duration}, severity={severity}, related={related}"
    ))
}

fn collect_medical_history(ctx: &mut ActionContext<'_>) -> Outcome {
    let past = ctx.require("past_diseases")?;
    let allergies = ctx.require("allergies")?;
    let medications = ctx.require("medications")?;
    let family = ctx.or("family_history", "none");

    ctx.memory.remember("past_diseases", past);
    ctx.memory.remember("allergies", allergies);
    ctx.memory.remember("medications", medications);
    ctx.memory.set_stage("history_collected");

    Ok(format!(
        "Recorded medical history: past diseases={past}, allergies={allergies}, \
         medications={medications}, family history={family}"
    ))
}

fn analyze_health_condition(ctx: &mut ActionContext<'_>) -> Outcome {
    let main = ctx.require("main_symptom")?;
    let related = ctx.or("related_symptoms", "none");
    let past = ctx.or("past_diseases", "none");
    let gender = ctx.optional("gender");
    let age = ctx
        .optional("age")
        .map(|a| {
            a.parse::<u32>()
                .map_err(|_| invalid("age", format!("'{a}' is not an age in years")))
        })
        .transpose()?;

    let combined = format!("{main} {related}");
    let areas = ctx
        .directory
        .match_departments(&combined, None)
        .map_err(backend)?;

    let risk = if contains_any(&combined, URGENT_SIGNS) {
        "high"
    } else if age.map(|a| a >= 65).unwrap_or(false) || past != "none" {
        "elevated"
    } else {
        "low"
    };

    let mut out = format!(
        "Health assessment\n\n- Main symptom: {main}\n- Related symptoms: {related}\n- Past diseases: {past}\n"
    );
    if let Some(a) = age {
        out.push_str(&format!("- Age: {a}\n"));
    }
    if let Some(g) = gender {
        out.push_str(&format!("- Gender: {g}\n"));
    }
    out.push_str("\nLikely areas:\n");
    if areas.is_empty() {
        out.push_str("- General medicine (no specific pattern recognised)\n");
    }
    for (dept, score) in &areas {
        out.push_str(&format!("- {} ({}%): {}\n", dept.name, score, dept.expertise));
    }
    out.push_str(&format!("\nRisk level: {risk}\n"));
    if risk == "high" {
        out.push_str("Recommendation: seek emergency care now.\n");
    } else {
        out.push_str("Recommendation: book an outpatient visit and monitor the symptoms.\n");
    }

    ctx.memory.remember("risk_level", risk);
    ctx.memory.set_stage("condition_analyzed");
    Ok(out)
}

fn match_department(ctx: &mut ActionContext<'_>) -> Outcome {
    let main = ctx.require("main_symptom")?;
    let conditions = ctx.or("possible_conditions", "");
    let treatment = ctx.or("previous_treatment", "none");

    let matches = ctx
        .directory
        .match_departments(&format!("{main} {conditions}"), None)
        .map_err(backend)?;

    let (name, location) = match matches.first() {
        Some((d, _)) => (d.name.clone(), d.location.clone()),
        None => match ctx.directory.find_department("internal").map_err(backend)? {
            Some(d) => (d.name, d.location),
            None => return Ok("No suitable department found.".to_string()),
        },
    };

    ctx.memory.remember("suggested_department", name.as_str());
    ctx.memory.set_stage("department_matched");

    let mut out = format!("Suggested department: {name} ({location})");
    if matches.len() > 1 {
        let others: Vec<&str> = matches[1..].iter().map(|(d, _)| d.name.as_str()).collect();
        out.push_str(&format!("\nAlso relevant: {}", others.join(", ")));
    }
    if treatment != "none" {
        out.push_str(&format!(
            "\nBring records of the previous treatment ({treatment}) to the visit."
        ));
    }
    Ok(out)
}

fn match_doctor(ctx: &mut ActionContext<'_>) -> Outcome {
    let department = ctx.require("department")?;
    let condition = ctx.require("specific_condition")?;
    let expertise = ctx.optional("prefer_expertise");
    let gender = ctx.optional("prefer_gender");

    let mut doctors = ctx
        .directory
        .doctors_in(department, gender, None)
        .map_err(backend)?;
    if doctors.is_empty() {
        return Ok(format!("No matching doctors found in {department}."));
    }

    let wanted = expertise.unwrap_or(condition).to_lowercase();
    let fits = |e: &str| {
        let e = e.to_lowercase();
        wanted.split_whitespace().any(|w| e.contains(w))
    };
    doctors.sort_by(|a, b| {
        fits(&b.expertise)
            .cmp(&fits(&a.expertise))
            .then(b.rating.total_cmp(&a.rating))
    });

    ctx.memory.remember("suggested_doctor", doctors[0].name.as_str());
    ctx.memory.set_stage("doctor_matched");

    let mut out = format!("Doctors in {department} for {condition}:\n");
    for d in &doctors {
        let why = if fits(&d.expertise) {
            "expertise matches the condition"
        } else {
            "experienced in the department"
        };
        out.push_str(&format!(
            "\n- [{}] {}, {} ({} years)\n  Expertise: {}\n  Rating: {:.1}/5.0\n  Why: {}\n  Available: {}\n",
            d.id, d.name, d.title, d.experience_years, d.expertise, d.rating, why, d.schedule
        ));
    }
    Ok(out)
}

fn provide_guidance(ctx: &mut ActionContext<'_>) -> Outcome {
    let symptoms = ctx.require("symptoms")?;
    let department = ctx.require("suggested_department")?;
    let doctor = ctx.optional("suggested_doctor");
    let urgency = ctx.or("urgency_level", "routine");
    let urgent = contains_any(urgency, &["urgent", "emergency", "high", "紧急", "急诊", "高"]);

    let mut out = String::from("Visit guidance\n\n");
    if urgent {
        out.push_str("Your situation may need urgent care. Go to the emergency department now.\n\n");
    }
    out.push_str(&format!(
        "For the symptoms you described ({symptoms}):\n1. Department: {department}\n"
    ));
    if let Some(d) = doctor {
        out.push_str(&format!("2. Doctor: {d}\n"));
    }
    out.push_str(
        "3. Bring your ID, a clear description of the symptoms, and any earlier test reports \
         or prescriptions.\n",
    );
    out.push_str(&format!(
        "\nSteps:\n1. Register for {department} at the front desk.\n2. Wait in the indicated area.\n\
         3. Describe your symptoms clearly to the doctor.\n4. Complete any tests the doctor orders.\n\
         5. Bring the results to your follow-up visit.\n"
    ));
    if urgent {
        out.push_str("\nIf things get worse, call emergency services (120).");
    } else {
        out.push_str("\nIf the symptoms worsen, go to the emergency department.");
    }

    ctx.memory.set_stage("guided");
    Ok(out)
}
