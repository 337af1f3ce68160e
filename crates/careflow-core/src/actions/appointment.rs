use chrono::NaiveDate;
use uuid::Uuid;

use super::{backend, contains_any, invalid, optional, required};
use crate::error::Result;
use crate::registry::{ActionContext, ActionDescriptor, ActionError, ActionRegistry, FnAction};

type Outcome = std::result::Result<String, ActionError>;

pub(super) const BRIEF: &[&str] = &[
    "Collect the patient's name, gender, age and contact details.",
    "Understand the symptoms and recommend a suitable department.",
    "Recommend a doctor, offer available slots, and confirm the booking.",
];

pub(super) fn register(registry: &mut ActionRegistry) -> Result<()> {
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "CollectUserInfo",
            description: "record the patient's basic details",
            params: vec![
                required("name", "patient name"),
                required("gender", "patient gender"),
                required("age", "age in years"),
                required("contact", "phone number or email"),
            ],
        },
        collect_user_info,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "AnalyzeSymptoms",
            description: "analyze described symptoms ahead of a department recommendation",
            params: vec![
                required("symptoms", "symptoms in the patient's words"),
                optional("duration", "how long the symptoms have lasted"),
                optional("severity", "how severe the symptoms are"),
            ],
        },
        analyze_symptoms,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "RecommendDepartment",
            description: "recommend departments matching the symptoms",
            params: vec![
                required("symptoms", "symptoms in the patient's words"),
                optional("prefer_location", "preferred building or campus"),
            ],
        },
        recommend_department,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "RecommendDoctor",
            description: "recommend doctors in a department",
            params: vec![
                required("department", "department name or id"),
                optional("prefer_gender", "preferred doctor gender"),
                optional("prefer_seniority", "preferred title, e.g. Chief Physician"),
            ],
        },
        recommend_doctor,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "ScheduleAppointment",
            description: "list available slots for a doctor",
            params: vec![
                required("doctor_id", "doctor id, e.g. D001"),
                optional("prefer_date", "YYYY-MM-DD"),
                optional("prefer_time", "morning or afternoon"),
            ],
        },
        schedule_appointment,
    ))?;
    registry.register(FnAction::new(
        ActionDescriptor {
            name: "ConfirmAppointment",
            description: "confirm a booking for an offered slot",
            params: vec![
                required("slot_id", "slot id from ScheduleAppointment"),
                required("patient_name", "patient name"),
                required("patient_id", "national id or patient number"),
                required("contact", "phone number or email"),
            ],
        },
        confirm_appointment,
    ))?;
    Ok(())
}

fn collect_user_info(ctx: &mut ActionContext<'_>) -> Outcome {
    let name = ctx.require("name")?;
    let gender = ctx.require("gender")?;
    let age = ctx.require("age")?;
    let contact = ctx.require("contact")?;

    match age.parse::<u32>() {
        Ok(a) if a <= 150 => {}
        _ => return Err(invalid("age", format!("'{age}' is not an age in years"))),
    }

    ctx.memory.remember("name", name);
    ctx.memory.remember("gender", gender);
    ctx.memory.remember("age", age);
    ctx.memory.remember("contact", contact);
    ctx.memory.set_stage("user_info_collected");

    Ok(format!(
        "Collected patient details: name={name}, gender={gender}, age={age}, contact={contact}"
    ))
}

fn analyze_symptoms(ctx: &mut ActionContext<'_>) -> Outcome {
    let symptoms = ctx.require("symptoms")?;
    let duration = ctx.or("duration", "unknown");
    let severity = ctx.or("severity", "unknown");

    let matches = ctx
        .directory
        .match_departments(symptoms, None)
        .map_err(backend)?;

    let mut out = String::from("Symptom analysis. Possibly related departments:");
    if matches.is_empty() {
        out.push_str("\n- Internal Medicine: start with an initial assessment");
    }
    for (dept, _) in &matches {
        out.push_str(&format!("\n- {}: {}", dept.name, dept.description));
    }
    out.push_str(&format!("\n\nDuration: {duration}\nSeverity: {severity}"));
    if contains_any(duration, &["week", "month", "year", "chronic", "周", "月", "年", "慢性"]) {
        out.push_str("\nThe symptoms have lasted a while; please see a doctor soon.");
    }
    if contains_any(severity, &["severe", "intense", "unbearable", "严重", "剧烈", "难忍"]) {
        out.push_str("\nThe symptoms are severe; consider emergency care.");
    }

    ctx.memory.remember("symptoms", symptoms);
    ctx.memory.set_stage("symptoms_analyzed");
    Ok(out)
}

fn recommend_department(ctx: &mut ActionContext<'_>) -> Outcome {
    let symptoms = ctx.require("symptoms")?;
    let location = ctx.optional("prefer_location");

    let matches = ctx
        .directory
        .match_departments(symptoms, location)
        .map_err(backend)?;

    let Some((best, _)) = matches.first() else {
        return Ok(
            "No matching department found. Start with Internal Medicine for an initial assessment."
                .to_string(),
        );
    };
    ctx.memory.remember("department", best.name.as_str());
    ctx.memory.set_stage("department_recommended");

    let mut out = String::from("Recommended departments for these symptoms:\n");
    for (dept, score) in &matches {
        out.push_str(&format!(
            "\n- {} ({}% match): {}\n  Location: {}\n  Expertise: {}\n",
            dept.name, score, dept.description, dept.location, dept.expertise
        ));
    }
    Ok(out)
}

fn recommend_doctor(ctx: &mut ActionContext<'_>) -> Outcome {
    let department = ctx.require("department")?;
    let gender = ctx.optional("prefer_gender");
    let seniority = ctx.optional("prefer_seniority");

    let doctors = ctx
        .directory
        .doctors_in(department, gender, seniority)
        .map_err(backend)?;
    if doctors.is_empty() {
        return Ok(format!("No matching doctors found in {department}."));
    }

    ctx.memory.remember("department", department);
    ctx.memory.set_stage("doctor_recommended");

    let mut out = format!("Recommended doctors in {department}:\n");
    for d in &doctors {
        out.push_str(&format!(
            "\n- [{}] {} ({}), {}\n  Expertise: {}\n  Rating: {:.1}/5.0\n  Clinic hours: {}\n",
            d.id, d.name, d.gender, d.title, d.expertise, d.rating, d.schedule
        ));
    }
    Ok(out)
}

fn schedule_appointment(ctx: &mut ActionContext<'_>) -> Outcome {
    let doctor_id = ctx.require("doctor_id")?;
    let date = ctx
        .optional("prefer_date")
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| invalid("prefer_date", format!("'{d}' is not a YYYY-MM-DD date")))
        })
        .transpose()?;
    let period = ctx
        .optional("prefer_time")
        .map(|t| match t.trim().to_lowercase().as_str() {
            "morning" | "am" | "上午" => Ok("morning"),
            "afternoon" | "pm" | "下午" => Ok("afternoon"),
            _ => Err(invalid("prefer_time", format!("'{t}' is not morning or afternoon"))),
        })
        .transpose()?;

    let doctors = ctx.directory.doctors().map_err(backend)?;
    let Some(doctor) = doctors.iter().find(|d| d.id == doctor_id) else {
        return Err(invalid("doctor_id", format!("no doctor with id {doctor_id}")));
    };
    let department = ctx
        .directory
        .find_department(&doctor.department_id)
        .map_err(backend)?;
    let slots: Vec<_> = ctx
        .directory
        .slots(doctor_id)
        .map_err(backend)?
        .into_iter()
        .filter(|s| date.map(|d| s.date == d).unwrap_or(true))
        .filter(|s| period.map(|p| s.period == p).unwrap_or(true))
        .collect();
    if slots.is_empty() {
        return Ok(format!("No available slots for {} match that preference.", doctor.name));
    }

    ctx.memory.remember("doctor_id", doctor_id);
    ctx.memory.set_stage("slots_offered");

    let (dept_name, location) = department
        .map(|d| (d.name, d.location))
        .unwrap_or_else(|| ("unknown".into(), "unknown".into()));
    let mut out = String::from("Available slots:\n");
    for s in &slots {
        out.push_str(&format!(
            "\n- {} {} ({})\n  Doctor: {}\n  Department: {}\n  Location: {}\n  Fee: {} CNY\n  Slot id: {}\n",
            s.date, s.time, s.period, doctor.name, dept_name, location, s.fee, s.slot_id
        ));
    }
    out.push_str("\nPick a slot and confirm it with its slot id.");
    Ok(out)
}

fn confirm_appointment(ctx: &mut ActionContext<'_>) -> Outcome {
    let slot_id = ctx.require("slot_id")?;
    let patient_name = ctx.require("patient_name")?;
    let patient_id = ctx.require("patient_id")?;
    let contact = ctx.require("contact")?;

    let id_chars: Vec<char> = patient_id.chars().collect();
    if id_chars.len() < 10 {
        return Err(invalid("patient_id", "must be at least 10 characters"));
    }
    let Some((doctor_id, _)) = slot_id.split_once('-') else {
        return Err(invalid("slot_id", format!("'{slot_id}' is not a slot id")));
    };
    let offered = ctx
        .directory
        .slots(doctor_id)
        .map_err(backend)?
        .into_iter()
        .any(|s| s.slot_id == slot_id);
    if !offered {
        return Err(invalid("slot_id", format!("slot {slot_id} is not available")));
    }

    let simple = Uuid::new_v4().simple().to_string().to_uppercase();
    let appointment_id = format!("APT{}", &simple[..8]);
    let head: String = id_chars[..6].iter().collect();
    let tail: String = id_chars[id_chars.len() - 4..].iter().collect();

    ctx.memory.remember("appointment_id", appointment_id.as_str());
    ctx.memory.remember("slot_id", slot_id);
    ctx.memory.set_stage("confirmed");

    Ok(format!(
        "Appointment confirmed.\n\nAppointment number: {appointment_id}\nPatient: {patient_name}\n\
         ID: {head}****{tail}\nContact: {contact}\nSlot: {slot_id}\n\n\
         Please arrive 30 minutes early with your ID and appointment number. \
         Cancellations need 24 hours' notice."
    ))
}
