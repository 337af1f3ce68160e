//! Domain-data directory: departments, doctors and appointment slots.
//!
//! Actions read from a `Directory`. The built-in [`StaticDirectory`] serves a
//! small fixed catalogue; a real deployment would put a hospital information
//! system behind the same trait.

use chrono::{Days, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub expertise: String,
    /// Lower-case symptom keywords used for matching.
    pub symptom_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub title: String,
    pub department_id: String,
    pub expertise: String,
    pub rating: f32,
    pub schedule: String,
    pub experience_years: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    pub slot_id: String,
    pub doctor_id: String,
    pub date: NaiveDate,
    /// `morning` or `afternoon`.
    pub period: String,
    pub time: String,
    pub fee: u32,
}

/// Failure of a directory lookup (as opposed to an empty result).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct DirectoryError(pub String);

pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

pub trait Directory: Send + Sync {
    fn departments(&self) -> DirectoryResult<Vec<Department>>;

    fn doctors(&self) -> DirectoryResult<Vec<Doctor>>;

    fn slots(&self, doctor_id: &str) -> DirectoryResult<Vec<Slot>>;

    /// Departments whose keywords occur in `symptoms`, best match first.
    fn match_departments(
        &self,
        symptoms: &str,
        location: Option<&str>,
    ) -> DirectoryResult<Vec<(Department, u32)>> {
        let text = symptoms.to_lowercase();
        let mut scored: Vec<(Department, u32)> = self
            .departments()?
            .into_iter()
            .filter(|d| {
                location
                    .map(|l| d.location.to_lowercase().contains(&l.to_lowercase()))
                    .unwrap_or(true)
            })
            .filter_map(|d| {
                let hits = d
                    .symptom_keywords
                    .iter()
                    .filter(|k| text.contains(k.as_str()))
                    .count();
                if hits == 0 {
                    return None;
                }
                let score = (hits * 100 / d.symptom_keywords.len().max(1)).min(100) as u32;
                Some((d, score.max(10)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(scored)
    }

    /// Resolve a department by id or case-insensitive name.
    fn find_department(&self, key: &str) -> DirectoryResult<Option<Department>> {
        let key = key.trim().to_lowercase();
        Ok(self
            .departments()?
            .into_iter()
            .find(|d| d.id.to_lowercase() == key || d.name.to_lowercase() == key))
    }

    fn doctors_in(
        &self,
        department: &str,
        gender: Option<&str>,
        seniority: Option<&str>,
    ) -> DirectoryResult<Vec<Doctor>> {
        let Some(dept) = self.find_department(department)? else {
            return Ok(Vec::new());
        };
        Ok(self
            .doctors()?
            .into_iter()
            .filter(|d| d.department_id == dept.id)
            .filter(|d| gender.map(|g| same_gender(&d.gender, g)).unwrap_or(true))
            .filter(|d| {
                seniority
                    .map(|s| d.title.to_lowercase().contains(&s.to_lowercase()))
                    .unwrap_or(true)
            })
            .collect())
    }
}

fn same_gender(actual: &str, wanted: &str) -> bool {
    let a = actual.trim().to_lowercase();
    let w = wanted.trim().to_lowercase();
    match w.as_str() {
        "m" | "male" | "男" => a == "male",
        "f" | "female" | "女" => a == "female",
        _ => a == w,
    }
}

// ---------------------------------------------------------------------------
// StaticDirectory
// ---------------------------------------------------------------------------

pub struct StaticDirectory {
    departments: Vec<Department>,
    doctors: Vec<Doctor>,
    base_date: NaiveDate,
}

impl StaticDirectory {
    /// The built-in catalogue with slots starting the day after today.
    pub fn builtin() -> Self {
        Self::with_base_date(chrono::Local::now().date_naive())
    }

    /// The built-in catalogue with slots on the three days after `base_date`.
    pub fn with_base_date(base_date: NaiveDate) -> Self {
        Self {
            departments: builtin_departments(),
            doctors: builtin_doctors(),
            base_date,
        }
    }
}

impl Directory for StaticDirectory {
    fn departments(&self) -> DirectoryResult<Vec<Department>> {
        Ok(self.departments.clone())
    }

    fn doctors(&self) -> DirectoryResult<Vec<Doctor>> {
        Ok(self.doctors.clone())
    }

    fn slots(&self, doctor_id: &str) -> DirectoryResult<Vec<Slot>> {
        let Some(doctor) = self.doctors.iter().find(|d| d.id == doctor_id) else {
            return Ok(Vec::new());
        };
        let fee = if doctor.title.contains("Chief") { 50 } else { 30 };
        let mut slots = Vec::new();
        for offset in 1..=3u64 {
            let Some(date) = self.base_date.checked_add_days(Days::new(offset)) else {
                continue;
            };
            for (period, time) in [("morning", "09:00-11:30"), ("afternoon", "14:00-16:30")] {
                slots.push(Slot {
                    slot_id: format!("{}-{}-{}", doctor.id, date.format("%Y%m%d"), period),
                    doctor_id: doctor.id.clone(),
                    date,
                    period: period.to_string(),
                    time: time.to_string(),
                    fee,
                });
            }
        }
        Ok(slots)
    }
}

fn dept(
    id: &str,
    name: &str,
    description: &str,
    location: &str,
    expertise: &str,
    keywords: &[&str],
) -> Department {
    Department {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        location: location.into(),
        expertise: expertise.into(),
        symptom_keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn builtin_departments() -> Vec<Department> {
    vec![
        dept(
            "neuro",
            "Neurology",
            "Disorders of the brain and nervous system",
            "Building A, Floor 3",
            "Headache, dizziness, epilepsy, stroke follow-up",
            &["headache", "dizz", "numb", "seizure", "头痛", "头晕", "神经"],
        ),
        dept(
            "gastro",
            "Gastroenterology",
            "Digestive system conditions",
            "Building A, Floor 4",
            "Gastritis, ulcers, reflux, bowel disorders",
            &["stomach", "abdominal", "nausea", "diarrhea", "胃", "腹痛", "消化"],
        ),
        dept(
            "resp",
            "Respiratory Medicine",
            "Lung and airway conditions",
            "Building B, Floor 2",
            "Cough, asthma, pneumonia, chronic bronchitis",
            &["cough", "breath", "wheez", "lung", "咳嗽", "呼吸", "肺"],
        ),
        dept(
            "derm",
            "Dermatology",
            "Skin, hair and nail conditions",
            "Building C, Floor 1",
            "Eczema, rashes, acne, allergic skin reactions",
            &["skin", "rash", "itch", "acne", "皮肤", "痒", "疹"],
        ),
        dept(
            "cardio",
            "Cardiology",
            "Heart and circulation",
            "Building B, Floor 5",
            "Chest pain, hypertension, arrhythmia",
            &["chest", "heart", "palpitation", "blood pressure", "胸痛", "心脏", "心悸"],
        ),
        dept(
            "internal",
            "Internal Medicine",
            "General adult medicine and first assessment",
            "Building A, Floor 1",
            "Fever, fatigue, general check-ups",
            &["fever", "fatigue", "tired", "发烧", "发热", "乏力"],
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn doc(
    id: &str,
    name: &str,
    gender: &str,
    title: &str,
    department_id: &str,
    expertise: &str,
    rating: f32,
    schedule: &str,
    experience_years: u32,
) -> Doctor {
    Doctor {
        id: id.into(),
        name: name.into(),
        gender: gender.into(),
        title: title.into(),
        department_id: department_id.into(),
        expertise: expertise.into(),
        rating,
        schedule: schedule.into(),
        experience_years,
    }
}

fn builtin_doctors() -> Vec<Doctor> {
    vec![
        doc("D001", "Dr. Wang Li", "male", "Chief Physician", "neuro", "Migraine and headache disorders", 4.8, "Mon, Wed, Fri mornings", 22),
        doc("D002", "Dr. Chen Jing", "female", "Associate Chief Physician", "neuro", "Vertigo and sleep disorders", 4.6, "Tue, Thu afternoons", 14),
        doc("D003", "Dr. Zhang Wei", "male", "Attending Physician", "gastro", "Gastritis and reflux", 4.5, "Mon-Fri mornings", 9),
        doc("D004", "Dr. Liu Fang", "female", "Chief Physician", "gastro", "Inflammatory bowel disease", 4.9, "Wed, Sat mornings", 25),
        doc("D005", "Dr. Zhao Min", "female", "Associate Chief Physician", "resp", "Asthma and chronic cough", 4.7, "Mon, Thu afternoons", 16),
        doc("D006", "Dr. Sun Hao", "male", "Attending Physician", "derm", "Eczema and allergic rashes", 4.4, "Tue, Fri mornings", 8),
        doc("D007", "Dr. Zhou Yan", "female", "Chief Physician", "cardio", "Hypertension and arrhythmia", 4.9, "Mon, Wed afternoons", 27),
        doc("D008", "Dr. Wu Gang", "male", "Attending Physician", "internal", "General assessment and fever", 4.3, "Daily mornings", 7),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StaticDirectory {
        StaticDirectory::with_base_date(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
    }

    #[test]
    fn matches_departments_by_keyword() {
        let matches = directory()
            .match_departments("Bad headache and some dizziness", None)
            .unwrap();
        assert_eq!(matches[0].0.id, "neuro");
    }

    #[test]
    fn matches_chinese_keywords() {
        let matches = directory().match_departments("最近一直咳嗽", None).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0.id, "resp");
    }

    #[test]
    fn location_filter_excludes_other_buildings() {
        let matches = directory()
            .match_departments("headache", Some("Building C"))
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn doctors_filtered_by_gender_and_title() {
        let d = directory();
        let all = d.doctors_in("Neurology", None, None).unwrap();
        assert_eq!(all.len(), 2);
        let female = d.doctors_in("neuro", Some("F"), None).unwrap();
        assert_eq!(female.len(), 1);
        assert_eq!(female[0].id, "D002");
        let chief = d.doctors_in("neurology", None, Some("chief physician")).unwrap();
        assert_eq!(chief.len(), 2, "associate chief also contains 'chief physician'");
    }

    #[test]
    fn unknown_department_has_no_doctors() {
        assert!(directory().doctors_in("Astrology", None, None).unwrap().is_empty());
    }

    #[test]
    fn slots_cover_three_days_after_base_date() {
        let slots = directory().slots("D001").unwrap();
        assert_eq!(slots.len(), 6);
        assert_eq!(slots[0].date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(slots[0].slot_id, "D001-20260302-morning");
        assert_eq!(slots[0].fee, 50);
    }

    #[test]
    fn unknown_doctor_has_no_slots() {
        assert!(directory().slots("D999").unwrap().is_empty());
    }
}
