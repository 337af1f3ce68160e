use axum::extract::{Query, State};
use axum::Json;
use careflow_core::directory::{Department, Doctor};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/departments
pub async fn list_departments(
    State(app): State<AppState>,
) -> Result<Json<Vec<Department>>, AppError> {
    let departments = app.orchestrator.dispatcher().directory().departments()?;
    Ok(Json(departments))
}

#[derive(Debug, Deserialize)]
pub struct DoctorQuery {
    pub department_id: Option<String>,
}

/// GET /api/doctors, optionally narrowed with `?department_id=`.
pub async fn list_doctors(
    State(app): State<AppState>,
    Query(query): Query<DoctorQuery>,
) -> Result<Json<Vec<Doctor>>, AppError> {
    let mut doctors = app.orchestrator.dispatcher().directory().doctors()?;
    if let Some(dept) = query.department_id.as_deref().filter(|d| !d.is_empty()) {
        doctors.retain(|d| d.department_id == dept);
    }
    Ok(Json(doctors))
}

/// GET /api/symptoms: every symptom keyword the departments know, sorted.
pub async fn list_symptoms(State(app): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let mut symptoms: Vec<String> = app
        .orchestrator
        .dispatcher()
        .directory()
        .departments()?
        .into_iter()
        .flat_map(|d| d.symptom_keywords)
        .collect();
    symptoms.sort();
    symptoms.dedup();
    Ok(Json(symptoms))
}

#[derive(Debug, Deserialize)]
pub struct MatchBody {
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DepartmentMatch {
    pub department: Department,
    pub score: u32,
}

/// POST /api/departments/match: rank departments by symptom keyword overlap.
pub async fn match_departments(
    State(app): State<AppState>,
    Json(body): Json<MatchBody>,
) -> Result<Json<Vec<DepartmentMatch>>, AppError> {
    if body.symptoms.iter().all(|s| s.trim().is_empty()) {
        return Err(AppError::bad_request("symptoms list is required"));
    }
    let text = body.symptoms.join(" ");
    let matches = app
        .orchestrator
        .dispatcher()
        .directory()
        .match_departments(&text, body.location.as_deref())?
        .into_iter()
        .map(|(department, score)| DepartmentMatch { department, score })
        .collect();
    Ok(Json(matches))
}
