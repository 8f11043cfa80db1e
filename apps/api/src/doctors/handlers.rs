//! Axum route handlers for the Doctors API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::doctors::pipeline::{classify_specialty, rank_doctors};
use crate::errors::AppError;
use crate::integrations::ProviderQuery;
use crate::models::clinical::Doctor;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct DoctorSearchParams {
    pub symptoms: Option<String>,
    pub specialty: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub ai_rank: bool,
}

#[derive(Debug, Serialize)]
pub struct DoctorSearchResponse {
    pub specialty: String,
    /// "query" when supplied by the caller, "classified" when derived from symptoms.
    pub specialty_source: &'static str,
    pub ai_ranked: bool,
    pub count: usize,
    pub doctors: Vec<Doctor>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// GET /api/doctors
///
/// Query: `symptoms` and/or `specialty`, optional `city`, `state`, `postal_code`,
/// `limit` (default 10, max 50) and `ai_rank`.
pub async fn handle_search_doctors(
    State(state): State<AppState>,
    Query(params): Query<DoctorSearchParams>,
) -> Result<Json<DoctorSearchResponse>, AppError> {
    let symptoms = non_blank(params.symptoms);

    let (specialty, specialty_source) = match (non_blank(params.specialty), &symptoms) {
        (Some(specialty), _) => (specialty, "query"),
        (None, Some(symptoms)) => (classify_specialty(state.llm(), symptoms).await, "classified"),
        (None, None) => {
            return Err(AppError::Validation(
                "Either symptoms or specialty must be provided".to_string(),
            ))
        }
    };

    let query = ProviderQuery {
        specialty: specialty.clone(),
        city: non_blank(params.city),
        state: non_blank(params.state),
        postal_code: non_blank(params.postal_code),
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    };

    let doctors = match state.providers.search(&query).await {
        Ok(doctors) => doctors,
        Err(e) => {
            warn!("Provider registry lookup failed, returning no doctors: {e}");
            Vec::new()
        }
    };

    let (doctors, ai_ranked) = match (&symptoms, params.ai_rank) {
        (Some(symptoms), true) => rank_doctors(state.llm(), symptoms, doctors).await,
        _ => (doctors, false),
    };

    info!(
        "Doctor search for '{specialty}' returned {} result(s)",
        doctors.len()
    );

    Ok(Json(DoctorSearchResponse {
        specialty,
        specialty_source,
        ai_ranked,
        count: doctors.len(),
        doctors,
    }))
}
