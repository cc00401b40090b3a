use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use crate::api::dtos::requests::CreateCohortRequest;
use crate::api::extractors::auth::AuthTeacher;
use crate::domain::models::cohort::Cohort;
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tracing::info;

pub async fn create_cohort(
    State(state): State<Arc<AppState>>,
    AuthTeacher(teacher): AuthTeacher,
    Json(payload): Json<CreateCohortRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("学科・クラス名を入力してください".into()));
    }
    if state.cohort_repo.find_by_name(name).await?.is_some() {
        return Err(AppError::Conflict(format!("学科・クラス「{}」は既に登録されています", name)));
    }

    let cohort = state.cohort_repo.create(&Cohort::new(name.to_string(), Some(teacher.profile.id.clone()))).await?;
    info!("Class {} registered by teacher {}", cohort.name, teacher.profile.id);

    Ok((StatusCode::CREATED, Json(cohort)))
}

pub async fn list_cohorts(
    State(state): State<Arc<AppState>>,
    _teacher: AuthTeacher,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.cohort_repo.list().await?))
}
