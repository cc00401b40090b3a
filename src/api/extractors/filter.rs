use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use crate::api::extractors::auth::AuthTeacher;
use crate::domain::models::{account::TeacherAccount, filter::ClassFilter};
use crate::error::AppError;
use crate::state::AppState;

pub const UNKNOWN_COHORT: &str = "指定された学科・クラスは存在しません";

/// The signed-in teacher together with their class filter for this request.
///
/// The stored filter is overlaid with any `academic_year`, `cohort_id` or
/// `course_year` query parameters. An empty value clears that field and
/// `reset=true` clears all of them. A newly selected cohort must exist.
/// Changes are saved before the handler runs.
pub struct FilterContext {
    pub teacher: TeacherAccount,
    pub filter: ClassFilter,
}

fn parse_year(key: &str, raw: &str) -> Result<Option<i32>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| AppError::Validation(format!("{} は数字で指定してください", key)))
}

/// Applies query overrides to `current`. Returns the resulting filter.
pub fn apply_overrides(current: &ClassFilter, params: &HashMap<String, String>) -> Result<ClassFilter, AppError> {
    if params.get("reset").is_some_and(|v| v == "true") {
        return Ok(ClassFilter::default());
    }

    let mut next = current.clone();
    if let Some(raw) = params.get("academic_year") {
        next.academic_year = parse_year("academic_year", raw)?;
    }
    if let Some(raw) = params.get("cohort_id") {
        let raw = raw.trim();
        next.cohort_id = (!raw.is_empty()).then(|| raw.to_string());
    }
    if let Some(raw) = params.get("course_year") {
        next.course_year = parse_year("course_year", raw)?;
    }
    Ok(next)
}

impl FromRequestParts<Arc<AppState>> for FilterContext {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let AuthTeacher(teacher) = AuthTeacher::from_request_parts(parts, state).await
            .map_err(IntoResponse::into_response)?;

        let Query(params) = Query::<HashMap<String, String>>::from_request_parts(parts, state).await
            .map_err(IntoResponse::into_response)?;

        let stored = state.filter_repo.load(&teacher.profile.id).await
            .map_err(IntoResponse::into_response)?;
        let filter = apply_overrides(&stored, &params)
            .map_err(IntoResponse::into_response)?;

        if let Some(cohort_id) = filter.cohort_id.as_deref()
            && filter.cohort_id != stored.cohort_id
        {
            state.cohort_repo.find_by_id(cohort_id).await
                .map_err(IntoResponse::into_response)?
                .ok_or_else(|| AppError::NotFound(UNKNOWN_COHORT.into()).into_response())?;
        }

        if filter != stored {
            state.filter_repo.save(&teacher.profile.id, &filter).await
                .map_err(IntoResponse::into_response)?;
            debug!("Class filter updated for teacher {}: {:?}", teacher.profile.id, filter);
        }

        Ok(FilterContext { teacher, filter })
    }
}
