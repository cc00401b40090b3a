use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crate::api::dtos::{requests::PasswordResetRequest, responses::StudentStatusResponse};
use crate::api::extractors::{auth::AuthTeacher, filter::FilterContext};
use crate::domain::services::registration::BulkStudentForm;
use crate::error::AppError;
use crate::state::AppState;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn list_students(
    State(state): State<Arc<AppState>>,
    ctx: FilterContext,
) -> Result<impl IntoResponse, AppError> {
    let students = state.student_repo.list(&ctx.filter, false).await?;
    Ok(Json(json!({ "filter": ctx.filter, "students": students })))
}

/// Registers every valid row independently. Answers 422 when nothing was created.
pub async fn bulk_register(
    State(state): State<Arc<AppState>>,
    AuthTeacher(teacher): AuthTeacher,
    Json(form): Json<BulkStudentForm>,
) -> Result<Response, AppError> {
    let rows = form.into_rows()?;
    let submitted = rows.len();
    let report = state.registration().register(&teacher.profile, rows).await;

    info!(
        "Bulk registration by {}: {} rows, {} created, {} warnings, {} errors",
        teacher.profile.id, submitted, report.created.len(), report.warnings.len(), report.errors.len()
    );

    if report.created.is_empty() {
        warn!("Bulk registration created no students");
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "登録できた学生はいません",
                "created": report.created,
                "warnings": report.warnings,
                "errors": report.errors,
                "skipped_blank": report.skipped_blank,
            })),
        ).into_response());
    }

    Ok((StatusCode::CREATED, Json(report)).into_response())
}

pub async fn reset_passwords(
    State(state): State<Arc<AppState>>,
    AuthTeacher(teacher): AuthTeacher,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Response, AppError> {
    if payload.rows.is_empty() {
        return Err(AppError::Validation("再設定する行がありません".into()));
    }

    let report = state.registration().reset_passwords(payload.rows).await;
    info!("Password reset by {}: {} updated, {} rejected", teacher.profile.id, report.updated.len(), report.errors.len());

    let status = if report.updated.is_empty() { StatusCode::UNPROCESSABLE_ENTITY } else { StatusCode::OK };
    Ok((status, Json(report)).into_response())
}

async fn set_active(state: &AppState, id: &str, is_active: bool) -> Result<StudentStatusResponse, AppError> {
    let profile = state.student_repo.find_by_id(id).await?
        .ok_or(AppError::NotFound("学生が見つかりません".into()))?;
    state.account_repo.set_active(&profile.user_id, is_active).await?;
    if !is_active {
        state.auth_service.end_all_sessions(&profile.user_id).await?;
    }
    Ok(StudentStatusResponse { id: profile.id, is_active })
}

/// Soft delete: the account can no longer sign in but every record is kept.
pub async fn expel_student(
    State(state): State<Arc<AppState>>,
    AuthTeacher(teacher): AuthTeacher,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let res = set_active(&state, &id, false).await?;
    info!("Student {} deactivated by {}", id, teacher.profile.id);
    Ok(Json(res))
}

pub async fn restore_student(
    State(state): State<Arc<AppState>>,
    AuthTeacher(teacher): AuthTeacher,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let res = set_active(&state, &id, true).await?;
    info!("Student {} restored by {}", id, teacher.profile.id);
    Ok(Json(res))
}

/// Hard delete. Irreversible.
pub async fn purge_student(
    State(state): State<Arc<AppState>>,
    AuthTeacher(teacher): AuthTeacher,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.student_repo.purge(&id).await?;
    info!("Student {} permanently deleted by {}", id, teacher.profile.id);
    Ok(StatusCode::NO_CONTENT)
}
