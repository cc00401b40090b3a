use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use crate::api::dtos::{
    requests::DateQuery,
    responses::{
        AttendanceLogResponse, AttendanceView, ClassListEntry, ClassListResponse,
        CommittedStageResponse, ConfirmStageResponse, EntryStageResponse, LogEntry, StatusChoice,
    },
};
use crate::api::extractors::{
    auth::{AuthTeacher, VerifiedStudent},
    filter::FilterContext,
};
use crate::domain::services::attendance_workflow::{
    format_form_date, parse_form_date, AttendanceForm, Stage, WorkflowOutcome,
};
use crate::error::AppError;
use crate::state::AppState;

/// Parses an optional date parameter, defaulting to today at the school.
fn date_or_today(state: &AppState, raw: Option<&str>) -> Result<NaiveDate, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_form_date(raw),
        None => Ok(state.config.today()),
    }
}

/// `/calendar?date=...` with the original date string carried through.
pub fn calendar_location(date: &str) -> Result<String, AppError> {
    let url = reqwest::Url::parse_with_params("http://localhost/calendar", &[("date", date)])
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to build calendar url: {}", e)))?;
    Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
}

pub async fn attendance_form(
    State(state): State<Arc<AppState>>,
    VerifiedStudent(account): VerifiedStudent,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = date_or_today(&state, query.date.as_deref())?;
    let current = state.attendance_repo.find(&account.profile.id, date).await?;

    Ok(Json(EntryStageResponse {
        stage: Stage::Entry,
        date,
        date_label: format_form_date(date),
        statuses: StatusChoice::all(),
        current: current.map(AttendanceView::from),
    }))
}

pub async fn submit_attendance_form(
    State(state): State<Arc<AppState>>,
    VerifiedStudent(account): VerifiedStudent,
    Json(form): Json<AttendanceForm>,
) -> Result<Response, AppError> {
    let outcome = state.workflow().step(&account.profile, &form).await?;

    let response = match outcome {
        WorkflowOutcome::Confirm(preview) => Json(ConfirmStageResponse {
            stage: Stage::Confirm,
            preview,
        }).into_response(),
        WorkflowOutcome::Committed(saved) => Json(CommittedStageResponse {
            stage: Stage::Committed,
            attendance: AttendanceView::from(saved),
        }).into_response(),
        WorkflowOutcome::Back { date } => (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, calendar_location(&date)?)],
        ).into_response(),
    };
    Ok(response)
}

pub async fn class_list(
    State(state): State<Arc<AppState>>,
    ctx: FilterContext,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = date_or_today(&state, query.date.as_deref())?;
    let students = state.student_repo.list(&ctx.filter, false).await?;
    let ledger = state.attendance_repo.list_for_date(date).await?;
    let by_student: HashMap<&str, _> = ledger.iter().map(|a| (a.student_id.as_str(), a)).collect();

    let students = students.into_iter()
        .map(|s| {
            let row = by_student.get(s.id.as_str()).copied();
            ClassListEntry::new(s, row)
        })
        .collect();

    Ok(Json(ClassListResponse { students, date }))
}

pub async fn attendance_log(
    State(state): State<Arc<AppState>>,
    _teacher: AuthTeacher,
    Path(id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = date_or_today(&state, query.date.as_deref())?;
    state.student_repo.find_by_id(&id).await?
        .ok_or(AppError::NotFound("学生が見つかりません".into()))?;

    let logs = state.attendance_repo.history(&id, date).await?
        .into_iter()
        .map(LogEntry::from)
        .collect();

    Ok(Json(AttendanceLogResponse { student_id: id, date, logs }))
}

/// Marks a submission as seen by a teacher.
pub async fn check_attendance(
    State(state): State<Arc<AppState>>,
    AuthTeacher(teacher): AuthTeacher,
    Path((id, date)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let date = parse_form_date(&date)?;
    let updated = state.attendance_repo.mark_checked(&id, date).await?;
    info!("Attendance of {} on {} checked by {}", id, date, teacher.profile.id);
    Ok(Json(AttendanceView::from(updated)))
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    ctx: FilterContext,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = date_or_today(&state, query.date.as_deref())?;
    let summary = state.summary().for_date(date, &ctx.filter).await?;
    Ok(Json(summary))
}
