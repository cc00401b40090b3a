use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, Months, NaiveDate};
use crate::api::dtos::{
    requests::{EmailRequest, MonthQuery, UpdateProfileRequest, VerifyEmailRequest},
    responses::{AttendanceView, MonthAttendanceResponse, ProfileResponse},
};
use crate::api::extractors::auth::{AuthStudent, VerifiedStudent};
use crate::api::handlers::auth::{set_device_cookie, user_agent};
use crate::domain::models::account::StudentAccount;
use crate::error::AppError;
use crate::state::AppState;
use serde_json::json;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::info;

async fn profile_response(state: &AppState, account: &StudentAccount) -> Result<ProfileResponse, AppError> {
    let record = state.student_repo.find_record(&account.profile.id).await?
        .ok_or(AppError::NotFound("学生が見つかりません".into()))?;
    Ok(ProfileResponse {
        id: record.id,
        username: record.username,
        student_name: record.student_name,
        student_number: record.student_number,
        cohort_name: record.cohort_name,
        academic_year: record.academic_year,
        course_year: record.course_year,
        email: account.user.email.clone(),
        email_verified: account.user.email_verified,
    })
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthStudent(account): AuthStudent,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(profile_response(&state, &account).await?))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthStudent(mut account): AuthStudent,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = payload.student_name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("氏名を入力してください".into()));
    }

    account.profile = state.student_repo.update_name(&account.profile.id, name).await?;
    info!("Student {} updated their profile", account.profile.id);

    Ok(Json(profile_response(&state, &account).await?))
}

pub async fn set_email(
    State(state): State<Arc<AppState>>,
    AuthStudent(account): AuthStudent,
    Json(payload): Json<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("有効なメールアドレスを入力してください".into()));
    }

    state.account_repo.set_email(&account.user.id, email).await?;
    state.verification().send_code(&account.user.id, email).await?;

    Ok(Json(json!({ "status": "code_sent" })))
}

pub async fn resend_code(
    State(state): State<Arc<AppState>>,
    AuthStudent(account): AuthStudent,
) -> Result<impl IntoResponse, AppError> {
    let email = account.user.email.as_deref()
        .ok_or(AppError::Validation("メールアドレスが登録されていません".into()))?;

    state.verification().send_code(&account.user.id, email).await?;
    Ok(Json(json!({ "status": "code_sent" })))
}

/// Confirms the address and trusts the device the code was entered on.
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    AuthStudent(account): AuthStudent,
    cookies: Cookies,
    headers: HeaderMap,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    if account.user.email.is_none() {
        return Err(AppError::Validation("メールアドレスが登録されていません".into()));
    }

    let verification = state.verification();
    verification.verify_code(&account.user.id, &payload.code).await?;
    state.account_repo.mark_email_verified(&account.user.id).await?;

    let device = verification.trust_device(&account.user.id, user_agent(&headers)).await?;
    set_device_cookie(&cookies, &device.device_token);

    info!("Email verified for student {}", account.profile.id);
    Ok(Json(json!({ "email_verified": true })))
}

/// First and last day of a `YYYY-MM` month.
pub fn month_bounds(month: &str) -> Result<(NaiveDate, NaiveDate), AppError> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| AppError::Validation("月はYYYY-MM形式で指定してください".into()))?;
    let last = first.checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .ok_or(AppError::Validation("月の指定が範囲外です".into()))?;
    Ok((first, last))
}

pub async fn my_attendance(
    State(state): State<Arc<AppState>>,
    VerifiedStudent(account): VerifiedStudent,
    Query(query): Query<MonthQuery>,
) -> Result<impl IntoResponse, AppError> {
    let month = query.month.unwrap_or_else(|| {
        let today = state.config.today();
        format!("{:04}-{:02}", today.year(), today.month())
    });
    let (start, end) = month_bounds(&month)?;

    let records = state.attendance_repo.list_for_student(&account.profile.id, start, end).await?
        .into_iter()
        .map(AttendanceView::from)
        .collect();

    Ok(Json(MonthAttendanceResponse { month, records }))
}
