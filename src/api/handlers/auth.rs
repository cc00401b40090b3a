use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::dtos::{
    requests::{LoginRequest, TeacherSignupRequest},
    responses::{TeacherCreatedResponse, VerificationRequiredResponse},
};
use crate::domain::models::{
    account::{Account, Role, StudentAccount, TeacherAccount, TeacherProfile, User},
    auth::{AuthResponse, SessionTokens, ACCESS_TTL_MINUTES, REFRESH_TTL_DAYS},
};
use crate::domain::services::password::{hash_password, verify_password};
use std::sync::Arc;
use tower_cookies::{Cookies, Cookie};
use tower_cookies::cookie::SameSite;
use time::Duration;
use tracing::{info, warn};

pub const DEVICE_COOKIE: &str = "device_token";

pub async fn teacher_signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TeacherSignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.passphrase != state.config.teacher_signup_passphrase {
        warn!("Teacher signup rejected for {}: wrong passphrase", payload.username);
        return Err(AppError::Forbidden("登録用パスフレーズが正しくありません".into()));
    }

    let username = payload.username.trim();
    let teacher_name = payload.teacher_name.trim();
    if username.is_empty() || teacher_name.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation("ユーザー名・パスワード・氏名を入力してください".into()));
    }

    if state.account_repo.find_by_username(username).await?.is_some() {
        return Err(AppError::Conflict("このユーザー名は既に使用されています".into()));
    }

    let user = User::new(username.to_string(), hash_password(&payload.password)?, Role::Teacher);
    let profile = TeacherProfile::new(user.id.clone(), teacher_name.to_string());
    state.account_repo.create_teacher(&user, &profile).await?;

    info!("Teacher account created: {}", user.id);

    Ok((StatusCode::CREATED, Json(TeacherCreatedResponse {
        id: user.id,
        username: user.username,
        teacher_name: profile.teacher_name,
    })))
}

/// Checks credentials and role. Unknown users, wrong passwords, other roles
/// and deactivated accounts all look the same to the caller.
async fn check_credentials(state: &AppState, payload: &LoginRequest, role: Role) -> Result<User, AppError> {
    let user = state.account_repo.find_by_username(payload.username.trim()).await?
        .ok_or(AppError::Unauthorized)?;

    verify_password(&payload.password, &user.password_hash)?;

    if user.role() != Some(role) || !user.is_active {
        warn!("Login refused for {} on {} route", user.id, role);
        return Err(AppError::Unauthorized);
    }
    Ok(user)
}

/// Loads the profile that belongs with the user's role.
pub async fn resolve_account(state: &AppState, user: User) -> Result<Account, AppError> {
    match user.role() {
        Some(Role::Teacher) => {
            let profile = state.account_repo.find_teacher_profile(&user.id).await?
                .ok_or(AppError::Unauthorized)?;
            Ok(Account::Teacher(TeacherAccount { user, profile }))
        }
        Some(Role::Student) => {
            let profile = state.student_repo.find_by_user_id(&user.id).await?
                .ok_or(AppError::Unauthorized)?;
            Ok(Account::Student(StudentAccount { user, profile }))
        }
        None => Err(AppError::Unauthorized),
    }
}

async fn complete_login(state: &AppState, cookies: &Cookies, account: Account) -> Result<Response, AppError> {
    let tokens = state.auth_service.start_session(account.user()).await?;
    set_cookies(cookies, &tokens);

    info!("User logged in: {} ({})", account.user().id, account.role());

    Ok(Json(AuthResponse::new(&account, tokens.csrf_token)).into_response())
}

pub async fn teacher_login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let user = check_credentials(&state, &payload, Role::Teacher).await?;
    let account = resolve_account(&state, user).await?;
    complete_login(&state, &cookies, account).await
}

/// Students with a verified address must sign in from a trusted device.
/// An unknown device gets a mailed code and a 202; repeating the login with
/// that code trusts the device and completes the sign-in.
pub async fn student_login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let user = check_credentials(&state, &payload, Role::Student).await?;

    if state.config.require_email_verification
        && user.email_verified
        && let Some(email) = user.email.clone()
    {
        let verification = state.verification();
        let device_token = cookies.get(DEVICE_COOKIE).map(|c| c.value().to_string());

        if !verification.is_trusted(&user.id, device_token.as_deref()).await? {
            let Some(code) = payload.code.as_deref() else {
                verification.send_code(&user.id, &email).await?;
                info!("New device challenge issued for {}", user.id);
                return Ok((
                    StatusCode::ACCEPTED,
                    Json(VerificationRequiredResponse { verification_required: true }),
                ).into_response());
            };

            verification.verify_code(&user.id, code).await?;
            let device = verification.trust_device(&user.id, user_agent(&headers)).await?;
            set_device_cookie(&cookies, &device.device_token);
        }
    }

    let account = resolve_account(&state, user).await?;
    complete_login(&state, &cookies, account).await
}

/// Spends the refresh cookie and issues the next link of its chain.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let raw_token = cookies.get("refresh_token")
        .ok_or(AppError::Unauthorized)?
        .value()
        .to_string();

    let spent = state.auth_service.redeem(&raw_token).await?;
    let user = state.account_repo.find_by_id(&spent.user_id).await?
        .ok_or(AppError::Unauthorized)?;

    let tokens = state.auth_service.continue_session(&spent, &user).await?;
    set_cookies(&cookies, &tokens);

    info!("Token refreshed for user: {}", user.id);

    let account = resolve_account(&state, user).await?;
    Ok(Json(AuthResponse::new(&account, tokens.csrf_token)))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = cookies.get("refresh_token") {
        if let Err(e) = state.auth_service.end_session(cookie.value()).await {
            warn!("Refresh token not revoked on logout: {:?}", e);
        }
    }

    cookies.remove(Cookie::build(("access_token", "")).path("/").into());
    cookies.remove(Cookie::build(("refresh_token", "")).path("/").into());

    info!("User logged out");

    Ok(StatusCode::OK)
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers.get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn set_cookies(cookies: &Cookies, tokens: &SessionTokens) {
    let mut access_c = Cookie::new("access_token", tokens.access_token.clone());
    access_c.set_http_only(true);
    access_c.set_secure(true);
    access_c.set_same_site(SameSite::Strict);
    access_c.set_path("/");
    access_c.set_max_age(Duration::minutes(ACCESS_TTL_MINUTES));
    cookies.add(access_c);

    let mut refresh_c = Cookie::new("refresh_token", tokens.refresh_token.clone());
    refresh_c.set_http_only(true);
    refresh_c.set_secure(true);
    refresh_c.set_same_site(SameSite::Strict);
    refresh_c.set_path("/");
    refresh_c.set_max_age(Duration::days(REFRESH_TTL_DAYS));
    cookies.add(refresh_c);
}

pub fn set_device_cookie(cookies: &Cookies, token: &str) {
    let mut device_c = Cookie::new(DEVICE_COOKIE, token.to_string());
    device_c.set_http_only(true);
    device_c.set_secure(true);
    device_c.set_same_site(SameSite::Lax);
    device_c.set_path("/");
    device_c.set_max_age(Duration::days(90));
    cookies.add(device_c);
}
