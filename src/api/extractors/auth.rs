use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use crate::state::AppState;
use crate::domain::models::account::{Role, StudentAccount, TeacherAccount, User};
use crate::error::{AppError, INTERNAL_MESSAGE};
use serde_json::json;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{error, Span};

pub const EMAIL_SETUP_PATH: &str = "/student/email";

/// Why an authenticated route refused the request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not signed in, wrong role, or deactivated: send the browser to the login page.
    LoginRedirect(Role),
    /// Student has not confirmed an email address yet.
    EmailUnverified,
    CsrfMismatch,
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::LoginRedirect(role) => {
                (StatusCode::SEE_OTHER, [(header::LOCATION, role.login_path())]).into_response()
            }
            AuthRejection::EmailUnverified => {
                (StatusCode::SEE_OTHER, [(header::LOCATION, EMAIL_SETUP_PATH)]).into_response()
            }
            AuthRejection::CsrfMismatch => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": "CSRFトークンが正しくありません" }))).into_response()
            }
            AuthRejection::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": INTERNAL_MESSAGE }))).into_response()
            }
        }
    }
}

fn internal(e: AppError) -> AuthRejection {
    error!("Authentication lookup failed: {:?}", e);
    AuthRejection::Internal
}

/// Validates the access cookie and CSRF header, then loads the live user.
/// Tokens for another role and deactivated accounts are treated as signed out.
async fn authenticate(parts: &Parts, state: &AppState, role: Role) -> Result<User, AuthRejection> {
    let cookies = parts.extensions.get::<Cookies>()
        .ok_or(AuthRejection::Internal)?;

    let access_token = cookies.get("access_token")
        .ok_or(AuthRejection::LoginRedirect(role))?
        .value()
        .to_string();

    let claims = state.auth_service.verify_access(&access_token)
        .ok()
        .filter(|c| c.grants(role))
        .ok_or(AuthRejection::LoginRedirect(role))?;

    let method = &parts.method;
    if method != Method::GET && method != Method::HEAD && method != Method::OPTIONS {
        let csrf_header_val = parts.headers.get("X-CSRF-Token")
            .ok_or(AuthRejection::CsrfMismatch)?
            .to_str()
            .map_err(|_| AuthRejection::CsrfMismatch)?;

        if csrf_header_val != claims.csrf_token {
            return Err(AuthRejection::CsrfMismatch);
        }
    }

    let user = state.account_repo.find_by_id(&claims.sub).await
        .map_err(internal)?
        .filter(|u| u.is_active && u.role() == Some(role))
        .ok_or(AuthRejection::LoginRedirect(role))?;

    Span::current().record("user_id", user.id.as_str());
    Span::current().record("role", role.as_str());

    Ok(user)
}

pub struct AuthTeacher(pub TeacherAccount);

impl FromRequestParts<Arc<AppState>> for AuthTeacher {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state, Role::Teacher).await?;
        let profile = state.account_repo.find_teacher_profile(&user.id).await
            .map_err(internal)?
            .ok_or(AuthRejection::LoginRedirect(Role::Teacher))?;

        Ok(AuthTeacher(TeacherAccount { user, profile }))
    }
}

pub struct AuthStudent(pub StudentAccount);

impl FromRequestParts<Arc<AppState>> for AuthStudent {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state, Role::Student).await?;
        let profile = state.student_repo.find_by_user_id(&user.id).await
            .map_err(internal)?
            .ok_or(AuthRejection::LoginRedirect(Role::Student))?;

        Ok(AuthStudent(StudentAccount { user, profile }))
    }
}

/// A student who may use attendance routes: signed in and, when the
/// deployment requires it, holding a verified email address.
pub struct VerifiedStudent(pub StudentAccount);

impl FromRequestParts<Arc<AppState>> for VerifiedStudent {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let AuthStudent(account) = AuthStudent::from_request_parts(parts, state).await?;

        if state.config.require_email_verification && !account.user.email_verified {
            return Err(AuthRejection::EmailUnverified);
        }

        Ok(VerifiedStudent(account))
    }
}
