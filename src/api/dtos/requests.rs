use serde::Deserialize;
use crate::domain::services::registration::PasswordResetRow;

#[derive(Deserialize)]
pub struct TeacherSignupRequest {
    pub username: String,
    pub password: String,
    pub teacher_name: String,
    pub passphrase: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Email code answering a new-device challenge.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCohortRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub rows: Vec<PasswordResetRow>,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub student_name: String,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub code: String,
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

#[derive(Deserialize)]
pub struct MonthQuery {
    /// `YYYY-MM`
    pub month: Option<String>,
}
