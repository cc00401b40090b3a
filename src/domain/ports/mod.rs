use crate::domain::models::{
    account::{TeacherProfile, User},
    attendance::{Attendance, AttendanceLog, AttendanceSubmission},
    auth::RefreshTokenRecord,
    cohort::Cohort,
    filter::ClassFilter,
    student::{NewStudent, StudentProfile, StudentRecord},
    verification::{EmailVerificationCode, TrustedDevice},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Creates the login identity and the teacher profile atomically.
    async fn create_teacher(&self, user: &User, profile: &TeacherProfile) -> Result<(), AppError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_teacher_profile(&self, user_id: &str) -> Result<Option<TeacherProfile>, AppError>;
    async fn set_active(&self, user_id: &str, is_active: bool) -> Result<(), AppError>;
    async fn set_password(&self, user_id: &str, password_hash: &str) -> Result<(), AppError>;
    /// Stores a new address and clears the verified flag.
    async fn set_email(&self, user_id: &str, email: &str) -> Result<(), AppError>;
    async fn mark_email_verified(&self, user_id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn store_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;
    /// Deletes and returns the record, so a token can be spent only once.
    async fn take_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError>;
    async fn revoke_family(&self, family_id: Uuid) -> Result<(), AppError>;
    async fn revoke_user(&self, user_id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait CohortRepository: Send + Sync {
    async fn create(&self, cohort: &Cohort) -> Result<Cohort, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Cohort>, AppError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Cohort>, AppError>;
    async fn list(&self) -> Result<Vec<Cohort>, AppError>;
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Creates user and profile in one transaction. Fails with `NotFound` and
    /// leaves nothing behind when the cohort name does not exist.
    async fn register(&self, student: &NewStudent) -> Result<StudentProfile, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<StudentProfile>, AppError>;
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<StudentProfile>, AppError>;
    async fn find_record(&self, id: &str) -> Result<Option<StudentRecord>, AppError>;
    /// The active student currently holding `student_number`, if any.
    async fn find_active_by_number(&self, student_number: i64) -> Result<Option<StudentRecord>, AppError>;
    async fn list(&self, filter: &ClassFilter, active_only: bool) -> Result<Vec<StudentRecord>, AppError>;
    async fn update_name(&self, id: &str, student_name: &str) -> Result<StudentProfile, AppError>;
    /// Removes the student, its login identity and all attendance rows.
    async fn purge(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Upserts the ledger row for (student, date) and appends a log row, atomically.
    async fn record(&self, submission: &AttendanceSubmission) -> Result<Attendance, AppError>;
    async fn find(&self, student_id: &str, date: NaiveDate) -> Result<Option<Attendance>, AppError>;
    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<Attendance>, AppError>;
    async fn list_for_student(&self, student_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Attendance>, AppError>;
    /// Log rows for (student, date), oldest first.
    async fn history(&self, student_id: &str, date: NaiveDate) -> Result<Vec<AttendanceLog>, AppError>;
    async fn mark_checked(&self, student_id: &str, date: NaiveDate) -> Result<Attendance, AppError>;
}

#[async_trait]
pub trait VerificationRepository: Send + Sync {
    async fn create_code(&self, code: &EmailVerificationCode) -> Result<(), AppError>;
    /// Newest unused code for the user matching `code`.
    async fn find_unused_code(&self, user_id: &str, code: &str) -> Result<Option<EmailVerificationCode>, AppError>;
    async fn mark_code_used(&self, id: &str) -> Result<(), AppError>;
    async fn create_device(&self, device: &TrustedDevice) -> Result<(), AppError>;
    async fn find_device(&self, user_id: &str, device_token: &str) -> Result<Option<TrustedDevice>, AppError>;
}

#[async_trait]
pub trait FilterRepository: Send + Sync {
    async fn load(&self, teacher_id: &str) -> Result<ClassFilter, AppError>;
    async fn save(&self, teacher_id: &str, filter: &ClassFilter) -> Result<(), AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError>;
}
