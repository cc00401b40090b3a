pub mod sqlite_account_repo;
pub mod sqlite_attendance_repo;
pub mod sqlite_auth_repo;
pub mod sqlite_cohort_repo;
pub mod sqlite_filter_repo;
pub mod sqlite_student_repo;
pub mod sqlite_verification_repo;

pub mod postgres_account_repo;
pub mod postgres_attendance_repo;
pub mod postgres_auth_repo;
pub mod postgres_cohort_repo;
pub mod postgres_filter_repo;
pub mod postgres_student_repo;
pub mod postgres_verification_repo;
