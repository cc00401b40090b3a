use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::domain::models::account::User;

pub const COURSE_YEARS: [i32; 3] = [1, 2, 3];

pub fn is_valid_course_year(course_year: i32) -> bool {
    COURSE_YEARS.contains(&course_year)
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct StudentProfile {
    pub id: String,
    pub user_id: String,
    pub student_name: String,
    pub student_number: i64,
    pub cohort_id: Option<String>,
    pub academic_year: i32,
    pub course_year: i32,
    pub created_by_teacher: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to create a student account. The cohort is referenced by
/// name and resolved inside the registering transaction.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub user: User,
    pub student_name: String,
    pub student_number: i64,
    pub cohort_name: String,
    pub academic_year: i32,
    pub course_year: i32,
    pub created_by_teacher: Option<String>,
}

impl NewStudent {
    pub fn into_profile(self, cohort_id: String) -> (User, StudentProfile) {
        let profile = StudentProfile {
            id: Uuid::new_v4().to_string(),
            user_id: self.user.id.clone(),
            student_name: self.student_name,
            student_number: self.student_number,
            cohort_id: Some(cohort_id),
            academic_year: self.academic_year,
            course_year: self.course_year,
            created_by_teacher: self.created_by_teacher,
            created_at: Utc::now(),
        };
        (self.user, profile)
    }
}

/// A student profile joined with its login identity and cohort label.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct StudentRecord {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
    pub student_name: String,
    pub student_number: i64,
    pub cohort_id: Option<String>,
    pub cohort_name: Option<String>,
    pub academic_year: i32,
    pub course_year: i32,
}
