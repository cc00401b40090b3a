use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The teacher's current class-browsing selection. Persisted per teacher and
/// passed explicitly to every query that honours it.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, Default, PartialEq, Eq)]
pub struct ClassFilter {
    pub academic_year: Option<i32>,
    pub cohort_id: Option<String>,
    pub course_year: Option<i32>,
}
