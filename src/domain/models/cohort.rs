use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A department or class that students are registered into.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Cohort {
    pub id: String,
    pub name: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Cohort {
    pub fn new(name: String, created_by: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            created_by,
            created_at: Utc::now(),
        }
    }
}
