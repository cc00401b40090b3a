use crate::domain::{models::filter::ClassFilter, ports::FilterRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

pub struct SqliteFilterRepo {
    pool: SqlitePool,
}

impl SqliteFilterRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FilterRepository for SqliteFilterRepo {
    async fn load(&self, teacher_id: &str) -> Result<ClassFilter, AppError> {
        let found = sqlx::query_as::<_, ClassFilter>(
            "SELECT academic_year, cohort_id, course_year FROM teacher_filters WHERE teacher_id = ?"
        )
            .bind(teacher_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(found.unwrap_or_default())
    }

    async fn save(&self, teacher_id: &str, filter: &ClassFilter) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO teacher_filters (teacher_id, academic_year, cohort_id, course_year, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(teacher_id) DO UPDATE SET
                 academic_year = excluded.academic_year,
                 cohort_id = excluded.cohort_id,
                 course_year = excluded.course_year,
                 updated_at = excluded.updated_at"#
        )
            .bind(teacher_id)
            .bind(filter.academic_year)
            .bind(&filter.cohort_id)
            .bind(filter.course_year)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
