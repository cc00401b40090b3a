use crate::domain::{models::filter::ClassFilter, ports::FilterRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

pub struct PostgresFilterRepo {
    pool: PgPool,
}

impl PostgresFilterRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FilterRepository for PostgresFilterRepo {
    async fn load(&self, teacher_id: &str) -> Result<ClassFilter, AppError> {
        let found = sqlx::query_as::<_, ClassFilter>(
            "SELECT academic_year, cohort_id, course_year FROM teacher_filters WHERE teacher_id = $1"
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
               VALUES ($1, $2, $3, $4, $5)
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
