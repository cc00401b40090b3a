use crate::domain::{models::cohort::Cohort, ports::CohortRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteCohortRepo {
    pool: SqlitePool,
}

impl SqliteCohortRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CohortRepository for SqliteCohortRepo {
    async fn create(&self, cohort: &Cohort) -> Result<Cohort, AppError> {
        sqlx::query_as::<_, Cohort>(
            "INSERT INTO cohorts (id, name, created_by, created_at) VALUES (?, ?, ?, ?) RETURNING *"
        )
            .bind(&cohort.id)
            .bind(&cohort.name)
            .bind(&cohort.created_by)
            .bind(cohort.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Cohort>, AppError> {
        sqlx::query_as::<_, Cohort>("SELECT * FROM cohorts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Cohort>, AppError> {
        sqlx::query_as::<_, Cohort>("SELECT * FROM cohorts WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<Cohort>, AppError> {
        sqlx::query_as::<_, Cohort>("SELECT * FROM cohorts ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
