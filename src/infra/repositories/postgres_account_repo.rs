use crate::domain::{models::account::{TeacherProfile, User}, ports::AccountRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{postgres::PgQueryResult, PgPool};

fn require_user(result: PgQueryResult) -> Result<(), AppError> {
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("ユーザーが見つかりません".into()));
    }
    Ok(())
}

pub struct PostgresAccountRepo {
    pool: PgPool,
}

impl PostgresAccountRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepo {
    async fn create_teacher(&self, user: &User, profile: &TeacherProfile) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query(
            "INSERT INTO users (id, username, password_hash, role, email, email_verified, is_active, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        )
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(&user.email)
            .bind(user.email_verified)
            .bind(user.is_active)
            .bind(user.created_at)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        sqlx::query("INSERT INTO teacher_profiles (id, user_id, teacher_name, created_at) VALUES ($1, $2, $3, $4)")
            .bind(&profile.id)
            .bind(&profile.user_id)
            .bind(&profile.teacher_name)
            .bind(profile.created_at)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_teacher_profile(&self, user_id: &str) -> Result<Option<TeacherProfile>, AppError> {
        sqlx::query_as::<_, TeacherProfile>("SELECT * FROM teacher_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn set_active(&self, user_id: &str, is_active: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(user_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        require_user(result)
    }

    async fn set_password(&self, user_id: &str, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        require_user(result)
    }

    async fn set_email(&self, user_id: &str, email: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET email = $1, email_verified = FALSE WHERE id = $2")
            .bind(email)
            .bind(user_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        require_user(result)
    }

    async fn mark_email_verified(&self, user_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        require_user(result)
    }
}
