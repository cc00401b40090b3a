use crate::domain::{
    models::verification::{EmailVerificationCode, TrustedDevice},
    ports::VerificationRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteVerificationRepo {
    pool: SqlitePool,
}

impl SqliteVerificationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationRepository for SqliteVerificationRepo {
    async fn create_code(&self, code: &EmailVerificationCode) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO email_verification_codes (id, user_id, code, is_used, expires_at, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
            .bind(&code.id)
            .bind(&code.user_id)
            .bind(&code.code)
            .bind(code.is_used)
            .bind(code.expires_at)
            .bind(code.created_at)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn find_unused_code(&self, user_id: &str, code: &str) -> Result<Option<EmailVerificationCode>, AppError> {
        sqlx::query_as::<_, EmailVerificationCode>(
            "SELECT * FROM email_verification_codes
             WHERE user_id = ? AND code = ? AND is_used = FALSE
             ORDER BY created_at DESC LIMIT 1"
        )
            .bind(user_id)
            .bind(code)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn mark_code_used(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE email_verification_codes SET is_used = TRUE WHERE id = ?")
            .bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn create_device(&self, device: &TrustedDevice) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO trusted_devices (id, user_id, device_token, user_agent, expires_at, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
            .bind(&device.id)
            .bind(&device.user_id)
            .bind(&device.device_token)
            .bind(&device.user_agent)
            .bind(device.expires_at)
            .bind(device.created_at)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn find_device(&self, user_id: &str, device_token: &str) -> Result<Option<TrustedDevice>, AppError> {
        sqlx::query_as::<_, TrustedDevice>("SELECT * FROM trusted_devices WHERE user_id = ? AND device_token = ?")
            .bind(user_id)
            .bind(device_token)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
}
