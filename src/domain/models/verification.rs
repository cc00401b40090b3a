use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

pub const CODE_TTL_MINUTES: i64 = 10;
pub const DEVICE_TTL_DAYS: i64 = 90;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct EmailVerificationCode {
    pub id: String,
    pub user_id: String,
    pub code: String,
    pub is_used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl EmailVerificationCode {
    pub fn new(user_id: String, code: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            code,
            is_used: false,
            expires_at: now + Duration::minutes(CODE_TTL_MINUTES),
            created_at: now,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && now < self.expires_at
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct TrustedDevice {
    pub id: String,
    pub user_id: String,
    pub device_token: String,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TrustedDevice {
    pub fn new(user_id: String, device_token: String, user_agent: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            device_token,
            user_agent,
            expires_at: now + Duration::days(DEVICE_TTL_DAYS),
            created_at: now,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
