use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use crate::domain::models::account::{Account, Role, User};

pub const TOKEN_AUDIENCE: &str = "attendance-frontend";
pub const ACCESS_TTL_MINUTES: i64 = 15;
pub const REFRESH_TTL_DAYS: i64 = 7;

/// Access-token claims. The role and CSRF token ride along so the extractors
/// can reject a request before touching the database.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,

    #[serde(rename = "https://attendance.local/claims/role")]
    pub role: String,

    #[serde(rename = "https://attendance.local/claims/csrf")]
    pub csrf_token: String,
}

impl Claims {
    pub fn new(user: &User, issuer: &str, csrf_token: String, now: DateTime<Utc>) -> Self {
        Self {
            iss: issuer.to_string(),
            sub: user.id.clone(),
            aud: TOKEN_AUDIENCE.to_string(),
            exp: (now + Duration::minutes(ACCESS_TTL_MINUTES)).timestamp() as usize,
            iat: now.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            role: user.role.clone(),
            csrf_token,
        }
    }

    pub fn grants(&self, role: Role) -> bool {
        self.role.parse::<Role>().is_ok_and(|r| r == role)
    }
}

/// One link of a refresh chain. Only the SHA-256 of the token is kept; every
/// refresh spends the link and stores its successor in the same family.
#[derive(Debug, FromRow, Clone)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub user_id: String,
    pub family_id: Uuid,
    pub generation_id: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(user_id: String, raw_token: &str, family_id: Uuid, generation_id: i32, now: DateTime<Utc>) -> Self {
        Self {
            token_hash: hash_refresh_token(raw_token),
            user_id,
            family_id,
            generation_id,
            expires_at: now + Duration::days(REFRESH_TTL_DAYS),
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

pub fn hash_refresh_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}

/// Everything a successful login or refresh hands back to the browser.
#[derive(Debug)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_token: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub csrf_token: String,
    pub user: UserProfile,
}

impl AuthResponse {
    pub fn new(account: &Account, csrf_token: String) -> Self {
        let user = account.user();
        Self {
            csrf_token,
            user: UserProfile {
                id: user.id.clone(),
                username: user.username.clone(),
                role: user.role.clone(),
                display_name: account.display_name().to_string(),
            },
        }
    }
}

#[derive(Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub role: String,
    pub display_name: String,
}
