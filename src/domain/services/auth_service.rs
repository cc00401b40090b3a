//! Session issuing for both roles: a short-lived EdDSA access token paired
//! with a CSRF token, and a rotating refresh chain stored hashed.

use std::sync::Arc;
use crate::domain::{
    models::{
        account::User,
        auth::{hash_refresh_token, Claims, RefreshTokenRecord, SessionTokens, TOKEN_AUDIENCE},
    },
    ports::AuthRepository,
};
use crate::error::AppError;
use crate::config::Config;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use tracing::{error, warn};

const CSRF_TOKEN_LEN: usize = 32;
const REFRESH_TOKEN_LEN: usize = 64;

fn random_token(len: usize) -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

pub struct AuthService {
    repo: Arc<dyn AuthRepository>,
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(repo: Arc<dyn AuthRepository>, config: Config) -> Self {
        let encoding_key = EncodingKey::from_ed_pem(config.jwt_secret_key.as_bytes())
            .expect("Invalid JWT Private Key PEM");
        let decoding_key = DecodingKey::from_ed_pem(config.jwt_public_key.as_bytes())
            .expect("Invalid JWT Public Key PEM");

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_issuer(&[config.auth_issuer.as_str()]);

        Self { repo, issuer: config.auth_issuer, encoding_key, decoding_key, validation }
    }

    /// Opens a new refresh chain for a freshly authenticated user.
    pub async fn start_session(&self, user: &User) -> Result<SessionTokens, AppError> {
        self.issue(user, Uuid::new_v4(), 1).await
    }

    /// Spends a refresh token. Unknown, already spent and expired tokens are all
    /// `Unauthorized`.
    pub async fn redeem(&self, raw_refresh_token: &str) -> Result<RefreshTokenRecord, AppError> {
        let spent = self.repo.take_refresh_token(&hash_refresh_token(raw_refresh_token)).await?
            .ok_or(AppError::Unauthorized)?;

        if spent.is_expired(Utc::now()) {
            return Err(AppError::Unauthorized);
        }
        Ok(spent)
    }

    /// Issues the next link of `spent`'s chain. A deactivated owner loses the
    /// whole chain instead.
    pub async fn continue_session(&self, spent: &RefreshTokenRecord, user: &User) -> Result<SessionTokens, AppError> {
        if !user.is_active || user.id != spent.user_id {
            warn!("Refresh refused for user {}; revoking chain {}", spent.user_id, spent.family_id);
            self.repo.revoke_family(spent.family_id).await?;
            return Err(AppError::Unauthorized);
        }
        self.issue(user, spent.family_id, spent.generation_id + 1).await
    }

    pub async fn end_session(&self, raw_refresh_token: &str) -> Result<(), AppError> {
        self.repo.take_refresh_token(&hash_refresh_token(raw_refresh_token)).await?;
        Ok(())
    }

    /// Signs the user out everywhere.
    pub async fn end_all_sessions(&self, user_id: &str) -> Result<(), AppError> {
        self.repo.revoke_user(user_id).await
    }

    pub fn verify_access(&self, access_token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(access_token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)
    }

    async fn issue(&self, user: &User, family_id: Uuid, generation_id: i32) -> Result<SessionTokens, AppError> {
        let now = Utc::now();
        let csrf_token = random_token(CSRF_TOKEN_LEN);
        let claims = Claims::new(user, &self.issuer, csrf_token.clone(), now);

        let access_token = encode(&Header::new(Algorithm::EdDSA), &claims, &self.encoding_key)
            .map_err(|e| {
                error!("JWT encoding failed: {}", e);
                AppError::Internal
            })?;

        let refresh_token = random_token(REFRESH_TOKEN_LEN);
        let record = RefreshTokenRecord::new(user.id.clone(), &refresh_token, family_id, generation_id, now);
        self.repo.store_refresh_token(&record).await?;

        Ok(SessionTokens { access_token, refresh_token, csrf_token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::account::Role;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryTokens {
        records: Mutex<HashMap<String, RefreshTokenRecord>>,
    }

    #[async_trait]
    impl AuthRepository for MemoryTokens {
        async fn store_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
            self.records.lock().unwrap().insert(record.token_hash.clone(), record.clone());
            Ok(())
        }

        async fn take_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
            Ok(self.records.lock().unwrap().remove(token_hash))
        }

        async fn revoke_family(&self, family_id: Uuid) -> Result<(), AppError> {
            self.records.lock().unwrap().retain(|_, r| r.family_id != family_id);
            Ok(())
        }

        async fn revoke_user(&self, user_id: &str) -> Result<(), AppError> {
            self.records.lock().unwrap().retain(|_, r| r.user_id != user_id);
            Ok(())
        }
    }

    fn service() -> (AuthService, Arc<MemoryTokens>) {
        let repo = Arc::new(MemoryTokens::default());
        let config = Config {
            database_url: "sqlite::memory:".into(),
            port: 0,
            mail_service_url: "http://localhost".into(),
            mail_service_token: "token".into(),
            jwt_secret_key: include_str!("../../../tests/keys/test_private.pem").into(),
            jwt_public_key: include_str!("../../../tests/keys/test_public.pem").into(),
            auth_issuer: "test-issuer".into(),
            teacher_signup_passphrase: "pass".into(),
            school_timezone: chrono_tz::Asia::Tokyo,
            require_email_verification: false,
        };
        (AuthService::new(repo.clone(), config), repo)
    }

    #[tokio::test]
    async fn access_token_round_trips_with_role_and_csrf() {
        let (auth, _) = service();
        let user = User::new("sensei".into(), "hash".into(), Role::Teacher);
        let tokens = auth.start_session(&user).await.unwrap();

        let claims = auth.verify_access(&tokens.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert!(claims.grants(Role::Teacher));
        assert_eq!(claims.csrf_token, tokens.csrf_token);
        assert!(auth.verify_access("not-a-jwt").is_err());
    }

    #[tokio::test]
    async fn refresh_rotates_within_the_family() {
        let (auth, repo) = service();
        let user = User::new("sensei".into(), "hash".into(), Role::Teacher);
        let first = auth.start_session(&user).await.unwrap();

        let spent = auth.redeem(&first.refresh_token).await.unwrap();
        let second = auth.continue_session(&spent, &user).await.unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);

        let next = repo.records.lock().unwrap().values().next().cloned().unwrap();
        assert_eq!(next.family_id, spent.family_id);
        assert_eq!(next.generation_id, 2);

        assert!(matches!(auth.redeem(&first.refresh_token).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn deactivated_user_loses_the_chain() {
        let (auth, repo) = service();
        let mut user = User::new("2001".into(), "hash".into(), Role::Student);
        let tokens = auth.start_session(&user).await.unwrap();
        let spent = auth.redeem(&tokens.refresh_token).await.unwrap();

        user.is_active = false;
        assert!(auth.continue_session(&spent, &user).await.is_err());
        assert!(repo.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn end_all_sessions_drops_every_chain() {
        let (auth, _) = service();
        let user = User::new("2001".into(), "hash".into(), Role::Student);
        let a = auth.start_session(&user).await.unwrap();
        let b = auth.start_session(&user).await.unwrap();

        auth.end_all_sessions(&user.id).await.unwrap();
        assert!(auth.redeem(&a.refresh_token).await.is_err());
        assert!(auth.redeem(&b.refresh_token).await.is_err());
    }
}
