use std::sync::Arc;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use tera::{Context, Tera};
use tracing::{info, warn};
use crate::domain::{
    models::verification::{EmailVerificationCode, TrustedDevice, CODE_TTL_MINUTES},
    ports::{EmailService, VerificationRepository},
};
use crate::error::AppError;

pub const VERIFICATION_TEMPLATE: &str = "verification_code.html";
pub const VERIFICATION_SUBJECT: &str = "【出欠連絡】メール認証コードのお知らせ";
pub const INVALID_CODE: &str = "認証コードが正しくありません";
pub const EXPIRED_CODE: &str = "認証コードの有効期限が切れています";

pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

pub fn generate_device_token() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(64).map(char::from).collect()
}

pub struct VerificationService {
    repo: Arc<dyn VerificationRepository>,
    email: Arc<dyn EmailService>,
    templates: Arc<Tera>,
}

impl VerificationService {
    pub fn new(repo: Arc<dyn VerificationRepository>, email: Arc<dyn EmailService>, templates: Arc<Tera>) -> Self {
        Self { repo, email, templates }
    }

    /// Stores a fresh code and mails it to `address`.
    pub async fn send_code(&self, user_id: &str, address: &str) -> Result<(), AppError> {
        let record = EmailVerificationCode::new(user_id.to_string(), generate_code(), Utc::now());
        self.repo.create_code(&record).await?;

        let mut context = Context::new();
        context.insert("code", &record.code);
        context.insert("ttl_minutes", &CODE_TTL_MINUTES);
        let body = self.templates.render(VERIFICATION_TEMPLATE, &context)
            .map_err(|e| AppError::InternalWithMsg(format!("Template render failed: {}", e)))?;

        self.email.send(address, VERIFICATION_SUBJECT, &body).await?;
        info!("Sent verification code to user {}", user_id);
        Ok(())
    }

    /// Consumes a matching code. Wrong codes and stale codes fail with distinct messages.
    pub async fn verify_code(&self, user_id: &str, code: &str) -> Result<(), AppError> {
        let record = self.repo.find_unused_code(user_id, code.trim()).await?
            .ok_or_else(|| AppError::Validation(INVALID_CODE.to_string()))?;

        if !record.is_valid(Utc::now()) {
            warn!("Expired verification code used by user {}", user_id);
            return Err(AppError::Validation(EXPIRED_CODE.to_string()));
        }

        self.repo.mark_code_used(&record.id).await
    }

    pub async fn trust_device(&self, user_id: &str, user_agent: Option<String>) -> Result<TrustedDevice, AppError> {
        let device = TrustedDevice::new(user_id.to_string(), generate_device_token(), user_agent, Utc::now());
        self.repo.create_device(&device).await?;
        info!("Registered trusted device for user {}", user_id);
        Ok(device)
    }

    pub async fn is_trusted(&self, user_id: &str, device_token: Option<&str>) -> Result<bool, AppError> {
        let Some(token) = device_token else {
            return Ok(false);
        };
        let device = self.repo.find_device(user_id, token).await?;
        Ok(device.is_some_and(|d| d.is_valid(Utc::now())))
    }
}
