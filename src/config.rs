use std::env;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub mail_service_url: String,
    pub mail_service_token: String,
    pub jwt_secret_key: String, // Private key (PEM)
    pub jwt_public_key: String, // Public key (PEM)
    pub auth_issuer: String,
    pub teacher_signup_passphrase: String,
    pub school_timezone: Tz,
    pub require_email_verification: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            mail_service_url: env::var("MAIL_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/send".to_string()),
            mail_service_token: env::var("MAIL_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            jwt_secret_key: env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set (Ed25519 Private Key)"),
            jwt_public_key: env::var("JWT_PUBLIC_KEY").expect("JWT_PUBLIC_KEY must be set (Ed25519 Public Key)"),
            auth_issuer: env::var("AUTH_ISSUER").unwrap_or_else(|_| "https://api.attendance.local".to_string()),
            teacher_signup_passphrase: env::var("TEACHER_SIGNUP_PASSPHRASE").expect("TEACHER_SIGNUP_PASSPHRASE must be set"),
            school_timezone: env::var("SCHOOL_TIMEZONE")
                .unwrap_or_else(|_| "Asia/Tokyo".to_string())
                .parse()
                .expect("SCHOOL_TIMEZONE must be an IANA timezone"),
            require_email_verification: env::var("REQUIRE_EMAIL_VERIFICATION")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
        }
    }

    /// Calendar date at the school right now.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.school_timezone).date_naive()
    }
}
