#![allow(dead_code)]

use attendance_backend::{
    api::router::create_router,
    state::AppState,
    config::Config,
    infra::{
        factory::load_templates,
        repositories::{
            sqlite_account_repo::SqliteAccountRepo,
            sqlite_attendance_repo::SqliteAttendanceRepo,
            sqlite_auth_repo::SqliteAuthRepo,
            sqlite_cohort_repo::SqliteCohortRepo,
            sqlite_filter_repo::SqliteFilterRepo,
            sqlite_student_repo::SqliteStudentRepo,
            sqlite_verification_repo::SqliteVerificationRepo,
        },
    },
    domain::services::auth_service::AuthService,
    domain::ports::EmailService,
    error::AppError,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, header},
    response::Response,
    Router,
};
use std::str::FromStr;
use async_trait::async_trait;
use tower::ServiceExt;
use serde_json::{json, Value};

pub const SIGNUP_PASSPHRASE: &str = "test-passphrase";

#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Default)]
pub struct MockEmailService {
    pub sent: Mutex<Vec<SentMail>>,
}

impl MockEmailService {
    /// The six-digit code from the newest mail sent to `recipient`.
    pub fn last_code(&self, recipient: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let mail = sent.iter().rev().find(|m| m.recipient == recipient)?;
        let chars: Vec<char> = mail.html_body.chars().collect();
        chars.windows(6)
            .enumerate()
            .find(|(i, w)| {
                w.iter().all(|c| c.is_ascii_digit())
                    && (*i == 0 || !chars[i - 1].is_ascii_digit())
                    && chars.get(i + 6).is_none_or(|c| !c.is_ascii_digit())
            })
            .map(|(_, w)| w.iter().collect())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AuthHeaders {
    pub access_token: String,
    pub csrf_token: String,
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub mailer: Arc<MockEmailService>,
}

pub async fn parse_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

/// Extracts `name=value` from a response's Set-Cookie headers.
pub fn cookie_value(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find(|c| c.starts_with(&prefix))
        .map(|c| c[prefix.len()..].split(';').next().unwrap_or_default().to_string())
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_email_verification(false).await
    }

    pub async fn with_email_verification(require_email_verification: bool) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let priv_key_pem = include_str!("../tests/keys/test_private.pem");
        let pub_key_pem = include_str!("../tests/keys/test_public.pem");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            jwt_secret_key: priv_key_pem.to_string(),
            jwt_public_key: pub_key_pem.to_string(),
            auth_issuer: "test-issuer".to_string(),
            teacher_signup_passphrase: SIGNUP_PASSPHRASE.to_string(),
            school_timezone: chrono_tz::Asia::Tokyo,
            require_email_verification,
        };

        let mailer = Arc::new(MockEmailService::default());
        let auth_service = Arc::new(AuthService::new(Arc::new(SqliteAuthRepo::new(pool.clone())), config.clone()));

        let state = Arc::new(AppState {
            config,
            account_repo: Arc::new(SqliteAccountRepo::new(pool.clone())),
            cohort_repo: Arc::new(SqliteCohortRepo::new(pool.clone())),
            student_repo: Arc::new(SqliteStudentRepo::new(pool.clone())),
            attendance_repo: Arc::new(SqliteAttendanceRepo::new(pool.clone())),
            verification_repo: Arc::new(SqliteVerificationRepo::new(pool.clone())),
            filter_repo: Arc::new(SqliteFilterRepo::new(pool.clone())),
            auth_service,
            email_service: mailer.clone(),
            templates: Arc::new(load_templates()),
        });

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            mailer,
        }
    }

    /// Sends a JSON request, attaching the auth cookie and CSRF header when given.
    pub async fn request(&self, method: &str, uri: &str, auth: Option<&AuthHeaders>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder
                .header(header::COOKIE, format!("access_token={}", auth.access_token))
                .header("X-CSRF-Token", &auth.csrf_token);
        }
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    pub async fn get(&self, uri: &str, auth: &AuthHeaders) -> Response {
        self.request("GET", uri, Some(auth), None).await
    }

    pub async fn post(&self, uri: &str, auth: &AuthHeaders, body: Value) -> Response {
        self.request("POST", uri, Some(auth), Some(body)).await
    }

    pub async fn signup_teacher(&self, username: &str, password: &str, name: &str) -> Response {
        self.request("POST", "/api/v1/auth/teacher/signup", None, Some(json!({
            "username": username,
            "password": password,
            "teacher_name": name,
            "passphrase": SIGNUP_PASSPHRASE,
        }))).await
    }

    pub async fn login(&self, role: &str, username: &str, password: &str) -> AuthHeaders {
        let response = self.request("POST", &format!("/api/v1/auth/{}/login", role), None, Some(json!({
            "username": username,
            "password": password,
        }))).await;

        if !response.status().is_success() {
            panic!("Login failed in test helper: status {}", response.status());
        }

        let access_token = cookie_value(&response, "access_token").expect("No access_token cookie returned");
        let body_json = parse_body(response).await;
        let csrf_token = body_json["csrf_token"].as_str().expect("No csrf_token in body").to_string();

        AuthHeaders { access_token, csrf_token }
    }

    /// Signs up and logs in a teacher.
    pub async fn teacher(&self) -> AuthHeaders {
        let res = self.signup_teacher("sensei", "teacher-pw", "Tanaka").await;
        assert!(res.status().is_success(), "teacher signup failed: {}", res.status());
        self.login("teacher", "sensei", "teacher-pw").await
    }

    pub async fn create_cohort(&self, auth: &AuthHeaders, name: &str) -> String {
        let res = self.post("/api/v1/cohorts", auth, json!({ "name": name })).await;
        assert!(res.status().is_success(), "cohort creation failed: {}", res.status());
        parse_body(res).await["id"].as_str().unwrap().to_string()
    }

    /// Rows are (student_id, password, fullname, number, department, academic_year, course_years).
    pub async fn register_students(&self, auth: &AuthHeaders, rows: &[[&str; 7]]) -> Response {
        let column = |i: usize| rows.iter().map(|r| r[i]).collect::<Vec<_>>();
        self.post("/api/v1/students/bulk", auth, json!({
            "student_id": column(0),
            "password": column(1),
            "fullname": column(2),
            "number": column(3),
            "department": column(4),
            "academic_year": column(5),
            "course_years": column(6),
        })).await
    }

    /// Profile id of the student with the given login name.
    pub async fn student_id(&self, username: &str) -> String {
        let user = self.state.account_repo.find_by_username(username).await.unwrap().unwrap();
        self.state.student_repo.find_by_user_id(&user.id).await.unwrap().unwrap().id
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}
