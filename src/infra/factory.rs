use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;
use tera::Tera;

use crate::config::Config;
use crate::state::AppState;
use crate::infra::email::http_email_service::HttpEmailService;
use crate::domain::ports::EmailService;
use crate::domain::services::auth_service::AuthService;
use crate::domain::services::verification_service::VERIFICATION_TEMPLATE;
use crate::infra::repositories::{
    postgres_account_repo::PostgresAccountRepo, postgres_attendance_repo::PostgresAttendanceRepo,
    postgres_auth_repo::PostgresAuthRepo, postgres_cohort_repo::PostgresCohortRepo,
    postgres_filter_repo::PostgresFilterRepo, postgres_student_repo::PostgresStudentRepo,
    postgres_verification_repo::PostgresVerificationRepo,
    sqlite_account_repo::SqliteAccountRepo, sqlite_attendance_repo::SqliteAttendanceRepo,
    sqlite_auth_repo::SqliteAuthRepo, sqlite_cohort_repo::SqliteCohortRepo,
    sqlite_filter_repo::SqliteFilterRepo, sqlite_student_repo::SqliteStudentRepo,
    sqlite_verification_repo::SqliteVerificationRepo,
};

pub fn load_templates() -> Tera {
    let mut tera = Tera::default();
    tera.add_raw_template(VERIFICATION_TEMPLATE, include_str!("../templates/verification_code.html"))
        .expect("Failed to load verification template");
    tera
}

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;
    let email_service: Arc<dyn EmailService> = Arc::new(HttpEmailService::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
    ));
    let templates = Arc::new(load_templates());

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;

        let auth_service = Arc::new(AuthService::new(Arc::new(PostgresAuthRepo::new(pool.clone())), config.clone()));

        AppState {
            config: config.clone(),
            account_repo: Arc::new(PostgresAccountRepo::new(pool.clone())),
            cohort_repo: Arc::new(PostgresCohortRepo::new(pool.clone())),
            student_repo: Arc::new(PostgresStudentRepo::new(pool.clone())),
            attendance_repo: Arc::new(PostgresAttendanceRepo::new(pool.clone())),
            verification_repo: Arc::new(PostgresVerificationRepo::new(pool.clone())),
            filter_repo: Arc::new(PostgresFilterRepo::new(pool.clone())),
            auth_service,
            email_service,
            templates,
        }
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;

        let auth_service = Arc::new(AuthService::new(Arc::new(SqliteAuthRepo::new(pool.clone())), config.clone()));

        AppState {
            config: config.clone(),
            account_repo: Arc::new(SqliteAccountRepo::new(pool.clone())),
            cohort_repo: Arc::new(SqliteCohortRepo::new(pool.clone())),
            student_repo: Arc::new(SqliteStudentRepo::new(pool.clone())),
            attendance_repo: Arc::new(SqliteAttendanceRepo::new(pool.clone())),
            verification_repo: Arc::new(SqliteVerificationRepo::new(pool.clone())),
            filter_repo: Arc::new(SqliteFilterRepo::new(pool.clone())),
            auth_service,
            email_service,
            templates,
        }
    }
}

async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
