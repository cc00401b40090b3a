use axum::{
    body::Body,
    extract::Request,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{attendance, auth, cohort, filter, health, me, student};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Auth
        .route("/api/v1/auth/teacher/signup", post(auth::teacher_signup))
        .route("/api/v1/auth/teacher/login", post(auth::teacher_login))
        .route("/api/v1/auth/student/login", post(auth::student_login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))

        // Student self-service
        .route("/api/v1/student/profile", get(me::get_profile).put(me::update_profile))
        .route("/api/v1/student/email", post(me::set_email))
        .route("/api/v1/student/email/verify", post(me::verify_email))
        .route("/api/v1/student/email/resend", post(me::resend_code))
        .route("/api/v1/student/attendance", get(me::my_attendance))
        .route("/api/v1/attendance_form", get(attendance::attendance_form).post(attendance::submit_attendance_form))

        // Class registry
        .route("/api/v1/cohorts", get(cohort::list_cohorts).post(cohort::create_cohort))

        // Student directory
        .route("/api/v1/students", get(student::list_students))
        .route("/api/v1/students/bulk", post(student::bulk_register))
        .route("/api/v1/students/password_reset", post(student::reset_passwords))
        .route("/api/v1/students/{id}", delete(student::purge_student))
        .route("/api/v1/students/{id}/expel", post(student::expel_student))
        .route("/api/v1/students/{id}/restore", post(student::restore_student))

        // Teacher attendance views
        .route("/api/v1/filters", get(filter::get_filter))
        .route("/api/v1/class_list", get(attendance::class_list))
        .route("/api/v1/students/{id}/attendance_log", get(attendance::attendance_log))
        .route("/api/v1/students/{id}/attendance/{date}/check", post(attendance::check_attendance))
        .route("/api/v1/attendance/summary", get(attendance::summary))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        user_id = tracing::field::Empty,
                        role = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
