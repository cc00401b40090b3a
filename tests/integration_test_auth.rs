mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use attendance_backend::domain::{
    models::verification::EmailVerificationCode,
    services::verification_service::{EXPIRED_CODE, INVALID_CODE, VERIFICATION_SUBJECT},
};
use chrono::{Duration, Utc};
use common::{cookie_value, parse_body, AuthHeaders, TestApp};
use serde_json::{json, Value};
use tower::ServiceExt;

fn location(res: &axum::response::Response) -> String {
    res.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_string()
}

async fn student_app(require_email_verification: bool) -> (TestApp, AuthHeaders) {
    let app = TestApp::with_email_verification(require_email_verification).await;
    let teacher = app.teacher().await;
    app.create_cohort(&teacher, "IT").await;
    app.register_students(&teacher, &[["1001", "pw", "Sato", "1", "IT", "2025", "1"]]).await;
    (app, teacher)
}

/// Student login carrying an optional device cookie and challenge code.
async fn student_login(app: &TestApp, device_token: Option<&str>, code: Option<&str>) -> axum::response::Response {
    let mut payload = json!({ "username": "1001", "password": "pw" });
    if let Some(code) = code {
        payload["code"] = Value::from(code);
    }
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/student/login")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = device_token {
        builder = builder.header(header::COOKIE, format!("device_token={}", token));
    }
    app.router.clone().oneshot(builder.body(Body::from(payload.to_string())).unwrap()).await.unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let res = app.request("GET", "/health", None, None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(parse_body(res).await["status"], "ok");
}

#[tokio::test]
async fn test_teacher_signup_requires_passphrase() {
    let app = TestApp::new().await;

    let res = app.request("POST", "/api/v1/auth/teacher/signup", None, Some(json!({
        "username": "intruder", "password": "pw", "teacher_name": "X", "passphrase": "guess"
    }))).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(app.state.account_repo.find_by_username("intruder").await.unwrap().is_none());

    let res = app.signup_teacher("sensei", "pw", "Tanaka").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = parse_body(res).await;
    assert_eq!(body["teacher_name"], "Tanaka");

    let res = app.signup_teacher("sensei", "pw", "Tanaka again").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_response_and_wrong_password() {
    let app = TestApp::new().await;
    app.signup_teacher("sensei", "pw", "Tanaka").await;

    let res = app.request("POST", "/api/v1/auth/teacher/login", None, Some(json!({
        "username": "sensei", "password": "pw"
    }))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(cookie_value(&res, "refresh_token").is_some());
    let body = parse_body(res).await;
    assert_eq!(body["user"]["role"], "TEACHER");
    assert_eq!(body["user"]["display_name"], "Tanaka");

    let res = app.request("POST", "/api/v1/auth/teacher/login", None, Some(json!({
        "username": "sensei", "password": "nope"
    }))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_roles_cannot_use_each_others_login() {
    let (app, _) = student_app(false).await;

    let res = app.request("POST", "/api/v1/auth/teacher/login", None, Some(json!({
        "username": "1001", "password": "pw"
    }))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.request("POST", "/api/v1/auth/student/login", None, Some(json!({
        "username": "sensei", "password": "teacher-pw"
    }))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unauthorized_access_redirects_to_login() {
    let (app, teacher) = student_app(false).await;
    let student = app.login("student", "1001", "pw").await;

    let res = app.request("GET", "/api/v1/class_list", None, None).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login/teacher");

    let res = app.get("/api/v1/attendance/summary", &student).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login/teacher");

    let res = app.get("/api/v1/attendance_form", &teacher).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login/student");

    let res = app.request("GET", "/api/v1/student/profile", None, None).await;
    assert_eq!(location(&res), "/login/student");
}

#[tokio::test]
async fn test_mutations_require_csrf_header() {
    let (app, teacher) = student_app(false).await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/cohorts")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, format!("access_token={}", teacher.access_token))
        .body(Body::from(json!({ "name": "Design" }).to_string()))
        .unwrap();
    let res = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let forged = AuthHeaders { access_token: teacher.access_token.clone(), csrf_token: "forged".into() };
    let res = app.post("/api/v1/cohorts", &forged, json!({ "name": "Design" })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    assert!(app.state.cohort_repo.find_by_name("Design").await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_rotates_and_logout_revokes() {
    let app = TestApp::new().await;
    app.signup_teacher("sensei", "pw", "Tanaka").await;

    let res = app.request("POST", "/api/v1/auth/teacher/login", None, Some(json!({
        "username": "sensei", "password": "pw"
    }))).await;
    let refresh = cookie_value(&res, "refresh_token").unwrap();

    let refresh_req = |token: &str| Request::builder()
        .method("POST")
        .uri("/api/v1/auth/refresh")
        .header(header::COOKIE, format!("refresh_token={}", token))
        .body(Body::empty())
        .unwrap();

    let res = app.router.clone().oneshot(refresh_req(&refresh)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rotated = cookie_value(&res, "refresh_token").unwrap();
    assert_ne!(rotated, refresh);
    assert_eq!(parse_body(res).await["user"]["display_name"], "Tanaka");

    // The consumed token is single use.
    let res = app.router.clone().oneshot(refresh_req(&refresh)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let logout = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/logout")
        .header(header::COOKIE, format!("refresh_token={}", rotated))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.router.clone().oneshot(logout).await.unwrap().status(), StatusCode::OK);

    let res = app.router.clone().oneshot(refresh_req(&rotated)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expelling_a_student_ends_their_sessions() {
    let (app, teacher) = student_app(false).await;
    let res = student_login(&app, None, None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let refresh = cookie_value(&res, "refresh_token").unwrap();

    let sid = app.student_id("1001").await;
    app.post(&format!("/api/v1/students/{}/expel", sid), &teacher, json!({})).await;
    let res = app.post(&format!("/api/v1/students/{}/restore", sid), &teacher, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);

    // Restoring the account does not bring the old session back.
    let res = app.router.clone().oneshot(Request::builder()
        .method("POST")
        .uri("/api/v1/auth/refresh")
        .header(header::COOKIE, format!("refresh_token={}", refresh))
        .body(Body::empty())
        .unwrap()).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unverified_student_is_sent_to_email_setup() {
    let (app, _) = student_app(true).await;
    let student = app.login("student", "1001", "pw").await;

    let res = app.get("/api/v1/attendance_form", &student).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/student/email");

    // Profile is reachable without a verified address.
    let res = app.get("/api/v1/student/profile", &student).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_email_verification_flow() {
    let (app, _) = student_app(true).await;
    let student = app.login("student", "1001", "pw").await;

    let res = app.post("/api/v1/student/email", &student, json!({ "email": "sato@example.com" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let code = app.mailer.last_code("sato@example.com").unwrap();
    assert_eq!(code.len(), 6);
    let mail = app.mailer.sent.lock().unwrap().last().cloned().unwrap();
    assert_eq!(mail.subject, VERIFICATION_SUBJECT);
    assert!(mail.html_body.contains("10"));

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let res = app.post("/api/v1/student/email/verify", &student, json!({ "code": wrong })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(parse_body(res).await["error"], INVALID_CODE);

    let res = app.post("/api/v1/student/email/verify", &student, json!({ "code": code })).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(cookie_value(&res, "device_token").unwrap().len(), 64);

    // Codes are single use.
    let res = app.post("/api/v1/student/email/verify", &student, json!({ "code": code })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app.get("/api/v1/attendance_form", &student).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let (app, _) = student_app(true).await;
    let student = app.login("student", "1001", "pw").await;
    app.post("/api/v1/student/email", &student, json!({ "email": "sato@example.com" })).await;

    let user = app.state.account_repo.find_by_username("1001").await.unwrap().unwrap();
    let stale = EmailVerificationCode::new(user.id.clone(), "424242".into(), Utc::now() - Duration::minutes(11));
    app.state.verification_repo.create_code(&stale).await.unwrap();

    let res = app.post("/api/v1/student/email/verify", &student, json!({ "code": "424242" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(parse_body(res).await["error"], EXPIRED_CODE);
}

#[tokio::test]
async fn test_resend_issues_a_fresh_code() {
    let (app, _) = student_app(true).await;
    let student = app.login("student", "1001", "pw").await;

    let res = app.post("/api/v1/student/email/resend", &student, json!({})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    app.post("/api/v1/student/email", &student, json!({ "email": "sato@example.com" })).await;
    let res = app.post("/api/v1/student/email/resend", &student, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(app.mailer.count(), 2);
}

#[tokio::test]
async fn test_new_device_requires_code_then_is_trusted() {
    let (app, _) = student_app(true).await;
    let student = app.login("student", "1001", "pw").await;
    app.post("/api/v1/student/email", &student, json!({ "email": "sato@example.com" })).await;
    let code = app.mailer.last_code("sato@example.com").unwrap();
    app.post("/api/v1/student/email/verify", &student, json!({ "code": code })).await;

    // A fresh browser is challenged.
    let res = student_login(&app, None, None).await;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert!(cookie_value(&res, "access_token").is_none());
    assert_eq!(parse_body(res).await["verification_required"], true);

    let code = app.mailer.last_code("sato@example.com").unwrap();
    let res = student_login(&app, None, Some(&code)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(cookie_value(&res, "access_token").is_some());
    let device = cookie_value(&res, "device_token").unwrap();

    // The trusted browser goes straight through.
    let sent_before = app.mailer.count();
    let res = student_login(&app, Some(&device), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(app.mailer.count(), sent_before);

    let res = student_login(&app, Some("not-a-real-token"), None).await;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
}
