mod common;

use attendance_backend::api::extractors::filter::UNKNOWN_COHORT;
use axum::http::StatusCode;
use common::{parse_body, AuthHeaders, TestApp};
use serde_json::{json, Value};

async fn send(app: &TestApp, student: &AuthHeaders, status: &str) {
    let res = app.post("/api/v1/attendance_form", student, json!({
        "action": "send", "status": status, "reason": "", "date": "2025-11-19"
    })).await;
    assert_eq!(res.status(), StatusCode::OK);
}

fn bucket<'a>(body: &'a Value, name: &str) -> &'a Value {
    body["cohorts"].as_array().unwrap().iter()
        .find(|c| c["cohort_name"] == name)
        .unwrap_or_else(|| panic!("no bucket named {}", name))
}

/// IT: 3 students (absent, late, no row). Design: 2 students (leave, no row).
async fn seed(app: &TestApp) -> AuthHeaders {
    let teacher = app.teacher().await;
    app.create_cohort(&teacher, "IT").await;
    app.create_cohort(&teacher, "Design").await;
    app.register_students(&teacher, &[
        ["1", "pw", "A", "1", "IT", "2025", "1"],
        ["2", "pw", "B", "2", "IT", "2025", "1"],
        ["3", "pw", "C", "3", "IT", "2025", "1"],
        ["4", "pw", "D", "4", "Design", "2024", "2"],
        ["5", "pw", "E", "5", "Design", "2024", "2"],
    ]).await;

    send(app, &app.login("student", "1", "pw").await, "absent").await;
    send(app, &app.login("student", "2", "pw").await, "late").await;
    send(app, &app.login("student", "4", "pw").await, "leave").await;
    teacher
}

#[tokio::test]
async fn test_summary_counts_per_cohort() {
    let app = TestApp::new().await;
    let teacher = seed(&app).await;

    let res = app.get("/api/v1/attendance/summary?date=2025-11-19", &teacher).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["date"], "2025-11-19");

    let it = bucket(&body, "IT");
    assert_eq!(it["total"], 3);
    assert_eq!(it["present"], 1);
    assert_eq!(it["absent"], 1);
    assert_eq!(it["late"], 1);
    assert_eq!(it["leave"], 0);
    assert_eq!(it["rate"], 33.3);

    let design = bucket(&body, "Design");
    assert_eq!(design["total"], 2);
    assert_eq!(design["present"], 1);
    assert_eq!(design["leave"], 1);
    assert_eq!(design["rate"], 50.0);

    assert_eq!(body["overall"]["total"], 5);
    assert_eq!(body["overall"]["present"], 2);
    assert_eq!(body["overall"]["rate"], 40.0);
}

#[tokio::test]
async fn test_summary_excludes_inactive_and_buckets_unassigned() {
    let app = TestApp::new().await;
    let teacher = seed(&app).await;

    let expelled = app.student_id("1").await;
    app.post(&format!("/api/v1/students/{}/expel", expelled), &teacher, json!({})).await;

    let orphan = app.student_id("3").await;
    sqlx::query("UPDATE student_profiles SET cohort_id = NULL WHERE id = ?")
        .bind(&orphan)
        .execute(&app.pool).await.unwrap();

    let body = parse_body(app.get("/api/v1/attendance/summary?date=2025-11-19", &teacher).await).await;

    let it = bucket(&body, "IT");
    assert_eq!(it["total"], 1);
    assert_eq!(it["late"], 1);
    assert_eq!(it["absent"], 0);

    let cohorts = body["cohorts"].as_array().unwrap();
    let last = cohorts.last().unwrap();
    assert_eq!(last["cohort_name"], "unassigned");
    assert!(last["cohort_id"].is_null());
    assert_eq!(last["total"], 1);
    assert_eq!(last["present"], 1);

    assert_eq!(body["overall"]["total"], 4);
}

#[tokio::test]
async fn test_empty_cohort_is_listed_with_zero_rate() {
    let app = TestApp::new().await;
    let teacher = app.teacher().await;
    app.create_cohort(&teacher, "IT").await;
    app.create_cohort(&teacher, "Design").await;
    app.register_students(&teacher, &[["1", "pw", "A", "1", "IT", "2025", "1"]]).await;

    let body = parse_body(app.get("/api/v1/attendance/summary?date=2025-11-19", &teacher).await).await;
    let names: Vec<&str> = body["cohorts"].as_array().unwrap().iter()
        .map(|c| c["cohort_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Design", "IT"]);

    let design = bucket(&body, "Design");
    assert_eq!(design["total"], 0);
    assert_eq!(design["rate"], 0.0);
    assert_eq!(bucket(&body, "IT")["rate"], 100.0);

    // Expelling the only member empties the class but keeps it listed.
    let sid = app.student_id("1").await;
    app.post(&format!("/api/v1/students/{}/expel", sid), &teacher, json!({})).await;
    let body = parse_body(app.get("/api/v1/attendance/summary?date=2025-11-19", &teacher).await).await;
    assert_eq!(bucket(&body, "IT")["total"], 0);
    assert_eq!(body["overall"]["rate"], 0.0);
}

#[tokio::test]
async fn test_summary_on_a_quiet_day_is_all_present() {
    let app = TestApp::new().await;
    let teacher = seed(&app).await;

    let body = parse_body(app.get("/api/v1/attendance/summary?date=2025-11-20", &teacher).await).await;
    for c in body["cohorts"].as_array().unwrap() {
        assert_eq!(c["present"], c["total"]);
        assert_eq!(c["rate"], 100.0);
    }
}

#[tokio::test]
async fn test_summary_without_date_uses_today() {
    let app = TestApp::new().await;
    let teacher = seed(&app).await;

    let res = app.get("/api/v1/attendance/summary", &teacher).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["date"], app.state.config.today().to_string());
}

#[tokio::test]
async fn test_filter_persists_between_requests() {
    let app = TestApp::new().await;
    let teacher = seed(&app).await;

    let body = parse_body(app.get("/api/v1/class_list?date=2025-11-19&academic_year=2024", &teacher).await).await;
    assert_eq!(body["students"].as_array().unwrap().len(), 2);

    // No parameters: the stored selection still applies.
    let body = parse_body(app.get("/api/v1/attendance/summary?date=2025-11-19", &teacher).await).await;
    assert_eq!(bucket(&body, "Design")["total"], 2);
    assert_eq!(bucket(&body, "IT")["total"], 0);
    assert_eq!(body["overall"]["total"], 2);

    let body = parse_body(app.get("/api/v1/filters", &teacher).await).await;
    assert_eq!(body["academic_year"], 2024);
    assert!(body["cohort_id"].is_null());

    let body = parse_body(app.get("/api/v1/class_list?date=2025-11-19&academic_year=", &teacher).await).await;
    assert_eq!(body["students"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_filter_by_cohort_and_reset() {
    let app = TestApp::new().await;
    let teacher = seed(&app).await;

    let cohorts = parse_body(app.get("/api/v1/cohorts", &teacher).await).await;
    let it_id = cohorts.as_array().unwrap().iter()
        .find(|c| c["name"] == "IT").unwrap()["id"].as_str().unwrap().to_string();

    let body = parse_body(app.get(&format!("/api/v1/students?cohort_id={}&course_year=1", it_id), &teacher).await).await;
    assert_eq!(body["students"].as_array().unwrap().len(), 3);
    assert_eq!(body["filter"]["cohort_id"], it_id.as_str());

    let body = parse_body(app.get("/api/v1/filters?reset=true", &teacher).await).await;
    assert!(body["cohort_id"].is_null());
    assert!(body["course_year"].is_null());

    let res = app.get("/api/v1/filters?course_year=first", &teacher).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_cohort_in_filter_is_not_found() {
    let app = TestApp::new().await;
    let teacher = seed(&app).await;
    app.get("/api/v1/filters?academic_year=2025", &teacher).await;

    let res = app.get("/api/v1/class_list?date=2025-11-19&cohort_id=no-such-class", &teacher).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(parse_body(res).await["error"], UNKNOWN_COHORT);

    // The stored selection is left as it was.
    let body = parse_body(app.get("/api/v1/filters", &teacher).await).await;
    assert_eq!(body["academic_year"], 2025);
    assert!(body["cohort_id"].is_null());
}

#[tokio::test]
async fn test_filters_are_per_teacher() {
    let app = TestApp::new().await;
    let teacher = seed(&app).await;
    app.get("/api/v1/filters?academic_year=2025", &teacher).await;

    let res = app.signup_teacher("sensei2", "pw2", "Yamada").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let other = app.login("teacher", "sensei2", "pw2").await;

    let body = parse_body(app.get("/api/v1/filters", &other).await).await;
    assert!(body["academic_year"].is_null());
}
