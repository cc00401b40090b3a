use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use crate::domain::models::attendance::{
    Attendance, AttendanceLog, AttendanceStatus, PRESENT, PRESENT_LABEL,
};
use crate::domain::models::student::StudentRecord;
use crate::domain::services::attendance_workflow::{Preview, Stage};

#[derive(Serialize)]
pub struct TeacherCreatedResponse {
    pub id: String,
    pub username: String,
    pub teacher_name: String,
}

#[derive(Serialize)]
pub struct VerificationRequiredResponse {
    pub verification_required: bool,
}

#[derive(Serialize)]
pub struct StatusChoice {
    pub value: &'static str,
    pub label: &'static str,
}

impl StatusChoice {
    pub fn all() -> Vec<StatusChoice> {
        AttendanceStatus::ALL.iter()
            .map(|s| StatusChoice { value: s.as_str(), label: s.label() })
            .collect()
    }
}

#[derive(Serialize)]
pub struct AttendanceView {
    pub date: NaiveDate,
    pub status: String,
    pub status_display: &'static str,
    pub reason: String,
    pub time: DateTime<Utc>,
    pub checked: bool,
}

impl From<Attendance> for AttendanceView {
    fn from(a: Attendance) -> Self {
        let status_display = a.status_display();
        Self {
            date: a.date,
            status: a.status,
            status_display,
            reason: a.reason,
            time: a.time,
            checked: a.checked,
        }
    }
}

#[derive(Serialize)]
pub struct EntryStageResponse {
    pub stage: Stage,
    pub date: NaiveDate,
    pub date_label: String,
    pub statuses: Vec<StatusChoice>,
    pub current: Option<AttendanceView>,
}

#[derive(Serialize)]
pub struct ConfirmStageResponse {
    pub stage: Stage,
    pub preview: Preview,
}

#[derive(Serialize)]
pub struct CommittedStageResponse {
    pub stage: Stage,
    pub attendance: AttendanceView,
}

#[derive(Serialize)]
pub struct MonthAttendanceResponse {
    pub month: String,
    pub records: Vec<AttendanceView>,
}

#[derive(Serialize)]
pub struct AttendanceState {
    pub status: String,
    pub status_display: &'static str,
}

#[derive(Serialize)]
pub struct ClassListEntry {
    pub id: String,
    pub student_number: i64,
    pub student_name: String,
    pub cohort_name: Option<String>,
    pub is_active: bool,
    pub has_notification: bool,
    pub attendance: AttendanceState,
}

impl ClassListEntry {
    /// Students without a ledger row for the day are shown as present.
    pub fn new(student: StudentRecord, ledger: Option<&Attendance>) -> Self {
        let attendance = match ledger {
            Some(a) => AttendanceState { status: a.status.clone(), status_display: a.status_display() },
            None => AttendanceState { status: PRESENT.to_string(), status_display: PRESENT_LABEL },
        };
        Self {
            id: student.id,
            student_number: student.student_number,
            student_name: student.student_name,
            cohort_name: student.cohort_name,
            is_active: student.is_active,
            has_notification: ledger.is_some_and(|a| !a.checked),
            attendance,
        }
    }
}

#[derive(Serialize)]
pub struct ClassListResponse {
    pub students: Vec<ClassListEntry>,
    pub date: NaiveDate,
}

#[derive(Serialize)]
pub struct LogEntry {
    pub status: String,
    pub status_display: &'static str,
    pub reason: String,
    pub time: DateTime<Utc>,
}

impl From<AttendanceLog> for LogEntry {
    fn from(log: AttendanceLog) -> Self {
        let status_display = log.status.parse::<AttendanceStatus>()
            .map(|s| s.label())
            .unwrap_or(PRESENT_LABEL);
        Self { status: log.status, status_display, reason: log.reason, time: log.time }
    }
}

#[derive(Serialize)]
pub struct AttendanceLogResponse {
    pub student_id: String,
    pub date: NaiveDate,
    pub logs: Vec<LogEntry>,
}

#[derive(Serialize)]
pub struct StudentStatusResponse {
    pub id: String,
    pub is_active: bool,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub student_name: String,
    pub student_number: i64,
    pub cohort_name: Option<String>,
    pub academic_year: i32,
    pub course_year: i32,
    pub email: Option<String>,
    pub email_verified: bool,
}
