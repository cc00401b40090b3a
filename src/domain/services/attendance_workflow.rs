//! Student-driven attendance submission: `entry` -> `confirm` -> `committed`,
//! with `back` returning to the calendar without touching storage.

use std::sync::Arc;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;
use crate::domain::{
    models::{
        attendance::{Attendance, AttendanceStatus, AttendanceSubmission},
        student::StudentProfile,
    },
    ports::AttendanceRepository,
};
use crate::error::AppError;

pub const DATE_FORMAT_ERROR: &str = "日付の形式が正しくありません";
pub const STATUS_REQUIRED_ERROR: &str = "出欠区分を選択してください";
pub const REASON_TOO_LONG_ERROR: &str = "理由は500文字以内で入力してください";
pub const MAX_REASON_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormAction {
    Confirm,
    Send,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Entry,
    Confirm,
    Committed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceForm {
    pub action: FormAction,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub date: NaiveDate,
    pub date_label: String,
    pub status: AttendanceStatus,
    pub status_display: &'static str,
    pub reason: String,
}

#[derive(Debug)]
pub enum WorkflowOutcome {
    Confirm(Preview),
    Committed(Attendance),
    Back { date: String },
}

/// Accepts the calendar's `2025年11月19日` form as well as ISO and slash dates.
pub fn parse_form_date(raw: &str) -> Result<NaiveDate, AppError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y年%m月%d日")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y/%m/%d"))
        .map_err(|_| AppError::Validation(DATE_FORMAT_ERROR.to_string()))
}

pub fn format_form_date(date: NaiveDate) -> String {
    format!("{}年{}月{}日", date.year(), date.month(), date.day())
}

fn parse_status(raw: Option<&str>) -> Result<AttendanceStatus, AppError> {
    raw.and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::Validation(STATUS_REQUIRED_ERROR.to_string()))
}

fn normalize_reason(raw: &str) -> Result<String, AppError> {
    let reason = raw.trim();
    if reason.chars().count() > MAX_REASON_CHARS {
        return Err(AppError::Validation(REASON_TOO_LONG_ERROR.to_string()));
    }
    Ok(reason.to_string())
}

pub struct AttendanceWorkflow {
    repo: Arc<dyn AttendanceRepository>,
}

impl AttendanceWorkflow {
    pub fn new(repo: Arc<dyn AttendanceRepository>) -> Self {
        Self { repo }
    }

    pub async fn step(&self, student: &StudentProfile, form: &AttendanceForm) -> Result<WorkflowOutcome, AppError> {
        match form.action {
            FormAction::Confirm => self.preview(form).map(WorkflowOutcome::Confirm),
            FormAction::Send => self.send(student, form).await.map(WorkflowOutcome::Committed),
            FormAction::Back => Ok(WorkflowOutcome::Back { date: form.date.clone() }),
        }
    }

    /// Validates the form and renders it for review. Never writes.
    pub fn preview(&self, form: &AttendanceForm) -> Result<Preview, AppError> {
        let date = parse_form_date(&form.date)?;
        let status = parse_status(form.status.as_deref())?;
        let reason = normalize_reason(&form.reason)?;

        Ok(Preview {
            date,
            date_label: format_form_date(date),
            status,
            status_display: status.label(),
            reason,
        })
    }

    pub async fn send(&self, student: &StudentProfile, form: &AttendanceForm) -> Result<Attendance, AppError> {
        let preview = self.preview(form)?;
        let submission = AttendanceSubmission::new(student.id.clone(), preview.date, preview.status, preview.reason);

        let saved = self.repo.record(&submission).await?;
        info!("Recorded attendance {} for student {} on {}", saved.status, student.id, saved.date);
        Ok(saved)
    }
}
