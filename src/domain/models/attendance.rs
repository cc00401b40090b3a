use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

pub const PRESENT: &str = "present";
pub const PRESENT_LABEL: &str = "出席";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Absent,
    Late,
    Leave,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 3] = [
        AttendanceStatus::Absent,
        AttendanceStatus::Late,
        AttendanceStatus::Leave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Leave => "leave",
        }
    }

    /// Display label shown to students and teachers.
    pub fn label(&self) -> &'static str {
        match self {
            AttendanceStatus::Absent => "欠席",
            AttendanceStatus::Late => "遅刻",
            AttendanceStatus::Leave => "早退",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "leave" => Ok(AttendanceStatus::Leave),
            other => Err(format!("unknown attendance status: {}", other)),
        }
    }
}

/// Current state for one student on one date. At most one row per (student_id, date).
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Attendance {
    pub id: String,
    pub student_id: String,
    pub date: NaiveDate,
    pub status: String,
    pub reason: String,
    pub time: DateTime<Utc>,
    pub checked: bool,
}

impl Attendance {
    /// `None` when the stored value is not a known status; such rows count as present.
    pub fn status(&self) -> Option<AttendanceStatus> {
        self.status.parse().ok()
    }

    pub fn status_display(&self) -> &'static str {
        self.status().map(|s| s.label()).unwrap_or(PRESENT_LABEL)
    }
}

/// Append-only record of a single submission.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AttendanceLog {
    pub id: String,
    pub student_id: String,
    pub date: NaiveDate,
    pub status: String,
    pub reason: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AttendanceSubmission {
    pub student_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub reason: String,
    pub time: DateTime<Utc>,
}

impl AttendanceSubmission {
    pub fn new(student_id: String, date: NaiveDate, status: AttendanceStatus, reason: String) -> Self {
        Self {
            student_id,
            date,
            status,
            reason,
            time: Utc::now(),
        }
    }

    /// The ledger row this submission leaves behind. Every submission resets `checked`.
    pub fn ledger_row(&self) -> Attendance {
        Attendance {
            id: Uuid::new_v4().to_string(),
            student_id: self.student_id.clone(),
            date: self.date,
            status: self.status.as_str().to_string(),
            reason: self.reason.clone(),
            time: self.time,
            checked: false,
        }
    }

    pub fn log_row(&self) -> AttendanceLog {
        AttendanceLog {
            id: Uuid::new_v4().to_string(),
            student_id: self.student_id.clone(),
            date: self.date,
            status: self.status.as_str().to_string(),
            reason: self.reason.clone(),
            time: self.time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(" Late ".parse::<AttendanceStatus>(), Ok(AttendanceStatus::Late));
        assert_eq!("ABSENT".parse::<AttendanceStatus>(), Ok(AttendanceStatus::Absent));
        assert!("present".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn unknown_stored_status_displays_as_present() {
        let row = Attendance {
            id: "a".into(),
            student_id: "s".into(),
            date: NaiveDate::from_ymd_opt(2025, 11, 19).unwrap(),
            status: "excused".into(),
            reason: String::new(),
            time: Utc::now(),
            checked: false,
        };
        assert_eq!(row.status(), None);
        assert_eq!(row.status_display(), PRESENT_LABEL);
    }

    #[test]
    fn ledger_and_log_rows_share_submission_values() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 19).unwrap();
        let sub = AttendanceSubmission::new("s1".into(), date, AttendanceStatus::Late, "train delay".into());
        let ledger = sub.ledger_row();
        let log = sub.log_row();
        assert!(!ledger.checked);
        assert_eq!(ledger.status, "late");
        assert_eq!(log.status, "late");
        assert_eq!(ledger.time, log.time);
        assert_eq!(log.reason, "train delay");
    }
}
