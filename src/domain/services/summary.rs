use std::collections::HashMap;
use std::sync::Arc;
use chrono::NaiveDate;
use serde::Serialize;
use crate::domain::{
    models::{
        attendance::{Attendance, AttendanceStatus},
        cohort::Cohort,
        filter::ClassFilter,
        student::StudentRecord,
    },
    ports::{AttendanceRepository, CohortRepository, StudentRepository},
};
use crate::error::AppError;

pub const UNASSIGNED: &str = "unassigned";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CohortSummary {
    pub cohort_id: Option<String>,
    pub cohort_name: String,
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub leave: usize,
    pub rate: f64,
}

impl CohortSummary {
    fn empty(cohort_id: Option<String>, cohort_name: String) -> Self {
        Self { cohort_id, cohort_name, total: 0, present: 0, absent: 0, late: 0, leave: 0, rate: 0.0 }
    }

    fn count(&mut self, status: Option<AttendanceStatus>) {
        self.total += 1;
        match status {
            Some(AttendanceStatus::Absent) => self.absent += 1,
            Some(AttendanceStatus::Late) => self.late += 1,
            Some(AttendanceStatus::Leave) => self.leave += 1,
            None => self.present += 1,
        }
    }

    fn finish(mut self) -> Self {
        self.rate = attendance_rate(self.present, self.total);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSummary {
    pub date: NaiveDate,
    pub cohorts: Vec<CohortSummary>,
    pub overall: CohortSummary,
}

/// Percentage rounded to one decimal place; 0 for an empty cohort.
pub fn attendance_rate(present: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (present as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Buckets active students by cohort and counts each one exactly once.
/// Every cohort in `cohorts` gets a bucket even when nobody is in it.
/// Students without a ledger row for `date`, or with an unrecognised status,
/// count as present.
pub fn summarize(date: NaiveDate, cohorts: &[Cohort], students: &[StudentRecord], ledger: &[Attendance]) -> AttendanceSummary {
    let by_student: HashMap<&str, &Attendance> = ledger.iter()
        .filter(|a| a.date == date)
        .map(|a| (a.student_id.as_str(), a))
        .collect();

    let mut buckets: HashMap<Option<String>, CohortSummary> = cohorts.iter()
        .map(|c| (Some(c.id.clone()), CohortSummary::empty(Some(c.id.clone()), c.name.clone())))
        .collect();
    let mut overall = CohortSummary::empty(None, "all".to_string());

    for student in students.iter().filter(|s| s.is_active) {
        let status = by_student.get(student.id.as_str()).and_then(|a| a.status());

        let key = student.cohort_id.clone();
        let bucket = buckets.entry(key.clone()).or_insert_with(|| {
            let name = match &key {
                Some(_) => student.cohort_name.clone().unwrap_or_default(),
                None => UNASSIGNED.to_string(),
            };
            CohortSummary::empty(key, name)
        });
        bucket.count(status);
        overall.count(status);
    }

    let mut cohorts: Vec<CohortSummary> = buckets.into_values().map(CohortSummary::finish).collect();
    cohorts.sort_by(|a, b| {
        (a.cohort_id.is_none(), &a.cohort_name).cmp(&(b.cohort_id.is_none(), &b.cohort_name))
    });

    AttendanceSummary { date, cohorts, overall: overall.finish() }
}

pub struct SummaryService {
    cohorts: Arc<dyn CohortRepository>,
    students: Arc<dyn StudentRepository>,
    attendance: Arc<dyn AttendanceRepository>,
}

impl SummaryService {
    pub fn new(
        cohorts: Arc<dyn CohortRepository>,
        students: Arc<dyn StudentRepository>,
        attendance: Arc<dyn AttendanceRepository>,
    ) -> Self {
        Self { cohorts, students, attendance }
    }

    pub async fn for_date(&self, date: NaiveDate, filter: &ClassFilter) -> Result<AttendanceSummary, AppError> {
        let cohorts: Vec<Cohort> = self.cohorts.list().await?
            .into_iter()
            .filter(|c| filter.cohort_id.as_deref().is_none_or(|id| id == c.id))
            .collect();
        let students = self.students.list(filter, true).await?;
        let ledger = self.attendance.list_for_date(date).await?;
        Ok(summarize(date, &cohorts, &students, &ledger))
    }
}
