use crate::domain::{
    models::attendance::{Attendance, AttendanceLog, AttendanceSubmission},
    ports::AttendanceRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;

pub struct SqliteAttendanceRepo {
    pool: SqlitePool,
}

impl SqliteAttendanceRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRepository for SqliteAttendanceRepo {
    async fn record(&self, submission: &AttendanceSubmission) -> Result<Attendance, AppError> {
        let ledger = submission.ledger_row();
        let log = submission.log_row();

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let saved = sqlx::query_as::<_, Attendance>(
            r#"INSERT INTO attendance (id, student_id, date, status, reason, time, checked)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(student_id, date) DO UPDATE SET
                 status = excluded.status,
                 reason = excluded.reason,
                 time = excluded.time,
                 checked = excluded.checked
               RETURNING *"#
        )
            .bind(&ledger.id)
            .bind(&ledger.student_id)
            .bind(ledger.date)
            .bind(&ledger.status)
            .bind(&ledger.reason)
            .bind(ledger.time)
            .bind(ledger.checked)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        sqlx::query("INSERT INTO attendance_logs (id, student_id, date, status, reason, time) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(&log.id)
            .bind(&log.student_id)
            .bind(log.date)
            .bind(&log.status)
            .bind(&log.reason)
            .bind(log.time)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(saved)
    }

    async fn find(&self, student_id: &str, date: NaiveDate) -> Result<Option<Attendance>, AppError> {
        sqlx::query_as::<_, Attendance>("SELECT * FROM attendance WHERE student_id = ? AND date = ?")
            .bind(student_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<Attendance>, AppError> {
        sqlx::query_as::<_, Attendance>("SELECT * FROM attendance WHERE date = ?")
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_for_student(&self, student_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Attendance>, AppError> {
        sqlx::query_as::<_, Attendance>(
            "SELECT * FROM attendance WHERE student_id = ? AND date >= ? AND date <= ? ORDER BY date ASC"
        )
            .bind(student_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn history(&self, student_id: &str, date: NaiveDate) -> Result<Vec<AttendanceLog>, AppError> {
        sqlx::query_as::<_, AttendanceLog>(
            "SELECT * FROM attendance_logs WHERE student_id = ? AND date = ? ORDER BY time ASC"
        )
            .bind(student_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn mark_checked(&self, student_id: &str, date: NaiveDate) -> Result<Attendance, AppError> {
        sqlx::query_as::<_, Attendance>(
            "UPDATE attendance SET checked = TRUE WHERE student_id = ? AND date = ? RETURNING *"
        )
            .bind(student_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("この日の連絡はありません".into()))
    }
}
