use crate::domain::{
    models::{filter::ClassFilter, student::{NewStudent, StudentProfile, StudentRecord}},
    ports::StudentRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

const RECORD_SELECT: &str = "SELECT sp.id, sp.user_id, u.username, u.is_active, sp.student_name, sp.student_number,
        sp.cohort_id, c.name AS cohort_name, sp.academic_year, sp.course_year
     FROM student_profiles sp
     JOIN users u ON u.id = sp.user_id
     LEFT JOIN cohorts c ON c.id = sp.cohort_id";

pub struct PostgresStudentRepo {
    pool: PgPool,
}

impl PostgresStudentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentRepository for PostgresStudentRepo {
    async fn register(&self, student: &NewStudent) -> Result<StudentProfile, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let user = &student.user;

        sqlx::query(
            "INSERT INTO users (id, username, password_hash, role, email, email_verified, is_active, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        )
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(&user.email)
            .bind(user.email_verified)
            .bind(user.is_active)
            .bind(user.created_at)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        let cohort_id: Option<String> = sqlx::query_scalar("SELECT id FROM cohorts WHERE name = $1")
            .bind(&student.cohort_name)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
        let Some(cohort_id) = cohort_id else {
            // Dropping the transaction rolls back the user row.
            return Err(AppError::NotFound(format!("学科・クラス「{}」は登録されていません", student.cohort_name)));
        };

        let (_, profile) = student.clone().into_profile(cohort_id);
        let created = sqlx::query_as::<_, StudentProfile>(
            "INSERT INTO student_profiles (id, user_id, student_name, student_number, cohort_id, academic_year, course_year, created_by_teacher, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *"
        )
            .bind(&profile.id)
            .bind(&profile.user_id)
            .bind(&profile.student_name)
            .bind(profile.student_number)
            .bind(&profile.cohort_id)
            .bind(profile.academic_year)
            .bind(profile.course_year)
            .bind(&profile.created_by_teacher)
            .bind(profile.created_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<StudentProfile>, AppError> {
        sqlx::query_as::<_, StudentProfile>("SELECT * FROM student_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<StudentProfile>, AppError> {
        sqlx::query_as::<_, StudentProfile>("SELECT * FROM student_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_record(&self, id: &str) -> Result<Option<StudentRecord>, AppError> {
        sqlx::query_as::<_, StudentRecord>(&format!("{} WHERE sp.id = $1", RECORD_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_active_by_number(&self, student_number: i64) -> Result<Option<StudentRecord>, AppError> {
        sqlx::query_as::<_, StudentRecord>(&format!("{} WHERE sp.student_number = $1 AND u.is_active LIMIT 1", RECORD_SELECT))
            .bind(student_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, filter: &ClassFilter, active_only: bool) -> Result<Vec<StudentRecord>, AppError> {
        let sql = format!(
            "{} WHERE ($1::INTEGER IS NULL OR sp.academic_year = $1)
               AND ($2::TEXT IS NULL OR sp.cohort_id = $2)
               AND ($3::INTEGER IS NULL OR sp.course_year = $3)
               AND (NOT $4 OR u.is_active)
             ORDER BY c.name IS NULL, c.name, sp.student_number",
            RECORD_SELECT
        );
        sqlx::query_as::<_, StudentRecord>(&sql)
            .bind(filter.academic_year)
            .bind(&filter.cohort_id)
            .bind(filter.course_year)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update_name(&self, id: &str, student_name: &str) -> Result<StudentProfile, AppError> {
        sqlx::query_as::<_, StudentProfile>("UPDATE student_profiles SET student_name = $1 WHERE id = $2 RETURNING *")
            .bind(student_name)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("学生が見つかりません".into()))
    }

    async fn purge(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let user_id: Option<String> = sqlx::query_scalar("SELECT user_id FROM student_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
        let Some(user_id) = user_id else {
            return Err(AppError::NotFound("学生が見つかりません".into()));
        };

        for sql in [
            "DELETE FROM attendance_logs WHERE student_id = $1",
            "DELETE FROM attendance WHERE student_id = $1",
            "DELETE FROM student_profiles WHERE id = $1",
        ] {
            sqlx::query(sql).bind(id).execute(&mut *tx).await.map_err(AppError::Database)?;
        }
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(&user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Postgres student purge failed: {:?}", e);
                AppError::Database(e)
            })?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
