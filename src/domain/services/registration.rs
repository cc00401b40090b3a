//! Teacher-driven bulk operations on student accounts. Every row stands on its
//! own: one row's failure is reported and the batch moves on.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use crate::domain::{
    models::{
        account::{Role, TeacherProfile, User},
        student::{is_valid_course_year, NewStudent},
    },
    ports::{AccountRepository, StudentRepository},
    services::password::hash_password,
};
use crate::error::AppError;

pub const USERNAME_TAKEN: &str = "このIDは既に登録されています";

/// The registration form as the browser posts it: one array per column.
#[derive(Debug, Deserialize)]
pub struct BulkStudentForm {
    #[serde(alias = "student_id[]")]
    pub student_id: Vec<String>,
    #[serde(alias = "password[]")]
    pub password: Vec<String>,
    #[serde(alias = "fullname[]")]
    pub fullname: Vec<String>,
    #[serde(alias = "number[]")]
    pub number: Vec<String>,
    #[serde(alias = "department[]")]
    pub department: Vec<String>,
    #[serde(alias = "academic_year[]")]
    pub academic_year: Vec<String>,
    #[serde(alias = "course_years[]")]
    pub course_years: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRow {
    /// 1-based position in the submitted form.
    pub row: usize,
    pub student_id: String,
    pub password: String,
    pub fullname: String,
    pub number: String,
    pub department: String,
    pub academic_year: String,
    pub course_years: String,
}

impl BulkStudentForm {
    /// Zips the columns into rows. All columns must have the same length.
    pub fn into_rows(self) -> Result<Vec<StudentRow>, AppError> {
        let len = self.student_id.len();
        let lengths = [
            self.password.len(),
            self.fullname.len(),
            self.number.len(),
            self.department.len(),
            self.academic_year.len(),
            self.course_years.len(),
        ];
        if lengths.iter().any(|l| *l != len) {
            return Err(AppError::Validation("登録データの各列の行数が一致しません".into()));
        }

        let rows = self.student_id.into_iter()
            .zip(self.password)
            .zip(self.fullname)
            .zip(self.number)
            .zip(self.department)
            .zip(self.academic_year)
            .zip(self.course_years)
            .enumerate()
            .map(|(i, ((((((student_id, password), fullname), number), department), academic_year), course_years))| StudentRow {
                row: i + 1,
                student_id,
                password,
                fullname,
                number,
                department,
                academic_year,
                course_years,
            })
            .collect();
        Ok(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRow {
    pub username: String,
    pub password: String,
    pub student_name: String,
    pub student_number: i64,
    pub cohort_name: String,
    pub academic_year: i32,
    pub course_year: i32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RowCheck {
    Blank,
    Invalid(String),
    Valid(ValidRow),
}

pub fn check_row(row: &StudentRow) -> RowCheck {
    let username = row.student_id.trim();
    if username.is_empty() {
        return RowCheck::Blank;
    }
    if !username.chars().all(|c| c.is_ascii_digit()) {
        return RowCheck::Invalid("学生IDは数字で入力してください".into());
    }
    if row.password.is_empty() {
        return RowCheck::Invalid("パスワードを入力してください".into());
    }
    let student_name = row.fullname.trim();
    if student_name.is_empty() {
        return RowCheck::Invalid("氏名を入力してください".into());
    }
    let Ok(student_number) = row.number.trim().parse::<i64>() else {
        return RowCheck::Invalid("出席番号は数字で入力してください".into());
    };
    let cohort_name = row.department.trim();
    if cohort_name.is_empty() {
        return RowCheck::Invalid("学科・クラスを入力してください".into());
    }
    let Ok(academic_year) = row.academic_year.trim().parse::<i32>() else {
        return RowCheck::Invalid("入学年度は数字で入力してください".into());
    };
    let course_year = match row.course_years.trim().parse::<i32>() {
        Ok(y) if is_valid_course_year(y) => y,
        _ => return RowCheck::Invalid("年制は1〜3で入力してください".into()),
    };

    RowCheck::Valid(ValidRow {
        username: username.to_string(),
        password: row.password.clone(),
        student_name: student_name.to_string(),
        student_number,
        cohort_name: cohort_name.to_string(),
        academic_year,
        course_year,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct RowIssue {
    pub row: usize,
    pub username: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedStudent {
    pub row: usize,
    pub id: String,
    pub username: String,
    pub student_name: String,
}

#[derive(Debug, Default, Serialize)]
pub struct RegistrationReport {
    pub created: Vec<CreatedStudent>,
    pub warnings: Vec<RowIssue>,
    pub errors: Vec<RowIssue>,
    pub skipped_blank: usize,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRow {
    pub id: String,
    pub classroom: String,
    pub number: String,
    pub fullname: String,
    pub new_password: String,
}

#[derive(Debug, Default, Serialize)]
pub struct PasswordResetReport {
    pub updated: Vec<String>,
    pub errors: Vec<RowIssue>,
}

pub struct RegistrationService {
    accounts: Arc<dyn AccountRepository>,
    students: Arc<dyn StudentRepository>,
}

impl RegistrationService {
    pub fn new(accounts: Arc<dyn AccountRepository>, students: Arc<dyn StudentRepository>) -> Self {
        Self { accounts, students }
    }

    pub async fn register(&self, teacher: &TeacherProfile, rows: Vec<StudentRow>) -> RegistrationReport {
        let mut report = RegistrationReport::default();

        for row in rows {
            let valid = match check_row(&row) {
                RowCheck::Blank => {
                    report.skipped_blank += 1;
                    continue;
                }
                RowCheck::Invalid(message) => {
                    report.errors.push(RowIssue { row: row.row, username: row.student_id.trim().to_string(), message });
                    continue;
                }
                RowCheck::Valid(v) => v,
            };

            match self.register_one(teacher, &valid).await {
                Ok(id) => {
                    info!("Registered student {} (row {})", valid.username, row.row);
                    report.created.push(CreatedStudent {
                        row: row.row,
                        id,
                        username: valid.username,
                        student_name: valid.student_name,
                    });
                }
                Err(AppError::Conflict(message)) => {
                    warn!("Skipping row {}: {}", row.row, message);
                    report.warnings.push(RowIssue { row: row.row, username: valid.username, message });
                }
                Err(e) if e.is_unique_violation() => {
                    warn!("Skipping row {}: username {} was taken concurrently", row.row, valid.username);
                    report.warnings.push(RowIssue {
                        row: row.row,
                        username: valid.username,
                        message: USERNAME_TAKEN.into(),
                    });
                }
                Err(AppError::NotFound(message)) => {
                    warn!("Rejecting row {}: {}", row.row, message);
                    report.errors.push(RowIssue { row: row.row, username: valid.username, message });
                }
                Err(e) => {
                    error!("Registering row {} failed: {:?}", row.row, e);
                    report.errors.push(RowIssue {
                        row: row.row,
                        username: valid.username,
                        message: "登録に失敗しました".into(),
                    });
                }
            }
        }

        report
    }

    async fn register_one(&self, teacher: &TeacherProfile, row: &ValidRow) -> Result<String, AppError> {
        if self.accounts.find_by_username(&row.username).await?.is_some() {
            return Err(AppError::Conflict(USERNAME_TAKEN.into()));
        }
        if let Some(holder) = self.students.find_active_by_number(row.student_number).await? {
            return Err(AppError::Conflict(format!(
                "出席番号 {} は既に {} が使用しています", row.student_number, holder.username
            )));
        }

        let password_hash = hash_password(&row.password)?;
        let student = NewStudent {
            user: User::new(row.username.clone(), password_hash, Role::Student),
            student_name: row.student_name.clone(),
            student_number: row.student_number,
            cohort_name: row.cohort_name.clone(),
            academic_year: row.academic_year,
            course_year: row.course_year,
            created_by_teacher: Some(teacher.id.clone()),
        };

        let profile = self.students.register(&student).await?;
        Ok(profile.id)
    }

    /// Applies a row only when ID, classroom, number and name all describe the same student.
    pub async fn reset_passwords(&self, rows: Vec<PasswordResetRow>) -> PasswordResetReport {
        let mut report = PasswordResetReport::default();

        for (i, row) in rows.into_iter().enumerate() {
            let username = row.id.trim().to_string();
            match self.reset_one(&row).await {
                Ok(()) => {
                    info!("Password reset for student {}", username);
                    report.updated.push(username);
                }
                Err(e) => {
                    let message = match e {
                        AppError::NotFound(m) | AppError::Validation(m) => m,
                        other => {
                            error!("Password reset row {} failed: {:?}", i + 1, other);
                            "パスワードの再設定に失敗しました".to_string()
                        }
                    };
                    report.errors.push(RowIssue { row: i + 1, username, message });
                }
            }
        }

        report
    }

    async fn reset_one(&self, row: &PasswordResetRow) -> Result<(), AppError> {
        if row.new_password.is_empty() {
            return Err(AppError::Validation("新しいパスワードを入力してください".into()));
        }

        let not_matched = || AppError::NotFound("一致する学生が見つかりません".to_string());

        let user = self.accounts.find_by_username(row.id.trim()).await?
            .filter(|u| u.role() == Some(Role::Student))
            .ok_or_else(not_matched)?;
        let profile = self.students.find_by_user_id(&user.id).await?
            .ok_or_else(not_matched)?;
        let record = self.students.find_record(&profile.id).await?
            .ok_or_else(not_matched)?;

        let number_matches = row.number.trim().parse::<i64>().ok() == Some(record.student_number);
        let name_matches = row.fullname.trim() == record.student_name;
        let class_matches = record.cohort_name.as_deref() == Some(row.classroom.trim());
        if !(number_matches && name_matches && class_matches) {
            return Err(not_matched());
        }

        let password_hash = hash_password(&row.new_password)?;
        self.accounts.set_password(&user.id, &password_hash).await
    }
}
