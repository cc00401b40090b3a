use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use crate::domain::models::student::StudentProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
        }
    }

    /// Where an unauthenticated or wrong-role request for this role is sent.
    pub fn login_path(&self) -> &'static str {
        match self {
            Role::Teacher => "/login/teacher",
            Role::Student => "/login/student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEACHER" => Ok(Role::Teacher),
            "STUDENT" => Ok(Role::Student),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            password_hash,
            role: role.as_str().to_string(),
            email: None,
            email_verified: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct TeacherProfile {
    pub id: String,
    pub user_id: String,
    pub teacher_name: String,
    pub created_at: DateTime<Utc>,
}

impl TeacherProfile {
    pub fn new(user_id: String, teacher_name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            teacher_name,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TeacherAccount {
    pub user: User,
    pub profile: TeacherProfile,
}

#[derive(Debug, Clone)]
pub struct StudentAccount {
    pub user: User,
    pub profile: StudentProfile,
}

/// A user resolved together with the profile that its role implies.
#[derive(Debug, Clone)]
pub enum Account {
    Teacher(TeacherAccount),
    Student(StudentAccount),
}

impl Account {
    pub fn user(&self) -> &User {
        match self {
            Account::Teacher(t) => &t.user,
            Account::Student(s) => &s.user,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Account::Teacher(_) => Role::Teacher,
            Account::Student(_) => Role::Student,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Account::Teacher(t) => &t.profile.teacher_name,
            Account::Student(s) => &s.profile.student_name,
        }
    }
}
