use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Account status. Declaration order matches the Postgres enum so sorting agrees.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "blocked" => Ok(UserStatus::Blocked),
            other => Err(format!("unknown status `{}`", other)),
        }
    }
}

/// User projection handed to callers. Never carries the password digest.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub registration_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_date: Option<OffsetDateTime>,
}

/// Internal row used by the login path only.
#[derive(Debug, Clone, FromRow)]
pub struct UserWithPassword {
    #[sqlx(flatten)]
    pub user: User,
    pub password_digest: String,
}

impl From<UserWithPassword> for User {
    fn from(row: UserWithPassword) -> Self {
        row.user
    }
}

/// Parameters for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_digest: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
}
