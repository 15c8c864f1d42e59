use serde::{Deserialize, Serialize};

use crate::{error::AppError, store::User};

use super::services::is_valid_email;

/// Request body for user registration. Fields are optional so that missing ones
/// are reported as a validation error rather than a decode failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A registration that passed input validation.
#[derive(Debug)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Names the fields flagged as absent, in the order given.
fn missing_fields(fields: &[(&str, bool)]) -> AppError {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| *name)
        .collect();
    AppError::Validation(format!("Missing required fields: {}", missing.join(", ")))
}

fn checked_email(email: String) -> Result<String, AppError> {
    let email = email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email format".into()));
    }
    Ok(email)
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, AppError> {
        let fields = (
            present(self.first_name),
            present(self.last_name),
            present(self.email),
            self.password.filter(|p| !p.is_empty()),
        );

        match fields {
            (Some(first_name), Some(last_name), Some(email), Some(password)) => Ok(Registration {
                first_name: first_name.trim().to_string(),
                last_name: last_name.trim().to_string(),
                email: checked_email(email)?,
                password,
                job_title: present(self.job_title),
                company: present(self.company),
            }),
            (first_name, last_name, email, password) => Err(missing_fields(&[
                ("firstName", first_name.is_none()),
                ("lastName", last_name.is_none()),
                ("email", email.is_none()),
                ("password", password.is_none()),
            ])),
        }
    }
}

impl LoginRequest {
    /// Returns `(email, password)`.
    pub fn validate(self) -> Result<(String, String), AppError> {
        match (present(self.email), self.password.filter(|p| !p.is_empty())) {
            (Some(email), Some(password)) => Ok((checked_email(email)?, password)),
            (email, password) => Err(missing_fields(&[
                ("email", email.is_none()),
                ("password", password.is_none()),
            ])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_lists_every_missing_field() {
        let req = RegisterRequest {
            first_name: Some("A".into()),
            email: Some("   ".into()),
            ..Default::default()
        };
        let err = req.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: lastName, email, password"
        );
    }

    #[test]
    fn register_rejects_bad_email_shape() {
        let req = RegisterRequest {
            first_name: Some("A".into()),
            last_name: Some("B".into()),
            email: Some("a@b".into()),
            password: Some("pw".into()),
            ..Default::default()
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn register_keeps_email_case_and_drops_blank_optionals() {
        let req = RegisterRequest {
            first_name: Some("A".into()),
            last_name: Some("B".into()),
            email: Some(" Ada@Example.com ".into()),
            password: Some("pw".into()),
            job_title: Some("".into()),
            company: Some("Acme".into()),
        };
        let reg = req.validate().unwrap();
        assert_eq!(reg.email, "Ada@Example.com");
        assert_eq!(reg.job_title, None);
        assert_eq!(reg.company.as_deref(), Some("Acme"));
    }

    #[test]
    fn empty_login_names_both_fields() {
        let err = LoginRequest::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: email, password");
    }

    #[test]
    fn login_requires_both_fields() {
        let err = LoginRequest {
            email: Some("a@b.com".into()),
            password: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: password");
    }
}
