use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::role::ADMINISTRATOR_LABEL;
use super::{date_part, MASKED_PASSWORD, MISSING_PASSWORD};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Administrator record as stored in the `administrators` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Administrator {
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    #[serde(default)]
    pub name_administrator: String,
    #[serde(default)]
    pub email_administrator: String,
    #[serde(default)]
    pub pass_administrator: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Row shown in the administrators panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdministratorRow {
    pub id: i64,
    pub document_id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub registered_on: Option<String>,
    pub role: String,
}

impl AdministratorRow {
    pub fn from_record(record: Administrator, reveal_password: bool) -> Self {
        let password = match record.pass_administrator.filter(|p| !p.is_empty()) {
            Some(_) if !reveal_password => MASKED_PASSWORD.to_string(),
            Some(password) => password,
            None => MISSING_PASSWORD.to_string(),
        };
        Self {
            id: record.id,
            document_id: record.document_id,
            name: record.name_administrator,
            email: record.email_administrator,
            password,
            registered_on: record.created_at.map(date_part),
            role: record.role.unwrap_or_else(|| "Admin".to_string()),
        }
    }
}

/// Body of the "register administrator" form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAdministratorRequest {
    #[validate(custom(function = "validate_admin_name"))]
    pub name: String,

    #[validate(custom(function = "validate_admin_email"))]
    pub email: String,

    #[validate(custom(function = "validate_admin_password"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "You must confirm the password"),
        must_match(other = "password", message = "Passwords do not match")
    )]
    pub confirm_password: String,
}

/// `data` payload for POST /api/administrators
#[derive(Debug, Serialize)]
pub struct AdministratorPayload {
    pub name_administrator: String,
    pub email_administrator: String,
    pub pass_administrator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
}

impl From<CreateAdministratorRequest> for AdministratorPayload {
    fn from(req: CreateAdministratorRequest) -> Self {
        Self {
            name_administrator: req.name,
            email_administrator: req.email,
            pass_administrator: req.password,
            role: Some(ADMINISTRATOR_LABEL),
        }
    }
}

/// Body of the inline edit in the administrators panel
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAdministratorRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    pub password: String,
}

impl From<UpdateAdministratorRequest> for AdministratorPayload {
    fn from(req: UpdateAdministratorRequest) -> Self {
        Self {
            name_administrator: req.name,
            email_administrator: req.email,
            pass_administrator: req.password,
            role: None,
        }
    }
}

fn validate_admin_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("required").with_message("Name is required".into()));
    }
    if trimmed.chars().count() < 3 {
        return Err(ValidationError::new("length")
            .with_message("Name must be at least 3 characters".into()));
    }
    Ok(())
}

fn validate_admin_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("Email is required".into()));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::new("email").with_message("Enter a valid email".into()));
    }
    Ok(())
}

fn validate_admin_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::new("required").with_message("Password is required".into()));
    }
    if password.chars().count() < 8 {
        return Err(ValidationError::new("length")
            .with_message("Password must be at least 8 characters".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str, confirm: &str) -> CreateAdministratorRequest {
        CreateAdministratorRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn accepts_valid_form() {
        assert!(request("Jorge", "jorge@startdev.io", "Jorge1234", "Jorge1234")
            .validate()
            .is_ok());
    }

    #[test]
    fn reports_each_invalid_field() {
        let errors = request("Jo", "not-an-email", "short", "other")
            .validate()
            .unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("confirm_password"));
    }

    #[test]
    fn email_rule_rejects_whitespace() {
        assert!(validate_admin_email("a b@c.io").is_err());
        assert!(validate_admin_email("ab@c.io").is_ok());
        assert!(validate_admin_email("ab@cio").is_err());
    }

    #[test]
    fn row_masks_password_unless_revealed() {
        let record = Administrator {
            id: 4,
            document_id: "doc4".to_string(),
            name_administrator: "Ana".to_string(),
            email_administrator: "ana@startdev.io".to_string(),
            pass_administrator: Some("secret123".to_string()),
            role: None,
            created_at: "2025-03-01T10:00:00.000Z".parse().ok(),
        };

        let masked = AdministratorRow::from_record(record.clone(), false);
        assert_eq!(masked.password, MASKED_PASSWORD);
        assert_eq!(masked.registered_on.as_deref(), Some("2025-03-01"));
        assert_eq!(masked.role, "Admin");

        let revealed = AdministratorRow::from_record(record, true);
        assert_eq!(revealed.password, "secret123");
    }
}
