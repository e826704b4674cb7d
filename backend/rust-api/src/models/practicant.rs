use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::role::PRACTICANT_LABEL;
use super::{date_part, MASKED_PASSWORD, MISSING_PASSWORD};

/// Practicant record as stored in the `practicants` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Practicant {
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    #[serde(default)]
    pub name_pract: String,
    #[serde(default)]
    pub email_practicant: String,
    #[serde(default)]
    pub password_pract: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub registration_date: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Public view of a practicant (dashboard header, profile)
#[derive(Debug, Clone, Serialize)]
pub struct PracticantProfile {
    pub id: i64,
    pub document_id: String,
    pub name: String,
    pub email: String,
    pub registered_on: Option<String>,
}

impl From<Practicant> for PracticantProfile {
    fn from(record: Practicant) -> Self {
        Self {
            id: record.id,
            document_id: record.document_id,
            name: record.name_pract,
            email: record.email_practicant,
            registered_on: record.registration_date.or(record.created_at).map(date_part),
        }
    }
}

/// Row shown in the practicants panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PracticantRow {
    pub id: i64,
    pub document_id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub registered_on: Option<String>,
    pub role: String,
}

impl PracticantRow {
    pub fn from_record(record: Practicant, reveal_password: bool) -> Self {
        let password = match record.password_pract.filter(|p| !p.is_empty()) {
            Some(_) if !reveal_password => MASKED_PASSWORD.to_string(),
            Some(password) => password,
            None => MISSING_PASSWORD.to_string(),
        };
        Self {
            id: record.id,
            document_id: record.document_id,
            name: record.name_pract,
            email: record.email_practicant,
            password,
            registered_on: record.registration_date.or(record.created_at).map(date_part),
            role: record.role.unwrap_or_else(|| PRACTICANT_LABEL.to_string()),
        }
    }
}

/// Self-registration form on the login page
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterPracticantRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name_pract: String,

    #[validate(email(message = "Enter a valid email"))]
    pub email_practicant: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password_pract: String,

    #[validate(must_match(other = "password_pract", message = "Passwords do not match"))]
    pub confirm_password: String,
}

/// `data` payload for POST /api/practicants
#[derive(Debug, Serialize)]
pub struct NewPracticantPayload {
    pub name_pract: String,
    pub email_practicant: String,
    pub password_pract: String,
    pub role: &'static str,
    pub registration_date: String,
}

impl NewPracticantPayload {
    pub fn new(req: RegisterPracticantRequest, registered_at: DateTime<Utc>) -> Self {
        Self {
            name_pract: req.name_pract,
            email_practicant: req.email_practicant,
            password_pract: req.password_pract,
            role: PRACTICANT_LABEL,
            registration_date: registered_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// Inline edit in the practicants panel
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePracticantRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    pub password: String,
}

/// `data` payload for PUT /api/practicants/{id}
#[derive(Debug, Serialize)]
pub struct PracticantPayload {
    pub name_pract: String,
    pub email_practicant: String,
    pub password_pract: String,
}

impl From<UpdatePracticantRequest> for PracticantPayload {
    fn from(req: UpdatePracticantRequest) -> Self {
        Self {
            name_pract: req.name,
            email_practicant: req.email,
            password_pract: req.password,
        }
    }
}

/// Profile form of a signed-in practicant
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl UpdateProfileRequest {
    pub fn is_changing_password(&self) -> bool {
        !self.current_password.is_empty() && !self.new_password.is_empty()
    }

    fn touches_password(&self) -> bool {
        !self.current_password.is_empty()
            || !self.new_password.is_empty()
            || !self.confirm_password.is_empty()
    }
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        use validator::{ValidationError, ValidationErrors};

        let mut errors = ValidationErrors::new();
        let mut fail = |field: &'static str, code: &'static str, message: &'static str| {
            errors.add(field, ValidationError::new(code).with_message(message.into()));
        };

        if self.name.trim().is_empty() {
            fail("name", "required", "Name is required");
        }

        if self.touches_password() {
            if self.current_password.is_empty() {
                fail("current_password", "required", "Enter your current password");
            }
            if self.new_password.is_empty() {
                fail("new_password", "required", "Enter a new password");
            } else if self.new_password.chars().count() < 6 {
                fail("new_password", "length", "Password must be at least 6 characters");
            }
            if self.confirm_password.is_empty() {
                fail("confirm_password", "required", "Confirm your new password");
            } else if self.new_password != self.confirm_password {
                fail("confirm_password", "must_match", "Passwords do not match");
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body for POST /api/practicants/update-profile
#[derive(Debug, Serialize)]
pub struct ProfileUpdatePayload {
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub name: String,
    #[serde(rename = "currentPassword", skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
    #[serde(rename = "newPassword", skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

impl ProfileUpdatePayload {
    pub fn new(document_id: String, req: UpdateProfileRequest) -> Self {
        let changing = req.is_changing_password();
        Self {
            document_id,
            name: req.name,
            current_password: changing.then_some(req.current_password.clone()),
            new_password: changing.then_some(req.new_password),
        }
    }
}
