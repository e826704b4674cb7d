use std::collections::BTreeMap;

use axum::{http::StatusCode, response::IntoResponse, Json};
use validator::ValidationErrors;

use crate::services::practicant_service::ProfileError;
use crate::services::strapi::StrapiError;
use crate::services::submission_service::SubmissionError;

/// Error returned by every handler: `{message, status}` plus `fields` for
/// validation failures.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// Maps a backend failure to a static message for the client; the full
    /// error goes to the log.
    pub fn backend(context: &'static str) -> impl Fn(StrapiError) -> ApiError {
        move |err| {
            tracing::error!("{}: {}", context, err);
            match err {
                StrapiError::NotFound(_) => ApiError::NotFound(context.to_string()),
                _ => ApiError::BadGateway(context.to_string()),
            }
        }
    }

    /// Like [`ApiError::backend`], but a 4xx carrying a backend message
    /// surfaces that message.
    pub fn backend_surfaced(context: &'static str) -> impl Fn(StrapiError) -> ApiError {
        move |err| match err {
            StrapiError::Status { status, ref message }
                if (400..500).contains(&status) && !message.is_empty() =>
            {
                tracing::warn!("{}: {}", context, err);
                ApiError::BadRequest(message.clone())
            }
            other => ApiError::backend(context)(other),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let fields: BTreeMap<String, String> = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errors)| {
                errors.first().map(|error| {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    (field.to_string(), message)
                })
            })
            .collect();

        let message = fields.values().cloned().collect::<Vec<_>>().join("; ");
        tracing::warn!("Rejected input: {}", message);
        ApiError::Validation { message, fields }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::EmptyCode => ApiError::BadRequest(err.to_string()),
            SubmissionError::TopicNotFound | SubmissionError::ExerciseNotFound => {
                ApiError::NotFound(err.to_string())
            }
            SubmissionError::Backend(e) => ApiError::backend("Error loading exercise")(e),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::WrongCurrentPassword => {
                let message = err.to_string();
                tracing::warn!("Profile update rejected: {}", message);
                ApiError::Validation {
                    fields: BTreeMap::from([("current_password".to_string(), message.clone())]),
                    message,
                }
            }
            ProfileError::Backend(e) => ApiError::backend_surfaced("Error updating profile")(e),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", err);
        ApiError::Internal("Internal server error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let json_response = match self {
            ApiError::Validation { message, fields } => serde_json::json!({
                "message": message,
                "status": status.as_u16(),
                "fields": fields,
            }),
            ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::BadGateway(message)
            | ApiError::Internal(message) => serde_json::json!({
                "message": message,
                "status": status.as_u16()
            }),
        };
        (status, Json(json_response)).into_response()
    }
}
