use chrono::Utc;
use serde_json::{json, Value};

use crate::metrics::record_login;
use crate::models::auth::{AuthSession, LoginRequest, SessionUser};
use crate::models::practicant::{NewPracticantPayload, Practicant, RegisterPracticantRequest};
use crate::models::role::Role;
use crate::services::strapi::{StrapiClient, StrapiError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Your role is not authorized to access the system")]
    RoleNotAuthorized,
}

pub struct AuthService {
    strapi: StrapiClient,
}

impl AuthService {
    pub fn new(strapi: StrapiClient) -> Self {
        Self { strapi }
    }

    /// Signs in against the backend and builds the session. The caller
    /// stores it.
    pub async fn login(&self, req: &LoginRequest) -> Result<AuthSession, AuthError> {
        let body = json!({ "email": req.email, "password": req.password });

        let response = match self.strapi.post_raw("practicant/auth/login", &body).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Login failed for {}: {}", req.email, e);
                record_login("invalid_credentials");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let session = session_from_login(&response).inspect_err(|e| {
            tracing::warn!("Login rejected for {}: {}", req.email, e);
            record_login(match e {
                AuthError::InvalidCredentials => "invalid_credentials",
                AuthError::RoleNotAuthorized => "role_not_authorized",
            });
        })?;

        record_login("success");
        tracing::info!("{} signed in as {}", req.email, session.role);
        Ok(session)
    }

    /// Self-registration of a practicant: one POST, no sign-in.
    pub async fn register(&self, req: RegisterPracticantRequest) -> Result<Practicant, StrapiError> {
        let email = req.email_practicant.clone();
        let payload = NewPracticantPayload::new(req, Utc::now());
        let created: Practicant = self.strapi.create("practicants", &payload).await?;
        tracing::info!("Registered practicant {} ({})", email, created.document_id);
        Ok(created)
    }
}

/// `{data: {jwt, role, user}}`; the role may also sit at the top level.
fn session_from_login(response: &Value) -> Result<AuthSession, AuthError> {
    let data = &response["data"];

    let raw_role = data["role"]
        .as_str()
        .or_else(|| response["role"].as_str())
        .filter(|role| !role.is_empty())
        .ok_or(AuthError::RoleNotAuthorized)?;
    let role = Role::from_backend(raw_role).ok_or(AuthError::RoleNotAuthorized)?;

    let token = data["jwt"]
        .as_str()
        .or_else(|| response["jwt"].as_str())
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidCredentials)?;

    let user = if data["user"].is_object() {
        &data["user"]
    } else {
        &response["user"]
    };

    Ok(AuthSession {
        user: SessionUser::from_login_data(user),
        token: token.to_string(),
        role,
    })
}
