use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::role::Role;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User part of a session, normalized across both roles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub id: i64,
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub name: String,
    pub email: String,
}

impl SessionUser {
    /// Builds the user from the login response's `data.user` object.
    pub fn from_login_data(data: &Value) -> Self {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| data.get(*key).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string()
        };
        Self {
            id: data.get("id").and_then(Value::as_i64).unwrap_or_default(),
            document_id: text(&["documentId"]),
            name: text(&["name_administrator", "name_practicant", "name_pract"]),
            email: text(&["email_administrator", "email_practicant"]),
        }
    }
}

/// Signed-in client: inserted into request extensions by the auth middleware
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub user: SessionUser,
    pub token: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub user: SessionUser,
    pub redirect_to: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_administrator_fields() {
        let user = SessionUser::from_login_data(&json!({
            "id": 2,
            "documentId": "adm2",
            "name_administrator": "Laura",
            "email_administrator": "laura@startdev.io",
            "role": "Administrador"
        }));
        assert_eq!(user.name, "Laura");
        assert_eq!(user.email, "laura@startdev.io");
        assert_eq!(user.document_id, "adm2");
    }

    #[test]
    fn reads_practicant_fields() {
        let user = SessionUser::from_login_data(&json!({
            "id": 9,
            "documentId": "p9",
            "name_practicant": "Iván",
            "email_practicant": "ivan@startdev.io"
        }));
        assert_eq!(user.id, 9);
        assert_eq!(user.name, "Iván");
    }
}
