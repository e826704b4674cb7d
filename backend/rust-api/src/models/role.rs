use serde::{Deserialize, Serialize};

/// Backend label written on administrator records
pub const ADMINISTRATOR_LABEL: &str = "Administrador";
/// Backend label written on practicant records
pub const PRACTICANT_LABEL: &str = "Practicante";

/// Roles that may sign in. Every gate matches on this exhaustively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Practicant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Practicant => "practicant",
        }
    }

    /// Label stored in the backend `role` attribute.
    pub fn backend_label(&self) -> &'static str {
        match self {
            Role::Administrator => ADMINISTRATOR_LABEL,
            Role::Practicant => PRACTICANT_LABEL,
        }
    }

    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Administrator => "/admin/dashboard",
            Role::Practicant => "/practicant/dashboard",
        }
    }

    /// Normalizes the role string returned by the login endpoint.
    pub fn from_backend(raw: &str) -> Option<Self> {
        match raw.trim() {
            ADMINISTRATOR_LABEL => Some(Role::Administrator),
            PRACTICANT_LABEL => Some(Role::Practicant),
            other => match other.to_lowercase().as_str() {
                "administrator" | "administrador" => Some(Role::Administrator),
                "practicant" | "practicante" => Some(Role::Practicant),
                _ => None,
            },
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backend_labels() {
        assert_eq!(Role::from_backend("Administrador"), Some(Role::Administrator));
        assert_eq!(Role::from_backend("Practicante"), Some(Role::Practicant));
        assert_eq!(Role::from_backend("PRACTICANT"), Some(Role::Practicant));
        assert_eq!(Role::from_backend("teacher"), None);
        assert_eq!(Role::from_backend(""), None);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Role::Administrator).unwrap(),
            "\"administrator\""
        );
        assert_eq!(Role::Practicant.dashboard_path(), "/practicant/dashboard");
    }
}
