use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::ValidationError;

pub mod administrator;
pub mod auth;
pub mod dashboard;
pub mod exercise;
pub mod exercise_pract;
pub mod practicant;
pub mod progress;
pub mod richtext;
pub mod role;
pub mod session_admin;
pub mod submission;
pub mod topic;

pub const MASKED_PASSWORD: &str = "••••••••";
pub const MISSING_PASSWORD: &str = "—";

/// Populated relation as it appears inside another record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityRef {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
}

/// Relation write: `{connect: [...]}`
#[derive(Debug, Clone, Serialize)]
pub struct Connect {
    pub connect: Vec<ConnectTarget>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ConnectTarget {
    Document {
        #[serde(rename = "documentId")]
        document_id: String,
    },
    Id(i64),
}

impl Connect {
    pub fn document(document_id: &str) -> Self {
        Self {
            connect: vec![ConnectTarget::Document {
                document_id: document_id.to_string(),
            }],
        }
    }

    pub fn id(id: i64) -> Self {
        Self {
            connect: vec![ConnectTarget::Id(id)],
        }
    }
}

/// `YYYY-MM-DD`
pub fn date_part(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Reads `null` as the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("This field is required".into()));
    }
    Ok(())
}

/// Row of an admin CRUD panel
pub trait PanelRow {
    fn id(&self) -> i64;
    fn document_id(&self) -> &str;
    fn name(&self) -> &str;
    fn email(&self) -> &str;

    /// Path segments address a row by numeric id or documentId.
    fn is_identified_by(&self, key: &str) -> bool {
        self.document_id() == key || key.parse::<i64>().map_or(false, |id| id == self.id())
    }
}

impl PanelRow for administrator::AdministratorRow {
    fn id(&self) -> i64 {
        self.id
    }
    fn document_id(&self) -> &str {
        &self.document_id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn email(&self) -> &str {
        &self.email
    }
}

impl PanelRow for practicant::PracticantRow {
    fn id(&self) -> i64 {
        self.id
    }
    fn document_id(&self) -> &str {
        &self.document_id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn email(&self) -> &str {
        &self.email
    }
}

/// Case-insensitive match on name, email or id; blank terms keep every row.
pub fn search_rows<R: PanelRow>(rows: Vec<R>, term: Option<&str>) -> Vec<R> {
    let term = match term.map(str::trim).filter(|t| !t.is_empty()) {
        Some(term) => term.to_lowercase(),
        None => return rows,
    };
    rows.into_iter()
        .filter(|row| {
            row.name().to_lowercase().contains(&term)
                || row.email().to_lowercase().contains(&term)
                || row.id().to_string().contains(&term)
        })
        .collect()
}

/// The displayed list minus exactly the deleted row.
pub fn without_row<R: PanelRow>(rows: Vec<R>, key: &str) -> Vec<R> {
    rows.into_iter()
        .filter(|row| !row.is_identified_by(key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::administrator::AdministratorRow;
    use super::*;

    fn row(id: i64, name: &str, email: &str) -> AdministratorRow {
        AdministratorRow {
            id,
            document_id: format!("doc{}", id),
            name: name.to_string(),
            email: email.to_string(),
            password: MASKED_PASSWORD.to_string(),
            registered_on: None,
            role: "Admin".to_string(),
        }
    }

    #[test]
    fn search_matches_name_email_and_id() {
        let rows = vec![
            row(1, "Ana Torres", "ana@startdev.io"),
            row(12, "Luis", "luis@startdev.io"),
            row(3, "Marta", "marta@otra.org"),
        ];

        assert_eq!(search_rows(rows.clone(), Some("TORRES")).len(), 1);
        assert_eq!(search_rows(rows.clone(), Some("startdev")).len(), 2);
        assert_eq!(search_rows(rows.clone(), Some("12"))[0].name, "Luis");
        assert_eq!(search_rows(rows, Some("  ")).len(), 3);
    }

    #[test]
    fn delete_removes_exactly_one_row() {
        let rows = vec![row(1, "A", "a@x.io"), row(2, "B", "b@x.io"), row(3, "C", "c@x.io")];

        let remaining = without_row(rows.clone(), "2");
        assert_eq!(remaining.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);

        let by_document = without_row(rows, "doc3");
        assert_eq!(by_document.len(), 2);
    }

    #[test]
    fn connect_serializes_both_forms() {
        assert_eq!(
            serde_json::to_value(Connect::document("d1")).unwrap(),
            serde_json::json!({"connect": [{"documentId": "d1"}]})
        );
        assert_eq!(
            serde_json::to_value(Connect::id(4)).unwrap(),
            serde_json::json!({"connect": [4]})
        );
    }
}
