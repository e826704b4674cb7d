use serde::{Deserialize, Serialize};

use super::{null_as_default, Connect, EntityRef};

/// Per-(practicant, topic) completion row (`progresses` collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: u8,
    #[serde(default)]
    pub topic: Option<EntityRef>,
}

#[derive(Debug, Serialize)]
pub struct NewProgressPayload {
    pub progress: u8,
    pub practicant: Connect,
    pub topic: Connect,
}

impl NewProgressPayload {
    pub fn initial(practicant_document_id: &str, topic_document_id: &str) -> Self {
        Self {
            progress: 0,
            practicant: Connect::document(practicant_document_id),
            topic: Connect::document(topic_document_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressValue {
    pub progress: u8,
}

/// Result of an increment, reported back to the submitter
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ProgressChange {
    pub previous: u8,
    pub current: u8,
}
