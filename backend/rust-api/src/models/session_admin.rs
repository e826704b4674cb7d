use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{null_as_default, Connect};

/// Cumulative dashboard time of an administrator (`session-admins` collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAdmin {
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    #[serde(rename = "sessionTime", default, deserialize_with = "null_as_default")]
    pub session_time: u64,
}

#[derive(Debug, Serialize)]
pub struct NewSessionAdminPayload {
    #[serde(rename = "sessionTime")]
    pub session_time: u64,
    pub administrator: Connect,
}

impl NewSessionAdminPayload {
    pub fn start(administrator_id: i64) -> Self {
        Self {
            session_time: 0,
            administrator: Connect::id(administrator_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionTimePayload {
    #[serde(rename = "sessionTime")]
    pub session_time: u64,
}

/// Snapshot of a running (or just stopped) dashboard timer
#[derive(Debug, Clone, Serialize)]
pub struct TimerSnapshot {
    pub timer_id: Uuid,
    pub administrator_id: i64,
    pub session_document_id: String,
    pub seconds: u64,
    pub formatted: String,
    pub started_at: DateTime<Utc>,
}

/// `HH:MM:SS`, hours unbounded
pub fn format_seconds(total: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
