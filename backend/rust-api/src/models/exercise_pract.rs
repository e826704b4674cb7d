use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{null_as_default, Connect, EntityRef};

pub const STATUS_COMPLETED: &str = "Completado";
pub const STATUS_PENDING: &str = "Pendiente";

/// One recorded attempt (`exercise-practs` collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExercisePract {
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    #[serde(rename = "isCorrectExercise", default, deserialize_with = "null_as_default")]
    pub is_correct_exercise: bool,
    #[serde(rename = "Status_Exercise", default)]
    pub status_exercise: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exercise: Option<EntityRef>,
    #[serde(default)]
    pub practicant: Option<EntityRef>,
}

/// `data` payload creating an attempt record
#[derive(Debug, Serialize)]
pub struct ExercisePractPayload {
    #[serde(rename = "isCorrectExercise")]
    pub is_correct_exercise: bool,
    #[serde(rename = "Status_Exercise")]
    pub status_exercise: &'static str,
    pub completed_at: Option<String>,
    /// Always 1: every submission is its own record
    pub attemps: u32,
    pub practicant: Connect,
    pub exercise: Connect,
}

impl ExercisePractPayload {
    pub fn new(
        practicant_document_id: &str,
        exercise_document_id: &str,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            is_correct_exercise: is_correct,
            status_exercise: if is_correct {
                STATUS_COMPLETED
            } else {
                STATUS_PENDING
            },
            completed_at: is_correct.then(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            attemps: 1,
            practicant: Connect::document(practicant_document_id),
            exercise: Connect::document(exercise_document_id),
        }
    }
}
