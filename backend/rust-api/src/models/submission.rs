use serde::{Deserialize, Serialize};

use super::progress::ProgressChange;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitCodeRequest {
    #[serde(default)]
    pub code: String,
}

/// Per-(practicant, exercise) submission state.
///
/// `Idle → Submitting → {Correct, Incorrect, Errored}`; a new submission
/// always re-enters `Submitting`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseState {
    #[default]
    Idle,
    Submitting,
    Correct,
    Incorrect,
    Errored,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Runtime,
    Compile,
    Transport,
}

/// Graded output of one judge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub output: String,
    pub error: Option<ErrorKind>,
    pub is_correct: bool,
}

impl Verdict {
    pub fn state(&self) -> ExerciseState {
        match (self.is_correct, self.error) {
            (true, _) => ExerciseState::Correct,
            (false, None) => ExerciseState::Incorrect,
            (false, Some(_)) => ExerciseState::Errored,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResponse {
    pub state: ExerciseState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub output: String,
    pub message: String,
    pub attempt_recorded: bool,
    pub progress_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseStateView {
    pub exercise_id: String,
    pub state: ExerciseState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}
