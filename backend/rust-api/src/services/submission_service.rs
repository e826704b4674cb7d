//! Exercise submission: run the code, grade it, record the attempt and
//! raise the topic progress on a correct answer.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::metrics::record_submission;
use crate::models::auth::SessionUser;
use crate::models::exercise::Exercise;
use crate::models::exercise_pract::{ExercisePract, ExercisePractPayload};
use crate::models::progress::ProgressChange;
use crate::models::submission::{
    ErrorKind, ExerciseState, ExerciseStateView, SubmissionResponse, Verdict,
};
use crate::services::judge::{grade, transport_output, CodeRunner};
use crate::services::progress_service::ProgressService;
use crate::services::strapi::{StrapiClient, StrapiError};
use crate::services::topic_service::TopicService;
use crate::services::exercise_service::ExerciseService;
use crate::services::AppState;

pub const MSG_CORRECT: &str = "Excellent! Your solution is correct.";
pub const MSG_INCORRECT: &str = "The output does not match the expected one. Review your code.";
pub const MSG_EXECUTION_ERROR: &str = "Error during execution";

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Please write your code before submitting")]
    EmptyCode,
    #[error("Topic not found")]
    TopicNotFound,
    #[error("Exercise not found")]
    ExerciseNotFound,
    #[error(transparent)]
    Backend(#[from] StrapiError),
}

#[derive(Debug, Clone)]
struct TrackedState {
    state: ExerciseState,
    output: Option<String>,
}

/// In-memory state machine per (practicant, exercise documentId).
#[derive(Default)]
pub struct SubmissionTracker {
    states: Mutex<HashMap<(String, String), TrackedState>>,
}

impl SubmissionTracker {
    pub fn begin(&self, practicant: &str, exercise: &str) {
        self.set(practicant, exercise, ExerciseState::Submitting, None);
    }

    pub fn finish(&self, practicant: &str, exercise: &str, state: ExerciseState, output: String) {
        self.set(practicant, exercise, state, Some(output));
    }

    pub fn get(&self, practicant: &str, exercise: &str) -> ExerciseStateView {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let tracked = states.get(&(practicant.to_string(), exercise.to_string()));
        ExerciseStateView {
            exercise_id: exercise.to_string(),
            state: tracked.map(|t| t.state).unwrap_or_default(),
            output: tracked.and_then(|t| t.output.clone()),
        }
    }

    fn set(&self, practicant: &str, exercise: &str, state: ExerciseState, output: Option<String>) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.insert(
            (practicant.to_string(), exercise.to_string()),
            TrackedState { state, output },
        );
    }
}

pub struct SubmissionService<'a> {
    strapi: &'a StrapiClient,
    runner: &'a dyn CodeRunner,
    progress: &'a ProgressService,
    tracker: &'a SubmissionTracker,
}

impl<'a> SubmissionService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            strapi: &state.strapi,
            runner: state.judge.as_ref(),
            progress: &state.progress,
            tracker: &state.submissions,
        }
    }

    pub async fn submit(
        &self,
        user: &SessionUser,
        topic_document_id: &str,
        exercise_key: &str,
        code: &str,
    ) -> Result<SubmissionResponse, SubmissionError> {
        if code.trim().is_empty() {
            tracing::warn!(
                "Empty submission from practicant {} for exercise {}",
                user.document_id,
                exercise_key
            );
            record_submission("empty");
            return Err(SubmissionError::EmptyCode);
        }

        let topic = TopicService::new(self.strapi.clone())
            .detail(topic_document_id)
            .await
            .map_err(|e| match e {
                StrapiError::NotFound(_) => SubmissionError::TopicNotFound,
                other => SubmissionError::Backend(other),
            })?;
        let total_exercises = topic.exercises.len();
        let exercise = topic
            .exercises
            .into_iter()
            .find(|exercise| exercise.is_identified_by(exercise_key))
            .ok_or(SubmissionError::ExerciseNotFound)?;

        self.tracker.begin(&user.document_id, &exercise.document_id);
        tracing::info!(
            "Practicant {} submitted exercise {} of topic {}",
            user.document_id,
            exercise.document_id,
            topic.document_id
        );

        let verdict = match self.runner.run(code).await {
            Ok(result) => grade(&result, &exercise.expected_output),
            Err(e) => {
                tracing::error!("Code runner failed for exercise {}: {}", exercise.document_id, e);
                let output = transport_output(&e);
                self.tracker.finish(
                    &user.document_id,
                    &exercise.document_id,
                    ExerciseState::Errored,
                    output.clone(),
                );
                record_submission("transport");
                return Ok(SubmissionResponse {
                    state: ExerciseState::Errored,
                    error_kind: Some(ErrorKind::Transport),
                    output,
                    message: MSG_EXECUTION_ERROR.to_string(),
                    attempt_recorded: false,
                    progress_updated: false,
                    progress: None,
                });
            }
        };

        let attempt_recorded = self.record_attempt(user, &exercise, verdict.is_correct).await;

        let progress = if verdict.is_correct {
            self.raise_progress(user, &topic.document_id, total_exercises)
                .await
        } else {
            None
        };

        let state = verdict.state();
        self.tracker
            .finish(&user.document_id, &exercise.document_id, state, verdict.output.clone());
        record_submission(outcome_label(&verdict));

        Ok(SubmissionResponse {
            state,
            error_kind: verdict.error,
            message: message_for(&verdict).to_string(),
            output: verdict.output,
            attempt_recorded,
            progress_updated: progress.is_some(),
            progress,
        })
    }

    /// State of one exercise, by documentId or numeric id. An unknown
    /// numeric id reads as idle.
    pub async fn state(
        &self,
        user: &SessionUser,
        exercise_key: &str,
    ) -> Result<ExerciseStateView, StrapiError> {
        let document_id = match ExerciseService::new(self.strapi.clone())
            .resolve_document_id(exercise_key)
            .await
        {
            Ok(document_id) => document_id,
            Err(StrapiError::NotFound(_)) => exercise_key.to_string(),
            Err(e) => return Err(e),
        };
        Ok(self.tracker.get(&user.document_id, &document_id))
    }

    async fn record_attempt(&self, user: &SessionUser, exercise: &Exercise, is_correct: bool) -> bool {
        let payload = ExercisePractPayload::new(
            &user.document_id,
            &exercise.document_id,
            is_correct,
            Utc::now(),
        );
        match self
            .strapi
            .create::<_, ExercisePract>("exercise-practs", &payload)
            .await
        {
            Ok(record) => {
                tracing::info!(
                    "Attempt {} recorded (correct: {})",
                    record.document_id,
                    is_correct
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    "Could not record attempt of practicant {} on exercise {}: {}",
                    user.document_id,
                    exercise.document_id,
                    e
                );
                false
            }
        }
    }

    /// A failed increment is parked by the progress service.
    async fn raise_progress(
        &self,
        user: &SessionUser,
        topic_document_id: &str,
        total_exercises: usize,
    ) -> Option<ProgressChange> {
        self.progress
            .increment(&user.document_id, topic_document_id, total_exercises)
            .await
            .ok()
    }
}

fn message_for(verdict: &Verdict) -> &'static str {
    match verdict.state() {
        ExerciseState::Correct => MSG_CORRECT,
        ExerciseState::Incorrect => MSG_INCORRECT,
        _ => MSG_EXECUTION_ERROR,
    }
}

fn outcome_label(verdict: &Verdict) -> &'static str {
    match (verdict.is_correct, verdict.error) {
        (true, _) => "correct",
        (false, None) => "incorrect",
        (false, Some(ErrorKind::Runtime)) => "runtime_error",
        (false, Some(ErrorKind::Compile)) => "compile_error",
        (false, Some(ErrorKind::Transport)) => "transport",
    }
}
