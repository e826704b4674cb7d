//! Topic progress: bootstrap, increment and the outbox of missed increments.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::metrics::{PROGRESS_INCREMENTS_TOTAL, PROGRESS_OUTBOX_PENDING};
use crate::models::progress::{NewProgressPayload, Progress, ProgressChange, ProgressValue};
use crate::services::strapi::{StrapiClient, StrapiError, StrapiQuery};

const COLLECTION: &str = "progresses";

/// Amount a correct submission adds to the topic progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ProgressStep {
    /// Fixed percentage points per correct submission
    Fixed(u8),
    /// `ceil(100 / exercises in the topic)`
    PerExercise,
}

impl Default for ProgressStep {
    fn default() -> Self {
        ProgressStep::Fixed(20)
    }
}

impl FromStr for ProgressStep {
    type Err = String;

    /// `fixed`, `fixed:<1..=100>` or `per_exercise`
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim().to_lowercase();
        match raw.split_once(':') {
            None if raw == "fixed" => Ok(ProgressStep::default()),
            None if raw == "per_exercise" => Ok(ProgressStep::PerExercise),
            Some(("fixed", amount)) => match amount.trim().parse::<u8>() {
                Ok(n) if (1..=100).contains(&n) => Ok(ProgressStep::Fixed(n)),
                _ => Err(format!("invalid progress step amount: {}", amount)),
            },
            _ => Err(format!("invalid progress step: {}", raw)),
        }
    }
}

impl TryFrom<String> for ProgressStep {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl ProgressStep {
    pub fn amount(&self, total_exercises: usize) -> u8 {
        match self {
            ProgressStep::Fixed(n) => *n,
            ProgressStep::PerExercise if total_exercises == 0 => 100,
            ProgressStep::PerExercise => 100usize.div_ceil(total_exercises).min(100) as u8,
        }
    }
}

/// `current + step`, capped at 100
pub fn next_progress(current: u8, step: u8) -> u8 {
    current.saturating_add(step).min(100)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub practicant: String,
    pub topic: String,
}

impl ProgressKey {
    pub fn new(practicant_document_id: &str, topic_document_id: &str) -> Self {
        Self {
            practicant: practicant_document_id.to_string(),
            topic: topic_document_id.to_string(),
        }
    }
}

/// Increments that could not be written after the attempt was recorded.
#[derive(Default)]
pub struct ProgressOutbox {
    pending: Mutex<HashMap<ProgressKey, u32>>,
}

impl ProgressOutbox {
    pub fn park(&self, key: &ProgressKey, increments: u32) {
        if increments == 0 {
            return;
        }
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        *pending.entry(key.clone()).or_default() += increments;
        PROGRESS_OUTBOX_PENDING.add(i64::from(increments));
    }

    pub fn take(&self, key: &ProgressKey) -> u32 {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let taken = pending.remove(key).unwrap_or(0);
        PROGRESS_OUTBOX_PENDING.sub(i64::from(taken));
        taken
    }

    pub fn pending(&self, key: &ProgressKey) -> u32 {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

pub struct ProgressService {
    strapi: StrapiClient,
    step: ProgressStep,
    locks: Mutex<HashMap<ProgressKey, Arc<tokio::sync::Mutex<()>>>>,
    /// documentId of rows already bootstrapped in this process
    known_rows: Mutex<HashMap<ProgressKey, String>>,
    outbox: ProgressOutbox,
}

impl ProgressService {
    pub fn new(strapi: StrapiClient, step: ProgressStep) -> Self {
        Self {
            strapi,
            step,
            locks: Mutex::new(HashMap::new()),
            known_rows: Mutex::new(HashMap::new()),
            outbox: ProgressOutbox::default(),
        }
    }

    pub fn step(&self) -> ProgressStep {
        self.step
    }

    pub fn outbox(&self) -> &ProgressOutbox {
        &self.outbox
    }

    fn lock_for(&self, key: &ProgressKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(key.clone()).or_default().clone()
    }

    /// Returns the progress row, creating it at 0 when absent, then applies
    /// any parked increments for the pair.
    pub async fn bootstrap(
        &self,
        practicant_document_id: &str,
        topic_document_id: &str,
        total_exercises: usize,
    ) -> Result<Progress, StrapiError> {
        let key = ProgressKey::new(practicant_document_id, topic_document_id);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        let row = self.ensure_locked(&key).await?;
        let parked = self.outbox.take(&key);
        if parked == 0 {
            return Ok(row);
        }

        tracing::info!(
            "Applying {} parked progress increment(s) for practicant {} topic {}",
            parked,
            key.practicant,
            key.topic
        );
        match self.apply(&row, parked, total_exercises).await {
            Ok(change) => Ok(Progress {
                progress: change.current,
                ..row
            }),
            Err(e) => {
                tracing::error!("Parked progress increment failed again: {}", e);
                self.outbox.park(&key, parked);
                Ok(row)
            }
        }
    }

    /// Raises progress by one step (plus parked steps). On failure the
    /// increments are parked and the error returned.
    pub async fn increment(
        &self,
        practicant_document_id: &str,
        topic_document_id: &str,
        total_exercises: usize,
    ) -> Result<ProgressChange, StrapiError> {
        let key = ProgressKey::new(practicant_document_id, topic_document_id);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        let increments = self.outbox.take(&key) + 1;
        let result = match self.ensure_locked(&key).await {
            Ok(row) => self.apply(&row, increments, total_exercises).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(change) => {
                PROGRESS_INCREMENTS_TOTAL.with_label_values(&["success"]).inc();
                tracing::info!(
                    "Progress for practicant {} topic {}: {} -> {}",
                    key.practicant,
                    key.topic,
                    change.previous,
                    change.current
                );
                Ok(change)
            }
            Err(e) => {
                PROGRESS_INCREMENTS_TOTAL.with_label_values(&["parked"]).inc();
                tracing::error!(
                    "Progress increment for practicant {} topic {} failed, parked {}: {}",
                    key.practicant,
                    key.topic,
                    increments,
                    e
                );
                self.outbox.park(&key, increments);
                Err(e)
            }
        }
    }

    async fn apply(
        &self,
        row: &Progress,
        increments: u32,
        total_exercises: usize,
    ) -> Result<ProgressChange, StrapiError> {
        let step = self.step.amount(total_exercises);
        let current = (0..increments).fold(row.progress, |value, _| next_progress(value, step));

        self.strapi
            .update_discard(
                COLLECTION,
                &row.document_id,
                &ProgressValue { progress: current },
            )
            .await?;

        Ok(ProgressChange {
            previous: row.progress,
            current,
        })
    }

    /// Caller holds the key lock.
    async fn ensure_locked(&self, key: &ProgressKey) -> Result<Progress, StrapiError> {
        let known = self
            .known_rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned();

        if let Some(document_id) = known {
            match self
                .strapi
                .find::<Progress>(COLLECTION, &document_id, &StrapiQuery::new())
                .await
            {
                Ok(row) => return Ok(row),
                Err(StrapiError::NotFound(_)) => {
                    tracing::warn!("Progress row {} vanished, bootstrapping again", document_id);
                    self.forget(key);
                }
                Err(e) => return Err(e),
            }
        }

        let query = StrapiQuery::new()
            .filter_eq(&["practicant", "documentId"], &key.practicant)
            .filter_eq(&["topic", "documentId"], &key.topic);

        let row = match self.strapi.first::<Progress>(COLLECTION, &query).await? {
            Some(row) => row,
            None => {
                tracing::info!(
                    "Creating progress row for practicant {} topic {}",
                    key.practicant,
                    key.topic
                );
                self.strapi
                    .create(
                        COLLECTION,
                        &NewProgressPayload::initial(&key.practicant, &key.topic),
                    )
                    .await?
            }
        };

        self.known_rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), row.document_id.clone());

        Ok(row)
    }

    fn forget(&self, key: &ProgressKey) {
        self.known_rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}
