use crate::models::exercise::{Exercise, ExerciseForm, ExercisePayload, ExerciseView};
use crate::services::strapi::{StrapiClient, StrapiError, StrapiQuery};

const COLLECTION: &str = "exercises";

pub struct ExerciseService {
    strapi: StrapiClient,
}

impl ExerciseService {
    pub fn new(strapi: StrapiClient) -> Self {
        Self { strapi }
    }

    pub async fn list(&self) -> Result<Vec<ExerciseView>, StrapiError> {
        let query = StrapiQuery::new().populate_all();
        let exercises: Vec<Exercise> = self.strapi.list(COLLECTION, &query).await?;
        Ok(exercises.into_iter().map(ExerciseView::from).collect())
    }

    pub async fn count(&self) -> Result<usize, StrapiError> {
        let exercises: Vec<Exercise> = self.strapi.list(COLLECTION, &StrapiQuery::new()).await?;
        Ok(exercises.len())
    }

    /// Numeric ids are looked up by `filters[id][$eq]`; anything else is
    /// taken as a documentId.
    pub async fn resolve_document_id(&self, key: &str) -> Result<String, StrapiError> {
        if key.parse::<i64>().is_err() {
            return Ok(key.to_string());
        }
        let query = StrapiQuery::new().filter_eq(&["id"], key);
        let exercise: Option<Exercise> = self.strapi.first(COLLECTION, &query).await?;
        exercise
            .map(|exercise| exercise.document_id)
            .ok_or_else(|| StrapiError::NotFound(format!("exercise {}", key)))
    }

    pub async fn get(&self, id: &str) -> Result<ExerciseView, StrapiError> {
        let query = StrapiQuery::new().populate_all();
        let exercise: Exercise = self.strapi.find(COLLECTION, id, &query).await?;
        Ok(ExerciseView::from(exercise))
    }

    /// The caller validates the form first.
    pub async fn create(&self, form: ExerciseForm) -> Result<ExerciseView, StrapiError> {
        let payload = ExercisePayload::from(form);
        let created: Exercise = self.strapi.create(COLLECTION, &payload).await?;
        tracing::info!(
            "Exercise '{}' created ({})",
            created.name_exercise,
            created.document_id
        );
        Ok(ExerciseView::from(created))
    }

    pub async fn update(&self, id: &str, form: ExerciseForm) -> Result<ExerciseView, StrapiError> {
        let payload = ExercisePayload::from(form);
        let updated: Exercise = self.strapi.update(COLLECTION, id, &payload).await?;
        tracing::info!("Exercise {} updated", id);
        Ok(ExerciseView::from(updated))
    }

    pub async fn delete(&self, id: &str) -> Result<(), StrapiError> {
        self.strapi.delete(COLLECTION, id).await?;
        tracing::info!("Exercise {} deleted", id);
        Ok(())
    }
}
