use crate::models::practicant::{
    Practicant, PracticantPayload, PracticantRow, ProfileUpdatePayload, UpdatePracticantRequest,
    UpdateProfileRequest,
};
use crate::models::{search_rows, without_row};
use crate::services::strapi::{StrapiClient, StrapiError, StrapiQuery};

const COLLECTION: &str = "practicants";
const WRONG_CURRENT_PASSWORD: &str = "La contraseña actual es incorrecta";

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("The current password is incorrect")]
    WrongCurrentPassword,
    #[error(transparent)]
    Backend(StrapiError),
}

impl From<StrapiError> for ProfileError {
    fn from(err: StrapiError) -> Self {
        match err.backend_message() {
            Some(WRONG_CURRENT_PASSWORD) => ProfileError::WrongCurrentPassword,
            _ => ProfileError::Backend(err),
        }
    }
}

pub struct PracticantService {
    strapi: StrapiClient,
}

impl PracticantService {
    pub fn new(strapi: StrapiClient) -> Self {
        Self { strapi }
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        reveal_passwords: bool,
    ) -> Result<Vec<PracticantRow>, StrapiError> {
        let records: Vec<Practicant> = self.strapi.list(COLLECTION, &StrapiQuery::new()).await?;
        let rows = records
            .into_iter()
            .map(|record| PracticantRow::from_record(record, reveal_passwords))
            .collect();
        Ok(search_rows(rows, search))
    }

    pub async fn count(&self) -> Result<usize, StrapiError> {
        let records: Vec<Practicant> = self.strapi.list(COLLECTION, &StrapiQuery::new()).await?;
        Ok(records.len())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Practicant>, StrapiError> {
        let query = StrapiQuery::new().filter_eq(&["email_practicant"], email);
        self.strapi.first(COLLECTION, &query).await
    }

    pub async fn update(
        &self,
        id: &str,
        req: UpdatePracticantRequest,
    ) -> Result<PracticantRow, StrapiError> {
        let payload = PracticantPayload::from(req);
        let updated: Practicant = self.strapi.update(COLLECTION, id, &payload).await?;
        tracing::info!("Practicant {} updated", id);
        Ok(PracticantRow::from_record(updated, false))
    }

    pub async fn delete(&self, id: &str) -> Result<Vec<PracticantRow>, StrapiError> {
        let displayed = self.list(None, false).await?;
        self.strapi.delete(COLLECTION, id).await?;
        tracing::info!("Practicant {} deleted", id);
        Ok(without_row(displayed, id))
    }

    /// Own-profile update through the backend's custom endpoint. The caller
    /// validates the request first.
    pub async fn update_profile(
        &self,
        document_id: &str,
        req: UpdateProfileRequest,
    ) -> Result<(), ProfileError> {
        let changing_password = req.is_changing_password();
        let payload = ProfileUpdatePayload::new(document_id.to_string(), req);
        self.strapi
            .post_raw("practicants/update-profile", &payload)
            .await?;
        tracing::info!(
            "Practicant {} updated profile (password changed: {})",
            document_id,
            changing_password
        );
        Ok(())
    }
}
