use crate::models::administrator::{
    Administrator, AdministratorPayload, AdministratorRow, CreateAdministratorRequest,
    UpdateAdministratorRequest,
};
use crate::models::{search_rows, without_row};
use crate::services::strapi::{StrapiClient, StrapiError, StrapiQuery};

const COLLECTION: &str = "administrators";

pub struct AdministratorService {
    strapi: StrapiClient,
}

impl AdministratorService {
    pub fn new(strapi: StrapiClient) -> Self {
        Self { strapi }
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        reveal_passwords: bool,
    ) -> Result<Vec<AdministratorRow>, StrapiError> {
        let records: Vec<Administrator> = self.strapi.list(COLLECTION, &StrapiQuery::new()).await?;
        let rows = records
            .into_iter()
            .map(|record| AdministratorRow::from_record(record, reveal_passwords))
            .collect();
        Ok(search_rows(rows, search))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Administrator>, StrapiError> {
        let query = StrapiQuery::new().filter_eq(&["email_administrator"], email);
        self.strapi.first(COLLECTION, &query).await
    }

    /// Caller validates the request first.
    pub async fn create(&self, req: CreateAdministratorRequest) -> Result<AdministratorRow, StrapiError> {
        let payload = AdministratorPayload::from(req);
        let created: Administrator = self.strapi.create(COLLECTION, &payload).await?;
        tracing::info!(
            "Administrator {} created ({})",
            created.email_administrator,
            created.document_id
        );
        Ok(AdministratorRow::from_record(created, false))
    }

    pub async fn update(
        &self,
        id: &str,
        req: UpdateAdministratorRequest,
    ) -> Result<AdministratorRow, StrapiError> {
        let payload = AdministratorPayload::from(req);
        let updated: Administrator = self.strapi.update(COLLECTION, id, &payload).await?;
        tracing::info!("Administrator {} updated", id);
        Ok(AdministratorRow::from_record(updated, false))
    }

    /// Deletes one administrator and returns the list as it was before the
    /// call minus that row.
    pub async fn delete(&self, id: &str) -> Result<Vec<AdministratorRow>, StrapiError> {
        let displayed = self.list(None, false).await?;
        self.strapi.delete(COLLECTION, id).await?;
        tracing::info!("Administrator {} deleted", id);
        Ok(without_row(displayed, id))
    }
}
