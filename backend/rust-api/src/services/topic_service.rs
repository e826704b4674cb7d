use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;

use crate::models::topic::{
    Topic, TopicForm, TopicFormView, TopicPayload, TopicSummary, UploadFile, UploadReport,
};
use crate::services::strapi::{StrapiClient, StrapiError, StrapiQuery, UploadPart, UploadTarget};

const COLLECTION: &str = "topics";
const TOPIC_MODEL: &str = "api::topic.topic";

#[derive(Debug, Clone, Serialize)]
pub struct TopicSaved {
    pub topic: TopicSummary,
    pub uploads: Vec<UploadReport>,
}

pub struct TopicService {
    strapi: StrapiClient,
}

impl TopicService {
    pub fn new(strapi: StrapiClient) -> Self {
        Self { strapi }
    }

    pub async fn list(&self) -> Result<Vec<TopicSummary>, StrapiError> {
        let topics: Vec<Topic> = self.strapi.list(COLLECTION, &StrapiQuery::new()).await?;
        Ok(topics.into_iter().map(TopicSummary::from).collect())
    }

    /// Topics with their exercises populated (practicant dashboard).
    pub async fn list_with_exercises(&self) -> Result<Vec<Topic>, StrapiError> {
        let query = StrapiQuery::new().populate_list(&["exercises"]);
        self.strapi.list(COLLECTION, &query).await
    }

    /// Creates the topic, then uploads the files of each resource to
    /// `Resources[i].type_resource`. Upload failures are reported, not
    /// returned as errors. The caller validates the form first.
    pub async fn create(&self, form: TopicForm) -> Result<TopicSaved, StrapiError> {
        let payload = TopicPayload::from(&form);
        let created: Topic = self.strapi.create(COLLECTION, &payload).await?;
        tracing::info!(
            "Topic '{}' created (id {}, {})",
            created.name_topic,
            created.id,
            created.document_id
        );

        let uploads = self.upload_resources(created.id, form).await;
        Ok(TopicSaved {
            topic: TopicSummary::from(created),
            uploads,
        })
    }

    async fn upload_resources(&self, topic_id: i64, form: TopicForm) -> Vec<UploadReport> {
        let mut uploads = Vec::new();
        for (index, resource) in form.resources.into_iter().enumerate() {
            if resource.files.is_empty() {
                continue;
            }
            uploads.push(self.upload_resource_files(topic_id, index, resource.files).await);
        }
        uploads
    }

    async fn upload_resource_files(
        &self,
        topic_id: i64,
        index: usize,
        files: Vec<UploadFile>,
    ) -> UploadReport {
        let count = files.len();
        let parts = match decode_files(files) {
            Ok(parts) => parts,
            Err(message) => {
                tracing::warn!("Resource {} of topic {}: {}", index, topic_id, message);
                return UploadReport {
                    resource_index: index,
                    uploaded: 0,
                    error: Some(message),
                };
            }
        };

        let target = UploadTarget {
            model: TOPIC_MODEL.to_string(),
            record_id: topic_id,
            field: format!("Resources[{}].type_resource", index),
        };
        match self.strapi.upload(&target, parts).await {
            Ok(_) => {
                tracing::info!(
                    "Uploaded {} file(s) to {} of topic {}",
                    count,
                    target.field,
                    topic_id
                );
                UploadReport {
                    resource_index: index,
                    uploaded: count,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!("Upload to {} of topic {} failed: {}", target.field, topic_id, e);
                UploadReport {
                    resource_index: index,
                    uploaded: 0,
                    error: Some("Error uploading resource files".to_string()),
                }
            }
        }
    }

    /// Numeric ids are looked up by `filters[id][$eq]`; anything else is
    /// taken as a documentId.
    pub async fn resolve_document_id(&self, key: &str) -> Result<String, StrapiError> {
        if key.parse::<i64>().is_err() {
            return Ok(key.to_string());
        }
        let query = StrapiQuery::new().filter_eq(&["id"], key);
        let topic: Option<Topic> = self.strapi.first(COLLECTION, &query).await?;
        topic
            .map(|topic| topic.document_id)
            .ok_or_else(|| StrapiError::NotFound(format!("topic {}", key)))
    }

    pub async fn load_form(&self, key: &str) -> Result<TopicFormView, StrapiError> {
        let document_id = self.resolve_document_id(key).await?;
        let query = StrapiQuery::new().populate_list(&["Resources", "Examples"]);
        let topic: Topic = self.strapi.find(COLLECTION, &document_id, &query).await?;
        Ok(TopicFormView::from(topic))
    }

    /// PUT by documentId, then uploads new resource files against the
    /// numeric id the backend returns. The caller validates the form first.
    pub async fn update(&self, key: &str, form: TopicForm) -> Result<TopicSaved, StrapiError> {
        let document_id = self.resolve_document_id(key).await?;
        let payload = TopicPayload::from(&form);
        let updated: Topic = self.strapi.update(COLLECTION, &document_id, &payload).await?;
        tracing::info!("Topic {} updated (id {})", document_id, updated.id);

        let uploads = self.upload_resources(updated.id, form).await;
        Ok(TopicSaved {
            topic: TopicSummary::from(updated),
            uploads,
        })
    }

    /// Topic with resources, examples and exercises populated.
    pub async fn detail(&self, document_id: &str) -> Result<Topic, StrapiError> {
        let query = StrapiQuery::new()
            .filter_eq(&["documentId"], document_id)
            .populate_deep("exercises")
            .populate_deep("Resources")
            .populate_deep("Examples");
        self.strapi
            .first(COLLECTION, &query)
            .await?
            .ok_or_else(|| StrapiError::NotFound(format!("topic {}", document_id)))
    }
}

fn decode_files(files: Vec<UploadFile>) -> Result<Vec<UploadPart>, String> {
    files
        .into_iter()
        .map(|file| {
            let bytes = BASE64
                .decode(file.data.trim())
                .map_err(|e| format!("file '{}' is not valid base64: {}", file.file_name, e))?;
            Ok(UploadPart {
                file_name: file.file_name,
                content_type: file.content_type,
                bytes,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, data: &str) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: Some("application/pdf".to_string()),
            data: data.to_string(),
        }
    }

    #[test]
    fn decodes_base64_files() {
        let parts = decode_files(vec![file("guide.pdf", "JVBERi0=")]).unwrap();
        assert_eq!(parts[0].bytes, b"%PDF-");
        assert_eq!(parts[0].content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = decode_files(vec![file("broken.pdf", "***")]).unwrap_err();
        assert!(err.contains("broken.pdf"));
    }
}
