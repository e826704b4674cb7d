use serde::{Deserialize, Serialize};
use validator::Validate;

use super::exercise::Exercise;
use super::{not_blank, null_as_default};
use super::richtext::{plain_text, RichText};

/// Topic as returned by the `topics` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    #[serde(rename = "documentId", default)]
    pub document_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name_topic: String,
    #[serde(default)]
    pub description: Option<RichText>,
    #[serde(default)]
    pub objectives: Option<RichText>,
    #[serde(rename = "Resources", default, deserialize_with = "null_as_default")]
    pub resources: Vec<Resource>,
    #[serde(rename = "Examples", default, deserialize_with = "null_as_default")]
    pub examples: Vec<CodeExample>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title_resource: String,
    #[serde(default)]
    pub url_resource: Option<String>,
    #[serde(default)]
    pub description_resource: Option<RichText>,
    #[serde(default)]
    pub type_resource: Option<MediaField>,
}

/// Uploaded media; single and multiple media fields both occur.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaField {
    Many(Vec<Media>),
    One(Media),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub mime: Option<String>,
}

impl MediaField {
    pub fn files(&self) -> Vec<&Media> {
        match self {
            MediaField::Many(files) => files.iter().collect(),
            MediaField::One(file) => vec![file],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExample {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title_example: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub code_snipped: String,
    #[serde(default)]
    pub explanation: Option<RichText>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Video,
    Document,
    Link,
}

impl ResourceKind {
    /// Classifies by keywords: "video" in title or description, then
    /// "pdf"/"document" in the description, else a plain link.
    pub fn classify(resource: &Resource) -> Self {
        let title = resource.title_resource.to_lowercase();
        let description = plain_text(&resource.description_resource, " ").to_lowercase();

        if description.contains("video") || title.contains("video") {
            ResourceKind::Video
        } else if description.contains("pdf") || description.contains("document") {
            ResourceKind::Document
        } else {
            ResourceKind::Link
        }
    }
}

/// File attached to a resource in the topic form
#[derive(Debug, Clone, Deserialize)]
pub struct UploadFile {
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Standard base64
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceInput {
    #[serde(default)]
    pub title_resource: String,
    #[serde(default)]
    pub url_resource: String,
    #[serde(default)]
    pub description_resource: String,
    #[serde(default)]
    pub files: Vec<UploadFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExampleInput {
    #[serde(default)]
    pub title_example: String,
    #[serde(default)]
    pub code_snipped: String,
    #[serde(default)]
    pub explanation: String,
}

/// Create/edit topic form
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TopicForm {
    #[validate(custom(function = "not_blank"))]
    pub name_topic: String,
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    #[validate(custom(function = "not_blank"))]
    pub objectives: String,
    #[serde(default)]
    pub resources: Vec<ResourceInput>,
    #[serde(default)]
    pub examples: Vec<ExampleInput>,
}

#[derive(Debug, Serialize)]
pub struct TopicPayload {
    pub name_topic: String,
    pub description: RichText,
    pub objectives: RichText,
    #[serde(rename = "Resources")]
    pub resources: Vec<ResourcePayload>,
    #[serde(rename = "Examples")]
    pub examples: Vec<ExamplePayload>,
}

#[derive(Debug, Serialize)]
pub struct ResourcePayload {
    pub title_resource: String,
    pub url_resource: String,
    pub description_resource: RichText,
}

#[derive(Debug, Serialize)]
pub struct ExamplePayload {
    pub title_example: String,
    pub code_snipped: String,
    pub explanation: RichText,
}

impl From<&TopicForm> for TopicPayload {
    fn from(form: &TopicForm) -> Self {
        Self {
            name_topic: form.name_topic.clone(),
            description: RichText::from_lines_or_blank(&form.description),
            objectives: RichText::from_lines_or_blank(&form.objectives),
            resources: form
                .resources
                .iter()
                .map(|r| ResourcePayload {
                    title_resource: r.title_resource.clone(),
                    url_resource: r.url_resource.clone(),
                    description_resource: RichText::from_lines_or_blank(&r.description_resource),
                })
                .collect(),
            examples: form
                .examples
                .iter()
                .map(|e| ExamplePayload {
                    title_example: e.title_example.clone(),
                    code_snipped: e.code_snipped.clone(),
                    explanation: RichText::from_lines_or_blank(&e.explanation),
                })
                .collect(),
        }
    }
}

/// Topic form prefilled from a stored topic, rich text flattened with newlines
#[derive(Debug, Clone, Serialize)]
pub struct TopicFormView {
    pub id: i64,
    pub document_id: String,
    pub name_topic: String,
    pub description: String,
    pub objectives: String,
    pub resources: Vec<ResourceView>,
    pub examples: Vec<ExampleView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceView {
    pub title_resource: String,
    pub url_resource: String,
    pub description_resource: String,
    pub kind: ResourceKind,
    pub files: Vec<Media>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExampleView {
    pub title_example: String,
    pub code_snipped: String,
    pub explanation: String,
}

impl From<&Resource> for ResourceView {
    fn from(resource: &Resource) -> Self {
        Self {
            title_resource: resource.title_resource.clone(),
            url_resource: resource.url_resource.clone().unwrap_or_default(),
            description_resource: plain_text(&resource.description_resource, "\n"),
            kind: ResourceKind::classify(resource),
            files: resource
                .type_resource
                .as_ref()
                .map(|field| field.files().into_iter().cloned().collect())
                .unwrap_or_default(),
        }
    }
}

impl From<&CodeExample> for ExampleView {
    fn from(example: &CodeExample) -> Self {
        Self {
            title_example: example.title_example.clone(),
            code_snipped: example.code_snipped.clone(),
            explanation: plain_text(&example.explanation, "\n"),
        }
    }
}

impl From<Topic> for TopicFormView {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.id,
            description: plain_text(&topic.description, "\n"),
            objectives: plain_text(&topic.objectives, "\n"),
            resources: topic.resources.iter().map(ResourceView::from).collect(),
            examples: topic.examples.iter().map(ExampleView::from).collect(),
            document_id: topic.document_id,
            name_topic: topic.name_topic,
        }
    }
}

/// Row of the admin topics list
#[derive(Debug, Clone, Serialize)]
pub struct TopicSummary {
    pub id: i64,
    pub document_id: String,
    pub name_topic: String,
    pub description: String,
}

impl From<Topic> for TopicSummary {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.id,
            description: plain_text(&topic.description, " "),
            document_id: topic.document_id,
            name_topic: topic.name_topic,
        }
    }
}

/// Outcome of one resource upload after a topic create or edit
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub resource_index: usize,
    pub uploaded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
