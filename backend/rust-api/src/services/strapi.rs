//! REST client for the Strapi backend.
//!
//! Collections are addressed as `{base}/api/{collection}`. Requests and
//! responses wrap records in `{ "data": ... }`. There is no retry: a failed
//! call surfaces as a [`StrapiError`] and the caller decides what to do.

use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::StrapiConfig;
use crate::metrics::track_backend_call;

#[derive(Debug, thiserror::Error)]
pub enum StrapiError {
    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("unexpected backend payload: {0}")]
    Decode(String),
}

impl StrapiError {
    /// Message the backend put in `error.message`, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            StrapiError::Status { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Serialize)]
struct DataBody<'a, P: Serialize> {
    data: &'a P,
}

/// Query string builder for the Strapi REST filters/populate syntax.
#[derive(Debug, Clone, Default)]
pub struct StrapiQuery {
    pairs: Vec<(String, String)>,
}

impl StrapiQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// `filters[a][b][$eq]=value`
    pub fn filter_eq(mut self, path: &[&str], value: impl ToString) -> Self {
        let mut key = String::from("filters");
        for segment in path {
            key.push('[');
            key.push_str(segment);
            key.push(']');
        }
        key.push_str("[$eq]");
        self.pairs.push((key, value.to_string()));
        self
    }

    /// `populate=*`
    pub fn populate_all(mut self) -> Self {
        self.pairs.push(("populate".to_string(), "*".to_string()));
        self
    }

    /// `populate[relation][populate]=*`
    pub fn populate_deep(mut self, relation: &str) -> Self {
        self.pairs
            .push((format!("populate[{}][populate]", relation), "*".to_string()));
        self
    }

    /// `populate[0]=a&populate[1]=b`
    pub fn populate_list(mut self, relations: &[&str]) -> Self {
        for (index, relation) in relations.iter().enumerate() {
            self.pairs
                .push((format!("populate[{}]", index), relation.to_string()));
        }
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// One file of a multipart upload
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Attaches uploaded files to a field of an existing record.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    /// e.g. `api::topic.topic`
    pub model: String,
    pub record_id: i64,
    /// e.g. `Resources[0].type_resource`
    pub field: String,
}

#[derive(Clone)]
pub struct StrapiClient {
    http: Client,
    base_url: String,
}

impl StrapiClient {
    pub fn new(config: &StrapiConfig) -> Result<Self, StrapiError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// GET `{collection}?{query}`
    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &StrapiQuery,
    ) -> Result<Vec<T>, StrapiError> {
        let request = self.http.get(self.url(collection)).query(query.pairs());
        let body = self.send("list", collection, request).await?;
        decode_data(body)
    }

    /// First record matching `query`, if any.
    pub async fn first<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &StrapiQuery,
    ) -> Result<Option<T>, StrapiError> {
        Ok(self.list(collection, query).await?.into_iter().next())
    }

    /// GET `{collection}/{id}?{query}`
    pub async fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        query: &StrapiQuery,
    ) -> Result<T, StrapiError> {
        let request = self
            .http
            .get(self.url(&format!("{}/{}", collection, id)))
            .query(query.pairs());
        let body = self.send("find", collection, request).await?;
        decode_data(body)
    }

    /// POST `{collection}` with `{data}`
    pub async fn create<P: Serialize, T: DeserializeOwned>(
        &self,
        collection: &str,
        data: &P,
    ) -> Result<T, StrapiError> {
        let request = self.http.post(self.url(collection)).json(&DataBody { data });
        let body = self.send("create", collection, request).await?;
        decode_data(body)
    }

    /// PUT `{collection}/{id}` with `{data}`; last writer wins.
    pub async fn update<P: Serialize, T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        data: &P,
    ) -> Result<T, StrapiError> {
        let request = self
            .http
            .put(self.url(&format!("{}/{}", collection, id)))
            .json(&DataBody { data });
        let body = self.send("update", collection, request).await?;
        decode_data(body)
    }

    /// PUT whose response body is not needed.
    pub async fn update_discard<P: Serialize>(
        &self,
        collection: &str,
        id: &str,
        data: &P,
    ) -> Result<(), StrapiError> {
        let request = self
            .http
            .put(self.url(&format!("{}/{}", collection, id)))
            .json(&DataBody { data });
        self.send("update", collection, request).await.map(|_| ())
    }

    /// DELETE `{collection}/{id}`
    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), StrapiError> {
        let request = self.http.delete(self.url(&format!("{}/{}", collection, id)));
        self.send("delete", collection, request).await.map(|_| ())
    }

    /// POST to a custom (non-collection) endpoint with a raw JSON body.
    pub async fn post_raw<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, StrapiError> {
        let request = self.http.post(self.url(path)).json(body);
        self.send("custom", path, request).await
    }

    /// POST `upload` as multipart: `files`, `ref`, `refId`, `field`.
    pub async fn upload(
        &self,
        target: &UploadTarget,
        files: Vec<UploadPart>,
    ) -> Result<Value, StrapiError> {
        let mut form = multipart::Form::new();
        for file in files {
            let mut part = multipart::Part::bytes(file.bytes).file_name(file.file_name);
            if let Some(content_type) = file.content_type.as_deref() {
                part = part.mime_str(content_type)?;
            }
            form = form.part("files", part);
        }
        let form = form
            .text("ref", target.model.clone())
            .text("refId", target.record_id.to_string())
            .text("field", target.field.clone());

        let request = self.http.post(self.url("upload")).multipart(form);
        self.send("upload", "upload", request).await
    }

    /// Reachability check used by the health check.
    pub async fn ping(&self) -> Result<(), StrapiError> {
        let response = self
            .http
            .get(format!("{}/_health", self.base_url))
            .send()
            .await?;
        if response.status().is_server_error() {
            return Err(StrapiError::Status {
                status: response.status().as_u16(),
                message: "health check failed".to_string(),
            });
        }
        Ok(())
    }

    async fn send(
        &self,
        operation: &str,
        collection: &str,
        request: RequestBuilder,
    ) -> Result<Value, StrapiError> {
        track_backend_call(operation, collection, async {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;

            if status == StatusCode::NOT_FOUND {
                return Err(StrapiError::NotFound(collection.to_string()));
            }
            if !status.is_success() {
                return Err(StrapiError::Status {
                    status: status.as_u16(),
                    message: error_message(&text),
                });
            }
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text).map_err(|e| StrapiError::Decode(e.to_string()))
        })
        .await
    }
}

fn decode_data<T: DeserializeOwned>(body: Value) -> Result<T, StrapiError> {
    serde_json::from_value::<DataEnvelope<T>>(body)
        .map(|envelope| envelope.data)
        .map_err(|e| StrapiError::Decode(e.to_string()))
}

/// `error.message`, else the joined `error.details.errors[].message`.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    let error = &value["error"];
    if let Some(message) = error["message"].as_str().filter(|m| !m.is_empty()) {
        return message.to_string();
    }
    error["details"]["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["message"].as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_filter_and_populate_keys() {
        let query = StrapiQuery::new()
            .filter_eq(&["practicant", "documentId"], "p1")
            .filter_eq(&["topic", "documentId"], "t1")
            .populate_deep("exercises")
            .populate_list(&["Resources", "Examples"]);

        let keys: Vec<&str> = query.pairs().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "filters[practicant][documentId][$eq]",
                "filters[topic][documentId][$eq]",
                "populate[exercises][populate]",
                "populate[0]",
                "populate[1]",
            ]
        );
        assert_eq!(query.pairs()[4].1, "Examples");
    }

    #[test]
    fn extracts_backend_error_message() {
        assert_eq!(
            error_message(r#"{"data":null,"error":{"status":400,"message":"Email already taken"}}"#),
            "Email already taken"
        );
        assert_eq!(
            error_message(
                r#"{"error":{"message":"","details":{"errors":[{"message":"a"},{"message":"b"}]}}}"#
            ),
            "a, b"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn decodes_data_envelope() {
        let body = serde_json::json!({"data": [{"id": 1}, {"id": 2}], "meta": {}});
        let records: Vec<Value> = decode_data(body).unwrap();
        assert_eq!(records.len(), 2);

        let missing = decode_data::<Vec<Value>>(serde_json::json!({"oops": true}));
        assert!(matches!(missing, Err(StrapiError::Decode(_))));
    }
}
