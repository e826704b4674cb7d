#![allow(dead_code)]

//! In-process fake of the content backend plus a scripted code runner.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use startdev_api::{
    config::{
        AdminTimerConfig, Config, JudgeConfig, ProgressConfig, SessionStoreConfig, StrapiConfig,
    },
    create_router,
    models::auth::{AuthSession, SessionUser},
    models::role::Role,
    services::{
        judge::{CodeRunner, JudgeError, RunResult},
        progress_service::ProgressStep,
        AppState,
    },
};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Value,
    /// Raw request body, for multipart uploads
    pub raw: String,
}

#[derive(Default)]
pub struct FakeState {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    failures: Mutex<HashSet<(String, String)>>,
    responses: Mutex<HashMap<String, (StatusCode, Value)>>,
    next_id: Mutex<i64>,
}

/// Fake backend REST API on an ephemeral port
#[derive(Clone)]
pub struct FakeBackend {
    pub base_url: String,
    state: Arc<FakeState>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState {
            next_id: Mutex::new(1000),
            ..Default::default()
        });
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn seed(&self, collection: &str, record: Value) {
        self.state
            .collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(record);
    }

    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.state
            .collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes `method` on `collection` answer 500.
    pub fn fail(&self, method: &str, collection: &str) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert((method.to_string(), collection.to_string()));
    }

    pub fn heal(&self, method: &str, collection: &str) {
        self.state
            .failures
            .lock()
            .unwrap()
            .remove(&(method.to_string(), collection.to_string()));
    }

    /// Fixed answer for a custom endpoint path such as `practicant/auth/login`.
    pub fn respond(&self, path: &str, status: StatusCode, body: Value) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, collection: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && collection_of(&r.path) == collection)
            .collect()
    }
}

fn collection_of(path: &str) -> &str {
    path.split('/').next().unwrap_or_default()
}

async fn handle(State(state): State<Arc<FakeState>>, request: Request) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let query: Vec<(String, String)> = uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let bytes = to_bytes(request.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    if uri.path() == "/_health" {
        return StatusCode::OK.into_response();
    }
    let path = uri.path().trim_start_matches("/api/").to_string();

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: query.clone(),
        body: body.clone(),
        raw: String::from_utf8_lossy(&bytes).into_owned(),
    });

    let collection = collection_of(&path).to_string();
    if state
        .failures
        .lock()
        .unwrap()
        .contains(&(method.to_string(), collection.clone()))
    {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"data": null, "error": {"status": 500, "message": "boom"}})),
        )
            .into_response();
    }

    if let Some((status, body)) = state.responses.lock().unwrap().get(&path).cloned() {
        return (status, Json(body)).into_response();
    }
    if path == "upload" {
        return Json(json!([{"id": 1, "name": "file"}])).into_response();
    }

    let id = path.split('/').nth(1).map(str::to_string);
    let mut collections = state.collections.lock().unwrap();
    let records = collections.entry(collection.clone()).or_default();

    match (method.as_str(), id) {
        ("GET", None) => {
            let matching: Vec<Value> = records
                .iter()
                .filter(|record| matches_filters(record, &query))
                .cloned()
                .collect();
            Json(json!({"data": matching, "meta": {}})).into_response()
        }
        ("GET", Some(id)) => match records.iter().find(|r| identified_by(r, &id)) {
            Some(record) => Json(json!({"data": record})).into_response(),
            None => not_found(),
        },
        ("POST", None) => {
            let mut next = state.next_id.lock().unwrap();
            *next += 1;
            let mut record = resolve_relations(body["data"].clone());
            record["id"] = json!(*next);
            record["documentId"] = json!(format!("doc{}", *next));
            record["createdAt"] = json!(chrono::Utc::now().to_rfc3339());
            records.push(record.clone());
            Json(json!({"data": unpopulated(record)})).into_response()
        }
        ("PUT", Some(id)) => match records.iter_mut().find(|r| identified_by(r, &id)) {
            Some(record) => {
                if let (Some(target), Value::Object(changes)) =
                    (record.as_object_mut(), resolve_relations(body["data"].clone()))
                {
                    for (key, value) in changes {
                        target.insert(key, value);
                    }
                }
                Json(json!({"data": unpopulated(record.clone())})).into_response()
            }
            None => not_found(),
        },
        ("DELETE", Some(id)) => match records.iter().position(|r| identified_by(r, &id)) {
            Some(index) => {
                let removed = records.remove(index);
                Json(json!({"data": removed})).into_response()
            }
            None => not_found(),
        },
        _ => not_found(),
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"data": null, "error": {"status": 404, "message": "Not Found"}})),
    )
        .into_response()
}

fn identified_by(record: &Value, id: &str) -> bool {
    record["documentId"].as_str() == Some(id) || record["id"].to_string() == id
}

/// `filters[a][b][$eq]=v` against the record, following embedded relations.
fn matches_filters(record: &Value, query: &[(String, String)]) -> bool {
    query
        .iter()
        .filter_map(|(key, value)| {
            let inner = key.strip_prefix("filters[")?.strip_suffix("][$eq]")?;
            Some((inner.split("][").collect::<Vec<_>>(), value))
        })
        .all(|(path, value)| {
            let mut current = record;
            for segment in path {
                current = &current[segment];
            }
            match current {
                Value::String(s) => s == value,
                Value::Null => false,
                other => other.to_string() == *value,
            }
        })
}

/// Relation fields the backend leaves unpopulated in write responses.
const RELATIONS: &[&str] = &["administrator", "exercise", "exercises", "practicant", "topic"];

fn unpopulated(mut record: Value) -> Value {
    if let Some(fields) = record.as_object_mut() {
        for relation in RELATIONS {
            fields.remove(*relation);
        }
    }
    record
}

/// `{connect: [{documentId}]}`, `{connect: [id]}` and bare documentId
/// strings on relation fields become embedded relations.
fn resolve_relations(data: Value) -> Value {
    let Value::Object(fields) = data else {
        return data;
    };
    let resolved: Map<String, Value> = fields
        .into_iter()
        .map(|(key, value)| {
            let target = value
                .get("connect")
                .and_then(|c| c.as_array())
                .and_then(|c| c.first())
                .cloned();
            match (target, value) {
                (Some(Value::Number(id)), _) => (key, json!({"id": id})),
                (Some(target @ Value::Object(_)), _) => (key, target),
                (_, Value::String(document_id)) if RELATIONS.contains(&key.as_str()) => {
                    (key, json!({"documentId": document_id}))
                }
                (_, value) => (key, value),
            }
        })
        .collect();
    Value::Object(resolved)
}

/// Code runner returning queued results in order
#[derive(Default)]
pub struct ScriptedRunner {
    results: Mutex<VecDeque<Result<RunResult, JudgeError>>>,
    pub sources: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn push_stdout(&self, stdout: &str) {
        self.results.lock().unwrap().push_back(Ok(RunResult {
            stdout: Some(stdout.to_string()),
            ..Default::default()
        }));
    }

    pub fn push_stderr(&self, stderr: &str) {
        self.results.lock().unwrap().push_back(Ok(RunResult {
            stderr: Some(stderr.to_string()),
            ..Default::default()
        }));
    }

    pub fn push_failure(&self) {
        self.results.lock().unwrap().push_back(Err(JudgeError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }));
    }

    pub fn calls(&self) -> usize {
        self.sources.lock().unwrap().len()
    }
}

#[async_trait]
impl CodeRunner for ScriptedRunner {
    async fn run(&self, source: &str) -> Result<RunResult, JudgeError> {
        self.sources.lock().unwrap().push(source.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RunResult::default()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub backend: FakeBackend,
    pub runner: Arc<ScriptedRunner>,
    _dir: TempDir,
}

pub fn test_config(backend_url: &str, sessions: PathBuf) -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        strapi: StrapiConfig {
            base_url: backend_url.to_string(),
            timeout_secs: 5,
        },
        judge: JudgeConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "test-key".to_string(),
            api_host: "judge.test".to_string(),
            language_id: 71,
            cpu_time_limit: 2.0,
            memory_limit: 128_000,
            timeout_secs: 5,
        },
        sessions: SessionStoreConfig { path: sessions },
        progress: ProgressConfig {
            step: ProgressStep::default(),
        },
        admin_timer: AdminTimerConfig {
            tick_millis: 1000,
            persist_every: 10,
            idle_timeout_millis: 120_000,
        },
        metrics_auth: "metrics:secret".to_string(),
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

pub async fn create_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&backend.base_url, dir.path().join("sessions.json"));
    configure(&mut config);

    let runner = Arc::new(ScriptedRunner::default());
    let state = Arc::new(
        AppState::with_runner(config, runner.clone())
            .await
            .expect("Failed to initialize test app state"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        backend,
        runner,
        _dir: dir,
    }
}

impl TestApp {
    /// Stores a session directly and returns its token.
    pub async fn sign_in(&self, role: Role, id: i64, document_id: &str, email: &str) -> String {
        let token = format!("token-{}", document_id);
        self.state
            .sessions
            .insert(AuthSession {
                user: SessionUser {
                    id,
                    document_id: document_id.to_string(),
                    name: "Test User".to_string(),
                    email: email.to_string(),
                },
                token: token.clone(),
                role,
            })
            .await
            .unwrap();
        token
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        use tower::ServiceExt;

        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

/// Topic with embedded exercises, as the backend returns it when populated
pub fn topic_with_exercises(document_id: &str, exercises: Value) -> Value {
    json!({
        "id": 1,
        "documentId": document_id,
        "name_topic": "Python basics",
        "description": [{"type": "paragraph", "children": [{"type": "text", "text": "Intro"}]}],
        "objectives": [{"type": "paragraph", "children": [{"type": "text", "text": "Print"}]}],
        "Resources": [],
        "Examples": [],
        "exercises": exercises,
    })
}
