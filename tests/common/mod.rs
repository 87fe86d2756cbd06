//! Common test utilities for E2E tests
//!
//! `TestBackend` serves an in-memory imitation of the PostgREST endpoints
//! the gateway talks to, on a random local port.

#![allow(dead_code)]

use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use promptscroll::gateway::RestGateway;
use promptscroll::{AppState, config};
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const ANON_KEY: &str = "test-anon-key";
pub const SEEDED_PROMPTS: usize = 45;

/// One request as seen by the backend
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub table: String,
    pub query: Vec<(String, String)>,
    pub apikey: Option<String>,
    pub authorization: Option<String>,
    pub prefer: Option<String>,
}

impl RecordedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory tables behind the mock endpoints
#[derive(Default)]
pub struct MockBackend {
    pub prompts: Mutex<Vec<Value>>,
    pub categories: Mutex<Vec<Value>>,
    pub tags: Mutex<Vec<Value>>,
    pub follows: Mutex<Vec<(String, String)>>,
    votes: Mutex<HashSet<(String, String)>>,
    requests: Mutex<Vec<RecordedRequest>>,
    fail_with: Mutex<Option<u16>>,
    next_id: Mutex<u32>,
}

impl MockBackend {
    pub fn seeded() -> Self {
        let backend = Self::default();
        *backend.prompts.lock().unwrap() = (1..=SEEDED_PROMPTS).map(prompt_row).collect();
        *backend.categories.lock().unwrap() = vec![
            json!({ "id": "c2", "name": "SEO", "icon": "search", "color": "#22c55e" }),
            json!({ "id": "c1", "name": "Marketing", "icon": "megaphone", "color": "#f97316" }),
            json!({ "id": "c3", "name": "Cooking", "icon": null, "color": null }),
        ];
        backend
    }

    /// Answer every request with `status` until cleared with `None`
    pub fn fail_with(&self, status: Option<u16>) {
        *self.fail_with.lock().unwrap() = status;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, table: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.table == table)
            .collect()
    }

    pub fn prompt(&self, id: &str) -> Option<Value> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .find(|row| row["id"] == id)
            .cloned()
    }

    fn begin(
        &self,
        method: &Method,
        table: &str,
        headers: &HeaderMap,
        raw_query: Option<String>,
    ) -> Result<Vec<(String, String)>, Response> {
        let query: Vec<(String, String)> = raw_query
            .map(|raw| {
                url::form_urlencoded::parse(raw.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        let header_value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            table: table.to_string(),
            query: query.clone(),
            apikey: header_value("apikey"),
            authorization: header_value("authorization"),
            prefer: header_value("prefer"),
        });

        if let Some(status) = *self.fail_with.lock().unwrap() {
            let status = StatusCode::from_u16(status).unwrap();
            return Err((status, Json(json!({ "message": "injected failure" }))).into_response());
        }
        if header_value("apikey").as_deref() != Some(ANON_KEY) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Invalid API key" })),
            )
                .into_response());
        }
        Ok(query)
    }
}

pub fn prompt_row(i: usize) -> Value {
    let (category_id, category_name) = if i % 3 == 0 {
        ("c2", "SEO")
    } else {
        ("c1", "Marketing")
    };
    json!({
        "id": format!("p{i:02}"),
        "title": format!("Prompt number {i}"),
        "content": format!("You are an expert. Help with task {i}."),
        "description": null,
        "category_id": category_id,
        "compatible_models": ["chatgpt"],
        "primary_model": "chatgpt",
        "is_verified": i % 5 == 0,
        "is_featured": false,
        "quality_score": 0.0,
        "total_uses": 100 - i as i64,
        "total_likes": i as i64,
        "total_dislikes": 0,
        "technique_explanation": null,
        "example_output": null,
        "difficulty_level": "beginner",
        "author_name": "Tester",
        "moderation_status": "approved",
        "created_at": format!("2024-01-{:02}T00:00:00Z", (i % 28) + 1),
        "categories": { "name": category_name, "color": null, "icon": null },
        "prompt_tags": [{ "tag": "email" }]
    })
}

fn eq_filter<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.strip_prefix("eq."))
}

fn param<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn compare_column(a: &Value, b: &Value, column: &str) -> Ordering {
    match (&a[column], &b[column]) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&y.as_f64().unwrap_or_default()),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn apply_order(rows: &mut [Value], order: &str) {
    let keys: Vec<(String, bool)> = order
        .split(',')
        .filter_map(|key| {
            let (column, direction) = key.rsplit_once('.')?;
            Some((column.to_string(), direction == "desc"))
        })
        .collect();
    rows.sort_by(|a, b| {
        for (column, desc) in &keys {
            let ordering = compare_column(a, b, column);
            let ordering = if *desc { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Keep only the selected columns unless the select starts with `*`
fn project(row: &Value, select: Option<&str>) -> Value {
    match select {
        Some(select) if !select.starts_with('*') => {
            let mut projected = serde_json::Map::new();
            for column in select.split(',') {
                projected.insert(column.to_string(), row[column].clone());
            }
            Value::Object(projected)
        }
        _ => row.clone(),
    }
}

fn content_range(total: usize) -> String {
    if total == 0 {
        "*/0".to_string()
    } else {
        format!("0-{}/{}", total - 1, total)
    }
}

type Backend = State<Arc<MockBackend>>;

async fn list_prompts(
    State(backend): Backend,
    method: Method,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = match backend.begin(&method, "prompts", &headers, raw) {
        Ok(query) => query,
        Err(response) => return response,
    };

    let mut rows: Vec<Value> = backend
        .prompts
        .lock()
        .unwrap()
        .iter()
        .filter(|row| eq_filter(&query, "category_id").is_none_or(|c| row["category_id"] == c))
        .filter(|row| eq_filter(&query, "id").is_none_or(|id| row["id"] == id))
        .filter(|row| eq_filter(&query, "is_verified").is_none_or(|_| row["is_verified"] == true))
        .filter(|row| {
            eq_filter(&query, "primary_model").is_none_or(|model| row["primary_model"] == model)
        })
        .cloned()
        .collect();

    if let Some(order) = param(&query, "order") {
        apply_order(&mut rows, order);
    }
    let offset: usize = param(&query, "offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let limit: usize = param(&query, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(usize::MAX);
    let select = param(&query, "select");

    let page: Vec<Value> = rows
        .iter()
        .skip(offset)
        .take(limit)
        .map(|row| project(row, select))
        .collect();
    Json(page).into_response()
}

async fn patch_prompt(
    State(backend): Backend,
    method: Method,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> Response {
    let query = match backend.begin(&method, "prompts", &headers, raw) {
        Ok(query) => query,
        Err(response) => return response,
    };

    let id = eq_filter(&query, "id").unwrap_or_default().to_string();
    let mut prompts = backend.prompts.lock().unwrap();
    let updated: Vec<Value> = prompts
        .iter_mut()
        .filter(|row| row["id"] == id.as_str())
        .map(|row| {
            if let (Some(target), Some(fields)) = (row.as_object_mut(), body.as_object()) {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
            project(row, param(&query, "select"))
        })
        .collect();
    Json(updated).into_response()
}

async fn insert_prompt(
    State(backend): Backend,
    method: Method,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = backend.begin(&method, "prompts", &headers, raw) {
        return response;
    }

    let id = {
        let mut next = backend.next_id.lock().unwrap();
        *next += 1;
        format!("new-{}", *next)
    };
    let mut row = body;
    if let Some(fields) = row.as_object_mut() {
        fields.insert("id".to_string(), json!(id));
        fields.insert("created_at".to_string(), json!("2024-06-01T00:00:00Z"));
        fields.insert("prompt_tags".to_string(), json!([]));
    }
    backend.prompts.lock().unwrap().push(row.clone());
    (StatusCode::CREATED, Json(json!([row]))).into_response()
}

async fn insert_tags(
    State(backend): Backend,
    method: Method,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = backend.begin(&method, "prompt_tags", &headers, raw) {
        return response;
    }
    if let Value::Array(rows) = body {
        backend.tags.lock().unwrap().extend(rows);
    }
    StatusCode::CREATED.into_response()
}

async fn list_categories(
    State(backend): Backend,
    method: Method,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = match backend.begin(&method, "categories", &headers, raw) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let mut rows = backend.categories.lock().unwrap().clone();
    if let Some(order) = param(&query, "order") {
        apply_order(&mut rows, order);
    }
    Json(rows).into_response()
}

async fn rate_limited_vote(
    State(backend): Backend,
    method: Method,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = backend.begin(&method, "rpc/rate_limited_vote", &headers, raw) {
        return response;
    }

    let prompt_id = body["p_prompt_id"].as_str().unwrap_or_default().to_string();
    let session_id = body["p_session_id"].as_str().unwrap_or_default().to_string();
    let column = match body["p_vote_type"].as_str() {
        Some("dislike") => "total_dislikes",
        _ => "total_likes",
    };

    if !backend
        .votes
        .lock()
        .unwrap()
        .insert((prompt_id.clone(), session_id))
    {
        return Json(json!([{
            "success": false,
            "message": "Please wait before voting again"
        }]))
        .into_response();
    }

    let mut prompts = backend.prompts.lock().unwrap();
    let Some(row) = prompts.iter_mut().find(|row| row["id"] == prompt_id.as_str()) else {
        return Json(json!([{ "success": false, "message": "Prompt not found" }])).into_response();
    };
    let value = row[column].as_i64().unwrap_or_default() + 1;
    row[column] = json!(value);
    Json(json!([{
        "success": true,
        "new_likes": row["total_likes"],
        "new_dislikes": row["total_dislikes"]
    }]))
    .into_response()
}

async fn list_follows(
    State(backend): Backend,
    method: Method,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = match backend.begin(&method, "follows", &headers, raw) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let follower = eq_filter(&query, "follower_id");
    let following = eq_filter(&query, "following_id");

    let rows: Vec<Value> = backend
        .follows
        .lock()
        .unwrap()
        .iter()
        .filter(|(a, b)| {
            follower.is_none_or(|f| f == a) && following.is_none_or(|f| f == b)
        })
        .map(|(a, b)| json!({ "follower_id": a, "following_id": b }))
        .collect();

    let total = rows.len();
    (
        [(header::CONTENT_RANGE, content_range(total))],
        Json(rows),
    )
        .into_response()
}

async fn insert_follow(
    State(backend): Backend,
    method: Method,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = backend.begin(&method, "follows", &headers, raw) {
        return response;
    }
    let pair = (
        body["follower_id"].as_str().unwrap_or_default().to_string(),
        body["following_id"].as_str().unwrap_or_default().to_string(),
    );
    let mut follows = backend.follows.lock().unwrap();
    if follows.contains(&pair) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "duplicate key value violates unique constraint" })),
        )
            .into_response();
    }
    follows.push(pair);
    StatusCode::CREATED.into_response()
}

async fn delete_follow(
    State(backend): Backend,
    method: Method,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = match backend.begin(&method, "follows", &headers, raw) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let follower = eq_filter(&query, "follower_id").unwrap_or_default().to_string();
    let following = eq_filter(&query, "following_id").unwrap_or_default().to_string();
    backend
        .follows
        .lock()
        .unwrap()
        .retain(|(a, b)| !(a == &follower && b == &following));
    StatusCode::NO_CONTENT.into_response()
}

fn build_mock_router(backend: Arc<MockBackend>) -> Router {
    Router::new()
        .route(
            "/rest/v1/prompts",
            get(list_prompts).patch(patch_prompt).post(insert_prompt),
        )
        .route("/rest/v1/prompt_tags", post(insert_tags))
        .route("/rest/v1/categories", get(list_categories))
        .route("/rest/v1/rpc/rate_limited_vote", post(rate_limited_vote))
        .route(
            "/rest/v1/follows",
            get(list_follows).post(insert_follow).delete(delete_follow),
        )
        .with_state(backend)
}

/// Mock backend plus a scratch directory for local blobs
pub struct TestBackend {
    pub addr: String,
    pub backend: Arc<MockBackend>,
    pub _temp_dir: TempDir,
}

impl TestBackend {
    /// Start a seeded mock backend on a random port
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::seeded());

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        let app = build_mock_router(backend.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            backend,
            _temp_dir: temp_dir,
        }
    }

    /// Configuration pointing at this backend
    pub fn config(&self) -> config::AppConfig {
        config::AppConfig {
            gateway: config::GatewayConfig {
                url: self.addr.clone(),
                anon_key: ANON_KEY.to_string(),
                timeout_seconds: 5,
                schema: "public".to_string(),
            },
            feed: config::FeedConfig {
                page_size: 20,
                top_limit: 3,
            },
            votes: config::VoteConfig {
                cooldown_seconds: 300,
            },
            storage: config::StorageConfig {
                dir: self._temp_dir.path().join("state"),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    pub fn gateway(&self) -> RestGateway {
        RestGateway::new(&self.config().gateway).unwrap()
    }

    /// Fresh application state over the same local storage directory
    pub fn app_state(&self) -> AppState {
        AppState::new(self.config()).unwrap()
    }
}
