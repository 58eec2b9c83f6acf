#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use portfolio_client::config::ClientConfig;
use portfolio_client::session::{Session, SessionManager};
use portfolio_client::PortfolioClient;

pub const PASSWORD: &str = "correct-horse";
pub const ADMIN: &str = "admin";
pub const READER: &str = "reader";
pub const TAKEN: &str = "taken";
/// Registration of this name is rejected with an empty 404 body.
pub const SILENT_REJECT: &str = "ghost";

/// Shared state of the fake backend, inspected by tests.
pub struct BackendState {
    access_token: Mutex<String>,
    refresh_token: Mutex<Option<String>>,
    generation: AtomicU64,
    next_id: AtomicU64,
    pub refresh_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub refresh_delay_ms: AtomicU64,
    pub refresh_omits_access: AtomicBool,
    pub authorization_seen: Mutex<Vec<(String, Option<String>)>>,
    reactions: Mutex<Vec<Value>>,
}

impl BackendState {
    fn new() -> Self {
        Self {
            access_token: Mutex::new("access-0".to_string()),
            refresh_token: Mutex::new(Some("refresh-0".to_string())),
            generation: AtomicU64::new(0),
            next_id: AtomicU64::new(100),
            refresh_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            refresh_delay_ms: AtomicU64::new(0),
            refresh_omits_access: AtomicBool::new(false),
            authorization_seen: Mutex::new(Vec::new()),
            reactions: Mutex::new(Vec::new()),
        }
    }

    pub fn access_token(&self) -> String {
        self.access_token.lock().unwrap().clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.refresh_token.lock().unwrap().clone()
    }

    /// Rotate the server-side access token so the one the client holds expires.
    pub fn expire_access(&self) -> String {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("access-{}", generation);
        *self.access_token.lock().unwrap() = token.clone();
        token
    }

    /// Revoke the refresh token server-side.
    pub fn revoke_refresh(&self) {
        *self.refresh_token.lock().unwrap() = None;
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Authorization headers seen for requests to `path`, in order.
    pub fn authorization_for(&self, path: &str) -> Vec<Option<String>> {
        self.authorization_seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, auth)| auth.clone())
            .collect()
    }

    fn issue_tokens(&self) -> (String, String) {
        let access = self.expire_access();
        let refresh = format!("refresh-{}", self.generation.load(Ordering::SeqCst));
        *self.refresh_token.lock().unwrap() = Some(refresh.clone());
        (access, refresh)
    }

    fn record(&self, path: &str, headers: &HeaderMap) -> Option<String> {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.authorization_seen
            .lock()
            .unwrap()
            .push((path.to_string(), auth.clone()));
        auth
    }

    fn authorized(&self, path: &str, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.access_token());
        self.record(path, headers).as_deref() == Some(expected.as_str())
    }
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl FakeBackend {
    pub fn config(&self) -> Result<ClientConfig> {
        ClientConfig::for_base_url(&self.base_url)
    }

    /// Client with an empty in-memory session.
    pub fn client(&self) -> Result<PortfolioClient> {
        Ok(PortfolioClient::new(&self.config()?, SessionManager::in_memory())?)
    }

    /// Client already holding the backend's current tokens.
    pub fn signed_in_client(&self, username: &str, is_admin: bool) -> Result<PortfolioClient> {
        let client = self.client()?;
        let refresh = self.state.refresh_token().context("backend has no refresh token")?;
        client.session().set_session(Session::new(
            self.state.access_token(),
            refresh,
            username.to_string(),
            is_admin,
        ));
        Ok(client)
    }
}

pub async fn spawn_backend() -> Result<FakeBackend> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind fake backend")?;

    let state = Arc::new(BackendState::new());
    let app = router(state.clone());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(FakeBackend {
        base_url: format!("http://127.0.0.1:{}/api", port),
        state,
    })
}

type Shared = State<Arc<BackendState>>;

fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/api/login/", post(login))
        .route("/api/register/", post(register))
        .route("/api/token/refresh/", post(refresh))
        .route("/api/memes/", get(list_memes).post(create_meme))
        .route("/api/memes/:id/", axum::routing::delete(delete_meme))
        .route("/api/contact_me/", get(list_messages))
        .route("/api/skills/", get(public_list))
        .route("/api/certifications/", get(public_list))
        .route("/api/experiences/", get(public_list))
        .route("/api/blogs/", get(public_list))
        .route("/api/about/", get(about))
        .route("/api/projects/", get(broken))
        .route("/api/locked/", get(locked))
        .route("/api/contact_us/", post(contact_us))
        .route("/api/comments/", post(create_comment))
        .route("/api/meme-reactions/", get(find_reactions).post(create_reaction))
        .route("/api/meme-reactions/:id/", put(update_reaction).delete(delete_reaction))
        .with_state(state)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
        .into_response()
}

async fn login(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);

    if body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid credentials"}))).into_response();
    }

    let (access, refresh) = state.issue_tokens();
    let is_admin = body["username"] == ADMIN;
    Json(json!({
        "access_token": access,
        "refresh_token": refresh,
        "is_admin": is_admin,
        "message": "Login successful!"
    }))
    .into_response()
}

async fn register(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.register_calls.fetch_add(1, Ordering::SeqCst);

    if body["username"] == SILENT_REJECT {
        return StatusCode::NOT_FOUND.into_response();
    }

    if body["username"] == TAKEN {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "Username already exists"}))).into_response();
    }

    let (access, refresh) = state.issue_tokens();
    (
        StatusCode::CREATED,
        Json(json!({
            "access_token": access,
            "refresh_token": refresh,
            "is_admin": "false",
            "message": "User registered successfully!"
        })),
    )
        .into_response()
}

async fn refresh(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let valid = state.refresh_token();
    if valid.is_none() || body["refresh"].as_str() != valid.as_deref() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})),
        )
            .into_response();
    }

    if state.refresh_omits_access.load(Ordering::SeqCst) {
        return Json(json!({})).into_response();
    }

    let access = state.expire_access();
    Json(json!({ "access": access })).into_response()
}

async fn list_memes(State(state): Shared, headers: HeaderMap) -> Response {
    if !state.authorized("memes/", &headers) {
        return unauthorized();
    }
    Json(json!([
        {"id": 1, "meme_title": "first"},
        {"id": 2, "meme_title": "second"}
    ]))
    .into_response()
}

async fn create_meme(State(state): Shared, headers: HeaderMap, Json(mut body): Json<Value>) -> Response {
    if !state.authorized("memes/", &headers) {
        return unauthorized();
    }
    body["id"] = json!(state.next_id.fetch_add(1, Ordering::SeqCst));
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn delete_meme(State(state): Shared, headers: HeaderMap, Path(_id): Path<u64>) -> Response {
    if !state.authorized("memes/:id/", &headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_messages(State(state): Shared, headers: HeaderMap) -> Response {
    if !state.authorized("contact_me/", &headers) {
        return unauthorized();
    }
    Json(json!([{"id": 1, "name": "Grace", "email": "grace@example.com", "message": "hi"}])).into_response()
}

async fn public_list(State(state): Shared, headers: HeaderMap) -> Response {
    state.record("public/", &headers);
    Json(json!([{"id": 1}, {"id": 2}, {"id": 3}])).into_response()
}

async fn about(State(state): Shared, headers: HeaderMap) -> Response {
    state.record("about/", &headers);
    Json(json!({"id": 1, "about_text": "Hello", "image": ""})).into_response()
}

async fn broken(State(state): Shared, headers: HeaderMap) -> Response {
    state.record("projects/", &headers);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "Database unavailable"}))).into_response()
}

async fn locked(State(state): Shared, headers: HeaderMap) -> Response {
    state.record("locked/", &headers);
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Staff only"}))).into_response()
}

async fn contact_us(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("contact_us/", &headers);
    Json(json!({"status": "received", "name": body["name"]})).into_response()
}

async fn create_comment(State(state): Shared, headers: HeaderMap, Json(mut body): Json<Value>) -> Response {
    if !state.authorized("comments/", &headers) {
        return unauthorized();
    }
    body["id"] = json!(state.next_id.fetch_add(1, Ordering::SeqCst));
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn find_reactions(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized("meme-reactions/", &headers) {
        return unauthorized();
    }

    let matches: Vec<Value> = state
        .reactions
        .lock()
        .unwrap()
        .iter()
        .filter(|r| {
            query.get("meme").map(String::as_str) == Some(r["meme"].to_string().as_str())
                && query.get("user").map(String::as_str) == r["user"].as_str()
        })
        .cloned()
        .collect();
    Json(Value::Array(matches)).into_response()
}

async fn create_reaction(State(state): Shared, headers: HeaderMap, Json(mut body): Json<Value>) -> Response {
    if !state.authorized("meme-reactions/", &headers) {
        return unauthorized();
    }
    body["id"] = json!(state.next_id.fetch_add(1, Ordering::SeqCst));
    state.reactions.lock().unwrap().push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update_reaction(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(mut body): Json<Value>,
) -> Response {
    if !state.authorized("meme-reactions/:id/", &headers) {
        return unauthorized();
    }
    body["id"] = json!(id);
    let mut reactions = state.reactions.lock().unwrap();
    match reactions.iter_mut().find(|r| r["id"] == id) {
        Some(existing) => {
            *existing = body.clone();
            Json(body).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

async fn delete_reaction(State(state): Shared, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    if !state.authorized("meme-reactions/:id/", &headers) {
        return unauthorized();
    }
    state.reactions.lock().unwrap().retain(|r| r["id"] != id);
    StatusCode::NO_CONTENT.into_response()
}

impl BackendState {
    pub fn reaction_count(&self) -> usize {
        self.reactions.lock().unwrap().len()
    }
}
