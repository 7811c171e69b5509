//! End-to-end session lifecycle against an in-process fake backend.
//!
//! The backend is a small axum app on an ephemeral port that speaks the same
//! REST shapes as the real server. The client side is the production wiring:
//! `App::connect` with the reqwest transport and a file token store.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use serde_json::{Value, json};

use resource_hub::app::App;
use resource_hub::config::{ClientConfig, Timeouts};
use resource_hub::net::resources::{MatchMode, SearchQuery, SortOrder};
use resource_hub::routes::View;
use resource_hub::state::auth::ProfileFetch;
use resource_hub::state::session::AuthStatus;

// =============================================================
// Fake backend
// =============================================================

#[derive(Clone, Default)]
struct Backend {
    valid_tokens: Arc<Mutex<HashSet<String>>>,
    profile_hits: Arc<AtomicUsize>,
}

impl Backend {
    fn revoke_all(&self) {
        self.valid_tokens.lock().unwrap().clear();
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let Some(token) = value.strip_prefix("Bearer ") else {
            return false;
        };
        self.valid_tokens.lock().unwrap().contains(token)
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthorized" }))).into_response()
}

async fn login(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    if body["username"] == "alice" && body["password"] == "secret" {
        backend.valid_tokens.lock().unwrap().insert("T1".to_owned());
        return Json(json!({ "token": "T1", "type": "Bearer", "id": 5, "username": "alice", "email": "a@x.com" }))
            .into_response();
    }
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid username or password" }))).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["username"] == "alice" {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Username is already taken" }))).into_response();
    }
    Json(json!({ "message": "User registered successfully" })).into_response()
}

async fn profile(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend.profile_hits.fetch_add(1, Ordering::SeqCst);
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "id": 5, "username": "alice", "email": "a@x.com" })).into_response()
}

fn sample_resource() -> Value {
    json!({
        "id": 3,
        "title": "Operating Systems",
        "college": "CS",
        "uploader": "alice",
        "createdAt": "2024-03-01T10:00:00Z",
        "attachments": [{ "id": 11, "name": "notes.pdf", "contentType": "application/pdf", "size": 4, "category": "NOTE" }]
    })
}

async fn list_resources(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    Json(json!([sample_resource()])).into_response()
}

async fn search_resources(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    let page: i64 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let size: i64 = params.get("size").and_then(|s| s.parse().ok()).unwrap_or(10);
    Json(json!({
        "content": [sample_resource()],
        "page": page,
        "size": size,
        "totalElements": 1,
        "totalPages": 1,
        "echo": params,
    }))
    .into_response()
}

async fn delete_resource(State(backend): State<Backend>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    if id != 3 {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Resource not found" }))).into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn download(State(backend): State<Backend>, headers: HeaderMap, Path((_, _)): Path<(i64, i64)>) -> Response {
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    ([(header::CONTENT_TYPE, "application/pdf")], b"%PDF".to_vec()).into_response()
}

async fn spawn_backend(backend: Backend) -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/user/profile", get(profile))
        .route("/api/resources", get(list_resources))
        .route("/api/resources/search", get(search_resources))
        .route("/api/resources/{id}", delete(delete_resource))
        .route("/api/resources/{id}/download/{attachment_id}", get(download))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// =============================================================
// Client helpers
// =============================================================

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// Per-test directory for the token file, removed when dropped.
struct ScratchDir {
    dir: PathBuf,
}

impl ScratchDir {
    fn new() -> Self {
        let n = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("resource-hub-lifecycle-{}-{n}", std::process::id()));
        Self { dir }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join("token")
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn config(base_url: &str, token_path: PathBuf) -> ClientConfig {
    ClientConfig { base_url: base_url.to_owned(), token_path, timeouts: Timeouts { request_secs: 5, connect_secs: 2 } }
}

// =============================================================
// Scenarios
// =============================================================

#[tokio::test]
async fn login_persists_across_restart_and_logout_clears_it() {
    let backend = Backend::default();
    let base = spawn_backend(backend.clone()).await;
    let scratch = ScratchDir::new();
    let path = scratch.token_path();

    let mut app = App::connect(&config(&base, path.clone())).unwrap();
    let startup = app.start().await.unwrap();
    assert_eq!(startup.status, AuthStatus::Anonymous);
    assert_eq!(backend.profile_hits.load(Ordering::SeqCst), 0);
    assert_eq!(app.router.navigate("/resources").view, View::Login);

    let snapshot = app.auth.login("alice", "secret").await.unwrap();
    assert_eq!(snapshot.token.as_deref(), Some("T1"));
    assert_eq!(snapshot.user.as_ref().map(|u| u.id), Some(5));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "T1");
    assert_eq!(app.router.navigate("/resources").view, View::Resources);

    // A fresh process picks the token up and refreshes the profile.
    let restarted = App::connect(&config(&base, path.clone())).unwrap();
    let startup = restarted.start().await.unwrap();
    assert_eq!(startup.status, AuthStatus::Authenticated);
    assert!(matches!(startup.profile, Some(Ok(ProfileFetch::Updated(ref u))) if u.username == "alice"));

    restarted.auth.logout();
    assert!(!path.exists());
    let mut third = App::connect(&config(&base, path.clone())).unwrap();
    assert_eq!(third.start().await.unwrap().status, AuthStatus::Anonymous);
    assert_eq!(third.router.navigate("/upload").view, View::Login);
}

#[tokio::test]
async fn failed_login_surfaces_server_message() {
    let backend = Backend::default();
    let base = spawn_backend(backend).await;
    let scratch = ScratchDir::new();
    let path = scratch.token_path();

    let app = App::connect(&config(&base, path.clone())).unwrap();
    app.start().await.unwrap();
    let err = app.auth.login("alice", "wrong").await.unwrap_err();

    assert_eq!(err.message, "Invalid username or password");
    assert_eq!(app.auth.session().status(), AuthStatus::Anonymous);
    assert!(!path.exists());
}

#[tokio::test]
async fn register_reports_both_outcomes() {
    let base = spawn_backend(Backend::default()).await;
    let scratch = ScratchDir::new();
    let app = App::connect(&config(&base, scratch.token_path())).unwrap();
    app.start().await.unwrap();

    let message = app.auth.register("bob", "pw", "b@x.com").await.unwrap();
    assert_eq!(message.as_deref(), Some("User registered successfully"));
    assert_eq!(app.auth.session().status(), AuthStatus::Anonymous);

    let err = app.auth.register("alice", "pw", "a@x.com").await.unwrap_err();
    assert_eq!(err.message, "Username is already taken");
}

#[tokio::test]
async fn revoked_token_is_dropped_by_first_401() {
    let backend = Backend::default();
    let base = spawn_backend(backend.clone()).await;
    let scratch = ScratchDir::new();
    let path = scratch.token_path();

    let mut app = App::connect(&config(&base, path.clone())).unwrap();
    app.start().await.unwrap();
    app.auth.login("alice", "secret").await.unwrap();
    assert_eq!(app.resources.list().await.unwrap().len(), 1);

    backend.revoke_all();
    let err = app.resources.list().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(app.auth.session().status(), AuthStatus::Anonymous);
    assert!(!path.exists());
    assert_eq!(app.router.navigate("/resources").view, View::Login);
}

#[tokio::test]
async fn stale_token_at_startup_logs_out() {
    let backend = Backend::default();
    let base = spawn_backend(backend.clone()).await;
    let scratch = ScratchDir::new();
    let path = scratch.token_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "stale").unwrap();

    let app = App::connect(&config(&base, path.clone())).unwrap();
    let startup = app.start().await.unwrap();

    assert_eq!(startup.status, AuthStatus::Anonymous);
    assert!(matches!(startup.profile, Some(Ok(ProfileFetch::Expired))));
    assert_eq!(backend.profile_hits.load(Ordering::SeqCst), 1);
    assert!(!path.exists());
}

#[tokio::test]
async fn resource_endpoints_round_trip() {
    let base = spawn_backend(Backend::default()).await;
    let scratch = ScratchDir::new();
    let app = App::connect(&config(&base, scratch.token_path())).unwrap();
    app.start().await.unwrap();
    app.auth.login("alice", "secret").await.unwrap();

    let query = SearchQuery::new("operating systems").page(2).size(5).sort(SortOrder::Name).mode(MatchMode::Or);
    let page = app.resources.search(&query).await.unwrap();
    assert_eq!((page.page, page.size), (2, 5));
    assert_eq!(page.content[0].title, "Operating Systems");

    app.resources.delete(3).await.unwrap();
    let missing = app.resources.delete(99).await.unwrap_err();
    assert_eq!(missing.server_message(), Some("Resource not found"));
    // A 404 is not a dead session.
    assert_eq!(app.auth.session().status(), AuthStatus::Authenticated);

    assert_eq!(app.resources.download(3, 11).await.unwrap(), b"%PDF");
}

#[tokio::test]
async fn unreachable_server_leaves_session_alone() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let scratch = ScratchDir::new();
    let path = scratch.token_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "T0").unwrap();

    let app = App::connect(&config(&format!("http://{addr}"), path.clone())).unwrap();
    let startup = app.start().await.unwrap();

    assert_eq!(startup.status, AuthStatus::Authenticated);
    assert!(matches!(startup.profile, Some(Err(_))));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "T0");
}

#[tokio::test]
async fn rejected_login_while_logged_in_ends_session() {
    let base = spawn_backend(Backend::default()).await;
    let scratch = ScratchDir::new();
    let path = scratch.token_path();

    let mut app = App::connect(&config(&base, path.clone())).unwrap();
    app.start().await.unwrap();
    app.auth.login("alice", "secret").await.unwrap();

    let err = app.auth.login("alice", "wrong").await.unwrap_err();
    assert_eq!(err.message, "Invalid username or password");
    assert_eq!(app.auth.session().status(), AuthStatus::Anonymous);
    assert!(!path.exists());
    assert_eq!(app.router.navigate("/upload").view, View::Login);
}

#[test]
fn scratch_dir_is_removed_on_drop() {
    let dir = {
        let scratch = ScratchDir::new();
        std::fs::create_dir_all(&scratch.dir).unwrap();
        std::fs::write(scratch.token_path(), "T1").unwrap();
        scratch.dir.clone()
    };
    assert!(!dir.exists());
}
