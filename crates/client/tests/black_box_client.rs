mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use common::{RecordingNavigator, RecordingNotifier, profile};
use jadmin_client::{
    AppState, ClientConfig, ClientDeps, ClientError, ManualScheduler, MemoryStorage,
    ReqwestTransport, SessionStorage,
};
use jadmin_core::LoginRequest;

const TOKEN: &str = "tok-admin";

#[derive(Clone, Default)]
struct Backend {
    logouts: Arc<AtomicUsize>,
    revoked: Arc<AtomicBool>,
}

impl Backend {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        bearer == Some(TOKEN) && !self.revoked.load(Ordering::SeqCst)
    }
}

fn ok(data: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "code": 200, "message": "success", "data": data })))
}

fn expired() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "code": 401, "message": "invalid or expired token", "data": null })),
    )
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["username"] == "admin" && body["password"] == "secret123" {
        ok(json!({ "token": TOKEN, "user_info": profile(1, "admin", "admin") }))
    } else {
        (
            StatusCode::OK,
            Json(json!({ "code": 400, "message": "invalid username or password", "data": null })),
        )
    }
}

async fn logout(State(backend): State<Backend>) -> (StatusCode, Json<Value>) {
    backend.logouts.fetch_add(1, Ordering::SeqCst);
    ok(Value::Null)
}

async fn me(State(backend): State<Backend>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if backend.authorized(&headers) {
        ok(json!(profile(1, "admin", "admin")))
    } else {
        expired()
    }
}

async fn users(State(backend): State<Backend>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !backend.authorized(&headers) {
        return expired();
    }
    ok(json!({
        "users": [
            {
                "id": 1,
                "username": "admin",
                "email": "admin@example.com",
                "role": "admin",
                "status": true,
                "CreatedAt": "2024-01-01T00:00:00Z",
            },
            { "id": 2, "username": "bob", "email": "bob@example.com", "role": "editor", "status": false },
        ],
        "total": 2,
    }))
}

struct TestServer {
    base_url: String,
    backend: Backend,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let backend = Backend::default();
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/logout", post(logout))
            .route("/api/me", get(me))
            .route("/api/users", get(users))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            backend,
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Client {
    app: AppState,
    storage: MemoryStorage,
    navigator: Arc<RecordingNavigator>,
}

fn client(config: ClientConfig) -> Client {
    let storage = MemoryStorage::new();
    let navigator = Arc::new(RecordingNavigator::default());
    let app = AppState::new(
        config,
        ClientDeps {
            transport: Arc::new(ReqwestTransport::new()),
            storage: Arc::new(storage.clone()),
            notifier: Arc::new(RecordingNotifier::default()),
            navigator: navigator.clone(),
            scheduler: Arc::new(ManualScheduler::new()),
        },
    );
    Client {
        app,
        storage,
        navigator,
    }
}

#[tokio::test]
async fn login_fetch_and_logout_against_a_live_backend() {
    let srv = TestServer::spawn().await;
    let c = client(ClientConfig::new(&srv.base_url));

    let user = c
        .app
        .session
        .login(&LoginRequest::new("admin", "secret123"))
        .await
        .unwrap();
    assert_eq!(user.username, "admin");
    assert_eq!(c.storage.get("token").unwrap().as_deref(), Some(TOKEN));

    let page = c.app.users.fetch_users().await.unwrap();
    assert_eq!(page.total, 2);
    assert!(page.users[0].created_at.is_some());
    assert_eq!(c.app.users.active_users().len(), 1);

    let refreshed = c.app.session.refresh_profile().await.unwrap();
    assert_eq!(refreshed.id, user.id);

    c.app.logout().await;
    assert_eq!(srv.backend.logouts.load(Ordering::SeqCst), 1);
    assert!(!c.app.session.is_authenticated());
    assert!(c.storage.is_empty());
    assert!(c.app.users.users().is_empty());
}

#[tokio::test]
async fn bad_credentials_are_an_application_error() {
    let srv = TestServer::spawn().await;
    let c = client(ClientConfig::new(&srv.base_url));

    let err = c
        .app
        .session
        .login(&LoginRequest::new("admin", "nope"))
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::application(400, "invalid username or password"));
    assert!(c.storage.is_empty());
}

#[tokio::test]
async fn revoked_token_forces_a_logout_and_redirect() {
    let srv = TestServer::spawn().await;
    let c = client(ClientConfig::new(&srv.base_url));
    c.app
        .session
        .login(&LoginRequest::new("admin", "secret123"))
        .await
        .unwrap();

    srv.backend.revoked.store(true, Ordering::SeqCst);
    let err = c.app.users.fetch_users().await.unwrap_err();

    assert_eq!(err, ClientError::SessionExpired);
    assert!(!c.app.session.is_authenticated());
    assert!(c.storage.is_empty());
    assert_eq!(c.navigator.redirects(), vec!["/login"]);
    assert_eq!(srv.backend.logouts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = ClientConfig::new(format!("http://{addr}/api"));
    config.retry = 1;
    config.retry_delay = Duration::from_millis(10);
    let c = client(config);

    let err = c.app.users.fetch_users().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "unexpected error: {err:?}");
}
