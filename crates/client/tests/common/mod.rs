#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

use jadmin_client::{
    AppState, ClientConfig, ClientDeps, ClientError, ClientResult, HttpRequest, HttpResponse,
    ManualScheduler, MemoryStorage, Navigator, NoticeLevel, Notifier, Transport,
};
use jadmin_core::UserProfile;

pub const BASE_URL: &str = "http://backend.test/api";

type Scripted = (ClientResult<HttpResponse>, Option<Arc<Notify>>);

/// Transport that replays queued responses in order and records every
/// request it was given. A held response is only delivered once its gate is
/// released.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn envelope(&self, code: i64, message: &str, data: Value) {
        self.push(Ok(envelope_response(code, message, data)));
    }

    /// Queue an envelope that is withheld until the returned gate is
    /// notified.
    pub fn held_envelope(&self, code: i64, message: &str, data: Value) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.responses
            .lock()
            .unwrap()
            .push_back((Ok(envelope_response(code, message, data)), Some(gate.clone())));
        gate
    }

    /// Wait until `count` requests have been sent.
    pub async fn wait_for_requests(&self, count: usize) {
        while self.requests.lock().unwrap().len() < count {
            tokio::task::yield_now().await;
        }
    }

    pub fn ok(&self, data: Value) {
        self.envelope(200, "success", data);
    }

    pub fn expired(&self) {
        self.envelope(401, "token expired", Value::Null);
    }

    pub fn unreachable(&self) {
        self.push(Err(ClientError::transport("connection refused")));
    }

    pub fn raw(&self, status: u16, body: &str) {
        self.push(Ok(HttpResponse::new(status, body.to_string())));
    }

    fn push(&self, response: ClientResult<HttpResponse>) {
        self.responses.lock().unwrap().push_back((response, None));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `"METHOD /path"` for every request, with the base URL stripped.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.url.trim_start_matches(BASE_URL)))
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some((response, None)) => response,
            Some((response, Some(gate))) => {
                gate.notified().await;
                response
            }
            None => Err(ClientError::transport("no scripted response")),
        }
    }
}

fn envelope_response(code: i64, message: &str, data: Value) -> HttpResponse {
    let body = json!({ "code": code, "message": message, "data": data });
    HttpResponse::new(200, body.to_string())
}

#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<(NoticeLevel, String)>>);

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.0.lock().unwrap().clone()
    }

    pub fn has(&self, level: NoticeLevel, message: &str) -> bool {
        self.notices().iter().any(|(l, m)| *l == level && m == message)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.0.lock().unwrap().push((level, message.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingNavigator(Mutex<Vec<String>>);

impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, path: &str) {
        self.0.lock().unwrap().push(path.to_string());
    }
}

/// Fully wired client over scripted collaborators.
pub struct Harness {
    pub app: AppState,
    pub transport: Arc<ScriptedTransport>,
    pub storage: MemoryStorage,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
    pub scheduler: ManualScheduler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::new())
    }

    pub fn with_storage(storage: MemoryStorage) -> Self {
        Self::build(ClientConfig::new(BASE_URL), storage)
    }

    pub fn build(config: ClientConfig, storage: MemoryStorage) -> Self {
        let transport = Arc::new(ScriptedTransport::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let scheduler = ManualScheduler::new();

        let app = AppState::new(
            config,
            ClientDeps {
                transport: transport.clone(),
                storage: Arc::new(storage.clone()),
                notifier: notifier.clone(),
                navigator: navigator.clone(),
                scheduler: Arc::new(scheduler.clone()),
            },
        );

        Self {
            app,
            transport,
            storage,
            notifier,
            navigator,
            scheduler,
        }
    }

    /// Sign in as `user` with token `token` through the real login path.
    pub async fn signed_in(&self, token: &str, user: &UserProfile) {
        self.transport.ok(json!({ "token": token, "user_info": user }));
        self.app
            .session
            .login(&jadmin_core::LoginRequest::new(user.username.clone(), "secret123"))
            .await
            .expect("login should succeed");
    }
}

pub fn profile(id: u64, username: &str, role: &str) -> UserProfile {
    UserProfile {
        id: id.into(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        role: role.to_string(),
        status: true,
        created_at: None,
        updated_at: None,
    }
}
