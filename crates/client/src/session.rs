//! Session manager: the single authority over authentication state.
//!
//! Owns the token and profile, mirrors them into [`SessionStorage`], runs the
//! periodic validity probe and hands out auth headers to the request
//! pipeline. All local destruction of a session goes through
//! [`SessionManager::invalidate_session`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;

use jadmin_core::envelope::decode_data;
use jadmin_core::{ApiEnvelope, AuthPayload, EnvelopeOutcome, LoginRequest, RegisterRequest, UserProfile};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::notify::{NoticeLevel, Notifier};
use crate::scheduler::{ScheduledTask, Scheduler, TickFn, TickFuture, TickOutcome};
use crate::storage::{SessionStorage, TOKEN_KEY, USER_INFO_KEY};
use crate::transport::{APPLICATION_JSON, HttpRequest, Method, Transport};

const NETWORK_ERROR_MESSAGE: &str = "network error, please try again later";
const SESSION_EXPIRED_MESSAGE: &str = "session expired, please sign in again";

/// Authenticated identity held by the running client.
///
/// `user` is only ever present together with `token`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    user: Option<UserProfile>,
}

impl Session {
    pub fn authenticated(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: Some(token.into()),
            user: Some(user),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user.as_ref().map(|u| &u.username))
            .finish()
    }
}

/// Result of [`SessionManager::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRestore {
    /// A well-formed record was found; the session is live and probed.
    Restored,
    /// No (complete) record was found.
    Empty,
    /// The record was malformed and has been removed.
    Discarded(ClientError),
}

/// Services the session manager is constructed with.
#[derive(Clone)]
pub struct SessionServices {
    pub transport: Arc<dyn Transport>,
    pub storage: Arc<dyn SessionStorage>,
    pub notifier: Arc<dyn Notifier>,
    pub scheduler: Arc<dyn Scheduler>,
}

/// Cheap-to-clone handle; every clone refers to the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: ClientConfig,
    services: SessionServices,
    state: RwLock<Session>,
    last_error: RwLock<Option<String>>,
    in_flight: AtomicUsize,
    probe: Mutex<Option<Box<dyn ScheduledTask>>>,
}

struct Busy<'a>(&'a AtomicUsize);

impl<'a> Busy<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SessionManager {
    pub fn new(config: ClientConfig, services: SessionServices) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                services,
                state: RwLock::new(Session::default()),
                last_error: RwLock::new(None),
                in_flight: AtomicUsize::new(0),
                probe: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read side
    // ─────────────────────────────────────────────────────────────────────

    pub fn session(&self) -> Session {
        self.read_state().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read_state().token.clone()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.read_state().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.has_capability(jadmin_auth::Role::ADMIN.as_str())
    }

    /// `admin` grants every capability; any other role only its own name.
    pub fn has_capability(&self, capability: &str) -> bool {
        jadmin_auth::has_capability(self.read_state().user.as_ref(), capability)
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner
            .last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }

    /// Whether a login/register/logout/refresh call is in flight.
    pub fn is_loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Standard headers for authenticated calls.
    pub fn auth_headers(&self) -> HeaderMap {
        auth_headers_for(self.read_state().token.as_deref())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Seed the session from the persisted record. Fails closed: a malformed
    /// record is removed and the client starts signed out.
    pub fn initialize(&self) -> ClientResult<SessionRestore> {
        match self.load_persisted() {
            Ok(Some((token, user))) => {
                tracing::info!(user = %user.username, "restored persisted session");
                *self.write_state() = Session::authenticated(token, user);
                self.start_probe();
                Ok(SessionRestore::Restored)
            }
            Ok(None) => Ok(SessionRestore::Empty),
            Err(err @ ClientError::MalformedSession(_)) => {
                tracing::error!(error = %err, "failed to parse saved session; discarding");
                self.invalidate_session();
                Ok(SessionRestore::Discarded(err))
            }
            Err(err) => Err(err),
        }
    }

    fn load_persisted(&self) -> ClientResult<Option<(String, UserProfile)>> {
        let storage = &self.inner.services.storage;
        let token = storage.get(TOKEN_KEY)?;
        let user_info = storage.get(USER_INFO_KEY)?;

        match (token, user_info) {
            (Some(token), Some(raw)) => {
                if token.trim().is_empty() {
                    return Err(ClientError::MalformedSession("empty token".into()));
                }
                let user = serde_json::from_str::<UserProfile>(&raw)
                    .map_err(|e| ClientError::MalformedSession(e.to_string()))?;
                Ok(Some((token, user)))
            }
            (None, None) => Ok(None),
            (token, _) => {
                tracing::debug!(
                    has_token = token.is_some(),
                    "incomplete persisted session; clearing leftovers"
                );
                self.remove_persisted();
                Ok(None)
            }
        }
    }

    pub async fn login(&self, credentials: &LoginRequest) -> ClientResult<UserProfile> {
        if let Err(err) = credentials.validate() {
            return Err(self.fail(err.into(), "login failed"));
        }
        self.authenticate("/auth/login", credentials, "signed in", "login failed")
            .await
    }

    /// Same contract as [`SessionManager::login`] against the registration
    /// endpoint. The password confirmation is checked locally.
    pub async fn register(&self, form: &RegisterRequest) -> ClientResult<UserProfile> {
        if let Err(err) = form.validate() {
            return Err(self.fail(err.into(), "registration failed"));
        }
        self.authenticate("/auth/register", form, "registered", "registration failed")
            .await
    }

    async fn authenticate<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        success: &str,
        fallback: &str,
    ) -> ClientResult<UserProfile> {
        let _busy = Busy::enter(&self.inner.in_flight);
        self.set_error(None);

        match self.request_auth_payload(endpoint, body).await {
            Ok(AuthPayload { token, user_info }) => {
                tracing::info!(user = %user_info.username, endpoint, "authenticated");
                self.establish(token, user_info.clone());
                self.notify(NoticeLevel::Success, success);
                Ok(user_info)
            }
            Err(err) => Err(self.fail(err, fallback)),
        }
    }

    async fn request_auth_payload<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ClientResult<AuthPayload> {
        let request = HttpRequest::new(Method::Post, self.inner.config.endpoint_url(endpoint)).json(body)?;

        match self.send_envelope(request).await? {
            EnvelopeOutcome::Success(data) => decode_data(data)
                .map_err(|e| ClientError::decode(format!("{endpoint}: unexpected payload: {e}"))),
            // Bad credentials, not an expired session.
            EnvelopeOutcome::Unauthorized { message } => Err(ClientError::application(401, message)),
            EnvelopeOutcome::Failure { code, message } => Err(ClientError::application(code, message)),
        }
    }

    /// Best-effort server-side invalidation, then unconditional local
    /// destruction.
    pub async fn logout(&self) {
        let _busy = Busy::enter(&self.inner.in_flight);

        if self.token().is_some() {
            let request = HttpRequest::new(Method::Post, self.inner.config.endpoint_url("/auth/logout"))
                .with_headers(self.auth_headers());

            match self.send_envelope(request).await {
                Ok(EnvelopeOutcome::Success(_)) => tracing::debug!("server-side session invalidated"),
                Ok(outcome) => tracing::warn!(?outcome, "logout API call rejected"),
                Err(err) => tracing::warn!(error = %err, "logout API call failed"),
            }
        }

        self.invalidate_session();
        self.notify(NoticeLevel::Success, "signed out");
    }

    /// Re-fetch the current profile with the stored token.
    ///
    /// - rejected token (any non-success code) ⇒ local session destroyed,
    ///   no server-side logout
    /// - transport failure ⇒ session untouched, error returned
    pub async fn refresh_profile(&self) -> ClientResult<UserProfile> {
        let Some(token) = self.token() else {
            return Err(ClientError::NotAuthenticated);
        };
        let _busy = Busy::enter(&self.inner.in_flight);

        let request = HttpRequest::new(Method::Get, self.inner.config.endpoint_url("/me"))
            .with_headers(auth_headers_for(Some(&token)));

        let outcome = match self.send_envelope(request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, "profile refresh failed; keeping session");
                self.set_error(Some(err.to_string()));
                return Err(err);
            }
        };

        match outcome {
            EnvelopeOutcome::Success(data) => {
                let user: UserProfile = decode_data(data).map_err(|e| {
                    let err = ClientError::decode(format!("/me: unexpected payload: {e}"));
                    self.set_error(Some(err.to_string()));
                    err
                })?;
                self.write_profile_for(&token, user.clone())?;
                Ok(user)
            }
            EnvelopeOutcome::Unauthorized { message } => {
                tracing::warn!(%message, "token rejected during profile refresh");
                self.invalidate_if_current(Some(token.as_str()));
                Err(ClientError::SessionExpired)
            }
            EnvelopeOutcome::Failure { code, message } => {
                tracing::warn!(code, %message, "profile refresh rejected");
                self.invalidate_if_current(Some(token.as_str()));
                Err(ClientError::application(code, message))
            }
        }
    }

    /// Replace the cached profile (e.g. after the user edited it).
    pub fn replace_profile(&self, user: UserProfile) -> ClientResult<()> {
        let token = self.token().ok_or(ClientError::NotAuthenticated)?;
        self.write_profile_for(&token, user)
    }

    /// Destroy the local session: memory, persisted record and probe.
    pub fn invalidate_session(&self) {
        let had_session = {
            let mut state = self.write_state();
            let had = state.token.is_some();
            *state = Session::default();
            had
        };

        self.remove_persisted();
        self.stop_probe();

        if had_session {
            tracing::info!("session invalidated");
        }
    }

    /// Invalidate only if `token` (the one a request was sent with) is still
    /// the session's token. Returns whether the session was invalidated.
    pub(crate) fn invalidate_if_current(&self, token: Option<&str>) -> bool {
        let current = self.read_state().token.as_deref() == token;
        if current {
            self.invalidate_session();
        } else {
            tracing::debug!("session changed while a request was in flight; not invalidating");
        }
        current
    }

    // ─────────────────────────────────────────────────────────────────────
    // Probe
    // ─────────────────────────────────────────────────────────────────────

    /// (Re)start the periodic validity probe.
    pub fn start_probe(&self) {
        self.stop_probe();

        let weak = Arc::downgrade(&self.inner);
        let tick: TickFn = Arc::new(move || -> TickFuture {
            let weak = weak.clone();
            Box::pin(async move {
                match weak.upgrade() {
                    Some(inner) => SessionManager { inner }.probe_tick().await,
                    None => TickOutcome::Stop,
                }
            })
        });

        let task = self
            .inner
            .services
            .scheduler
            .schedule("session-probe", self.inner.config.probe_interval, tick);

        let previous = self
            .inner
            .probe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.stop();
        }
        tracing::debug!(interval = ?self.inner.config.probe_interval, "session probe started");
    }

    pub fn stop_probe(&self) {
        let task = self
            .inner
            .probe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.stop();
            tracing::debug!("session probe stopped");
        }
    }

    pub fn probe_running(&self) -> bool {
        self.inner
            .probe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| task.is_running())
    }

    async fn probe_tick(&self) -> TickOutcome {
        if self.token().is_none() {
            return TickOutcome::Stop;
        }

        match self.refresh_profile().await {
            Ok(_) => TickOutcome::Continue,
            Err(err) if err.is_transient() => {
                tracing::debug!(error = %err, "session probe hit a transient error");
                TickOutcome::Continue
            }
            Err(ClientError::NotAuthenticated) => TickOutcome::Stop,
            Err(err) => {
                tracing::warn!(error = %err, "session probe found the session invalid");
                self.notify(NoticeLevel::Warning, SESSION_EXPIRED_MESSAGE);
                TickOutcome::Stop
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    async fn send_envelope(&self, request: HttpRequest) -> ClientResult<EnvelopeOutcome> {
        let response = self.inner.services.transport.send(request).await?;
        let envelope = ApiEnvelope::from_slice(&response.body).map_err(|e| {
            ClientError::decode(format!("HTTP {}: body is not an API envelope: {e}", response.status))
        })?;
        Ok(envelope.outcome())
    }

    fn establish(&self, token: String, user: UserProfile) {
        self.persist(&token, &user);
        *self.write_state() = Session::authenticated(token, user);
        self.start_probe();
    }

    fn write_profile_for(&self, token: &str, user: UserProfile) -> ClientResult<()> {
        {
            let mut state = self.write_state();
            match state.token.as_deref() {
                Some(current) if current == token => state.user = Some(user.clone()),
                Some(_) => {
                    tracing::debug!("session replaced while refreshing; discarding stale profile");
                    return Ok(());
                }
                None => return Err(ClientError::NotAuthenticated),
            }
        }
        self.persist_user(&user);
        Ok(())
    }

    fn persist(&self, token: &str, user: &UserProfile) {
        if let Err(err) = self.inner.services.storage.set(TOKEN_KEY, token) {
            tracing::error!(error = %err, "failed to persist session token");
        }
        self.persist_user(user);
    }

    fn persist_user(&self, user: &UserProfile) {
        let encoded = match serde_json::to_string(user) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode user profile");
                return;
            }
        };
        if let Err(err) = self.inner.services.storage.set(USER_INFO_KEY, &encoded) {
            tracing::error!(error = %err, "failed to persist user profile");
        }
    }

    fn remove_persisted(&self) {
        for key in [TOKEN_KEY, USER_INFO_KEY] {
            if let Err(err) = self.inner.services.storage.remove(key) {
                tracing::warn!(key, error = %err, "failed to remove persisted session key");
            }
        }
    }

    fn fail(&self, err: ClientError, fallback: &str) -> ClientError {
        let message = match &err {
            ClientError::Application { message, .. } if !message.is_empty() => message.clone(),
            ClientError::Application { .. } => fallback.to_string(),
            ClientError::Transport(_) | ClientError::Decode(_) => NETWORK_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        };
        tracing::warn!(error = %err, "{fallback}");
        self.set_error(Some(message.clone()));
        self.notify(NoticeLevel::Error, &message);
        err
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        self.inner.services.notifier.notify(level, message);
    }

    fn set_error(&self, message: Option<String>) {
        *self
            .inner
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = message;
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl core::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &*self.read_state())
            .field("probe_running", &self.probe_running())
            .finish()
    }
}

fn auth_headers_for(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    if let Some(token) = token {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(err) => tracing::error!(error = %err, "session token is not a valid header value"),
        }
    }
    headers
}
