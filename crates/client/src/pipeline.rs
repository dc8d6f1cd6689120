//! Authenticated request pipeline.
//!
//! Every backend call from the entity stores goes through
//! [`RequestPipeline::execute`]: standard headers, envelope decoding, retry of
//! transient failures and the central expired-session path.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use jadmin_core::envelope::decode_data;
use jadmin_core::{ApiEnvelope, EnvelopeOutcome};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::notify::Navigator;
use crate::session::SessionManager;
use crate::transport::{APPLICATION_JSON, HttpRequest, Method, Transport, parse_headers};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-call request descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Overrides [`ClientConfig::retry`].
    pub retry: Option<u32>,
    /// Overrides [`ClientConfig::retry_delay`].
    pub retry_delay: Option<Duration>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serialize `body` as JSON and set the content type.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ClientResult<Self> {
        let encoded = serde_json::to_string(body)
            .map_err(|e| ClientError::Validation(format!("failed to encode request body: {e}")))?;
        self.body = Some(encoded);
        Ok(self.header("content-type", APPLICATION_JSON))
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }
}

#[derive(Clone)]
pub struct RequestPipeline {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    session: SessionManager,
    navigator: Arc<dyn Navigator>,
}

impl RequestPipeline {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        session: SessionManager,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            transport,
            session,
            navigator,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ClientResult<T> {
        self.execute(endpoint, RequestOptions::new(Method::Get)).await
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(endpoint, RequestOptions::new(Method::Post).json(body)?)
            .await
    }

    pub async fn put<B, T>(&self, endpoint: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(endpoint, RequestOptions::new(Method::Put).json(body)?)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> ClientResult<T> {
        self.execute(endpoint, RequestOptions::new(Method::Delete)).await
    }

    /// Send one logical request.
    ///
    /// Transport failures are retried `retry` times, `retry_delay` apart;
    /// [`ClientError::SessionExpired`] and [`ClientError::Application`] are
    /// returned immediately.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let retries = options.retry.unwrap_or(self.config.retry);
        let delay = options.retry_delay.unwrap_or(self.config.retry_delay);
        let caller_headers = parse_headers(&options.headers)?;
        let request_id = caller_headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        let url = self.config.endpoint_url(endpoint);

        let mut attempt = 0u32;
        loop {
            let request = self.build_request(&url, &options, &caller_headers, &request_id)?;
            tracing::debug!(
                request_id = %request_id,
                method = %options.method,
                endpoint,
                attempt,
                "sending request"
            );

            match self.attempt(request).await {
                Ok(data) => return Ok(data),
                Err(err) if err.is_transient() && attempt < retries => {
                    attempt += 1;
                    tracing::warn!(
                        request_id = %request_id,
                        endpoint,
                        attempt,
                        retries,
                        error = %err,
                        "transient failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::debug!(request_id = %request_id, endpoint, error = %err, "request failed");
                    return Err(err);
                }
            }
        }
    }

    fn build_request(
        &self,
        url: &str,
        options: &RequestOptions,
        caller_headers: &HeaderMap,
        request_id: &str,
    ) -> ClientResult<HttpRequest> {
        let mut headers = caller_headers.clone();
        if headers.remove(AUTHORIZATION).is_some() {
            tracing::debug!("ignoring caller-supplied Authorization header");
        }

        // Session headers fill in defaults; the Authorization header always
        // comes from the session.
        for (name, value) in self.session.auth_headers() {
            let Some(name) = name else { continue };
            if name == AUTHORIZATION || !headers.contains_key(&name) {
                headers.insert(name, value);
            }
        }

        let request_id = HeaderValue::from_str(request_id)
            .map_err(|e| ClientError::Validation(format!("invalid request id: {e}")))?;
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), request_id);

        Ok(HttpRequest {
            method: options.method,
            url: url.to_string(),
            headers,
            body: options.body.clone(),
        })
    }

    async fn attempt<T: DeserializeOwned>(&self, request: HttpRequest) -> ClientResult<T> {
        let sent_token = request.bearer_token().map(str::to_string);
        let response = self.transport.send(request).await?;
        let envelope = ApiEnvelope::from_slice(&response.body).map_err(|e| {
            ClientError::decode(format!("HTTP {}: body is not an API envelope: {e}", response.status))
        })?;

        match envelope.outcome() {
            EnvelopeOutcome::Success(data) => {
                decode_data(data).map_err(|e| ClientError::decode(format!("unexpected payload: {e}")))
            }
            EnvelopeOutcome::Unauthorized { message } => {
                tracing::warn!(%message, "backend reported an expired session");
                // A 401 for a token that has since been replaced must not
                // touch the newer session.
                if self.session.invalidate_if_current(sent_token.as_deref()) {
                    self.navigator.redirect(&self.config.login_path);
                }
                Err(ClientError::SessionExpired)
            }
            EnvelopeOutcome::Failure { code, message } => {
                let message = if message.is_empty() {
                    "request failed".to_string()
                } else {
                    message
                };
                Err(ClientError::Application { code, message })
            }
        }
    }
}
