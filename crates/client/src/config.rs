//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8081/api";
pub const DEFAULT_RETRY: u32 = 2;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint is appended to (no trailing slash).
    pub api_base_url: String,
    /// Retries after the first attempt for transient failures.
    pub retry: u32,
    pub retry_delay: Duration,
    /// Period of the session validity probe.
    pub probe_interval: Duration,
    /// Where the pipeline navigates when the session expires.
    pub login_path: String,
    /// Session file for [`crate::storage::FileStorage`]; `None` uses the
    /// platform data directory.
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            retry: DEFAULT_RETRY,
            retry_delay: DEFAULT_RETRY_DELAY,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            session_file: None,
        }
    }
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: normalize_base_url(api_base_url.into()),
            ..Self::default()
        }
    }

    /// Build from `JADMIN_*` environment variables, falling back to defaults.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("JADMIN_API_BASE_URL") {
            config.api_base_url = normalize_base_url(url);
        } else {
            tracing::debug!("JADMIN_API_BASE_URL not set; using {DEFAULT_API_BASE_URL}");
        }
        if let Some(retry) = lookup("JADMIN_RETRY") {
            config.retry = parse_number("JADMIN_RETRY", &retry)?;
        }
        if let Some(delay) = lookup("JADMIN_RETRY_DELAY_MS") {
            config.retry_delay =
                Duration::from_millis(parse_number("JADMIN_RETRY_DELAY_MS", &delay)?);
        }
        if let Some(interval) = lookup("JADMIN_PROBE_INTERVAL_SECS") {
            let secs: u64 = parse_number("JADMIN_PROBE_INTERVAL_SECS", &interval)?;
            if secs == 0 {
                return Err(ClientError::Config(
                    "JADMIN_PROBE_INTERVAL_SECS must be greater than zero".into(),
                ));
            }
            config.probe_interval = Duration::from_secs(secs);
        }
        if let Some(path) = lookup("JADMIN_LOGIN_PATH") {
            config.login_path = path;
        }
        if let Some(file) = lookup("JADMIN_SESSION_FILE") {
            config.session_file = Some(PathBuf::from(file));
        }

        Ok(config)
    }

    /// Absolute URL for an endpoint such as `/users/3`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.api_base_url, endpoint)
        } else {
            format!("{}/{}", self.api_base_url, endpoint)
        }
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ClientResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ClientError::Config(format!("{key}='{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_console() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.retry, 2);
        assert_eq!(config.retry_delay, Duration::from_millis(1000));
        assert_eq!(config.probe_interval, Duration::from_secs(300));
    }

    #[test]
    fn reads_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("JADMIN_API_BASE_URL", "https://admin.example.com/api/"),
            ("JADMIN_RETRY", "5"),
            ("JADMIN_RETRY_DELAY_MS", "250"),
            ("JADMIN_PROBE_INTERVAL_SECS", "60"),
            ("JADMIN_SESSION_FILE", "/tmp/session.json"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://admin.example.com/api");
        assert_eq!(config.retry, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.probe_interval, Duration::from_secs(60));
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/session.json")));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = ClientConfig::from_lookup(lookup(&[("JADMIN_RETRY", "many")])).unwrap_err();
        assert!(matches!(err, ClientError::Config(msg) if msg.starts_with("JADMIN_RETRY")));

        let err =
            ClientConfig::from_lookup(lookup(&[("JADMIN_PROBE_INTERVAL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn joins_endpoints() {
        let config = ClientConfig::new("http://host/api/");
        assert_eq!(config.endpoint_url("/me"), "http://host/api/me");
        assert_eq!(config.endpoint_url("users"), "http://host/api/users");
    }
}
