//! Firebase backend over REST.
//!
//! Implements the three collaborator contracts against the Identity Toolkit,
//! Cloud Storage for Firebase and Cloud Firestore REST APIs. The signed-in
//! user's ID token is kept in a shared session and attached to storage and
//! document requests. Live queries are realized by polling.

mod auth;
mod firestore;
mod storage;
pub mod values;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Result;
use chirp_types::Identity;

use crate::config::Config;

/// User-Agent header for chirp REST requests.
pub const USER_AGENT: &str = concat!("chirp/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com";

/// Refresh the ID token this long before it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Resolved service endpoints and project identifiers.
#[derive(Debug, Clone)]
pub struct FirebaseEndpoints {
    pub api_key: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub identity_base_url: String,
    pub token_base_url: String,
    pub firestore_base_url: String,
    pub storage_base_url: String,
}

impl FirebaseEndpoints {
    /// Points every service at one base URL (emulators, mock servers).
    pub fn single_host(base_url: &str, api_key: &str, project_id: &str, bucket: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            api_key: api_key.to_string(),
            project_id: project_id.to_string(),
            storage_bucket: bucket.to_string(),
            identity_base_url: base.clone(),
            token_base_url: base.clone(),
            firestore_base_url: base.clone(),
            storage_base_url: base,
        }
    }
}

/// Tokens of the signed-in user.
#[derive(Debug, Clone)]
struct AuthSession {
    identity: Identity,
    id_token: String,
    refresh_token: String,
    expires_at: Instant,
}

impl AuthSession {
    fn needs_refresh(&self) -> bool {
        self.expires_at
            .checked_duration_since(Instant::now())
            .is_none_or(|left| left <= TOKEN_REFRESH_MARGIN)
    }
}

/// Firebase client. Cloning is cheap and clones share the session.
#[derive(Clone)]
pub struct FirebaseBackend {
    http: reqwest::Client,
    endpoints: Arc<FirebaseEndpoints>,
    session: Arc<Mutex<Option<AuthSession>>>,
    poll_interval: Duration,
}

impl FirebaseBackend {
    pub fn new(endpoints: FirebaseEndpoints, poll_interval: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints: Arc::new(endpoints),
            session: Arc::new(Mutex::new(None)),
            poll_interval,
        }
    }

    /// Builds the backend from the `[firebase]` and `[feed]` sections.
    ///
    /// # Errors
    /// Returns an error if the API key, project id or bucket is missing, or a
    /// base URL override is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let firebase = &config.firebase;
        let endpoints = FirebaseEndpoints {
            api_key: firebase.resolve_api_key()?,
            project_id: firebase.require_project_id()?.to_string(),
            storage_bucket: firebase.require_storage_bucket()?.to_string(),
            identity_base_url: firebase.identity_base_url()?,
            token_base_url: DEFAULT_TOKEN_BASE_URL.to_string(),
            firestore_base_url: firebase.firestore_base_url()?,
            storage_base_url: firebase.storage_base_url()?,
        };
        Ok(Self::new(endpoints, config.feed.poll_interval()))
    }

    fn session(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for FirebaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseBackend")
            .field("project_id", &self.endpoints.project_id)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

fn network_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("Request timed out: {e}")
    } else if e.is_connect() {
        format!("Connection failed: {e}")
    } else if e.is_request() {
        format!("Request error: {e}")
    } else {
        format!("Network error: {e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_in: Duration) -> AuthSession {
        AuthSession {
            identity: Identity::default(),
            id_token: "id".into(),
            refresh_token: "refresh".into(),
            expires_at: Instant::now() + expires_in,
        }
    }

    #[test]
    fn test_token_refresh_margin() {
        assert!(!session(Duration::from_secs(3600)).needs_refresh());
        assert!(session(Duration::from_secs(30)).needs_refresh());
    }

    #[test]
    fn test_from_config_requires_project() {
        let mut config = Config::default();
        config.firebase.api_key = Some("key".into());
        let err = FirebaseBackend::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("project_id"));

        config.firebase.project_id = Some("demo".into());
        config.firebase.storage_bucket = Some("demo.appspot.com".into());
        let backend = FirebaseBackend::from_config(&config).unwrap();
        assert_eq!(backend.endpoints.project_id, "demo");
        assert_eq!(backend.poll_interval, Duration::from_millis(1500));
    }
}
