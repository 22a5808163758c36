//! Session and credential lifecycle
//!
//! PVE authenticates with a ticket obtained from `/access/ticket`. The ticket
//! travels as the `PVEAuthCookie` cookie on every later request, and a second
//! token (the CSRF prevention token) must accompany every state-mutating call.
//! Tickets expire server-side; the only way to notice is a rejected `/version` check, so
//! [`SessionManager::ensure_session`] verifies before each privileged call and
//! signs in again when the check is rejected.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::cookie::Jar;
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::client::Envelope;
use crate::config::ClientConfig;
use crate::error::{PveError, Result};

/// Path prefix of the JSON API
pub const API_PREFIX: &str = "/api2/json";

/// Cookie carrying the ticket
pub const AUTH_COOKIE: &str = "PVEAuthCookie";

/// Header carrying the CSRF token on POST/PUT/DELETE
pub const CSRF_HEADER: &str = "CSRFPreventionToken";

/// Proof of a successful sign-in
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub ticket: String,
    pub csrf_token: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TicketData {
    ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    csrf_prevention_token: String,
    #[serde(default)]
    username: Option<String>,
}

/// Owns the transport and the authenticated identity of one client
pub struct SessionManager {
    http: Client,
    jar: Arc<Jar>,
    base_url: Url,
    host: String,
    username: String,
    password: String,
    credential: RwLock<Option<Credential>>,
    /// Serializes verify + sign-in so concurrent callers refresh once
    refresh_lock: Mutex<()>,
    sign_ins: AtomicU64,
}

impl SessionManager {
    /// Build the transport; no request is sent until the first call
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| PveError::Validation(e.to_string()))?;

        let base_url: Url = config
            .host
            .parse()
            .map_err(|e| PveError::Validation(format!("invalid host {}: {}", config.host, e)))?;

        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(PveError::from_transport)?;

        Ok(Self {
            http,
            jar,
            base_url,
            host: config.host.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            credential: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            sign_ins: AtomicU64::new(0),
        })
    }

    /// The shared HTTP client (cookie jar included)
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Full URL of an API path such as `/cluster/resources`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.host, API_PREFIX, path)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Current credential, if a sign-in has succeeded
    pub async fn credential(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    /// Number of successful sign-ins over the session's life
    pub fn sign_in_count(&self) -> u64 {
        self.sign_ins.load(Ordering::SeqCst)
    }

    /// Exchange username/password for a ticket and CSRF token
    ///
    /// On rejection the stored credential and the cookie jar are left as
    /// they were.
    pub async fn sign_in(&self) -> Result<Credential> {
        debug!(username = %self.username, "Signing into PVE");

        let response = self
            .http
            .post(self.endpoint("/access/ticket"))
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .map_err(PveError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!(username = %self.username, %status, "PVE sign-in rejected");
            return Err(PveError::Auth(status.to_string()));
        }

        let envelope: Envelope<TicketData> =
            response.json().await.map_err(PveError::from_transport)?;
        let data = envelope.data;

        let credential = Credential {
            ticket: data.ticket,
            csrf_token: data.csrf_prevention_token,
            username: data.username.unwrap_or_else(|| self.username.clone()),
            issued_at: Utc::now(),
        };

        self.jar.add_cookie_str(
            &format!("{}={}; Path=/", AUTH_COOKIE, credential.ticket),
            &self.base_url,
        );
        *self.credential.write().await = Some(credential.clone());
        self.sign_ins.fetch_add(1, Ordering::SeqCst);

        info!(username = %credential.username, "Signed into PVE");
        Ok(credential)
    }

    /// GET `/version` to see whether the ticket is still accepted
    ///
    /// A rejected check is `Ok(false)`; only connectivity failures are errors.
    pub async fn verify_session(&self) -> Result<bool> {
        debug!("Checking PVE session");

        let response = self
            .http
            .get(self.endpoint("/version"))
            .send()
            .await
            .map_err(PveError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "PVE session not accepted");
            return Ok(false);
        }
        Ok(true)
    }

    /// Verify the session, signing in once if it is missing or stale
    ///
    /// Returns the credential the caller should use for its request. The
    /// refresh lock is released before the caller's request is sent.
    pub async fn ensure_session(&self) -> Result<Credential> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.credential().await;
        let valid = match current {
            Some(_) => self.verify_session().await?,
            None => false,
        };

        if valid {
            if let Some(credential) = current {
                return Ok(credential);
            }
        }

        info!("PVE session missing or expired, signing in again");
        self.sign_in().await
    }
}
