//! Hosted backend adapter
//!
//! One `SupabaseClient` talks to both the auth endpoints (`/auth/v1`) and the
//! table endpoints (`/rest/v1`). Table requests carry the signed-in user's
//! access token when there is one so row-level policies apply.
//! `SupabaseRealtime` follows row changes made by any client over the
//! realtime websocket.

pub mod auth;
pub mod dto;
pub mod realtime;
pub mod rest;
pub mod session_store;

pub use realtime::SupabaseRealtime;
pub use rest::{RestAdminRepository, RestMenuItemRepository, RestMenuUpdateRepository};
pub use session_store::SessionStore;

use crate::config::BackendConfig;
use crate::contract::Session;
use crate::domain::{AuthChange, AuthChangeKind};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder};
use std::time::Duration;
use tokio::sync::broadcast;
use url::Url;

const AUTH_EVENTS_CAPACITY: usize = 16;

pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
    request_timeout: Duration,
    session: RwLock<Option<Session>>,
    store: Option<SessionStore>,
    auth_events: broadcast::Sender<AuthChange>,
}

impl SupabaseClient {
    pub fn new(backend: &BackendConfig, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        // `Url::join` replaces the last path segment unless the base ends in '/'
        let mut base_url = backend.url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let (auth_events, _) = broadcast::channel(AUTH_EVENTS_CAPACITY);

        Ok(Self {
            http,
            base_url,
            anon_key: backend.anon_key.clone(),
            request_timeout,
            session: RwLock::new(None),
            store: None,
            auth_events,
        })
    }

    /// Persist sign-in, refresh and sign-out to `store`, starting from the
    /// session it already holds. An unreadable file starts signed out.
    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        match store.load() {
            Ok(Some(session)) => {
                tracing::info!(
                    user_id = %session.user.id,
                    path = %store.path().display(),
                    "Loaded stored session"
                );
                *self.session.get_mut() = Some(session);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "Ignoring stored session");
            }
        }
        self.store = Some(store);
        self
    }

    /// Session held in memory, without contacting the provider
    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Seed a session persisted by the embedding application. Not written to
    /// the session store.
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.write() = session;
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid endpoint path '{path}'"))
    }

    /// Signed-in user's access token, or the project key
    pub(crate) fn bearer(&self) -> String {
        self.session
            .read()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    /// Request with the project key and the current bearer token
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    pub(crate) fn emit(&self, change: AuthChange) {
        self.persist(&change);
        if self.auth_events.send(change).is_err() {
            tracing::trace!("No auth change subscribers");
        }
    }

    pub(crate) fn auth_subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.auth_events.subscribe()
    }

    // A failed write only costs the next restore
    fn persist(&self, change: &AuthChange) {
        let Some(store) = &self.store else {
            return;
        };
        let result = match (change.kind, &change.session) {
            (AuthChangeKind::SignedOut, _) | (_, None) => store.clear(),
            (_, Some(session)) => store.save(session),
        };
        if let Err(e) = result {
            tracing::warn!(
                kind = ?change.kind,
                error = %format!("{e:#}"),
                "Failed to update stored session"
            );
        }
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url.as_str())
            .field("signed_in", &self.session.read().is_some())
            .finish()
    }
}
