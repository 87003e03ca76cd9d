//! View navigation state machine
//!
//! `Home -> Login -> Admin`, with the admin view guarded by a valid
//! session paired with an active admin row.

use super::session::SessionManager;
use crate::contract::MenuError;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Login,
    Admin,
    /// Backend connection parameters are missing or invalid
    NotConfigured,
}

pub struct ViewController {
    session: Option<Arc<SessionManager>>,
    requested: Mutex<View>,
}

impl ViewController {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            session: Some(session),
            requested: Mutex::new(View::Home),
        }
    }

    /// Controller pinned to [`View::NotConfigured`]
    pub fn not_configured() -> Self {
        Self {
            session: None,
            requested: Mutex::new(View::NotConfigured),
        }
    }

    /// View to render, after the admin guard
    pub fn current_view(&self) -> View {
        let Some(session) = &self.session else {
            return View::NotConfigured;
        };

        let mut requested = self.requested.lock();
        if *requested == View::Admin {
            let auth = session.current();
            if !auth.is_authenticated() {
                let fallback = if auth.session.is_some() {
                    View::Login
                } else {
                    View::Home
                };
                tracing::debug!(?fallback, "Admin view without an authenticated admin; redirecting");
                *requested = fallback;
            }
        }
        *requested
    }

    /// `Home -> Login`
    pub fn request_admin_access(&self) -> View {
        self.transition(View::Home, View::Login)
    }

    /// `Login -> Home`
    pub fn back(&self) -> View {
        self.transition(View::Login, View::Home)
    }

    /// Sign in from the login view.
    ///
    /// Moves to `Admin` only when the identity resolves to an active admin;
    /// an unprovisioned identity stays on `Login` with `NotProvisioned`.
    pub async fn login(&self, email: &str, password: &str) -> Result<View, MenuError> {
        let session = self.login_session()?;
        session.sign_in(email, password).await?;
        self.enter_admin(session)
    }

    /// Register from the login view, then enter admin if a session came back
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<View, MenuError> {
        let session = self.login_session()?;
        session.sign_up(email, password, name).await?;

        if session.current().session.is_none() {
            // Provider wants email confirmation before the first sign-in
            return Ok(View::Login);
        }
        self.enter_admin(session)
    }

    /// `Admin -> Home`, ending the identity session.
    ///
    /// The view moves to `Home` even when sign-out fails; the error is
    /// still returned.
    pub async fn logout(&self) -> Result<View, MenuError> {
        let Some(session) = &self.session else {
            return Ok(View::NotConfigured);
        };

        let result = session.sign_out().await;
        *self.requested.lock() = View::Home;
        result.map(|_| View::Home)
    }

    fn login_session(&self) -> Result<&Arc<SessionManager>, MenuError> {
        let Some(session) = &self.session else {
            return Err(MenuError::NotConfigured {
                reason: "backend connection parameters are missing".to_string(),
            });
        };

        if *self.requested.lock() != View::Login {
            return Err(MenuError::Validation {
                message: "sign-in is only available from the login view".to_string(),
            });
        }
        Ok(session)
    }

    fn enter_admin(&self, session: &SessionManager) -> Result<View, MenuError> {
        let auth = session.current();
        if auth.is_authenticated() {
            *self.requested.lock() = View::Admin;
            return Ok(View::Admin);
        }

        if let Some(error) = auth.error {
            return Err(error);
        }
        match auth.unprovisioned_user() {
            Some(user_id) => Err(MenuError::NotProvisioned { user_id }),
            None => Err(MenuError::Session {
                message: "no session after authentication".to_string(),
            }),
        }
    }

    fn transition(&self, from: View, to: View) -> View {
        if self.session.is_none() {
            return View::NotConfigured;
        }

        let mut requested = self.requested.lock();
        if *requested == from {
            *requested = to;
        } else {
            tracing::debug!(current = ?*requested, ?from, ?to, "Ignoring navigation");
        }
        *requested
    }
}
