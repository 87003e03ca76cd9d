//! Identity provider abstraction
//!
//! Wraps the hosted authentication service. The trait allows switching
//! between the Supabase adapter and in-memory fakes in tests.

use crate::contract::{IdentityUser, MenuError, Session};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Error type for identity provider operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("No active session")]
    NoSession,
}

impl From<IdentityError> for MenuError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials(message) | IdentityError::Rejected(message) => {
                MenuError::Authentication { message }
            }
            IdentityError::Unavailable(message) => MenuError::Session { message },
            IdentityError::NoSession => MenuError::Session {
                message: "no active session".to_string(),
            },
        }
    }
}

/// Kind of session change pushed by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Session change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub kind: AuthChangeKind,
    /// Session after the change; `None` once signed out
    pub session: Option<Session>,
}

/// Account created by sign-up.
///
/// `session` is `None` when the provider requires email confirmation first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    pub user: IdentityUser,
    pub session: Option<Session>,
}

/// Trait for communicating with the identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, refreshed if the provider supports it
    async fn get_session(&self) -> Result<Option<Session>, IdentityError>;

    /// User behind the current session
    async fn current_user(&self) -> Result<Option<IdentityUser>, IdentityError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Session change notifications for the lifetime of the provider
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}
