//! Session and admin identity resolution
//!
//! Pairs an identity provider session with its admin directory row and
//! publishes the combined state to watchers.

use super::events::{ChangeEvent, EventPublisher, Table};
use super::identity::IdentityProvider;
use super::repository::AdminRepository;
use super::validation::{validate_credentials, validate_sign_up};
use crate::contract::{Admin, AdminRole, MenuError, NewAdmin, Session};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Combined identity and admin state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    /// True until the first session restore completes
    pub loading: bool,
    pub session: Option<Session>,
    /// Active admin row for `session`, if provisioned
    pub admin: Option<Admin>,
    /// Last session or lookup error, kept for a retry affordance
    pub error: Option<MenuError>,
}

impl AuthState {
    fn initial() -> Self {
        Self {
            loading: true,
            session: None,
            admin: None,
            error: None,
        }
    }

    fn signed_out() -> Self {
        Self {
            loading: false,
            ..Self::initial()
        }
    }

    /// Valid session AND an active admin row
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some() && self.admin.as_ref().is_some_and(|a| a.is_active)
    }

    /// Identity is signed in but not registered as an active admin
    pub fn unprovisioned_user(&self) -> Option<Uuid> {
        match (&self.session, &self.admin) {
            (Some(session), None) if self.error.is_none() => Some(session.user.id),
            _ => None,
        }
    }
}

/// Session/identity adapter
pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    admins: Arc<dyn AdminRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    restore_timeout: Duration,
    state: watch::Sender<AuthState>,
}

impl SessionManager {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        admins: Arc<dyn AdminRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        restore_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::initial());
        Self {
            identity,
            admins,
            event_publisher,
            restore_timeout,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Restore the provider session once at startup.
    ///
    /// Fails open: provider errors and the bounded wait expiring both leave
    /// the state unauthenticated with the error recorded.
    pub async fn restore_session(&self) -> Option<Session> {
        let (session, error) =
            match tokio::time::timeout(self.restore_timeout, self.identity.get_session()).await {
                Ok(Ok(session)) => (session, None),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Session restore failed; continuing signed out");
                    (None, Some(MenuError::from(e)))
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = self.restore_timeout.as_millis() as u64,
                        "Session restore timed out; continuing signed out"
                    );
                    (
                        None,
                        Some(MenuError::Timeout {
                            operation: "session restore".to_string(),
                        }),
                    )
                }
            };

        self.apply_session(session.clone(), error).await;
        session
    }

    /// Look up the active admin row for an identity.
    ///
    /// `Ok(None)` means the identity is not provisioned; `Err` is a storage
    /// failure.
    pub async fn resolve_admin(&self, user_id: Uuid) -> Result<Option<Admin>, MenuError> {
        let admin = self.admins.find_active_by_id(user_id).await.map_err(|e| {
            tracing::error!(%user_id, error = %e, "Failed to fetch admin profile");
            MenuError::Query {
                message: e.to_string(),
            }
        })?;

        Ok(admin.filter(|a| a.is_active))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, MenuError> {
        validate_credentials(email, password)?;

        let session = self
            .identity
            .sign_in_with_password(email.trim(), password)
            .await
            .map_err(|e| {
                tracing::info!(error = %e, "Sign-in rejected");
                MenuError::from(e)
            })?;

        self.apply_session(Some(session.clone()), None).await;
        Ok(session)
    }

    /// Create the identity account, then its admin row.
    ///
    /// The two writes are not atomic: a failed profile insert leaves the
    /// identity account in place and returns `ProfileCreation`.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Admin, MenuError> {
        validate_sign_up(email, password, name)?;
        let email = email.trim();

        let sign_up = self
            .identity
            .sign_up(email, password)
            .await
            .map_err(MenuError::from)?;
        let user_id = sign_up.user.id;

        let new_admin = NewAdmin {
            id: user_id,
            email: email.to_string(),
            name: name.trim().to_string(),
            role: AdminRole::Admin,
        };

        let admin = self.admins.create(&new_admin).await.map_err(|e| {
            tracing::error!(
                %user_id,
                error = %e,
                "Admin profile insert failed; identity account has no profile"
            );
            MenuError::ProfileCreation {
                user_id,
                message: e.to_string(),
            }
        })?;

        if let Err(e) = self
            .event_publisher
            .publish(ChangeEvent::inserted(Table::Admins))
            .await
        {
            tracing::warn!(error = %e, "Failed to publish change event");
        }
        tracing::info!(%user_id, name = %admin.name, "Admin registered");

        if let Some(session) = sign_up.session {
            self.apply_session(Some(session), None).await;
        }

        Ok(admin)
    }

    pub async fn sign_out(&self) -> Result<(), MenuError> {
        self.identity.sign_out().await.map_err(|e| {
            tracing::warn!(error = %e, "Sign-out failed");
            MenuError::from(e)
        })?;

        self.state.send_replace(AuthState::signed_out());
        Ok(())
    }

    /// Follow provider session changes until `cancel` fires, re-resolving the
    /// admin row on every change.
    pub fn spawn_listener(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let mut changes = self.identity.subscribe();
        let this = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    change = changes.recv() => match change {
                        Ok(change) => {
                            tracing::debug!(kind = ?change.kind, "Auth state changed");
                            this.apply_session(change.session, None).await;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Auth listener lagged; re-reading session");
                            // The re-read covers everything still buffered
                            changes = changes.resubscribe();
                            match this.identity.get_session().await {
                                Ok(session) => this.apply_session(session, None).await,
                                Err(e) => {
                                    tracing::warn!(error = %e, "Session re-read after lag failed");
                                    this.apply_session(None, Some(MenuError::from(e))).await;
                                }
                            }
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!("Auth listener stopped");
        })
    }

    async fn apply_session(&self, session: Option<Session>, error: Option<MenuError>) {
        let (admin, error) = match &session {
            Some(s) => match self.resolve_admin(s.user.id).await {
                Ok(admin) => {
                    if admin.is_none() {
                        tracing::info!(user_id = %s.user.id, "Signed-in identity is not an active admin");
                    }
                    (admin, error)
                }
                Err(e) => (None, Some(e)),
            },
            None => (None, error),
        };

        self.state.send_replace(AuthState {
            loading: false,
            session,
            admin,
            error,
        });
    }
}
