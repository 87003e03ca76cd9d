//! `IdentityProvider` over the hosted auth endpoints

use super::dto::{
    ErrorBody, PasswordCredentials, RefreshTokenRequest, SignUpResponse, TokenResponse, UserDto,
};
use super::SupabaseClient;
use crate::contract::{IdentityUser, Session};
use crate::domain::{AuthChange, AuthChangeKind, IdentityError, IdentityProvider, SignUp};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

/// Refresh a little before the token actually lapses
const EXPIRY_MARGIN_SECS: i64 = 10;

impl SupabaseClient {
    async fn post_token<B: serde::Serialize + ?Sized>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<Response, IdentityError> {
        let mut url = self.endpoint("auth/v1/token").map_err(unavailable)?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        self.request(Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(unavailable)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Option<Session>, IdentityError> {
        let response = self
            .post_token("refresh_token", &RefreshTokenRequest { refresh_token })
            .await?;

        if response.status().is_client_error() {
            // Refresh token revoked or reused; the session is gone
            let message = error_message(response).await;
            tracing::warn!(error = %message, "Session refresh rejected, signing out locally");
            self.set_session(None);
            self.emit(AuthChange {
                kind: AuthChangeKind::SignedOut,
                session: None,
            });
            return Ok(None);
        }

        let token: TokenResponse = parse(response, IdentityError::Unavailable).await?;
        let session = token.into_session(Utc::now());
        self.set_session(Some(session.clone()));
        self.emit(AuthChange {
            kind: AuthChangeKind::TokenRefreshed,
            session: Some(session.clone()),
        });

        tracing::debug!(user_id = %session.user.id, "Session refreshed");
        Ok(Some(session))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        let Some(session) = self.session() else {
            return Ok(None);
        };

        let horizon = Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS);
        if !session.is_expired(horizon) {
            return Ok(Some(session));
        }

        match session.refresh_token.as_deref() {
            Some(refresh_token) => self.refresh_session(refresh_token).await,
            None => {
                self.set_session(None);
                self.emit(AuthChange {
                    kind: AuthChangeKind::SignedOut,
                    session: None,
                });
                Ok(None)
            }
        }
    }

    async fn current_user(&self) -> Result<Option<IdentityUser>, IdentityError> {
        if self.get_session().await?.is_none() {
            return Ok(None);
        }

        let url = self.endpoint("auth/v1/user").map_err(unavailable)?;
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(unavailable)?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }

        let user: UserDto = parse(response, IdentityError::Unavailable).await?;
        Ok(Some(user.into()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let response = self
            .post_token("password", &PasswordCredentials { email, password })
            .await?;

        let token: TokenResponse = parse(response, IdentityError::InvalidCredentials).await?;
        let session = token.into_session(Utc::now());

        self.set_session(Some(session.clone()));
        self.emit(AuthChange {
            kind: AuthChangeKind::SignedIn,
            session: Some(session.clone()),
        });

        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, IdentityError> {
        let url = self.endpoint("auth/v1/signup").map_err(unavailable)?;
        let response = self
            .request(Method::POST, url)
            .json(&PasswordCredentials { email, password })
            .send()
            .await
            .map_err(unavailable)?;

        let sign_up = match parse(response, IdentityError::Rejected).await? {
            SignUpResponse::Session(token) => {
                let session = token.into_session(Utc::now());
                self.set_session(Some(session.clone()));
                self.emit(AuthChange {
                    kind: AuthChangeKind::SignedIn,
                    session: Some(session.clone()),
                });
                SignUp {
                    user: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::User(user) => SignUp {
                user: user.into(),
                session: None,
            },
        };

        tracing::info!(
            user_id = %sign_up.user.id,
            confirmed = sign_up.session.is_some(),
            "Account created"
        );
        Ok(sign_up)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if self.session().is_none() {
            return Ok(());
        }

        let url = self.endpoint("auth/v1/logout").map_err(unavailable)?;
        let response = self
            .request(Method::POST, url)
            .send()
            .await
            .map_err(unavailable)?;

        // An already invalid token still ends the local session
        let status = response.status();
        if status.is_server_error() {
            return Err(IdentityError::Unavailable(error_message(response).await));
        }
        if status.is_client_error() {
            tracing::debug!(%status, "Logout rejected by provider, clearing local session");
        }

        self.set_session(None);
        self.emit(AuthChange {
            kind: AuthChangeKind::SignedOut,
            session: None,
        });

        tracing::info!("Signed out");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.auth_subscribe()
    }
}

fn unavailable(err: impl std::fmt::Display) -> IdentityError {
    IdentityError::Unavailable(err.to_string())
}

/// Decode a success body, or build the error with `on_client_error` for 4xx
async fn parse<T: DeserializeOwned>(
    response: Response,
    on_client_error: fn(String) -> IdentityError,
) -> Result<T, IdentityError> {
    let status = response.status();
    if status.is_client_error() {
        return Err(on_client_error(error_message(response).await));
    }
    if !status.is_success() {
        return Err(IdentityError::Unavailable(error_message(response).await));
    }

    response.json::<T>().await.map_err(unavailable)
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
