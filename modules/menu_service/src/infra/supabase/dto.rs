//! Wire shapes of the hosted auth and REST endpoints

use crate::contract::{
    Admin, IdentityUser, MenuItem, MenuUpdate, NewAdmin, NewMenuUpdate, Session,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ===== Auth =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: UserDto,
}

/// Sign-up returns a session when email confirmation is off, otherwise the
/// bare user
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(TokenResponse),
    User(UserDto),
}

#[derive(Debug, Serialize)]
pub struct PasswordCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Error bodies differ between endpoints; take whichever field is present
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

impl From<UserDto> for IdentityUser {
    fn from(dto: UserDto) -> Self {
        Self {
            id: dto.id,
            email: dto.email,
        }
    }
}

impl TokenResponse {
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| {
                self.expires_in
                    .and_then(Duration::try_seconds)
                    .and_then(|ttl| now.checked_add_signed(ttl))
            });

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

/// Session as kept in the session file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: UserDto,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
            user: UserDto {
                id: session.user.id,
                email: session.user.email.clone(),
            },
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
            expires_at: stored.expires_at,
            user: stored.user.into(),
        }
    }
}

// ===== Realtime =====

/// Outgoing channel frame
#[derive(Debug, Serialize)]
pub struct OutboundFrame<'a, P> {
    pub topic: &'a str,
    pub event: &'a str,
    pub payload: P,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

/// Incoming channel frame; the payload shape depends on `event`
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JoinPayload<'a> {
    pub config: JoinConfig,
    pub access_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct JoinConfig {
    pub postgres_changes: Vec<PostgresChangesFilter>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PostgresChangesFilter {
    /// `*`, `INSERT`, `UPDATE` or `DELETE`
    pub event: &'static str,
    pub schema: &'static str,
    pub table: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenPayload<'a> {
    pub access_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ReplyPayload {
    pub status: String,
    #[serde(default)]
    pub response: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct PostgresChangesPayload {
    pub data: PostgresChange,
}

#[derive(Debug, Deserialize)]
pub struct PostgresChange {
    pub table: String,
    /// `INSERT`, `UPDATE` or `DELETE`
    #[serde(rename = "type")]
    pub kind: String,
}

// ===== Tables =====

#[derive(Debug, Clone, Deserialize)]
pub struct MenuItemRow {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub image: String,
    pub is_available: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category: row.category,
            image: row.image,
            is_available: row.is_available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvailabilityPatch {
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AdminRow> for Admin {
    type Error = anyhow::Error;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role.parse()?,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct NewAdminRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub name: &'a str,
    pub role: &'static str,
    pub is_active: bool,
}

impl<'a> From<&'a NewAdmin> for NewAdminRow<'a> {
    fn from(admin: &'a NewAdmin) -> Self {
        Self {
            id: admin.id,
            email: &admin.email,
            name: &admin.name,
            role: admin.role.as_str(),
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuUpdateRow {
    pub id: i64,
    pub admin_id: Uuid,
    pub admin_name: String,
    pub item_id: i32,
    pub item_name: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<MenuUpdateRow> for MenuUpdate {
    type Error = anyhow::Error;

    fn try_from(row: MenuUpdateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            admin_id: row.admin_id,
            admin_name: row.admin_name,
            item_id: row.item_id,
            item_name: row.item_name,
            action: row.action.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct NewMenuUpdateRow<'a> {
    pub admin_id: Uuid,
    pub admin_name: &'a str,
    pub item_id: i32,
    pub item_name: &'a str,
    pub action: &'static str,
}

impl<'a> From<&'a NewMenuUpdate> for NewMenuUpdateRow<'a> {
    fn from(update: &'a NewMenuUpdate) -> Self {
        Self {
            admin_id: update.admin_id,
            admin_name: &update.admin_name,
            item_id: update.item_id,
            item_name: &update.item_name,
            action: update.action.as_str(),
        }
    }
}
