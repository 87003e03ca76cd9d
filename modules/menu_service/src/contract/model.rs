//! Contract models for menu service
//!
//! These models are transport-agnostic and used for inter-module communication.
//! NO serde derives - wire shapes live next to each backend adapter.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::MenuError;

/// A catalog entry shown on the menu board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    /// Stable identifier assigned by storage, never reassigned
    pub id: i32,
    /// Display name
    pub name: String,
    /// Display grouping (e.g. "Breakfast", "Beverages")
    pub category: String,
    /// URI of the display image
    pub image: String,
    /// Whether the item is currently offered
    pub is_available: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Admin role. Carried on every admin row; no operation branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminRole {
    Admin,
    SuperAdmin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl Default for AdminRole {
    fn default() -> Self {
        Self::Admin
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = MenuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(MenuError::Validation {
                message: format!("unknown admin role '{}'", other),
            }),
        }
    }
}

/// Staff member allowed to manage the menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admin {
    /// Shared with the identity provider's user id
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    /// Inactive admins are treated as unauthenticated
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin row to insert on sign-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdmin {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
}

/// Direction of an availability change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateAction {
    /// Item became available
    Added,
    /// Item stopped being available
    Removed,
}

impl UpdateAction {
    pub fn from_availability(is_available: bool) -> Self {
        if is_available {
            Self::Added
        } else {
            Self::Removed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateAction {
    type Err = MenuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "added" => Ok(Self::Added),
            "removed" => Ok(Self::Removed),
            other => Err(MenuError::Validation {
                message: format!("unknown update action '{}'", other),
            }),
        }
    }
}

/// Audit record of one availability change.
///
/// Admin and item names are snapshots taken at write time and are never
/// re-joined, so the history stays readable after renames or removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuUpdate {
    pub id: i64,
    pub admin_id: Uuid,
    pub admin_name: String,
    pub item_id: i32,
    pub item_name: String,
    pub action: UpdateAction,
    pub created_at: DateTime<Utc>,
}

/// Audit row to append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMenuUpdate {
    pub admin_id: Uuid,
    pub admin_name: String,
    pub item_id: i32,
    pub item_name: String,
    pub action: UpdateAction,
}

/// User record held by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Authenticated identity session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: IdentityUser,
}

impl Session {
    /// Whether the access token has passed its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Result of an availability change that reached storage.
///
/// `Err` from the service means nothing was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityOutcome {
    /// Availability changed and the audit row was written
    Applied(MenuUpdate),
    /// Availability changed but no audit row exists for it
    PartiallyApplied {
        item_id: i32,
        is_available: bool,
        reason: String,
    },
}

impl AvailabilityOutcome {
    pub fn is_fully_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn audit_record(&self) -> Option<&MenuUpdate> {
        match self {
            Self::Applied(update) => Some(update),
            Self::PartiallyApplied { .. } => None,
        }
    }
}

/// Per-item result of a bulk toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResult {
    pub item_id: i32,
    pub is_available: bool,
    pub result: Result<AvailabilityOutcome, MenuError>,
}

/// Outcome of a sequence of independent availability changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkAvailabilityReport {
    pub items: Vec<BulkItemResult>,
}

impl BulkAvailabilityReport {
    /// Ids of every item that was attempted, in call order
    pub fn attempted(&self) -> Vec<i32> {
        self.items.iter().map(|r| r.item_id).collect()
    }

    /// Ids whose availability reached storage (fully or partially applied)
    pub fn succeeded(&self) -> Vec<i32> {
        self.items
            .iter()
            .filter(|r| r.result.is_ok())
            .map(|r| r.item_id)
            .collect()
    }

    pub fn failed(&self) -> Vec<(i32, &MenuError)> {
        self.items
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.item_id, e)))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|r| r.result.is_ok())
    }
}
