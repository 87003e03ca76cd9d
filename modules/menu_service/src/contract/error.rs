//! Contract error types for menu service
//!
//! These errors are transport-agnostic and used for inter-module communication.

use uuid::Uuid;

/// Menu service domain errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuError {
    /// Backend connection parameters missing, placeholder or malformed
    NotConfigured {
        /// What is wrong with the configuration
        reason: String,
    },
    /// Identity session could not be retrieved
    Session {
        /// Provider error message
        message: String,
    },
    /// Identity is authenticated but has no active admin row
    NotProvisioned {
        /// Identity provider user id
        user_id: Uuid,
    },
    /// Credentials rejected by the identity provider
    Authentication {
        /// Provider error message
        message: String,
    },
    /// Catalog or audit read failed
    Query {
        /// Storage error message
        message: String,
    },
    /// Availability write failed
    Write {
        /// Storage error message
        message: String,
    },
    /// Identity account created but the admin profile insert failed
    ProfileCreation {
        /// The orphaned identity
        user_id: Uuid,
        /// Storage error message
        message: String,
    },
    /// Referenced row does not exist
    NotFound {
        /// Resource type (menu_item, admin)
        resource: String,
        /// Resource identifier
        id: String,
    },
    /// Validation error
    Validation {
        /// Validation error message
        message: String,
    },
    /// Bounded wait expired
    Timeout {
        /// Operation that timed out
        operation: String,
    },
    /// Internal error
    Internal,
}

impl MenuError {
    /// Whether a manual retry can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Session { .. } | Self::Query { .. } | Self::Write { .. } | Self::Timeout { .. }
        )
    }
}

impl std::fmt::Display for MenuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured { reason } => {
                write!(f, "Backend not configured: {}", reason)
            }
            Self::Session { message } => {
                write!(f, "Session error: {}", message)
            }
            Self::NotProvisioned { user_id } => {
                write!(f, "Account {} is not registered as an active admin", user_id)
            }
            Self::Authentication { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            Self::Query { message } => {
                write!(f, "Query failed: {}", message)
            }
            Self::Write { message } => {
                write!(f, "Write failed: {}", message)
            }
            Self::ProfileCreation { user_id, message } => {
                write!(
                    f,
                    "Admin profile creation failed for account {}: {}",
                    user_id, message
                )
            }
            Self::NotFound { resource, id } => {
                write!(f, "{} not found: {}", resource, id)
            }
            Self::Validation { message } => {
                write!(f, "Validation error: {}", message)
            }
            Self::Timeout { operation } => {
                write!(f, "Timed out: {}", operation)
            }
            Self::Internal => {
                write!(f, "Internal error")
            }
        }
    }
}

impl std::error::Error for MenuError {}
