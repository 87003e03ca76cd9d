//! Contract layer - public API for inter-module communication
//!
//! This layer contains transport-agnostic models and the native client trait.
//! NO serde derives on models - these are pure domain types.

pub mod client;
pub mod error;
pub mod model;

pub use client::MenuApi;
pub use error::MenuError;
pub use model::{
    Admin, AdminRole, AvailabilityOutcome, BulkAvailabilityReport, BulkItemResult,
    IdentityUser, MenuItem, MenuUpdate, NewAdmin, NewMenuUpdate, Session, UpdateAction,
};
