//! Menu Service Module
//!
//! Restaurant menu availability: a public catalog of dishes, admins who
//! toggle what is served today, and an audit feed of every change.
//! Catalog and audit views refresh on realtime change notifications.

// Public exports
pub mod contract;
pub use contract::{
    client::MenuApi, error::MenuError, Admin, AdminRole, AvailabilityOutcome,
    BulkAvailabilityReport, MenuItem, MenuUpdate, UpdateAction,
};

pub mod module;
pub use module::{Backend, Components, MenuServiceModule, ModuleStatus};

pub mod config;
pub use config::Config;

pub mod logging;

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
