//! Repository traits for data access
//!
//! These traits define the interface for the three backend tables.
//! Implementations are in infra/storage (SeaORM) and infra/supabase (REST).

use crate::contract::{Admin, MenuItem, MenuUpdate, NewAdmin, NewMenuUpdate};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for the `menu_items` table
#[async_trait]
pub trait MenuItemRepository: Send + Sync {
    /// All items ordered by category ascending, then name ascending
    async fn list_ordered(&self) -> Result<Vec<MenuItem>>;

    /// Find an item by id
    async fn find_by_id(&self, id: i32) -> Result<Option<MenuItem>>;

    /// Set `is_available` on one item.
    ///
    /// Returns `false` when no row matched `id`.
    async fn set_availability(&self, id: i32, is_available: bool) -> Result<bool>;
}

/// Repository for the `admins` table
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Find an admin with `is_active = true`
    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<Admin>>;

    /// Insert a new admin row with `is_active = true`
    async fn create(&self, admin: &NewAdmin) -> Result<Admin>;
}

/// Repository for the append-only `menu_updates` table
#[async_trait]
pub trait MenuUpdateRepository: Send + Sync {
    /// Append an audit row; storage assigns `id` and `created_at`
    async fn append(&self, update: &NewMenuUpdate) -> Result<MenuUpdate>;

    /// Newest rows first, at most `limit`
    async fn list_recent(&self, limit: u64) -> Result<Vec<MenuUpdate>>;
}
