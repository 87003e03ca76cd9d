//! Native client trait for inter-module communication
//!
//! This trait defines the API that other modules use to read the menu and
//! change availability. NO HTTP - direct function calls.

use super::{
    error::MenuError,
    model::{AvailabilityOutcome, BulkAvailabilityReport, MenuItem, MenuUpdate},
};
use async_trait::async_trait;

/// Menu service API for inter-module communication
#[async_trait]
pub trait MenuApi: Send + Sync {
    // ===== Catalog =====

    /// All menu items ordered by category, then name
    async fn list_menu_items(&self) -> Result<Vec<MenuItem>, MenuError>;

    // ===== Availability =====

    /// Change availability of one item and record the audit row
    async fn set_availability(
        &self,
        item_id: i32,
        is_available: bool,
        acting_admin_name: &str,
    ) -> Result<AvailabilityOutcome, MenuError>;

    /// Apply the same availability to many items, one independent call each
    async fn set_availability_bulk(
        &self,
        item_ids: &[i32],
        is_available: bool,
        acting_admin_name: &str,
    ) -> BulkAvailabilityReport;

    /// Make exactly `selected` available, toggling only items that differ
    async fn apply_selection(
        &self,
        selected: &[i32],
        acting_admin_name: &str,
    ) -> Result<BulkAvailabilityReport, MenuError>;

    // ===== Audit =====

    /// Most recent availability changes, newest first
    async fn list_recent_updates(&self, limit: usize) -> Result<Vec<MenuUpdate>, MenuError>;
}
