//! Domain service - availability changes, catalog and audit reads

use super::events::{ChangeEvent, EventPublisher, Table};
use super::identity::IdentityProvider;
use super::repository::{MenuItemRepository, MenuUpdateRepository};
use super::validation::validate_admin_name;
use crate::contract::{
    AvailabilityOutcome, BulkAvailabilityReport, BulkItemResult, MenuError, MenuItem,
    MenuUpdate, NewMenuUpdate, UpdateAction,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Domain service for menu availability.
///
/// The only component that mutates `is_available`. It trusts its caller to
/// have checked that the acting admin is authenticated and active.
pub struct Service {
    menu_items: Arc<dyn MenuItemRepository>,
    menu_updates: Arc<dyn MenuUpdateRepository>,
    identity: Arc<dyn IdentityProvider>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl Service {
    /// Create a new service instance
    pub fn new(
        menu_items: Arc<dyn MenuItemRepository>,
        menu_updates: Arc<dyn MenuUpdateRepository>,
        identity: Arc<dyn IdentityProvider>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            menu_items,
            menu_updates,
            identity,
            event_publisher,
        }
    }

    // ===== Catalog =====

    /// All items ordered by category, then name
    pub async fn list_menu_items(&self) -> Result<Vec<MenuItem>, MenuError> {
        self.menu_items.list_ordered().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch menu items");
            MenuError::Query {
                message: e.to_string(),
            }
        })
    }

    // ===== Availability =====

    /// Change one item's availability, then append the audit row.
    ///
    /// The two writes are not atomic. `Err` means nothing was applied;
    /// `PartiallyApplied` means the item changed but the audit row is missing.
    pub async fn set_availability(
        &self,
        item_id: i32,
        is_available: bool,
        acting_admin_name: &str,
    ) -> Result<AvailabilityOutcome, MenuError> {
        let acting_admin_name = validate_admin_name(acting_admin_name)?;

        let matched = self
            .menu_items
            .set_availability(item_id, is_available)
            .await
            .map_err(|e| {
                tracing::error!(item_id, error = %e, "Failed to update item availability");
                MenuError::Write {
                    message: e.to_string(),
                }
            })?;

        if !matched {
            return Err(MenuError::NotFound {
                resource: "menu_item".to_string(),
                id: item_id.to_string(),
            });
        }

        self.publish(ChangeEvent::updated(Table::MenuItems)).await;

        match self
            .record_update(item_id, is_available, acting_admin_name)
            .await
        {
            Ok(update) => {
                self.publish(ChangeEvent::inserted(Table::MenuUpdates)).await;
                tracing::info!(
                    item_id,
                    item_name = %update.item_name,
                    action = %update.action,
                    admin = %update.admin_name,
                    "Menu item availability changed"
                );
                Ok(AvailabilityOutcome::Applied(update))
            }
            Err(reason) => {
                tracing::warn!(
                    item_id,
                    is_available,
                    reason = %reason,
                    "Availability changed without an audit record"
                );
                Ok(AvailabilityOutcome::PartiallyApplied {
                    item_id,
                    is_available,
                    reason,
                })
            }
        }
    }

    /// Apply the same availability to each item in order.
    ///
    /// Calls are independent: a failure is recorded and the loop moves on.
    pub async fn set_availability_bulk(
        &self,
        item_ids: &[i32],
        is_available: bool,
        acting_admin_name: &str,
    ) -> BulkAvailabilityReport {
        let changes: Vec<(i32, bool)> = item_ids.iter().map(|&id| (id, is_available)).collect();
        self.apply_changes(&changes, acting_admin_name).await
    }

    /// Make exactly the `selected` items available.
    ///
    /// Only items whose availability differs from the selection are written.
    pub async fn apply_selection(
        &self,
        selected: &[i32],
        acting_admin_name: &str,
    ) -> Result<BulkAvailabilityReport, MenuError> {
        validate_admin_name(acting_admin_name)?;

        let items = self.list_menu_items().await?;
        let selected: HashSet<i32> = selected.iter().copied().collect();

        let known: HashSet<i32> = items.iter().map(|item| item.id).collect();
        for unknown in selected.difference(&known) {
            tracing::warn!(item_id = unknown, "Selected item is not in the catalog; ignoring");
        }

        let changes: Vec<(i32, bool)> = items
            .iter()
            .filter_map(|item| {
                let wanted = selected.contains(&item.id);
                (item.is_available != wanted).then_some((item.id, wanted))
            })
            .collect();

        tracing::debug!(changes = changes.len(), "Applying availability selection");
        Ok(self.apply_changes(&changes, acting_admin_name).await)
    }

    /// Make every catalog item available
    pub async fn select_all(
        &self,
        acting_admin_name: &str,
    ) -> Result<BulkAvailabilityReport, MenuError> {
        let ids: Vec<i32> = self
            .list_menu_items()
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect();
        self.apply_selection(&ids, acting_admin_name).await
    }

    /// Make every catalog item unavailable
    pub async fn deselect_all(
        &self,
        acting_admin_name: &str,
    ) -> Result<BulkAvailabilityReport, MenuError> {
        self.apply_selection(&[], acting_admin_name).await
    }

    // ===== Audit =====

    /// Newest audit rows first, never more than `limit`
    pub async fn list_recent_updates(&self, limit: usize) -> Result<Vec<MenuUpdate>, MenuError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut updates = self
            .menu_updates
            .list_recent(limit as u64)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to fetch recent updates");
                MenuError::Query {
                    message: e.to_string(),
                }
            })?;

        updates.truncate(limit);
        Ok(updates)
    }

    // ===== Helper Methods =====

    async fn apply_changes(
        &self,
        changes: &[(i32, bool)],
        acting_admin_name: &str,
    ) -> BulkAvailabilityReport {
        let mut report = BulkAvailabilityReport::default();

        for &(item_id, is_available) in changes {
            let result = self
                .set_availability(item_id, is_available, acting_admin_name)
                .await;
            if let Err(e) = &result {
                tracing::warn!(item_id, error = %e, "Bulk availability change failed for item");
            }
            report.items.push(BulkItemResult {
                item_id,
                is_available,
                result,
            });
        }

        report
    }

    /// Second write of `set_availability`; the error is the reason the audit
    /// row is missing.
    async fn record_update(
        &self,
        item_id: i32,
        is_available: bool,
        acting_admin_name: &str,
    ) -> Result<MenuUpdate, String> {
        let item = self
            .menu_items
            .find_by_id(item_id)
            .await
            .map_err(|e| format!("item lookup failed: {}", e))?
            .ok_or_else(|| format!("menu item {} disappeared before auditing", item_id))?;

        let user = self
            .identity
            .current_user()
            .await
            .map_err(|e| format!("identity lookup failed: {}", e))?
            .ok_or_else(|| "no signed-in identity to attribute the change to".to_string())?;

        let update = NewMenuUpdate {
            admin_id: user.id,
            admin_name: acting_admin_name.to_string(),
            item_id,
            item_name: item.name,
            action: UpdateAction::from_availability(is_available),
        };

        self.menu_updates
            .append(&update)
            .await
            .map_err(|e| format!("audit insert failed: {}", e))
    }

    async fn publish(&self, event: ChangeEvent) {
        if let Err(e) = self.event_publisher.publish(event).await {
            // Log error but don't fail the operation
            tracing::warn!(error = %e, "Failed to publish change event");
        }
    }
}
