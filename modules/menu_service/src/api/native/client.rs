//! Native client implementation - wraps domain service for in-process calls

use crate::contract::{
    AvailabilityOutcome, BulkAvailabilityReport, MenuApi, MenuError, MenuItem, MenuUpdate,
};
use crate::domain::Service;
use async_trait::async_trait;
use std::sync::Arc;

/// Native client implementation that directly calls the domain service
#[derive(Clone)]
pub struct NativeClient {
    service: Arc<Service>,
}

impl NativeClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl MenuApi for NativeClient {
    async fn list_menu_items(&self) -> Result<Vec<MenuItem>, MenuError> {
        self.service.list_menu_items().await
    }

    async fn set_availability(
        &self,
        item_id: i32,
        is_available: bool,
        acting_admin_name: &str,
    ) -> Result<AvailabilityOutcome, MenuError> {
        self.service
            .set_availability(item_id, is_available, acting_admin_name)
            .await
    }

    async fn set_availability_bulk(
        &self,
        item_ids: &[i32],
        is_available: bool,
        acting_admin_name: &str,
    ) -> BulkAvailabilityReport {
        self.service
            .set_availability_bulk(item_ids, is_available, acting_admin_name)
            .await
    }

    async fn apply_selection(
        &self,
        selected: &[i32],
        acting_admin_name: &str,
    ) -> Result<BulkAvailabilityReport, MenuError> {
        self.service
            .apply_selection(selected, acting_admin_name)
            .await
    }

    async fn list_recent_updates(&self, limit: usize) -> Result<Vec<MenuUpdate>, MenuError> {
        self.service.list_recent_updates(limit).await
    }
}
