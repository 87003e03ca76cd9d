//! Live catalog and audit feeds
//!
//! Each feed keeps the latest query result in a watch channel and re-runs
//! the whole query whenever the realtime hub reports a change on its table.

use super::events::{ChangeFilter, ChangeKind, RealtimeHub, Table};
use super::service::Service;
use crate::contract::{MenuError, MenuItem, MenuUpdate};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Latest catalog read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub items: Vec<MenuItem>,
    pub loading: bool,
    pub error: Option<MenuError>,
    /// Local time of the last realtime-triggered refresh
    pub last_updated: DateTime<Utc>,
}

/// Catalog kept in sync with `menu_items` changes
pub struct CatalogFeed {
    service: Arc<Service>,
    state: watch::Sender<CatalogSnapshot>,
}

impl CatalogFeed {
    pub fn new(service: Arc<Service>) -> Self {
        let (state, _) = watch::channel(CatalogSnapshot {
            items: Vec::new(),
            loading: true,
            error: None,
            last_updated: Utc::now(),
        });
        Self { service, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.state.borrow().clone()
    }

    /// Re-fetch the full list. Also the manual retry after a failed read.
    pub async fn refresh(&self) -> Result<(), MenuError> {
        self.state.send_modify(|s| s.loading = true);

        let result = self.service.list_menu_items().await;
        self.state.send_modify(|s| {
            s.loading = false;
            match &result {
                Ok(items) => {
                    s.items = items.clone();
                    s.error = None;
                }
                // Keep the previous items on screen
                Err(e) => s.error = Some(e.clone()),
            }
        });

        result.map(|_| ())
    }

    async fn on_change(&self) {
        // Error is already recorded in the snapshot
        let _ = self.refresh().await;
        self.state.send_modify(|s| s.last_updated = Utc::now());
    }

    /// Refresh on every `menu_items` change until `cancel` fires.
    ///
    /// A refresh in flight at cancellation is dropped, not applied.
    pub fn spawn(self: &Arc<Self>, hub: &RealtimeHub, cancel: CancellationToken) -> JoinHandle<()> {
        let mut subscription = hub.subscribe(ChangeFilter::all(Table::MenuItems));
        let this = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = subscription.recv() => {
                        let Some(event) = event else { break };
                        tracing::debug!(kind = ?event.kind, "Realtime menu_items change");
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = this.on_change() => {}
                        }
                    }
                }
            }
            tracing::debug!("Catalog feed stopped");
        })
    }
}

/// Latest audit read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentUpdatesSnapshot {
    pub updates: Vec<MenuUpdate>,
    pub loading: bool,
    pub error: Option<MenuError>,
}

/// Most recent `limit` audit rows, re-read on every insert
pub struct RecentUpdatesFeed {
    service: Arc<Service>,
    limit: usize,
    state: watch::Sender<RecentUpdatesSnapshot>,
}

impl RecentUpdatesFeed {
    pub fn new(service: Arc<Service>, limit: usize) -> Self {
        let (state, _) = watch::channel(RecentUpdatesSnapshot {
            updates: Vec::new(),
            loading: true,
            error: None,
        });
        Self {
            service,
            limit,
            state,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn subscribe(&self) -> watch::Receiver<RecentUpdatesSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> RecentUpdatesSnapshot {
        self.state.borrow().clone()
    }

    pub async fn refresh(&self) -> Result<(), MenuError> {
        self.state.send_modify(|s| s.loading = true);

        let result = self.service.list_recent_updates(self.limit).await;
        self.state.send_modify(|s| {
            s.loading = false;
            match &result {
                Ok(updates) => {
                    s.updates = updates.clone();
                    s.error = None;
                }
                Err(e) => s.error = Some(e.clone()),
            }
        });

        result.map(|_| ())
    }

    /// Refresh on every `menu_updates` insert until `cancel` fires
    pub fn spawn(self: &Arc<Self>, hub: &RealtimeHub, cancel: CancellationToken) -> JoinHandle<()> {
        let mut subscription =
            hub.subscribe(ChangeFilter::only(Table::MenuUpdates, ChangeKind::Insert));
        let this = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = subscription.recv() => {
                        if event.is_none() {
                            break;
                        }
                        tracing::debug!("Realtime menu_updates insert");
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = this.refresh() => {}
                        }
                    }
                }
            }
            tracing::debug!("Recent updates feed stopped");
        })
    }
}
