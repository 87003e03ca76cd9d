/// Change notifications for menu service tables
///
/// Events carry no row payload: subscribers only learn that a table changed
/// and re-query. Subscriptions are scoped to a table and optionally to one
/// change kind, mirroring the hosted realtime channel. Local writes are
/// published directly; writes by other clients arrive through a
/// [`ChangeSource`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

/// Backend tables that emit change events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Admins,
    MenuItems,
    MenuUpdates,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admins => "admins",
            Self::MenuItems => "menu_items",
            Self::MenuUpdates => "menu_updates",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "admins" => Some(Self::Admins),
            "menu_items" => Some(Self::MenuItems),
            "menu_updates" => Some(Self::MenuUpdates),
            _ => None,
        }
    }
}

/// Row operation that triggered an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// "Something changed" notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind) -> Self {
        Self {
            table,
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn inserted(table: Table) -> Self {
        Self::new(table, ChangeKind::Insert)
    }

    pub fn updated(table: Table) -> Self {
        Self::new(table, ChangeKind::Update)
    }
}

/// Subscription scope: one table, one kind or all kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeFilter {
    pub table: Table,
    pub kind: Option<ChangeKind>,
}

impl ChangeFilter {
    /// Every change on `table`
    pub fn all(table: Table) -> Self {
        Self { table, kind: None }
    }

    /// Only `kind` changes on `table`
    pub fn only(table: Table, kind: ChangeKind) -> Self {
        Self {
            table,
            kind: Some(kind),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.table == self.table && self.kind.map_or(true, |k| k == event.kind)
    }
}

/// Event publisher trait for pushing change notifications
///
/// Implementations should not fail the write that triggered the event;
/// callers log publish errors and continue.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a change notification
    async fn publish(&self, event: ChangeEvent) -> anyhow::Result<()>;
}

/// No-op event publisher for testing or when events are disabled
pub struct NoOpEventPublisher;

#[async_trait::async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _event: ChangeEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Feed of changes committed by any client of the backend
#[async_trait::async_trait]
pub trait ChangeSource: Send + Sync {
    /// Forward changes into `hub` until `cancel` fires. Connection loss is
    /// retried here, not reported.
    async fn run(&self, hub: RealtimeHub, cancel: CancellationToken);
}

/// In-process realtime channel fanning change events out to subscribers
#[derive(Debug, Clone)]
pub struct RealtimeHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self, filter: ChangeFilter) -> RealtimeSubscription {
        RealtimeSubscription {
            rx: self.tx.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send without awaiting. Having no subscribers is not an error.
    pub fn notify(&self, event: ChangeEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No realtime subscribers");
        }
    }
}

#[async_trait::async_trait]
impl EventPublisher for RealtimeHub {
    async fn publish(&self, event: ChangeEvent) -> anyhow::Result<()> {
        self.notify(event);
        Ok(())
    }
}

/// Filtered receiver returned by [`RealtimeHub::subscribe`]
pub struct RealtimeSubscription {
    rx: broadcast::Receiver<ChangeEvent>,
    filter: ChangeFilter,
}

impl RealtimeSubscription {
    pub fn filter(&self) -> ChangeFilter {
        self.filter
    }

    /// Next matching event; `None` once the hub is gone.
    ///
    /// Lagging behind the channel yields a synthetic event for the filtered
    /// table so the subscriber still re-fetches.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        table = self.filter.table.as_str(),
                        skipped,
                        "Realtime subscriber lagged"
                    );
                    return Some(ChangeEvent::new(
                        self.filter.table,
                        self.filter.kind.unwrap_or(ChangeKind::Update),
                    ));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
