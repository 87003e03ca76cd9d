//! Domain layer - business logic and services

pub mod catalog;
pub mod events;
pub mod identity;
pub mod repository;
pub mod service;
pub mod session;
pub mod sync;
pub mod validation;
pub mod view;

pub use catalog::{CategoryGroup, MenuBoard};
pub use events::{
    ChangeEvent, ChangeFilter, ChangeKind, ChangeSource, EventPublisher, NoOpEventPublisher,
    RealtimeHub, RealtimeSubscription, Table,
};
pub use identity::{AuthChange, AuthChangeKind, IdentityError, IdentityProvider, SignUp};
pub use repository::{AdminRepository, MenuItemRepository, MenuUpdateRepository};
pub use service::Service;
pub use session::{AuthState, SessionManager};
pub use sync::{CatalogFeed, CatalogSnapshot, RecentUpdatesFeed, RecentUpdatesSnapshot};
pub use view::{View, ViewController};
