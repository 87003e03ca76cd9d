//! Common test utilities: seeded canteen menu and in-memory backends

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use menu_service::contract::*;
use menu_service::domain::repository::{
    AdminRepository, MenuItemRepository, MenuUpdateRepository,
};
use menu_service::domain::{
    AuthChange, AuthChangeKind, ChangeEvent, ChangeSource, IdentityError, IdentityProvider,
    RealtimeHub, Service, SessionManager, SignUp, Table,
};
use menu_service::Backend;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const CHICKEN_BIRYANI: i32 = 5;

/// Seeded canteen menu. Chicken Biryani starts unavailable.
pub fn seed_menu() -> Vec<MenuItem> {
    let now = Utc::now();
    [
        (1, "Masala Dosa", "Breakfast", true),
        (2, "Idli Sambar", "Breakfast", true),
        (3, "Paneer Butter Masala", "Mains", true),
        (4, "Dal Tadka", "Mains", true),
        (CHICKEN_BIRYANI, "Chicken Biryani", "Mains", false),
        (6, "Gulab Jamun", "Desserts", true),
    ]
    .into_iter()
    .map(|(id, name, category, is_available)| MenuItem {
        id,
        name: name.to_string(),
        category: category.to_string(),
        image: format!("https://images.canteen.test/{id}.jpg"),
        is_available,
        created_at: now,
        updated_at: now,
    })
    .collect()
}

fn storage_error(what: &str) -> anyhow::Error {
    anyhow::anyhow!("simulated storage failure: {what}")
}

// ===== Backend change feed =====

/// Changes committed to the mock tables, streamed to every client the way
/// the hosted realtime service does
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }
}

impl ChangeFeed {
    pub fn record(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Yield until `count` change sources follow the feed
    pub async fn wait_for_listeners(&self, count: usize) {
        while self.listener_count() < count {
            tokio::task::yield_now().await;
        }
    }
}

pub struct MockChangeSource {
    feed: ChangeFeed,
}

#[async_trait]
impl ChangeSource for MockChangeSource {
    async fn run(&self, hub: RealtimeHub, cancel: CancellationToken) {
        let mut rx = self.feed.tx.subscribe();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Ok(event) => hub.notify(event),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }
}

// ===== Menu items =====

#[derive(Clone, Default)]
pub struct MockMenuItemRepo {
    items: Arc<RwLock<Vec<MenuItem>>>,
    failing_writes: Arc<RwLock<HashSet<i32>>>,
    fail_reads: Arc<RwLock<bool>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    feed: ChangeFeed,
}

impl MockMenuItemRepo {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
            ..Self::default()
        }
    }

    pub fn seeded() -> Self {
        Self::new(seed_menu())
    }

    pub fn with_feed(mut self, feed: ChangeFeed) -> Self {
        self.feed = feed;
        self
    }

    pub fn fail_write_for(&self, item_id: i32) {
        self.failing_writes.write().insert(item_id);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.write() = fail;
    }

    pub fn item(&self, id: i32) -> Option<MenuItem> {
        self.items.read().iter().find(|i| i.id == id).cloned()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MenuItemRepository for MockMenuItemRepo {
    async fn list_ordered(&self) -> anyhow::Result<Vec<MenuItem>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if *self.fail_reads.read() {
            return Err(storage_error("menu_items select"));
        }

        let mut items = self.items.read().clone();
        items.sort_by(|a, b| {
            (a.category.as_str(), a.name.as_str(), a.id).cmp(&(
                b.category.as_str(),
                b.name.as_str(),
                b.id,
            ))
        });
        Ok(items)
    }

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<MenuItem>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if *self.fail_reads.read() {
            return Err(storage_error("menu_items select by id"));
        }
        Ok(self.item(id))
    }

    async fn set_availability(&self, id: i32, is_available: bool) -> anyhow::Result<bool> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing_writes.read().contains(&id) {
            return Err(storage_error("menu_items update"));
        }

        let mut items = self.items.write();
        match items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.is_available = is_available;
                item.updated_at = Utc::now();
                self.feed.record(ChangeEvent::updated(Table::MenuItems));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ===== Admins =====

#[derive(Clone, Default)]
pub struct MockAdminRepo {
    admins: Arc<RwLock<HashMap<Uuid, Admin>>>,
    fail_create: Arc<RwLock<bool>>,
    fail_reads: Arc<RwLock<bool>>,
    reads: Arc<AtomicUsize>,
}

impl MockAdminRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, admin: Admin) {
        self.admins.write().insert(admin.id, admin);
    }

    pub fn deactivate(&self, id: Uuid) {
        if let Some(admin) = self.admins.write().get_mut(&id) {
            admin.is_active = false;
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Admin> {
        self.admins.read().get(&id).cloned()
    }

    pub fn set_fail_create(&self, fail: bool) {
        *self.fail_create.write() = fail;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.write() = fail;
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdminRepository for MockAdminRepo {
    async fn find_active_by_id(&self, id: Uuid) -> anyhow::Result<Option<Admin>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if *self.fail_reads.read() {
            return Err(storage_error("admins select"));
        }
        Ok(self.admins.read().get(&id).filter(|a| a.is_active).cloned())
    }

    async fn create(&self, admin: &NewAdmin) -> anyhow::Result<Admin> {
        if *self.fail_create.read() {
            return Err(storage_error("admins insert"));
        }

        let mut admins = self.admins.write();
        if admins.values().any(|a| a.email == admin.email) {
            anyhow::bail!("duplicate key value violates unique constraint \"admins_email_key\"");
        }

        let row = Admin {
            id: admin.id,
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: admin.role,
            is_active: true,
            created_at: Utc::now(),
        };
        admins.insert(row.id, row.clone());
        Ok(row)
    }
}

// ===== Audit log =====

#[derive(Clone, Default)]
pub struct MockMenuUpdateRepo {
    rows: Arc<RwLock<Vec<MenuUpdate>>>,
    fail_append: Arc<RwLock<bool>>,
    reads: Arc<AtomicUsize>,
    feed: ChangeFeed,
}

impl MockMenuUpdateRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, feed: ChangeFeed) -> Self {
        self.feed = feed;
        self
    }

    pub fn rows(&self) -> Vec<MenuUpdate> {
        self.rows.read().clone()
    }

    pub fn set_fail_append(&self, fail: bool) {
        *self.fail_append.write() = fail;
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MenuUpdateRepository for MockMenuUpdateRepo {
    async fn append(&self, update: &NewMenuUpdate) -> anyhow::Result<MenuUpdate> {
        if *self.fail_append.read() {
            return Err(storage_error("menu_updates insert"));
        }

        let mut rows = self.rows.write();
        // Strictly increasing timestamps so ordering checks are meaningful
        let created_at = rows
            .last()
            .map(|r| r.created_at + ChronoDuration::milliseconds(1))
            .unwrap_or_else(Utc::now);
        let row = MenuUpdate {
            id: rows.len() as i64 + 1,
            admin_id: update.admin_id,
            admin_name: update.admin_name.clone(),
            item_id: update.item_id,
            item_name: update.item_name.clone(),
            action: update.action,
            created_at,
        };
        rows.push(row.clone());
        self.feed.record(ChangeEvent::inserted(Table::MenuUpdates));
        Ok(row)
    }

    async fn list_recent(&self, limit: u64) -> anyhow::Result<Vec<MenuUpdate>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.read().clone();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

// ===== Identity provider =====

struct Account {
    password: String,
    user: IdentityUser,
}

#[derive(Clone)]
pub struct MockIdentity {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    session: Arc<RwLock<Option<Session>>>,
    session_delay: Arc<RwLock<Option<Duration>>>,
    unavailable: Arc<RwLock<bool>>,
    confirm_email: Arc<RwLock<bool>>,
    events: broadcast::Sender<AuthChange>,
}

impl Default for MockIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIdentity {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            session: Arc::new(RwLock::new(None)),
            session_delay: Arc::new(RwLock::new(None)),
            unavailable: Arc::new(RwLock::new(false)),
            confirm_email: Arc::new(RwLock::new(false)),
            events,
        }
    }

    /// Register an account without going through sign-up
    pub fn add_account(&self, email: &str, password: &str) -> IdentityUser {
        let user = IdentityUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        self.accounts.write().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Pretend a session survived from an earlier run
    pub fn restore(&self, user: &IdentityUser) -> Session {
        let session = Self::session_for(user);
        *self.session.write() = Some(session.clone());
        session
    }

    pub fn set_session_delay(&self, delay: Duration) {
        *self.session_delay.write() = Some(delay);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write() = unavailable;
    }

    pub fn require_email_confirmation(&self, required: bool) {
        *self.confirm_email.write() = required;
    }

    /// Push a change as if the provider observed it out of band
    pub fn push_change(&self, kind: AuthChangeKind, session: Option<Session>) {
        *self.session.write() = session.clone();
        let _ = self.events.send(AuthChange { kind, session });
    }

    fn session_for(user: &IdentityUser) -> Session {
        Session {
            access_token: format!("access-{}", user.id),
            refresh_token: Some(format!("refresh-{}", user.id)),
            expires_at: Some(Utc::now() + ChronoDuration::hours(1)),
            user: user.clone(),
        }
    }

    fn check_available(&self) -> Result<(), IdentityError> {
        if *self.unavailable.read() {
            return Err(IdentityError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }

    fn start_session(&self, user: &IdentityUser) -> Session {
        let session = Self::session_for(user);
        *self.session.write() = Some(session.clone());
        let _ = self.events.send(AuthChange {
            kind: AuthChangeKind::SignedIn,
            session: Some(session.clone()),
        });
        session
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        let delay = *self.session_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;
        Ok(self.session.read().clone())
    }

    async fn current_user(&self) -> Result<Option<IdentityUser>, IdentityError> {
        self.check_available()?;
        Ok(self.session.read().as_ref().map(|s| s.user.clone()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        self.check_available()?;
        let user = {
            let accounts = self.accounts.read();
            match accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => {
                    return Err(IdentityError::InvalidCredentials(
                        "Invalid login credentials".to_string(),
                    ))
                }
            }
        };
        Ok(self.start_session(&user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, IdentityError> {
        self.check_available()?;
        if self.accounts.read().contains_key(email) {
            return Err(IdentityError::Rejected("User already registered".to_string()));
        }

        let user = self.add_account(email, password);
        let session = if *self.confirm_email.read() {
            None
        } else {
            Some(self.start_session(&user))
        };
        Ok(SignUp { user, session })
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.check_available()?;
        *self.session.write() = None;
        let _ = self.events.send(AuthChange {
            kind: AuthChangeKind::SignedOut,
            session: None,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

// ===== Wiring =====

/// Mocks plus the services built on them
pub struct Harness {
    pub menu_items: MockMenuItemRepo,
    pub admins: MockAdminRepo,
    pub menu_updates: MockMenuUpdateRepo,
    pub identity: MockIdentity,
    pub changes: ChangeFeed,
    pub hub: RealtimeHub,
    pub service: Arc<Service>,
    pub session: Arc<SessionManager>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_restore_timeout(Duration::from_secs(10))
    }

    pub fn with_restore_timeout(timeout: Duration) -> Self {
        let changes = ChangeFeed::default();
        let menu_items = MockMenuItemRepo::seeded().with_feed(changes.clone());
        let admins = MockAdminRepo::new();
        let menu_updates = MockMenuUpdateRepo::new().with_feed(changes.clone());
        let identity = MockIdentity::new();
        let hub = RealtimeHub::new(64);

        let service = Arc::new(Service::new(
            Arc::new(menu_items.clone()),
            Arc::new(menu_updates.clone()),
            Arc::new(identity.clone()),
            Arc::new(hub.clone()),
        ));
        let session = Arc::new(SessionManager::new(
            Arc::new(identity.clone()),
            Arc::new(admins.clone()),
            Arc::new(hub.clone()),
            timeout,
        ));

        Self {
            menu_items,
            admins,
            menu_updates,
            identity,
            changes,
            hub,
            service,
            session,
        }
    }

    pub fn backend(&self) -> Backend {
        Backend {
            identity: Arc::new(self.identity.clone()),
            menu_items: Arc::new(self.menu_items.clone()),
            admins: Arc::new(self.admins.clone()),
            menu_updates: Arc::new(self.menu_updates.clone()),
            changes: Arc::new(MockChangeSource {
                feed: self.changes.clone(),
            }),
        }
    }

    /// Account with an active admin row, signed in at the provider
    pub fn signed_in_admin(&self, name: &str) -> Admin {
        let email = format!("{}@canteen.test", name.to_lowercase());
        let user = self.identity.add_account(&email, "secret-password");
        let admin = Admin {
            id: user.id,
            email,
            name: name.to_string(),
            role: AdminRole::Admin,
            is_active: true,
            created_at: Utc::now(),
        };
        self.admins.insert(admin.clone());
        self.identity.restore(&user);
        admin
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn print_test_header(test_name: &str, purpose: &str) {
    println!("\n🧪 TEST: {}", test_name);
    println!("📋 PURPOSE: {}", purpose);
}
