//! Module declaration and lifecycle implementation

use crate::api::native::NativeClient;
use crate::config::{BackendConfig, Config};
use crate::contract::{MenuApi, MenuError};
use crate::domain::{
    AdminRepository, CatalogFeed, ChangeSource, EventPublisher, IdentityProvider,
    MenuItemRepository, MenuUpdateRepository, RealtimeHub, RecentUpdatesFeed, Service,
    SessionManager, View, ViewController,
};
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::{
    SeaOrmAdminRepository, SeaOrmMenuItemRepository, SeaOrmMenuUpdateRepository,
};
use crate::infra::supabase::{
    RestAdminRepository, RestMenuItemRepository, RestMenuUpdateRepository, SessionStore,
    SupabaseClient, SupabaseRealtime,
};
use anyhow::Context;
use parking_lot::{Mutex, RwLock};
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Identity provider, table repositories and change feed the module runs
/// against
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityProvider>,
    pub menu_items: Arc<dyn MenuItemRepository>,
    pub admins: Arc<dyn AdminRepository>,
    pub menu_updates: Arc<dyn MenuUpdateRepository>,
    pub changes: Arc<dyn ChangeSource>,
}

impl Backend {
    /// Hosted auth and realtime always; tables over REST, or through SeaORM
    /// when `database_url` is set
    pub async fn connect(config: &Config, backend: &BackendConfig) -> anyhow::Result<Self> {
        let mut client = SupabaseClient::new(backend, config.request_timeout)?;
        if let Some(path) = &config.session_file {
            client = client.with_session_store(SessionStore::new(path));
        }
        let supabase = Arc::new(client);
        let identity: Arc<dyn IdentityProvider> = supabase.clone();
        let changes: Arc<dyn ChangeSource> = Arc::new(SupabaseRealtime::new(supabase.clone()));

        let Some(database_url) = config.database_url.as_deref() else {
            tracing::info!(url = %backend.url, "Using hosted REST tables");
            return Ok(Self {
                identity,
                changes,
                menu_items: Arc::new(RestMenuItemRepository::new(supabase.clone())),
                admins: Arc::new(RestAdminRepository::new(supabase.clone())),
                menu_updates: Arc::new(RestMenuUpdateRepository::new(supabase)),
            });
        };

        let mut options = ConnectOptions::new(database_url.to_owned());
        options.sqlx_logging(false);
        let db = Database::connect(options)
            .await
            .context("failed to connect to database")?;

        Migrator::up(&db, None)
            .await
            .context("menu service migrations failed")?;
        tracing::info!("Menu service migrations completed");

        let db = Arc::new(db);
        Ok(Self {
            identity,
            changes,
            menu_items: Arc::new(SeaOrmMenuItemRepository::new(db.clone())),
            admins: Arc::new(SeaOrmAdminRepository::new(db.clone())),
            menu_updates: Arc::new(SeaOrmMenuUpdateRepository::new(db)),
        })
    }
}

/// Wired services of a running module
#[derive(Clone)]
pub struct Components {
    pub service: Arc<Service>,
    pub session: Arc<SessionManager>,
    pub catalog: Arc<CatalogFeed>,
    pub recent_updates: Arc<RecentUpdatesFeed>,
    pub views: Arc<ViewController>,
    pub realtime: RealtimeHub,
    pub client: Arc<dyn MenuApi>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleStatus {
    Stopped,
    Ready,
    /// Connection parameters missing or invalid; no backend call was made
    NotConfigured(String),
}

/// Menu service module.
///
/// Owns the process-wide session and catalog state. `init` wires everything
/// and starts the realtime tasks; `shutdown` cancels them.
pub struct MenuServiceModule {
    config: RwLock<Config>,
    components: RwLock<Option<Components>>,
    status: RwLock<ModuleStatus>,
    cancel: Mutex<CancellationToken>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for MenuServiceModule {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl MenuServiceModule {
    pub fn new(config: Config) -> Self {
        Self {
            config: RwLock::new(config),
            components: RwLock::new(None),
            status: RwLock::new(ModuleStatus::Stopped),
            cancel: Mutex::new(CancellationToken::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Connect to the configured backend and start the module
    pub async fn init(&self) -> Result<(), MenuError> {
        let config = self.config.read().clone();
        let backend_config = self.check_config(&config)?;

        let backend = Backend::connect(&config, &backend_config)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect menu service backend");
                MenuError::Query {
                    message: format!("{e:#}"),
                }
            })?;

        self.start(config, backend).await;
        Ok(())
    }

    /// Start against an already built backend.
    ///
    /// Configuration is still validated first; when it fails nothing in
    /// `backend` is called.
    pub async fn init_with_backend(&self, backend: Backend) -> Result<(), MenuError> {
        let config = self.config.read().clone();
        self.check_config(&config)?;
        self.start(config, backend).await;
        Ok(())
    }

    fn check_config(&self, config: &Config) -> Result<BackendConfig, MenuError> {
        config.backend().map_err(|e| {
            let reason = e.to_string();
            tracing::error!(%reason, "Menu service is not configured");
            *self.status.write() = ModuleStatus::NotConfigured(reason.clone());
            MenuError::NotConfigured { reason }
        })
    }

    async fn start(&self, config: Config, backend: Backend) {
        if self.components.read().is_some() {
            tracing::warn!("Menu service already running; restarting");
            self.shutdown().await;
        }

        let realtime = RealtimeHub::new(config.realtime_capacity);
        let event_publisher: Arc<dyn EventPublisher> = Arc::new(realtime.clone());

        let service = Arc::new(Service::new(
            backend.menu_items,
            backend.menu_updates,
            backend.identity.clone(),
            event_publisher.clone(),
        ));
        let session = Arc::new(SessionManager::new(
            backend.identity,
            backend.admins,
            event_publisher,
            config.session_restore_timeout,
        ));
        let catalog = Arc::new(CatalogFeed::new(service.clone()));
        let recent_updates = Arc::new(RecentUpdatesFeed::new(
            service.clone(),
            config.recent_updates_limit,
        ));

        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();
        {
            let mut tasks = self.tasks.lock();
            tasks.push(session.spawn_listener(cancel.child_token()));
            tasks.push(catalog.spawn(&realtime, cancel.child_token()));
            tasks.push(recent_updates.spawn(&realtime, cancel.child_token()));

            let changes = backend.changes;
            let hub = realtime.clone();
            let token = cancel.child_token();
            tasks.push(tokio::spawn(async move { changes.run(hub, token).await }));
        }

        session.restore_session().await;

        // Read failures stay in the snapshots for a manual retry
        if let Err(e) = catalog.refresh().await {
            tracing::warn!(error = %e, "Initial catalog read failed");
        }
        if let Err(e) = recent_updates.refresh().await {
            tracing::warn!(error = %e, "Initial recent updates read failed");
        }

        let components = Components {
            views: Arc::new(ViewController::new(session.clone())),
            client: Arc::new(NativeClient::new(service.clone())),
            service,
            session,
            catalog,
            recent_updates,
            realtime,
        };
        *self.components.write() = Some(components);
        *self.status.write() = ModuleStatus::Ready;

        tracing::info!(
            recent_updates_limit = config.recent_updates_limit,
            "Menu service initialized"
        );
    }

    /// Stop background tasks and drop the wired services
    pub async fn shutdown(&self) {
        self.cancel.lock().cancel();

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Menu service task ended abnormally");
            }
        }

        *self.components.write() = None;
        let mut status = self.status.write();
        if *status == ModuleStatus::Ready {
            *status = ModuleStatus::Stopped;
        }
        tracing::info!("Menu service stopped");
    }

    pub fn status(&self) -> ModuleStatus {
        self.status.read().clone()
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn components(&self) -> Option<Components> {
        self.components.read().clone()
    }

    /// In-process client for other modules
    pub fn client(&self) -> Option<Arc<dyn MenuApi>> {
        self.components.read().as_ref().map(|c| c.client.clone())
    }

    /// Screen to render right now
    pub fn current_view(&self) -> View {
        if let ModuleStatus::NotConfigured(_) = *self.status.read() {
            return View::NotConfigured;
        }
        self.components
            .read()
            .as_ref()
            .map_or(View::Home, |c| c.views.current_view())
    }
}
