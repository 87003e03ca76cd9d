//! Module lifecycle and live feed tests

use chrono::{Duration as ChronoDuration, Utc};
use httpmock::prelude::*;
use menu_service::config::{BackendConfig, Config};
use menu_service::contract::*;
use menu_service::domain::{CatalogFeed, ChangeEvent, RecentUpdatesFeed, Table, View};
use menu_service::infra::supabase::SessionStore;
use menu_service::{Backend, MenuServiceModule, ModuleStatus};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

mod common;
use common::{print_test_header, Harness, CHICKEN_BIRYANI};

fn configured() -> Config {
    Config {
        supabase_url: Some("https://canteen.supabase.co".to_string()),
        supabase_anon_key: Some("anon-key".to_string()),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_missing_configuration_reads_nothing() {
    print_test_header(
        "test_missing_configuration_reads_nothing",
        "Without connection parameters the module is NotConfigured and no table is read",
    );
    let h = Harness::new();
    let module = MenuServiceModule::new(Config::default());

    let err = module.init_with_backend(h.backend()).await.unwrap_err();

    assert!(matches!(err, MenuError::NotConfigured { .. }));
    assert!(matches!(module.status(), ModuleStatus::NotConfigured(_)));
    assert_eq!(module.current_view(), View::NotConfigured);
    assert!(module.client().is_none());
    assert_eq!(h.menu_items.read_count(), 0);
    assert_eq!(h.admins.read_count(), 0);
    assert_eq!(h.menu_updates.read_count(), 0);
}

#[tokio::test]
async fn test_placeholder_configuration_is_not_configured() {
    let h = Harness::new();
    let module = MenuServiceModule::new(Config {
        supabase_url: Some("your_supabase_url_here".to_string()),
        supabase_anon_key: Some("your_supabase_anon_key_here".to_string()),
        ..Config::default()
    });

    let err = module.init_with_backend(h.backend()).await.unwrap_err();

    let MenuError::NotConfigured { reason } = err else {
        panic!("expected NotConfigured, got {err:?}");
    };
    assert!(reason.contains("placeholder"), "reason was: {reason}");
    assert_eq!(h.menu_items.read_count(), 0);
}

#[tokio::test]
async fn test_init_without_backend_call_when_url_is_http() {
    let module = MenuServiceModule::new(Config {
        supabase_url: Some("http://canteen.supabase.co".to_string()),
        ..configured()
    });

    let err = module.init().await.unwrap_err();

    assert!(matches!(err, MenuError::NotConfigured { .. }));
    assert_eq!(module.current_view(), View::NotConfigured);
}

#[tokio::test]
async fn test_init_loads_feeds_and_restores_session() {
    let h = Harness::new();
    h.signed_in_admin("Hari");
    let module = MenuServiceModule::new(configured());

    module.init_with_backend(h.backend()).await.unwrap();

    assert_eq!(module.status(), ModuleStatus::Ready);
    let components = module.components().unwrap();
    assert!(components.session.is_authenticated());

    let catalog = components.catalog.snapshot();
    assert!(!catalog.loading);
    assert_eq!(catalog.items.len(), 6);
    let recent = components.recent_updates.snapshot();
    assert!(!recent.loading);
    assert!(recent.updates.is_empty());
    assert_eq!(components.recent_updates.limit(), 10);
    assert_eq!(module.current_view(), View::Home);

    module.shutdown().await;
    assert_eq!(module.status(), ModuleStatus::Stopped);
    assert!(module.components().is_none());
}

#[tokio::test]
async fn test_toggle_through_module_refreshes_both_feeds() {
    print_test_header(
        "test_toggle_through_module_refreshes_both_feeds",
        "A write through the native client reaches every open catalog and activity view",
    );
    let h = Harness::new();
    h.signed_in_admin("Hari");
    let module = MenuServiceModule::new(configured());
    module.init_with_backend(h.backend()).await.unwrap();
    let components = module.components().unwrap();
    let mut catalog = components.catalog.subscribe();
    let mut recent = components.recent_updates.subscribe();

    let client = module.client().unwrap();
    client
        .set_availability(CHICKEN_BIRYANI, true, "Hari")
        .await
        .unwrap();

    let wait = Duration::from_secs(5);
    tokio::time::timeout(
        wait,
        catalog.wait_for(|s| {
            s.items
                .iter()
                .any(|i| i.id == CHICKEN_BIRYANI && i.is_available)
        }),
    )
    .await
    .unwrap()
    .unwrap();
    tokio::time::timeout(wait, recent.wait_for(|s| s.updates.len() == 1))
        .await
        .unwrap()
        .unwrap();

    let update = &components.recent_updates.snapshot().updates[0];
    assert_eq!(update.item_name, "Chicken Biryani");
    assert_eq!(update.admin_name, "Hari");

    module.shutdown().await;
}

#[tokio::test]
async fn test_other_clients_toggle_reaches_public_display() {
    print_test_header(
        "test_other_clients_toggle_reaches_public_display",
        "A toggle made by one client refreshes the catalog and activity of another",
    );
    let h = Harness::new();
    h.signed_in_admin("Hari");
    let admin = MenuServiceModule::new(configured());
    admin.init_with_backend(h.backend()).await.unwrap();
    let display = MenuServiceModule::new(configured());
    display.init_with_backend(h.backend()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), h.changes.wait_for_listeners(2))
        .await
        .unwrap();

    let board = display.components().unwrap();
    let mut catalog = board.catalog.subscribe();
    let mut recent = board.recent_updates.subscribe();

    admin
        .client()
        .unwrap()
        .set_availability(CHICKEN_BIRYANI, true, "Hari")
        .await
        .unwrap();

    let wait = Duration::from_secs(3);
    tokio::time::timeout(
        wait,
        catalog.wait_for(|s| {
            s.items
                .iter()
                .any(|i| i.id == CHICKEN_BIRYANI && i.is_available)
        }),
    )
    .await
    .unwrap()
    .unwrap();
    tokio::time::timeout(wait, recent.wait_for(|s| s.updates.len() == 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(board.recent_updates.snapshot().updates[0].admin_name, "Hari");

    admin.shutdown().await;
    display.shutdown().await;
    assert_eq!(h.changes.listener_count(), 0);
}

#[tokio::test]
async fn test_restart_restores_session_from_session_file() {
    print_test_header(
        "test_restart_restores_session_from_session_file",
        "A session stored by an earlier run signs the admin back in; sign-out forgets it",
    );
    let server = MockServer::start_async().await;
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("session.json");
    let admin_id = Uuid::new_v4();
    SessionStore::new(&session_file)
        .save(&Session {
            access_token: "stored-jwt".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: Some(Utc::now() + ChronoDuration::hours(1)),
            user: IdentityUser {
                id: admin_id,
                email: Some("hari@canteen.test".to_string()),
            },
        })
        .unwrap();

    let filter = format!("eq.{admin_id}");
    let admin_lookup = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/admins")
                .query_param("id", filter.as_str())
                .header("authorization", "Bearer stored-jwt");
            then.status(200).json_body(json!([{
                "id": admin_id,
                "email": "hari@canteen.test",
                "name": "Hari",
                "role": "admin",
                "is_active": true,
                "created_at": "2025-06-01T08:00:00+00:00"
            }]));
        })
        .await;
    for table in ["/rest/v1/menu_items", "/rest/v1/menu_updates"] {
        server
            .mock_async(|when, then| {
                when.method(GET).path(table);
                then.status(200).json_body(json!([]));
            })
            .await;
    }
    let logout = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/logout")
                .header("authorization", "Bearer stored-jwt");
            then.status(204);
        })
        .await;

    // Same wiring as `init`, pointed at the local server
    let config = Config {
        session_file: Some(session_file.clone()),
        ..configured()
    };
    let backend = Backend::connect(
        &config,
        &BackendConfig {
            url: Url::parse(&server.base_url()).unwrap(),
            anon_key: "anon-key".to_string(),
        },
    )
    .await
    .unwrap();
    let module = MenuServiceModule::new(config);
    module.init_with_backend(backend).await.unwrap();

    let components = module.components().unwrap();
    let state = components.session.current();
    assert!(state.is_authenticated());
    assert_eq!(state.admin.map(|a| a.name), Some("Hari".to_string()));
    admin_lookup.assert_async().await;

    components.session.sign_out().await.unwrap();
    assert!(!session_file.exists());
    logout.assert_async().await;

    module.shutdown().await;
}

#[tokio::test]
async fn test_catalog_feed_keeps_items_when_refresh_fails() {
    let h = Harness::new();
    let feed = CatalogFeed::new(h.service.clone());
    feed.refresh().await.unwrap();

    h.menu_items.set_fail_reads(true);
    let err = feed.refresh().await.unwrap_err();

    let snapshot = feed.snapshot();
    assert!(matches!(err, MenuError::Query { .. }));
    assert_eq!(snapshot.items.len(), 6);
    assert_eq!(snapshot.error, Some(err));
    assert!(!snapshot.loading);

    // Manual retry clears the error
    h.menu_items.set_fail_reads(false);
    feed.refresh().await.unwrap();
    assert!(feed.snapshot().error.is_none());
}

#[tokio::test]
async fn test_catalog_feed_refreshes_on_any_item_change() {
    let h = Harness::new();
    let feed = Arc::new(CatalogFeed::new(h.service.clone()));
    let cancel = CancellationToken::new();
    let task = feed.spawn(&h.hub, cancel.clone());
    let mut rx = feed.subscribe();
    let before = h.menu_items.read_count();

    h.hub.notify(ChangeEvent::inserted(Table::MenuItems));
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.items.len() == 6))
        .await
        .unwrap()
        .unwrap();
    assert!(h.menu_items.read_count() > before);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_recent_feed_ignores_other_tables() {
    let h = Harness::new();
    let feed = Arc::new(RecentUpdatesFeed::new(h.service.clone(), 5));
    let cancel = CancellationToken::new();
    let task = feed.spawn(&h.hub, cancel.clone());

    h.hub.notify(ChangeEvent::updated(Table::MenuItems));
    h.hub.notify(ChangeEvent::inserted(Table::Admins));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.menu_updates.read_count(), 0);

    h.hub.notify(ChangeEvent::inserted(Table::MenuUpdates));
    let mut rx = feed.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| !s.loading))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(h.menu_updates.read_count(), 1);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_feed_tasks() {
    let h = Harness::new();
    let module = MenuServiceModule::new(configured());
    module.init_with_backend(h.backend()).await.unwrap();
    let realtime = module.components().unwrap().realtime;
    assert!(realtime.subscriber_count() >= 2);

    module.shutdown().await;

    assert_eq!(realtime.subscriber_count(), 0);
}
