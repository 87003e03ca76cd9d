//! Table repositories over the hosted REST endpoints

use super::dto::{
    AdminRow, AvailabilityPatch, ErrorBody, MenuItemRow, MenuUpdateRow, NewAdminRow,
    NewMenuUpdateRow,
};
use super::SupabaseClient;
use crate::contract::{Admin, MenuItem, MenuUpdate, NewAdmin, NewMenuUpdate};
use crate::domain::repository::{AdminRepository, MenuItemRepository, MenuUpdateRepository};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

const MENU_ITEMS: &str = "rest/v1/menu_items";
const ADMINS: &str = "rest/v1/admins";
const MENU_UPDATES: &str = "rest/v1/menu_updates";

impl SupabaseClient {
    fn table_url(&self, table: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.endpoint(table)?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send and decode a JSON array of rows
    async fn rows<T: DeserializeOwned>(&self, request: RequestBuilder, table: &str) -> Result<Vec<T>> {
        let response = request
            .send()
            .await
            .with_context(|| format!("request to {table} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| "no error body".to_string());
            bail!("{table} returned {status}: {message}");
        }

        response
            .json::<Vec<T>>()
            .await
            .with_context(|| format!("unexpected response body from {table}"))
    }

    fn returning(&self, method: Method, url: Url) -> RequestBuilder {
        self.request(method, url)
            .header("Prefer", "return=representation")
    }
}

// ===== Menu Item Repository =====

pub struct RestMenuItemRepository {
    client: Arc<SupabaseClient>,
}

impl RestMenuItemRepository {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MenuItemRepository for RestMenuItemRepository {
    async fn list_ordered(&self) -> Result<Vec<MenuItem>> {
        let url = self.client.table_url(
            MENU_ITEMS,
            &[("select", "*"), ("order", "category.asc,name.asc,id.asc")],
        )?;
        let rows: Vec<MenuItemRow> = self
            .client
            .rows(self.client.request(Method::GET, url), MENU_ITEMS)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<MenuItem>> {
        let filter = format!("eq.{id}");
        let url = self
            .client
            .table_url(MENU_ITEMS, &[("select", "*"), ("id", &filter)])?;
        let rows: Vec<MenuItemRow> = self
            .client
            .rows(self.client.request(Method::GET, url), MENU_ITEMS)
            .await?;

        Ok(rows.into_iter().next().map(Into::into))
    }

    async fn set_availability(&self, id: i32, is_available: bool) -> Result<bool> {
        let filter = format!("eq.{id}");
        let url = self.client.table_url(MENU_ITEMS, &[("id", &filter)])?;
        let patch = AvailabilityPatch {
            is_available,
            updated_at: Utc::now(),
        };

        // An empty representation means no row matched the filter
        let rows: Vec<MenuItemRow> = self
            .client
            .rows(
                self.client.returning(Method::PATCH, url).json(&patch),
                MENU_ITEMS,
            )
            .await?;

        Ok(!rows.is_empty())
    }
}

// ===== Admin Repository =====

pub struct RestAdminRepository {
    client: Arc<SupabaseClient>,
}

impl RestAdminRepository {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AdminRepository for RestAdminRepository {
    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<Admin>> {
        let filter = format!("eq.{id}");
        let url = self.client.table_url(
            ADMINS,
            &[("select", "*"), ("id", &filter), ("is_active", "eq.true")],
        )?;
        let rows: Vec<AdminRow> = self
            .client
            .rows(self.client.request(Method::GET, url), ADMINS)
            .await?;

        rows.into_iter().next().map(Admin::try_from).transpose()
    }

    async fn create(&self, admin: &NewAdmin) -> Result<Admin> {
        let url = self.client.table_url(ADMINS, &[])?;
        let rows: Vec<AdminRow> = self
            .client
            .rows(
                self.client
                    .returning(Method::POST, url)
                    .json(&NewAdminRow::from(admin)),
                ADMINS,
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("admins insert returned no row"))?;
        Admin::try_from(row)
    }
}

// ===== Menu Update Repository =====

pub struct RestMenuUpdateRepository {
    client: Arc<SupabaseClient>,
}

impl RestMenuUpdateRepository {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MenuUpdateRepository for RestMenuUpdateRepository {
    async fn append(&self, update: &NewMenuUpdate) -> Result<MenuUpdate> {
        let url = self.client.table_url(MENU_UPDATES, &[])?;
        let rows: Vec<MenuUpdateRow> = self
            .client
            .rows(
                self.client
                    .returning(Method::POST, url)
                    .json(&NewMenuUpdateRow::from(update)),
                MENU_UPDATES,
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("menu_updates insert returned no row"))?;
        MenuUpdate::try_from(row)
    }

    async fn list_recent(&self, limit: u64) -> Result<Vec<MenuUpdate>> {
        let limit = limit.to_string();
        let url = self.client.table_url(
            MENU_UPDATES,
            &[
                ("select", "*"),
                ("order", "created_at.desc,id.desc"),
                ("limit", &limit),
            ],
        )?;
        let rows: Vec<MenuUpdateRow> = self
            .client
            .rows(self.client.request(Method::GET, url), MENU_UPDATES)
            .await?;

        rows.into_iter().map(MenuUpdate::try_from).collect()
    }
}
