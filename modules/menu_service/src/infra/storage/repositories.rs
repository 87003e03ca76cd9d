//! SeaORM repository implementations

use crate::contract::{Admin, MenuItem, MenuUpdate, NewAdmin, NewMenuUpdate};
use crate::domain::repository::{AdminRepository, MenuItemRepository, MenuUpdateRepository};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{
    prelude::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::sync::Arc;
use uuid::Uuid;

use super::entity::{admin, menu_item, menu_update};

// ===== Menu Item Repository =====

pub struct SeaOrmMenuItemRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmMenuItemRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MenuItemRepository for SeaOrmMenuItemRepository {
    async fn list_ordered(&self) -> Result<Vec<MenuItem>> {
        let results = menu_item::Entity::find()
            .order_by_asc(menu_item::Column::Category)
            .order_by_asc(menu_item::Column::Name)
            .order_by_asc(menu_item::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<MenuItem>> {
        let result = menu_item::Entity::find_by_id(id).one(&*self.db).await?;
        Ok(result.map(Into::into))
    }

    async fn set_availability(&self, id: i32, is_available: bool) -> Result<bool> {
        let result = menu_item::Entity::update_many()
            .col_expr(menu_item::Column::IsAvailable, Expr::value(is_available))
            .col_expr(menu_item::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(menu_item::Column::Id.eq(id))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

// ===== Admin Repository =====

pub struct SeaOrmAdminRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmAdminRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AdminRepository for SeaOrmAdminRepository {
    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<Admin>> {
        let result = admin::Entity::find()
            .filter(admin::Column::Id.eq(id))
            .filter(admin::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?;

        result.map(Admin::try_from).transpose()
    }

    async fn create(&self, new_admin: &NewAdmin) -> Result<Admin> {
        let active_model: admin::ActiveModel = new_admin.into();

        let result = admin::Entity::insert(active_model)
            .exec_with_returning(&*self.db)
            .await?;

        Admin::try_from(result)
    }
}

// ===== Menu Update Repository =====

pub struct SeaOrmMenuUpdateRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmMenuUpdateRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MenuUpdateRepository for SeaOrmMenuUpdateRepository {
    async fn append(&self, update: &NewMenuUpdate) -> Result<MenuUpdate> {
        let active_model: menu_update::ActiveModel = update.into();

        let result = menu_update::Entity::insert(active_model)
            .exec_with_returning(&*self.db)
            .await?;

        MenuUpdate::try_from(result)
    }

    async fn list_recent(&self, limit: u64) -> Result<Vec<MenuUpdate>> {
        let results = menu_update::Entity::find()
            .order_by_desc(menu_update::Column::CreatedAt)
            .order_by_desc(menu_update::Column::Id)
            .limit(limit)
            .all(&*self.db)
            .await?;

        results
            .into_iter()
            .map(MenuUpdate::try_from)
            .collect::<Result<Vec<_>>>()
    }
}
