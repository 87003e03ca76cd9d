//! Entity to model mappers
//!
//! Conversions between SeaORM entities and contract models

use super::entity::{admin, menu_item, menu_update};
use crate::contract::{Admin, MenuItem, MenuUpdate, NewAdmin, NewMenuUpdate};
use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};

// ===== Menu Item Conversions =====

impl From<menu_item::Model> for MenuItem {
    fn from(entity: menu_item::Model) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            category: entity.category,
            image: entity.image,
            is_available: entity.is_available,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

// ===== Admin Conversions =====

impl TryFrom<admin::Model> for Admin {
    type Error = anyhow::Error;

    fn try_from(entity: admin::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            email: entity.email,
            name: entity.name,
            role: entity.role.parse()?,
            is_active: entity.is_active,
            created_at: entity.created_at,
        })
    }
}

impl From<&NewAdmin> for admin::ActiveModel {
    fn from(model: &NewAdmin) -> Self {
        Self {
            id: Set(model.id),
            email: Set(model.email.clone()),
            name: Set(model.name.clone()),
            role: Set(model.role.as_str().to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
    }
}

// ===== Menu Update Conversions =====

impl TryFrom<menu_update::Model> for MenuUpdate {
    type Error = anyhow::Error;

    fn try_from(entity: menu_update::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: i64::from(entity.id),
            admin_id: entity.admin_id,
            admin_name: entity.admin_name,
            item_id: entity.item_id,
            item_name: entity.item_name,
            action: entity.action.parse()?,
            created_at: entity.created_at,
        })
    }
}

impl From<&NewMenuUpdate> for menu_update::ActiveModel {
    fn from(model: &NewMenuUpdate) -> Self {
        Self {
            id: NotSet,
            admin_id: Set(model.admin_id),
            admin_name: Set(model.admin_name.clone()),
            item_id: Set(model.item_id),
            item_name: Set(model.item_name.clone()),
            action: Set(model.action.as_str().to_string()),
            created_at: Set(Utc::now()),
        }
    }
}
