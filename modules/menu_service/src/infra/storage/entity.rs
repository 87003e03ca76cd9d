//! SeaORM entities for database tables
//!
//! `menu_updates` holds denormalized copies of admin and item names and has
//! no foreign keys, so audit rows outlive edits to either table.

/// Menu items table entity
pub mod menu_item {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "menu_items")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,

        pub name: String,

        pub category: String,

        /// Image URI
        pub image: String,

        pub is_available: bool,

        pub created_at: DateTimeUtc,

        pub updated_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Admin directory table entity
pub mod admin {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "admins")]
    pub struct Model {
        /// Identity provider user id
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,

        #[sea_orm(unique)]
        pub email: String,

        pub name: String,

        /// "admin" or "super_admin"
        pub role: String,

        pub is_active: bool,

        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Append-only audit table entity
pub mod menu_update {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "menu_updates")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,

        pub admin_id: Uuid,

        /// Admin name at write time
        pub admin_name: String,

        pub item_id: i32,

        /// Item name at write time
        pub item_name: String,

        /// "added" or "removed"
        pub action: String,

        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
