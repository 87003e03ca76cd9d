//! Database migrations for menu service

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_menu_items::Migration),
            Box::new(m20250601_000002_create_admins::Migration),
            Box::new(m20250601_000003_create_menu_updates::Migration),
        ]
    }
}

mod m20250601_000001_create_menu_items {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250601_000001_create_menu_items"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MenuItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MenuItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MenuItems::Name).string().not_null())
                        .col(ColumnDef::new(MenuItems::Category).string().not_null())
                        .col(ColumnDef::new(MenuItems::Image).string().not_null())
                        .col(
                            ColumnDef::new(MenuItems::IsAvailable)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(MenuItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(MenuItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_menu_items_category_name")
                        .table(MenuItems::Table)
                        .col(MenuItems::Category)
                        .col(MenuItems::Name)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MenuItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum MenuItems {
        Table,
        Id,
        Name,
        Category,
        Image,
        IsAvailable,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250601_000002_create_admins {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250601_000002_create_admins"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Admins::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Admins::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Admins::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Admins::Name).string().not_null())
                        .col(
                            ColumnDef::new(Admins::Role)
                                .string()
                                .not_null()
                                .default("admin"),
                        )
                        .col(
                            ColumnDef::new(Admins::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Admins::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Admins::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Admins {
        Table,
        Id,
        Email,
        Name,
        Role,
        IsActive,
        CreatedAt,
    }
}

mod m20250601_000003_create_menu_updates {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250601_000003_create_menu_updates"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No foreign keys: rows keep name snapshots and must survive
            // changes to admins and menu_items
            manager
                .create_table(
                    Table::create()
                        .table(MenuUpdates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MenuUpdates::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MenuUpdates::AdminId).uuid().not_null())
                        .col(ColumnDef::new(MenuUpdates::AdminName).string().not_null())
                        .col(ColumnDef::new(MenuUpdates::ItemId).integer().not_null())
                        .col(ColumnDef::new(MenuUpdates::ItemName).string().not_null())
                        .col(ColumnDef::new(MenuUpdates::Action).string().not_null())
                        .col(
                            ColumnDef::new(MenuUpdates::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_menu_updates_created_at")
                        .table(MenuUpdates::Table)
                        .col(MenuUpdates::CreatedAt)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MenuUpdates::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum MenuUpdates {
        Table,
        Id,
        AdminId,
        AdminName,
        ItemId,
        ItemName,
        Action,
        CreatedAt,
    }
}
