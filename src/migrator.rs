use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_growers_table::Migration),
            Box::new(m20240601_000002_create_products_table::Migration),
            Box::new(m20240601_000003_create_product_variants_table::Migration),
            Box::new(m20240601_000004_create_stock_update_requests_table::Migration),
        ]
    }
}

mod m20240601_000001_create_growers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_growers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Growers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Growers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Growers::Name).string().not_null())
                        .col(ColumnDef::new(Growers::Email).string().null())
                        .col(ColumnDef::new(Growers::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Growers::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Growers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Growers {
        Table,
        Id,
        Name,
        Email,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_products_table {

    use super::m20240601_000001_create_growers_table::Growers;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::GrowerId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::Stock)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_grower_id")
                                .from(Products::Table, Products::GrowerId)
                                .to(Growers::Table, Growers::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_grower_id")
                        .table(Products::Table)
                        .col(Products::GrowerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Products {
        Table,
        Id,
        GrowerId,
        Name,
        Stock,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_product_variants_table {

    use super::m20240601_000002_create_products_table::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_product_variants_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductVariants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductVariants::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductVariants::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductVariants::Name).string().not_null())
                        .col(
                            ColumnDef::new(ProductVariants::Stock)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_variants_product_id")
                                .from(ProductVariants::Table, ProductVariants::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_variants_product_id")
                        .table(ProductVariants::Table)
                        .col(ProductVariants::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum ProductVariants {
        Table,
        Id,
        ProductId,
        Name,
        Stock,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000004_create_stock_update_requests_table {

    use super::m20240601_000001_create_growers_table::Growers;
    use super::m20240601_000002_create_products_table::Products;
    use super::m20240601_000003_create_product_variants_table::ProductVariants;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_stock_update_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockUpdateRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockUpdateRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockUpdateRequests::GrowerId).uuid().not_null())
                        .col(ColumnDef::new(StockUpdateRequests::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockUpdateRequests::VariantId).uuid().null())
                        .col(
                            ColumnDef::new(StockUpdateRequests::CurrentStock)
                                .double()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockUpdateRequests::NewStock).double().not_null())
                        .col(ColumnDef::new(StockUpdateRequests::Reason).text().null())
                        .col(
                            ColumnDef::new(StockUpdateRequests::Status)
                                .string_len(16)
                                .not_null()
                                .default("PENDING"),
                        )
                        .col(ColumnDef::new(StockUpdateRequests::ApprovedBy).string().null())
                        .col(ColumnDef::new(StockUpdateRequests::AdminComment).text().null())
                        .col(
                            ColumnDef::new(StockUpdateRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockUpdateRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_update_requests_grower_id")
                                .from(StockUpdateRequests::Table, StockUpdateRequests::GrowerId)
                                .to(Growers::Table, Growers::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_update_requests_product_id")
                                .from(StockUpdateRequests::Table, StockUpdateRequests::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_update_requests_variant_id")
                                .from(StockUpdateRequests::Table, StockUpdateRequests::VariantId)
                                .to(ProductVariants::Table, ProductVariants::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_update_requests_status")
                        .table(StockUpdateRequests::Table)
                        .col(StockUpdateRequests::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_update_requests_grower_status")
                        .table(StockUpdateRequests::Table)
                        .col(StockUpdateRequests::GrowerId)
                        .col(StockUpdateRequests::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockUpdateRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockUpdateRequests {
        Table,
        Id,
        GrowerId,
        ProductId,
        VariantId,
        CurrentStock,
        NewStock,
        Reason,
        Status,
        ApprovedBy,
        AdminComment,
        CreatedAt,
        UpdatedAt,
    }
}
