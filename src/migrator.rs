#![allow(elided_lifetimes_in_paths)]

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_products_table::Migration),
            Box::new(m20250301_000002_create_fixed_fund_allocations_table::Migration),
            Box::new(m20250301_000003_create_outbound_movements_tables::Migration),
            Box::new(m20250301_000004_create_inbound_movements_tables::Migration),
            Box::new(m20250301_000005_create_folio_sequences_table::Migration),
        ]
    }
}

mod m20250301_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_products_table"
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
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(
                            ColumnDef::new(Products::UnitPrice)
                                .decimal_len(12, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::QuantityOnHand)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::ExpirationDate).date().null())
                        .col(ColumnDef::new(Products::Status).string().not_null())
                        .col(ColumnDef::new(Products::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_products_sku")
                        .table(Products::Table)
                        .col(Products::Sku)
                        .unique()
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

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
        Name,
        Sku,
        UnitPrice,
        QuantityOnHand,
        ExpirationDate,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000002_create_fixed_fund_allocations_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_fixed_fund_allocations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FixedFundAllocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FixedFundAllocations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FixedFundAllocations::RequesterId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FixedFundAllocations::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FixedFundAllocations::AvailableQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(FixedFundAllocations::Status)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FixedFundAllocations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FixedFundAllocations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_fixed_fund_requester_product")
                        .table(FixedFundAllocations::Table)
                        .col(FixedFundAllocations::RequesterId)
                        .col(FixedFundAllocations::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FixedFundAllocations::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum FixedFundAllocations {
        Table,
        Id,
        RequesterId,
        ProductId,
        AvailableQuantity,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000003_create_outbound_movements_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_outbound_movements_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OutboundMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OutboundMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutboundMovements::Reason).string().not_null())
                        .col(ColumnDef::new(OutboundMovements::Notes).text().null())
                        .col(
                            ColumnDef::new(OutboundMovements::TotalValue)
                                .decimal_len(14, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutboundMovements::Status).string().not_null())
                        .col(ColumnDef::new(OutboundMovements::Kind).string().not_null())
                        .col(
                            ColumnDef::new(OutboundMovements::Fulfillment)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutboundMovements::OriginId).uuid().null())
                        .col(
                            ColumnDef::new(OutboundMovements::RequesterId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutboundMovements::Series).string().not_null())
                        .col(ColumnDef::new(OutboundMovements::Folio).string().not_null())
                        .col(
                            ColumnDef::new(OutboundMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_outbound_movements_series_folio")
                        .table(OutboundMovements::Table)
                        .col(OutboundMovements::Series)
                        .col(OutboundMovements::Folio)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_outbound_movements_origin_id")
                        .table(OutboundMovements::Table)
                        .col(OutboundMovements::OriginId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OutboundLineItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OutboundLineItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundLineItems::MovementId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundLineItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundLineItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundLineItems::UnitPrice)
                                .decimal_len(12, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundLineItems::Position)
                                .integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_outbound_line_items_movement")
                                .from(OutboundLineItems::Table, OutboundLineItems::MovementId)
                                .to(OutboundMovements::Table, OutboundMovements::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_outbound_line_items_movement_id")
                        .table(OutboundLineItems::Table)
                        .col(OutboundLineItems::MovementId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OutboundLineItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OutboundMovements::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum OutboundMovements {
        Table,
        Id,
        Reason,
        Notes,
        TotalValue,
        Status,
        Kind,
        Fulfillment,
        OriginId,
        RequesterId,
        Series,
        Folio,
        CreatedAt,
    }

    #[derive(Iden)]
    enum OutboundLineItems {
        Table,
        Id,
        MovementId,
        ProductId,
        Quantity,
        UnitPrice,
        Position,
    }
}

mod m20250301_000004_create_inbound_movements_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_inbound_movements_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InboundMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InboundMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InboundMovements::SourceType).string().null())
                        .col(
                            ColumnDef::new(InboundMovements::SupplierReference)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(InboundMovements::Notes).text().null())
                        .col(
                            ColumnDef::new(InboundMovements::TotalValue)
                                .decimal_len(14, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InboundMovements::Series).string().not_null())
                        .col(ColumnDef::new(InboundMovements::Folio).string().not_null())
                        .col(
                            ColumnDef::new(InboundMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inbound_movements_series_folio")
                        .table(InboundMovements::Table)
                        .col(InboundMovements::Series)
                        .col(InboundMovements::Folio)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InboundLineItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InboundLineItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InboundLineItems::MovementId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InboundLineItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InboundLineItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InboundLineItems::UnitPrice)
                                .decimal_len(12, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InboundLineItems::LotNumber).string().null())
                        .col(
                            ColumnDef::new(InboundLineItems::ExpirationDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InboundLineItems::RemainingQuantity)
                                .integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inbound_line_items_movement")
                                .from(InboundLineItems::Table, InboundLineItems::MovementId)
                                .to(InboundMovements::Table, InboundMovements::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inbound_line_items_movement_id")
                        .table(InboundLineItems::Table)
                        .col(InboundLineItems::MovementId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InboundLineItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InboundMovements::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum InboundMovements {
        Table,
        Id,
        SourceType,
        SupplierReference,
        Notes,
        TotalValue,
        Series,
        Folio,
        CreatedAt,
    }

    #[derive(Iden)]
    enum InboundLineItems {
        Table,
        Id,
        MovementId,
        ProductId,
        Quantity,
        UnitPrice,
        LotNumber,
        ExpirationDate,
        RemainingQuantity,
    }
}

mod m20250301_000005_create_folio_sequences_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_folio_sequences_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FolioSequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FolioSequences::MovementType)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FolioSequences::Series).string().not_null())
                        .col(
                            ColumnDef::new(FolioSequences::NextFolio)
                                .big_integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(FolioSequences::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FolioSequences::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum FolioSequences {
        Table,
        MovementType,
        Series,
        NextFolio,
        UpdatedAt,
    }
}
