use sea_orm_migration::prelude::*;

pub struct Migrator;

/// Money column definition.
///
/// Postgres uses the full `DECIMAL(19, 4)` money type. SQLite's sea-query
/// backend rejects a decimal precision larger than 16 (the precision is
/// advisory there — the column has `REAL` affinity regardless), so on SQLite
/// the same column is declared as `DECIMAL(16, 4)`; stored values are identical.
fn money_column<I>(name: I, manager: &SchemaManager) -> ColumnDef
where
    I: IntoIden,
{
    let mut col = ColumnDef::new(name);
    if manager.get_database_backend() == sea_orm::DbBackend::Sqlite {
        col.decimal_len(16, 4);
    } else {
        col.decimal_len(19, 4);
    }
    col
}

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_master_data_tables::Migration),
            Box::new(m20240101_000002_create_supplier_offers_table::Migration),
            Box::new(m20240101_000003_create_warehouse_stock_table::Migration),
            Box::new(m20240101_000004_create_delivery_note_tables::Migration),
            Box::new(m20240101_000005_create_goods_receipt_tables::Migration),
            Box::new(m20240101_000006_create_return_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_master_data_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_master_data_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // item_master aligned with entities::item_master Model
            manager
                .create_table(
                    Table::create()
                        .table(ItemMaster::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ItemMaster::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ItemMaster::Sku)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ItemMaster::Name).string().not_null())
                        .col(
                            ColumnDef::new(ItemMaster::UnitOfMeasure)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ItemMaster::MinStock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ItemMaster::MaxStock).integer().null())
                        .col(
                            ColumnDef::new(ItemMaster::IsDropshipEligible)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ItemMaster::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(ItemMaster::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Warehouses::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(ColumnDef::new(Warehouses::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(ColumnDef::new(Customers::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Suppliers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Suppliers::Name).string().not_null())
                        .col(ColumnDef::new(Suppliers::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ItemMaster::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ItemMaster {
        Table,
        Id,
        Sku,
        Name,
        UnitOfMeasure,
        MinStock,
        MaxStock,
        IsDropshipEligible,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Warehouses {
        Table,
        Id,
        Code,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Customers {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Suppliers {
        Table,
        Id,
        Name,
        CreatedAt,
    }
}

mod m20240101_000002_create_supplier_offers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_supplier_offers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SupplierOffers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SupplierOffers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SupplierOffers::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(SupplierOffers::SupplierId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            super::money_column(SupplierOffers::Price, manager)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::LeadTimeDays)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::IsPreferred)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierOffers::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_supplier_offers_item_id")
                        .table(SupplierOffers::Table)
                        .col(SupplierOffers::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SupplierOffers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SupplierOffers {
        Table,
        Id,
        ItemId,
        SupplierId,
        Price,
        LeadTimeDays,
        IsPreferred,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_warehouse_stock_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_warehouse_stock_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseStock::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseStock::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseStock::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(WarehouseStock::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One stock row per (item, warehouse) pair
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouse_stock_item_warehouse")
                        .table(WarehouseStock::Table)
                        .col(WarehouseStock::ItemId)
                        .col(WarehouseStock::WarehouseId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseStock::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum WarehouseStock {
        Table,
        Id,
        ItemId,
        WarehouseId,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_delivery_note_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_delivery_note_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DeliveryNotes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryNotes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNotes::DocumentNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNotes::DocumentDate)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNotes::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::CustomerId).uuid().not_null())
                        .col(
                            ColumnDef::new(DeliveryNotes::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::ShippedAt).timestamp().null())
                        .col(
                            ColumnDef::new(DeliveryNotes::DeliveredAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNotes::CancelledAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNotes::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNotes::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_notes_status")
                        .table(DeliveryNotes::Table)
                        .col(DeliveryNotes::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_notes_warehouse_id")
                        .table(DeliveryNotes::Table)
                        .col(DeliveryNotes::WarehouseId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DeliveryNoteLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryNoteLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNoteLines::DeliveryNoteId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNoteLines::LineNo)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNoteLines::Sourcing)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNoteLines::ItemId).uuid().null())
                        .col(
                            ColumnDef::new(DeliveryNoteLines::Description)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNoteLines::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            super::money_column(DeliveryNoteLines::UnitPrice, manager)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNoteLines::SupplierId).uuid().null())
                        .col(
                            ColumnDef::new(DeliveryNoteLines::DropshipStatus)
                                .string_len(32)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNoteLines::PostedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNoteLines::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNoteLines::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_note_lines_note_id")
                        .table(DeliveryNoteLines::Table)
                        .col(DeliveryNoteLines::DeliveryNoteId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_note_lines_item_id")
                        .table(DeliveryNoteLines::Table)
                        .col(DeliveryNoteLines::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeliveryNoteLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DeliveryNotes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum DeliveryNotes {
        Table,
        Id,
        DocumentNumber,
        DocumentDate,
        WarehouseId,
        CustomerId,
        Status,
        ShippedAt,
        DeliveredAt,
        CancelledAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum DeliveryNoteLines {
        Table,
        Id,
        DeliveryNoteId,
        LineNo,
        Sourcing,
        ItemId,
        Description,
        Quantity,
        UnitPrice,
        SupplierId,
        DropshipStatus,
        PostedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_goods_receipt_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_goods_receipt_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(GoodsReceipts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(GoodsReceipts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GoodsReceipts::ReceiptNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(GoodsReceipts::ReceiptDate)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GoodsReceipts::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(GoodsReceipts::SupplierId).uuid().not_null())
                        .col(
                            ColumnDef::new(GoodsReceipts::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(GoodsReceipts::ReceivedAt).timestamp().null())
                        .col(
                            ColumnDef::new(GoodsReceipts::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GoodsReceipts::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(GoodsReceiptLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(GoodsReceiptLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GoodsReceiptLines::GoodsReceiptId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GoodsReceiptLines::LineNo)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(GoodsReceiptLines::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(GoodsReceiptLines::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            super::money_column(GoodsReceiptLines::UnitPrice, manager)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GoodsReceiptLines::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_goods_receipt_lines_item_id")
                        .table(GoodsReceiptLines::Table)
                        .col(GoodsReceiptLines::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(GoodsReceiptLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(GoodsReceipts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum GoodsReceipts {
        Table,
        Id,
        ReceiptNumber,
        ReceiptDate,
        WarehouseId,
        SupplierId,
        Status,
        ReceivedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum GoodsReceiptLines {
        Table,
        Id,
        GoodsReceiptId,
        LineNo,
        ItemId,
        Quantity,
        UnitPrice,
        CreatedAt,
    }
}

mod m20240101_000006_create_return_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_return_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseReturns::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseReturns::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturns::ReturnNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturns::ReturnDate)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturns::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturns::SupplierId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturns::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturns::SettledAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturns::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturns::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseReturnLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseReturnLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturnLines::PurchaseReturnId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturnLines::LineNo)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturnLines::ItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturnLines::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            super::money_column(PurchaseReturnLines::UnitPrice, manager)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseReturnLines::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_return_lines_item_id")
                        .table(PurchaseReturnLines::Table)
                        .col(PurchaseReturnLines::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SalesReturns::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesReturns::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesReturns::ReturnNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(SalesReturns::ReturnDate)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesReturns::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(SalesReturns::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(SalesReturns::DeliveryNoteId).uuid().null())
                        .col(
                            ColumnDef::new(SalesReturns::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesReturns::SettledAt).timestamp().null())
                        .col(
                            ColumnDef::new(SalesReturns::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesReturns::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_returns_delivery_note_id")
                        .table(SalesReturns::Table)
                        .col(SalesReturns::DeliveryNoteId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SalesReturnLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesReturnLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesReturnLines::SalesReturnId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesReturnLines::LineNo)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesReturnLines::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(SalesReturnLines::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            super::money_column(SalesReturnLines::UnitPrice, manager)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesReturnLines::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_return_lines_item_id")
                        .table(SalesReturnLines::Table)
                        .col(SalesReturnLines::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesReturnLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SalesReturns::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseReturnLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseReturns::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PurchaseReturns {
        Table,
        Id,
        ReturnNumber,
        ReturnDate,
        WarehouseId,
        SupplierId,
        Status,
        SettledAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum PurchaseReturnLines {
        Table,
        Id,
        PurchaseReturnId,
        LineNo,
        ItemId,
        Quantity,
        UnitPrice,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum SalesReturns {
        Table,
        Id,
        ReturnNumber,
        ReturnDate,
        WarehouseId,
        CustomerId,
        DeliveryNoteId,
        Status,
        SettledAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum SalesReturnLines {
        Table,
        Id,
        SalesReturnId,
        LineNo,
        ItemId,
        Quantity,
        UnitPrice,
        CreatedAt,
    }
}
