#![allow(dead_code)]

use chrono::{DateTime, Utc};
use fulfillment_core::db::{self, DbConfig, DbPool};
use fulfillment_core::entities::{
    customer, item_master, supplier, supplier_offer, warehouse, warehouse_stock,
};
use fulfillment_core::events::{process_events, EventSender};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// In-memory SQLite with the full embedded schema and a live event pump.
/// The pool is pinned to one connection so the in-memory database is shared
/// across all queries of a test.
pub async fn setup() -> (Arc<DbPool>, EventSender) {
    let cfg = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = db::establish_connection_with_config(&cfg)
        .await
        .expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");

    let (tx, rx) = mpsc::channel(100);
    tokio::spawn(process_events(rx));

    (Arc::new(pool), EventSender::new(tx))
}

pub async fn seed_item(
    db: &DbPool,
    sku: &str,
    min_stock: i32,
    is_dropship_eligible: bool,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    item_master::ActiveModel {
        id: Set(id),
        sku: Set(sku.to_string()),
        name: Set(format!("Item {sku}")),
        unit_of_measure: Set("pcs".to_string()),
        min_stock: Set(min_stock),
        max_stock: Set(None),
        is_dropship_eligible: Set(is_dropship_eligible),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed item");
    id
}

pub async fn seed_warehouse(db: &DbPool, code: &str) -> Uuid {
    let id = Uuid::new_v4();
    warehouse::ActiveModel {
        id: Set(id),
        code: Set(code.to_string()),
        name: Set(format!("Warehouse {code}")),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed warehouse");
    id
}

pub async fn seed_customer(db: &DbPool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    customer::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed customer");
    id
}

pub async fn seed_supplier(db: &DbPool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    supplier::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed supplier");
    id
}

pub async fn seed_offer(
    db: &DbPool,
    item_id: Uuid,
    supplier_id: Uuid,
    price: Decimal,
    lead_time_days: i32,
    is_preferred: bool,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    supplier_offer::ActiveModel {
        id: Set(id),
        item_id: Set(item_id),
        supplier_id: Set(supplier_id),
        price: Set(price),
        lead_time_days: Set(lead_time_days),
        is_preferred: Set(is_preferred),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed offer");
    id
}

pub async fn seed_stock(db: &DbPool, item_id: Uuid, warehouse_id: Uuid, quantity: i32) {
    let now = Utc::now();
    warehouse_stock::ActiveModel {
        id: Set(Uuid::new_v4()),
        item_id: Set(item_id),
        warehouse_id: Set(warehouse_id),
        quantity: Set(quantity),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed stock");
}

/// Current on-hand quantity; missing row reads as zero.
pub async fn stock_qty(db: &DbPool, item_id: Uuid, warehouse_id: Uuid) -> i32 {
    warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::ItemId.eq(item_id))
        .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
        .one(db)
        .await
        .expect("read stock")
        .map(|r| r.quantity)
        .unwrap_or(0)
}

pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    use chrono::TimeZone;
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}
