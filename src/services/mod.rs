use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    entities::{item_master, warehouse_stock},
    errors::ServiceError,
    events::{Event, EventSender},
};

pub mod availability;
pub mod delivery_notes;
pub mod posting;
pub mod receiving;
pub mod returns;
pub mod stock_ledger;

/// Before/after snapshot of one stock row mutation, reported in posting
/// manifests and threshold notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMutation {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub previous_quantity: i32,
    pub new_quantity: i32,
}

/// Outcome of a guarded decrement attempt.
#[derive(Debug, Clone)]
pub(crate) enum StockDecrement {
    Applied(StockMutation),
    Insufficient { available: i32 },
}

/// Current on-hand quantity for (item, warehouse); a missing row counts as
/// zero (rows are created lazily on first inbound movement).
pub(crate) async fn read_on_hand<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    warehouse_id: Uuid,
) -> Result<i32, ServiceError> {
    let row = warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::ItemId.eq(item_id))
        .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(row.map(|r| r.quantity).unwrap_or(0))
}

/// Adds `quantity` to the stock row for (item, warehouse), creating the row
/// lazily when this is the first movement for the pair. Must run inside the
/// caller's transaction.
pub(crate) async fn increase_stock<C: ConnectionTrait>(
    txn: &C,
    item_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
) -> Result<StockMutation, ServiceError> {
    let existing = warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::ItemId.eq(item_id))
        .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?;

    match existing {
        Some(row) => {
            warehouse_stock::Entity::update_many()
                .col_expr(
                    warehouse_stock::Column::Quantity,
                    Expr::col(warehouse_stock::Column::Quantity).add(quantity),
                )
                .col_expr(warehouse_stock::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(warehouse_stock::Column::Id.eq(row.id))
                .exec(txn)
                .await
                .map_err(ServiceError::db_error)?;

            let updated = warehouse_stock::Entity::find_by_id(row.id)
                .one(txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "stock row {} vanished during increment",
                        row.id
                    ))
                })?;

            Ok(StockMutation {
                item_id,
                warehouse_id,
                previous_quantity: updated.quantity - quantity,
                new_quantity: updated.quantity,
            })
        }
        None => {
            let now = Utc::now();
            let new_row = warehouse_stock::ActiveModel {
                id: Set(Uuid::new_v4()),
                item_id: Set(item_id),
                warehouse_id: Set(warehouse_id),
                quantity: Set(quantity),
                created_at: Set(now),
                updated_at: Set(now),
            };
            new_row.insert(txn).await.map_err(ServiceError::db_error)?;

            Ok(StockMutation {
                item_id,
                warehouse_id,
                previous_quantity: 0,
                new_quantity: quantity,
            })
        }
    }
}

/// Subtracts `quantity` from the stock row for (item, warehouse) with a
/// conditional update (`quantity >= ?` in the WHERE clause). The guard is
/// what makes concurrent posting safe: a decrement that would go negative
/// matches zero rows instead. Must run inside the caller's transaction so a
/// failed line rolls back every decrement already applied.
pub(crate) async fn decrease_stock_guarded<C: ConnectionTrait>(
    txn: &C,
    item_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
) -> Result<StockDecrement, ServiceError> {
    let existing = warehouse_stock::Entity::find()
        .filter(warehouse_stock::Column::ItemId.eq(item_id))
        .filter(warehouse_stock::Column::WarehouseId.eq(warehouse_id))
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?;

    let row = match existing {
        Some(row) => row,
        None => return Ok(StockDecrement::Insufficient { available: 0 }),
    };

    if row.quantity < quantity {
        return Ok(StockDecrement::Insufficient {
            available: row.quantity,
        });
    }

    let result = warehouse_stock::Entity::update_many()
        .col_expr(
            warehouse_stock::Column::Quantity,
            Expr::col(warehouse_stock::Column::Quantity).sub(quantity),
        )
        .col_expr(warehouse_stock::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(warehouse_stock::Column::Id.eq(row.id))
        .filter(warehouse_stock::Column::Quantity.gte(quantity))
        .exec(txn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        // Another transaction consumed the stock between our read and the
        // guarded update.
        return Err(ServiceError::ConcurrentStockConflict(format!(
            "stock for item {} in warehouse {} was consumed concurrently",
            item_id, warehouse_id
        )));
    }

    let updated = warehouse_stock::Entity::find_by_id(row.id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::InternalError(format!("stock row {} vanished during decrement", row.id))
        })?;

    Ok(StockDecrement::Applied(StockMutation {
        item_id,
        warehouse_id,
        previous_quantity: updated.quantity + quantity,
        new_quantity: updated.quantity,
    }))
}

/// Fans out stock-movement and threshold-crossing notifications for a batch
/// of committed mutations. Best effort: failures are logged, never returned.
pub(crate) async fn emit_stock_level_events(
    db: &DatabaseConnection,
    event_sender: &EventSender,
    mutations: &[StockMutation],
    document_kind: &str,
    document_id: Uuid,
) {
    if mutations.is_empty() {
        return;
    }

    let item_ids: Vec<Uuid> = mutations.iter().map(|m| m.item_id).collect();
    let items = match item_master::Entity::find()
        .filter(item_master::Column::Id.is_in(item_ids))
        .all(db)
        .await
    {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "failed to load items for threshold notification");
            Vec::new()
        }
    };

    for mutation in mutations {
        event_sender
            .send_discard(Event::StockMutated {
                item_id: mutation.item_id,
                warehouse_id: mutation.warehouse_id,
                previous_quantity: mutation.previous_quantity,
                new_quantity: mutation.new_quantity,
                document_kind: document_kind.to_string(),
                document_id,
            })
            .await;

        let Some(item) = items.iter().find(|i| i.id == mutation.item_id) else {
            continue;
        };

        if mutation.previous_quantity >= item.min_stock
            && mutation.new_quantity < item.min_stock
        {
            event_sender
                .send_discard(Event::StockBelowMinimum {
                    item_id: mutation.item_id,
                    warehouse_id: mutation.warehouse_id,
                    quantity: mutation.new_quantity,
                    min_stock: item.min_stock,
                })
                .await;
        }

        if let Some(max_stock) = item.max_stock {
            if mutation.previous_quantity <= max_stock && mutation.new_quantity > max_stock {
                event_sender
                    .send_discard(Event::StockAboveMaximum {
                        item_id: mutation.item_id,
                        warehouse_id: mutation.warehouse_id,
                        quantity: mutation.new_quantity,
                        max_stock,
                    })
                    .await;
            }
        }
    }
}
