use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        goods_receipt::{self, ReceiptStatus},
        goods_receipt_line, item_master, supplier, warehouse,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::delivery_notes::unwrap_txn_err,
    services::{emit_stock_level_events, increase_stock, StockMutation},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReceiptLine {
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateGoodsReceiptCommand {
    #[validate(length(min = 1, message = "receipt number is required"))]
    pub receipt_number: String,
    pub receipt_date: DateTime<Utc>,
    pub warehouse_id: Uuid,
    pub supplier_id: Uuid,
    #[validate(length(min = 1, message = "at least one line is required"))]
    pub lines: Vec<NewReceiptLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsReceiptDetail {
    pub receipt: goods_receipt::Model,
    pub lines: Vec<goods_receipt_line::Model>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptPostingResult {
    pub goods_receipt_id: Uuid,
    pub mutations: Vec<StockMutation>,
}

/// Incoming goods receipts: draft on creation, posting increments warehouse
/// stock (creating stock rows lazily) and settles the document.
#[derive(Clone)]
pub struct ReceivingService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl ReceivingService {
    /// Creates a new receiving service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, command))]
    pub async fn create_goods_receipt(
        &self,
        command: CreateGoodsReceiptCommand,
    ) -> Result<GoodsReceiptDetail, ServiceError> {
        command.validate()?;
        for (idx, line) in command.lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "line {}: quantity must be positive",
                    idx + 1
                )));
            }
        }

        let db = self.db_pool.as_ref();

        warehouse::Entity::find_by_id(command.warehouse_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Warehouse {} not found", command.warehouse_id))
            })?;
        supplier::Entity::find_by_id(command.supplier_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Supplier {} not found", command.supplier_id))
            })?;
        for line in &command.lines {
            item_master::Entity::find_by_id(line.item_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Item {} not found", line.item_id))
                })?;
        }

        let now = Utc::now();
        let receipt_id = Uuid::new_v4();
        let header = goods_receipt::ActiveModel {
            id: Set(receipt_id),
            receipt_number: Set(command.receipt_number.clone()),
            receipt_date: Set(command.receipt_date),
            warehouse_id: Set(command.warehouse_id),
            supplier_id: Set(command.supplier_id),
            status: Set(ReceiptStatus::Draft),
            received_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let line_models: Vec<goods_receipt_line::ActiveModel> = command
            .lines
            .iter()
            .enumerate()
            .map(|(idx, line)| goods_receipt_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                goods_receipt_id: Set(receipt_id),
                line_no: Set(idx as i32 + 1),
                item_id: Set(line.item_id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                created_at: Set(now),
            })
            .collect();

        let receipt = db
            .transaction::<_, goods_receipt::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let receipt = header.insert(txn).await.map_err(ServiceError::db_error)?;
                    goods_receipt_line::Entity::insert_many(line_models)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    Ok(receipt)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        let lines = self.lines_of(receipt.id).await?;
        Ok(GoodsReceiptDetail { receipt, lines })
    }

    /// Posts a draft receipt: every line's quantity lands on warehouse stock
    /// in one transaction, and the document settles.
    #[instrument(skip(self))]
    pub async fn post_goods_receipt(
        &self,
        goods_receipt_id: Uuid,
    ) -> Result<ReceiptPostingResult, ServiceError> {
        let db = self.db_pool.as_ref();

        let mutations = db
            .transaction::<_, Vec<StockMutation>, ServiceError>(move |txn| {
                Box::pin(async move {
                    let receipt = goods_receipt::Entity::find_by_id(goods_receipt_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Goods receipt {} not found",
                                goods_receipt_id
                            ))
                        })?;

                    if receipt.status != ReceiptStatus::Draft {
                        return Err(ServiceError::InvalidStatus(format!(
                            "goods receipt {} was already received",
                            receipt.receipt_number
                        )));
                    }

                    let lines = goods_receipt_line::Entity::find()
                        .filter(goods_receipt_line::Column::GoodsReceiptId.eq(receipt.id))
                        .order_by_asc(goods_receipt_line::Column::LineNo)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let mut mutations = Vec::with_capacity(lines.len());
                    for line in &lines {
                        let mutation = increase_stock(
                            txn,
                            line.item_id,
                            receipt.warehouse_id,
                            line.quantity,
                        )
                        .await?;
                        mutations.push(mutation);
                    }

                    let now = Utc::now();
                    let mut active: goods_receipt::ActiveModel = receipt.into();
                    active.status = Set(ReceiptStatus::Received);
                    active.received_at = Set(Some(now));
                    active.updated_at = Set(now);
                    active.update(txn).await.map_err(ServiceError::db_error)?;

                    Ok(mutations)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(%goods_receipt_id, lines = mutations.len(), "goods receipt posted");
        emit_stock_level_events(
            db,
            &self.event_sender,
            &mutations,
            "goods_receipt",
            goods_receipt_id,
        )
        .await;
        self.event_sender
            .send_discard(Event::GoodsReceiptPosted(goods_receipt_id))
            .await;

        Ok(ReceiptPostingResult {
            goods_receipt_id,
            mutations,
        })
    }

    async fn lines_of(
        &self,
        goods_receipt_id: Uuid,
    ) -> Result<Vec<goods_receipt_line::Model>, ServiceError> {
        goods_receipt_line::Entity::find()
            .filter(goods_receipt_line::Column::GoodsReceiptId.eq(goods_receipt_id))
            .order_by_asc(goods_receipt_line::Column::LineNo)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}
