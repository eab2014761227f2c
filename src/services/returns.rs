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
        customer, delivery_note, item_master,
        purchase_return::{self, PurchaseReturnStatus},
        purchase_return_line,
        sales_return::{self, SalesReturnStatus},
        sales_return_line, supplier, warehouse,
    },
    errors::{LineShortfall, ServiceError},
    events::{Event, EventSender},
    services::delivery_notes::unwrap_txn_err,
    services::{
        decrease_stock_guarded, emit_stock_level_events, increase_stock, StockDecrement,
        StockMutation,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReturnLine {
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePurchaseReturnCommand {
    #[validate(length(min = 1, message = "return number is required"))]
    pub return_number: String,
    pub return_date: DateTime<Utc>,
    /// The warehouse the goods leave. Always explicit: a purchase return is
    /// never applied against a defaulted warehouse.
    pub warehouse_id: Uuid,
    pub supplier_id: Uuid,
    #[validate(length(min = 1, message = "at least one line is required"))]
    pub lines: Vec<NewReturnLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSalesReturnCommand {
    #[validate(length(min = 1, message = "return number is required"))]
    pub return_number: String,
    pub return_date: DateTime<Utc>,
    pub warehouse_id: Uuid,
    pub customer_id: Uuid,
    /// Optional back-reference to the delivery note the goods came from.
    pub delivery_note_id: Option<Uuid>,
    #[validate(length(min = 1, message = "at least one line is required"))]
    pub lines: Vec<NewReturnLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResult {
    pub document_id: Uuid,
    pub mutations: Vec<StockMutation>,
}

/// Purchase returns (goods back to a supplier, stock out) and sales returns
/// (goods back from a customer, stock in). Both are created in draft and
/// mutate stock only on settlement.
#[derive(Clone)]
pub struct ReturnService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl ReturnService {
    /// Creates a new return service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, command))]
    pub async fn create_purchase_return(
        &self,
        command: CreatePurchaseReturnCommand,
    ) -> Result<purchase_return::Model, ServiceError> {
        command.validate()?;
        validate_return_lines(&command.lines)?;

        let db = self.db_pool.as_ref();
        self.require_warehouse(command.warehouse_id).await?;
        supplier::Entity::find_by_id(command.supplier_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Supplier {} not found", command.supplier_id))
            })?;
        self.require_items(&command.lines).await?;

        let now = Utc::now();
        let return_id = Uuid::new_v4();
        let header = purchase_return::ActiveModel {
            id: Set(return_id),
            return_number: Set(command.return_number.clone()),
            return_date: Set(command.return_date),
            warehouse_id: Set(command.warehouse_id),
            supplier_id: Set(command.supplier_id),
            status: Set(PurchaseReturnStatus::Draft),
            settled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let line_models: Vec<purchase_return_line::ActiveModel> = command
            .lines
            .iter()
            .enumerate()
            .map(|(idx, line)| purchase_return_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_return_id: Set(return_id),
                line_no: Set(idx as i32 + 1),
                item_id: Set(line.item_id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                created_at: Set(now),
            })
            .collect();

        db.transaction::<_, purchase_return::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let saved = header.insert(txn).await.map_err(ServiceError::db_error)?;
                purchase_return_line::Entity::insert_many(line_models)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                Ok(saved)
            })
        })
        .await
        .map_err(unwrap_txn_err)
    }

    /// Settles a draft purchase return, decrementing stock with the same
    /// guarded primitive posting uses. A line whose (item, warehouse) pair
    /// has no stock row, or not enough on hand, rejects the whole settlement
    /// instead of driving the quantity negative.
    #[instrument(skip(self))]
    pub async fn settle_purchase_return(
        &self,
        purchase_return_id: Uuid,
    ) -> Result<SettlementResult, ServiceError> {
        let db = self.db_pool.as_ref();

        let mutations = db
            .transaction::<_, Vec<StockMutation>, ServiceError>(move |txn| {
                Box::pin(async move {
                    let document = purchase_return::Entity::find_by_id(purchase_return_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Purchase return {} not found",
                                purchase_return_id
                            ))
                        })?;

                    if document.status != PurchaseReturnStatus::Draft {
                        return Err(ServiceError::InvalidStatus(format!(
                            "purchase return {} was already settled",
                            document.return_number
                        )));
                    }

                    let lines = purchase_return_line::Entity::find()
                        .filter(
                            purchase_return_line::Column::PurchaseReturnId
                                .eq(document.id),
                        )
                        .order_by_asc(purchase_return_line::Column::LineNo)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let mut mutations = Vec::with_capacity(lines.len());
                    for line in &lines {
                        let outcome = decrease_stock_guarded(
                            txn,
                            line.item_id,
                            document.warehouse_id,
                            line.quantity,
                        )
                        .await?;
                        match outcome {
                            StockDecrement::Applied(mutation) => mutations.push(mutation),
                            StockDecrement::Insufficient { available } => {
                                return Err(ServiceError::insufficient_stock(vec![
                                    LineShortfall {
                                        line_id: line.id,
                                        item_id: line.item_id,
                                        requested: line.quantity,
                                        available,
                                        shortage: line.quantity - available,
                                        candidates: Vec::new(),
                                    },
                                ]));
                            }
                        }
                    }

                    let now = Utc::now();
                    let mut active: purchase_return::ActiveModel = document.into();
                    active.status = Set(PurchaseReturnStatus::Settled);
                    active.settled_at = Set(Some(now));
                    active.updated_at = Set(now);
                    active.update(txn).await.map_err(ServiceError::db_error)?;

                    Ok(mutations)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(%purchase_return_id, lines = mutations.len(), "purchase return settled");
        emit_stock_level_events(
            db,
            &self.event_sender,
            &mutations,
            "purchase_return",
            purchase_return_id,
        )
        .await;
        self.event_sender
            .send_discard(Event::PurchaseReturnSettled(purchase_return_id))
            .await;

        Ok(SettlementResult {
            document_id: purchase_return_id,
            mutations,
        })
    }

    #[instrument(skip(self, command))]
    pub async fn create_sales_return(
        &self,
        command: CreateSalesReturnCommand,
    ) -> Result<sales_return::Model, ServiceError> {
        command.validate()?;
        validate_return_lines(&command.lines)?;

        let db = self.db_pool.as_ref();
        self.require_warehouse(command.warehouse_id).await?;
        customer::Entity::find_by_id(command.customer_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", command.customer_id))
            })?;
        if let Some(delivery_note_id) = command.delivery_note_id {
            delivery_note::Entity::find_by_id(delivery_note_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Delivery note {} not found",
                        delivery_note_id
                    ))
                })?;
        }
        self.require_items(&command.lines).await?;

        let now = Utc::now();
        let return_id = Uuid::new_v4();
        let header = sales_return::ActiveModel {
            id: Set(return_id),
            return_number: Set(command.return_number.clone()),
            return_date: Set(command.return_date),
            warehouse_id: Set(command.warehouse_id),
            customer_id: Set(command.customer_id),
            delivery_note_id: Set(command.delivery_note_id),
            status: Set(SalesReturnStatus::Draft),
            settled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let line_models: Vec<sales_return_line::ActiveModel> = command
            .lines
            .iter()
            .enumerate()
            .map(|(idx, line)| sales_return_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                sales_return_id: Set(return_id),
                line_no: Set(idx as i32 + 1),
                item_id: Set(line.item_id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                created_at: Set(now),
            })
            .collect();

        db.transaction::<_, sales_return::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let saved = header.insert(txn).await.map_err(ServiceError::db_error)?;
                sales_return_line::Entity::insert_many(line_models)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                Ok(saved)
            })
        })
        .await
        .map_err(unwrap_txn_err)
    }

    /// Settles a draft sales return: returned goods land back on warehouse
    /// stock (creating the stock row lazily when this is the item's first
    /// movement in the warehouse).
    #[instrument(skip(self))]
    pub async fn settle_sales_return(
        &self,
        sales_return_id: Uuid,
    ) -> Result<SettlementResult, ServiceError> {
        let db = self.db_pool.as_ref();

        let mutations = db
            .transaction::<_, Vec<StockMutation>, ServiceError>(move |txn| {
                Box::pin(async move {
                    let document = sales_return::Entity::find_by_id(sales_return_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Sales return {} not found",
                                sales_return_id
                            ))
                        })?;

                    if document.status != SalesReturnStatus::Draft {
                        return Err(ServiceError::InvalidStatus(format!(
                            "sales return {} was already settled",
                            document.return_number
                        )));
                    }

                    let lines = sales_return_line::Entity::find()
                        .filter(sales_return_line::Column::SalesReturnId.eq(document.id))
                        .order_by_asc(sales_return_line::Column::LineNo)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let mut mutations = Vec::with_capacity(lines.len());
                    for line in &lines {
                        let mutation = increase_stock(
                            txn,
                            line.item_id,
                            document.warehouse_id,
                            line.quantity,
                        )
                        .await?;
                        mutations.push(mutation);
                    }

                    let now = Utc::now();
                    let mut active: sales_return::ActiveModel = document.into();
                    active.status = Set(SalesReturnStatus::Settled);
                    active.settled_at = Set(Some(now));
                    active.updated_at = Set(now);
                    active.update(txn).await.map_err(ServiceError::db_error)?;

                    Ok(mutations)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(%sales_return_id, lines = mutations.len(), "sales return settled");
        emit_stock_level_events(
            db,
            &self.event_sender,
            &mutations,
            "sales_return",
            sales_return_id,
        )
        .await;
        self.event_sender
            .send_discard(Event::SalesReturnSettled(sales_return_id))
            .await;

        Ok(SettlementResult {
            document_id: sales_return_id,
            mutations,
        })
    }

    async fn require_warehouse(&self, warehouse_id: Uuid) -> Result<(), ServiceError> {
        warehouse::Entity::find_by_id(warehouse_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Warehouse {} not found", warehouse_id))
            })?;
        Ok(())
    }

    async fn require_items(&self, lines: &[NewReturnLine]) -> Result<(), ServiceError> {
        for line in lines {
            item_master::Entity::find_by_id(line.item_id)
                .one(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Item {} not found", line.item_id))
                })?;
        }
        Ok(())
    }
}

fn validate_return_lines(lines: &[NewReturnLine]) -> Result<(), ServiceError> {
    for (idx, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "line {}: quantity must be positive",
                idx + 1
            )));
        }
    }
    Ok(())
}
