use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        delivery_note::{self, DeliveryStatus},
        delivery_note_line::{self, DropshipStatus, LineSourcing},
        sales_return::{self, SalesReturnStatus},
        warehouse,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::availability::{AvailabilityService, SourcingDecision},
    services::{emit_stock_level_events, increase_stock},
};

/// A requested line before sourcing resolution. Catalog lines carry
/// `item_id`; custom lines carry `description` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeliveryLine {
    pub item_id: Option<Uuid>,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl NewDeliveryLine {
    pub fn is_custom(&self) -> bool {
        self.item_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDeliveryNoteCommand {
    #[validate(length(min = 1, message = "document number is required"))]
    pub document_number: String,
    pub document_date: DateTime<Utc>,
    pub warehouse_id: Uuid,
    pub customer_id: Uuid,
    #[validate(length(min = 1, message = "at least one line is required"))]
    pub lines: Vec<NewDeliveryLine>,
}

/// Sourcing decision reported back per line so the caller can notify the
/// user about dropship conversions and unfulfillable shortfalls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineDecision {
    pub line_no: i32,
    pub decision: SourcingDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryNoteDetail {
    pub note: delivery_note::Model,
    pub lines: Vec<delivery_note_line::Model>,
    pub decisions: Vec<LineDecision>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryNoteWithLines {
    pub note: delivery_note::Model,
    pub lines: Vec<delivery_note_line::Model>,
}

/// Service owning the delivery-note document lifecycle:
/// draft -> in_transit -> delivered, with guarded cancellation.
#[derive(Clone)]
pub struct DeliveryNoteService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    availability: AvailabilityService,
}

impl DeliveryNoteService {
    /// Creates a new delivery note service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        let availability = AvailabilityService::new(db_pool.clone());
        Self {
            db_pool,
            event_sender,
            availability,
        }
    }

    /// Creates a delivery note in draft, resolving sourcing for every line.
    ///
    /// A `CannotFulfill` resolution does not block creation: the line is
    /// stored stock-sourced and posting will reject it with
    /// `NoSupplierAvailable` until stock arrives or the line changes.
    #[instrument(skip(self, command))]
    pub async fn create_delivery_note(
        &self,
        command: CreateDeliveryNoteCommand,
    ) -> Result<DeliveryNoteDetail, ServiceError> {
        command.validate()?;
        validate_line_shapes(&command.lines)?;

        let db = self.db_pool.as_ref();

        warehouse::Entity::find_by_id(command.warehouse_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Warehouse {} not found", command.warehouse_id))
            })?;

        crate::entities::customer::Entity::find_by_id(command.customer_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", command.customer_id))
            })?;

        let mut decisions = Vec::with_capacity(command.lines.len());
        for (idx, line) in command.lines.iter().enumerate() {
            let decision = self
                .availability
                .resolve(
                    line.item_id,
                    command.warehouse_id,
                    line.quantity,
                    line.is_custom(),
                )
                .await?;
            decisions.push(LineDecision {
                line_no: idx as i32 + 1,
                decision,
            });
        }

        let now = Utc::now();
        let note_id = Uuid::new_v4();
        let header = delivery_note::ActiveModel {
            id: Set(note_id),
            document_number: Set(command.document_number.clone()),
            document_date: Set(command.document_date),
            warehouse_id: Set(command.warehouse_id),
            customer_id: Set(command.customer_id),
            status: Set(DeliveryStatus::Draft),
            shipped_at: Set(None),
            delivered_at: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let line_models = build_line_models(note_id, &command.lines, &decisions, now);

        let note = db
            .transaction::<_, delivery_note::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let note = header.insert(txn).await.map_err(ServiceError::db_error)?;
                    delivery_note_line::Entity::insert_many(line_models)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    Ok(note)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(delivery_note_id = %note.id, document_number = %note.document_number, "delivery note created");
        self.event_sender
            .send_discard(Event::DeliveryNoteCreated(note.id))
            .await;

        let lines = self.lines_of(note.id).await?;
        Ok(DeliveryNoteDetail {
            note,
            lines,
            decisions,
        })
    }

    /// Fetches one delivery note with its lines.
    #[instrument(skip(self))]
    pub async fn get_delivery_note(
        &self,
        delivery_note_id: Uuid,
    ) -> Result<DeliveryNoteWithLines, ServiceError> {
        let note = self.require_note(delivery_note_id).await?;
        let lines = self.lines_of(delivery_note_id).await?;
        Ok(DeliveryNoteWithLines { note, lines })
    }

    /// Replaces the lines of a draft document, re-resolving sourcing.
    #[instrument(skip(self, lines))]
    pub async fn update_lines(
        &self,
        delivery_note_id: Uuid,
        lines: Vec<NewDeliveryLine>,
    ) -> Result<DeliveryNoteDetail, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one line is required".to_string(),
            ));
        }
        validate_line_shapes(&lines)?;

        let note = self.require_note(delivery_note_id).await?;
        if note.status != DeliveryStatus::Draft {
            return Err(ServiceError::InvalidStatus(format!(
                "delivery note {} is {}; lines can only change in draft",
                note.document_number,
                note.status.as_str()
            )));
        }

        let mut decisions = Vec::with_capacity(lines.len());
        for (idx, line) in lines.iter().enumerate() {
            let decision = self
                .availability
                .resolve(line.item_id, note.warehouse_id, line.quantity, line.is_custom())
                .await?;
            decisions.push(LineDecision {
                line_no: idx as i32 + 1,
                decision,
            });
        }

        let now = Utc::now();
        let line_models = build_line_models(delivery_note_id, &lines, &decisions, now);
        let note_for_txn = note.clone();

        let note = self
            .db_pool
            .transaction::<_, delivery_note::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    delivery_note_line::Entity::delete_many()
                        .filter(
                            delivery_note_line::Column::DeliveryNoteId.eq(note_for_txn.id),
                        )
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    delivery_note_line::Entity::insert_many(line_models)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let mut active: delivery_note::ActiveModel = note_for_txn.into();
                    active.updated_at = Set(now);
                    active.update(txn).await.map_err(ServiceError::db_error)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        let lines = self.lines_of(delivery_note_id).await?;
        Ok(DeliveryNoteDetail {
            note,
            lines,
            decisions,
        })
    }

    /// Advances a dropship line's sub-status. Forward-only:
    /// pending -> ordered -> received. Allowed while the document is draft
    /// or in transit, on lines that have not shipped yet.
    #[instrument(skip(self))]
    pub async fn advance_dropship_status(
        &self,
        delivery_note_id: Uuid,
        line_id: Uuid,
        new_status: DropshipStatus,
    ) -> Result<delivery_note_line::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let note = self.require_note(delivery_note_id).await?;
        if note.status.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "delivery note {} is {}; dropship status is frozen",
                note.document_number,
                note.status.as_str()
            )));
        }

        let line = delivery_note_line::Entity::find_by_id(line_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .filter(|l| l.delivery_note_id == delivery_note_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Line {} not found on delivery note {}",
                    line_id, delivery_note_id
                ))
            })?;

        if line.sourcing != LineSourcing::Dropship {
            return Err(ServiceError::InvalidStatus(format!(
                "line {} is {}-sourced, not dropship",
                line.line_no,
                line.sourcing.as_str()
            )));
        }
        if line.is_posted() {
            return Err(ServiceError::InvalidStatus(format!(
                "line {} already shipped",
                line.line_no
            )));
        }

        let current = line.dropship_status.unwrap_or(DropshipStatus::Pending);
        if new_status.rank() <= current.rank() {
            return Err(ServiceError::InvalidStatus(format!(
                "dropship status can only advance forward (current: {}, requested: {})",
                current.as_str(),
                new_status.as_str()
            )));
        }

        let mut active: delivery_note_line::ActiveModel = line.into();
        active.dropship_status = Set(Some(new_status));
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send_discard(Event::DropshipStatusAdvanced {
                delivery_note_id,
                line_id,
                new_status: new_status.as_str().to_string(),
            })
            .await;

        Ok(updated)
    }

    /// Marks an in-transit document as delivered. Pure status advance, no
    /// stock effect (stock moved when the document posted).
    #[instrument(skip(self))]
    pub async fn advance_delivery(
        &self,
        delivery_note_id: Uuid,
    ) -> Result<delivery_note::Model, ServiceError> {
        let note = self.require_note(delivery_note_id).await?;
        if note.status != DeliveryStatus::InTransit {
            return Err(ServiceError::InvalidStatus(format!(
                "delivery note {} is {}; only in-transit documents can be delivered",
                note.document_number,
                note.status.as_str()
            )));
        }

        let now = Utc::now();
        let mut active: delivery_note::ActiveModel = note.into();
        active.status = Set(DeliveryStatus::Delivered);
        active.delivered_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send_discard(Event::DeliveryNoteDelivered(delivery_note_id))
            .await;

        Ok(updated)
    }

    /// Cancels a draft or in-transit document. Draft cancellation is a pure
    /// status flip (no stock ever moved); in-transit cancellation restores
    /// the stock decremented at posting, in one transaction. Rejected when a
    /// settled sales return references the document.
    #[instrument(skip(self))]
    pub async fn cancel_delivery_note(
        &self,
        delivery_note_id: Uuid,
    ) -> Result<delivery_note::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let note = self.require_note(delivery_note_id).await?;

        if note.status.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "delivery note {} is {} and cannot be cancelled",
                note.document_number,
                note.status.as_str()
            )));
        }

        let settled_refs = sales_return::Entity::find()
            .filter(sales_return::Column::DeliveryNoteId.eq(delivery_note_id))
            .filter(sales_return::Column::Status.eq(SalesReturnStatus::Settled))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if settled_refs > 0 {
            return Err(ServiceError::Conflict(format!(
                "delivery note {} is referenced by a settled sales return",
                note.document_number
            )));
        }

        let now = Utc::now();
        let was_in_transit = note.status == DeliveryStatus::InTransit;
        let note_for_txn = note.clone();

        let (updated, restored) = self
            .db_pool
            .transaction::<_, (delivery_note::Model, Vec<crate::services::StockMutation>), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let mut restored = Vec::new();

                        if was_in_transit {
                            let shipped_lines = delivery_note_line::Entity::find()
                                .filter(
                                    delivery_note_line::Column::DeliveryNoteId
                                        .eq(note_for_txn.id),
                                )
                                .filter(
                                    delivery_note_line::Column::Sourcing
                                        .eq(LineSourcing::Stock),
                                )
                                .filter(delivery_note_line::Column::PostedAt.is_not_null())
                                .all(txn)
                                .await
                                .map_err(ServiceError::db_error)?;

                            for line in shipped_lines {
                                let item_id = line.item_id.ok_or_else(|| {
                                    ServiceError::InternalError(format!(
                                        "stock-sourced line {} has no item",
                                        line.id
                                    ))
                                })?;
                                let mutation = increase_stock(
                                    txn,
                                    item_id,
                                    note_for_txn.warehouse_id,
                                    line.quantity,
                                )
                                .await?;
                                restored.push(mutation);
                            }
                        }

                        let mut active: delivery_note::ActiveModel = note_for_txn.into();
                        active.status = Set(DeliveryStatus::Cancelled);
                        active.cancelled_at = Set(Some(now));
                        active.updated_at = Set(now);
                        let updated =
                            active.update(txn).await.map_err(ServiceError::db_error)?;

                        Ok((updated, restored))
                    })
                },
            )
            .await
            .map_err(unwrap_txn_err)?;

        info!(
            delivery_note_id = %delivery_note_id,
            restored_lines = restored.len(),
            "delivery note cancelled"
        );
        emit_stock_level_events(
            db,
            &self.event_sender,
            &restored,
            "delivery_note_cancellation",
            delivery_note_id,
        )
        .await;
        self.event_sender
            .send_discard(Event::DeliveryNoteCancelled(delivery_note_id))
            .await;

        Ok(updated)
    }

    async fn require_note(
        &self,
        delivery_note_id: Uuid,
    ) -> Result<delivery_note::Model, ServiceError> {
        delivery_note::Entity::find_by_id(delivery_note_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Delivery note {} not found", delivery_note_id))
            })
    }

    async fn lines_of(
        &self,
        delivery_note_id: Uuid,
    ) -> Result<Vec<delivery_note_line::Model>, ServiceError> {
        delivery_note_line::Entity::find()
            .filter(delivery_note_line::Column::DeliveryNoteId.eq(delivery_note_id))
            .order_by_asc(delivery_note_line::Column::LineNo)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

fn validate_line_shapes(lines: &[NewDeliveryLine]) -> Result<(), ServiceError> {
    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if line.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "line {}: quantity must be positive",
                line_no
            )));
        }
        match (&line.item_id, &line.description) {
            (Some(_), Some(_)) => {
                return Err(ServiceError::ValidationError(format!(
                    "line {}: carries both an item and a custom description",
                    line_no
                )));
            }
            (None, None) => {
                return Err(ServiceError::ValidationError(format!(
                    "line {}: needs either an item or a custom description",
                    line_no
                )));
            }
            (None, Some(desc)) if desc.trim().is_empty() => {
                return Err(ServiceError::ValidationError(format!(
                    "line {}: custom description must not be blank",
                    line_no
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn build_line_models(
    note_id: Uuid,
    lines: &[NewDeliveryLine],
    decisions: &[LineDecision],
    now: DateTime<Utc>,
) -> Vec<delivery_note_line::ActiveModel> {
    lines
        .iter()
        .zip(decisions.iter())
        .map(|(line, resolved)| {
            let (sourcing, supplier_id, dropship_status) = match &resolved.decision {
                SourcingDecision::Custom => (LineSourcing::Custom, None, None),
                SourcingDecision::Dropship { supplier_id, .. } => (
                    LineSourcing::Dropship,
                    Some(*supplier_id),
                    Some(DropshipStatus::Pending),
                ),
                // A shortfall with no dropship path stays stock-sourced and
                // fails at post time.
                SourcingDecision::FromStock { .. } | SourcingDecision::CannotFulfill { .. } => {
                    (LineSourcing::Stock, None, None)
                }
            };

            delivery_note_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                delivery_note_id: Set(note_id),
                line_no: Set(resolved.line_no),
                sourcing: Set(sourcing),
                item_id: Set(line.item_id),
                description: Set(line.description.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                supplier_id: Set(supplier_id),
                dropship_status: Set(dropship_status),
                posted_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
        })
        .collect()
}

pub(crate) fn unwrap_txn_err(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
