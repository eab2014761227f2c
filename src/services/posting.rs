use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        delivery_note::{self, DeliveryStatus},
        delivery_note_line::{self, DropshipStatus, LineSourcing},
        item_master, supplier_offer,
    },
    errors::{LineShortfall, ServiceError, SupplierCandidate},
    events::{Event, EventSender},
    services::availability::rank_offers,
    services::delivery_notes::unwrap_txn_err,
    services::{decrease_stock_guarded, emit_stock_level_events, StockDecrement, StockMutation},
};

/// Posting mode for the draft -> in_transit transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PostingMode {
    /// Every line must be ready; one not-ready line aborts the whole post.
    Complete,
    /// Ships the ready subset; unready lines stay attached.
    Partial,
}

/// Manifest row for one decremented stock line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippedLine {
    pub line_id: Uuid,
    pub item_id: Uuid,
    pub previous_qty: i32,
    pub new_qty: i32,
    pub quantity_shipped: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingResult {
    pub delivery_note_id: Uuid,
    pub status: DeliveryStatus,
    pub shipped: Vec<ShippedLine>,
    /// Lines left unposted (dropship awaiting receipt, or stock shortfalls
    /// skipped by a partial post).
    pub pending_line_ids: Vec<Uuid>,
}

/// Executes the draft -> in_transit transition as one atomic unit: stock
/// re-validation, guarded decrements, and the status flip either all commit
/// or all roll back.
#[derive(Clone)]
pub struct PostingService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl PostingService {
    /// Creates a new posting service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Posts a draft delivery note.
    ///
    /// Sourcing decisions made at creation time are advisory only; every
    /// stock line is re-checked against live quantities inside the posting
    /// transaction, so stock consumed by concurrent documents since creation
    /// is detected here.
    #[instrument(skip(self))]
    pub async fn post_delivery_note(
        &self,
        delivery_note_id: Uuid,
        mode: PostingMode,
    ) -> Result<PostingResult, ServiceError> {
        let db = self.db_pool.as_ref();

        let outcome = db
            .transaction::<_, TxnOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    let note = delivery_note::Entity::find_by_id(delivery_note_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Delivery note {} not found",
                                delivery_note_id
                            ))
                        })?;

                    if note.status != DeliveryStatus::Draft {
                        return Err(ServiceError::InvalidStatus(format!(
                            "delivery note {} is {}; only draft documents can post",
                            note.document_number,
                            note.status.as_str()
                        )));
                    }

                    let lines = delivery_note_line::Entity::find()
                        .filter(delivery_note_line::Column::DeliveryNoteId.eq(note.id))
                        .order_by_asc(delivery_note_line::Column::LineNo)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    // Live availability per item, decremented locally as
                    // lines claim quantity so duplicate-item documents are
                    // judged against what earlier lines leave over.
                    let mut remaining: HashMap<Uuid, i32> = HashMap::new();
                    for line in &lines {
                        if line.sourcing == LineSourcing::Stock {
                            if let Some(item_id) = line.item_id {
                                if !remaining.contains_key(&item_id) {
                                    let on_hand = crate::services::read_on_hand(
                                        txn,
                                        item_id,
                                        note.warehouse_id,
                                    )
                                    .await?;
                                    remaining.insert(item_id, on_hand);
                                }
                            }
                        }
                    }

                    let mut ready: Vec<delivery_note_line::Model> = Vec::new();
                    let mut shortfalls: Vec<ShortfallLine> = Vec::new();
                    let mut pending: Vec<Uuid> = Vec::new();

                    for line in &lines {
                        match line.sourcing {
                            LineSourcing::Custom => ready.push(line.clone()),
                            LineSourcing::Dropship => {
                                if line.dropship_status == Some(DropshipStatus::Received) {
                                    ready.push(line.clone());
                                } else {
                                    pending.push(line.id);
                                    shortfalls.push(ShortfallLine {
                                        line_id: line.id,
                                        item_id: line.item_id,
                                        requested: line.quantity,
                                        available: 0,
                                        dropship_pending: true,
                                    });
                                }
                            }
                            LineSourcing::Stock => {
                                let item_id = line.item_id.ok_or_else(|| {
                                    ServiceError::InternalError(format!(
                                        "stock-sourced line {} has no item",
                                        line.id
                                    ))
                                })?;
                                let available =
                                    remaining.get(&item_id).copied().unwrap_or(0);
                                if available >= line.quantity {
                                    remaining.insert(item_id, available - line.quantity);
                                    ready.push(line.clone());
                                } else {
                                    pending.push(line.id);
                                    shortfalls.push(ShortfallLine {
                                        line_id: line.id,
                                        item_id: Some(item_id),
                                        requested: line.quantity,
                                        available,
                                        dropship_pending: false,
                                    });
                                }
                            }
                        }
                    }

                    if mode == PostingMode::Complete && !shortfalls.is_empty() {
                        return Err(complete_mode_error(txn, shortfalls).await?);
                    }

                    if ready.is_empty() {
                        return Err(ServiceError::InvalidStatus(format!(
                            "delivery note {} has no lines ready to ship",
                            note.document_number
                        )));
                    }

                    let now = Utc::now();
                    let mut shipped = Vec::new();
                    let mut mutations = Vec::new();

                    for line in &ready {
                        if line.sourcing == LineSourcing::Stock {
                            let item_id = line.item_id.ok_or_else(|| {
                                ServiceError::InternalError(format!(
                                    "stock-sourced line {} has no item",
                                    line.id
                                ))
                            })?;
                            let outcome = decrease_stock_guarded(
                                txn,
                                item_id,
                                note.warehouse_id,
                                line.quantity,
                            )
                            .await?;
                            let mutation = match outcome {
                                StockDecrement::Applied(m) => m,
                                // Readiness said yes moments ago in this
                                // same transaction; losing the guard now
                                // means another poster got there first.
                                StockDecrement::Insufficient { available } => {
                                    return Err(ServiceError::ConcurrentStockConflict(
                                        format!(
                                            "item {} had {} left at commit, needed {}",
                                            item_id, available, line.quantity
                                        ),
                                    ));
                                }
                            };
                            shipped.push(ShippedLine {
                                line_id: line.id,
                                item_id,
                                previous_qty: mutation.previous_quantity,
                                new_qty: mutation.new_quantity,
                                quantity_shipped: line.quantity,
                            });
                            mutations.push(mutation);
                        }

                        let mut active: delivery_note_line::ActiveModel = line.clone().into();
                        active.posted_at = Set(Some(now));
                        active.updated_at = Set(now);
                        active.update(txn).await.map_err(ServiceError::db_error)?;
                    }

                    let mut active: delivery_note::ActiveModel = note.into();
                    active.status = Set(DeliveryStatus::InTransit);
                    active.shipped_at = Set(Some(now));
                    active.updated_at = Set(now);
                    let updated = active.update(txn).await.map_err(ServiceError::db_error)?;

                    Ok(TxnOutcome {
                        status: updated.status,
                        shipped,
                        pending,
                        mutations,
                    })
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(
            %delivery_note_id,
            lines_shipped = outcome.shipped.len(),
            lines_pending = outcome.pending.len(),
            mode = %mode,
            "delivery note posted"
        );

        emit_stock_level_events(
            db,
            &self.event_sender,
            &outcome.mutations,
            "delivery_note",
            delivery_note_id,
        )
        .await;
        self.event_sender
            .send_discard(Event::DeliveryNotePosted {
                delivery_note_id,
                lines_shipped: outcome.shipped.len() as u32,
                lines_pending: outcome.pending.len() as u32,
            })
            .await;

        Ok(PostingResult {
            delivery_note_id,
            status: outcome.status,
            shipped: outcome.shipped,
            pending_line_ids: outcome.pending,
        })
    }
}

struct TxnOutcome {
    status: DeliveryStatus,
    shipped: Vec<ShippedLine>,
    pending: Vec<Uuid>,
    mutations: Vec<StockMutation>,
}

struct ShortfallLine {
    line_id: Uuid,
    item_id: Option<Uuid>,
    requested: i32,
    available: i32,
    dropship_pending: bool,
}

/// Builds the complete-mode abort error. A stock shortfall whose item has no
/// dropship path at all gets the distinct `NoSupplierAvailable` error, since
/// switching the line to dropship cannot resolve it; every other shortfall
/// set becomes `InsufficientStock` with per-line detail and ranked supplier
/// candidates.
async fn complete_mode_error<C: sea_orm::ConnectionTrait>(
    conn: &C,
    shortfalls: Vec<ShortfallLine>,
) -> Result<ServiceError, ServiceError> {
    let stock_item_ids: Vec<Uuid> = shortfalls
        .iter()
        .filter(|s| !s.dropship_pending)
        .filter_map(|s| s.item_id)
        .collect();

    let items: HashMap<Uuid, item_master::Model> = item_master::Entity::find()
        .filter(item_master::Column::Id.is_in(stock_item_ids.clone()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    let mut offers_by_item: HashMap<Uuid, Vec<supplier_offer::Model>> = HashMap::new();
    if !stock_item_ids.is_empty() {
        let offers = supplier_offer::Entity::find()
            .filter(supplier_offer::Column::ItemId.is_in(stock_item_ids))
            .filter(supplier_offer::Column::IsActive.eq(true))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;
        for offer in offers {
            offers_by_item.entry(offer.item_id).or_default().push(offer);
        }
    }

    let mut detailed = Vec::with_capacity(shortfalls.len());
    for shortfall in shortfalls {
        let candidates = match shortfall.item_id {
            Some(item_id) if !shortfall.dropship_pending => {
                let eligible = items
                    .get(&item_id)
                    .map(|i| i.is_dropship_eligible)
                    .unwrap_or(false);
                let mut offers = if eligible {
                    offers_by_item.get(&item_id).cloned().unwrap_or_default()
                } else {
                    Vec::new()
                };
                rank_offers(&mut offers);

                if offers.is_empty() {
                    // Not resolvable by a dropship conversion.
                    return Ok(ServiceError::NoSupplierAvailable {
                        item_id,
                        shortage: shortfall.requested - shortfall.available,
                    });
                }

                offers
                    .into_iter()
                    .map(|o| SupplierCandidate {
                        supplier_id: o.supplier_id,
                        price: o.price,
                        lead_time_days: o.lead_time_days,
                        is_preferred: o.is_preferred,
                    })
                    .collect()
            }
            _ => Vec::new(),
        };

        detailed.push(LineShortfall {
            line_id: shortfall.line_id,
            item_id: shortfall.item_id.unwrap_or_default(),
            requested: shortfall.requested,
            available: shortfall.available,
            shortage: shortfall.requested - shortfall.available,
            candidates,
        });
    }

    Ok(ServiceError::insufficient_stock(detailed))
}
