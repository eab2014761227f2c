use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{item_master, supplier_offer, warehouse},
    errors::ServiceError,
    services::read_on_hand,
};

/// Sourcing decision for one requested (item, warehouse, quantity).
///
/// The decision is advisory: it is computed from a plain read of current
/// stock and re-validated inside the posting transaction. Nothing is
/// persisted until the document is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sourcing", rename_all = "snake_case")]
pub enum SourcingDecision {
    /// On-hand stock covers the full quantity.
    FromStock { available: i32 },
    /// Shortage covered by the best-ranked supplier offer.
    Dropship {
        supplier_id: Uuid,
        price: Decimal,
        lead_time_days: i32,
        shortage: i32,
    },
    /// Ad-hoc line with its own description and price; no stock involved.
    Custom,
    /// Shortage with no dropship path (item not eligible or no active offers).
    CannotFulfill { available: i32, shortage: i32 },
}

impl SourcingDecision {
    pub fn is_fulfillable(&self) -> bool {
        !matches!(self, SourcingDecision::CannotFulfill { .. })
    }
}

/// Ranks offers best-first: preferred suppliers, then shortest lead time,
/// then lowest price. Ties keep their original order.
pub fn rank_offers(offers: &mut [supplier_offer::Model]) {
    offers.sort_by(|a, b| {
        b.is_preferred
            .cmp(&a.is_preferred)
            .then_with(|| a.lead_time_days.cmp(&b.lead_time_days))
            .then_with(|| a.price.cmp(&b.price))
    });
}

/// Decides how a requested quantity gets sourced: from on-hand stock, via
/// dropship from the best-ranked supplier, or not at all.
#[derive(Clone)]
pub struct AvailabilityService {
    db_pool: Arc<DbPool>,
}

impl AvailabilityService {
    /// Creates a new availability service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Resolves sourcing for one line. Pure read: calling it twice with
    /// unchanged stock and offers yields the same decision.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        item_id: Option<Uuid>,
        warehouse_id: Uuid,
        quantity: i32,
        is_custom: bool,
    ) -> Result<SourcingDecision, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "requested quantity must be positive, got {}",
                quantity
            )));
        }

        // Custom lines are always fulfillable and never touch stock or
        // suppliers.
        if is_custom {
            return Ok(SourcingDecision::Custom);
        }

        let item_id = item_id.ok_or_else(|| {
            ServiceError::ValidationError("catalog line requires an item id".to_string())
        })?;

        let db = self.db_pool.as_ref();

        let item = item_master::Entity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        warehouse::Entity::find_by_id(warehouse_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Warehouse {} not found", warehouse_id))
            })?;

        let available = read_on_hand(db, item_id, warehouse_id).await?;
        if available >= quantity {
            return Ok(SourcingDecision::FromStock { available });
        }

        let shortage = quantity - available;

        if !item.is_dropship_eligible {
            return Ok(SourcingDecision::CannotFulfill {
                available,
                shortage,
            });
        }

        let mut offers = self.active_offers(item_id).await?;
        if offers.is_empty() {
            return Ok(SourcingDecision::CannotFulfill {
                available,
                shortage,
            });
        }

        rank_offers(&mut offers);
        let best = &offers[0];

        Ok(SourcingDecision::Dropship {
            supplier_id: best.supplier_id,
            price: best.price,
            lead_time_days: best.lead_time_days,
            shortage,
        })
    }

    /// All active offers for an item, unranked.
    pub async fn active_offers(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<supplier_offer::Model>, ServiceError> {
        supplier_offer::Entity::find()
            .filter(supplier_offer::Column::ItemId.eq(item_id))
            .filter(supplier_offer::Column::IsActive.eq(true))
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn offer(preferred: bool, lead: i32, price: Decimal) -> supplier_offer::Model {
        supplier_offer::Model {
            id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            supplier_id: Uuid::new_v4(),
            price,
            lead_time_days: lead,
            is_preferred: preferred,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn preferred_flag_beats_lead_time_and_price() {
        let cheap_fast = offer(false, 1, dec!(5.00));
        let preferred_slow = offer(true, 10, dec!(50.00));
        let mut offers = vec![cheap_fast.clone(), preferred_slow.clone()];

        rank_offers(&mut offers);

        assert_eq!(offers[0].id, preferred_slow.id);
        assert_eq!(offers[1].id, cheap_fast.id);
    }

    #[test]
    fn lead_time_breaks_preferred_ties() {
        let slow = offer(true, 7, dec!(10.00));
        let fast = offer(true, 2, dec!(20.00));
        let mut offers = vec![slow.clone(), fast.clone()];

        rank_offers(&mut offers);

        assert_eq!(offers[0].id, fast.id);
    }

    #[test]
    fn price_breaks_lead_time_ties() {
        let expensive = offer(false, 3, dec!(99.00));
        let cheap = offer(false, 3, dec!(12.50));
        let mut offers = vec![expensive.clone(), cheap.clone()];

        rank_offers(&mut offers);

        assert_eq!(offers[0].id, cheap.id);
    }

    #[test]
    fn full_ties_keep_original_order() {
        let first = offer(false, 3, dec!(10.00));
        let second = offer(false, 3, dec!(10.00));
        let mut offers = vec![first.clone(), second.clone()];

        rank_offers(&mut offers);

        assert_eq!(offers[0].id, first.id);
        assert_eq!(offers[1].id, second.id);
    }
}
