use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        customer, delivery_note,
        delivery_note::DeliveryStatus,
        delivery_note_line,
        delivery_note_line::LineSourcing,
        goods_receipt,
        goods_receipt::ReceiptStatus,
        goods_receipt_line, item_master, purchase_return,
        purchase_return::PurchaseReturnStatus,
        purchase_return_line, sales_return,
        sales_return::SalesReturnStatus,
        sales_return_line, supplier,
    },
    errors::ServiceError,
};

/// The four movement kinds merged into one ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentKind {
    GoodsReceipt,
    DeliveryNote,
    PurchaseReturn,
    SalesReturn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MovementDirection {
    In,
    Out,
}

impl MovementDirection {
    pub fn sign(&self) -> i32 {
        match self {
            MovementDirection::In => 1,
            MovementDirection::Out => -1,
        }
    }
}

/// Display sort key. Running balances are always computed chronologically;
/// sorting by another key reorders rows but keeps each row's
/// chronologically-computed balance (the balance column is only
/// balance-meaningful under date sort).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSortKey {
    #[default]
    TransactionDate,
    DocumentKind,
    Quantity,
    Balance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerQuery {
    pub item_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    /// Inclusive range start; movements strictly before it feed the opening
    /// balance instead of the entry list.
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive range end.
    pub date_to: Option<DateTime<Utc>>,
    pub sort_key: LedgerSortKey,
    pub sort_desc: bool,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl LedgerQuery {
    /// Full unpaginated history for one item, oldest first.
    pub fn for_item(item_id: Uuid) -> Self {
        Self {
            item_id,
            warehouse_id: None,
            date_from: None,
            date_to: None,
            sort_key: LedgerSortKey::TransactionDate,
            sort_desc: false,
            offset: None,
            limit: None,
        }
    }
}

/// One reconstructed ledger row. Derived on demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_date: DateTime<Utc>,
    pub direction: MovementDirection,
    pub document_kind: DocumentKind,
    pub document_id: Uuid,
    pub document_number: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub running_balance: i32,
    pub counterpart_name: String,
}

impl LedgerEntry {
    pub fn signed_quantity(&self) -> i32 {
        self.direction.sign() * self.quantity
    }
}

/// Aggregates over the full (unpaginated) filtered movement set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_in: i64,
    pub total_out: i64,
    pub total_value_in: Decimal,
    pub total_value_out: Decimal,
    pub entry_count: u64,
    pub average_quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLedger {
    pub opening_balance: i32,
    pub entries: Vec<LedgerEntry>,
    pub stats: LedgerStats,
}

/// Rebuilds the movement history ("stock card") for one item by merging
/// settled movements from all four document kinds into a single running
/// balance sequence.
#[derive(Clone)]
pub struct StockLedgerService {
    db_pool: Arc<DbPool>,
}

impl StockLedgerService {
    /// Creates a new stock ledger service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn get_ledger(&self, query: LedgerQuery) -> Result<StockLedger, ServiceError> {
        if let (Some(from), Some(to)) = (query.date_from, query.date_to) {
            if from > to {
                return Err(ServiceError::ValidationError(
                    "date_from must not be after date_to".to_string(),
                ));
            }
        }

        let db = self.db_pool.as_ref();

        item_master::Entity::find_by_id(query.item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", query.item_id)))?;

        let movements = self.collect_movements(&query).await?;

        // Opening balance: signed effect of everything strictly before the
        // range start. Movements past the range end are dropped entirely.
        let mut opening_balance = 0;
        let mut in_range = Vec::new();
        for movement in movements {
            if let Some(from) = query.date_from {
                if movement.entry_date < from {
                    opening_balance += movement.signed_quantity();
                    continue;
                }
            }
            if let Some(to) = query.date_to {
                if movement.entry_date > to {
                    continue;
                }
            }
            in_range.push(movement);
        }

        // Balances are attached under chronological order regardless of the
        // requested display sort.
        in_range.sort_by(|a, b| a.entry_date.cmp(&b.entry_date));
        let mut balance = opening_balance;
        for entry in &mut in_range {
            balance += entry.signed_quantity();
            entry.running_balance = balance;
        }

        let stats = compute_stats(&in_range);

        sort_entries(&mut in_range, query.sort_key, query.sort_desc);

        // Pagination comes last: balances and stats always reflect the whole
        // history, never a truncated page.
        let entries = paginate(in_range, query.offset, query.limit);

        Ok(StockLedger {
            opening_balance,
            entries,
            stats,
        })
    }

    /// Pulls every settled movement touching the item, one query pair per
    /// document kind, joined in memory. Draft documents, dropship lines and
    /// custom lines never appear: none of them moved warehouse stock.
    async fn collect_movements(
        &self,
        query: &LedgerQuery,
    ) -> Result<Vec<LedgerEntry>, ServiceError> {
        let db = self.db_pool.as_ref();
        let mut movements: Vec<(LedgerEntry, Counterpart)> = Vec::new();

        // Incoming goods receipts (+)
        let receipt_lines = goods_receipt_line::Entity::find()
            .filter(goods_receipt_line::Column::ItemId.eq(query.item_id))
            .order_by_asc(goods_receipt_line::Column::CreatedAt)
            .order_by_asc(goods_receipt_line::Column::LineNo)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        if !receipt_lines.is_empty() {
            let header_ids: Vec<Uuid> =
                receipt_lines.iter().map(|l| l.goods_receipt_id).collect();
            let mut headers = goods_receipt::Entity::find()
                .filter(goods_receipt::Column::Id.is_in(header_ids))
                .filter(goods_receipt::Column::Status.eq(ReceiptStatus::Received));
            if let Some(warehouse_id) = query.warehouse_id {
                headers = headers.filter(goods_receipt::Column::WarehouseId.eq(warehouse_id));
            }
            let headers: HashMap<Uuid, goods_receipt::Model> = headers
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|h| (h.id, h))
                .collect();

            for line in receipt_lines {
                if let Some(header) = headers.get(&line.goods_receipt_id) {
                    movements.push(raw_entry(
                        header.receipt_date,
                        MovementDirection::In,
                        DocumentKind::GoodsReceipt,
                        header.id,
                        header.receipt_number.clone(),
                        line.quantity,
                        line.unit_price,
                        Counterpart::Supplier(header.supplier_id),
                    ));
                }
            }
        }

        // Outgoing delivery notes (-): stock-sourced shipped lines of posted
        // documents only.
        let delivery_lines = delivery_note_line::Entity::find()
            .filter(delivery_note_line::Column::ItemId.eq(query.item_id))
            .filter(delivery_note_line::Column::Sourcing.eq(LineSourcing::Stock))
            .filter(delivery_note_line::Column::PostedAt.is_not_null())
            .order_by_asc(delivery_note_line::Column::CreatedAt)
            .order_by_asc(delivery_note_line::Column::LineNo)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        if !delivery_lines.is_empty() {
            let header_ids: Vec<Uuid> =
                delivery_lines.iter().map(|l| l.delivery_note_id).collect();
            let mut headers = delivery_note::Entity::find()
                .filter(delivery_note::Column::Id.is_in(header_ids))
                .filter(delivery_note::Column::Status.is_in([
                    DeliveryStatus::InTransit,
                    DeliveryStatus::Delivered,
                ]));
            if let Some(warehouse_id) = query.warehouse_id {
                headers = headers.filter(delivery_note::Column::WarehouseId.eq(warehouse_id));
            }
            let headers: HashMap<Uuid, delivery_note::Model> = headers
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|h| (h.id, h))
                .collect();

            for line in delivery_lines {
                if let Some(header) = headers.get(&line.delivery_note_id) {
                    movements.push(raw_entry(
                        header.document_date,
                        MovementDirection::Out,
                        DocumentKind::DeliveryNote,
                        header.id,
                        header.document_number.clone(),
                        line.quantity,
                        line.unit_price,
                        Counterpart::Customer(header.customer_id),
                    ));
                }
            }
        }

        // Purchase returns back to suppliers (-)
        let purchase_return_lines = purchase_return_line::Entity::find()
            .filter(purchase_return_line::Column::ItemId.eq(query.item_id))
            .order_by_asc(purchase_return_line::Column::CreatedAt)
            .order_by_asc(purchase_return_line::Column::LineNo)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        if !purchase_return_lines.is_empty() {
            let header_ids: Vec<Uuid> = purchase_return_lines
                .iter()
                .map(|l| l.purchase_return_id)
                .collect();
            let mut headers = purchase_return::Entity::find()
                .filter(purchase_return::Column::Id.is_in(header_ids))
                .filter(purchase_return::Column::Status.eq(PurchaseReturnStatus::Settled));
            if let Some(warehouse_id) = query.warehouse_id {
                headers = headers.filter(purchase_return::Column::WarehouseId.eq(warehouse_id));
            }
            let headers: HashMap<Uuid, purchase_return::Model> = headers
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|h| (h.id, h))
                .collect();

            for line in purchase_return_lines {
                if let Some(header) = headers.get(&line.purchase_return_id) {
                    movements.push(raw_entry(
                        header.return_date,
                        MovementDirection::Out,
                        DocumentKind::PurchaseReturn,
                        header.id,
                        header.return_number.clone(),
                        line.quantity,
                        line.unit_price,
                        Counterpart::Supplier(header.supplier_id),
                    ));
                }
            }
        }

        // Sales returns from customers (+)
        let sales_return_lines = sales_return_line::Entity::find()
            .filter(sales_return_line::Column::ItemId.eq(query.item_id))
            .order_by_asc(sales_return_line::Column::CreatedAt)
            .order_by_asc(sales_return_line::Column::LineNo)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        if !sales_return_lines.is_empty() {
            let header_ids: Vec<Uuid> = sales_return_lines
                .iter()
                .map(|l| l.sales_return_id)
                .collect();
            let mut headers = sales_return::Entity::find()
                .filter(sales_return::Column::Id.is_in(header_ids))
                .filter(sales_return::Column::Status.eq(SalesReturnStatus::Settled));
            if let Some(warehouse_id) = query.warehouse_id {
                headers = headers.filter(sales_return::Column::WarehouseId.eq(warehouse_id));
            }
            let headers: HashMap<Uuid, sales_return::Model> = headers
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|h| (h.id, h))
                .collect();

            for line in sales_return_lines {
                if let Some(header) = headers.get(&line.sales_return_id) {
                    movements.push(raw_entry(
                        header.return_date,
                        MovementDirection::In,
                        DocumentKind::SalesReturn,
                        header.id,
                        header.return_number.clone(),
                        line.quantity,
                        line.unit_price,
                        Counterpart::Customer(header.customer_id),
                    ));
                }
            }
        }

        self.resolve_counterpart_names(movements).await
    }

    async fn resolve_counterpart_names(
        &self,
        movements: Vec<(LedgerEntry, Counterpart)>,
    ) -> Result<Vec<LedgerEntry>, ServiceError> {
        let db = self.db_pool.as_ref();

        let supplier_ids: Vec<Uuid> = movements
            .iter()
            .filter_map(|(_, c)| match c {
                Counterpart::Supplier(id) => Some(*id),
                Counterpart::Customer(_) => None,
            })
            .collect();
        let customer_ids: Vec<Uuid> = movements
            .iter()
            .filter_map(|(_, c)| match c {
                Counterpart::Customer(id) => Some(*id),
                Counterpart::Supplier(_) => None,
            })
            .collect();

        let suppliers: HashMap<Uuid, String> = if supplier_ids.is_empty() {
            HashMap::new()
        } else {
            supplier::Entity::find()
                .filter(supplier::Column::Id.is_in(supplier_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|s| (s.id, s.name))
                .collect()
        };
        let customers: HashMap<Uuid, String> = if customer_ids.is_empty() {
            HashMap::new()
        } else {
            customer::Entity::find()
                .filter(customer::Column::Id.is_in(customer_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect()
        };

        Ok(movements
            .into_iter()
            .map(|(mut entry, counterpart)| {
                entry.counterpart_name = match counterpart {
                    Counterpart::Supplier(id) => {
                        suppliers.get(&id).cloned().unwrap_or_else(|| id.to_string())
                    }
                    Counterpart::Customer(id) => {
                        customers.get(&id).cloned().unwrap_or_else(|| id.to_string())
                    }
                };
                entry
            })
            .collect())
    }
}

enum Counterpart {
    Supplier(Uuid),
    Customer(Uuid),
}

#[allow(clippy::too_many_arguments)]
fn raw_entry(
    entry_date: DateTime<Utc>,
    direction: MovementDirection,
    document_kind: DocumentKind,
    document_id: Uuid,
    document_number: String,
    quantity: i32,
    unit_price: Decimal,
    counterpart: Counterpart,
) -> (LedgerEntry, Counterpart) {
    (
        LedgerEntry {
            entry_date,
            direction,
            document_kind,
            document_id,
            document_number,
            quantity,
            unit_price,
            running_balance: 0,
            counterpart_name: String::new(),
        },
        counterpart,
    )
}

/// Stable display sort: equal keys keep their chronological order, so
/// repeated queries never reorder ties.
fn sort_entries(entries: &mut [LedgerEntry], key: LedgerSortKey, descending: bool) {
    entries.sort_by(|a, b| {
        let ordering = match key {
            LedgerSortKey::TransactionDate => a.entry_date.cmp(&b.entry_date),
            LedgerSortKey::DocumentKind => {
                a.document_kind.to_string().cmp(&b.document_kind.to_string())
            }
            LedgerSortKey::Quantity => a.quantity.cmp(&b.quantity),
            LedgerSortKey::Balance => a.running_balance.cmp(&b.running_balance),
        };
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn compute_stats(entries: &[LedgerEntry]) -> LedgerStats {
    let mut total_in: i64 = 0;
    let mut total_out: i64 = 0;
    let mut total_value_in = Decimal::ZERO;
    let mut total_value_out = Decimal::ZERO;

    for entry in entries {
        let value = entry.unit_price * Decimal::from(entry.quantity);
        match entry.direction {
            MovementDirection::In => {
                total_in += i64::from(entry.quantity);
                total_value_in += value;
            }
            MovementDirection::Out => {
                total_out += i64::from(entry.quantity);
                total_value_out += value;
            }
        }
    }

    let entry_count = entries.len() as u64;
    let average_quantity = if entry_count == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(total_in + total_out) / Decimal::from(entry_count)
    };

    LedgerStats {
        total_in,
        total_out,
        total_value_in,
        total_value_out,
        entry_count,
        average_quantity,
    }
}

fn paginate(entries: Vec<LedgerEntry>, offset: Option<u64>, limit: Option<u64>) -> Vec<LedgerEntry> {
    let skip = offset.unwrap_or(0) as usize;
    let take = limit.map(|l| l as usize).unwrap_or(usize::MAX);
    entries.into_iter().skip(skip).take(take).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn entry(
        day: u32,
        direction: MovementDirection,
        kind: DocumentKind,
        quantity: i32,
        balance: i32,
    ) -> LedgerEntry {
        LedgerEntry {
            entry_date: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            direction,
            document_kind: kind,
            document_id: Uuid::new_v4(),
            document_number: format!("DOC-{day}"),
            quantity,
            unit_price: dec!(10.00),
            running_balance: balance,
            counterpart_name: "ACME".to_string(),
        }
    }

    #[test]
    fn quantity_sort_keeps_chronological_balances() {
        let mut entries = vec![
            entry(1, MovementDirection::In, DocumentKind::GoodsReceipt, 10, 10),
            entry(2, MovementDirection::Out, DocumentKind::DeliveryNote, 3, 7),
            entry(3, MovementDirection::In, DocumentKind::SalesReturn, 5, 12),
        ];

        sort_entries(&mut entries, LedgerSortKey::Quantity, true);

        assert_eq!(entries[0].quantity, 10);
        assert_eq!(entries[1].quantity, 5);
        assert_eq!(entries[2].quantity, 3);
        // Balances stay as computed under date order.
        assert_eq!(entries[0].running_balance, 10);
        assert_eq!(entries[1].running_balance, 12);
        assert_eq!(entries[2].running_balance, 7);
    }

    #[test]
    fn equal_sort_keys_keep_original_order() {
        let mut entries = vec![
            entry(1, MovementDirection::In, DocumentKind::GoodsReceipt, 4, 4),
            entry(2, MovementDirection::Out, DocumentKind::DeliveryNote, 4, 0),
        ];

        sort_entries(&mut entries, LedgerSortKey::Quantity, false);

        assert_eq!(entries[0].document_number, "DOC-1");
        assert_eq!(entries[1].document_number, "DOC-2");
    }

    #[test]
    fn stats_accumulate_directional_totals() {
        let entries = vec![
            entry(1, MovementDirection::In, DocumentKind::GoodsReceipt, 10, 10),
            entry(2, MovementDirection::Out, DocumentKind::DeliveryNote, 4, 6),
            entry(3, MovementDirection::Out, DocumentKind::PurchaseReturn, 2, 4),
        ];

        let stats = compute_stats(&entries);

        assert_eq!(stats.total_in, 10);
        assert_eq!(stats.total_out, 6);
        assert_eq!(stats.total_value_in, dec!(100.00));
        assert_eq!(stats.total_value_out, dec!(60.00));
        assert_eq!(stats.entry_count, 3);
        assert_eq!(stats.average_quantity, Decimal::from(16) / Decimal::from(3));
    }

    #[test]
    fn pagination_slices_after_the_fact() {
        let entries = vec![
            entry(1, MovementDirection::In, DocumentKind::GoodsReceipt, 1, 1),
            entry(2, MovementDirection::In, DocumentKind::GoodsReceipt, 2, 3),
            entry(3, MovementDirection::In, DocumentKind::GoodsReceipt, 3, 6),
        ];

        let page = paginate(entries, Some(1), Some(1));

        assert_eq!(page.len(), 1);
        assert_eq!(page[0].document_number, "DOC-2");
        // The balance of a later page still reflects the earlier rows.
        assert_eq!(page[0].running_balance, 3);
    }
}
