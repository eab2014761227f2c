mod common;

use assert_matches::assert_matches;
use fulfillment_core::entities::delivery_note::DeliveryStatus;
use fulfillment_core::entities::delivery_note_line::{DropshipStatus, LineSourcing};
use fulfillment_core::errors::ServiceError;
use fulfillment_core::prelude::*;
use fulfillment_core::services::delivery_notes::NewDeliveryLine;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn stock_line(item_id: Uuid, quantity: i32) -> NewDeliveryLine {
    NewDeliveryLine {
        item_id: Some(item_id),
        description: None,
        quantity,
        unit_price: dec!(50.00),
    }
}

fn custom_line(description: &str, quantity: i32) -> NewDeliveryLine {
    NewDeliveryLine {
        item_id: None,
        description: Some(description.to_string()),
        quantity,
        unit_price: dec!(15.00),
    }
}

struct Fixture {
    services: AppServices,
    db: std::sync::Arc<DbPool>,
    warehouse_id: Uuid,
    customer_id: Uuid,
}

async fn fixture() -> Fixture {
    let (db, events) = common::setup().await;
    let services = AppServices::new(db.clone(), events);
    let warehouse_id = common::seed_warehouse(&db, "MAIN").await;
    let customer_id = common::seed_customer(&db, "PT Maju Jaya").await;
    Fixture {
        services,
        db,
        warehouse_id,
        customer_id,
    }
}

impl Fixture {
    async fn create_note(&self, number: &str, lines: Vec<NewDeliveryLine>) -> Uuid {
        self.services
            .delivery_notes
            .create_delivery_note(CreateDeliveryNoteCommand {
                document_number: number.to_string(),
                document_date: common::date(2024, 5, 10),
                warehouse_id: self.warehouse_id,
                customer_id: self.customer_id,
                lines,
            })
            .await
            .expect("create delivery note")
            .note
            .id
    }
}

// 5 on hand, 3 requested: ships from stock and leaves 2.
#[tokio::test]
async fn stock_backed_line_posts_and_decrements() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-X", 0, false).await;
    common::seed_stock(&fx.db, item, fx.warehouse_id, 5).await;

    let note_id = fx.create_note("DN-001", vec![stock_line(item, 3)]).await;

    let result = fx
        .services
        .posting
        .post_delivery_note(note_id, PostingMode::Complete)
        .await
        .expect("post");

    assert_eq!(result.status, DeliveryStatus::InTransit);
    assert_eq!(result.shipped.len(), 1);
    assert_eq!(result.shipped[0].previous_qty, 5);
    assert_eq!(result.shipped[0].new_qty, 2);
    assert_eq!(result.shipped[0].quantity_shipped, 3);
    assert!(result.pending_line_ids.is_empty());
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 2);
}

// 0 on hand with one preferred offer: resolves to dropship pending, and
// complete-mode posting stays blocked until the dropship is received.
#[tokio::test]
async fn dropship_line_blocks_complete_post_until_received() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-Y", 0, true).await;
    let supplier = common::seed_supplier(&fx.db, "Dropship Co").await;
    common::seed_offer(&fx.db, item, supplier, dec!(100.00), 2, true).await;

    let detail = fx
        .services
        .delivery_notes
        .create_delivery_note(CreateDeliveryNoteCommand {
            document_number: "DN-002".to_string(),
            document_date: common::date(2024, 5, 10),
            warehouse_id: fx.warehouse_id,
            customer_id: fx.customer_id,
            lines: vec![stock_line(item, 2)],
        })
        .await
        .expect("create");

    assert_matches!(
        detail.decisions[0].decision,
        SourcingDecision::Dropship { supplier_id, .. } if supplier_id == supplier
    );
    let line = &detail.lines[0];
    assert_eq!(line.sourcing, LineSourcing::Dropship);
    assert_eq!(line.dropship_status, Some(DropshipStatus::Pending));

    let err = fx
        .services
        .posting
        .post_delivery_note(detail.note.id, PostingMode::Complete)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock { .. });

    fx.services
        .delivery_notes
        .advance_dropship_status(detail.note.id, line.id, DropshipStatus::Ordered)
        .await
        .expect("advance to ordered");
    fx.services
        .delivery_notes
        .advance_dropship_status(detail.note.id, line.id, DropshipStatus::Received)
        .await
        .expect("advance to received");

    let result = fx
        .services
        .posting
        .post_delivery_note(detail.note.id, PostingMode::Complete)
        .await
        .expect("post after receipt");
    assert_eq!(result.status, DeliveryStatus::InTransit);
    // Dropship lines never touch warehouse stock.
    assert!(result.shipped.is_empty());
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 0);
}

// 0 on hand and zero offers: creation succeeds, posting always fails
// with the distinct no-supplier error.
#[tokio::test]
async fn shortfall_without_suppliers_posts_as_no_supplier_available() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-Z", 0, true).await;

    let detail = fx
        .services
        .delivery_notes
        .create_delivery_note(CreateDeliveryNoteCommand {
            document_number: "DN-003".to_string(),
            document_date: common::date(2024, 5, 10),
            warehouse_id: fx.warehouse_id,
            customer_id: fx.customer_id,
            lines: vec![stock_line(item, 4)],
        })
        .await
        .expect("creation still succeeds");

    assert_matches!(
        detail.decisions[0].decision,
        SourcingDecision::CannotFulfill {
            available: 0,
            shortage: 4
        }
    );

    let err = fx
        .services
        .posting
        .post_delivery_note(detail.note.id, PostingMode::Complete)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::NoSupplierAvailable { item_id, shortage: 4 } if item_id == item
    );
}

// Mixed document in partial mode ships only the ready stock line; the
// pending dropship line stays attached.
#[tokio::test]
async fn partial_post_ships_ready_subset_only() {
    let fx = fixture().await;
    let stocked = common::seed_item(&fx.db, "SKU-S", 0, false).await;
    common::seed_stock(&fx.db, stocked, fx.warehouse_id, 10).await;
    let dropshipped = common::seed_item(&fx.db, "SKU-D", 0, true).await;
    let supplier = common::seed_supplier(&fx.db, "Dropship Co").await;
    common::seed_offer(&fx.db, dropshipped, supplier, dec!(30.00), 4, true).await;

    let note_id = fx
        .create_note(
            "DN-004",
            vec![stock_line(stocked, 4), stock_line(dropshipped, 2)],
        )
        .await;

    let result = fx
        .services
        .posting
        .post_delivery_note(note_id, PostingMode::Partial)
        .await
        .expect("partial post");

    assert_eq!(result.status, DeliveryStatus::InTransit);
    assert_eq!(result.shipped.len(), 1);
    assert_eq!(result.shipped[0].item_id, stocked);
    assert_eq!(result.pending_line_ids.len(), 1);
    assert_eq!(common::stock_qty(&fx.db, stocked, fx.warehouse_id).await, 6);
    assert_eq!(
        common::stock_qty(&fx.db, dropshipped, fx.warehouse_id).await,
        0
    );

    let lines = fx
        .services
        .delivery_notes
        .get_delivery_note(note_id)
        .await
        .expect("reload")
        .lines;
    let pending = lines.iter().find(|l| !l.is_posted()).expect("pending line");
    assert_eq!(pending.sourcing, LineSourcing::Dropship);
}

// A complete-mode abort leaves every stock row untouched.
#[tokio::test]
async fn complete_mode_abort_leaves_stock_unchanged() {
    let fx = fixture().await;
    let covered = common::seed_item(&fx.db, "SKU-OK", 0, false).await;
    common::seed_stock(&fx.db, covered, fx.warehouse_id, 8).await;
    let short = common::seed_item(&fx.db, "SKU-SHORT", 0, true).await;
    common::seed_stock(&fx.db, short, fx.warehouse_id, 1).await;
    let supplier = common::seed_supplier(&fx.db, "Fallback Co").await;
    common::seed_offer(&fx.db, short, supplier, dec!(20.00), 2, false).await;

    let note_id = fx
        .create_note("DN-005", vec![stock_line(covered, 5), stock_line(short, 6)])
        .await;

    // Stock of the short item moved between creation and posting.
    // (Seeded at 1; request is 6.)
    let err = fx
        .services
        .posting
        .post_delivery_note(note_id, PostingMode::Complete)
        .await
        .unwrap_err();

    match err {
        ServiceError::InsufficientStock { shortfalls, .. } => {
            assert_eq!(shortfalls.len(), 1);
            assert_eq!(shortfalls[0].item_id, short);
            assert_eq!(shortfalls[0].requested, 6);
            assert_eq!(shortfalls[0].available, 1);
            assert_eq!(shortfalls[0].shortage, 5);
            // Actionable detail: the candidate supplier to switch to.
            assert_eq!(shortfalls[0].candidates.len(), 1);
            assert_eq!(shortfalls[0].candidates[0].supplier_id, supplier);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Snapshot diff: nothing moved, including the fully covered line.
    assert_eq!(common::stock_qty(&fx.db, covered, fx.warehouse_id).await, 8);
    assert_eq!(common::stock_qty(&fx.db, short, fx.warehouse_id).await, 1);

    let note = fx
        .services
        .delivery_notes
        .get_delivery_note(note_id)
        .await
        .expect("reload")
        .note;
    assert_eq!(note.status, DeliveryStatus::Draft);
}

#[tokio::test]
async fn partial_post_with_zero_ready_lines_is_rejected() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-N", 0, true).await;
    let supplier = common::seed_supplier(&fx.db, "Slow Co").await;
    common::seed_offer(&fx.db, item, supplier, dec!(10.00), 9, false).await;

    let note_id = fx.create_note("DN-006", vec![stock_line(item, 3)]).await;

    let err = fx
        .services
        .posting
        .post_delivery_note(note_id, PostingMode::Partial)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn posting_is_draft_only_and_delivery_advances_once() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-L", 0, false).await;
    common::seed_stock(&fx.db, item, fx.warehouse_id, 5).await;

    let note_id = fx.create_note("DN-007", vec![stock_line(item, 1)]).await;

    fx.services
        .posting
        .post_delivery_note(note_id, PostingMode::Complete)
        .await
        .expect("first post");

    let err = fx
        .services
        .posting
        .post_delivery_note(note_id, PostingMode::Complete)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));

    let note = fx
        .services
        .delivery_notes
        .advance_delivery(note_id)
        .await
        .expect("deliver");
    assert_eq!(note.status, DeliveryStatus::Delivered);
    assert!(note.delivered_at.is_some());
    // Delivery is a flag advance; stock does not move again.
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 4);

    // Terminal: no further transitions.
    let err = fx
        .services
        .delivery_notes
        .advance_delivery(note_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
    let err = fx
        .services
        .delivery_notes
        .cancel_delivery_note(note_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn draft_cancellation_never_touches_stock() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-CXL", 0, false).await;
    common::seed_stock(&fx.db, item, fx.warehouse_id, 9).await;

    let note_id = fx.create_note("DN-008", vec![stock_line(item, 4)]).await;

    let note = fx
        .services
        .delivery_notes
        .cancel_delivery_note(note_id)
        .await
        .expect("cancel draft");

    assert_eq!(note.status, DeliveryStatus::Cancelled);
    assert!(note.cancelled_at.is_some());
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 9);
}

#[tokio::test]
async fn in_transit_cancellation_restores_posted_stock() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-RST", 0, false).await;
    common::seed_stock(&fx.db, item, fx.warehouse_id, 7).await;

    let note_id = fx.create_note("DN-009", vec![stock_line(item, 5)]).await;
    fx.services
        .posting
        .post_delivery_note(note_id, PostingMode::Complete)
        .await
        .expect("post");
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 2);

    let note = fx
        .services
        .delivery_notes
        .cancel_delivery_note(note_id)
        .await
        .expect("cancel in transit");

    assert_eq!(note.status, DeliveryStatus::Cancelled);
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 7);
}

#[tokio::test]
async fn cancellation_blocked_by_settled_sales_return() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-REF", 0, false).await;
    common::seed_stock(&fx.db, item, fx.warehouse_id, 5).await;

    let note_id = fx.create_note("DN-010", vec![stock_line(item, 2)]).await;
    fx.services
        .posting
        .post_delivery_note(note_id, PostingMode::Complete)
        .await
        .expect("post");

    let sales_return = fx
        .services
        .returns
        .create_sales_return(CreateSalesReturnCommand {
            return_number: "SR-001".to_string(),
            return_date: common::date(2024, 5, 12),
            warehouse_id: fx.warehouse_id,
            customer_id: fx.customer_id,
            delivery_note_id: Some(note_id),
            lines: vec![fulfillment_core::services::returns::NewReturnLine {
                item_id: item,
                quantity: 1,
                unit_price: dec!(50.00),
            }],
        })
        .await
        .expect("create sales return");
    fx.services
        .returns
        .settle_sales_return(sales_return.id)
        .await
        .expect("settle");

    let err = fx
        .services
        .delivery_notes
        .cancel_delivery_note(note_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn dropship_status_only_moves_forward() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-FWD", 0, true).await;
    let supplier = common::seed_supplier(&fx.db, "Dropship Co").await;
    common::seed_offer(&fx.db, item, supplier, dec!(40.00), 1, true).await;

    let detail = fx
        .services
        .delivery_notes
        .create_delivery_note(CreateDeliveryNoteCommand {
            document_number: "DN-011".to_string(),
            document_date: common::date(2024, 5, 10),
            warehouse_id: fx.warehouse_id,
            customer_id: fx.customer_id,
            lines: vec![stock_line(item, 1)],
        })
        .await
        .expect("create");
    let line_id = detail.lines[0].id;

    fx.services
        .delivery_notes
        .advance_dropship_status(detail.note.id, line_id, DropshipStatus::Received)
        .await
        .expect("pending -> received is a forward jump");

    let err = fx
        .services
        .delivery_notes
        .advance_dropship_status(detail.note.id, line_id, DropshipStatus::Ordered)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn custom_lines_always_ship_without_stock_effect() {
    let fx = fixture().await;

    let note_id = fx
        .create_note("DN-012", vec![custom_line("Crating + freight", 1)])
        .await;

    let result = fx
        .services
        .posting
        .post_delivery_note(note_id, PostingMode::Complete)
        .await
        .expect("post custom-only document");

    assert_eq!(result.status, DeliveryStatus::InTransit);
    assert!(result.shipped.is_empty());
    assert!(result.pending_line_ids.is_empty());
}

#[tokio::test]
async fn malformed_lines_are_rejected_before_any_lookup() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-V", 0, false).await;

    // Both item and description on one line.
    let err = fx
        .services
        .delivery_notes
        .create_delivery_note(CreateDeliveryNoteCommand {
            document_number: "DN-013".to_string(),
            document_date: common::date(2024, 5, 10),
            warehouse_id: fx.warehouse_id,
            customer_id: fx.customer_id,
            lines: vec![NewDeliveryLine {
                item_id: Some(item),
                description: Some("also custom".to_string()),
                quantity: 1,
                unit_price: dec!(1.00),
            }],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Empty line list.
    let err = fx
        .services
        .delivery_notes
        .create_delivery_note(CreateDeliveryNoteCommand {
            document_number: "DN-014".to_string(),
            document_date: common::date(2024, 5, 10),
            warehouse_id: fx.warehouse_id,
            customer_id: fx.customer_id,
            lines: vec![],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn draft_lines_can_be_replaced_but_freeze_after_posting() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-UPD", 0, false).await;
    common::seed_stock(&fx.db, item, fx.warehouse_id, 10).await;

    let note_id = fx.create_note("DN-015", vec![stock_line(item, 2)]).await;

    let detail = fx
        .services
        .delivery_notes
        .update_lines(note_id, vec![stock_line(item, 6)])
        .await
        .expect("replace draft lines");
    assert_eq!(detail.lines.len(), 1);
    assert_eq!(detail.lines[0].quantity, 6);

    fx.services
        .posting
        .post_delivery_note(note_id, PostingMode::Complete)
        .await
        .expect("post");

    let err = fx
        .services
        .delivery_notes
        .update_lines(note_id, vec![stock_line(item, 1)])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}
