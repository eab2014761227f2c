mod common;

use assert_matches::assert_matches;
use fulfillment_core::errors::ServiceError;
use fulfillment_core::prelude::*;
use fulfillment_core::services::returns::NewReturnLine;
use rust_decimal_macros::dec;
use uuid::Uuid;

struct Fixture {
    services: AppServices,
    db: std::sync::Arc<DbPool>,
    warehouse_id: Uuid,
    customer_id: Uuid,
    supplier_id: Uuid,
}

async fn fixture() -> Fixture {
    let (db, events) = common::setup().await;
    let services = AppServices::new(db.clone(), events);
    let warehouse_id = common::seed_warehouse(&db, "MAIN").await;
    let customer_id = common::seed_customer(&db, "Toko Baru").await;
    let supplier_id = common::seed_supplier(&db, "PT Pemasok").await;
    Fixture {
        services,
        db,
        warehouse_id,
        customer_id,
        supplier_id,
    }
}

fn line(item_id: Uuid, quantity: i32) -> NewReturnLine {
    NewReturnLine {
        item_id,
        quantity,
        unit_price: dec!(12.00),
    }
}

#[tokio::test]
async fn goods_receipt_creates_stock_row_lazily() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-NEW", 0, false).await;
    // No stock row exists yet for this (item, warehouse) pair.
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 0);

    let receipt = fx
        .services
        .receiving
        .create_goods_receipt(CreateGoodsReceiptCommand {
            receipt_number: "GR-LAZY".to_string(),
            receipt_date: common::date(2024, 6, 1),
            warehouse_id: fx.warehouse_id,
            supplier_id: fx.supplier_id,
            lines: vec![fulfillment_core::services::receiving::NewReceiptLine {
                item_id: item,
                quantity: 12,
                unit_price: dec!(8.00),
            }],
        })
        .await
        .expect("create");

    let result = fx
        .services
        .receiving
        .post_goods_receipt(receipt.receipt.id)
        .await
        .expect("post");

    assert_eq!(result.mutations.len(), 1);
    assert_eq!(result.mutations[0].previous_quantity, 0);
    assert_eq!(result.mutations[0].new_quantity, 12);
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 12);

    // Settled documents cannot settle twice.
    let err = fx
        .services
        .receiving
        .post_goods_receipt(receipt.receipt.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn purchase_return_decrements_settled_stock() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-PR", 0, false).await;
    common::seed_stock(&fx.db, item, fx.warehouse_id, 10).await;

    let document = fx
        .services
        .returns
        .create_purchase_return(CreatePurchaseReturnCommand {
            return_number: "PR-OK".to_string(),
            return_date: common::date(2024, 6, 2),
            warehouse_id: fx.warehouse_id,
            supplier_id: fx.supplier_id,
            lines: vec![line(item, 4)],
        })
        .await
        .expect("create");

    // Draft returns have no stock effect.
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 10);

    let result = fx
        .services
        .returns
        .settle_purchase_return(document.id)
        .await
        .expect("settle");

    assert_eq!(result.mutations[0].previous_quantity, 10);
    assert_eq!(result.mutations[0].new_quantity, 6);
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 6);
}

#[tokio::test]
async fn purchase_return_without_stock_row_is_rejected() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-NOROW", 0, false).await;
    // No stock row for this pair; the settlement must not drive the
    // quantity negative or fall back to another warehouse.

    let document = fx
        .services
        .returns
        .create_purchase_return(CreatePurchaseReturnCommand {
            return_number: "PR-NOROW".to_string(),
            return_date: common::date(2024, 6, 3),
            warehouse_id: fx.warehouse_id,
            supplier_id: fx.supplier_id,
            lines: vec![line(item, 1)],
        })
        .await
        .expect("create");

    let err = fx
        .services
        .returns
        .settle_purchase_return(document.id)
        .await
        .unwrap_err();

    match err {
        ServiceError::InsufficientStock { shortfalls, .. } => {
            assert_eq!(shortfalls[0].available, 0);
            assert_eq!(shortfalls[0].shortage, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 0);
}

#[tokio::test]
async fn partial_shortage_rolls_back_the_whole_settlement() {
    let fx = fixture().await;
    let covered = common::seed_item(&fx.db, "SKU-COV", 0, false).await;
    let short = common::seed_item(&fx.db, "SKU-SHORT", 0, false).await;
    common::seed_stock(&fx.db, covered, fx.warehouse_id, 10).await;
    common::seed_stock(&fx.db, short, fx.warehouse_id, 1).await;

    let document = fx
        .services
        .returns
        .create_purchase_return(CreatePurchaseReturnCommand {
            return_number: "PR-MIX".to_string(),
            return_date: common::date(2024, 6, 4),
            warehouse_id: fx.warehouse_id,
            supplier_id: fx.supplier_id,
            lines: vec![line(covered, 5), line(short, 3)],
        })
        .await
        .expect("create");

    let err = fx
        .services
        .returns
        .settle_purchase_return(document.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock { .. });

    // First line's decrement rolled back with the failed second line.
    assert_eq!(common::stock_qty(&fx.db, covered, fx.warehouse_id).await, 10);
    assert_eq!(common::stock_qty(&fx.db, short, fx.warehouse_id).await, 1);
}

#[tokio::test]
async fn sales_return_increments_and_requires_existing_delivery_note() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-SRET", 0, false).await;

    // Dangling delivery note reference is rejected up front.
    let err = fx
        .services
        .returns
        .create_sales_return(CreateSalesReturnCommand {
            return_number: "SR-DANGLING".to_string(),
            return_date: common::date(2024, 6, 5),
            warehouse_id: fx.warehouse_id,
            customer_id: fx.customer_id,
            delivery_note_id: Some(Uuid::new_v4()),
            lines: vec![line(item, 1)],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let document = fx
        .services
        .returns
        .create_sales_return(CreateSalesReturnCommand {
            return_number: "SR-OK".to_string(),
            return_date: common::date(2024, 6, 5),
            warehouse_id: fx.warehouse_id,
            customer_id: fx.customer_id,
            delivery_note_id: None,
            lines: vec![line(item, 2)],
        })
        .await
        .expect("create");

    let result = fx
        .services
        .returns
        .settle_sales_return(document.id)
        .await
        .expect("settle");

    // Stock row created lazily by the incoming movement.
    assert_eq!(result.mutations[0].previous_quantity, 0);
    assert_eq!(result.mutations[0].new_quantity, 2);
    assert_eq!(common::stock_qty(&fx.db, item, fx.warehouse_id).await, 2);

    let err = fx
        .services
        .returns
        .settle_sales_return(document.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn return_commands_validate_lines_and_references() {
    let fx = fixture().await;
    let item = common::seed_item(&fx.db, "SKU-VAL", 0, false).await;

    let err = fx
        .services
        .returns
        .create_purchase_return(CreatePurchaseReturnCommand {
            return_number: "".to_string(),
            return_date: common::date(2024, 6, 6),
            warehouse_id: fx.warehouse_id,
            supplier_id: fx.supplier_id,
            lines: vec![line(item, 1)],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = fx
        .services
        .returns
        .create_purchase_return(CreatePurchaseReturnCommand {
            return_number: "PR-QTY".to_string(),
            return_date: common::date(2024, 6, 6),
            warehouse_id: fx.warehouse_id,
            supplier_id: fx.supplier_id,
            lines: vec![line(item, 0)],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = fx
        .services
        .returns
        .create_purchase_return(CreatePurchaseReturnCommand {
            return_number: "PR-WH".to_string(),
            return_date: common::date(2024, 6, 6),
            warehouse_id: Uuid::new_v4(),
            supplier_id: fx.supplier_id,
            lines: vec![line(item, 1)],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
