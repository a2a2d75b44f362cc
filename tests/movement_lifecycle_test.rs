//! Integration tests for the movement store: inbound receipts, deletion with
//! reversal rules, and origin-group read-back.

mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

use almacen_api::{
    entities::inbound_movement::Entity as InboundMovement,
    errors::ServiceError,
    services::allocation::{
        AllocationLine, AllocationPolicy, AllocationRequest, AllocationService,
    },
    services::movements::{CreateInboundRequest, InboundLineRequest, MovementService},
};

use common::{
    create_fund, create_product, dec, event_channel, fund_available, on_hand, product_status,
    setup_db,
};

fn receipt_line(product_id: Uuid, quantity: i32) -> InboundLineRequest {
    InboundLineRequest {
        product_id,
        quantity,
        unit_price: None,
        lot_number: None,
        expiration_date: None,
    }
}

fn receipt(lines: Vec<InboundLineRequest>) -> CreateInboundRequest {
    CreateInboundRequest {
        source_type: Some("compra".to_string()),
        supplier_reference: Some("OC-1042".to_string()),
        notes: None,
        lines,
    }
}

#[tokio::test]
async fn inbound_receipt_increments_stock_and_tracks_lots() {
    let db = setup_db().await;
    let (sender, _rx) = event_channel();
    let product = create_product(&db, "SKU-100", 5, dec(12)).await;

    let service = MovementService::new(db.clone(), sender, 10);
    let detail = service
        .create_inbound(receipt(vec![InboundLineRequest {
            product_id: product.id,
            quantity: 40,
            unit_price: Some(dec(11)),
            lot_number: Some("L-2025-07".to_string()),
            expiration_date: NaiveDate::from_ymd_opt(2027, 1, 31),
        }]))
        .await
        .expect("inbound creation failed");

    assert_eq!(detail.movement.folio, "1");
    assert_eq!(detail.movement.total_value, dec(40 * 11));
    assert_eq!(detail.lines.len(), 1);
    assert_eq!(detail.lines[0].remaining_quantity, 40);
    assert_eq!(detail.lines[0].lot_number.as_deref(), Some("L-2025-07"));

    assert_eq!(on_hand(&db, product.id).await, 45);
    assert_eq!(product_status(&db, product.id).await, "normal");
}

#[tokio::test]
async fn inbound_receipt_defaults_price_from_catalog() {
    let db = setup_db().await;
    let (sender, _rx) = event_channel();
    let product = create_product(&db, "SKU-101", 0, dec(7)).await;

    let service = MovementService::new(db.clone(), sender, 10);
    let detail = service
        .create_inbound(receipt(vec![receipt_line(product.id, 3)]))
        .await
        .expect("inbound creation failed");

    assert_eq!(detail.lines[0].unit_price, dec(7));
    assert_eq!(detail.movement.total_value, dec(21));
    // 3 on hand is at or below the threshold of 10
    assert_eq!(product_status(&db, product.id).await, "low");
}

#[tokio::test]
async fn inbound_receipt_rejects_unknown_product_and_bad_lines() {
    let db = setup_db().await;
    let (sender, _rx) = event_channel();
    let product = create_product(&db, "SKU-102", 0, dec(7)).await;
    let service = MovementService::new(db.clone(), sender, 10);

    let err = service
        .create_inbound(receipt(vec![receipt_line(Uuid::new_v4(), 3)]))
        .await
        .expect_err("unknown product must be rejected");
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = service
        .create_inbound(receipt(vec![]))
        .await
        .expect_err("empty receipt must be rejected");
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = service
        .create_inbound(receipt(vec![receipt_line(product.id, 0)]))
        .await
        .expect_err("zero quantity must be rejected");
    assert_matches!(err, ServiceError::ValidationError(_));

    assert_eq!(on_hand(&db, product.id).await, 0);
}

#[tokio::test]
async fn deleting_receipt_reverses_its_stock_increment() {
    let db = setup_db().await;
    let (sender, _rx) = event_channel();
    let product = create_product(&db, "SKU-103", 20, dec(9)).await;

    let service = MovementService::new(db.clone(), sender, 10);
    let detail = service
        .create_inbound(receipt(vec![receipt_line(product.id, 15)]))
        .await
        .expect("inbound creation failed");
    assert_eq!(on_hand(&db, product.id).await, 35);

    service
        .delete_inbound(detail.movement.id)
        .await
        .expect("deletion failed");

    assert_eq!(on_hand(&db, product.id).await, 20);
    let remaining = InboundMovement::find()
        .count(db.as_ref())
        .await
        .expect("count failed");
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn deleting_receipt_that_was_already_consumed_fails() {
    let db = setup_db().await;
    let (sender, _rx) = event_channel();
    let requester = Uuid::new_v4();
    let product = create_product(&db, "SKU-104", 0, dec(9)).await;
    create_fund(&db, requester, product.id, 50).await;

    let movement_service = MovementService::new(db.clone(), sender.clone(), 10);
    let detail = movement_service
        .create_inbound(receipt(vec![receipt_line(product.id, 10)]))
        .await
        .expect("inbound creation failed");
    assert_eq!(on_hand(&db, product.id).await, 10);

    // Withdraw 8 of the 10 received units, leaving 2 on hand
    let allocation_service = AllocationService::new(
        db.clone(),
        sender,
        AllocationPolicy {
            allow_requests_beyond_stock: false,
            low_stock_threshold: 10,
        },
    );
    allocation_service
        .allocate(AllocationRequest {
            requester_id: requester,
            reason: "Consumo de piso".to_string(),
            notes: None,
            lines: vec![AllocationLine {
                product_id: product.id,
                quantity: 8,
                unit_price: None,
            }],
        })
        .await
        .expect("allocation failed");
    assert_eq!(on_hand(&db, product.id).await, 2);

    // Reversing the receipt would leave the product at -8
    let err = movement_service
        .delete_inbound(detail.movement.id)
        .await
        .expect_err("deletion must fail when stock would go negative");
    assert_matches!(err, ServiceError::ValidationError(ref message) => {
        assert!(message.contains(&product.name), "message must name the product: {}", message);
    });

    // The receipt survives and stock is untouched
    assert!(InboundMovement::find_by_id(detail.movement.id)
        .one(db.as_ref())
        .await
        .expect("query failed")
        .is_some());
    assert_eq!(on_hand(&db, product.id).await, 2);
}

#[tokio::test]
async fn deleting_normal_suborder_restores_stock_and_fund() {
    let db = setup_db().await;
    let (sender, _rx) = event_channel();
    let requester = Uuid::new_v4();
    let product = create_product(&db, "SKU-105", 100, dec(9)).await;
    create_fund(&db, requester, product.id, 5).await;

    let allocation_service = AllocationService::new(
        db.clone(),
        sender.clone(),
        AllocationPolicy {
            allow_requests_beyond_stock: false,
            low_stock_threshold: 10,
        },
    );
    let result = allocation_service
        .allocate(AllocationRequest {
            requester_id: requester,
            reason: "Consumo de piso".to_string(),
            notes: None,
            lines: vec![AllocationLine {
                product_id: product.id,
                quantity: 8,
                unit_price: None,
            }],
        })
        .await
        .expect("allocation failed");
    assert_eq!(on_hand(&db, product.id).await, 92);
    assert_eq!(fund_available(&db, requester, product.id).await, 0);

    let movement_service = MovementService::new(db.clone(), sender, 10);

    // Normal sub-order: stock comes back and the fund is replenished
    movement_service
        .delete_outbound(result.movements.normal.unwrap())
        .await
        .expect("deletion failed");
    assert_eq!(on_hand(&db, product.id).await, 97);
    assert_eq!(fund_available(&db, requester, product.id).await, 5);

    // Voucher sub-order: stock comes back, the fund stays put
    movement_service
        .delete_outbound(result.movements.voucher.unwrap())
        .await
        .expect("deletion failed");
    assert_eq!(on_hand(&db, product.id).await, 100);
    assert_eq!(fund_available(&db, requester, product.id).await, 5);
}

#[tokio::test]
async fn deleting_pending_suborder_touches_no_ledger() {
    let db = setup_db().await;
    let (sender, _rx) = event_channel();
    let requester = Uuid::new_v4();
    let product = create_product(&db, "SKU-106", 10, dec(9)).await;

    let allocation_service = AllocationService::new(
        db.clone(),
        sender.clone(),
        AllocationPolicy {
            allow_requests_beyond_stock: false,
            low_stock_threshold: 10,
        },
    );
    let result = allocation_service
        .allocate(AllocationRequest {
            requester_id: requester,
            reason: "Consumo de piso".to_string(),
            notes: None,
            lines: vec![AllocationLine {
                product_id: product.id,
                quantity: 4,
                unit_price: None,
            }],
        })
        .await
        .expect("allocation failed");
    // No fund, policy off: everything pends, stock untouched
    assert_eq!(on_hand(&db, product.id).await, 10);
    let pending_id = result.movements.pending.expect("pending sub-order missing");

    let movement_service = MovementService::new(db.clone(), sender, 10);
    movement_service
        .delete_outbound(pending_id)
        .await
        .expect("deletion failed");
    assert_eq!(on_hand(&db, product.id).await, 10);
}

#[tokio::test]
async fn deleting_missing_movement_reports_not_found() {
    let db = setup_db().await;
    let (sender, _rx) = event_channel();
    let service = MovementService::new(db.clone(), sender, 10);

    let err = service
        .delete_outbound(Uuid::new_v4())
        .await
        .expect_err("missing movement must be NotFound");
    assert_matches!(err, ServiceError::NotFound(_));

    let err = service
        .delete_inbound(Uuid::new_v4())
        .await
        .expect_err("missing receipt must be NotFound");
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn origin_group_readback_requires_a_known_origin() {
    let db = setup_db().await;
    let (sender, _rx) = event_channel();
    let service = MovementService::new(db.clone(), sender, 10);

    let err = service
        .get_by_origin_id(Uuid::new_v4())
        .await
        .expect_err("unknown origin must be NotFound");
    assert_matches!(err, ServiceError::NotFound(_));
}
