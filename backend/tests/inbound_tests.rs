//! Inbound and returns tests
//!
//! Purchase order approval, partial and complete goods receipts, and the
//! gate that keeps returns closed until goods have shipped.

mod common;

use common::Site;
use rust_decimal::Decimal;
use shared::{
    DeliveryStatus, InspectionOutcome, MovementType, PurchaseOrderStatus, QualityStatus,
    ReceiptStatus, ReturnStatus, Role, SequenceKind,
};
use stockflow::error::AppError;
use stockflow::services::orders::{CreateOrderInput, OrderItemInput};
use stockflow::services::picking::AssignInput;
use stockflow::services::purchasing::{CreatePurchaseOrderInput, LineInput};
use stockflow::services::receiving::{CreateReceiptInput, ReceiveInput, ReceivedLineInput};
use stockflow::services::returns::{CreateReturnInput, InspectInput, RefundInput};
use stockflow::services::shipping::UpdateShipmentInput;
use stockflow::services::{
    GoodsReceiptService, OrderService, PackingService, PickingService, PurchaseOrderService,
    ReturnService, ShipmentService, StockService,
};
use stockflow::store::MovementFilter;
use uuid::Uuid;

// ============================================================================
// Helpers
// ============================================================================

async fn approved_po(site: &Site, quantity: i64) -> Uuid {
    let service = PurchaseOrderService::new(site.store());
    let po = service
        .create_purchase_order(
            &site.admin,
            CreatePurchaseOrderInput {
                supplier_id: Uuid::new_v4(),
                lines: vec![LineInput {
                    product_id: site.product.id,
                    quantity,
                    unit_price: Decimal::new(500, 2),
                }],
                expected_delivery: None,
                notes: None,
                submit: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(po.order.status, PurchaseOrderStatus::Pending);

    service
        .approve_purchase_order(&site.admin, po.order.id)
        .await
        .unwrap();
    po.order.id
}

fn received(product_id: Uuid, quantity: i64) -> ReceiveInput {
    ReceiveInput {
        lines: vec![ReceivedLineInput {
            line_id: None,
            product_id: Some(product_id),
            received_quantity: quantity,
            quality_status: QualityStatus::Good,
            notes: None,
        }],
        warehouse_id: None,
        location_id: None,
        notes: None,
    }
}

async fn available(site: &Site) -> i64 {
    StockService::new(site.store())
        .total_available(&site.admin, site.product.id, None)
        .await
        .unwrap()
        .available
}

// ============================================================================
// Purchase orders
// ============================================================================

#[tokio::test]
async fn purchase_order_totals_and_numbers() {
    let site = Site::new().await;
    let po = PurchaseOrderService::new(site.store())
        .create_purchase_order(
            &site.admin,
            CreatePurchaseOrderInput {
                supplier_id: Uuid::new_v4(),
                lines: vec![LineInput {
                    product_id: site.product.id,
                    quantity: 4,
                    unit_price: Decimal::new(250, 2),
                }],
                expected_delivery: None,
                notes: None,
                submit: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(po.order.po_number, "PO001");
    assert_eq!(po.order.status, PurchaseOrderStatus::Draft);
    assert_eq!(po.order.total_amount, Decimal::new(1000, 2));
}

#[tokio::test]
async fn purchase_orders_list_in_number_order_past_999() {
    let site = Site::new().await;
    approved_po(&site, 1).await;
    site.store
        .seed_sequence(site.tenant_id, SequenceKind::PurchaseOrder, 998)
        .await;
    approved_po(&site, 1).await;
    approved_po(&site, 1).await;

    let numbers: Vec<String> = PurchaseOrderService::new(site.store())
        .list_purchase_orders(&site.admin)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.po_number)
        .collect();
    assert_eq!(numbers, vec!["PO001", "PO999", "PO1000"]);
}

#[tokio::test]
async fn empty_purchase_order_is_rejected() {
    let site = Site::new().await;
    let err = PurchaseOrderService::new(site.store())
        .create_purchase_order(
            &site.admin,
            CreatePurchaseOrderInput {
                supplier_id: Uuid::new_v4(),
                lines: Vec::new(),
                expected_delivery: None,
                notes: None,
                submit: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation { .. } | AppError::ValidationError(_)
    ));
}

#[tokio::test]
async fn approved_order_cannot_be_deleted() {
    let site = Site::new().await;
    let po_id = approved_po(&site, 10).await;

    let err = PurchaseOrderService::new(site.store())
        .delete_purchase_order(&site.admin, po_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
}

// ============================================================================
// Goods receipts
// ============================================================================

#[tokio::test]
async fn receipt_needs_an_approved_order() {
    let site = Site::new().await;
    let po = PurchaseOrderService::new(site.store())
        .create_purchase_order(
            &site.admin,
            CreatePurchaseOrderInput {
                supplier_id: Uuid::new_v4(),
                lines: vec![LineInput {
                    product_id: site.product.id,
                    quantity: 10,
                    unit_price: Decimal::ONE,
                }],
                expected_delivery: None,
                notes: None,
                submit: false,
            },
        )
        .await
        .unwrap();

    let err = GoodsReceiptService::new(site.store())
        .create_receipt(
            &site.admin,
            CreateReceiptInput {
                purchase_order_id: po.order.id,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
}

#[tokio::test]
async fn partial_then_full_receipt() {
    let site = Site::new().await;
    let po_id = approved_po(&site, 100).await;
    let service = GoodsReceiptService::new(site.store());

    let receipt = service
        .create_receipt(
            &site.admin,
            CreateReceiptInput {
                purchase_order_id: po_id,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.receipt.grn_number, "GRN001");
    assert_eq!(receipt.receipt.total_expected, 100);

    let partial = service
        .receive(&site.admin, receipt.receipt.id, received(site.product.id, 60))
        .await
        .unwrap();
    assert_eq!(partial.receipt.status, ReceiptStatus::InProgress);
    assert_eq!(available(&site).await, 60);

    let err = service
        .receive(&site.admin, receipt.receipt.id, received(site.product.id, 50))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let complete = service
        .receive(&site.admin, receipt.receipt.id, received(site.product.id, 100))
        .await
        .unwrap();
    assert_eq!(complete.receipt.status, ReceiptStatus::Completed);
    assert_eq!(complete.receipt.total_received, 100);
    assert!(complete.receipt.completed_at.is_some());
    assert_eq!(available(&site).await, 100);

    let po = PurchaseOrderService::new(site.store())
        .get_purchase_order(&site.admin, po_id)
        .await
        .unwrap();
    assert_eq!(po.order.status, PurchaseOrderStatus::Received);

    let receipts = StockService::new(site.store())
        .list_movements(
            &site.admin,
            MovementFilter {
                movement_type: Some(MovementType::Receive),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let mut quantities: Vec<i64> = receipts.iter().map(|m| m.quantity).collect();
    quantities.sort_unstable();
    assert_eq!(quantities, vec![40, 60]);

    let err = service
        .receive(&site.admin, receipt.receipt.id, received(site.product.id, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
}

#[tokio::test]
async fn damaged_goods_are_not_stocked() {
    let site = Site::new().await;
    let po_id = approved_po(&site, 10).await;
    let service = GoodsReceiptService::new(site.store());
    let receipt = service
        .create_receipt(
            &site.admin,
            CreateReceiptInput {
                purchase_order_id: po_id,
                notes: None,
            },
        )
        .await
        .unwrap();

    let mut input = received(site.product.id, 10);
    input.lines[0].quality_status = QualityStatus::Damaged;
    let done = service
        .receive(&site.admin, receipt.receipt.id, input)
        .await
        .unwrap();

    assert_eq!(done.receipt.status, ReceiptStatus::Completed);
    assert_eq!(available(&site).await, 0);
}

#[tokio::test]
async fn viewer_cannot_receive() {
    let site = Site::new().await;
    let po_id = approved_po(&site, 10).await;
    let viewer = site.member(Role::Viewer).await;

    let err = GoodsReceiptService::new(site.store())
        .create_receipt(
            &viewer,
            CreateReceiptInput {
                purchase_order_id: po_id,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

// ============================================================================
// Returns
// ============================================================================

/// Creates a confirmed order for one unit and returns its id and, when
/// `ship` is set, runs it all the way to a SHIPPED shipment
async fn order_for_return(site: &Site, ship: bool) -> Uuid {
    site.stock_at(&site.pick, 10).await;
    let order = OrderService::new(site.store())
        .create_order(
            &site.admin,
            CreateOrderInput {
                customer_id: None,
                warehouse_id: None,
                priority: None,
                order_date: None,
                required_date: None,
                sales_channel: None,
                reference: None,
                notes: None,
                items: vec![OrderItemInput {
                    product_id: site.product.id,
                    quantity: 1,
                    unit_price: Decimal::TEN,
                }],
            },
        )
        .await
        .unwrap();
    if !ship {
        return order.order.id;
    }

    let picker = site.member(Role::Picker).await;
    let pick_list_id = order.pick_list_id.unwrap();
    let picking = PickingService::new(site.store());
    picking
        .assign_picker(&site.admin, pick_list_id, AssignInput { user_id: picker.user_id })
        .await
        .unwrap();
    picking.complete_picking(&picker, pick_list_id).await.unwrap();

    let packed = PackingService::new(site.store())
        .complete_packing(&site.admin, order.packing_task_id.unwrap())
        .await
        .unwrap();
    ShipmentService::new(site.store())
        .update_shipment(
            &site.admin,
            packed.shipment.unwrap().id,
            UpdateShipmentInput {
                delivery_status: Some(DeliveryStatus::Shipped),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    order.order.id
}

fn return_input(order_id: Uuid) -> CreateReturnInput {
    CreateReturnInput {
        order_id,
        shipment_id: None,
        return_type: None,
        reason: "Wrong size".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn return_before_shipping_is_refused() {
    let site = Site::new().await;
    let order_id = order_for_return(&site, false).await;

    let err = ReturnService::new(site.store())
        .create_return(&site.admin, return_input(order_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
}

#[tokio::test]
async fn return_runs_to_closed_without_restocking() {
    let site = Site::new().await;
    let order_id = order_for_return(&site, true).await;
    assert_eq!(available(&site).await, 9);

    let service = ReturnService::new(site.store());
    let rma = service
        .create_return(&site.admin, return_input(order_id))
        .await
        .unwrap();
    assert_eq!(rma.status, ReturnStatus::RmaCreated);
    assert!(rma.rma_number.starts_with("RMA-"));
    assert!(rma.shipment_id.is_some());

    let err = service
        .refund_return(&site.admin, rma.id, RefundInput { amount: Decimal::TEN })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));

    service.receive_return(&site.admin, rma.id).await.unwrap();
    service.start_inspection(&site.admin, rma.id).await.unwrap();
    let approved = service
        .inspect_return(
            &site.admin,
            rma.id,
            InspectInput {
                outcome: InspectionOutcome::Approved,
                recovery_value: Some(Decimal::new(800, 2)),
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(approved.status, ReturnStatus::Approved);
    assert!(approved.inspected_at.is_some());

    let refunded = service
        .refund_return(&site.admin, rma.id, RefundInput { amount: Decimal::TEN })
        .await
        .unwrap();
    assert_eq!(refunded.refund_amount, Some(Decimal::TEN));

    let closed = service.close_return(&site.admin, rma.id).await.unwrap();
    assert_eq!(closed.status, ReturnStatus::Closed);
    assert!(closed.completed_at.is_some());

    assert_eq!(available(&site).await, 9);
}

#[tokio::test]
async fn pickers_cannot_open_returns() {
    let site = Site::new().await;
    let order_id = order_for_return(&site, true).await;
    let picker = site.member(Role::Picker).await;

    let err = ReturnService::new(site.store())
        .create_return(&picker, return_input(order_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
