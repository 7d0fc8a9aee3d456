//! Outbound fulfillment tests
//!
//! Covers the order -> pick -> pack -> ship flow against the in-memory
//! store:
//! - stock leaves the ledger exactly once per shipment
//! - completing picking and packing twice changes nothing
//! - cancellation and floor-worker visibility

mod common;

use common::Site;
use shared::{
    DeliveryStatus, MovementType, OrderStatus, PackingStatus, PickListStatus, Role,
};
use stockflow::error::AppError;
use stockflow::services::orders::{CreateOrderInput, OrderItemInput};
use stockflow::services::picking::{AssignInput, PickedQuantityInput};
use stockflow::services::shipping::UpdateShipmentInput;
use stockflow::services::{
    OrderService, PackingService, PickingService, ShipmentService, StockService,
};
use stockflow::store::{MovementFilter, StockFilter};
use uuid::Uuid;

// ============================================================================
// Helpers
// ============================================================================

fn order_input(product_id: Uuid, quantity: i64) -> CreateOrderInput {
    CreateOrderInput {
        customer_id: None,
        warehouse_id: None,
        priority: None,
        order_date: None,
        required_date: None,
        sales_channel: Some("web".to_string()),
        reference: None,
        notes: None,
        items: vec![OrderItemInput {
            product_id,
            quantity,
            unit_price: rust_decimal::Decimal::new(1250, 2),
        }],
    }
}

fn status_update(status: DeliveryStatus) -> UpdateShipmentInput {
    UpdateShipmentInput {
        delivery_status: Some(status),
        ..Default::default()
    }
}

async fn on_hand(site: &Site) -> i64 {
    StockService::new(site.store())
        .list_stock(
            &site.admin,
            StockFilter {
                product_id: Some(site.product.id),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .iter()
        .map(|r| r.quantity)
        .sum()
}

struct Packed {
    order_id: Uuid,
    pick_list_id: Uuid,
    packing_task_id: Uuid,
    shipment_id: Uuid,
}

/// Runs an order for `quantity` units through picking and packing
async fn pack_order(site: &Site, quantity: i64) -> Packed {
    pack_input(site, order_input(site.product.id, quantity)).await
}

async fn pack_input(site: &Site, input: CreateOrderInput) -> Packed {
    let picker = site.member(Role::Picker).await;
    let packer = site.member(Role::Packer).await;

    let order = OrderService::new(site.store())
        .create_order(&site.admin, input)
        .await
        .unwrap();
    let pick_list_id = order.pick_list_id.unwrap();
    let packing_task_id = order.packing_task_id.unwrap();

    let picking = PickingService::new(site.store());
    picking
        .assign_picker(&site.admin, pick_list_id, AssignInput { user_id: picker.user_id })
        .await
        .unwrap();
    picking.complete_picking(&picker, pick_list_id).await.unwrap();

    let packing = PackingService::new(site.store());
    packing
        .assign_packer(&site.admin, packing_task_id, AssignInput { user_id: packer.user_id })
        .await
        .unwrap();
    packing.start_packing(&packer, packing_task_id).await.unwrap();
    let result = packing.complete_packing(&packer, packing_task_id).await.unwrap();

    Packed {
        order_id: order.order.id,
        pick_list_id,
        packing_task_id,
        shipment_id: result.shipment.unwrap().id,
    }
}

// ============================================================================
// Order creation
// ============================================================================

#[tokio::test]
async fn order_with_items_is_confirmed_with_floor_work() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 50).await;

    let order = OrderService::new(site.store())
        .create_order(&site.admin, order_input(site.product.id, 5))
        .await
        .unwrap();

    assert_eq!(order.order.status, OrderStatus::Confirmed);
    assert_eq!(order.order.order_number, "ORD-000001");
    assert_eq!(order.order.warehouse_id, Some(site.warehouse.id));
    assert!(order.pick_list_id.is_some());
    assert!(order.packing_task_id.is_some());

    let detail = PickingService::new(site.store())
        .get_pick_list(&site.admin, order.pick_list_id.unwrap())
        .await
        .unwrap();
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].quantity_required, 5);
    assert_eq!(detail.items[0].location_id, Some(site.pick.id));
}

#[tokio::test]
async fn order_without_items_stays_draft() {
    let site = Site::new().await;
    let mut input = order_input(site.product.id, 1);
    input.items.clear();

    let order = OrderService::new(site.store())
        .create_order(&site.admin, input)
        .await
        .unwrap();

    assert_eq!(order.order.status, OrderStatus::Draft);
    assert!(order.pick_list_id.is_none());
}

#[tokio::test]
async fn viewer_cannot_create_orders() {
    let site = Site::new().await;
    let viewer = site.member(Role::Viewer).await;

    let err = OrderService::new(site.store())
        .create_order(&viewer, order_input(site.product.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

// ============================================================================
// Happy path and shipment deduction
// ============================================================================

#[tokio::test]
async fn shipped_order_deducts_stock_once() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 50).await;
    let packed = pack_order(&site, 5).await;

    let order = OrderService::new(site.store())
        .get_order(&site.admin, packed.order_id)
        .await
        .unwrap();
    assert_eq!(order.order.status, OrderStatus::Packed);
    assert_eq!(order.shipment_id, Some(packed.shipment_id));
    assert_eq!(on_hand(&site).await, 50);

    let shipping = ShipmentService::new(site.store());
    let shipped = shipping
        .update_shipment(&site.admin, packed.shipment_id, status_update(DeliveryStatus::Shipped))
        .await
        .unwrap();
    let report = shipped.deduction.expect("first dispatch deducts");
    assert_eq!(report.deducted, 5);
    assert!(report.shortfall.is_empty());
    assert!(shipped.shipment.stock_deducted);
    assert_eq!(on_hand(&site).await, 45);

    // later post-ship moves leave the ledger alone
    let in_transit = shipping
        .update_shipment(&site.admin, packed.shipment_id, status_update(DeliveryStatus::InTransit))
        .await
        .unwrap();
    assert!(in_transit.deduction.is_none());
    let delivered = shipping
        .update_shipment(&site.admin, packed.shipment_id, status_update(DeliveryStatus::Delivered))
        .await
        .unwrap();
    assert!(delivered.deduction.is_none());
    assert_eq!(on_hand(&site).await, 45);

    let explicit = shipping
        .deduct_stock_for_shipment(&site.admin, packed.shipment_id)
        .await
        .unwrap();
    assert_eq!(explicit.deducted, 0);
    assert_eq!(on_hand(&site).await, 45);

    let order = OrderService::new(site.store())
        .get_order(&site.admin, packed.order_id)
        .await
        .unwrap();
    assert_eq!(order.order.status, OrderStatus::Delivered);

    let picks = StockService::new(site.store())
        .list_movements(
            &site.admin,
            MovementFilter {
                movement_type: Some(MovementType::Pick),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(picks.len(), 1);
    assert_eq!(picks[0].quantity, 5);
    assert_eq!(picks[0].reference_type.as_deref(), Some("shipment"));
    assert_eq!(picks[0].reference_id, Some(packed.shipment_id));
}

#[tokio::test]
async fn short_stock_is_reported_not_fatal() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 3).await;
    let packed = pack_order(&site, 5).await;

    let update = ShipmentService::new(site.store())
        .update_shipment(&site.admin, packed.shipment_id, status_update(DeliveryStatus::Shipped))
        .await
        .unwrap();

    let report = update.deduction.unwrap();
    assert_eq!(report.deducted, 3);
    assert_eq!(report.shortfall.len(), 1);
    assert_eq!(report.shortfall[0].requested, 5);
    assert_eq!(report.shortfall[0].deducted, 3);
    assert!(update.shipment.stock_deducted);
    assert_eq!(on_hand(&site).await, 0);
}

#[tokio::test]
async fn deduction_walks_products_in_id_order() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 4).await;
    let other = site.store.seed_product(site.tenant_id, "SKU-002").await;

    let mut input = order_input(site.product.id, 6);
    input.items.insert(
        0,
        OrderItemInput {
            product_id: other.id,
            quantity: 2,
            unit_price: rust_decimal::Decimal::new(500, 2),
        },
    );
    let packed = pack_input(&site, input).await;

    let report = ShipmentService::new(site.store())
        .update_shipment(&site.admin, packed.shipment_id, status_update(DeliveryStatus::Shipped))
        .await
        .unwrap()
        .deduction
        .unwrap();

    assert_eq!(report.deducted, 4);
    let products: Vec<Uuid> = report.shortfall.iter().map(|s| s.product_id).collect();
    let mut sorted = products.clone();
    sorted.sort();
    assert_eq!(products.len(), 2);
    assert_eq!(products, sorted);
}

#[tokio::test]
async fn explicit_deduction_needs_a_dispatched_shipment() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 10).await;
    let packed = pack_order(&site, 2).await;

    let err = ShipmentService::new(site.store())
        .deduct_stock_for_shipment(&site.admin, packed.shipment_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
    assert_eq!(on_hand(&site).await, 10);
}

// ============================================================================
// Idempotent completion
// ============================================================================

#[tokio::test]
async fn completing_twice_changes_nothing() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 20).await;
    let packed = pack_order(&site, 4).await;

    let pick_again = PickingService::new(site.store())
        .complete_picking(&site.admin, packed.pick_list_id)
        .await
        .unwrap();
    assert_eq!(pick_again.pick_list.status, PickListStatus::Picked);

    let pack_again = PackingService::new(site.store())
        .complete_packing(&site.admin, packed.packing_task_id)
        .await
        .unwrap();
    assert_eq!(pack_again.task.status, PackingStatus::Packed);
    assert_eq!(pack_again.shipment.map(|s| s.id), Some(packed.shipment_id));

    let shipments = ShipmentService::new(site.store())
        .list_shipments(&site.admin)
        .await
        .unwrap();
    assert_eq!(shipments.len(), 1);
    assert_eq!(on_hand(&site).await, 20);
}

#[tokio::test]
async fn picked_quantity_cannot_exceed_required() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 20).await;
    let picker = site.member(Role::Picker).await;

    let order = OrderService::new(site.store())
        .create_order(&site.admin, order_input(site.product.id, 4))
        .await
        .unwrap();
    let pick_list_id = order.pick_list_id.unwrap();

    let picking = PickingService::new(site.store());
    let assigned = picking
        .assign_picker(&site.admin, pick_list_id, AssignInput { user_id: picker.user_id })
        .await
        .unwrap();
    let item_id = assigned.items[0].id;

    let err = picking
        .update_picked_quantity(&picker, pick_list_id, item_id, PickedQuantityInput { quantity_picked: 5 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let progress = picking
        .update_picked_quantity(&picker, pick_list_id, item_id, PickedQuantityInput { quantity_picked: 2 })
        .await
        .unwrap();
    assert_eq!(progress.pick_list.status, PickListStatus::PartiallyPicked);
    assert_eq!(progress.items[0].quantity_picked, 2);
}

// ============================================================================
// Assignment and visibility
// ============================================================================

#[tokio::test]
async fn pickers_only_see_their_own_lists() {
    let site = Site::new().await;
    let picker = site.member(Role::Picker).await;
    let other = site.member(Role::Picker).await;

    let orders = OrderService::new(site.store());
    let first = orders
        .create_order(&site.admin, order_input(site.product.id, 1))
        .await
        .unwrap();
    orders
        .create_order(&site.admin, order_input(site.product.id, 2))
        .await
        .unwrap();

    let picking = PickingService::new(site.store());
    picking
        .assign_picker(
            &site.admin,
            first.pick_list_id.unwrap(),
            AssignInput { user_id: picker.user_id },
        )
        .await
        .unwrap();

    assert_eq!(picking.list_pick_lists(&picker).await.unwrap().len(), 1);
    assert!(picking.list_pick_lists(&other).await.unwrap().is_empty());
    assert_eq!(picking.list_pick_lists(&site.admin).await.unwrap().len(), 2);

    let err = picking
        .complete_picking(&other, first.pick_list_id.unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn packer_cannot_be_assigned_picking() {
    let site = Site::new().await;
    let packer = site.member(Role::Packer).await;

    let order = OrderService::new(site.store())
        .create_order(&site.admin, order_input(site.product.id, 1))
        .await
        .unwrap();

    let err = PickingService::new(site.store())
        .assign_picker(
            &site.admin,
            order.pick_list_id.unwrap(),
            AssignInput { user_id: packer.user_id },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn rejecting_a_pick_returns_the_order_to_confirmed() {
    let site = Site::new().await;
    let picker = site.member(Role::Picker).await;

    let order = OrderService::new(site.store())
        .create_order(&site.admin, order_input(site.product.id, 1))
        .await
        .unwrap();
    let pick_list_id = order.pick_list_id.unwrap();

    let picking = PickingService::new(site.store());
    picking
        .assign_picker(&site.admin, pick_list_id, AssignInput { user_id: picker.user_id })
        .await
        .unwrap();
    let rejected = picking.reject_assignment(&picker, pick_list_id).await.unwrap();

    assert_eq!(rejected.pick_list.status, PickListStatus::NotStarted);
    assert!(rejected.pick_list.assigned_to.is_none());

    let order = OrderService::new(site.store())
        .get_order(&site.admin, order.order.id)
        .await
        .unwrap();
    assert_eq!(order.order.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn rejected_pick_forgets_partial_progress() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 20).await;
    let picker = site.member(Role::Picker).await;

    let order = OrderService::new(site.store())
        .create_order(&site.admin, order_input(site.product.id, 4))
        .await
        .unwrap();
    let pick_list_id = order.pick_list_id.unwrap();

    let picking = PickingService::new(site.store());
    let assigned = picking
        .assign_picker(&site.admin, pick_list_id, AssignInput { user_id: picker.user_id })
        .await
        .unwrap();
    let item_id = assigned.items[0].id;
    picking
        .update_picked_quantity(&picker, pick_list_id, item_id, PickedQuantityInput { quantity_picked: 3 })
        .await
        .unwrap();

    let rejected = picking.reject_assignment(&picker, pick_list_id).await.unwrap();
    assert_eq!(rejected.pick_list.status, PickListStatus::NotStarted);
    assert_eq!(rejected.items[0].quantity_picked, 0);

    let reloaded = picking.get_pick_list(&site.admin, pick_list_id).await.unwrap();
    assert_eq!(reloaded.items[0].quantity_picked, 0);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn cancel_removes_floor_work() {
    let site = Site::new().await;
    let orders = OrderService::new(site.store());
    let order = orders
        .create_order(&site.admin, order_input(site.product.id, 3))
        .await
        .unwrap();

    let cancelled = orders.cancel_order(&site.admin, order.order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let picking = PickingService::new(site.store());
    assert!(picking.list_pick_lists(&site.admin).await.unwrap().is_empty());
    let packing = PackingService::new(site.store());
    assert!(packing.list_packing_tasks(&site.admin).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_after_picking_started_fails() {
    let site = Site::new().await;
    let picker = site.member(Role::Picker).await;

    let orders = OrderService::new(site.store());
    let order = orders
        .create_order(&site.admin, order_input(site.product.id, 3))
        .await
        .unwrap();
    PickingService::new(site.store())
        .assign_picker(
            &site.admin,
            order.pick_list_id.unwrap(),
            AssignInput { user_id: picker.user_id },
        )
        .await
        .unwrap();

    let err = orders.cancel_order(&site.admin, order.order.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
}
