//! Stock ledger tests
//!
//! Reservations, manual movements, adjustments, batches and cycle counts,
//! plus property tests that the ledger conserves quantity and never
//! oversells.

mod common;

use common::Site;
use proptest::prelude::*;
use shared::{AdjustmentType, MovementType, Role};
use stockflow::error::AppError;
use stockflow::services::adjustment::CreateAdjustmentInput;
use stockflow::services::batch::CreateBatchInput;
use stockflow::services::cycle_count::{
    CompleteCycleCountInput, CountedProduct, CreateCycleCountInput,
};
use stockflow::services::stock::{CreateMovementInput, QuantityInput};
use stockflow::services::{AdjustmentService, BatchService, CycleCountService, StockService};
use stockflow::store::{MovementFilter, StockFilter};
use uuid::Uuid;

// ============================================================================
// Helpers
// ============================================================================

fn movement(
    movement_type: MovementType,
    product_id: Uuid,
    from: Option<Uuid>,
    to: Option<Uuid>,
    quantity: i64,
) -> CreateMovementInput {
    CreateMovementInput {
        movement_type,
        product_id,
        batch_id: None,
        from_location_id: from,
        to_location_id: to,
        quantity,
        reason: None,
        notes: None,
    }
}

async fn quantity_at(site: &Site, location_id: Uuid) -> i64 {
    StockService::new(site.store())
        .list_stock(
            &site.admin,
            StockFilter {
                product_id: Some(site.product.id),
                location_id: Some(location_id),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .iter()
        .map(|r| r.quantity)
        .sum()
}

// ============================================================================
// Reservations
// ============================================================================

#[tokio::test]
async fn reservations_limit_availability() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 10).await;
    let service = StockService::new(site.store());

    let record = service
        .list_stock(&site.admin, StockFilter::default())
        .await
        .unwrap()
        .remove(0);

    let reserved = service
        .reserve(&site.admin, record.id, QuantityInput { quantity: 7 })
        .await
        .unwrap();
    assert_eq!(reserved.available(), 3);

    let err = service
        .reserve(&site.admin, record.id, QuantityInput { quantity: 4 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));

    let total = service
        .total_available(&site.admin, site.product.id, None)
        .await
        .unwrap();
    assert_eq!(total.available, 3);

    let released = service
        .release(&site.admin, record.id, QuantityInput { quantity: 7 })
        .await
        .unwrap();
    assert_eq!(released.reserved, 0);
    assert_eq!(released.quantity, 10);
}

#[tokio::test]
async fn pickers_cannot_touch_the_ledger() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 10).await;
    let picker = site.member(Role::Picker).await;

    let err = StockService::new(site.store())
        .create_movement(
            &picker,
            movement(MovementType::Pick, site.product.id, Some(site.pick.id), None, 1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

// ============================================================================
// Movements
// ============================================================================

#[tokio::test]
async fn transfer_moves_stock_between_locations() {
    let site = Site::new().await;
    site.stock_at(&site.bulk, 40).await;
    let service = StockService::new(site.store());

    let recorded = service
        .create_movement(
            &site.admin,
            movement(
                MovementType::Transfer,
                site.product.id,
                Some(site.bulk.id),
                Some(site.pick.id),
                15,
            ),
        )
        .await
        .unwrap();

    assert_eq!(recorded.from_location_id, Some(site.bulk.id));
    assert_eq!(recorded.to_location_id, Some(site.pick.id));
    assert_eq!(quantity_at(&site, site.bulk.id).await, 25);
    assert_eq!(quantity_at(&site, site.pick.id).await, 15);
}

#[tokio::test]
async fn failed_pick_writes_nothing() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 4).await;
    let service = StockService::new(site.store());

    let err = service
        .create_movement(
            &site.admin,
            movement(MovementType::Pick, site.product.id, Some(site.pick.id), None, 5),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));

    assert_eq!(quantity_at(&site, site.pick.id).await, 4);
    let log = service
        .list_movements(&site.admin, MovementFilter::default())
        .await
        .unwrap();
    assert!(log.is_empty());
}

#[tokio::test]
async fn adjust_movements_are_refused() {
    let site = Site::new().await;
    let err = StockService::new(site.store())
        .create_movement(
            &site.admin,
            movement(MovementType::Adjust, site.product.id, None, Some(site.pick.id), 5),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn pick_needs_a_source_location() {
    let site = Site::new().await;
    let err = StockService::new(site.store())
        .create_movement(
            &site.admin,
            movement(MovementType::Pick, site.product.id, None, None, 1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn other_tenants_stock_is_invisible() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 10).await;
    let stranger = site.store.seed_user(Uuid::new_v4(), Role::CompanyAdmin).await;
    let outsider = shared::Identity::new(stranger.tenant_id, stranger.id, Role::CompanyAdmin);

    let service = StockService::new(site.store());
    let record = service
        .list_stock(&site.admin, StockFilter::default())
        .await
        .unwrap()
        .remove(0);

    assert!(service
        .list_stock(&outsider, StockFilter::default())
        .await
        .unwrap()
        .is_empty());
    let err = service.get_stock(&outsider, record.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============================================================================
// Adjustments and batches
// ============================================================================

#[tokio::test]
async fn decrease_adjustment_debits_and_logs() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 20).await;

    let adjustment = AdjustmentService::new(site.store())
        .create_adjustment(
            &site.admin,
            CreateAdjustmentInput {
                product_id: site.product.id,
                adjustment_type: AdjustmentType::Decrease,
                quantity: 6,
                reason: "Damaged in handling".to_string(),
                notes: None,
                warehouse_id: None,
                location_id: Some(site.pick.id),
                batch_number: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(adjustment.reference_number, "ADJ-000001");
    assert_eq!(adjustment.location_id, Some(site.pick.id));
    assert_eq!(quantity_at(&site, site.pick.id).await, 14);

    let log = StockService::new(site.store())
        .list_movements(
            &site.admin,
            MovementFilter {
                movement_type: Some(MovementType::Adjust),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].reference_id, Some(adjustment.id));
}

#[tokio::test]
async fn warehouse_manager_cannot_adjust() {
    let site = Site::new().await;
    let manager = site.member(Role::WarehouseManager).await;

    let err = AdjustmentService::new(site.store())
        .create_adjustment(
            &manager,
            CreateAdjustmentInput {
                product_id: site.product.id,
                adjustment_type: AdjustmentType::Increase,
                quantity: 1,
                reason: "Found".to_string(),
                notes: None,
                warehouse_id: None,
                location_id: None,
                batch_number: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn batch_creation_credits_the_ledger() {
    let site = Site::new().await;
    let service = BatchService::new(site.store());
    let input = || CreateBatchInput {
        product_id: site.product.id,
        warehouse_id: site.warehouse.id,
        location_id: Some(site.bulk.id),
        batch_number: Some("LOT-7".to_string()),
        quantity: 30,
        unit_cost: None,
        received_date: None,
        expiry_date: None,
        manufacturing_date: None,
        supplier_id: None,
        notes: None,
    };

    let batch = service.create_batch(&site.admin, input()).await.unwrap();
    assert_eq!(batch.batch.batch_number, "LOT-7");
    assert_eq!(batch.available_quantity, 30);
    assert_eq!(quantity_at(&site, site.bulk.id).await, 30);

    let err = service.create_batch(&site.admin, input()).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));
}

// ============================================================================
// Cycle counts
// ============================================================================

#[tokio::test]
async fn cycle_count_reconciles_the_location() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 50).await;
    let service = CycleCountService::new(site.store());

    let count = service
        .create_cycle_count(
            &site.admin,
            CreateCycleCountInput {
                name: "Weekly pick face".to_string(),
                count_type: None,
                location_id: Some(site.pick.id),
                scheduled_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    service.start_cycle_count(&site.admin, count.id).await.unwrap();

    let done = service
        .complete_cycle_count(
            &site.admin,
            count.id,
            CompleteCycleCountInput {
                products: vec![CountedProduct {
                    product_id: site.product.id,
                    counted_quantity: 42,
                    batch_number: None,
                }],
            },
        )
        .await
        .unwrap();

    assert_eq!(done.count.items_count, 1);
    assert_eq!(done.count.discrepancies, 1);
    assert_eq!(done.lines[0].system_quantity, 50);
    assert_eq!(done.lines[0].variance, -8);
    assert!(done.lines[0].adjustment_id.is_some());
    assert_eq!(quantity_at(&site, site.pick.id).await, 42);

    let adjustments = AdjustmentService::new(site.store())
        .list_adjustments(&site.admin)
        .await
        .unwrap();
    assert_eq!(adjustments.len(), 1);
    assert_eq!(adjustments[0].adjustment_type, AdjustmentType::Decrease);
    assert_eq!(adjustments[0].quantity, 8);
    assert_eq!(adjustments[0].cycle_count_id, Some(count.id));

    let err = service
        .complete_cycle_count(
            &site.admin,
            count.id,
            CompleteCycleCountInput {
                products: vec![CountedProduct {
                    product_id: site.product.id,
                    counted_quantity: 42,
                    batch_number: None,
                }],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
}

#[tokio::test]
async fn matching_count_records_no_discrepancy() {
    let site = Site::new().await;
    site.stock_at(&site.pick, 12).await;
    let service = CycleCountService::new(site.store());

    let count = service
        .create_cycle_count(
            &site.admin,
            CreateCycleCountInput {
                name: "Spot check".to_string(),
                count_type: Some(shared::CycleCountType::Spot),
                location_id: Some(site.pick.id),
                scheduled_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    let done = service
        .complete_cycle_count(
            &site.admin,
            count.id,
            CompleteCycleCountInput {
                products: vec![CountedProduct {
                    product_id: site.product.id,
                    counted_quantity: 12,
                    batch_number: None,
                }],
            },
        )
        .await
        .unwrap();

    assert_eq!(done.count.discrepancies, 0);
    assert!(done.lines[0].adjustment_id.is_none());
    assert_eq!(quantity_at(&site, site.pick.id).await, 12);
}

#[tokio::test]
async fn count_reconciles_each_batch_separately() {
    let site = Site::new().await;
    site.batch_at(&site.bulk, "LOT-1", 20).await;
    site.batch_at(&site.bulk, "LOT-2", 10).await;
    let service = CycleCountService::new(site.store());

    let count = service
        .create_cycle_count(
            &site.admin,
            CreateCycleCountInput {
                name: "Bulk lots".to_string(),
                count_type: None,
                location_id: Some(site.bulk.id),
                scheduled_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    let done = service
        .complete_cycle_count(
            &site.admin,
            count.id,
            CompleteCycleCountInput {
                products: vec![
                    CountedProduct {
                        product_id: site.product.id,
                        counted_quantity: 17,
                        batch_number: Some("LOT-1".to_string()),
                    },
                    CountedProduct {
                        product_id: site.product.id,
                        counted_quantity: 10,
                        batch_number: Some("LOT-2".to_string()),
                    },
                ],
            },
        )
        .await
        .unwrap();

    assert_eq!(done.count.items_count, 2);
    assert_eq!(done.count.discrepancies, 1);
    assert_eq!(done.lines[0].system_quantity, 20);
    assert_eq!(done.lines[0].variance, -3);
    assert_eq!(done.lines[1].variance, 0);
    assert_eq!(quantity_at(&site, site.bulk.id).await, 27);

    let lot_two = StockService::new(site.store())
        .list_stock(
            &site.admin,
            StockFilter {
                location_id: Some(site.bulk.id),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.batch_number.as_deref() == Some("LOT-2"))
        .unwrap();
    assert_eq!(lot_two.quantity, 10);
}

// ============================================================================
// Property Tests
// ============================================================================

#[derive(Debug, Clone)]
enum Step {
    Receive(i64),
    Pick(i64),
    Transfer(i64),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (1i64..40).prop_map(Step::Receive),
        (1i64..40).prop_map(Step::Pick),
        (1i64..40).prop_map(Step::Transfer),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// On-hand stock always equals receipts minus successful picks, and
    /// no location ever goes negative
    #[test]
    fn ledger_conserves_quantity(steps in prop::collection::vec(step(), 1..25)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let site = Site::new().await;
            let service = StockService::new(site.store());
            let product_id = site.product.id;
            let (bulk, pick) = (site.bulk.id, site.pick.id);
            let mut expected_bulk = 0i64;
            let mut expected_pick = 0i64;

            for step in steps {
                match step {
                    Step::Receive(q) => {
                        service
                            .create_movement(&site.admin, movement(MovementType::Receive, product_id, None, Some(bulk), q))
                            .await
                            .unwrap();
                        expected_bulk += q;
                    }
                    Step::Transfer(q) => {
                        let result = service
                            .create_movement(&site.admin, movement(MovementType::Transfer, product_id, Some(bulk), Some(pick), q))
                            .await;
                        if q <= expected_bulk {
                            assert!(result.is_ok());
                            expected_bulk -= q;
                            expected_pick += q;
                        } else {
                            assert!(matches!(result, Err(AppError::InsufficientStock(_))));
                        }
                    }
                    Step::Pick(q) => {
                        let result = service
                            .create_movement(&site.admin, movement(MovementType::Pick, product_id, Some(pick), None, q))
                            .await;
                        if q <= expected_pick {
                            assert!(result.is_ok());
                            expected_pick -= q;
                        } else {
                            assert!(matches!(result, Err(AppError::InsufficientStock(_))));
                        }
                    }
                }

                let records = service
                    .list_stock(&site.admin, StockFilter::default())
                    .await
                    .unwrap();
                assert!(records.iter().all(|r| r.quantity >= 0 && r.is_consistent()));
            }

            assert_eq!(quantity_at(&site, bulk).await, expected_bulk);
            assert_eq!(quantity_at(&site, pick).await, expected_pick);
        });
    }
}
