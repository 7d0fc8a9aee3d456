//! Replenishment tests
//!
//! Threshold evaluation, task materialization, the BULK -> PICK transfer
//! on completion, and the scheduled pass.

mod common;

use common::Site;
use shared::{
    Identity, LocationType, MovementType, Priority, ReplenishmentTaskStatus, Role,
};
use std::sync::Arc;
use stockflow::error::AppError;
use stockflow::services::replenishment::{
    run_scheduled_pass, CreateConfigInput, CreateTaskInput, MaterializeInput, TaskQuery,
};
use stockflow::services::{ReplenishmentService, StockService};
use stockflow::store::{MemoryStore, MovementFilter, StockFilter, Store};
use uuid::Uuid;

// ============================================================================
// Helpers
// ============================================================================

fn config(product_id: Uuid, reorder_point: i64, reorder_quantity: i64) -> CreateConfigInput {
    CreateConfigInput {
        product_id,
        min_stock_level: 0,
        max_stock_level: 0,
        reorder_point,
        reorder_quantity,
        auto_create_tasks: None,
        status: None,
    }
}

async fn quantity_at(site: &Site, location_id: Uuid) -> i64 {
    StockService::new(site.store())
        .list_stock(
            &site.admin,
            StockFilter {
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

async fn transfers(site: &Site) -> usize {
    StockService::new(site.store())
        .list_movements(
            &site.admin,
            MovementFilter {
                movement_type: Some(MovementType::Transfer),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .len()
}

// ============================================================================
// Configs
// ============================================================================

#[tokio::test]
async fn one_config_per_product() {
    let site = Site::new().await;
    let service = ReplenishmentService::new(site.store());

    let created = service
        .create_config(&site.admin, config(site.product.id, 20, 30))
        .await
        .unwrap();
    assert!(created.auto_create_tasks);

    let err = service
        .create_config(&site.admin, config(site.product.id, 10, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));
}

#[tokio::test]
async fn min_above_max_is_rejected() {
    let site = Site::new().await;
    let mut input = config(site.product.id, 20, 30);
    input.min_stock_level = 50;
    input.max_stock_level = 10;

    let err = ReplenishmentService::new(site.store())
        .create_config(&site.admin, input)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

// ============================================================================
// Evaluation and materialization
// ============================================================================

#[tokio::test]
async fn evaluation_flags_products_below_reorder_point() {
    let site = Site::new().await;
    site.stock_at(&site.bulk, 15).await;
    let service = ReplenishmentService::new(site.store());
    service
        .create_config(&site.admin, config(site.product.id, 20, 30))
        .await
        .unwrap();

    let suggestions = service.evaluate(&site.admin).await.unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].available, 15);
    assert_eq!(suggestions[0].quantity, 30);

    let tasks = service
        .materialize(&site.admin, MaterializeInput { suggestions })
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].from_location_id, site.bulk.id);
    assert_eq!(tasks[0].to_location_id, site.pick.id);
    assert_eq!(tasks[0].priority, Priority::Medium);
    assert_eq!(tasks[0].status, ReplenishmentTaskStatus::Pending);
}

#[tokio::test]
async fn stocked_products_are_not_flagged() {
    let site = Site::new().await;
    site.stock_at(&site.bulk, 25).await;
    let service = ReplenishmentService::new(site.store());
    service
        .create_config(&site.admin, config(site.product.id, 20, 30))
        .await
        .unwrap();

    assert!(service.evaluate(&site.admin).await.unwrap().is_empty());
}

#[tokio::test]
async fn open_tasks_are_not_duplicated() {
    let site = Site::new().await;
    let service = ReplenishmentService::new(site.store());
    service
        .create_config(&site.admin, config(site.product.id, 20, 30))
        .await
        .unwrap();

    let first = service.run_auto_check(&site.admin).await.unwrap();
    assert_eq!(first.tasks.len(), 1);
    assert_eq!(first.tasks[0].priority, Priority::High);

    let second = service.run_auto_check(&site.admin).await.unwrap();
    assert_eq!(second.suggestions.len(), 1);
    assert!(second.tasks.is_empty());
}

#[tokio::test]
async fn single_location_has_nowhere_to_move() {
    let store = Arc::new(MemoryStore::new());
    let tenant_id = Uuid::new_v4();
    let warehouse = store.seed_warehouse(tenant_id, "WH-1").await;
    let zone = store.seed_zone(warehouse.id, "A").await;
    store
        .seed_location(&zone, "ONLY", LocationType::Bulk, 1)
        .await;
    let product = store.seed_product(tenant_id, "SKU-9").await;
    let admin = store.seed_user(tenant_id, Role::CompanyAdmin).await;
    let admin = Identity::new(tenant_id, admin.id, Role::CompanyAdmin);

    let service = ReplenishmentService::new(store.clone());
    service
        .create_config(&admin, config(product.id, 5, 5))
        .await
        .unwrap();

    let err = service.run_auto_check(&admin).await.unwrap_err();
    assert!(matches!(err, AppError::NoEligibleLocations));
}

// ============================================================================
// Task completion
// ============================================================================

#[tokio::test]
async fn completion_transfers_bulk_to_pick() {
    let site = Site::new().await;
    site.stock_at(&site.bulk, 15).await;
    let service = ReplenishmentService::new(site.store());
    service
        .create_config(&site.admin, config(site.product.id, 20, 10))
        .await
        .unwrap();
    let task = service.run_auto_check(&site.admin).await.unwrap().tasks.remove(0);

    let done = service.complete_task(&site.admin, task.id).await.unwrap();
    assert_eq!(done.status, ReplenishmentTaskStatus::Completed);
    assert_eq!(done.quantity_completed, 10);
    assert_eq!(done.completed_by, Some(site.admin.user_id));
    assert_eq!(quantity_at(&site, site.bulk.id).await, 5);
    assert_eq!(quantity_at(&site, site.pick.id).await, 10);
    assert_eq!(transfers(&site).await, 1);

    // completing again is a no-op
    let again = service.complete_task(&site.admin, task.id).await.unwrap();
    assert_eq!(again.status, ReplenishmentTaskStatus::Completed);
    assert_eq!(quantity_at(&site, site.bulk.id).await, 5);
    assert_eq!(transfers(&site).await, 1);
}

#[tokio::test]
async fn short_source_leaves_task_pending() {
    let site = Site::new().await;
    site.stock_at(&site.bulk, 15).await;
    let service = ReplenishmentService::new(site.store());
    service
        .create_config(&site.admin, config(site.product.id, 20, 30))
        .await
        .unwrap();
    let task = service.run_auto_check(&site.admin).await.unwrap().tasks.remove(0);

    let err = service.complete_task(&site.admin, task.id).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));

    let task = service.get_task(&site.admin, task.id).await.unwrap();
    assert_eq!(task.status, ReplenishmentTaskStatus::Pending);
    assert_eq!(quantity_at(&site, site.bulk.id).await, 15);
    assert_eq!(quantity_at(&site, site.pick.id).await, 0);
    assert_eq!(transfers(&site).await, 0);
}

#[tokio::test]
async fn batched_bulk_stock_feeds_the_pick_face() {
    let site = Site::new().await;
    site.batch_at(&site.bulk, "LOT-1", 15).await;
    let service = ReplenishmentService::new(site.store());
    service
        .create_config(&site.admin, config(site.product.id, 20, 10))
        .await
        .unwrap();
    let task = service.run_auto_check(&site.admin).await.unwrap().tasks.remove(0);
    assert_eq!(task.from_location_id, site.bulk.id);

    let done = service.complete_task(&site.admin, task.id).await.unwrap();
    assert_eq!(done.status, ReplenishmentTaskStatus::Completed);
    assert_eq!(quantity_at(&site, site.bulk.id).await, 5);
    assert_eq!(quantity_at(&site, site.pick.id).await, 10);

    let at_pick = StockService::new(site.store())
        .list_stock(
            &site.admin,
            StockFilter {
                location_id: Some(site.pick.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(at_pick.len(), 1);
    assert_eq!(at_pick[0].batch_number.as_deref(), Some("LOT-1"));
}

#[tokio::test]
async fn transfer_spans_several_batches() {
    let site = Site::new().await;
    site.batch_at(&site.bulk, "LOT-1", 6).await;
    site.batch_at(&site.bulk, "LOT-2", 9).await;
    let service = ReplenishmentService::new(site.store());
    service
        .create_config(&site.admin, config(site.product.id, 20, 10))
        .await
        .unwrap();
    let task = service.run_auto_check(&site.admin).await.unwrap().tasks.remove(0);

    service.complete_task(&site.admin, task.id).await.unwrap();
    assert_eq!(quantity_at(&site, site.bulk.id).await, 5);
    assert_eq!(quantity_at(&site, site.pick.id).await, 10);
    assert_eq!(transfers(&site).await, 2);
}

#[tokio::test]
async fn cancelled_task_cannot_complete() {
    let site = Site::new().await;
    site.stock_at(&site.bulk, 50).await;
    let service = ReplenishmentService::new(site.store());

    let task = service
        .create_task(
            &site.admin,
            CreateTaskInput {
                product_id: site.product.id,
                from_location_id: site.bulk.id,
                to_location_id: site.pick.id,
                quantity_needed: 5,
                priority: Some(Priority::Urgent),
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(task.task_number, "RPL-000001");

    service.cancel_task(&site.admin, task.id).await.unwrap();
    let err = service.complete_task(&site.admin, task.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
    assert_eq!(quantity_at(&site, site.bulk.id).await, 50);

    let cancelled = service
        .list_tasks(
            &site.admin,
            TaskQuery {
                status: Some(ReplenishmentTaskStatus::Cancelled),
            },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
}

#[tokio::test]
async fn task_needs_distinct_locations() {
    let site = Site::new().await;
    let err = ReplenishmentService::new(site.store())
        .create_task(
            &site.admin,
            CreateTaskInput {
                product_id: site.product.id,
                from_location_id: site.bulk.id,
                to_location_id: site.bulk.id,
                quantity_needed: 5,
                priority: None,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn viewers_can_look_but_not_act() {
    let site = Site::new().await;
    let viewer = site.member(Role::Viewer).await;
    let service = ReplenishmentService::new(site.store());

    assert!(service.evaluate(&viewer).await.is_ok());
    let err = service.run_auto_check(&viewer).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

// ============================================================================
// Scheduler
// ============================================================================

#[tokio::test]
async fn scheduled_pass_creates_system_tasks() {
    let site = Site::new().await;
    let service = ReplenishmentService::new(site.store());
    service
        .create_config(&site.admin, config(site.product.id, 20, 30))
        .await
        .unwrap();

    let store: Arc<dyn Store> = site.store();
    assert_eq!(run_scheduled_pass(store.as_ref()).await.unwrap(), 1);
    assert_eq!(run_scheduled_pass(store.as_ref()).await.unwrap(), 0);

    let tasks = service
        .list_tasks(&site.admin, TaskQuery::default())
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].created_by.is_none());
}
