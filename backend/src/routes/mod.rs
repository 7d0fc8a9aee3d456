//! Route definitions for the Stockflow API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::identity_middleware, AppState};

/// Create API routes. Everything except `/health` requires an identity.
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        // Ledger
        .nest("/stock", stock_routes())
        .nest("/movements", movement_routes())
        .nest("/batches", batch_routes())
        .nest("/adjustments", adjustment_routes())
        .nest("/cycle-counts", cycle_count_routes())
        // Replenishment
        .nest("/replenishment", replenishment_routes())
        // Inbound
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/goods-receipts", goods_receipt_routes())
        // Outbound
        .nest("/orders", order_routes())
        .nest("/pick-lists", pick_list_routes())
        .nest("/packing-tasks", packing_task_routes())
        .nest("/shipments", shipment_routes())
        .nest("/returns", return_routes())
        .route_layer(middleware::from_fn_with_state(state, identity_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
}

fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock))
        .route("/total", get(handlers::get_stock_total))
        .route("/reserve", post(handlers::reserve_stock))
        .route("/release", post(handlers::release_stock))
        .route("/:stock_id", get(handlers::get_stock))
}

fn movement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_movements).post(handlers::create_movement),
        )
        .route("/:movement_id", get(handlers::get_movement))
}

fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batches).post(handlers::create_batch))
        .route(
            "/:batch_id",
            get(handlers::get_batch).put(handlers::update_batch),
        )
}

fn adjustment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_adjustments).post(handlers::create_adjustment),
        )
        .route("/:adjustment_id", get(handlers::get_adjustment))
}

fn cycle_count_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_cycle_counts).post(handlers::create_cycle_count),
        )
        .route("/:count_id", get(handlers::get_cycle_count))
        .route("/:count_id/start", post(handlers::start_cycle_count))
        .route("/:count_id/complete", post(handlers::complete_cycle_count))
}

fn replenishment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/configs",
            get(handlers::list_replenishment_configs).post(handlers::create_replenishment_config),
        )
        .route(
            "/configs/:config_id",
            get(handlers::get_replenishment_config)
                .put(handlers::update_replenishment_config)
                .delete(handlers::delete_replenishment_config),
        )
        .route("/evaluate", get(handlers::evaluate_replenishment))
        .route("/materialize", post(handlers::materialize_replenishment))
        .route("/auto-check", post(handlers::run_replenishment_check))
        .route(
            "/tasks",
            get(handlers::list_replenishment_tasks).post(handlers::create_replenishment_task),
        )
        .route(
            "/tasks/:task_id",
            get(handlers::get_replenishment_task).put(handlers::update_replenishment_task),
        )
        .route("/tasks/:task_id/start", post(handlers::start_replenishment_task))
        .route("/tasks/:task_id/complete", post(handlers::complete_replenishment_task))
        .route("/tasks/:task_id/cancel", post(handlers::cancel_replenishment_task))
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route(
            "/:po_id",
            get(handlers::get_purchase_order)
                .put(handlers::update_purchase_order)
                .delete(handlers::delete_purchase_order),
        )
        .route("/:po_id/approve", post(handlers::approve_purchase_order))
        .route("/:po_id/reject", post(handlers::reject_purchase_order))
}

fn goods_receipt_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_goods_receipts).post(handlers::create_goods_receipt),
        )
        .route(
            "/:receipt_id",
            get(handlers::get_goods_receipt).delete(handlers::delete_goods_receipt),
        )
        .route("/:receipt_id/receive", post(handlers::receive_goods))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route(
            "/:order_id",
            get(handlers::get_order).put(handlers::update_order),
        )
        .route("/:order_id/confirm", post(handlers::confirm_order))
        .route("/:order_id/cancel", post(handlers::cancel_order))
}

fn pick_list_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_pick_lists))
        .route("/:pick_list_id", get(handlers::get_pick_list))
        .route("/:pick_list_id/assign", post(handlers::assign_picker))
        .route("/:pick_list_id/start", post(handlers::start_picking))
        .route(
            "/:pick_list_id/items/:item_id",
            put(handlers::update_picked_quantity),
        )
        .route("/:pick_list_id/complete", post(handlers::complete_picking))
        .route("/:pick_list_id/reject", post(handlers::reject_pick_assignment))
}

fn packing_task_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_packing_tasks))
        .route("/:task_id", get(handlers::get_packing_task))
        .route("/:task_id/assign", post(handlers::assign_packer))
        .route("/:task_id/start", post(handlers::start_packing))
        .route("/:task_id/hold", post(handlers::hold_packing))
        .route("/:task_id/resume", post(handlers::resume_packing))
        .route("/:task_id/complete", post(handlers::complete_packing))
        .route("/:task_id/reject", post(handlers::reject_packing_assignment))
}

fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_shipments).post(handlers::create_shipment),
        )
        .route(
            "/:shipment_id",
            get(handlers::get_shipment).put(handlers::update_shipment),
        )
        .route("/:shipment_id/deduct", post(handlers::deduct_shipment_stock))
}

fn return_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_returns).post(handlers::create_return))
        .route("/:rma_id", get(handlers::get_return))
        .route("/:rma_id/awaiting", post(handlers::mark_awaiting_return))
        .route("/:rma_id/receive", post(handlers::receive_return))
        .route("/:rma_id/inspect/start", post(handlers::start_return_inspection))
        .route("/:rma_id/inspect", post(handlers::inspect_return))
        .route("/:rma_id/refund", post(handlers::refund_return))
        .route("/:rma_id/close", post(handlers::close_return))
}
