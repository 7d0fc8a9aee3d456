//! Business logic services for the Stockflow warehouse core
//!
//! Each operation authorizes the caller, opens one unit of work, and
//! commits only after every write succeeded. Returning early drops the
//! unit of work and rolls everything back.

pub mod adjustment;
pub mod batch;
pub mod cycle_count;
pub mod ledger;
pub mod orders;
pub mod packing;
pub mod picking;
pub mod purchasing;
pub mod receiving;
pub mod replenishment;
pub mod returns;
pub mod shipping;
pub mod stock;

pub use adjustment::AdjustmentService;
pub use batch::BatchService;
pub use cycle_count::CycleCountService;
pub use orders::OrderService;
pub use packing::PackingService;
pub use picking::PickingService;
pub use purchasing::PurchaseOrderService;
pub use receiving::GoodsReceiptService;
pub use replenishment::ReplenishmentService;
pub use returns::ReturnService;
pub use shipping::ShipmentService;
pub use stock::StockService;

use shared::{Action, Identity, SequenceKind, User};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::UnitOfWork;

/// Rejects callers whose role does not grant `action`
pub(crate) fn authorize(identity: &Identity, action: Action) -> AppResult<()> {
    if identity.can(action) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role {} is not permitted to {:?}",
            identity.role, action
        )))
    }
}

/// Floor workers may only act on work assigned to them
pub(crate) fn ensure_assignee(identity: &Identity, assigned_to: Option<Uuid>) -> AppResult<()> {
    if identity.role.is_floor_worker() && assigned_to != Some(identity.user_id) {
        return Err(AppError::Forbidden(
            "This task is not assigned to you".to_string(),
        ));
    }
    Ok(())
}

/// Loads a tenant member that may be handed work requiring `action`
pub(crate) async fn eligible_worker(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    user_id: Uuid,
    action: Action,
) -> AppResult<User> {
    let user = uow
        .user(tenant_id, user_id)
        .await?
        .ok_or_else(|| AppError::validation("user_id", "User is not a member of this tenant"))?;

    if !user.active {
        return Err(AppError::validation("user_id", "User is inactive"));
    }
    if !user.role.allows(action) {
        return Err(AppError::validation(
            "user_id",
            format!("Role {} cannot be assigned this work", user.role),
        ));
    }
    Ok(user)
}

/// Issues the next human-readable number of `kind` for the tenant
pub(crate) async fn next_number(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    kind: SequenceKind,
) -> AppResult<String> {
    let n = uow.next_sequence(tenant_id, kind).await?;
    Ok(kind.format(n, chrono::Utc::now()))
}

/// Maps a shared validation message onto a field error
pub(crate) fn field_error(field: &'static str) -> impl Fn(&'static str) -> AppError {
    move |message| AppError::validation(field, message)
}
