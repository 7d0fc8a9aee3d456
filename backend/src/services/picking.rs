//! Pick lists
//!
//! Completing a pick list is idempotent: a second call returns the settled
//! list without touching anything.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{
    validate_picked_quantity, Action, Identity, Lifecycle, OrderStatus, PickList, PickListItem,
    PickListStatus,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::orders::{advance_order, new_packing_task};
use super::{authorize, eligible_worker, ensure_assignee, field_error};
use crate::error::{AppError, AppResult};
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct PickingService {
    store: Arc<dyn Store>,
}

#[derive(Debug, Deserialize)]
pub struct AssignInput {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PickedQuantityInput {
    pub quantity_picked: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PickListDetail {
    #[serde(flatten)]
    pub pick_list: PickList,
    pub items: Vec<PickListItem>,
}

async fn load(uow: &mut dyn UnitOfWork, tenant_id: Uuid, id: Uuid) -> AppResult<PickList> {
    uow.pick_list(tenant_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Pick list"))
}

async fn detail(uow: &mut dyn UnitOfWork, pick_list: PickList) -> AppResult<PickListDetail> {
    let items = uow.pick_list_items(pick_list.id).await?;
    Ok(PickListDetail { pick_list, items })
}

/// First recorded progress moves the list into PARTIALLY_PICKED
fn mark_started(pick_list: &mut PickList) -> AppResult<()> {
    if pick_list.status != PickListStatus::PartiallyPicked {
        pick_list.status = pick_list.status.transition(PickListStatus::PartiallyPicked)?;
    }
    pick_list.started_at.get_or_insert_with(Utc::now);
    Ok(())
}

impl PickingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Pickers and packers only see lists assigned to them
    pub async fn list_pick_lists(&self, identity: &Identity) -> AppResult<Vec<PickList>> {
        authorize(identity, Action::ViewOperations)?;

        let assigned_to = identity
            .role
            .is_floor_worker()
            .then_some(identity.user_id);

        let mut uow = self.store.begin().await?;
        uow.pick_lists(identity.tenant_id, assigned_to).await
    }

    pub async fn get_pick_list(&self, identity: &Identity, id: Uuid) -> AppResult<PickListDetail> {
        authorize(identity, Action::ViewOperations)?;

        let mut uow = self.store.begin().await?;
        let pick_list = load(uow.as_mut(), identity.tenant_id, id).await?;
        ensure_assignee(identity, pick_list.assigned_to)?;

        detail(uow.as_mut(), pick_list).await
    }

    /// Assigns (or reassigns) a picker from the caller's tenant
    pub async fn assign_picker(
        &self,
        identity: &Identity,
        id: Uuid,
        input: AssignInput,
    ) -> AppResult<PickListDetail> {
        authorize(identity, Action::AssignWork)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut pick_list = load(uow.as_mut(), tenant_id, id).await?;
        let picker = eligible_worker(uow.as_mut(), tenant_id, input.user_id, Action::Pick).await?;

        pick_list.status = pick_list.status.transition(PickListStatus::Assigned)?;
        pick_list.assigned_to = Some(picker.id);
        pick_list.updated_at = Utc::now();
        uow.save_pick_list(&pick_list).await?;

        advance_order(
            uow.as_mut(),
            tenant_id,
            pick_list.order_id,
            &[OrderStatus::Confirmed],
            OrderStatus::PickingInProgress,
        )
        .await?;

        let detail = detail(uow.as_mut(), pick_list).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, pick_list_id = %id, picker = %picker.id, "Picker assigned");
        Ok(detail)
    }

    pub async fn start_picking(&self, identity: &Identity, id: Uuid) -> AppResult<PickListDetail> {
        authorize(identity, Action::Pick)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut pick_list = load(uow.as_mut(), tenant_id, id).await?;
        ensure_assignee(identity, pick_list.assigned_to)?;

        pick_list.status = pick_list.status.transition(PickListStatus::PartiallyPicked)?;
        pick_list.started_at = Some(Utc::now());
        pick_list.updated_at = Utc::now();
        uow.save_pick_list(&pick_list).await?;

        advance_order(
            uow.as_mut(),
            tenant_id,
            pick_list.order_id,
            &[OrderStatus::Confirmed],
            OrderStatus::PickingInProgress,
        )
        .await?;

        let detail = detail(uow.as_mut(), pick_list).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, pick_list_id = %id, "Picking started");
        Ok(detail)
    }

    /// Records the quantity picked so far for one item
    pub async fn update_picked_quantity(
        &self,
        identity: &Identity,
        id: Uuid,
        item_id: Uuid,
        input: PickedQuantityInput,
    ) -> AppResult<PickListDetail> {
        authorize(identity, Action::Pick)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut pick_list = load(uow.as_mut(), tenant_id, id).await?;
        ensure_assignee(identity, pick_list.assigned_to)?;

        if pick_list.status == PickListStatus::Picked {
            return Err(AppError::InvalidTransition(
                "pick list is already PICKED".to_string(),
            ));
        }

        let mut item = uow
            .pick_list_items(pick_list.id)
            .await?
            .into_iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| AppError::not_found("Pick list item"))?;

        validate_picked_quantity(input.quantity_picked, item.quantity_required)
            .map_err(field_error("quantity_picked"))?;
        item.quantity_picked = input.quantity_picked;
        uow.save_pick_list_item(&item).await?;

        mark_started(&mut pick_list)?;
        pick_list.updated_at = Utc::now();
        uow.save_pick_list(&pick_list).await?;

        advance_order(
            uow.as_mut(),
            tenant_id,
            pick_list.order_id,
            &[OrderStatus::Confirmed],
            OrderStatus::PickingInProgress,
        )
        .await?;

        let detail = detail(uow.as_mut(), pick_list).await?;
        uow.commit().await?;

        debug!(pick_list_id = %id, item_id = %item_id, picked = item.quantity_picked, "Pick quantity recorded");
        Ok(detail)
    }

    /// Marks every item fully picked and moves the order to PICKED
    pub async fn complete_picking(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> AppResult<PickListDetail> {
        authorize(identity, Action::Pick)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut pick_list = load(uow.as_mut(), tenant_id, id).await?;
        ensure_assignee(identity, pick_list.assigned_to)?;

        if pick_list.status == PickListStatus::Picked {
            debug!(pick_list_id = %id, "Pick list already completed");
            return detail(uow.as_mut(), pick_list).await;
        }

        pick_list.status = pick_list.status.transition(PickListStatus::Picked)?;

        for mut item in uow.pick_list_items(pick_list.id).await? {
            if !item.is_complete() {
                item.quantity_picked = item.quantity_required;
                uow.save_pick_list_item(&item).await?;
            }
        }

        let now = Utc::now();
        pick_list.started_at.get_or_insert(now);
        pick_list.completed_at = Some(now);
        pick_list.updated_at = now;
        uow.save_pick_list(&pick_list).await?;

        let order = advance_order(
            uow.as_mut(),
            tenant_id,
            pick_list.order_id,
            &[OrderStatus::Confirmed, OrderStatus::PickingInProgress],
            OrderStatus::Picked,
        )
        .await?;

        if uow
            .packing_task_for_pick_list(tenant_id, pick_list.id)
            .await?
            .is_none()
        {
            let task = new_packing_task(&order, &pick_list);
            uow.save_packing_task(&task).await?;
        }

        let detail = detail(uow.as_mut(), pick_list).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, pick_list_id = %id, order = %order.order_number, "Picking completed");
        Ok(detail)
    }

    /// Hands the list back: no assignee, NOT_STARTED, order back to
    /// CONFIRMED
    pub async fn reject_assignment(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> AppResult<PickListDetail> {
        authorize(identity, Action::Pick)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut pick_list = load(uow.as_mut(), tenant_id, id).await?;
        ensure_assignee(identity, pick_list.assigned_to)?;

        pick_list.status = pick_list.status.transition(PickListStatus::NotStarted)?;
        pick_list.assigned_to = None;
        pick_list.started_at = None;
        pick_list.updated_at = Utc::now();
        uow.save_pick_list(&pick_list).await?;

        for mut item in uow.pick_list_items(pick_list.id).await? {
            if item.quantity_picked != 0 {
                item.quantity_picked = 0;
                uow.save_pick_list_item(&item).await?;
            }
        }

        advance_order(
            uow.as_mut(),
            tenant_id,
            pick_list.order_id,
            &[OrderStatus::PickingInProgress],
            OrderStatus::Confirmed,
        )
        .await?;

        let detail = detail(uow.as_mut(), pick_list).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, pick_list_id = %id, "Pick assignment rejected");
        Ok(detail)
    }
}
