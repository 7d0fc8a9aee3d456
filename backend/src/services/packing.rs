//! Packing tasks
//!
//! Completing a task creates the order's shipment once; repeated
//! completion returns the existing task and shipment.

use chrono::Utc;
use serde::Serialize;
use shared::{
    Action, DeliveryStatus, Identity, Lifecycle, OrderStatus, PackingStatus, PackingTask,
    PickListStatus, Shipment,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::orders::advance_order;
use super::picking::AssignInput;
use super::{authorize, eligible_worker, ensure_assignee};
use crate::error::{AppError, AppResult};
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct PackingService {
    store: Arc<dyn Store>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackingResult {
    pub task: PackingTask,
    pub shipment: Option<Shipment>,
}

async fn load(uow: &mut dyn UnitOfWork, tenant_id: Uuid, id: Uuid) -> AppResult<PackingTask> {
    uow.packing_task(tenant_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Packing task"))
}

async fn require_picked(uow: &mut dyn UnitOfWork, task: &PackingTask) -> AppResult<()> {
    let pick_list = uow
        .pick_list(task.tenant_id, task.pick_list_id)
        .await?
        .ok_or_else(|| AppError::not_found("Pick list"))?;

    if pick_list.status != PickListStatus::Picked {
        return Err(AppError::InvalidTransition(format!(
            "packing needs a PICKED pick list, found {}",
            pick_list.status
        )));
    }
    Ok(())
}

impl PackingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Tasks ready for packing, i.e. whose pick list is PICKED. Floor
    /// workers only see their own.
    pub async fn list_packing_tasks(&self, identity: &Identity) -> AppResult<Vec<PackingTask>> {
        authorize(identity, Action::ViewOperations)?;

        let tenant_id = identity.tenant_id;
        let assigned_to = identity
            .role
            .is_floor_worker()
            .then_some(identity.user_id);

        let mut uow = self.store.begin().await?;
        let picked: HashSet<Uuid> = uow
            .pick_lists(tenant_id, None)
            .await?
            .into_iter()
            .filter(|p| p.status == PickListStatus::Picked)
            .map(|p| p.id)
            .collect();

        Ok(uow
            .packing_tasks(tenant_id, assigned_to)
            .await?
            .into_iter()
            .filter(|t| picked.contains(&t.pick_list_id))
            .collect())
    }

    pub async fn get_packing_task(&self, identity: &Identity, id: Uuid) -> AppResult<PackingTask> {
        authorize(identity, Action::ViewOperations)?;

        let mut uow = self.store.begin().await?;
        let task = load(uow.as_mut(), identity.tenant_id, id).await?;
        ensure_assignee(identity, task.assigned_to)?;
        Ok(task)
    }

    pub async fn assign_packer(
        &self,
        identity: &Identity,
        id: Uuid,
        input: AssignInput,
    ) -> AppResult<PackingTask> {
        authorize(identity, Action::AssignWork)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut task = load(uow.as_mut(), tenant_id, id).await?;
        let packer = eligible_worker(uow.as_mut(), tenant_id, input.user_id, Action::Pack).await?;

        task.status = task.status.transition(PackingStatus::Assigned)?;
        task.assigned_to = Some(packer.id);
        task.updated_at = Utc::now();
        uow.save_packing_task(&task).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, packing_task_id = %id, packer = %packer.id, "Packer assigned");
        Ok(task)
    }

    pub async fn start_packing(&self, identity: &Identity, id: Uuid) -> AppResult<PackingTask> {
        authorize(identity, Action::Pack)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut task = load(uow.as_mut(), tenant_id, id).await?;
        ensure_assignee(identity, task.assigned_to)?;
        require_picked(uow.as_mut(), &task).await?;

        task.status = task.status.transition(PackingStatus::Packing)?;
        let now = Utc::now();
        task.started_at = Some(now);
        task.updated_at = now;
        uow.save_packing_task(&task).await?;

        advance_order(
            uow.as_mut(),
            tenant_id,
            task.order_id,
            &[OrderStatus::Picked],
            OrderStatus::PackingInProgress,
        )
        .await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, packing_task_id = %id, "Packing started");
        Ok(task)
    }

    pub async fn hold_packing(&self, identity: &Identity, id: Uuid) -> AppResult<PackingTask> {
        self.move_task(identity, id, PackingStatus::OnHold).await
    }

    pub async fn resume_packing(&self, identity: &Identity, id: Uuid) -> AppResult<PackingTask> {
        self.move_task(identity, id, PackingStatus::Packing).await
    }

    async fn move_task(
        &self,
        identity: &Identity,
        id: Uuid,
        next: PackingStatus,
    ) -> AppResult<PackingTask> {
        authorize(identity, Action::Pack)?;

        let mut uow = self.store.begin().await?;
        let mut task = load(uow.as_mut(), identity.tenant_id, id).await?;
        ensure_assignee(identity, task.assigned_to)?;

        task.status = task.status.transition(next)?;
        task.updated_at = Utc::now();
        uow.save_packing_task(&task).await?;
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, packing_task_id = %id, status = %task.status, "Packing task updated");
        Ok(task)
    }

    /// Marks the task PACKED, the order PACKED and opens a READY_TO_SHIP
    /// shipment
    pub async fn complete_packing(&self, identity: &Identity, id: Uuid) -> AppResult<PackingResult> {
        authorize(identity, Action::Pack)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut task = load(uow.as_mut(), tenant_id, id).await?;
        ensure_assignee(identity, task.assigned_to)?;

        if task.status == PackingStatus::Packed {
            debug!(packing_task_id = %id, "Packing task already completed");
            let shipment = uow.shipment_for_order(tenant_id, task.order_id).await?;
            return Ok(PackingResult { task, shipment });
        }

        require_picked(uow.as_mut(), &task).await?;
        task.status = task.status.transition(PackingStatus::Packed)?;

        let now = Utc::now();
        task.started_at.get_or_insert(now);
        task.completed_at = Some(now);
        task.updated_at = now;
        uow.save_packing_task(&task).await?;

        let order = advance_order(
            uow.as_mut(),
            tenant_id,
            task.order_id,
            &[OrderStatus::Picked, OrderStatus::PackingInProgress],
            OrderStatus::Packed,
        )
        .await?;

        let shipment = match uow.shipment_for_order(tenant_id, order.id).await? {
            Some(existing) => existing,
            None => {
                let shipment = Shipment {
                    id: Uuid::new_v4(),
                    tenant_id,
                    order_id: order.id,
                    packing_task_id: Some(task.id),
                    courier: None,
                    tracking_number: None,
                    weight: None,
                    dispatch_date: None,
                    delivery_status: DeliveryStatus::ReadyToShip,
                    stock_deducted: false,
                    created_by: identity.user_id,
                    created_at: now,
                    updated_at: now,
                };
                uow.save_shipment(&shipment).await?;
                shipment
            }
        };
        uow.commit().await?;

        info!(
            tenant_id = %tenant_id,
            packing_task_id = %id,
            order = %order.order_number,
            shipment_id = %shipment.id,
            "Packing completed"
        );
        Ok(PackingResult {
            task,
            shipment: Some(shipment),
        })
    }

    /// Returns the task to NOT_STARTED without an assignee; an order in
    /// PACKING_IN_PROGRESS goes back to PICKED
    pub async fn reject_packing_assignment(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> AppResult<PackingTask> {
        authorize(identity, Action::Pack)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut task = load(uow.as_mut(), tenant_id, id).await?;
        ensure_assignee(identity, task.assigned_to)?;

        task.status = task.status.transition(PackingStatus::NotStarted)?;
        task.assigned_to = None;
        task.started_at = None;
        task.updated_at = Utc::now();
        uow.save_packing_task(&task).await?;

        advance_order(
            uow.as_mut(),
            tenant_id,
            task.order_id,
            &[OrderStatus::PackingInProgress],
            OrderStatus::Picked,
        )
        .await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, packing_task_id = %id, "Packing assignment rejected");
        Ok(task)
    }
}
