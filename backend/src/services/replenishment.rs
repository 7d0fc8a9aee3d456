//! Replenishment engine
//!
//! Evaluates reorder thresholds against ledger totals and turns the
//! resulting suggestions into bulk-to-pick transfer tasks.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{
    validate_quantity, validate_thresholds, Action, ConfigStatus, Identity, Lifecycle, Location,
    LocationType, Movement, MovementType, Priority, ReplenishmentConfig, ReplenishmentSuggestion,
    ReplenishmentTask, ReplenishmentTaskStatus, SequenceKind,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{authorize, field_error, ledger, next_number};
use crate::error::{AppError, AppResult};
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct ReplenishmentService {
    store: Arc<dyn Store>,
}

/// Input for creating a replenishment config
#[derive(Debug, Deserialize)]
pub struct CreateConfigInput {
    pub product_id: Uuid,
    #[serde(default)]
    pub min_stock_level: i64,
    #[serde(default)]
    pub max_stock_level: i64,
    #[serde(default)]
    pub reorder_point: i64,
    #[serde(default)]
    pub reorder_quantity: i64,
    pub auto_create_tasks: Option<bool>,
    pub status: Option<ConfigStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateConfigInput {
    pub min_stock_level: Option<i64>,
    pub max_stock_level: Option<i64>,
    pub reorder_point: Option<i64>,
    pub reorder_quantity: Option<i64>,
    pub auto_create_tasks: Option<bool>,
    pub status: Option<ConfigStatus>,
}

/// Input for a manually created task
#[derive(Debug, Deserialize)]
pub struct CreateTaskInput {
    pub product_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub quantity_needed: i64,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskInput {
    pub quantity_needed: Option<i64>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MaterializeInput {
    pub suggestions: Vec<ReplenishmentSuggestion>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub status: Option<ReplenishmentTaskStatus>,
}

/// Outcome of one evaluate-and-materialize pass
#[derive(Debug, Clone, Serialize)]
pub struct AutoCheckResult {
    pub suggestions: Vec<ReplenishmentSuggestion>,
    pub tasks: Vec<ReplenishmentTask>,
}

/// Suggestions for every active auto config whose product sits below its
/// reorder point across all tenant warehouses
async fn evaluate_in(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
) -> AppResult<Vec<ReplenishmentSuggestion>> {
    let configs = uow.replenishment_configs(tenant_id).await?;
    let mut suggestions = Vec::new();

    for config in configs
        .into_iter()
        .filter(|c| c.status == ConfigStatus::Active && c.auto_create_tasks)
    {
        let available =
            ledger::total_available(uow, tenant_id, config.product_id, None).await?;

        if config.is_triggered(available) {
            suggestions.push(ReplenishmentSuggestion {
                product_id: config.product_id,
                available,
                reorder_point: config.reorder_point,
                reorder_quantity: config.reorder_quantity,
                quantity: config.quantity_for(available),
            });
        }
    }

    Ok(suggestions)
}

/// Source: the BULK location holding the most available stock of the
/// product, else any location holding stock, else the first BULK location.
/// Destination: the lowest-sequence PICK location other than the source,
/// same warehouse first, else any other location.
async fn choose_locations(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    product_id: Uuid,
    locations: &[Location],
) -> AppResult<Option<(Location, Location)>> {
    let stocked: HashMap<Uuid, i64> = uow
        .stock_for_product(tenant_id, product_id, None)
        .await?
        .into_iter()
        .filter(|r| r.available() > 0)
        .filter_map(|r| r.location_id.map(|l| (l, r.available())))
        .fold(HashMap::new(), |mut acc, (l, qty)| {
            *acc.entry(l).or_insert(0) += qty;
            acc
        });

    let richest = |only_bulk: bool| {
        locations
            .iter()
            .filter(|l| !only_bulk || l.location_type == LocationType::Bulk)
            .filter_map(|l| stocked.get(&l.id).map(|qty| (l, *qty)))
            .max_by_key(|(_, qty)| *qty)
            .map(|(l, _)| l)
    };

    let source = richest(true)
        .or_else(|| richest(false))
        .or_else(|| locations.iter().find(|l| l.location_type == LocationType::Bulk));

    let Some(source) = source else {
        return Ok(None);
    };

    let destination = locations
        .iter()
        .filter(|l| l.id != source.id && l.location_type == LocationType::Pick)
        .min_by_key(|l| (l.warehouse_id != source.warehouse_id, l.pick_sequence))
        .or_else(|| {
            locations
                .iter()
                .filter(|l| l.id != source.id)
                .min_by_key(|l| (l.warehouse_id != source.warehouse_id, l.pick_sequence))
        });

    Ok(destination.map(|d| (source.clone(), d.clone())))
}

/// One task per suggestion, skipping products that already have an open
/// task and suggestions with nothing to move
async fn materialize_in(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    created_by: Option<Uuid>,
    suggestions: &[ReplenishmentSuggestion],
) -> AppResult<Vec<ReplenishmentTask>> {
    let open: HashSet<Uuid> = uow
        .replenishment_tasks(tenant_id, None)
        .await?
        .into_iter()
        .filter(|t| t.status.is_open())
        .map(|t| t.product_id)
        .collect();

    let pending: Vec<&ReplenishmentSuggestion> = suggestions
        .iter()
        .filter(|s| s.quantity > 0 && !open.contains(&s.product_id))
        .collect();
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let locations = uow.locations(tenant_id).await?;
    if locations.len() < 2 {
        return Err(AppError::NoEligibleLocations);
    }

    let mut tasks = Vec::with_capacity(pending.len());
    let mut seen = HashSet::new();

    for suggestion in pending {
        if !seen.insert(suggestion.product_id) {
            continue;
        }
        uow.product(tenant_id, suggestion.product_id)
            .await?
            .ok_or_else(|| AppError::validation("suggestions", "Unknown product in suggestion"))?;

        let (source, destination) =
            choose_locations(uow, tenant_id, suggestion.product_id, &locations)
                .await?
                .ok_or(AppError::NoEligibleLocations)?;

        let priority = if suggestion.available <= 0 {
            Priority::High
        } else {
            Priority::Medium
        };

        let now = Utc::now();
        let task = ReplenishmentTask {
            id: Uuid::new_v4(),
            tenant_id,
            task_number: next_number(uow, tenant_id, SequenceKind::ReplenishmentTask).await?,
            product_id: suggestion.product_id,
            from_location_id: source.id,
            to_location_id: destination.id,
            quantity_needed: suggestion.quantity,
            quantity_completed: 0,
            priority,
            status: ReplenishmentTaskStatus::Pending,
            notes: Some(format!(
                "Auto-generated: available {} below reorder point {}",
                suggestion.available, suggestion.reorder_point
            )),
            created_by,
            completed_by: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        uow.save_replenishment_task(&task).await?;
        tasks.push(task);
    }

    Ok(tasks)
}

impl ReplenishmentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // ------------------------------------------------------------------
    // Configs
    // ------------------------------------------------------------------

    pub async fn create_config(
        &self,
        identity: &Identity,
        input: CreateConfigInput,
    ) -> AppResult<ReplenishmentConfig> {
        authorize(identity, Action::ManageReplenishment)?;
        validate_thresholds(
            input.min_stock_level,
            input.max_stock_level,
            input.reorder_point,
            input.reorder_quantity,
        )
        .map_err(field_error("thresholds"))?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;

        uow.product(tenant_id, input.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        if uow
            .replenishment_config_for_product(tenant_id, input.product_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(
                "product_id",
                "A replenishment config already exists for this product",
            ));
        }

        let now = Utc::now();
        let config = ReplenishmentConfig {
            id: Uuid::new_v4(),
            tenant_id,
            product_id: input.product_id,
            min_stock_level: input.min_stock_level,
            max_stock_level: input.max_stock_level,
            reorder_point: input.reorder_point,
            reorder_quantity: input.reorder_quantity,
            auto_create_tasks: input.auto_create_tasks.unwrap_or(true),
            status: input.status.unwrap_or(ConfigStatus::Active),
            created_at: now,
            updated_at: now,
        };
        uow.save_replenishment_config(&config).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, config_id = %config.id, product_id = %config.product_id, "Replenishment config created");
        Ok(config)
    }

    pub async fn update_config(
        &self,
        identity: &Identity,
        id: Uuid,
        input: UpdateConfigInput,
    ) -> AppResult<ReplenishmentConfig> {
        authorize(identity, Action::ManageReplenishment)?;

        let mut uow = self.store.begin().await?;
        let mut config = uow
            .replenishment_config(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Replenishment config"))?;

        config.min_stock_level = input.min_stock_level.unwrap_or(config.min_stock_level);
        config.max_stock_level = input.max_stock_level.unwrap_or(config.max_stock_level);
        config.reorder_point = input.reorder_point.unwrap_or(config.reorder_point);
        config.reorder_quantity = input.reorder_quantity.unwrap_or(config.reorder_quantity);
        config.auto_create_tasks = input.auto_create_tasks.unwrap_or(config.auto_create_tasks);
        config.status = input.status.unwrap_or(config.status);
        shared::validate_config(&config).map_err(field_error("thresholds"))?;

        config.updated_at = Utc::now();
        uow.save_replenishment_config(&config).await?;
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, config_id = %id, "Replenishment config updated");
        Ok(config)
    }

    pub async fn delete_config(&self, identity: &Identity, id: Uuid) -> AppResult<()> {
        authorize(identity, Action::ManageReplenishment)?;

        let mut uow = self.store.begin().await?;
        if !uow.delete_replenishment_config(identity.tenant_id, id).await? {
            return Err(AppError::not_found("Replenishment config"));
        }
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, config_id = %id, "Replenishment config deleted");
        Ok(())
    }

    pub async fn get_config(&self, identity: &Identity, id: Uuid) -> AppResult<ReplenishmentConfig> {
        authorize(identity, Action::ViewReplenishment)?;

        let mut uow = self.store.begin().await?;
        uow.replenishment_config(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Replenishment config"))
    }

    pub async fn list_configs(&self, identity: &Identity) -> AppResult<Vec<ReplenishmentConfig>> {
        authorize(identity, Action::ViewReplenishment)?;

        let mut uow = self.store.begin().await?;
        uow.replenishment_configs(identity.tenant_id).await
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    pub async fn evaluate(&self, identity: &Identity) -> AppResult<Vec<ReplenishmentSuggestion>> {
        authorize(identity, Action::ViewReplenishment)?;

        let mut uow = self.store.begin().await?;
        evaluate_in(uow.as_mut(), identity.tenant_id).await
    }

    pub async fn materialize(
        &self,
        identity: &Identity,
        input: MaterializeInput,
    ) -> AppResult<Vec<ReplenishmentTask>> {
        authorize(identity, Action::ManageReplenishment)?;

        let mut uow = self.store.begin().await?;
        let tasks = materialize_in(
            uow.as_mut(),
            identity.tenant_id,
            Some(identity.user_id),
            &input.suggestions,
        )
        .await?;
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, created = tasks.len(), "Replenishment tasks materialized");
        Ok(tasks)
    }

    /// Evaluate and materialize in one scope
    pub async fn run_auto_check(&self, identity: &Identity) -> AppResult<AutoCheckResult> {
        authorize(identity, Action::ManageReplenishment)?;

        let mut uow = self.store.begin().await?;
        let suggestions = evaluate_in(uow.as_mut(), identity.tenant_id).await?;
        let tasks = materialize_in(
            uow.as_mut(),
            identity.tenant_id,
            Some(identity.user_id),
            &suggestions,
        )
        .await?;
        uow.commit().await?;

        info!(
            tenant_id = %identity.tenant_id,
            suggestions = suggestions.len(),
            created = tasks.len(),
            "Replenishment auto-check finished"
        );
        Ok(AutoCheckResult { suggestions, tasks })
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    pub async fn create_task(
        &self,
        identity: &Identity,
        input: CreateTaskInput,
    ) -> AppResult<ReplenishmentTask> {
        authorize(identity, Action::ManageReplenishment)?;
        validate_quantity(input.quantity_needed).map_err(field_error("quantity_needed"))?;
        if input.from_location_id == input.to_location_id {
            return Err(AppError::validation(
                "to_location_id",
                "Source and destination must differ",
            ));
        }

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;

        uow.product(tenant_id, input.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;
        for location_id in [input.from_location_id, input.to_location_id] {
            uow.location(tenant_id, location_id)
                .await?
                .ok_or_else(|| AppError::not_found("Location"))?;
        }

        let now = Utc::now();
        let task = ReplenishmentTask {
            id: Uuid::new_v4(),
            tenant_id,
            task_number: next_number(uow.as_mut(), tenant_id, SequenceKind::ReplenishmentTask)
                .await?,
            product_id: input.product_id,
            from_location_id: input.from_location_id,
            to_location_id: input.to_location_id,
            quantity_needed: input.quantity_needed,
            quantity_completed: 0,
            priority: input.priority.unwrap_or_default(),
            status: ReplenishmentTaskStatus::Pending,
            notes: input.notes,
            created_by: Some(identity.user_id),
            completed_by: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        uow.save_replenishment_task(&task).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, task = %task.task_number, "Replenishment task created");
        Ok(task)
    }

    /// Edits quantity, priority or notes while the task is still PENDING
    pub async fn update_task(
        &self,
        identity: &Identity,
        id: Uuid,
        input: UpdateTaskInput,
    ) -> AppResult<ReplenishmentTask> {
        authorize(identity, Action::ManageReplenishment)?;

        let mut uow = self.store.begin().await?;
        let mut task = uow
            .replenishment_task(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Replenishment task"))?;

        if task.status != ReplenishmentTaskStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "replenishment task can only be edited while PENDING, not {}",
                task.status
            )));
        }

        if let Some(quantity) = input.quantity_needed {
            validate_quantity(quantity).map_err(field_error("quantity_needed"))?;
            task.quantity_needed = quantity;
        }
        task.priority = input.priority.unwrap_or(task.priority);
        if input.notes.is_some() {
            task.notes = input.notes;
        }
        task.updated_at = Utc::now();
        uow.save_replenishment_task(&task).await?;
        uow.commit().await?;

        Ok(task)
    }

    pub async fn start_task(&self, identity: &Identity, id: Uuid) -> AppResult<ReplenishmentTask> {
        self.move_task(identity, id, ReplenishmentTaskStatus::InProgress)
            .await
    }

    pub async fn cancel_task(&self, identity: &Identity, id: Uuid) -> AppResult<ReplenishmentTask> {
        self.move_task(identity, id, ReplenishmentTaskStatus::Cancelled)
            .await
    }

    async fn move_task(
        &self,
        identity: &Identity,
        id: Uuid,
        next: ReplenishmentTaskStatus,
    ) -> AppResult<ReplenishmentTask> {
        authorize(identity, Action::ManageReplenishment)?;

        let mut uow = self.store.begin().await?;
        let mut task = uow
            .replenishment_task(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Replenishment task"))?;

        task.status = task.status.transition(next)?;
        task.updated_at = Utc::now();
        uow.save_replenishment_task(&task).await?;
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, task = %task.task_number, status = %task.status, "Replenishment task updated");
        Ok(task)
    }

    /// Transfers the task quantity from its source to its destination.
    ///
    /// Completing a COMPLETED task returns it unchanged without moving
    /// stock again; a CANCELLED task cannot be completed.
    pub async fn complete_task(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> AppResult<ReplenishmentTask> {
        authorize(identity, Action::ManageReplenishment)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut task = uow
            .replenishment_task(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Replenishment task"))?;

        if task.status == ReplenishmentTaskStatus::Completed {
            debug!(task = %task.task_number, "Replenishment task already completed");
            return Ok(task);
        }
        task.status = task.status.transition(ReplenishmentTaskStatus::Completed)?;

        let drawn = ledger::transfer_between_locations(
            uow.as_mut(),
            tenant_id,
            task.product_id,
            task.from_location_id,
            task.to_location_id,
            task.quantity_needed,
        )
        .await?;

        // one movement per batch drawn
        for share in drawn {
            let batch_id = match share.batch_number.as_deref() {
                Some(number) => uow
                    .batch_by_number(tenant_id, task.product_id, number)
                    .await?
                    .map(|b| b.id),
                None => None,
            };
            let movement = Movement::new(
                tenant_id,
                MovementType::Transfer,
                task.product_id,
                share.quantity,
                identity.user_id,
            )
            .batch(batch_id)
            .from(Some(task.from_location_id))
            .to(Some(task.to_location_id))
            .reason("Replenishment")
            .reference("replenishment_task", task.id);
            uow.insert_movement(&movement).await?;
        }

        let now = Utc::now();
        task.quantity_completed = task.quantity_needed;
        task.completed_by = Some(identity.user_id);
        task.completed_at = Some(now);
        task.updated_at = now;
        uow.save_replenishment_task(&task).await?;
        uow.commit().await?;

        info!(
            tenant_id = %tenant_id,
            task = %task.task_number,
            quantity = task.quantity_completed,
            "Replenishment task completed"
        );
        Ok(task)
    }

    pub async fn list_tasks(
        &self,
        identity: &Identity,
        query: TaskQuery,
    ) -> AppResult<Vec<ReplenishmentTask>> {
        authorize(identity, Action::ViewReplenishment)?;

        let mut uow = self.store.begin().await?;
        uow.replenishment_tasks(identity.tenant_id, query.status).await
    }

    pub async fn get_task(&self, identity: &Identity, id: Uuid) -> AppResult<ReplenishmentTask> {
        authorize(identity, Action::ViewReplenishment)?;

        let mut uow = self.store.begin().await?;
        uow.replenishment_task(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Replenishment task"))
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Runs evaluate+materialize for every tenant with auto configs. Each
/// tenant gets its own scope; one tenant failing does not stop the rest.
/// Returns the number of tasks created.
pub async fn run_scheduled_pass(store: &dyn Store) -> AppResult<usize> {
    let tenants = {
        let mut uow = store.begin().await?;
        uow.tenants_with_auto_replenishment().await?
    };

    let mut created = 0;
    for tenant_id in tenants {
        let result = async {
            let mut uow = store.begin().await?;
            let suggestions = evaluate_in(uow.as_mut(), tenant_id).await?;
            let tasks = materialize_in(uow.as_mut(), tenant_id, None, &suggestions).await?;
            uow.commit().await?;
            Ok::<usize, AppError>(tasks.len())
        }
        .await;

        match result {
            Ok(count) => {
                if count > 0 {
                    info!(tenant_id = %tenant_id, created = count, "Scheduled replenishment created tasks");
                }
                created += count;
            }
            Err(err) => warn!(tenant_id = %tenant_id, error = %err, "Scheduled replenishment skipped"),
        }
    }

    Ok(created)
}

/// Spawns the periodic replenishment loop
pub fn spawn_scheduler(store: Arc<dyn Store>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(err) = run_scheduled_pass(store.as_ref()).await {
                warn!(error = %err, "Replenishment scheduler pass failed");
            }
        }
    })
}
