//! Caller identity and the role permission table

use serde::{Deserialize, Serialize};
use uuid::Uuid;

closed_enum! {
    pub enum Role: "user_role" {
        SuperAdmin => "SUPER_ADMIN",
        CompanyAdmin => "COMPANY_ADMIN",
        WarehouseManager => "WAREHOUSE_MANAGER",
        InventoryManager => "INVENTORY_MANAGER",
        Picker => "PICKER",
        Packer => "PACKER",
        Viewer => "VIEWER",
    }
}

/// Operations the core authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewInventory,
    ManageStock,
    AdjustStock,
    CountStock,
    ReconcileCount,
    ViewReplenishment,
    ManageReplenishment,
    ManagePurchasing,
    ReceiveGoods,
    ViewOperations,
    CreateOrder,
    ManageOrders,
    AssignWork,
    Pick,
    Pack,
    ManageShipments,
    ManageReturns,
}

impl Role {
    /// The single permission table for every core operation
    pub fn allows(&self, action: Action) -> bool {
        use Action::*;

        match self {
            Role::SuperAdmin | Role::CompanyAdmin => true,
            Role::WarehouseManager => matches!(
                action,
                ViewInventory
                    | ViewReplenishment
                    | ViewOperations
                    | ManageStock
                    | CountStock
                    | ManageReplenishment
                    | ManagePurchasing
                    | ReceiveGoods
                    | CreateOrder
                    | ManageOrders
                    | AssignWork
                    | Pick
                    | Pack
                    | ManageShipments
                    | ManageReturns
            ),
            Role::InventoryManager => matches!(
                action,
                ViewInventory
                    | ViewReplenishment
                    | ManageStock
                    | AdjustStock
                    | CountStock
                    | ReconcileCount
                    | ManageReplenishment
                    | ManagePurchasing
                    | ReceiveGoods
            ),
            Role::Picker => matches!(action, ViewOperations | Pick),
            Role::Packer => matches!(action, ViewOperations | Pack | ManageShipments),
            Role::Viewer => matches!(action, ViewInventory | ViewReplenishment | ViewOperations),
        }
    }

    /// Roles that only ever see their own assigned work
    pub fn is_floor_worker(&self) -> bool {
        matches!(self, Role::Picker | Role::Packer)
    }
}

/// Identity resolved by the upstream auth layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub warehouse_id: Option<Uuid>,
}

impl Identity {
    pub fn new(tenant_id: Uuid, user_id: Uuid, role: Role) -> Self {
        Self {
            tenant_id,
            user_id,
            role,
            warehouse_id: None,
        }
    }

    pub fn with_warehouse(mut self, warehouse_id: Uuid) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }

    pub fn can(&self, action: Action) -> bool {
        self.role.allows(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_can_do_everything() {
        for action in [Action::AdjustStock, Action::Pick, Action::ManageReturns] {
            assert!(Role::SuperAdmin.allows(action));
            assert!(Role::CompanyAdmin.allows(action));
        }
    }

    #[test]
    fn floor_roles_are_narrow() {
        assert!(Role::Picker.allows(Action::Pick));
        assert!(!Role::Picker.allows(Action::Pack));
        assert!(!Role::Picker.allows(Action::AssignWork));
        assert!(Role::Packer.allows(Action::ManageShipments));
        assert!(!Role::Viewer.allows(Action::ManageStock));
    }

    #[test]
    fn role_parses_from_wire_names() {
        assert_eq!("WAREHOUSE_MANAGER".parse::<Role>().unwrap(), Role::WarehouseManager);
        assert_eq!("picker".parse::<Role>().unwrap(), Role::Picker);
        assert!("JANITOR".parse::<Role>().is_err());
    }
}
