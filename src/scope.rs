//! Row visibility per principal: admins read everything, agents read what
//! they own.

use std::sync::Arc;

use crate::{
    auth::Principal,
    error::AppResult,
    models::{Client, DateRange, OperationDetail, OperationFilter, Service},
    store::Store,
};

#[derive(Clone)]
pub struct AccessScope {
    store: Arc<dyn Store>,
}

impl AccessScope {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn visible_clients(&self, principal: &Principal) -> AppResult<Vec<Client>> {
        let owner = if principal.is_admin() {
            None
        } else {
            Some(principal.id)
        };
        Ok(self.store.list_clients(owner).await?)
    }

    /// The caller's own operations in every status, whatever their role.
    pub async fn visible_operations_for_history(
        &self,
        principal: &Principal,
        range: DateRange,
    ) -> AppResult<Vec<OperationDetail>> {
        let filter = OperationFilter {
            status: None,
            agent_id: Some(principal.id),
            range,
        };
        Ok(self.store.list_operations(&filter).await?)
    }

    /// Agents without assignments see the full catalog.
    pub async fn visible_services(&self, principal: &Principal) -> AppResult<Vec<Service>> {
        if principal.is_admin() {
            return Ok(self.store.list_services().await?);
        }

        let assigned = self.store.assigned_services(principal.id).await?;
        if assigned.is_empty() {
            return Ok(self.store.list_services().await?);
        }
        Ok(assigned)
    }
}
