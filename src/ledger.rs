//! Operation lifecycle: agents record work as `pending`, admins validate or
//! reject it, and agent removal keeps billed history consistent.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    auth::{require_role, Principal},
    error::{AppError, AppResult},
    models::{
        NewOperation, Operation, OperationDetail, OperationFilter, OperationStatus, Role, Verdict,
    },
    store::Store,
};

/// Caller input for a new operation. Prices and references are trusted; the
/// store's foreign keys are the only check on ids.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub service_id: i64,
    pub client_id: Option<i64>,
    pub price_charged: f64,
    pub notes: Option<String>,
    pub service_date: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct OperationLedger {
    store: Arc<dyn Store>,
}

impl OperationLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn record_operation(
        &self,
        principal: &Principal,
        request: OperationRequest,
    ) -> AppResult<Operation> {
        let client_id = match request.client_id {
            Some(client_id) => client_id,
            None => {
                self.store
                    .find_walk_in_client()
                    .await?
                    .ok_or_else(|| AppError::NotFound("Walk-in client is missing".to_string()))?
                    .id
            }
        };

        let notes = request
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());

        let operation = NewOperation {
            service_id: request.service_id,
            agent_id: principal.id,
            client_id,
            price_charged: request.price_charged,
            notes,
            service_date: request.service_date.unwrap_or_else(Utc::now),
        };
        let id = self.store.insert_operation(&operation).await?;
        log::info!(
            "{} recorded operation {} (service {}, client {}, {:.2})",
            principal.name,
            id,
            operation.service_id,
            operation.client_id,
            operation.price_charged
        );

        self.find(id).await
    }

    pub async fn list_pending(&self, principal: &Principal) -> AppResult<Vec<OperationDetail>> {
        require_role(principal, Role::Admin)?;
        let filter = OperationFilter {
            status: Some(OperationStatus::Pending),
            ..OperationFilter::default()
        };
        Ok(self.store.list_operations(&filter).await?)
    }

    /// Overwrites status and validation date; repeating a verdict is allowed.
    pub async fn transition(
        &self,
        principal: &Principal,
        operation_id: i64,
        verdict: Verdict,
    ) -> AppResult<Operation> {
        require_role(principal, Role::Admin)?;
        let status = OperationStatus::from(verdict);
        let updated = self
            .store
            .set_operation_status(operation_id, status, Utc::now())
            .await?;
        if !updated {
            return Err(AppError::NotFound(format!("Operation {operation_id} not found")));
        }
        log::info!("{} marked operation {} as {}", principal.name, operation_id, status);

        self.find(operation_id).await
    }

    /// Only agents without billed history can be deleted; their clients
    /// become unowned.
    pub async fn delete_user(&self, principal: &Principal, user_id: i64) -> AppResult<()> {
        require_role(principal, Role::Admin)?;
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

        if user.is_admin() {
            return Err(AppError::Conflict("Administrators cannot be deleted".to_string()));
        }

        let history = self.store.count_operations_for_agent(user_id).await?;
        if history > 0 {
            return Err(AppError::Conflict(format!(
                "User has {history} recorded operation(s); block the account instead"
            )));
        }

        if !self.store.delete_user(user_id).await? {
            return Err(AppError::NotFound(format!("User {user_id} not found")));
        }
        log::info!("{} deleted user {} ({})", principal.name, user_id, user.account_name);
        Ok(())
    }

    /// Blocks the agent and purges its operations in a single transaction.
    pub async fn block_and_wipe(&self, principal: &Principal, user_id: i64) -> AppResult<u64> {
        require_role(principal, Role::Admin)?;
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

        if user.is_admin() {
            return Err(AppError::Conflict("Administrators cannot be wiped".to_string()));
        }

        let removed = self.store.block_and_wipe(user_id).await.map_err(|err| {
            log::error!("Block and wipe of user {user_id} rolled back: {err}");
            err
        })?;
        log::info!(
            "{} blocked user {} and removed {} operation(s)",
            principal.name,
            user_id,
            removed
        );
        Ok(removed)
    }

    async fn find(&self, operation_id: i64) -> AppResult<Operation> {
        self.store
            .find_operation(operation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Operation {operation_id} not found")))
    }
}
