//! Admin-managed records around the ledger: agent accounts, the service
//! catalog and client files.

use std::sync::Arc;

use serde::Deserialize;

use crate::{
    auth::{hash_password, require_role, Principal},
    error::{AppError, AppResult},
    models::{
        LoginField, NewClient, NewService, NewUser, Role, Service, User, UserStatus, UserSummary,
        DEFAULT_COMMISSION_RATE,
    },
    store::Store,
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub account_name: String,
    pub password: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub commission_rate: Option<f64>,
    #[serde(default)]
    pub service_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientRequest {
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn Store>,
}

impl Directory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_users(&self, principal: &Principal) -> AppResult<Vec<UserSummary>> {
        require_role(principal, Role::Admin)?;
        let users = self.store.list_users().await?;
        let mut summaries = Vec::with_capacity(users.len());
        for user in users {
            let service_ids = self.store.assigned_service_ids(user.id).await?;
            summaries.push(UserSummary { user, service_ids });
        }
        Ok(summaries)
    }

    /// Creates an agent and its service assignments atomically. The role is
    /// always `agent`; admins only come from bootstrap.
    pub async fn create_agent(
        &self,
        principal: &Principal,
        request: AgentRequest,
    ) -> AppResult<UserSummary> {
        require_role(principal, Role::Admin)?;

        let mut errors = Vec::new();
        if request.name.trim().is_empty() {
            errors.push("Name is required.");
        }
        if request.email.trim().is_empty() {
            errors.push("Email is required.");
        }
        if request.account_name.trim().is_empty() {
            errors.push("Account name is required.");
        }
        if request.password.trim().len() < MIN_PASSWORD_LEN {
            errors.push("Password must be at least 6 characters.");
        }
        if !errors.is_empty() {
            return Err(AppError::BadRequest(errors.join(" ")));
        }

        let email = request.email.trim();
        let account_name = request.account_name.trim();
        let email_taken = self
            .store
            .find_user_by_login(LoginField::Email, email)
            .await?
            .is_some();
        let account_taken = self
            .store
            .find_user_by_login(LoginField::AccountName, account_name)
            .await?
            .is_some();
        if email_taken || account_taken {
            return Err(duplicate_user());
        }

        let password_hash = hash_password(&request.password)
            .map_err(|err| AppError::Internal(format!("password hash failed: {err}")))?;

        let mut service_ids = request.service_ids;
        service_ids.sort_unstable();
        service_ids.dedup();

        let new_user = NewUser {
            name: request.name.trim().to_string(),
            email: email.to_string(),
            phone: request.phone.trim().to_string(),
            account_name: account_name.to_string(),
            password_hash,
            role: Role::Agent,
            specialty: request.specialty.filter(|value| !value.trim().is_empty()),
            commission_rate: request.commission_rate.unwrap_or(DEFAULT_COMMISSION_RATE),
        };

        let id = self
            .store
            .create_user(&new_user, &service_ids)
            .await
            .map_err(|err| match err {
                err if err.is_unique_violation() => duplicate_user(),
                err => AppError::Storage(err),
            })?;
        log::info!("{} created agent {} ({})", principal.name, id, new_user.account_name);

        let user = self.find_user(id).await?;
        let service_ids = self.store.assigned_service_ids(id).await?;
        Ok(UserSummary { user, service_ids })
    }

    /// Block or unblock an agent. Admin accounts cannot be blocked.
    pub async fn set_user_status(
        &self,
        principal: &Principal,
        user_id: i64,
        status: UserStatus,
    ) -> AppResult<User> {
        require_role(principal, Role::Admin)?;
        let user = self.find_user(user_id).await?;
        if user.is_admin() && status == UserStatus::Blocked {
            return Err(AppError::Conflict("Administrators cannot be blocked".to_string()));
        }

        self.store.set_user_status(user_id, status).await?;
        log::info!("{} set user {} to {}", principal.name, user_id, status);
        self.find_user(user_id).await
    }

    pub async fn create_service(
        &self,
        principal: &Principal,
        service: NewService,
    ) -> AppResult<Service> {
        require_role(principal, Role::Admin)?;
        let service = validate_service(service)?;
        let id = self.store.create_service(&service).await?;
        log::info!("{} added service {} ({})", principal.name, id, service.name);
        self.find_service(id).await
    }

    pub async fn update_service(
        &self,
        principal: &Principal,
        service_id: i64,
        service: NewService,
    ) -> AppResult<Service> {
        require_role(principal, Role::Admin)?;
        let service = validate_service(service)?;
        if !self.store.update_service(service_id, &service).await? {
            return Err(AppError::NotFound(format!("Service {service_id} not found")));
        }
        self.find_service(service_id).await
    }

    /// Refused once any operation has billed the service.
    pub async fn delete_service(&self, principal: &Principal, service_id: i64) -> AppResult<()> {
        require_role(principal, Role::Admin)?;
        let billed = self.store.count_operations_for_service(service_id).await?;
        if billed > 0 {
            return Err(AppError::Conflict(format!(
                "Service already billed in {billed} operation(s)"
            )));
        }

        if !self.store.delete_service(service_id).await? {
            return Err(AppError::NotFound(format!("Service {service_id} not found")));
        }
        log::info!("{} deleted service {}", principal.name, service_id);
        Ok(())
    }

    /// The new client is owned by the caller.
    pub async fn create_client(
        &self,
        principal: &Principal,
        request: ClientRequest,
    ) -> AppResult<i64> {
        if request.full_name.trim().is_empty() {
            return Err(AppError::BadRequest("Client name is required.".to_string()));
        }

        let client = NewClient {
            full_name: request.full_name.trim().to_string(),
            phone: request.phone.trim().to_string(),
            address: request.address.filter(|value| !value.trim().is_empty()),
            created_by: Some(principal.id),
        };
        Ok(self.store.create_client(&client).await?)
    }

    async fn find_user(&self, user_id: i64) -> AppResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
    }

    async fn find_service(&self, service_id: i64) -> AppResult<Service> {
        self.store
            .find_service(service_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service {service_id} not found")))
    }
}

fn duplicate_user() -> AppError {
    AppError::Conflict("A user with this email or account name already exists".to_string())
}

fn validate_service(service: NewService) -> AppResult<NewService> {
    if service.name.trim().is_empty() {
        return Err(AppError::BadRequest("Service name is required.".to_string()));
    }
    if !service.price.is_finite() || service.price < 0.0 {
        return Err(AppError::BadRequest("Price must be a non-negative number.".to_string()));
    }
    Ok(NewService {
        name: service.name.trim().to_string(),
        description: service.description.filter(|value| !value.trim().is_empty()),
        price: service.price,
    })
}
