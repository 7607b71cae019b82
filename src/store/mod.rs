//! Persistence boundary.
//!
//! Every component receives an `Arc<dyn Store>` from the process entry point.
//! Each backend is a concrete adapter with its own SQL dialect; dynamic
//! filters go through `sqlx::QueryBuilder` so placeholders are emitted by the
//! driver rather than rewritten by hand.

#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sqlite;

use std::{fs, path::Path, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    auth::hash_password,
    config::AppConfig,
    error::{AppError, StoreError, StoreResult},
    models::{
        Client, LoginField, NewClient, NewOperation, NewService, NewUser, Operation,
        OperationDetail, OperationFilter, OperationStatus, Role, Service, User, UserStatus,
        DEFAULT_COMMISSION_RATE, OTHER_SERVICE_NAME, WALK_IN_CLIENT_NAME,
    },
};

pub use sqlite::SqliteStore;

/// Shared projection for operation listings. Callers append `AND ...` filters.
pub(crate) const OPERATION_DETAIL_SELECT: &str = r#"SELECT o.id, o.service_id, o.agent_id, o.client_id, o.price_charged,
              o.notes, o.status, o.service_date, o.validation_date,
              s.name AS service_name, c.full_name AS client_name, u.name AS agent_name
       FROM operations o
       JOIN services s ON o.service_id = s.id
       JOIN clients c ON o.client_id = c.id
       JOIN users u ON o.agent_id = u.id
       WHERE 1 = 1"#;

#[async_trait]
pub trait Store: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn migrate(&self) -> StoreResult<()>;

    async fn close(&self);

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    /// Email and account name match case-insensitively, phone matches exactly.
    async fn find_user_by_login(&self, field: LoginField, value: &str)
        -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn admin_exists(&self) -> StoreResult<bool>;

    /// Inserts the user and its service assignments in one transaction.
    async fn create_user(&self, user: &NewUser, service_ids: &[i64]) -> StoreResult<i64>;

    async fn set_user_status(&self, id: i64, status: UserStatus) -> StoreResult<bool>;

    /// Releases owned clients and removes the user in one transaction.
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;

    /// Blocks the user and deletes all of its operations atomically.
    /// Returns the number of operations removed.
    async fn block_and_wipe(&self, id: i64) -> StoreResult<u64>;

    async fn assigned_service_ids(&self, user_id: i64) -> StoreResult<Vec<i64>>;

    async fn list_services(&self) -> StoreResult<Vec<Service>>;

    async fn assigned_services(&self, user_id: i64) -> StoreResult<Vec<Service>>;

    async fn find_service(&self, id: i64) -> StoreResult<Option<Service>>;

    async fn find_service_by_name(&self, name: &str) -> StoreResult<Option<Service>>;

    async fn create_service(&self, service: &NewService) -> StoreResult<i64>;

    async fn update_service(&self, id: i64, service: &NewService) -> StoreResult<bool>;

    async fn delete_service(&self, id: i64) -> StoreResult<bool>;

    /// `None` lists every client, `Some(owner)` only that owner's.
    async fn list_clients(&self, owner: Option<i64>) -> StoreResult<Vec<Client>>;

    async fn find_walk_in_client(&self) -> StoreResult<Option<Client>>;

    async fn create_client(&self, client: &NewClient) -> StoreResult<i64>;

    async fn insert_operation(&self, operation: &NewOperation) -> StoreResult<i64>;

    async fn find_operation(&self, id: i64) -> StoreResult<Option<Operation>>;

    async fn set_operation_status(
        &self,
        id: i64,
        status: OperationStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    async fn count_operations_for_agent(&self, agent_id: i64) -> StoreResult<i64>;

    async fn count_operations_for_service(&self, service_id: i64) -> StoreResult<i64>;

    /// Newest `service_date` first.
    async fn list_operations(&self, filter: &OperationFilter) -> StoreResult<Vec<OperationDetail>>;
}

/// Opens the adapter matching the URL scheme.
pub async fn connect(database_url: &str) -> StoreResult<Arc<dyn Store>> {
    if database_url.starts_with("sqlite:") {
        let store = SqliteStore::connect(database_url).await?;
        return Ok(Arc::new(store));
    }

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        #[cfg(feature = "postgres")]
        {
            let store = postgres::PostgresStore::connect(database_url).await?;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "postgres"))]
        {
            log::error!("PostgreSQL URL given but the `postgres` feature is disabled");
        }
    }

    Err(StoreError::UnsupportedUrl(database_url.to_string()))
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Idempotent bootstrap: first admin, walk-in client, ad-hoc service.
pub async fn seed_defaults(store: &dyn Store, config: &AppConfig) -> Result<(), AppError> {
    seed_admin(store, config).await?;

    if store.find_walk_in_client().await?.is_none() {
        store
            .create_client(&NewClient {
                full_name: WALK_IN_CLIENT_NAME.to_string(),
                phone: "0000000000".to_string(),
                address: None,
                created_by: None,
            })
            .await?;
        log::info!("Seeded walk-in client");
    }

    if store.find_service_by_name(OTHER_SERVICE_NAME).await?.is_none() {
        store
            .create_service(&NewService {
                name: OTHER_SERVICE_NAME.to_string(),
                description: Some("Custom or off-catalog work".to_string()),
                price: 0.0,
            })
            .await?;
        log::info!("Seeded '{OTHER_SERVICE_NAME}' service");
    }

    if config.seed_catalog {
        seed_catalog(store).await?;
    }

    Ok(())
}

async fn seed_admin(store: &dyn Store, config: &AppConfig) -> Result<(), AppError> {
    if store.admin_exists().await? {
        return Ok(());
    }

    let seed = &config.admin;
    let password_hash = hash_password(&seed.password)
        .map_err(|err| AppError::Internal(format!("password hash failed: {err}")))?;

    store
        .create_user(
            &NewUser {
                name: seed.name.clone(),
                email: seed.email.clone(),
                phone: seed.phone.clone(),
                account_name: seed.account_name.clone(),
                password_hash,
                role: Role::Admin,
                specialty: None,
                commission_rate: DEFAULT_COMMISSION_RATE,
            },
            &[],
        )
        .await?;
    log::info!("Created bootstrap admin '{}'", seed.account_name);
    Ok(())
}

async fn seed_catalog(store: &dyn Store) -> Result<(), AppError> {
    let catalog = [
        ("Haircut", "Simple cut", 10.0),
        ("Pedicure", "Full foot care", 20.0),
        ("Massage", "Relaxing massage, 30 min", 30.0),
    ];

    for (name, description, price) in catalog {
        if store.find_service_by_name(name).await?.is_some() {
            continue;
        }
        store
            .create_service(&NewService {
                name: name.to_string(),
                description: Some(description.to_string()),
                price,
            })
            .await?;
    }
    Ok(())
}
