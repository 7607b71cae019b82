use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    QueryBuilder, Sqlite, SqlitePool,
};

use super::{ensure_sqlite_dir, Store, OPERATION_DETAIL_SELECT};
use crate::{
    error::StoreResult,
    models::{
        Client, LoginField, NewClient, NewOperation, NewService, NewUser, Operation,
        OperationDetail, OperationFilter, OperationStatus, Role, Service, User, UserStatus,
        WALK_IN_CLIENT_NAME,
    },
};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(db_url: &str) -> StoreResult<Self> {
        ensure_sqlite_dir(db_url)?;

        let connect_options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        Ok(Self { pool })
    }

    /// Private in-memory database on a single pinned connection.
    pub async fn in_memory() -> StoreResult<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations/sqlite").run(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, name, email, phone, account_name, password_hash, role, status,
                      specialty, commission_rate, created_at
               FROM users
               WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_login(
        &self,
        field: LoginField,
        value: &str,
    ) -> StoreResult<Option<User>> {
        let query = match field {
            LoginField::Email => {
                r#"SELECT id, name, email, phone, account_name, password_hash, role, status,
                          specialty, commission_rate, created_at
                   FROM users
                   WHERE LOWER(email) = LOWER(?)
                   ORDER BY id
                   LIMIT 1"#
            }
            LoginField::Phone => {
                r#"SELECT id, name, email, phone, account_name, password_hash, role, status,
                          specialty, commission_rate, created_at
                   FROM users
                   WHERE phone = ?
                   ORDER BY id
                   LIMIT 1"#
            }
            LoginField::AccountName => {
                r#"SELECT id, name, email, phone, account_name, password_hash, role, status,
                          specialty, commission_rate, created_at
                   FROM users
                   WHERE LOWER(account_name) = LOWER(?)
                   ORDER BY id
                   LIMIT 1"#
            }
        };

        let user = sqlx::query_as::<_, User>(query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"SELECT id, name, email, phone, account_name, password_hash, role, status,
                      specialty, commission_rate, created_at
               FROM users
               ORDER BY name"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn admin_exists(&self) -> StoreResult<bool> {
        let existing = sqlx::query_as::<_, (i64,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
            .bind(Role::Admin.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(existing.is_some())
    }

    async fn create_user(&self, user: &NewUser, service_ids: &[i64]) -> StoreResult<i64> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"INSERT INTO users (name, email, phone, account_name, password_hash, role, status,
                                  specialty, commission_rate, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.account_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(UserStatus::Active.as_str())
        .bind(&user.specialty)
        .bind(user.commission_rate)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for &service_id in service_ids {
            sqlx::query("INSERT OR IGNORE INTO user_services (user_id, service_id) VALUES (?, ?)")
                .bind(id)
                .bind(service_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn set_user_status(&self, id: i64, status: UserStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE clients SET created_by = NULL WHERE created_by = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn block_and_wipe(&self, id: i64) -> StoreResult<u64> {
        // Any early return drops `tx`, which rolls both statements back.
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET status = ? WHERE id = ?")
            .bind(UserStatus::Blocked.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let removed = sqlx::query("DELETE FROM operations WHERE agent_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(removed)
    }

    async fn assigned_service_ids(&self, user_id: i64) -> StoreResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT service_id FROM user_services WHERE user_id = ? ORDER BY service_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn list_services(&self) -> StoreResult<Vec<Service>> {
        let services = sqlx::query_as::<_, Service>(
            "SELECT id, name, description, price, created_at FROM services ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(services)
    }

    async fn assigned_services(&self, user_id: i64) -> StoreResult<Vec<Service>> {
        let services = sqlx::query_as::<_, Service>(
            r#"SELECT s.id, s.name, s.description, s.price, s.created_at
               FROM services s
               JOIN user_services us ON us.service_id = s.id
               WHERE us.user_id = ?
               ORDER BY s.name ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(services)
    }

    async fn find_service(&self, id: i64) -> StoreResult<Option<Service>> {
        let service = sqlx::query_as::<_, Service>(
            "SELECT id, name, description, price, created_at FROM services WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(service)
    }

    async fn find_service_by_name(&self, name: &str) -> StoreResult<Option<Service>> {
        let service = sqlx::query_as::<_, Service>(
            r#"SELECT id, name, description, price, created_at
               FROM services
               WHERE name = ?
               ORDER BY id
               LIMIT 1"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(service)
    }

    async fn create_service(&self, service: &NewService) -> StoreResult<i64> {
        let id = sqlx::query(
            "INSERT INTO services (name, description, price, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.price)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    async fn update_service(&self, id: i64, service: &NewService) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE services SET name = ?, description = ?, price = ? WHERE id = ?")
                .bind(&service.name)
                .bind(&service.description)
                .bind(service.price)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_service(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM services WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_clients(&self, owner: Option<i64>) -> StoreResult<Vec<Client>> {
        let clients = match owner {
            Some(owner) => {
                sqlx::query_as::<_, Client>(
                    r#"SELECT id, full_name, phone, address, created_by, created_at
                       FROM clients
                       WHERE created_by = ?
                       ORDER BY full_name"#,
                )
                .bind(owner)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Client>(
                    r#"SELECT id, full_name, phone, address, created_by, created_at
                       FROM clients
                       ORDER BY full_name"#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(clients)
    }

    async fn find_walk_in_client(&self) -> StoreResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            r#"SELECT id, full_name, phone, address, created_by, created_at
               FROM clients
               WHERE full_name = ? AND created_by IS NULL
               ORDER BY id
               LIMIT 1"#,
        )
        .bind(WALK_IN_CLIENT_NAME)
        .fetch_optional(&self.pool)
        .await?;
        Ok(client)
    }

    async fn create_client(&self, client: &NewClient) -> StoreResult<i64> {
        let id = sqlx::query(
            r#"INSERT INTO clients (full_name, phone, address, created_by, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&client.full_name)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(client.created_by)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    async fn insert_operation(&self, operation: &NewOperation) -> StoreResult<i64> {
        let id = sqlx::query(
            r#"INSERT INTO operations (service_id, agent_id, client_id, price_charged, notes,
                                       status, service_date)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(operation.service_id)
        .bind(operation.agent_id)
        .bind(operation.client_id)
        .bind(operation.price_charged)
        .bind(&operation.notes)
        .bind(OperationStatus::Pending.as_str())
        .bind(operation.service_date)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    async fn find_operation(&self, id: i64) -> StoreResult<Option<Operation>> {
        let operation = sqlx::query_as::<_, Operation>(
            r#"SELECT id, service_id, agent_id, client_id, price_charged, notes, status,
                      service_date, validation_date
               FROM operations
               WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(operation)
    }

    async fn set_operation_status(
        &self,
        id: i64,
        status: OperationStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE operations SET status = ?, validation_date = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(at)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_operations_for_agent(&self, agent_id: i64) -> StoreResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM operations WHERE agent_id = ?")
                .bind(agent_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn count_operations_for_service(&self, service_id: i64) -> StoreResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM operations WHERE service_id = ?")
                .bind(service_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn list_operations(&self, filter: &OperationFilter) -> StoreResult<Vec<OperationDetail>> {
        let mut query = QueryBuilder::<Sqlite>::new(OPERATION_DETAIL_SELECT);
        if let Some(status) = filter.status {
            query.push(" AND o.status = ").push_bind(status.as_str());
        }
        if let Some(agent_id) = filter.agent_id {
            query.push(" AND o.agent_id = ").push_bind(agent_id);
        }
        if let Some(start) = filter.range.start {
            query.push(" AND o.service_date >= ").push_bind(start);
        }
        if let Some(end) = filter.range.end {
            query.push(" AND o.service_date <= ").push_bind(end);
        }
        query.push(" ORDER BY o.service_date DESC, o.id DESC");

        let rows = query
            .build_query_as::<OperationDetail>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
