// Shared fixtures for integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use spa_desk::{
    auth::{Principal, TokenIssuer},
    config::{AdminSeed, AppConfig},
    directory::AgentRequest,
    ledger::OperationRequest,
    models::{Operation, Role, Verdict},
    state::AppState,
    store::{seed_defaults, SqliteStore, Store},
};

pub const TEST_SECRET: &str = "test-secret";
pub const ADMIN_PASSWORD: &str = "admin-pass";
pub const AGENT_PASSWORD: &str = "agent-pass";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        port: 0,
        jwt_secret: TEST_SECRET.to_string(),
        admin: AdminSeed {
            account_name: "admin".to_string(),
            password: ADMIN_PASSWORD.to_string(),
            name: "Administrator".to_string(),
            email: "admin@spa.local".to_string(),
            phone: "0000000000".to_string(),
        },
        seed_catalog: true,
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// Migrated and seeded in-memory store with every component wired on top.
pub struct Harness {
    pub sqlite: SqliteStore,
    pub store: Arc<dyn Store>,
    pub state: AppState,
}

impl Harness {
    pub async fn new() -> Self {
        let sqlite = SqliteStore::in_memory().await.unwrap();
        sqlite.migrate().await.unwrap();
        let store: Arc<dyn Store> = Arc::new(sqlite.clone());
        seed_defaults(store.as_ref(), &test_config()).await.unwrap();
        let state = AppState::new(store.clone(), TokenIssuer::new(TEST_SECRET));
        Self {
            sqlite,
            store,
            state,
        }
    }

    pub async fn admin(&self) -> Principal {
        let session = self
            .state
            .guard
            .authenticate("admin", ADMIN_PASSWORD)
            .await
            .unwrap();
        self.state.guard.require_auth(Some(&session.token)).unwrap()
    }

    pub async fn create_agent(
        &self,
        name: &str,
        account_name: &str,
        service_ids: Vec<i64>,
    ) -> Principal {
        let admin = self.admin().await;
        let summary = self
            .state
            .directory
            .create_agent(
                &admin,
                AgentRequest {
                    name: name.to_string(),
                    email: format!("{account_name}@spa.local"),
                    phone: format!("06-{account_name}"),
                    account_name: account_name.to_string(),
                    password: AGENT_PASSWORD.to_string(),
                    specialty: None,
                    commission_rate: None,
                    service_ids,
                },
            )
            .await
            .unwrap();
        assert_eq!(summary.user.role, Role::Agent);
        Principal {
            id: summary.user.id,
            role: Role::Agent,
            name: summary.user.name,
        }
    }

    pub async fn service_id(&self, name: &str) -> i64 {
        self.store
            .find_service_by_name(name)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    pub async fn walk_in_id(&self) -> i64 {
        self.store.find_walk_in_client().await.unwrap().unwrap().id
    }

    pub async fn record(
        &self,
        agent: &Principal,
        service_id: i64,
        price: f64,
        service_date: DateTime<Utc>,
    ) -> Operation {
        self.state
            .ledger
            .record_operation(
                agent,
                OperationRequest {
                    service_id,
                    client_id: None,
                    price_charged: price,
                    notes: None,
                    service_date: Some(service_date),
                },
            )
            .await
            .unwrap()
    }

    pub async fn record_validated(
        &self,
        agent: &Principal,
        service_id: i64,
        price: f64,
        service_date: DateTime<Utc>,
    ) -> Operation {
        let operation = self.record(agent, service_id, price, service_date).await;
        let admin = self.admin().await;
        self.state
            .ledger
            .transition(&admin, operation.id, Verdict::Validated)
            .await
            .unwrap()
    }
}
