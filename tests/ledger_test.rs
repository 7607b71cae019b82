mod common;

use chrono::Utc;
use common::{at, Harness};
use spa_desk::{
    directory::ClientRequest,
    error::AppError,
    ledger::OperationRequest,
    models::{OperationStatus, UserStatus, Verdict},
};

#[tokio::test]
async fn recorded_operation_is_pending_and_defaults_to_walk_in() {
    let h = Harness::new().await;
    let agent = h.create_agent("Marie", "marie", vec![]).await;
    let massage = h.service_id("Massage").await;

    let before = Utc::now();
    let operation = h
        .state
        .ledger
        .record_operation(
            &agent,
            OperationRequest {
                service_id: massage,
                client_id: None,
                price_charged: 30.0,
                notes: Some("   ".to_string()),
                service_date: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(operation.status, OperationStatus::Pending);
    assert_eq!(operation.agent_id, agent.id);
    assert_eq!(operation.client_id, h.walk_in_id().await);
    assert_eq!(operation.notes, None);
    assert!(operation.validation_date.is_none());
    assert!(operation.service_date >= before - chrono::Duration::seconds(1));
}

#[tokio::test]
async fn recorded_operation_keeps_explicit_client_and_date() {
    let h = Harness::new().await;
    let agent = h.create_agent("Marie", "marie", vec![]).await;
    let haircut = h.service_id("Haircut").await;
    let client_id = h
        .state
        .directory
        .create_client(
            &agent,
            ClientRequest {
                full_name: "Jeanne Martin".to_string(),
                phone: "0622222222".to_string(),
                address: None,
            },
        )
        .await
        .unwrap();

    let operation = h
        .state
        .ledger
        .record_operation(
            &agent,
            OperationRequest {
                service_id: haircut,
                client_id: Some(client_id),
                price_charged: 12.5,
                notes: Some(" short cut ".to_string()),
                service_date: Some(at(2024, 3, 9, 14)),
            },
        )
        .await
        .unwrap();

    assert_eq!(operation.client_id, client_id);
    assert_eq!(operation.service_date, at(2024, 3, 9, 14));
    assert_eq!(operation.notes.as_deref(), Some("short cut"));
    assert_eq!(operation.price_charged, 12.5);
}

#[tokio::test]
async fn unknown_service_is_rejected_by_the_store() {
    let h = Harness::new().await;
    let agent = h.create_agent("Marie", "marie", vec![]).await;

    let err = h
        .state
        .ledger
        .record_operation(
            &agent,
            OperationRequest {
                service_id: 9_999,
                client_id: None,
                price_charged: 10.0,
                notes: None,
                service_date: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
}

#[tokio::test]
async fn transition_stamps_validation_date_and_can_be_repeated() {
    let h = Harness::new().await;
    let admin = h.admin().await;
    let agent = h.create_agent("Marie", "marie", vec![]).await;
    let massage = h.service_id("Massage").await;
    let operation = h.record(&agent, massage, 30.0, at(2024, 5, 1, 10)).await;

    let first = h
        .state
        .ledger
        .transition(&admin, operation.id, Verdict::Validated)
        .await
        .unwrap();
    assert_eq!(first.status, OperationStatus::Validated);
    let first_stamp = first.validation_date.unwrap();

    let again = h
        .state
        .ledger
        .transition(&admin, operation.id, Verdict::Validated)
        .await
        .unwrap();
    assert_eq!(again.status, OperationStatus::Validated);
    assert!(again.validation_date.unwrap() >= first_stamp);

    let rejected = h
        .state
        .ledger
        .transition(&admin, operation.id, Verdict::Rejected)
        .await
        .unwrap();
    assert_eq!(rejected.status, OperationStatus::Rejected);
}

#[tokio::test]
async fn transition_requires_admin_and_an_existing_operation() {
    let h = Harness::new().await;
    let admin = h.admin().await;
    let agent = h.create_agent("Marie", "marie", vec![]).await;
    let massage = h.service_id("Massage").await;
    let operation = h.record(&agent, massage, 30.0, at(2024, 5, 1, 10)).await;

    let err = h
        .state
        .ledger
        .transition(&agent, operation.id, Verdict::Validated)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = h
        .state
        .ledger
        .transition(&admin, 424_242, Verdict::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn pending_queue_lists_only_pending_with_names() {
    let h = Harness::new().await;
    let admin = h.admin().await;
    let agent = h.create_agent("Marie", "marie", vec![]).await;
    let massage = h.service_id("Massage").await;

    let waiting = h.record(&agent, massage, 30.0, at(2024, 5, 1, 10)).await;
    h.record_validated(&agent, massage, 30.0, at(2024, 5, 2, 10))
        .await;

    let pending = h.state.ledger.list_pending(&admin).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].operation.id, waiting.id);
    assert_eq!(pending[0].service_name, "Massage");
    assert_eq!(pending[0].agent_name, "Marie");
    assert_eq!(pending[0].client_name, "Walk-in client");

    let err = h.state.ledger.list_pending(&agent).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn deleting_an_agent_with_history_is_refused() {
    let h = Harness::new().await;
    let admin = h.admin().await;
    let agent = h.create_agent("Marie", "marie", vec![]).await;
    let massage = h.service_id("Massage").await;
    h.record(&agent, massage, 30.0, at(2024, 5, 1, 10)).await;

    let err = h
        .state
        .ledger
        .delete_user(&admin, agent.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(h.store.find_user(agent.id).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_an_agent_releases_its_clients() {
    let h = Harness::new().await;
    let admin = h.admin().await;
    let agent = h
        .create_agent("Marie", "marie", vec![h.service_id("Massage").await])
        .await;
    let client_id = h
        .state
        .directory
        .create_client(
            &agent,
            ClientRequest {
                full_name: "Jeanne Martin".to_string(),
                phone: "0622222222".to_string(),
                address: Some("12 rue des Lilas".to_string()),
            },
        )
        .await
        .unwrap();

    h.state.ledger.delete_user(&admin, agent.id).await.unwrap();

    assert!(h.store.find_user(agent.id).await.unwrap().is_none());
    assert!(h.store.assigned_service_ids(agent.id).await.unwrap().is_empty());
    let clients = h.store.list_clients(None).await.unwrap();
    let client = clients.iter().find(|c| c.id == client_id).unwrap();
    assert_eq!(client.created_by, None);

    let err = h
        .state
        .ledger
        .delete_user(&admin, agent.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn administrators_cannot_be_deleted_or_wiped() {
    let h = Harness::new().await;
    let admin = h.admin().await;

    let err = h
        .state
        .ledger
        .delete_user(&admin, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = h
        .state
        .ledger
        .block_and_wipe(&admin, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn block_and_wipe_blocks_and_purges_only_that_agent() {
    let h = Harness::new().await;
    let admin = h.admin().await;
    let marie = h.create_agent("Marie", "marie", vec![]).await;
    let paul = h.create_agent("Paul", "paul", vec![]).await;
    let massage = h.service_id("Massage").await;

    h.record(&marie, massage, 30.0, at(2024, 5, 1, 10)).await;
    h.record_validated(&marie, massage, 30.0, at(2024, 5, 2, 10))
        .await;
    h.record(&paul, massage, 25.0, at(2024, 5, 3, 10)).await;

    let removed = h
        .state
        .ledger
        .block_and_wipe(&admin, marie.id)
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let user = h.store.find_user(marie.id).await.unwrap().unwrap();
    assert_eq!(user.status, UserStatus::Blocked);
    assert_eq!(h.store.count_operations_for_agent(marie.id).await.unwrap(), 0);
    assert_eq!(h.store.count_operations_for_agent(paul.id).await.unwrap(), 1);
}

#[tokio::test]
async fn block_and_wipe_rolls_back_when_the_purge_fails() {
    let h = Harness::new().await;
    let admin = h.admin().await;
    let agent = h.create_agent("Marie", "marie", vec![]).await;
    let massage = h.service_id("Massage").await;
    h.record(&agent, massage, 30.0, at(2024, 5, 1, 10)).await;

    sqlx::query(
        "CREATE TRIGGER refuse_operation_delete BEFORE DELETE ON operations \
         BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;",
    )
    .execute(h.sqlite.pool())
    .await
    .unwrap();

    let err = h
        .state
        .ledger
        .block_and_wipe(&admin, agent.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));

    let user = h.store.find_user(agent.id).await.unwrap().unwrap();
    assert_eq!(user.status, UserStatus::Active);
    assert_eq!(h.store.count_operations_for_agent(agent.id).await.unwrap(), 1);
}
