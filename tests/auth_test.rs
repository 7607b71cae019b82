mod common;

use common::{Harness, ADMIN_PASSWORD, AGENT_PASSWORD};
use spa_desk::{
    directory::AgentRequest,
    error::AppError,
    models::{Role, UserStatus},
};

#[tokio::test]
async fn login_accepts_email_phone_and_account_name() {
    let h = Harness::new().await;

    for identifier in ["admin@spa.local", "0000000000", "admin", "  ADMIN  "] {
        let session = h
            .state
            .guard
            .authenticate(identifier, ADMIN_PASSWORD)
            .await
            .unwrap();
        assert_eq!(session.user.user.account_name, "admin");
        assert_eq!(session.user.user.role, Role::Admin);
    }
}

#[tokio::test]
async fn issued_token_resolves_to_the_same_principal() {
    let h = Harness::new().await;
    let agent = h.create_agent("Marie", "marie", vec![]).await;

    let session = h
        .state
        .guard
        .authenticate("marie", AGENT_PASSWORD)
        .await
        .unwrap();
    let principal = h.state.guard.require_auth(Some(&session.token)).unwrap();

    assert_eq!(principal, agent);
}

#[tokio::test]
async fn wrong_password_is_an_invalid_credential() {
    let h = Harness::new().await;

    let err = h
        .state
        .guard
        .authenticate("admin", "not-the-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredential));
}

#[tokio::test]
async fn unknown_identifier_is_not_found() {
    let h = Harness::new().await;

    let err = h
        .state
        .guard
        .authenticate("nobody@spa.local", "whatever")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn blocked_account_cannot_sign_in() {
    let h = Harness::new().await;
    let admin = h.admin().await;
    let agent = h.create_agent("Marie", "marie", vec![]).await;

    h.state
        .directory
        .set_user_status(&admin, agent.id, UserStatus::Blocked)
        .await
        .unwrap();

    let err = h
        .state
        .guard
        .authenticate("marie", AGENT_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    h.state
        .directory
        .set_user_status(&admin, agent.id, UserStatus::Active)
        .await
        .unwrap();
    assert!(h
        .state
        .guard
        .authenticate("marie", AGENT_PASSWORD)
        .await
        .is_ok());
}

#[tokio::test]
async fn missing_or_forged_tokens_are_unauthenticated() {
    let h = Harness::new().await;

    for credential in [None, Some(""), Some("   "), Some("not.a.jwt")] {
        let err = h.state.guard.require_auth(credential).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }
}

#[tokio::test]
async fn session_lists_assigned_services() {
    let h = Harness::new().await;
    let massage = h.service_id("Massage").await;
    let haircut = h.service_id("Haircut").await;
    h.create_agent("Marie", "marie", vec![massage, haircut, massage])
        .await;

    let session = h
        .state
        .guard
        .authenticate("marie@spa.local", AGENT_PASSWORD)
        .await
        .unwrap();

    let mut expected = vec![massage, haircut];
    expected.sort_unstable();
    assert_eq!(session.user.service_ids, expected);
}

#[tokio::test]
async fn ambiguous_identifier_resolves_to_the_earlier_field() {
    let h = Harness::new().await;
    let admin = h.admin().await;

    // "lucie" is one agent's phone and another agent's account name.
    let by_phone = h
        .state
        .directory
        .create_agent(
            &admin,
            AgentRequest {
                name: "Phone Owner".to_string(),
                email: "phone.owner@spa.local".to_string(),
                phone: "lucie".to_string(),
                account_name: "phone-owner".to_string(),
                password: "phone-pass".to_string(),
                specialty: None,
                commission_rate: None,
                service_ids: vec![],
            },
        )
        .await
        .unwrap();
    h.state
        .directory
        .create_agent(
            &admin,
            AgentRequest {
                name: "Lucie".to_string(),
                email: "lucie@spa.local".to_string(),
                phone: "0611111111".to_string(),
                account_name: "lucie".to_string(),
                password: "lucie-pass".to_string(),
                specialty: None,
                commission_rate: None,
                service_ids: vec![],
            },
        )
        .await
        .unwrap();

    let session = h
        .state
        .guard
        .authenticate("lucie", "phone-pass")
        .await
        .unwrap();
    assert_eq!(session.user.user.id, by_phone.user.id);

    let err = h
        .state
        .guard
        .authenticate("lucie", "lucie-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredential));
}
