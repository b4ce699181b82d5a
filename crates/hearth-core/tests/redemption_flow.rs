//! End-to-end redemption flow over the in-memory backend.

use std::sync::Arc;

use chrono::{Duration, Utc};
use hearth_core::{
    EngineConfig, IdentityId, InviteEngine, InviteError, IssueParams, PropertyId, UnitName,
};
use hearth_storage::{Collection, Document, DocumentStore};
use hearth_store_memory::MemoryStore;
use serde_json::json;
use uuid::Uuid;

struct Portal {
    store: Arc<MemoryStore>,
    engine: Arc<InviteEngine>,
    property: PropertyId,
}

async fn portal() -> Portal {
    let store = Arc::new(MemoryStore::new());
    let property = PropertyId(Uuid::new_v4());

    let mut property_doc = Document::new();
    property_doc.insert("name".into(), json!("12 Elm St"));
    property_doc.insert("occupancy".into(), json!([]));
    store
        .create(
            Collection::Properties,
            &property.0.to_string(),
            property_doc,
        )
        .await
        .unwrap();

    let engine = Arc::new(InviteEngine::new(store.clone(), EngineConfig::default()));
    Portal {
        store,
        engine,
        property,
    }
}

async fn register_tenant(portal: &Portal) -> IdentityId {
    let tenant = IdentityId(Uuid::new_v4());
    let mut doc = Document::new();
    doc.insert("email".into(), json!(format!("{}@example.com", tenant.0)));
    portal
        .store
        .create(Collection::Identities, &tenant.0.to_string(), doc)
        .await
        .unwrap();
    tenant
}

async fn occupancy_len(portal: &Portal) -> usize {
    let doc = portal
        .store
        .get_by_key(Collection::Properties, &portal.property.0.to_string())
        .await
        .unwrap();
    doc.get("occupancy").unwrap().as_array().unwrap().len()
}

#[tokio::test]
async fn issue_validate_redeem_resolve() {
    let portal = portal().await;
    let tenant = register_tenant(&portal).await;

    let invitation = portal
        .engine
        .issue(IssueParams {
            property_ref: portal.property.clone(),
            unit_ref: Some(UnitName("4B".into())),
            expires_at: Some(Utc::now() + Duration::days(7)),
        })
        .await
        .unwrap();

    // The tenant types the short code, sloppily.
    let typed = format!("  {} ", invitation.code_short.to_lowercase());
    let code = portal.engine.normalize(&typed).unwrap();
    let validated = portal.engine.validate(&code).await.unwrap();
    assert_eq!(validated.id, invitation.id);

    let grant = portal.engine.redeem(&validated.id, &tenant).await.unwrap();
    assert_eq!(grant.property_ref, portal.property);
    assert_eq!(grant.unit_ref, Some(UnitName("4B".into())));

    // Dashboards see the association immediately, no re-authentication.
    let access = portal.engine.resolve_access(&tenant).await.unwrap().unwrap();
    assert_eq!(access, grant);
    assert_eq!(occupancy_len(&portal).await, 1);

    // The code is spent for everyone else.
    assert_eq!(
        portal.engine.validate(&code).await.unwrap_err(),
        InviteError::AlreadyConsumed
    );
}

#[tokio::test]
async fn deep_link_long_code_follows_the_same_path() {
    let portal = portal().await;
    let tenant = register_tenant(&portal).await;

    let invitation = portal
        .engine
        .issue(IssueParams {
            property_ref: portal.property.clone(),
            unit_ref: None,
            expires_at: None,
        })
        .await
        .unwrap();

    let code = portal.engine.normalize(&invitation.id.0).unwrap();
    let validated = portal.engine.validate(&code).await.unwrap();
    let grant = portal.engine.redeem(&validated.id, &tenant).await.unwrap();
    assert_eq!(grant.unit_ref, None);
}

#[tokio::test]
async fn same_millisecond_race_admits_exactly_one_tenant() {
    let portal = portal().await;
    let u1 = register_tenant(&portal).await;
    let u2 = register_tenant(&portal).await;

    let invitation = portal
        .engine
        .issue(IssueParams {
            property_ref: portal.property.clone(),
            unit_ref: None,
            expires_at: None,
        })
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        {
            let engine = portal.engine.clone();
            let id = invitation.id.clone();
            let u1 = u1.clone();
            async move { engine.redeem(&id, &u1).await }
        },
        {
            let engine = portal.engine.clone();
            let id = invitation.id.clone();
            let u2 = u2.clone();
            async move { engine.redeem(&id, &u2).await }
        }
    );

    let a_won = a.is_ok();
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let loser = if a_won { b } else { a };
    assert_eq!(loser.unwrap_err(), InviteError::AlreadyConsumed);

    // Exactly one of the two ended up attached.
    assert_eq!(occupancy_len(&portal).await, 1);
    let winner = if a_won { &u1 } else { &u2 };
    let access = portal.engine.resolve_access(winner).await.unwrap();
    assert!(access.is_some());
}

#[tokio::test]
async fn retry_after_lost_response_is_recognized_as_satisfied() {
    let portal = portal().await;
    let tenant = register_tenant(&portal).await;

    let invitation = portal
        .engine
        .issue(IssueParams {
            property_ref: portal.property.clone(),
            unit_ref: Some(UnitName("2A".into())),
            expires_at: None,
        })
        .await
        .unwrap();

    // First attempt commits, but pretend the response never arrived: the
    // client re-validates by identifier and tries again.
    let first = portal.engine.redeem(&invitation.id, &tenant).await.unwrap();
    let second = portal.engine.redeem(&invitation.id, &tenant).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(occupancy_len(&portal).await, 1);
}

#[tokio::test]
async fn expired_code_is_terminal_for_validate_and_redeem() {
    let portal = portal().await;
    let tenant = register_tenant(&portal).await;

    let invitation = portal
        .engine
        .issue(IssueParams {
            property_ref: portal.property.clone(),
            unit_ref: None,
            expires_at: Some(Utc::now() - Duration::minutes(1)),
        })
        .await
        .unwrap();

    let code = portal.engine.normalize(&invitation.code_short).unwrap();
    let validate_err = portal.engine.validate(&code).await.unwrap_err();
    let redeem_err = portal
        .engine
        .redeem(&invitation.id, &tenant)
        .await
        .unwrap_err();

    assert_eq!(validate_err, InviteError::Expired);
    assert_eq!(redeem_err, InviteError::Expired);
    assert!(!validate_err.is_retryable());
    assert_eq!(occupancy_len(&portal).await, 0);
    assert_eq!(portal.engine.resolve_access(&tenant).await.unwrap(), None);
}

#[tokio::test]
async fn owner_can_revoke_until_someone_redeems() {
    let portal = portal().await;
    let tenant = register_tenant(&portal).await;

    let invitation = portal
        .engine
        .issue(IssueParams {
            property_ref: portal.property.clone(),
            unit_ref: None,
            expires_at: None,
        })
        .await
        .unwrap();

    portal.engine.revoke(&invitation.id).await.unwrap();
    assert_eq!(
        portal
            .engine
            .redeem(&invitation.id, &tenant)
            .await
            .unwrap_err(),
        InviteError::Revoked
    );
}
