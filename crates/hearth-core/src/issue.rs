//! Invitation issuance and revocation.

use chrono::{DateTime, Utc};
use hearth_storage::{Collection, Document, DocumentStore, StoreError};
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::config::CodeConfig;
use crate::engine::InviteEngine;
use crate::error::InviteError;
use crate::types::{Invitation, InvitationId, InviteStatus, PropertyId, UnitName};

/// What a property owner is inviting a tenant into.
#[derive(Clone, Debug)]
pub struct IssueParams {
    pub property_ref: PropertyId,
    pub unit_ref: Option<UnitName>,
    /// None = the code never expires on its own.
    pub expires_at: Option<DateTime<Utc>>,
}

pub(crate) async fn issue(
    engine: &InviteEngine,
    params: IssueParams,
) -> Result<Invitation, InviteError> {
    let code = &engine.config.code;

    // The store's uniqueness check (key + short-code index) is the arbiter;
    // a collision just means "roll again".
    for _ in 0..engine.config.issue_retry_attempts {
        let invitation = Invitation {
            id: InvitationId(random_code(code, code.long_len)),
            code_short: random_code(code, code.short_len),
            property_ref: params.property_ref.clone(),
            unit_ref: params.unit_ref.clone(),
            status: InviteStatus::Pending,
            issued_at: Utc::now(),
            expires_at: params.expires_at,
            consumed_by: None,
            consumed_at: None,
        };

        match engine
            .store_call(engine.store.create(
                Collection::Invitations,
                &invitation.id.0,
                invitation.to_document(),
            ))
            .await
        {
            Ok(()) => {
                debug!(
                    invitation = %invitation.id.0,
                    property = %invitation.property_ref.0,
                    "invitation issued"
                );
                return Ok(invitation);
            }
            Err(StoreError::AlreadyExists) => {
                debug!("issued code collided, regenerating");
                continue;
            }
            Err(other) => return Err(InviteError::unavailable(other)),
        }
    }
    Err(InviteError::unavailable(
        "could not allocate an unused invite code",
    ))
}

fn random_code(config: &CodeConfig, len: usize) -> String {
    let alphabet: Vec<char> = config.alphabet.chars().collect();
    let mut rng = rand::rngs::OsRng;
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}

/// Withdraw a pending invitation through the same guard the redeemer uses, so
/// a revocation can never claw back a committed redemption.
pub(crate) async fn revoke(
    engine: &InviteEngine,
    invitation_id: &InvitationId,
) -> Result<(), InviteError> {
    let mut expected = Document::new();
    expected.insert("status".into(), Value::String("pending".into()));
    let mut changes = Document::new();
    changes.insert("status".into(), Value::String("revoked".into()));

    match engine
        .store_call(engine.store.conditional_update(
            Collection::Invitations,
            &invitation_id.0,
            &expected,
            &changes,
        ))
        .await
    {
        Ok(()) => {
            debug!(invitation = %invitation_id.0, "invitation revoked");
            Ok(())
        }
        Err(StoreError::PreconditionFailed) => {
            let doc = match engine
                .store_call(
                    engine
                        .store
                        .get_by_key(Collection::Invitations, &invitation_id.0),
                )
                .await
            {
                Ok(doc) => doc,
                Err(StoreError::NotFound) => return Err(InviteError::NotFound),
                Err(other) => return Err(InviteError::unavailable(other)),
            };
            let invitation = Invitation::from_document(&doc).map_err(InviteError::unavailable)?;
            match invitation.status {
                // Revoking twice is satisfied, not an error.
                InviteStatus::Revoked => Ok(()),
                InviteStatus::Consumed => Err(InviteError::AlreadyConsumed),
                InviteStatus::Expired => Err(InviteError::Expired),
                InviteStatus::Pending => {
                    Err(InviteError::unavailable("record changed during revocation"))
                }
            }
        }
        Err(StoreError::NotFound) => Err(InviteError::NotFound),
        Err(other) => Err(InviteError::unavailable(other)),
    }
}
