//! Guarded invitation consumption and property attachment.
//!
//! The conditional update on the invitation record is the linearization
//! point: whatever the caller read earlier, only a write guarded on
//! `status == pending` can consume, and the store admits exactly one such
//! write. Everything after that commit (identity association, occupancy
//! append) is idempotent repair work that must never fail the caller:
//! consumption itself is the authorization gate.

use chrono::Utc;
use hearth_storage::{Collection, Document, DocumentStore, StoreError};
use serde_json::Value;
use tracing::{debug, warn};

use crate::access::AccessGrant;
use crate::engine::InviteEngine;
use crate::error::InviteError;
use crate::types::{
    occupancy_of, occupancy_value, IdentityId, IdentityRecord, Invitation, InvitationId,
    InviteStatus, OccupancyEntry,
};
use crate::validate;

pub(crate) async fn redeem(
    engine: &InviteEngine,
    invitation_id: &InvitationId,
    identity: &IdentityId,
) -> Result<AccessGrant, InviteError> {
    let invitation = fetch(engine, invitation_id).await?;

    // Retry-after-success: the winning identity's duplicate request reports
    // success again, and re-runs the attachment in case it was deferred.
    if invitation.status == InviteStatus::Consumed
        && invitation.consumed_by.as_ref() == Some(identity)
    {
        apply_attachment(engine, &invitation, identity).await;
        return Ok(grant_of(&invitation));
    }

    // Same classification the validator applies; the read above is only
    // advisory, the write below re-checks the status at commit time.
    let invitation = validate::classify(invitation, Utc::now())?;

    let now = Utc::now();
    let mut expected = Document::new();
    expected.insert("status".into(), Value::String("pending".into()));
    let mut changes = Document::new();
    changes.insert("status".into(), Value::String("consumed".into()));
    changes.insert(
        "consumed_by".into(),
        Value::String(identity.0.to_string()),
    );
    changes.insert("consumed_at".into(), Value::String(now.to_rfc3339()));

    match engine
        .store_call(engine.store.conditional_update(
            Collection::Invitations,
            &invitation_id.0,
            &expected,
            &changes,
        ))
        .await
    {
        Ok(()) => {}
        Err(StoreError::PreconditionFailed) => {
            // Lost the race: another writer transitioned the record between
            // our read and our write. Report the record's actual fate; a
            // duplicate of our own winning request still reports success.
            let lost = fetch(engine, invitation_id).await?;
            return match lost.status {
                InviteStatus::Consumed if lost.consumed_by.as_ref() == Some(identity) => {
                    apply_attachment(engine, &lost, identity).await;
                    Ok(grant_of(&lost))
                }
                InviteStatus::Consumed => Err(InviteError::AlreadyConsumed),
                InviteStatus::Revoked => Err(InviteError::Revoked),
                InviteStatus::Expired => Err(InviteError::Expired),
                // The guard only fails when the status moved off `pending`.
                InviteStatus::Pending => {
                    Err(InviteError::unavailable("record changed during redemption"))
                }
            };
        }
        Err(StoreError::NotFound) => return Err(InviteError::NotFound),
        Err(other) => return Err(InviteError::unavailable(other)),
    }

    debug!(invitation = %invitation_id.0, identity = %identity.0, "invitation consumed");

    let mut consumed = invitation;
    consumed.status = InviteStatus::Consumed;
    consumed.consumed_by = Some(identity.clone());
    consumed.consumed_at = Some(now);

    apply_attachment(engine, &consumed, identity).await;
    Ok(grant_of(&consumed))
}

fn grant_of(invitation: &Invitation) -> AccessGrant {
    AccessGrant {
        property_ref: invitation.property_ref.clone(),
        unit_ref: invitation.unit_ref.clone(),
    }
}

async fn fetch(
    engine: &InviteEngine,
    invitation_id: &InvitationId,
) -> Result<Invitation, InviteError> {
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
    Invitation::from_document(&doc).map_err(InviteError::unavailable)
}

/// Post-consumption writes: the identity's association and the property's
/// occupancy entry. Both are idempotent, both are retried by any later
/// redemption of the same invitation by the winner, and neither is allowed
/// to turn a committed consumption into a caller-visible failure.
async fn apply_attachment(engine: &InviteEngine, invitation: &Invitation, identity: &IdentityId) {
    let changes =
        IdentityRecord::attachment_changes(&invitation.property_ref, invitation.unit_ref.as_ref());
    if let Err(e) = engine
        .store_call(engine.store.conditional_update(
            Collection::Identities,
            &identity.0.to_string(),
            &Document::new(),
            &changes,
        ))
        .await
    {
        warn!(identity = %identity.0, error = %e, "identity attachment deferred");
    }

    let entry = OccupancyEntry {
        tenant: identity.clone(),
        unit: invitation.unit_ref.clone(),
    };
    let property_key = invitation.property_ref.0.to_string();

    for _ in 0..engine.config.attach_retry_attempts {
        let doc = match engine
            .store_call(engine.store.get_by_key(Collection::Properties, &property_key))
            .await
        {
            Ok(doc) => doc,
            Err(e) => {
                warn!(property = %property_key, error = %e, "occupancy append deferred");
                return;
            }
        };

        let current = match occupancy_of(&doc) {
            Ok(current) => current,
            Err(e) => {
                warn!(property = %property_key, error = %e, "occupancy unreadable");
                return;
            }
        };
        if current.contains(&entry) {
            return;
        }

        let mut next = current;
        next.push(entry.clone());

        let mut expected = Document::new();
        expected.insert(
            "occupancy".into(),
            doc.get("occupancy").cloned().unwrap_or(Value::Null),
        );
        let mut changes = Document::new();
        changes.insert("occupancy".into(), occupancy_value(&next));

        match engine
            .store_call(engine.store.conditional_update(
                Collection::Properties,
                &property_key,
                &expected,
                &changes,
            ))
            .await
        {
            Ok(()) => {
                debug!(property = %property_key, identity = %identity.0, "occupancy appended");
                return;
            }
            // Another tenant's append landed first; re-read and try again.
            Err(StoreError::PreconditionFailed) => continue,
            Err(e) => {
                warn!(property = %property_key, error = %e, "occupancy append deferred");
                return;
            }
        }
    }
    warn!(
        property = %property_key,
        attempts = engine.config.attach_retry_attempts,
        "occupancy append deferred after contention"
    );
}
