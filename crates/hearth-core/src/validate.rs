//! Invitation resolution and status classification.

use chrono::{DateTime, Utc};
use hearth_storage::{Collection, DocumentStore, StoreError};

use crate::code::NormalizedCode;
use crate::engine::InviteEngine;
use crate::error::InviteError;
use crate::types::{Invitation, InviteStatus};

/// Resolve a normalized code to its invitation and classify its current
/// state. One lookup path per shape: short codes go through the secondary
/// index, long codes are the document key. No fallback scanning between
/// shapes; a code that matches in both is a configuration fault upstream.
pub(crate) async fn validate(
    engine: &InviteEngine,
    code: &NormalizedCode,
) -> Result<Invitation, InviteError> {
    let lookup = match code {
        NormalizedCode::Short(code) => {
            engine
                .store_call(engine.store.get_by_indexed_field(
                    Collection::Invitations,
                    "code_short",
                    code,
                ))
                .await
        }
        NormalizedCode::Long(code) => {
            engine
                .store_call(engine.store.get_by_key(Collection::Invitations, code))
                .await
        }
    };

    let doc = match lookup {
        Ok(doc) => doc,
        Err(StoreError::NotFound) => return Err(InviteError::NotFound),
        Err(other) => return Err(InviteError::unavailable(other)),
    };

    let invitation = Invitation::from_document(&doc).map_err(InviteError::unavailable)?;
    classify(invitation, Utc::now())
}

/// Status classification shared by validation and redemption, so a caller can
/// never observe the two disagreeing about the same record. Expiry is judged
/// against `now`; the stored status is not flipped here.
pub(crate) fn classify(
    invitation: Invitation,
    now: DateTime<Utc>,
) -> Result<Invitation, InviteError> {
    match invitation.status {
        InviteStatus::Revoked => Err(InviteError::Revoked),
        InviteStatus::Consumed => Err(InviteError::AlreadyConsumed),
        InviteStatus::Expired => Err(InviteError::Expired),
        InviteStatus::Pending if invitation.is_expired_at(now) => Err(InviteError::Expired),
        InviteStatus::Pending => Ok(invitation),
    }
}
