//! Authorization view: which property/unit an identity may access.
//!
//! Grants are derived from the association the redeemer writes onto the
//! identity record, cached per identity, and dropped on invalidation so a
//! fresh redemption is visible without re-authentication. Access is granted
//! at the property level; the unit is carried for display only.

use dashmap::DashMap;
use hearth_storage::{Collection, DocumentStore, StoreError};

use crate::engine::InviteEngine;
use crate::error::InviteError;
use crate::types::{IdentityId, IdentityRecord, PropertyId, UnitName};

/// Read-only capability descriptor handed to dashboards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessGrant {
    pub property_ref: PropertyId,
    pub unit_ref: Option<UnitName>,
}

pub(crate) struct AccessCache {
    grants: DashMap<IdentityId, AccessGrant>,
}

impl AccessCache {
    pub(crate) fn new() -> Self {
        Self {
            grants: DashMap::new(),
        }
    }

    pub(crate) fn get(&self, identity: &IdentityId) -> Option<AccessGrant> {
        self.grants.get(identity).map(|entry| entry.value().clone())
    }

    pub(crate) fn store(&self, identity: IdentityId, grant: AccessGrant) {
        self.grants.insert(identity, grant);
    }

    pub(crate) fn invalidate(&self, identity: &IdentityId) {
        self.grants.remove(identity);
    }
}

pub(crate) async fn resolve_access(
    engine: &InviteEngine,
    identity: &IdentityId,
) -> Result<Option<AccessGrant>, InviteError> {
    if let Some(grant) = engine.access.get(identity) {
        return Ok(Some(grant));
    }

    let doc = match engine
        .store_call(
            engine
                .store
                .get_by_key(Collection::Identities, &identity.0.to_string()),
        )
        .await
    {
        Ok(doc) => doc,
        // An identity the portal has never seen simply has no access.
        Err(StoreError::NotFound) => return Ok(None),
        Err(other) => return Err(InviteError::unavailable(other)),
    };

    let record = IdentityRecord::from_document(&doc).map_err(InviteError::unavailable)?;
    match record.property_ref {
        Some(property_ref) => {
            let grant = AccessGrant {
                property_ref,
                unit_ref: record.unit_ref,
            };
            engine.access.store(identity.clone(), grant.clone());
            Ok(Some(grant))
        }
        None => Ok(None),
    }
}
