//! Engine façade: wires the codec, validator, redeemer, issuer, and
//! authorization view over one store handle.

use std::future::Future;
use std::sync::Arc;

use hearth_storage::{DocumentStore, StoreError};

use crate::access::{self, AccessCache, AccessGrant};
use crate::code::{self, NormalizedCode};
use crate::config::EngineConfig;
use crate::error::InviteError;
use crate::issue::{self, IssueParams};
use crate::types::{IdentityId, Invitation, InvitationId};
use crate::{redeem, validate};

pub struct InviteEngine {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) config: EngineConfig,
    pub(crate) access: AccessCache,
}

impl InviteEngine {
    pub fn new(store: Arc<dyn DocumentStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            access: AccessCache::new(),
        }
    }

    /// Canonicalize a raw user-supplied code. Pure; see [`crate::code`].
    pub fn normalize(&self, raw: &str) -> Result<NormalizedCode, InviteError> {
        code::normalize(raw, &self.config.code)
    }

    /// Resolve a normalized code and classify the invitation's current state.
    /// Read-only; every outcome except `Unavailable` is terminal.
    pub async fn validate(&self, code: &NormalizedCode) -> Result<Invitation, InviteError> {
        validate::validate(self, code).await
    }

    /// Consume an invitation for `identity` and attach it to the target
    /// property. At most one identity ever wins a given invitation; the
    /// winner's own retries keep reporting success.
    pub async fn redeem(
        &self,
        invitation: &InvitationId,
        identity: &IdentityId,
    ) -> Result<AccessGrant, InviteError> {
        let grant = redeem::redeem(self, invitation, identity).await?;
        // Downstream dashboards must observe the new association immediately.
        self.invalidate_access_cache(identity);
        Ok(grant)
    }

    /// What property/unit `identity` may access, if any.
    pub async fn resolve_access(
        &self,
        identity: &IdentityId,
    ) -> Result<Option<AccessGrant>, InviteError> {
        access::resolve_access(self, identity).await
    }

    /// Drop any cached grant for `identity`; the next resolution re-reads the
    /// store. Exposed so callers that redeem through other replicas can force
    /// a refresh.
    pub fn invalidate_access_cache(&self, identity: &IdentityId) {
        self.access.invalidate(identity);
    }

    /// Create a fresh `pending` invitation with newly generated codes.
    pub async fn issue(&self, params: IssueParams) -> Result<Invitation, InviteError> {
        issue::issue(self, params).await
    }

    /// Withdraw a pending invitation so it can no longer be redeemed.
    pub async fn revoke(&self, invitation: &InvitationId) -> Result<(), InviteError> {
        issue::revoke(self, invitation).await
    }

    /// Single-round-trip store call under the configured deadline. An elapsed
    /// deadline is unavailability, never silently success or failure.
    pub(crate) async fn store_call<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.config.store_timeout(), op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable("store call timed out".into())),
        }
    }
}
