//! Invitation code validation and redemption for the hearth property portal.
//!
//! A property owner issues a short, human-typable code (or hands out the
//! long identifier in a deep link); a prospective tenant presents it, and the
//! engine validates it, consumes it exactly once under a compare-and-set
//! guard, attaches the tenant to the property, and answers downstream access
//! checks. Storage is abstracted behind [`hearth_storage::DocumentStore`] so
//! backends can be swapped without touching the flow.
//!
//! ```no_run
//! # async fn demo() -> Result<(), hearth_core::InviteError> {
//! use hearth_core::{EngineConfig, InviteEngine};
//! use hearth_store_memory::MemoryStore;
//! use std::sync::Arc;
//!
//! let engine = InviteEngine::new(Arc::new(MemoryStore::new()), EngineConfig::default());
//! let code = engine.normalize(" 6252-3174 ")?;
//! let _invitation = engine.validate(&code).await?;
//! # Ok(())
//! # }
//! ```

mod access;
mod code;
mod config;
mod engine;
mod error;
mod issue;
mod redeem;
mod types;
mod validate;

pub use access::AccessGrant;
pub use code::{normalize, NormalizedCode};
pub use config::{CodeConfig, ConfigError, EngineConfig};
pub use engine::InviteEngine;
pub use error::InviteError;
pub use issue::IssueParams;
pub use types::{
    DocumentError, IdentityId, IdentityRecord, Invitation, InvitationId, InviteStatus,
    OccupancyEntry, PropertyId, UnitName,
};
