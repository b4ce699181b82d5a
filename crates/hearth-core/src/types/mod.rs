//! Typed records for the engine's collections, with document mapping.

mod identity;
mod ids;
mod invitation;
mod property;

pub use identity::IdentityRecord;
pub use ids::{IdentityId, InvitationId, PropertyId, UnitName};
pub use invitation::{InviteStatus, Invitation};
pub use property::OccupancyEntry;
pub(crate) use property::{occupancy_of, occupancy_value};

use thiserror::Error;

/// A stored document that cannot be mapped to its typed record. This is a
/// backend or schema fault, not a caller error.
#[derive(Debug, Error)]
#[error("malformed document: {0}")]
pub struct DocumentError(pub String);

pub(crate) fn require_str<'a>(
    doc: &'a hearth_storage::Document,
    field: &str,
) -> Result<&'a str, DocumentError> {
    doc.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| DocumentError(format!("missing or non-string field `{field}`")))
}

pub(crate) fn optional_str<'a>(
    doc: &'a hearth_storage::Document,
    field: &str,
) -> Result<Option<&'a str>, DocumentError> {
    match doc.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(DocumentError(format!("non-string field `{field}`"))),
    }
}

pub(crate) fn parse_timestamp(
    field: &str,
    value: &str,
) -> Result<chrono::DateTime<chrono::Utc>, DocumentError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&chrono::Utc))
        .map_err(|e| DocumentError(format!("bad timestamp in `{field}`: {e}")))
}
