//! Invitation record and status.

use chrono::{DateTime, Utc};
use hearth_storage::Document;
use serde_json::Value;
use uuid::Uuid;

use super::{optional_str, parse_timestamp, require_str, DocumentError};
use super::{IdentityId, InvitationId, PropertyId, UnitName};

/// Invitation lifecycle status as stored.
///
/// `pending → consumed` happens exactly once and never reverses; expiry is a
/// read-time classification, so a record can still read `pending` after its
/// deadline has passed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InviteStatus {
    Pending,
    Consumed,
    Expired,
    Revoked,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Consumed => "consumed",
            InviteStatus::Expired => "expired",
            InviteStatus::Revoked => "revoked",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DocumentError> {
        match s {
            "pending" => Ok(InviteStatus::Pending),
            "consumed" => Ok(InviteStatus::Consumed),
            "expired" => Ok(InviteStatus::Expired),
            "revoked" => Ok(InviteStatus::Revoked),
            other => Err(DocumentError(format!("unknown status `{other}`"))),
        }
    }
}

/// Invitation record
#[derive(Clone, Debug)]
pub struct Invitation {
    pub id: InvitationId,
    pub code_short: String,
    pub property_ref: PropertyId,
    pub unit_ref: Option<UnitName>,
    pub status: InviteStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>, // None = no expiry
    pub consumed_by: Option<IdentityId>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// Whether the deadline has passed for a record that is still `pending`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == InviteStatus::Pending
            && self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        // The long code doubles as the document key; it is duplicated into the
        // body so indexed lookups (which return only the body) stay whole.
        doc.insert("code_long".into(), Value::String(self.id.0.clone()));
        doc.insert("code_short".into(), Value::String(self.code_short.clone()));
        doc.insert(
            "property".into(),
            Value::String(self.property_ref.0.to_string()),
        );
        doc.insert(
            "unit".into(),
            match &self.unit_ref {
                Some(unit) => Value::String(unit.0.clone()),
                None => Value::Null,
            },
        );
        doc.insert("status".into(), Value::String(self.status.as_str().into()));
        doc.insert(
            "issued_at".into(),
            Value::String(self.issued_at.to_rfc3339()),
        );
        doc.insert(
            "expires_at".into(),
            match self.expires_at {
                Some(t) => Value::String(t.to_rfc3339()),
                None => Value::Null,
            },
        );
        doc.insert(
            "consumed_by".into(),
            match &self.consumed_by {
                Some(id) => Value::String(id.0.to_string()),
                None => Value::Null,
            },
        );
        doc.insert(
            "consumed_at".into(),
            match self.consumed_at {
                Some(t) => Value::String(t.to_rfc3339()),
                None => Value::Null,
            },
        );
        doc
    }

    pub fn from_document(doc: &Document) -> Result<Self, DocumentError> {
        let property = Uuid::try_parse(require_str(doc, "property")?)
            .map_err(|e| DocumentError(format!("bad property ref: {e}")))?;
        let consumed_by = optional_str(doc, "consumed_by")?
            .map(|s| {
                Uuid::try_parse(s)
                    .map(IdentityId)
                    .map_err(|e| DocumentError(format!("bad consumed_by ref: {e}")))
            })
            .transpose()?;

        let invitation = Invitation {
            id: InvitationId(require_str(doc, "code_long")?.to_string()),
            code_short: require_str(doc, "code_short")?.to_string(),
            property_ref: PropertyId(property),
            unit_ref: optional_str(doc, "unit")?.map(|s| UnitName(s.to_string())),
            status: InviteStatus::parse(require_str(doc, "status")?)?,
            issued_at: parse_timestamp("issued_at", require_str(doc, "issued_at")?)?,
            expires_at: optional_str(doc, "expires_at")?
                .map(|s| parse_timestamp("expires_at", s))
                .transpose()?,
            consumed_by,
            consumed_at: optional_str(doc, "consumed_at")?
                .map(|s| parse_timestamp("consumed_at", s))
                .transpose()?,
        };

        if (invitation.status == InviteStatus::Consumed) != invitation.consumed_by.is_some() {
            return Err(DocumentError(
                "consumed status and consumed_by out of sync".into(),
            ));
        }
        Ok(invitation)
    }
}
