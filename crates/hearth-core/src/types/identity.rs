//! Identity record: the slice of an account's profile the engine reads and
//! writes. Accounts themselves belong to the identity provider.

use hearth_storage::Document;
use serde_json::Value;
use uuid::Uuid;

use super::{optional_str, DocumentError, PropertyId, UnitName};

/// Property/unit association on an identity, written by redemption and read
/// by access resolution. Both fields absent means no access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityRecord {
    pub property_ref: Option<PropertyId>,
    pub unit_ref: Option<UnitName>,
}

impl IdentityRecord {
    pub fn from_document(doc: &Document) -> Result<Self, DocumentError> {
        let property_ref = optional_str(doc, "property")?
            .map(|s| {
                Uuid::try_parse(s)
                    .map(PropertyId)
                    .map_err(|e| DocumentError(format!("bad property ref: {e}")))
            })
            .transpose()?;
        Ok(IdentityRecord {
            property_ref,
            unit_ref: optional_str(doc, "unit")?.map(|s| UnitName(s.to_string())),
        })
    }

    /// The fields an attachment write merges into the identity document.
    pub(crate) fn attachment_changes(
        property_ref: &PropertyId,
        unit_ref: Option<&UnitName>,
    ) -> Document {
        let mut changes = Document::new();
        changes.insert(
            "property".into(),
            Value::String(property_ref.0.to_string()),
        );
        changes.insert(
            "unit".into(),
            match unit_ref {
                Some(unit) => Value::String(unit.0.clone()),
                None => Value::Null,
            },
        );
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unattached_identity_has_no_refs() {
        let mut doc = Document::new();
        doc.insert("email".into(), json!("tenant@example.com"));
        let record = IdentityRecord::from_document(&doc).unwrap();
        assert_eq!(record.property_ref, None);
        assert_eq!(record.unit_ref, None);
    }

    #[test]
    fn attachment_changes_roundtrip() {
        let property = PropertyId(Uuid::new_v4());
        let unit = UnitName("4B".into());

        let mut doc = Document::new();
        doc.insert("email".into(), json!("tenant@example.com"));
        for (k, v) in IdentityRecord::attachment_changes(&property, Some(&unit)) {
            doc.insert(k, v);
        }

        let record = IdentityRecord::from_document(&doc).unwrap();
        assert_eq!(record.property_ref, Some(property));
        assert_eq!(record.unit_ref, Some(unit));
        // Unrelated profile fields survive.
        assert_eq!(doc.get("email"), Some(&json!("tenant@example.com")));
    }

    #[test]
    fn bad_property_ref_is_rejected() {
        let mut doc = Document::new();
        doc.insert("property".into(), json!("not-a-uuid"));
        assert!(IdentityRecord::from_document(&doc).is_err());
    }
}
