//! Property occupancy mapping.
//!
//! Properties are external entities: the engine only ever touches their
//! `occupancy` field and must leave everything else in the document alone, so
//! the mapping here is per-field rather than whole-record.

use hearth_storage::Document;
use serde_json::Value;
use uuid::Uuid;

use super::{DocumentError, IdentityId, UnitName};

/// One `(tenant, unit)` pair on a property's occupancy list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupancyEntry {
    pub tenant: IdentityId,
    pub unit: Option<UnitName>,
}

impl OccupancyEntry {
    pub(crate) fn to_value(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("tenant".into(), Value::String(self.tenant.0.to_string()));
        obj.insert(
            "unit".into(),
            match &self.unit {
                Some(unit) => Value::String(unit.0.clone()),
                None => Value::Null,
            },
        );
        Value::Object(obj)
    }

    fn from_value(value: &Value) -> Result<Self, DocumentError> {
        let obj = value
            .as_object()
            .ok_or_else(|| DocumentError("occupancy entry is not an object".into()))?;
        let tenant = obj
            .get("tenant")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DocumentError("occupancy entry missing tenant".into()))?;
        let tenant = Uuid::try_parse(tenant)
            .map_err(|e| DocumentError(format!("bad tenant ref in occupancy: {e}")))?;
        let unit = match obj.get("unit") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(UnitName(s.clone())),
            Some(_) => return Err(DocumentError("non-string unit in occupancy".into())),
        };
        Ok(OccupancyEntry {
            tenant: IdentityId(tenant),
            unit,
        })
    }
}

/// Reads a property document's occupancy list. A missing field is an empty
/// list, so externally-created properties need no seeding.
pub(crate) fn occupancy_of(doc: &Document) -> Result<Vec<OccupancyEntry>, DocumentError> {
    match doc.get("occupancy") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(OccupancyEntry::from_value).collect(),
        Some(_) => Err(DocumentError("occupancy is not a list".into())),
    }
}

pub(crate) fn occupancy_value(entries: &[OccupancyEntry]) -> Value {
    Value::Array(entries.iter().map(OccupancyEntry::to_value).collect())
}
