//! Strongly-typed identifiers (avoid mixing strings/UUIDs arbitrarily).

use uuid::Uuid;

/// Invitation identifier: the system-generated long code, which is also the
/// invitation's document key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvitationId(pub String);

/// Property identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyId(pub Uuid);

/// Identity (account) identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentityId(pub Uuid);

/// Unit label within a property ("4B", "garden flat").
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnitName(pub String);
