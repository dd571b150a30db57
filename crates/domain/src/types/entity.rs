//! Entity snapshots handed to the sync core by the CRUD layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The administrative record types synchronized downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Tenant,
    Client,
    Subtenant,
    Domain,
    Branding,
}

crate::impl_domain_status_conversions!(EntityKind {
    Tenant => "tenant",
    Client => "client",
    Subtenant => "subtenant",
    Domain => "domain",
    Branding => "branding",
});

impl EntityKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 5] =
        [Self::Tenant, Self::Client, Self::Subtenant, Self::Domain, Self::Branding];
}

/// The CRUD mutation that triggered a sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    #[default]
    Update,
    Delete,
}

crate::impl_domain_status_conversions!(SyncAction {
    Create => "create",
    Update => "update",
    Delete => "delete",
});

/// Immutable view of one entity at the moment of mutation.
///
/// `key` is the entity's unique key: an identifier for most kinds, the host
/// name for [`EntityKind::Domain`]. `fields` carries everything else the CRUD
/// layer stored on the record; the core never interprets fields it does not
/// know about and forwards them as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub kind: EntityKind,
    pub key: String,
    pub enabled: bool,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl EntitySnapshot {
    pub fn new(kind: EntityKind, key: impl Into<String>, enabled: bool) -> Self {
        Self { kind, key: key.into(), enabled, fields: Map::new() }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
