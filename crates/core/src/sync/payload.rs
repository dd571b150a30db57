//! Per-kind upsert payload shapes.
//!
//! Each kind maps to a row in a static table: the envelope key, the field
//! that carries the entity key, and the fields the endpoint requires. The
//! builder is a pure function of the snapshot and the request id.

use adminsync_domain::{EntityKind, EntitySnapshot};
use serde_json::{Map, Value};
use tracing::warn;

/// Snapshot fields owned by the local store that never travel downstream.
const BOOKKEEPING_FIELDS: &[&str] =
    &["_id", "createdAt", "updatedAt", "created_at", "updated_at", "deleted_at", "last_sync"];

/// Shape of the upsert body for one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadShape {
    pub kind: EntityKind,
    /// Key under which the entity object is nested in the envelope.
    pub envelope_key: &'static str,
    /// Field carrying the snapshot key (`id`, or `host` for domains).
    pub key_field: &'static str,
    pub required: &'static [&'static str],
}

const SHAPES: [PayloadShape; 5] = [
    PayloadShape {
        kind: EntityKind::Tenant,
        envelope_key: "tenant",
        key_field: "id",
        required: &["client_id", "name"],
    },
    PayloadShape {
        kind: EntityKind::Client,
        envelope_key: "client",
        key_field: "id",
        required: &[
            "name",
            "password_check_endpoint",
            "user_migrated_endpoint",
            "lookup_email_endpoint",
            "slug",
        ],
    },
    PayloadShape {
        kind: EntityKind::Subtenant,
        envelope_key: "subtenant",
        key_field: "id",
        required: &["tenant_id", "name"],
    },
    PayloadShape {
        kind: EntityKind::Domain,
        envelope_key: "domain",
        key_field: "host",
        required: &["tenant_id", "default_subtenant_id", "client_id"],
    },
    PayloadShape {
        kind: EntityKind::Branding,
        envelope_key: "branding",
        key_field: "id",
        required: &["tenant_id"],
    },
];

/// Look up the payload shape for `kind`.
pub fn shape_for(kind: EntityKind) -> &'static PayloadShape {
    match kind {
        EntityKind::Tenant => &SHAPES[0],
        EntityKind::Client => &SHAPES[1],
        EntityKind::Subtenant => &SHAPES[2],
        EntityKind::Domain => &SHAPES[3],
        EntityKind::Branding => &SHAPES[4],
    }
}

impl PayloadShape {
    /// Required fields the snapshot lacks or carries as `null`.
    pub fn missing_required(&self, snapshot: &EntitySnapshot) -> Vec<&'static str> {
        self.required
            .iter()
            .copied()
            .filter(|name| snapshot.fields.get(*name).map_or(true, Value::is_null))
            .collect()
    }
}

/// Build `{ "request_id": .., "<kind>": { <key_field>, enabled, .. } }`.
///
/// Every non-bookkeeping field is copied through untouched. The key field
/// and `enabled` always come from the snapshot itself, never from `fields`.
/// Missing required fields are omitted and logged; the endpoint owns the
/// rejection.
pub fn build_payload(snapshot: &EntitySnapshot, request_id: &str) -> Value {
    let shape = shape_for(snapshot.kind);

    let missing = shape.missing_required(snapshot);
    if !missing.is_empty() {
        warn!(
            entity_kind = %snapshot.kind,
            entity_key = %snapshot.key,
            missing = ?missing,
            "Snapshot lacks required upsert fields"
        );
    }

    let mut body = Map::new();
    body.insert(shape.key_field.to_string(), Value::String(snapshot.key.clone()));
    body.insert("enabled".to_string(), Value::Bool(snapshot.enabled));

    for (name, value) in &snapshot.fields {
        if body.contains_key(name) || BOOKKEEPING_FIELDS.contains(&name.as_str()) {
            continue;
        }
        body.insert(name.clone(), value.clone());
    }

    let mut envelope = Map::new();
    envelope.insert("request_id".to_string(), Value::String(request_id.to_string()));
    envelope.insert(shape.envelope_key.to_string(), Value::Object(body));
    Value::Object(envelope)
}
