//! Request identifiers used by the downstream system for deduplication.

use adminsync_domain::{EntityKind, SyncAction};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest.
const REQUEST_ID_LEN: usize = 32;

/// Use the caller's request id when given, otherwise derive one.
///
/// A blank caller id counts as absent. The derived id is
/// `sha256("<action>|<kind>|<key>|<unix_ms>")` truncated to 32 hex chars, so
/// it is generated once per logical sync and then persisted with the outbox
/// record for every retry.
pub fn resolve_request_id(
    provided: Option<&str>,
    action: SyncAction,
    kind: EntityKind,
    key: &str,
    now: DateTime<Utc>,
) -> String {
    match provided.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => derive_request_id(action, kind, key, now),
    }
}

fn derive_request_id(
    action: SyncAction,
    kind: EntityKind,
    key: &str,
    now: DateTime<Utc>,
) -> String {
    let seed = format!("{}|{}|{}|{}", action, kind, key, now.timestamp_millis());
    let digest = Sha256::digest(seed.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(REQUEST_ID_LEN);
    id
}
