//! Scripted upsert endpoint and in-memory outcome sink.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use adminsync_core::{OutcomeSink, UpsertAck, UpsertEndpoint, UpsertError};
use adminsync_domain::{AdminSyncError, EntityKind, Result, SyncOutcome};
use async_trait::async_trait;
use serde_json::Value;

/// Endpoint double that replays scripted responses.
///
/// Once the script runs dry it answers with `fallback`. Like a real
/// downstream, it keeps one resource per distinct `request_id`.
pub struct StubEndpoint {
    script: Mutex<VecDeque<std::result::Result<UpsertAck, UpsertError>>>,
    fallback: std::result::Result<UpsertAck, UpsertError>,
    calls: Mutex<Vec<(EntityKind, Value)>>,
    resources: Mutex<HashSet<String>>,
}

impl StubEndpoint {
    /// Always succeeds with the given sync id.
    pub fn succeeding(sync_id: &str) -> Self {
        Self::with_fallback(Ok(ack(sync_id)))
    }

    /// Always fails with `error`.
    pub fn failing(error: UpsertError) -> Self {
        Self::with_fallback(Err(error))
    }

    fn with_fallback(fallback: std::result::Result<UpsertAck, UpsertError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
            resources: Mutex::new(HashSet::new()),
        }
    }

    /// Queue a response ahead of the fallback.
    pub fn then(self, response: std::result::Result<UpsertAck, UpsertError>) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<(EntityKind, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Distinct resources created downstream.
    pub fn resource_count(&self) -> usize {
        self.resources.lock().unwrap().len()
    }
}

#[async_trait]
impl UpsertEndpoint for StubEndpoint {
    async fn upsert(
        &self,
        kind: EntityKind,
        payload: &Value,
    ) -> std::result::Result<UpsertAck, UpsertError> {
        self.calls.lock().unwrap().push((kind, payload.clone()));

        let response =
            self.script.lock().unwrap().pop_front().unwrap_or_else(|| self.fallback.clone());

        if response.is_ok() {
            if let Some(request_id) = payload.get("request_id").and_then(Value::as_str) {
                self.resources.lock().unwrap().insert(request_id.to_string());
            }
        }
        response
    }
}

pub fn ack(sync_id: &str) -> UpsertAck {
    UpsertAck { sync_id: Some(sync_id.to_string()), remote_key: None }
}

pub fn http_error(status: u16) -> UpsertError {
    UpsertError::Http { status, message: format!("HTTP {status}"), details: None }
}

/// Outcome storage standing in for the CRUD store.
#[derive(Default)]
pub struct MemoryOutcomeSink {
    outcomes: Mutex<HashMap<(EntityKind, String), SyncOutcome>>,
    fail_load: bool,
    fail_attach: bool,
    attach_calls: Mutex<usize>,
}

impl MemoryOutcomeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_load() -> Self {
        Self { fail_load: true, ..Self::default() }
    }

    pub fn failing_attach() -> Self {
        Self { fail_attach: true, ..Self::default() }
    }

    pub fn seed(&self, kind: EntityKind, key: &str, outcome: SyncOutcome) {
        self.outcomes.lock().unwrap().insert((kind, key.to_string()), outcome);
    }

    pub fn stored(&self, kind: EntityKind, key: &str) -> Option<SyncOutcome> {
        self.outcomes.lock().unwrap().get(&(kind, key.to_string())).cloned()
    }

    pub fn attach_calls(&self) -> usize {
        *self.attach_calls.lock().unwrap()
    }
}

#[async_trait]
impl OutcomeSink for MemoryOutcomeSink {
    async fn load_outcome(&self, kind: EntityKind, key: &str) -> Result<Option<SyncOutcome>> {
        if self.fail_load {
            return Err(AdminSyncError::Database("load failed".into()));
        }
        Ok(self.stored(kind, key))
    }

    async fn attach_outcome(
        &self,
        kind: EntityKind,
        key: &str,
        outcome: &SyncOutcome,
    ) -> Result<()> {
        *self.attach_calls.lock().unwrap() += 1;
        if self.fail_attach {
            return Err(AdminSyncError::Database("attach failed".into()));
        }
        self.seed(kind, key, outcome.clone());
        Ok(())
    }
}
