//! HTTP client for the per-kind upsert endpoints ("hub").
//!
//! One POST per call, bearer-token authenticated, bounded by the configured
//! timeout. The client never retries and never persists anything; every
//! failure comes back as an [`UpsertError`] for the caller to record.

use std::collections::BTreeMap;
use std::time::Duration;

use adminsync_core::{UpsertAck, UpsertEndpoint, UpsertError};
use adminsync_domain::{AdminSyncError, EntityKind, HubConfig, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

use crate::errors::InfraError;

/// Default code when a rejection carries none.
const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";

/// Success or rejection envelope returned with a 2xx status.
///
/// Identifier fields are kept loose; the endpoint may echo them as strings
/// or numbers.
#[derive(Debug, Deserialize)]
struct UpsertEnvelope {
    ok: Option<Value>,
    sync_id: Option<Value>,
    id: Option<Value>,
    host: Option<Value>,
    error: Option<RemoteErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    code: Option<Value>,
    message: Option<Value>,
    details: Option<Value>,
}

/// Upsert endpoint client.
pub struct HubClient {
    http: Client,
    endpoints: BTreeMap<EntityKind, Url>,
    token: String,
    timeout: Duration,
}

impl std::fmt::Debug for HubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubClient")
            .field("endpoints", &self.endpoints)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HubClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdminSyncError::Config`] when the token is empty, when any
    /// kind lacks a valid http(s) URL, or when the HTTP client cannot be
    /// built.
    pub fn from_config(config: &HubConfig) -> Result<Self> {
        let token = config.token.trim();
        if token.is_empty() {
            return Err(AdminSyncError::Config("hub token is required".into()));
        }

        let mut endpoints = BTreeMap::new();
        for kind in EntityKind::ALL {
            endpoints.insert(kind, parse_endpoint(kind, config.urls.for_kind(kind))?);
        }

        let timeout = config.timeout();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AdminSyncError::from(InfraError::from(err)))?;

        Ok(Self { http, endpoints, token: token.to_string(), timeout })
    }

    /// Target URL for `kind`.
    pub fn endpoint(&self, kind: EntityKind) -> Option<&Url> {
        self.endpoints.get(&kind)
    }

    async fn exchange(
        &self,
        url: &Url,
        payload: &Value,
    ) -> std::result::Result<(StatusCode, String), UpsertError> {
        let request = self
            .http
            .post(url.clone())
            .bearer_auth(&self.token)
            .json(payload)
            .build()
            .map_err(|err| UpsertError::Local(format!("failed to build request: {err}")))?;

        let round_trip = async {
            let response = self.http.execute(request).await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        match tokio::time::timeout(self.timeout, round_trip).await {
            Err(_) => Err(UpsertError::Timeout(self.timeout)),
            Ok(Err(err)) if err.is_timeout() => Err(UpsertError::Timeout(self.timeout)),
            Ok(Err(err)) => Err(UpsertError::Connection(err.to_string())),
            Ok(Ok(exchange)) => Ok(exchange),
        }
    }
}

#[async_trait]
impl UpsertEndpoint for HubClient {
    #[instrument(skip(self, payload), fields(entity_kind = %kind))]
    async fn upsert(
        &self,
        kind: EntityKind,
        payload: &Value,
    ) -> std::result::Result<UpsertAck, UpsertError> {
        let url = self
            .endpoint(kind)
            .ok_or_else(|| UpsertError::Local(format!("no upsert URL configured for {kind}")))?;

        debug!(url = %url, "Sending upsert");

        let (status, body) = self.exchange(url, payload).await?;

        debug!(status = status.as_u16(), body_len = body.len(), "Upsert response received");

        interpret_response(status, &body)
    }
}

fn parse_endpoint(kind: EntityKind, raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AdminSyncError::Config(format!("upsert URL for {kind} is required")));
    }
    let url = Url::parse(raw).map_err(|err| {
        AdminSyncError::Config(format!("invalid upsert URL for {kind}: {err}"))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(AdminSyncError::Config(format!(
            "upsert URL for {kind} must be http(s), got {scheme}://"
        ))),
    }
}

/// Map an HTTP status and raw body to an acknowledgement or a classified
/// error.
fn interpret_response(
    status: StatusCode,
    body: &str,
) -> std::result::Result<UpsertAck, UpsertError> {
    if !status.is_success() {
        return Err(http_error(status, body));
    }

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Err(UpsertError::UnexpectedResponse { details: raw_body_details(body) });
    };

    let Ok(envelope) = UpsertEnvelope::deserialize(&value) else {
        return Err(UpsertError::UnexpectedResponse { details: Some(value) });
    };

    match envelope {
        UpsertEnvelope { ok: Some(Value::Bool(true)), sync_id, id, host, .. } => Ok(UpsertAck {
            sync_id: sync_id.as_ref().and_then(scalar_to_string),
            remote_key: id
                .as_ref()
                .and_then(scalar_to_string)
                .or_else(|| host.as_ref().and_then(scalar_to_string)),
        }),
        UpsertEnvelope { ok: Some(Value::Bool(false)), error: Some(error), .. } => {
            Err(UpsertError::Remote {
                code: error
                    .code
                    .as_ref()
                    .and_then(scalar_to_string)
                    .unwrap_or_else(|| UNKNOWN_ERROR_CODE.to_string()),
                message: error
                    .message
                    .as_ref()
                    .and_then(scalar_to_string)
                    .unwrap_or_else(|| "Unknown error".to_string()),
                details: error.details,
            })
        }
        _ => Err(UpsertError::UnexpectedResponse { details: Some(value) }),
    }
}

/// Render a JSON string, number or bool as text; `null` and containers
/// yield `None`.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn http_error(status: StatusCode, body: &str) -> UpsertError {
    let details = serde_json::from_str::<Value>(body).ok().or_else(|| raw_body_details(body));

    let message = details
        .as_ref()
        .and_then(|d| {
            d.get("message").or_else(|| d.get("error").and_then(|e| e.get("message")))
        })
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string);

    UpsertError::Http { status: status.as_u16(), message, details }
}

fn raw_body_details(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        None
    } else {
        Some(json!({ "message": body }))
    }
}
