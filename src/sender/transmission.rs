use super::client::build_http_client;
use super::serialization::{Payload, SerializationError};
use crate::config::{ConfigError, LokiSettings};
use crate::domain::StreamEntry;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Tenant header understood by Loki's multi-tenancy layer.
pub const TENANT_HEADER: HeaderName = HeaderName::from_static("x-scope-orgid");

// Longest slice of an error response body kept in a TransportError.
const MAX_ERROR_BODY_LEN: usize = 512;

/// Why a push did not reach Loki. Reported, never raised or retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Request timeout: {0}")]
    Timeout(String),
    #[error("HTTP error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Request error: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Result of one push attempt.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub batch_id: String,
    pub delivered: bool,
    pub status_code: Option<u16>,
    pub streams: usize,
    pub bytes_sent: usize,
    pub latency: Duration,
    pub error: Option<TransportError>,
}

/// Encodes stream entries and pushes them to Loki, one attempt per call.
#[derive(Debug, Clone)]
pub struct BatchSender {
    client: Client,
    settings: Arc<LokiSettings>,
}

impl BatchSender {
    pub fn new(settings: Arc<LokiSettings>) -> Result<Self, ConfigError> {
        let client = build_http_client(settings.transport())?;
        Ok(Self { client, settings })
    }

    pub async fn send_batch(
        &self,
        entries: Vec<StreamEntry>,
    ) -> Result<SendOutcome, SerializationError> {
        self.send_payload(&Payload::new(entries)).await
    }

    /// Pushes the payload.
    ///
    /// Only an encoding failure is returned as an error, and then nothing is
    /// sent. Connection failures, timeouts and non-2xx answers come back as
    /// an undelivered [`SendOutcome`].
    pub async fn send_payload(&self, payload: &Payload) -> Result<SendOutcome, SerializationError> {
        let batch_id = Uuid::new_v4().to_string();
        let streams = payload.len();

        let body = payload.encode().inspect_err(|e| {
            error!(batch_id = %batch_id, streams, error = %e, "Failed to encode Loki payload, nothing sent");
        })?;
        let bytes_sent = body.len();

        debug!(
            batch_id = %batch_id,
            streams,
            bytes = bytes_sent,
            url = %self.settings.push_url(),
            "Pushing batch to Loki"
        );

        let mut request = self
            .client
            .post(self.settings.push_url().clone())
            .headers(self.build_headers(bytes_sent))
            .body(Bytes::from(body));

        if let Some(auth) = self.settings.basic_auth() {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let start = Instant::now();
        let result = request.send().await;
        let latency = start.elapsed();

        let (status_code, error) = match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    (Some(status.as_u16()), None)
                } else {
                    let mut body = response.text().await.unwrap_or_default();
                    if body.len() > MAX_ERROR_BODY_LEN {
                        let cut = (0..=MAX_ERROR_BODY_LEN)
                            .rev()
                            .find(|i| body.is_char_boundary(*i))
                            .unwrap_or(0);
                        body.truncate(cut);
                    }
                    (
                        Some(status.as_u16()),
                        Some(TransportError::Status {
                            status: status.as_u16(),
                            body,
                        }),
                    )
                }
            }
            Err(err) => (None, Some(TransportError::from(err))),
        };

        match &error {
            None => debug!(
                batch_id = %batch_id,
                streams,
                bytes = bytes_sent,
                latency_ms = latency.as_millis() as u64,
                "Batch delivered"
            ),
            Some(e) => warn!(
                batch_id = %batch_id,
                streams,
                latency_ms = latency.as_millis() as u64,
                error = %e,
                "Failed to push batch to Loki, dropping it"
            ),
        }

        Ok(SendOutcome {
            batch_id,
            delivered: error.is_none(),
            status_code,
            streams,
            bytes_sent,
            latency,
            error,
        })
    }

    /// Headers the handler owns: content type, length and the tenant.
    pub fn build_headers(&self, content_length: usize) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));

        if let Some(tenant) = self.settings.tenant_header() {
            headers.insert(TENANT_HEADER, tenant.clone());
        }

        headers
    }
}
