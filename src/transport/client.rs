//! HTTP transport: issues requests, unwraps the entity envelope, classifies
//! failures.
//!
//! Every server response is wrapped in `{code, message, data}`; `code == 0`
//! is success and callers only ever see the unwrapped `data`. Any failure is
//! classified into a [`TransportError`] and surfaced to the notification
//! channel exactly once, here, regardless of how many cache subscribers later
//! observe the error.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::transport::error::TransportError;
use crate::transport::notify::{status_message, Notifier};

/// Wire-level response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// A success envelope, for test servers and fixtures.
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            message: String::new(),
            data: Some(data),
        }
    }

    /// An application-failure envelope.
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// The HTTP client every cache fetch and mutation goes through.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
    notifier: Notifier,
}

impl Transport {
    /// Build a transport against `base_url` (including the `/api/v1` prefix).
    ///
    /// Every request is bounded by `timeout`; exceeding it classifies as a
    /// network failure.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        notifier: Notifier,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            notifier,
        })
    }

    /// The notifier this transport reports failures through.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.execute(self.client.get(self.url(path))).await
    }

    pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.execute(self.client.get(self.url(path)).query(query))
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(self.client.post(self.url(path)).json(body))
            .await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(self.client.put(self.url(path)).json(body))
            .await
    }

    /// DELETE carries no payload; the envelope's `data` is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), TransportError> {
        self.execute_raw::<serde_json::Value>(self.client.request(Method::DELETE, self.url(path)))
            .await
            .map(|_| ())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Like [`execute_raw`](Self::execute_raw), but requires the envelope to
    /// carry a `data` payload.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, TransportError> {
        self.execute_raw(request).await.and_then(|data| {
            data.ok_or_else(|| TransportError::Decode("envelope carried no data".to_string()))
        })
    }

    /// Send one request, classify the outcome, notify on failure.
    async fn execute_raw<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, TransportError> {
        let request_id = Uuid::new_v4();

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                // No response at all: unreachable server or timeout.
                warn!(%request_id, error = %err, "request failed without a response");
                self.notifier
                    .error("network error, check your connection");
                return Err(TransportError::Network(err.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%request_id, status = status.as_u16(), "request failed");
            self.notifier.error(status_message(status.as_u16()));
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let envelope: Envelope<T> = match response.json().await {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(%request_id, error = %err, "response body was not a valid envelope");
                self.notifier.error("invalid server response");
                return Err(TransportError::Decode(err.to_string()));
            }
        };

        if envelope.code != 0 {
            debug!(%request_id, code = envelope.code, message = %envelope.message,
                "application-level failure");
            self.notifier.error(envelope.message.clone());
            return Err(TransportError::Application {
                code: envelope.code,
                message: envelope.message,
            });
        }

        Ok(envelope.data)
    }
}
