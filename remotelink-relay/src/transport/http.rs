use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use remotelink_core::RemoteId;
use tracing::debug;

use super::{CommandTransport, TransportError};

/// Transport speaking the device-manager REST dialect:
/// `POST {endpoint}/{device_path}/{remote}:sendCommandToDevice`
/// with `{"binaryData": <base64>}`.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    device_path: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, device_path: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            device_path: device_path.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn command_url(&self, target: &RemoteId) -> String {
        format!(
            "{}/{}/{}:sendCommandToDevice",
            self.endpoint.trim_end_matches('/'),
            self.device_path.trim_matches('/'),
            target
        )
    }
}

#[async_trait]
impl CommandTransport for HttpTransport {
    async fn send(&self, target: &RemoteId, payload: Vec<u8>) -> Result<(), TransportError> {
        let url = self.command_url(target);
        debug!(%url, bytes = payload.len(), "sending command");

        let body = serde_json::json!({ "binaryData": STANDARD.encode(&payload) });
        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(TransportError(format!("{status}: {text}")))
    }
}
