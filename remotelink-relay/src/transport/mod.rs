pub mod http;
pub mod mock;

use async_trait::async_trait;
use remotelink_core::RemoteId;

/// Reason a delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Delivers opaque command payloads to remotes.
///
/// Implementations make a single attempt per call. Retry and timeout policy
/// belong to the implementation's own client, not to the relay.
#[async_trait]
pub trait CommandTransport: Clone + Send + Sync + 'static {
    async fn send(&self, target: &RemoteId, payload: Vec<u8>) -> Result<(), TransportError>;
}
