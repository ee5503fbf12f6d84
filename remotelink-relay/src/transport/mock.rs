use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use remotelink_core::RemoteId;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CommandTransport, TransportError};

/// A payload handed to the mock transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SentCommand {
    pub target: RemoteId,
    pub payload: Vec<u8>,
}

/// Transport that records every call and fails for remotes marked offline.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    offline: HashSet<RemoteId>,
    sent: Vec<SentCommand>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offline(offline: impl IntoIterator<Item = RemoteId>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                offline: offline.into_iter().collect(),
                sent: Vec::new(),
            })),
        }
    }

    pub async fn set_offline(&self, remote_id: RemoteId, offline: bool) {
        let mut inner = self.inner.lock().await;
        if offline {
            inner.offline.insert(remote_id);
        } else {
            inner.offline.remove(&remote_id);
        }
    }

    /// Every call made so far, including failed ones.
    pub async fn sent(&self) -> Vec<SentCommand> {
        self.inner.lock().await.sent.clone()
    }
}

#[async_trait]
impl CommandTransport for MockTransport {
    async fn send(&self, target: &RemoteId, payload: Vec<u8>) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().await;
        debug!(remote_id = %target, bytes = payload.len(), "mock transport send");

        inner.sent.push(SentCommand {
            target: target.clone(),
            payload,
        });

        if inner.offline.contains(target) {
            return Err(TransportError(format!("remote {target} is not connected")));
        }

        Ok(())
    }
}
