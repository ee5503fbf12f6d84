use remotelink_core::{DispatchRequest, Outcome, SendCommandRequest};
use tracing::{info, instrument};

use crate::dispatch::Dispatcher;
use crate::error::RelayError;
use crate::ingest::{IngestReport, InboundMessage, TelemetryIngestor};
use crate::poller::{Poller, SweepReport};
use crate::reconcile::{ReconcileReport, StateReconciler, TelemetryLiveness};
use crate::store::DocumentStore;
use crate::transport::CommandTransport;

/// Result of a command-send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub outcome: Outcome,
    pub reconcile: ReconcileReport,
}

/// The relay's three entrypoints over one store and one transport.
pub struct Relay<S, T> {
    dispatcher: Dispatcher<S, T>,
    reconciler: StateReconciler<S>,
    ingestor: TelemetryIngestor<S>,
    poller: Poller<S, T>,
}

impl<S, T> Relay<S, T>
where
    S: DocumentStore,
    T: CommandTransport,
{
    pub fn new(store: S, transport: T, liveness: TelemetryLiveness) -> Self {
        Self {
            dispatcher: Dispatcher::new(store.clone(), transport.clone()),
            reconciler: StateReconciler::new(store.clone(), liveness),
            ingestor: TelemetryIngestor::new(store.clone(), liveness),
            poller: Poller::new(store, transport, liveness),
        }
    }

    /// Validate, dispatch, then reconcile the remote with the outcome.
    /// Returns once every resulting write has settled.
    #[instrument(skip_all)]
    pub async fn send_command(&self, request: SendCommandRequest) -> Result<SendReport, RelayError> {
        let request = DispatchRequest::try_from(request)?;
        info!(remote_id = %request.remote_id, message = ?request.message, "sending command");

        let outcome = self.dispatcher.dispatch(&request).await?;
        let reconcile = self
            .reconciler
            .record_dispatch_outcome(&request.remote_id, &outcome)
            .await?;

        Ok(SendReport { outcome, reconcile })
    }

    pub async fn ingest(&self, message: &InboundMessage) -> Result<IngestReport, RelayError> {
        self.ingestor.ingest(message).await
    }

    pub async fn sweep(&self) -> Result<SweepReport, RelayError> {
        self.poller.sweep().await
    }
}
