//! Periodic liveness sweep over every known remote.

use std::time::Duration;

use futures::future::join_all;
use remotelink_core::{DispatchRequest, RemoteId};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::RelayError;
use crate::reconcile::{ReconcileReport, StateReconciler, TelemetryLiveness};
use crate::store::{Collection, DocumentStore};
use crate::transport::CommandTransport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    pub remote_id: RemoteId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub probed: usize,
    pub online: usize,
    pub offline: usize,
    /// Remotes whose probe or reconciliation failed. Their device cascade
    /// failures are counted here too.
    pub failures: Vec<SweepFailure>,
}

pub struct Poller<S, T> {
    store: S,
    dispatcher: Dispatcher<S, T>,
    reconciler: StateReconciler<S>,
}

impl<S, T> Poller<S, T>
where
    S: DocumentStore,
    T: CommandTransport,
{
    pub fn new(store: S, transport: T, liveness: TelemetryLiveness) -> Self {
        Self {
            dispatcher: Dispatcher::new(store.clone(), transport),
            reconciler: StateReconciler::new(store.clone(), liveness),
            store,
        }
    }

    /// The probe sent to each remote.
    pub fn probe(remote_id: RemoteId) -> DispatchRequest {
        DispatchRequest::inline(remote_id, json!({ "alive": "?" }))
    }

    /// Probe every remote once. Remotes are handled independently and
    /// concurrently; one failing never stops the others.
    pub async fn sweep(&self) -> Result<SweepReport, RelayError> {
        let remotes = self.store.list(Collection::Remotes).await?;

        let results = join_all(
            remotes
                .into_iter()
                .map(|remote| self.probe_one(RemoteId(remote.id))),
        )
        .await;

        let mut report = SweepReport {
            probed: results.len(),
            ..SweepReport::default()
        };

        for (remote_id, result) in results {
            match result {
                Ok(reconciled) => {
                    if reconciled.is_online {
                        report.online += 1;
                    } else {
                        report.offline += 1;
                    }
                    if !reconciled.cascade.is_complete() {
                        report.failures.push(SweepFailure {
                            remote_id,
                            error: format!(
                                "{} of {} device updates failed",
                                reconciled.cascade.failures.len(),
                                reconciled.cascade.attempted
                            ),
                        });
                    }
                }
                Err(e) => {
                    warn!(remote_id = %remote_id, error = %e, "liveness probe failed");
                    report.failures.push(SweepFailure {
                        remote_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            probed = report.probed,
            online = report.online,
            offline = report.offline,
            failed = report.failures.len(),
            "liveness sweep complete"
        );

        Ok(report)
    }

    async fn probe_one(&self, remote_id: RemoteId) -> (RemoteId, Result<ReconcileReport, RelayError>) {
        let result = async {
            let outcome = self.dispatcher.dispatch(&Self::probe(remote_id.clone())).await?;
            self.reconciler
                .record_dispatch_outcome(&remote_id, &outcome)
                .await
        }
        .await;
        (remote_id, result)
    }

    /// Sweep on a fixed interval until cancelled.
    pub async fn run(self, interval: Duration, cancel: CancellationToken) {
        if interval.is_zero() {
            error!("poller interval must be non-zero, poller not started");
            return;
        }

        info!(interval_secs = interval.as_secs(), "Poller started");

        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Poller shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    debug!("starting liveness sweep");
                    if let Err(e) = self.sweep().await {
                        error!(error = %e, "liveness sweep failed");
                    }
                }
            }
        }
    }
}
