//! Keeps `isOnline` on remotes and `isAvailable` on their devices in step
//! with dispatch outcomes and telemetry.

use futures::FutureExt;
use remotelink_core::{Outcome, Remote, RemoteId, RemoteState, StateReport, fields, is_available};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::RelayError;
use crate::store::{Collection, DocumentStore, StoreError, Update};
use crate::writes::{PendingWrite, WriteReport, join_writes};

/// What a state report says about the remote's liveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TelemetryLiveness {
    /// A remote that managed to publish telemetry is online.
    #[default]
    ImpliesOnline,
    /// Telemetry leaves `isOnline` as the last dispatch or sweep set it.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub remote_id: RemoteId,
    pub is_online: bool,
    pub is_available: bool,
    /// Device writes of the availability cascade.
    pub cascade: WriteReport,
}

pub struct StateReconciler<S> {
    store: S,
    liveness: TelemetryLiveness,
}

impl<S: DocumentStore> StateReconciler<S> {
    pub fn new(store: S, liveness: TelemetryLiveness) -> Self {
        Self { store, liveness }
    }

    /// Apply the result of a delivery attempt.
    ///
    /// `state` is read back after `isOnline` is written, so a state change
    /// racing with this pass is picked up.
    #[instrument(skip_all, fields(remote_id = %remote_id, delivered = outcome.is_delivered()))]
    pub async fn record_dispatch_outcome(
        &self,
        remote_id: &RemoteId,
        outcome: &Outcome,
    ) -> Result<ReconcileReport, RelayError> {
        let is_online = outcome.is_delivered();

        self.store
            .update(
                Collection::Remotes,
                remote_id.as_str(),
                Update::new().field(fields::IS_ONLINE, is_online),
            )
            .await?;

        let remote = self.read_remote(remote_id).await?;
        let is_available = is_available(is_online, &remote.state);

        self.finish(remote_id, is_online, is_available).await
    }

    /// Merge a state report onto its remote and cascade availability.
    #[instrument(skip_all, fields(remote_id = %remote_id))]
    pub async fn apply_telemetry(
        &self,
        remote_id: &RemoteId,
        report: StateReport,
    ) -> Result<ReconcileReport, RelayError> {
        let mut update = Update::from(report.fields);
        if self.liveness == TelemetryLiveness::ImpliesOnline {
            update = update.field(fields::IS_ONLINE, true);
        }

        self.store
            .update(Collection::Remotes, remote_id.as_str(), update)
            .await?;

        // Only an explicit idle state makes devices available; a missing or
        // null state does not.
        let reported_idle = report.state.as_ref().is_some_and(RemoteState::is_idle);
        let is_online = match self.liveness {
            TelemetryLiveness::ImpliesOnline => true,
            TelemetryLiveness::Unchanged => self.read_remote(remote_id).await?.is_online,
        };
        let is_available = is_online && reported_idle;

        self.finish(remote_id, is_online, is_available).await
    }

    /// Write `isAvailable` to every device bound to the remote, concurrently.
    pub async fn cascade(
        &self,
        remote_id: &RemoteId,
        is_available: bool,
    ) -> Result<WriteReport, RelayError> {
        let devices = self
            .store
            .query(
                Collection::Devices,
                fields::REMOTE_ID,
                &Value::from(remote_id.as_str()),
            )
            .await?;

        let writes = devices
            .into_iter()
            .map(|device| {
                let store = self.store.clone();
                let id = device.id.clone();
                PendingWrite::new(
                    Collection::Devices,
                    device.id,
                    async move {
                        store
                            .update(
                                Collection::Devices,
                                &id,
                                Update::new().field(fields::IS_AVAILABLE, is_available),
                            )
                            .await
                    }
                    .boxed(),
                )
            })
            .collect();

        Ok(join_writes(writes).await)
    }

    async fn finish(
        &self,
        remote_id: &RemoteId,
        is_online: bool,
        is_available: bool,
    ) -> Result<ReconcileReport, RelayError> {
        let cascade = self.cascade(remote_id, is_available).await?;

        info!(
            is_online,
            is_available,
            devices = cascade.attempted,
            failed = cascade.failures.len(),
            "remote reconciled"
        );

        Ok(ReconcileReport {
            remote_id: remote_id.clone(),
            is_online,
            is_available,
            cascade,
        })
    }

    async fn read_remote(&self, remote_id: &RemoteId) -> Result<Remote, RelayError> {
        let Some(document) = self
            .store
            .get(Collection::Remotes, remote_id.as_str())
            .await?
        else {
            return Ok(Remote::default());
        };

        serde_json::from_value(Value::Object(document))
            .map_err(|e| RelayError::Store(StoreError::from(e)))
    }
}
