use futures::future::{BoxFuture, join_all};
use serde::Serialize;
use tracing::warn;

use crate::error::RelayError;
use crate::store::{Collection, StoreError};

/// A store write that has been issued but not yet awaited.
pub struct PendingWrite<'a> {
    pub collection: Collection,
    pub id: String,
    pub write: BoxFuture<'a, Result<(), StoreError>>,
}

impl<'a> PendingWrite<'a> {
    pub fn new(
        collection: Collection,
        id: impl Into<String>,
        write: BoxFuture<'a, Result<(), StoreError>>,
    ) -> Self {
        Self {
            collection,
            id: id.into(),
            write,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFailure {
    pub collection: String,
    pub id: String,
    pub error: String,
}

/// Aggregate result of a batch of independent writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReport {
    pub attempted: usize,
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_result(self) -> Result<Self, RelayError> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(RelayError::PartialCascade {
                failed: self.failures.len(),
                total: self.attempted,
            })
        }
    }
}

/// Run every write concurrently and wait for all of them. A failed write
/// never cancels the others; failures are logged and collected.
pub async fn join_writes(writes: Vec<PendingWrite<'_>>) -> WriteReport {
    let attempted = writes.len();
    let (targets, futures): (Vec<_>, Vec<_>) = writes
        .into_iter()
        .map(|w| ((w.collection, w.id), w.write))
        .unzip();

    let results = join_all(futures).await;

    let failures: Vec<WriteFailure> = targets
        .into_iter()
        .zip(results)
        .filter_map(|((collection, id), result)| {
            let err = result.err()?;
            warn!(%collection, %id, error = %err, "write failed");
            Some(WriteFailure {
                collection: collection.to_string(),
                id,
                error: err.to_string(),
            })
        })
        .collect();

    if !failures.is_empty() {
        warn!(
            failed = failures.len(),
            total = attempted,
            "{} of {} writes failed",
            failures.len(),
            attempted
        );
    }

    WriteReport {
        attempted,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn ok_write(id: &str) -> PendingWrite<'static> {
        PendingWrite::new(Collection::Devices, id, async { Ok(()) }.boxed())
    }

    fn failing_write(id: &str) -> PendingWrite<'static> {
        let id_owned = id.to_owned();
        PendingWrite::new(
            Collection::Devices,
            id,
            async move {
                Err(StoreError::NotFound {
                    collection: Collection::Devices,
                    id: id_owned,
                })
            }
            .boxed(),
        )
    }

    #[tokio::test]
    async fn empty_batch_is_complete() {
        let report = join_writes(Vec::new()).await;
        assert_eq!(report.attempted, 0);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn failures_do_not_stop_other_writes() {
        let report = join_writes(vec![ok_write("d1"), failing_write("d2"), ok_write("d3")]).await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "d2");
        assert_eq!(report.failures[0].collection, "devices");

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, RelayError::PartialCascade { failed: 1, total: 3 }));
    }
}
