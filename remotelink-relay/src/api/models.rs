use remotelink_core::Outcome;
use serde::{Deserialize, Serialize};

use crate::ingest::InboundMessage;
use crate::relay::SendReport;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCommandResponse {
    pub outcome: Outcome,
    pub is_online: bool,
    pub is_available: bool,
    pub devices_updated: usize,
    pub devices_failed: usize,
}

impl From<SendReport> for SendCommandResponse {
    fn from(report: SendReport) -> Self {
        let cascade = report.reconcile.cascade;
        Self {
            outcome: report.outcome,
            is_online: report.reconcile.is_online,
            is_available: report.reconcile.is_available,
            devices_updated: cascade.succeeded(),
            devices_failed: cascade.failures.len(),
        }
    }
}

/// Push delivery envelope of the telemetry topic.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub message: InboundMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}
