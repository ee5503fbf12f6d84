use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use remotelink_core::SendCommandRequest;
use tracing::{info, warn};

use super::error::ApiError;
use super::models::{ApiResponse, PushEnvelope, SendCommandResponse};
use crate::error::RelayError;
use crate::relay::Relay;
use crate::store::DocumentStore;
use crate::transport::CommandTransport;

fn success_response<T: serde::Serialize>(status: StatusCode, data: T) -> Response {
    let api_response = ApiResponse {
        success: true,
        data: Some(data),
        message: None,
    };
    (status, Json(api_response)).into_response()
}

pub async fn send_command<S, T>(
    State(relay): State<Arc<Relay<S, T>>>,
    request: Result<Json<SendCommandRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    S: DocumentStore,
    T: CommandTransport,
{
    let Json(request) = request?;
    let report = relay.send_command(request).await?;

    if !report.reconcile.cascade.is_complete() {
        warn!(
            remote_id = %report.reconcile.remote_id,
            failed = report.reconcile.cascade.failures.len(),
            total = report.reconcile.cascade.attempted,
            "command sent with partial device cascade"
        );
    }

    Ok(success_response(
        StatusCode::OK,
        SendCommandResponse::from(report),
    ))
}

pub async fn telemetry<S, T>(
    State(relay): State<Arc<Relay<S, T>>>,
    Json(envelope): Json<PushEnvelope>,
) -> Result<StatusCode, ApiError>
where
    S: DocumentStore,
    T: CommandTransport,
{
    match relay.ingest(&envelope.message).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        // Acknowledged so the topic does not redeliver an undecodable event.
        Err(RelayError::MalformedPayload(reason)) => {
            info!(
                subscription = envelope.subscription.as_deref().unwrap_or("-"),
                %reason,
                "telemetry dropped"
            );
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn sweep<S, T>(State(relay): State<Arc<Relay<S, T>>>) -> Result<Response, ApiError>
where
    S: DocumentStore,
    T: CommandTransport,
{
    let report = relay.sweep().await?;
    Ok(success_response(StatusCode::OK, report))
}

pub async fn health() -> &'static str {
    "OK"
}
