pub mod error;
pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::relay::Relay;
use crate::store::DocumentStore;
use crate::transport::CommandTransport;

pub fn router<S, T>(relay: Arc<Relay<S, T>>) -> Router
where
    S: DocumentStore,
    T: CommandTransport,
{
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/commands/send", post(handlers::send_command::<S, T>))
        .route("/api/telemetry", post(handlers::telemetry::<S, T>))
        .route("/api/sweep", post(handlers::sweep::<S, T>))
        .with_state(relay)
}
