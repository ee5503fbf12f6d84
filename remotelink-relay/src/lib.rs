pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod poller;
pub mod reconcile;
pub mod registry;
pub mod relay;
pub mod store;
pub mod transport;
pub mod writes;

pub use config::{Config, PollerConfig, ServerConfig, StorageConfig, TelemetryConfig, TransportConfig};
pub use dispatch::Dispatcher;
pub use error::RelayError;
pub use ingest::{InboundMessage, IngestReport, TelemetryIngestor};
pub use poller::{Poller, SweepReport};
pub use reconcile::{ReconcileReport, StateReconciler, TelemetryLiveness};
pub use registry::CommandRegistry;
pub use relay::{Relay, SendReport};
pub use store::memory::MemoryDocumentStore;
pub use store::sqlite::SqliteDocumentStore;
pub use store::{Collection, Document, DocumentStore, StoreError};
pub use transport::http::HttpTransport;
pub use transport::mock::MockTransport;
pub use transport::{CommandTransport, TransportError};
pub use writes::{WriteReport, join_writes};
