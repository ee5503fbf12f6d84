pub mod dispatch;
pub mod telemetry;
