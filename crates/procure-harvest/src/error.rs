use crate::config::ConfigError;
use crate::portal::DriverError;
use crate::telemetry::TelemetryError;
use crate::workflows::downloads::WatchError;
use crate::workflows::reconcile::ReconcileError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("browser error: {0}")]
    Driver(#[from] DriverError),
    #[error("download error: {0}")]
    Watch(#[from] WatchError),
    #[error("reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),
}
