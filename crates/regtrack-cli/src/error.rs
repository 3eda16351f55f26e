use std::path::PathBuf;

use regtrack_core::{FailureCategory, NotifyError, PipelineError, ValidationError};
use regtrack_warehouse::WarehouseError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Notifier(#[from] NotifyError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("another run holds the lock on {}", .path.display())]
    RunInProgress { path: PathBuf },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Notifier(_) => 2,
            Self::Pipeline(error) => match error.category() {
                FailureCategory::NoValidLeads => 3,
                FailureCategory::Sink => 5,
                _ => 4,
            },
            Self::Warehouse(_) => 5,
            Self::RunInProgress { .. } => 6,
            Self::Serialization(_) => 7,
            Self::Io(_) => 10,
        }
    }
}
