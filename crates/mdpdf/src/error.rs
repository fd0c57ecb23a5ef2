//! CLI error types.

use mdpdf_batch::BatchError;
use mdpdf_config::ConfigError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Batch(#[from] BatchError),

    #[error("{0}")]
    Conversion(String),

    #[error("{0}")]
    Validation(String),
}
