//! CLI error types.

use folio_config::ConfigError;
use folio_export::ExportError;
use folio_preview::DraftError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Input {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Draft(#[from] DraftError),

    #[error("{0}")]
    Export(#[from] ExportError),

    #[error("Failed to watch input: {0}")]
    Watch(#[from] notify::Error),

    /// The preview could not be rendered; the message replaced the preview.
    #[error("{0}")]
    Render(String),
}
