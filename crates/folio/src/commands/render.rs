//! `folio render` command implementation.

use std::path::PathBuf;

use clap::Args;
use folio_preview::{RenderOutcome, SourceDocument};

use super::{CommonArgs, PREVIEW_FILE, read_source, report_warnings};
use crate::error::CliError;
use crate::output::Output;
use crate::settings::build_pipeline;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown source (default: the saved draft, or the sample document).
    input: Option<PathBuf>,

    /// Preview page to write (default: preview.html in the output directory).
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the source cannot be read,
    /// the page cannot be written or the source fails to parse.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config(None)?;
        let text = read_source(self.input.as_deref(), &config)?;

        output.detail("Kroki URL", &config.diagrams.kroki_url);
        let pipeline = build_pipeline(&config);
        let outcome = pipeline.render(&SourceDocument::new(text, 1)).await;

        let path = self
            .output
            .unwrap_or_else(|| config.export.output_dir.join(PREVIEW_FILE));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, pipeline.snapshot().to_html()).await?;
        output.wrote(&path);

        match outcome {
            RenderOutcome::Ready {
                diagrams,
                failed,
                warnings,
            } => {
                report_warnings(&output, &warnings);
                output.detail("Diagrams", &format!("{diagrams} ({failed} failed)"));
                Ok(())
            }
            RenderOutcome::Placeholder => {
                output.info("Source is empty; wrote the placeholder page");
                Ok(())
            }
            RenderOutcome::Failed(message) => Err(CliError::Render(message)),
            RenderOutcome::Superseded => Ok(()),
        }
    }
}
