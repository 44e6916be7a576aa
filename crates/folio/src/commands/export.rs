//! `folio export` command implementation.

use std::path::PathBuf;

use clap::Args;
use folio_export::{TextFont, export_text};
use folio_preview::SourceDocument;

use super::{CommonArgs, read_source};
use crate::error::CliError;
use crate::output::Output;
use crate::settings::{build_exporter, build_pipeline, page_config};

/// Arguments for the export command.
#[derive(Args)]
pub(crate) struct ExportArgs {
    /// Markdown source (default: the saved draft, or the sample document).
    input: Option<PathBuf>,

    /// Directory for the exported artifact (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Lay the source out as plain text pages instead of capturing the preview.
    #[arg(long)]
    fallback: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl ExportArgs {
    /// Execute the export command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the source cannot be read,
    /// the export is rejected or the artifact cannot be written.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config(self.output_dir)?;
        let text = read_source(self.input.as_deref(), &config)?;
        let page = page_config(&config);

        output.detail(
            "Page",
            &format!(
                "{} {} ({} mm margin)",
                page.format.as_str(),
                page.orientation.as_str(),
                page.margin_mm
            ),
        );

        let artifact = if self.fallback {
            export_text(&text, &page, &TextFont::default())?
        } else {
            let pipeline = build_pipeline(&config);
            build_exporter(&config)
                .export_source(&pipeline, &SourceDocument::new(text, 1), &page)
                .await?
        };

        let path = artifact.write_to(&config.export.output_dir)?;
        output.wrote(&path);
        Ok(())
    }
}
