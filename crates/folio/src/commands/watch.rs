//! `folio watch` command implementation.
//!
//! Re-renders the preview page whenever the source file changes. Edits are
//! coalesced by the render scheduler, and the source is saved as the draft
//! on every submit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use folio_preview::{RenderEvent, RenderOutcome};
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::{CommonArgs, PREVIEW_FILE, report_warnings};
use crate::error::CliError;
use crate::output::Output;
use crate::settings::{build_pipeline, build_scheduler};

/// Capacity of the file change channel.
const CHANGE_CAPACITY: usize = 16;

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    /// Markdown source to watch.
    input: PathBuf,

    /// Preview page to write (default: preview.html in the output directory).
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl WatchArgs {
    /// Execute the watch command.
    ///
    /// Runs until interrupted with Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the source cannot be read or
    /// the watcher cannot be started.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config(None)?;
        let page_path = self
            .output
            .unwrap_or_else(|| config.export.output_dir.join(PREVIEW_FILE));

        let pipeline = Arc::new(build_pipeline(&config));
        let scheduler = build_scheduler(&config, Arc::clone(&pipeline));
        let mut events = scheduler.subscribe();

        let mut last = read_input(&self.input).await?;
        scheduler.submit(last.clone());

        // Editors often save by rename, so watch the parent directory.
        let (tx, mut rx) = mpsc::channel(CHANGE_CAPACITY);
        let target = self.input.file_name().map(ToOwned::to_owned);
        let mut watcher = notify::recommended_watcher(move |res| {
            let Ok(event) = res else { return };
            if !is_change(&event) {
                return;
            }
            if event
                .paths
                .iter()
                .any(|path| path.file_name() == target.as_deref())
            {
                let _ = tx.blocking_send(());
            }
        })?;
        let watch_dir = match self.input.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        output.info(&format!("Watching {}", self.input.display()));
        output.detail("Preview", &page_path.display().to_string());

        loop {
            tokio::select! {
                Some(()) = rx.recv() => {
                    match read_input(&self.input).await {
                        Ok(text) if text == last => {}
                        Ok(text) => {
                            last.clone_from(&text);
                            scheduler.submit(text);
                        }
                        Err(err) => output.warning(&format!("Warning: {err}")),
                    }
                }
                Ok(event) = events.recv() => {
                    if let Err(err) = publish(&output, &page_path, &pipeline.snapshot().to_html(), &event).await {
                        output.warning(&format!("Warning: {err}"));
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        output.info("Stopped watching");
        Ok(())
    }
}

fn is_change(event: &notify::Event) -> bool {
    matches!(
        event.kind,
        notify::EventKind::Create(_) | notify::EventKind::Modify(_)
    )
}

async fn read_input(path: &Path) -> Result<String, CliError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Input {
            path: path.to_path_buf(),
            source,
        })
}

/// Write the preview page after a finished pass and report the outcome.
async fn publish(
    output: &Output,
    page_path: &Path,
    html: &str,
    event: &RenderEvent,
) -> Result<(), CliError> {
    if matches!(event.outcome, RenderOutcome::Superseded) {
        return Ok(());
    }
    if let Some(parent) = page_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(page_path, html).await?;

    match &event.outcome {
        RenderOutcome::Ready {
            diagrams,
            failed,
            warnings,
        } => {
            report_warnings(output, warnings);
            output.info(&format!(
                "Revision {}: {diagrams} diagrams, {failed} failed",
                event.revision
            ));
        }
        RenderOutcome::Placeholder => {
            output.info(&format!("Revision {}: empty source", event.revision));
        }
        RenderOutcome::Failed(message) => {
            output.error(&format!("Revision {}: {message}", event.revision));
        }
        RenderOutcome::Superseded => {}
    }
    Ok(())
}
