//! CLI command implementations.

pub(crate) mod export;
pub(crate) mod render;
pub(crate) mod watch;

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use folio_config::{CliSettings, Config, OrientationName, PageFormatName, Sizing, Theme};

use crate::error::CliError;
use crate::output::Output;
use crate::settings::draft_store;

pub(crate) use export::ExportArgs;
pub(crate) use render::RenderArgs;
pub(crate) use watch::WatchArgs;

/// File name of the projected preview page.
pub(crate) const PREVIEW_FILE: &str = "preview.html";

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum ThemeArg {
    Default,
    Compact,
    Spacious,
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum FormatArg {
    A4,
    Letter,
    Legal,
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum SizingArg {
    Fixed,
    Intrinsic,
    Responsive,
}

/// Options shared by every command.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Kroki server URL for diagram rendering (overrides config).
    #[arg(long, env = "FOLIO_KROKI_URL")]
    kroki_url: Option<String>,

    /// Diagram sizing policy (overrides config).
    #[arg(long, value_enum)]
    sizing: Option<SizingArg>,

    /// Theme variant (overrides config).
    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,

    /// Base font size in pixels (overrides config).
    #[arg(long)]
    font_size: Option<f32>,

    /// Line height multiplier (overrides config).
    #[arg(long)]
    line_height: Option<f32>,

    /// Page format (overrides config).
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Page orientation (overrides config).
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Page margin in millimetres (overrides config).
    #[arg(long)]
    margin: Option<f32>,

    /// Enable verbose output (timing logs and diagram warnings).
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load configuration with these arguments applied on top.
    pub(crate) fn load_config(&self, output_dir: Option<PathBuf>) -> Result<Config, CliError> {
        let settings = CliSettings {
            kroki_url: self.kroki_url.clone(),
            sizing: self.sizing.map(|s| match s {
                SizingArg::Fixed => Sizing::Fixed,
                SizingArg::Intrinsic => Sizing::Intrinsic,
                SizingArg::Responsive => Sizing::Responsive,
            }),
            theme: self.theme.map(|t| match t {
                ThemeArg::Default => Theme::Default,
                ThemeArg::Compact => Theme::Compact,
                ThemeArg::Spacious => Theme::Spacious,
            }),
            font_size: self.font_size,
            line_height: self.line_height,
            page_format: self.format.map(|f| match f {
                FormatArg::A4 => PageFormatName::A4,
                FormatArg::Letter => PageFormatName::Letter,
                FormatArg::Legal => PageFormatName::Legal,
            }),
            orientation: self.orientation.map(|o| match o {
                OrientationArg::Portrait => OrientationName::Portrait,
                OrientationArg::Landscape => OrientationName::Landscape,
            }),
            margin_mm: self.margin,
            output_dir,
        };
        Ok(Config::load(self.config.as_deref(), Some(&settings))?)
    }
}

/// Read the source text from `input`, or restore the persisted draft.
pub(crate) fn read_source(input: Option<&Path>, config: &Config) -> Result<String, CliError> {
    match input {
        Some(path) => std::fs::read_to_string(path).map_err(|source| CliError::Input {
            path: path.to_path_buf(),
            source,
        }),
        None => Ok(draft_store(config).load_or_sample()?),
    }
}

/// Print code block warnings.
pub(crate) fn report_warnings(output: &Output, warnings: &[String]) {
    for warning in warnings {
        output.warning(&format!("Warning: {warning}"));
    }
}
