//! Configuration management for folio.
//!
//! Parses `folio.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! User-facing controls (font size, line height, page margin, raster scale)
//! are clamped into their allowed ranges rather than rejected; every clamp is
//! logged with the field name.
//!
//! ## Environment Variable Expansion
//!
//! `diagrams.kroki_url` supports `${VAR}` and `${VAR:-default}`.

mod expand;

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "folio.toml";

pub const FONT_SIZE_RANGE: RangeInclusive<f32> = 8.0..=32.0;
pub const LINE_HEIGHT_RANGE: RangeInclusive<f32> = 1.0..=3.0;
pub const MARGIN_MM_RANGE: RangeInclusive<f32> = 0.0..=50.0;
pub const RASTER_SCALE_RANGE: RangeInclusive<f32> = 1.0..=4.0;

/// CLI settings that override configuration file values.
///
/// Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    pub kroki_url: Option<String>,
    pub sizing: Option<Sizing>,
    pub theme: Option<Theme>,
    pub font_size: Option<f32>,
    pub line_height: Option<f32>,
    pub page_format: Option<PageFormatName>,
    pub orientation: Option<OrientationName>,
    pub margin_mm: Option<f32>,
    pub output_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parser: ParserSection,
    pub style: StyleSection,
    pub page: PageSection,
    pub diagrams: DiagramsSection,
    pub raster: RasterSection,
    pub preview: PreviewSection,
    pub export: ExportSection,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Markdown parser options.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ParserSection {
    pub allow_raw_html: bool,
    pub autolink_bare_urls: bool,
    pub smart_typography: bool,
    pub newlines_to_breaks: bool,
    /// Largest accepted source, in bytes.
    pub max_source_bytes: usize,
}

impl Default for ParserSection {
    fn default() -> Self {
        Self {
            allow_raw_html: true,
            autolink_bare_urls: true,
            smart_typography: true,
            newlines_to_breaks: false,
            max_source_bytes: 4 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Compact,
    Spacious,
}

/// Presentation controls.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct StyleSection {
    /// Base font size in CSS pixels.
    pub font_size: f32,
    pub line_height: f32,
    pub theme: Theme,
}

impl Default for StyleSection {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            line_height: 1.6,
            theme: Theme::Default,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageFormatName {
    #[default]
    A4,
    Letter,
    Legal,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrientationName {
    #[default]
    Portrait,
    Landscape,
}

/// Page settings for export.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PageSection {
    pub format: PageFormatName,
    pub orientation: OrientationName,
    /// Margin on every edge, in millimetres.
    pub margin_mm: f32,
}

impl Default for PageSection {
    fn default() -> Self {
        Self {
            format: PageFormatName::A4,
            orientation: OrientationName::Portrait,
            margin_mm: 15.0,
        }
    }
}

/// Diagram sizing policy.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sizing {
    Fixed,
    #[default]
    Intrinsic,
    Responsive,
}

/// Diagram rendering configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DiagramsSection {
    /// Kroki server URL.
    pub kroki_url: String,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    pub sizing: Sizing,
    /// Box used by the fixed sizing policy, in CSS pixels.
    pub fixed_width: u32,
    pub fixed_height: u32,
}

impl Default for DiagramsSection {
    fn default() -> Self {
        Self {
            kroki_url: "https://kroki.io".to_owned(),
            timeout_secs: 30,
            sizing: Sizing::Intrinsic,
            fixed_width: 600,
            fixed_height: 400,
        }
    }
}

/// Rasterization configuration.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RasterSection {
    /// Quality multiplier.
    pub scale: f32,
    /// Fallback target size in CSS pixels.
    pub default_width: u32,
    pub default_height: u32,
    pub load_system_fonts: bool,
}

impl Default for RasterSection {
    fn default() -> Self {
        Self {
            scale: 2.0,
            default_width: 600,
            default_height: 400,
            load_system_fonts: true,
        }
    }
}

/// Live preview configuration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PreviewSection {
    pub debounce_ms: u64,
    /// Directory holding the persisted draft (relative to the config file).
    pub state_dir: PathBuf,
}

impl Default for PreviewSection {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            state_dir: PathBuf::from(".folio"),
        }
    }
}

/// Export configuration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ExportSection {
    /// Directory receiving exported artifacts (relative to the config file).
    pub output_dir: PathBuf,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`diagrams.kroki_url`").
        field: String,
        /// Error message (e.g., "${`KROKI_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Require a numeric field to be positive.
fn require_positive(value: u64, field: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

/// Clamp a control into `range`, logging when the value changes.
///
/// Non-finite values fall back to `default`.
fn clamp_control(value: &mut f32, range: &RangeInclusive<f32>, default: f32, field: &str) {
    let clamped = if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        default
    };
    if clamped.to_bits() != value.to_bits() {
        tracing::warn!(
            field,
            value = *value,
            clamped,
            "Configuration value out of range, clamped"
        );
        *value = clamped;
    }
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `folio.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.clamp_controls();
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(kroki_url) = &settings.kroki_url {
            self.diagrams.kroki_url.clone_from(kroki_url);
        }
        if let Some(sizing) = settings.sizing {
            self.diagrams.sizing = sizing;
        }
        if let Some(theme) = settings.theme {
            self.style.theme = theme;
        }
        if let Some(font_size) = settings.font_size {
            self.style.font_size = font_size;
        }
        if let Some(line_height) = settings.line_height {
            self.style.line_height = line_height;
        }
        if let Some(format) = settings.page_format {
            self.page.format = format;
        }
        if let Some(orientation) = settings.orientation {
            self.page.orientation = orientation;
        }
        if let Some(margin_mm) = settings.margin_mm {
            self.page.margin_mm = margin_mm;
        }
        if let Some(output_dir) = &settings.output_dir {
            self.export.output_dir.clone_from(output_dir);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.clamp_controls();
        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.diagrams.kroki_url = expand::expand_env(&self.diagrams.kroki_url, "diagrams.kroki_url")?;
        Ok(())
    }

    /// Resolve relative directories against the config file's directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                config_dir.join(path)
            }
        };
        self.preview.state_dir = resolve(&self.preview.state_dir);
        self.export.output_dir = resolve(&self.export.output_dir);
    }

    /// Clamp user-facing controls into their allowed ranges.
    pub fn clamp_controls(&mut self) {
        let style = StyleSection::default();
        clamp_control(
            &mut self.style.font_size,
            &FONT_SIZE_RANGE,
            style.font_size,
            "style.font_size",
        );
        clamp_control(
            &mut self.style.line_height,
            &LINE_HEIGHT_RANGE,
            style.line_height,
            "style.line_height",
        );
        clamp_control(
            &mut self.page.margin_mm,
            &MARGIN_MM_RANGE,
            PageSection::default().margin_mm,
            "page.margin_mm",
        );
        clamp_control(
            &mut self.raster.scale,
            &RASTER_SCALE_RANGE,
            RasterSection::default().scale,
            "raster.scale",
        );
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_parser()?;
        self.validate_diagrams()?;
        self.validate_raster()?;
        Ok(())
    }

    fn validate_parser(&self) -> Result<(), ConfigError> {
        require_positive(
            self.parser.max_source_bytes as u64,
            "parser.max_source_bytes",
        )
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.diagrams.kroki_url, "diagrams.kroki_url")?;
        require_http_url(&self.diagrams.kroki_url, "diagrams.kroki_url")?;
        require_positive(self.diagrams.timeout_secs, "diagrams.timeout_secs")?;
        require_positive(self.diagrams.fixed_width.into(), "diagrams.fixed_width")?;
        require_positive(self.diagrams.fixed_height.into(), "diagrams.fixed_height")?;
        Ok(())
    }

    fn validate_raster(&self) -> Result<(), ConfigError> {
        require_positive(self.raster.default_width.into(), "raster.default_width")?;
        require_positive(self.raster.default_height.into(), "raster.default_height")?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.style.font_size, 14.0);
        assert_eq!(config.page.format, PageFormatName::A4);
        assert_eq!(config.page.margin_mm, 15.0);
        assert_eq!(config.diagrams.kroki_url, "https://kroki.io");
        assert_eq!(config.diagrams.sizing, Sizing::Intrinsic);
        assert_eq!(config.preview.debounce_ms, 200);
        assert!(config.parser.allow_raw_html);
        assert!(!config.parser.newlines_to_breaks);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[parser]
allow_raw_html = false
newlines_to_breaks = true

[style]
font_size = 16.0
theme = "compact"

[page]
format = "letter"
orientation = "landscape"
margin_mm = 20.0

[diagrams]
kroki_url = "http://localhost:8000"
sizing = "responsive"

[raster]
scale = 3.0
load_system_fonts = false

[preview]
debounce_ms = 100
state_dir = "state"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.parser.allow_raw_html);
        assert!(config.parser.newlines_to_breaks);
        assert_eq!(config.style.theme, Theme::Compact);
        assert_eq!(config.page.format, PageFormatName::Letter);
        assert_eq!(config.page.orientation, OrientationName::Landscape);
        assert_eq!(config.diagrams.sizing, Sizing::Responsive);
        assert_eq!(config.raster.scale, 3.0);
        assert_eq!(config.preview.state_dir, PathBuf::from("state"));
    }

    #[test]
    fn test_unknown_theme_is_parse_error() {
        let result: Result<Config, _> = toml::from_str("[style]\ntheme = \"neon\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_clamp_controls() {
        let mut config = Config::default();
        config.style.font_size = 100.0;
        config.style.line_height = f32::NAN;
        config.page.margin_mm = -5.0;
        config.raster.scale = 0.5;
        config.clamp_controls();

        assert_eq!(config.style.font_size, 32.0);
        assert_eq!(config.style.line_height, 1.6);
        assert_eq!(config.page.margin_mm, 0.0);
        assert_eq!(config.raster.scale, 1.0);
    }

    #[test]
    fn test_resolve_paths() {
        let mut config: Config =
            toml::from_str("[preview]\nstate_dir = \"drafts\"\n[export]\noutput_dir = \"/abs/out\"\n")
                .unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.preview.state_dir, PathBuf::from("/project/drafts"));
        assert_eq!(config.export.output_dir, PathBuf::from("/abs/out"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        let settings = CliSettings {
            kroki_url: Some("http://kroki:8000".to_owned()),
            theme: Some(Theme::Spacious),
            margin_mm: Some(25.0),
            output_dir: Some(PathBuf::from("out")),
            ..CliSettings::default()
        };
        config.apply_cli_settings(&settings);

        assert_eq!(config.diagrams.kroki_url, "http://kroki:8000");
        assert_eq!(config.style.theme, Theme::Spacious);
        assert_eq!(config.page.margin_mm, 25.0);
        assert_eq!(config.export.output_dir, PathBuf::from("out"));
        assert_eq!(config.style.font_size, 14.0);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.diagrams, DiagramsSection::default());
    }

    #[test]
    fn test_validate_default_config_passes() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_kroki_url_invalid_scheme() {
        let mut config = Config::default();
        config.diagrams.kroki_url = "kroki.io".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("diagrams.kroki_url"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.diagrams.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(
            &path,
            "[diagrams]\nkroki_url = \"${FOLIO_TEST_UNSET_URL:-http://localhost:8000}\"\n\n[style]\nfont_size = 2.0\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.diagrams.kroki_url, "http://localhost:8000");
        assert_eq!(config.style.font_size, 8.0);
        assert_eq!(config.preview.state_dir, dir.path().join(".folio"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/folio.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_cli_settings_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(&path, "").unwrap();

        let settings = CliSettings {
            font_size: Some(99.0),
            ..CliSettings::default()
        };
        let config = Config::load(Some(&path), Some(&settings)).unwrap();
        assert_eq!(config.style.font_size, 32.0);
    }
}
