//! Mapping from configuration to pipeline components.

use std::sync::Arc;
use std::time::Duration;

use folio_config::{Config, OrientationName, PageFormatName, Sizing, Theme};
use folio_diagrams::{DiagramResolver, KrokiRenderer, SizingPolicy};
use folio_export::{Exporter, Orientation, PageConfig, PageFormat, PrintHtmlComposer};
use folio_preview::{DraftStore, RenderPipeline, RenderScheduler};
use folio_raster::{RasterConfig, Rasterizer};
use folio_renderer::{ParserConfig, StyleSettings, ThemeVariant};

pub(crate) fn parser_config(config: &Config) -> ParserConfig {
    let parser = &config.parser;
    ParserConfig {
        allow_raw_html: parser.allow_raw_html,
        autolink_bare_urls: parser.autolink_bare_urls,
        smart_typography: parser.smart_typography,
        newlines_to_breaks: parser.newlines_to_breaks,
        max_source_bytes: parser.max_source_bytes,
        ..ParserConfig::default()
    }
}

pub(crate) fn style_settings(config: &Config) -> StyleSettings {
    StyleSettings {
        font_size: config.style.font_size,
        line_height: config.style.line_height,
        theme: match config.style.theme {
            Theme::Default => ThemeVariant::Default,
            Theme::Compact => ThemeVariant::Compact,
            Theme::Spacious => ThemeVariant::Spacious,
        },
    }
}

pub(crate) fn page_config(config: &Config) -> PageConfig {
    PageConfig {
        format: match config.page.format {
            PageFormatName::A4 => PageFormat::A4,
            PageFormatName::Letter => PageFormat::Letter,
            PageFormatName::Legal => PageFormat::Legal,
        },
        orientation: match config.page.orientation {
            OrientationName::Portrait => Orientation::Portrait,
            OrientationName::Landscape => Orientation::Landscape,
        },
        margin_mm: config.page.margin_mm,
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn sizing_policy(config: &Config) -> SizingPolicy {
    let diagrams = &config.diagrams;
    match diagrams.sizing {
        Sizing::Fixed => SizingPolicy::FixedBox {
            width: diagrams.fixed_width as f32,
            height: diagrams.fixed_height as f32,
        },
        Sizing::Intrinsic => SizingPolicy::Intrinsic,
        Sizing::Responsive => SizingPolicy::Responsive,
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn raster_config(config: &Config) -> RasterConfig {
    let raster = &config.raster;
    RasterConfig {
        scale: raster.scale,
        default_size: (raster.default_width as f32, raster.default_height as f32),
        load_system_fonts: raster.load_system_fonts,
    }
}

pub(crate) fn draft_store(config: &Config) -> DraftStore {
    DraftStore::new(&config.preview.state_dir)
}

pub(crate) fn build_pipeline(config: &Config) -> RenderPipeline<KrokiRenderer> {
    let renderer = KrokiRenderer::new(
        &config.diagrams.kroki_url,
        Duration::from_secs(config.diagrams.timeout_secs),
    );
    RenderPipeline::new(DiagramResolver::new(renderer).with_policy(sizing_policy(config)))
        .with_parser_config(parser_config(config))
        .with_style(style_settings(config))
}

pub(crate) fn build_scheduler(
    config: &Config,
    pipeline: Arc<RenderPipeline<KrokiRenderer>>,
) -> RenderScheduler<KrokiRenderer> {
    RenderScheduler::new(pipeline)
        .with_debounce(Duration::from_millis(config.preview.debounce_ms))
        .with_drafts(draft_store(config))
}

pub(crate) fn build_exporter(config: &Config) -> Exporter<PrintHtmlComposer> {
    Exporter::new(
        PrintHtmlComposer::new(),
        Rasterizer::new(raster_config(config)),
    )
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_map_to_library_defaults() {
        let config = Config::default();
        assert_eq!(parser_config(&config), ParserConfig::default());
        assert_eq!(style_settings(&config), StyleSettings::default());
        assert_eq!(page_config(&config), PageConfig::default());
        assert_eq!(sizing_policy(&config), SizingPolicy::Intrinsic);
        assert_eq!(raster_config(&config), RasterConfig::default());
    }

    #[test]
    fn test_fixed_sizing_uses_configured_box() {
        let mut config = Config::default();
        config.diagrams.sizing = Sizing::Fixed;
        config.diagrams.fixed_width = 800;
        assert_eq!(
            sizing_policy(&config),
            SizingPolicy::FixedBox {
                width: 800.0,
                height: 400.0,
            }
        );
    }

    #[test]
    fn test_page_and_theme_mapping() {
        let mut config = Config::default();
        config.page.format = PageFormatName::Legal;
        config.page.orientation = OrientationName::Landscape;
        config.style.theme = Theme::Compact;

        let page = page_config(&config);
        assert_eq!(page.format, PageFormat::Legal);
        assert_eq!(page.orientation, Orientation::Landscape);
        assert_eq!(style_settings(&config).theme, ThemeVariant::Compact);
    }
}
