//! Markdown parser configuration and failure modes.

use pulldown_cmark::Options;

/// Default upper bound on source size (4 MiB).
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 4 * 1024 * 1024;

/// Default maximum nesting depth of the document tree.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Markdown parser configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    /// Keep raw HTML blocks and inline HTML. When disabled, HTML is kept as text.
    pub allow_raw_html: bool,
    /// Turn bare `http(s)://` and `www.` URLs into links.
    pub autolink_bare_urls: bool,
    /// Smart quotes, dashes and ellipses.
    pub smart_typography: bool,
    /// Treat single newlines inside paragraphs as hard breaks.
    pub newlines_to_breaks: bool,
    /// Sources larger than this are rejected.
    pub max_source_bytes: usize,
    /// Nesting deeper than this is rejected.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            allow_raw_html: true,
            autolink_bare_urls: true,
            smart_typography: true,
            newlines_to_breaks: false,
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParserConfig {
    /// Parser options for `pulldown-cmark`.
    ///
    /// GitHub Flavored Markdown (tables, strikethrough, task lists, alerts)
    /// is always enabled.
    #[must_use]
    pub fn options(&self) -> Options {
        let mut options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_GFM
            | Options::ENABLE_DEFINITION_LIST;
        if self.smart_typography {
            options |= Options::ENABLE_SMART_PUNCTUATION;
        }
        options
    }
}

/// Failure to turn source text into a document.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("source is {size} bytes, exceeding the {limit} byte limit")]
    SourceTooLarge { size: usize, limit: usize },
    #[error("document nesting exceeds {limit} levels")]
    NestingTooDeep { limit: usize },
}
