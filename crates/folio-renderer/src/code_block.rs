//! Code block processor trait for extensible code block handling.
//!
//! Processors are registered with the renderer and checked in order when a
//! fenced code block is encountered. The first processor returning a
//! non-`PassThrough` result wins; its block replaces the code block in the
//! document tree at the same position.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use folio_renderer::{Block, CodeBlockProcessor, ProcessResult};
//!
//! struct UpperProcessor;
//!
//! impl CodeBlockProcessor for UpperProcessor {
//!     fn process(
//!         &mut self,
//!         language: &str,
//!         _attrs: &HashMap<String, String>,
//!         source: &str,
//!         _index: usize,
//!     ) -> ProcessResult {
//!         if language == "shout" {
//!             ProcessResult::Block(Block::Plain(vec![
//!                 folio_renderer::Inline::Text(source.to_uppercase()),
//!             ]))
//!         } else {
//!             ProcessResult::PassThrough
//!         }
//!     }
//! }
//! ```

use std::collections::HashMap;

use crate::document::Block;

/// Result of processing a code block.
#[derive(Clone, Debug, PartialEq)]
pub enum ProcessResult {
    /// Replace the code block with this block.
    Block(Block),

    /// Keep it as a regular code block.
    PassThrough,
}

/// Trait for processing special code blocks.
pub trait CodeBlockProcessor {
    /// Process a code block and return the result.
    ///
    /// # Arguments
    ///
    /// * `language` - Language identifier from fence info string
    /// * `attrs` - Attributes parsed from fence (key=value pairs)
    /// * `source` - Raw content of the code block
    /// * `index` - Zero-based position of the code block in the document
    fn process(
        &mut self,
        language: &str,
        attrs: &HashMap<String, String>,
        source: &str,
        index: usize,
    ) -> ProcessResult;

    /// Get warnings generated during processing.
    ///
    /// Default implementation returns empty slice.
    fn warnings(&self) -> &[String] {
        &[]
    }
}

/// Parse fence info string into language and attributes.
///
/// Format: `language [key=value ...]`
#[must_use]
pub(crate) fn parse_fence_info(info: &str) -> (String, HashMap<String, String>) {
    let mut parts = info.split_whitespace();
    let language = parts.next().unwrap_or("").to_owned();

    let mut attrs = HashMap::new();
    for part in parts {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim_matches('"').trim_matches('\'');
            attrs.insert(key.to_owned(), value.to_owned());
        }
    }

    (language, attrs)
}
