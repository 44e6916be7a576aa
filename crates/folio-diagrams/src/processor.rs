//! Code block processor for diagram languages.
//!
//! [`DiagramProcessor`] implements [`CodeBlockProcessor`] and replaces diagram
//! fences with pending diagram containers. Each container receives a fresh id
//! from the shared [`DiagramIdSequence`] at discovery time, so containers are
//! in source order before any rendering starts.

use std::collections::HashMap;

use folio_renderer::{Block, CodeBlockProcessor, DiagramDescriptor, ProcessResult};

use crate::language::DiagramLanguage;
use crate::sequence::DiagramIdSequence;

/// Code block processor for diagram languages.
///
/// # Example
///
/// ```
/// use folio_diagrams::{DiagramIdSequence, DiagramProcessor};
/// use folio_renderer::{MarkdownRenderer, ParserConfig};
///
/// let markdown = "```mermaid\ngraph TD\n  A --> B\n```";
/// let result = MarkdownRenderer::new(ParserConfig::default())
///     .with_processor(DiagramProcessor::new(DiagramIdSequence::new()))
///     .render(markdown)
///     .unwrap();
/// assert_eq!(result.document.diagrams().len(), 1);
/// ```
pub struct DiagramProcessor {
    ids: DiagramIdSequence,
    warnings: Vec<String>,
}

impl DiagramProcessor {
    /// Create a processor drawing ids from the given sequence.
    #[must_use]
    pub fn new(ids: DiagramIdSequence) -> Self {
        Self {
            ids,
            warnings: Vec::new(),
        }
    }
}

impl CodeBlockProcessor for DiagramProcessor {
    fn process(
        &mut self,
        language: &str,
        attrs: &HashMap<String, String>,
        source: &str,
        index: usize,
    ) -> ProcessResult {
        let Some(diagram_language) = DiagramLanguage::parse(language) else {
            return ProcessResult::PassThrough;
        };

        let mut keys: Vec<&String> = attrs.keys().collect();
        keys.sort();
        for key in keys {
            self.warnings.push(format!(
                "code block {index}: unknown diagram attribute '{key}' ignored"
            ));
        }

        let id = self.ids.next_id();
        tracing::trace!(%id, language = diagram_language.kroki_endpoint(), "Discovered diagram");

        ProcessResult::Block(Block::Diagram(DiagramDescriptor::pending(
            id,
            diagram_language.kroki_endpoint(),
            source.trim(),
        )))
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
