//! Diagram resolution.
//!
//! [`DiagramResolver`] settles pending diagram containers through a
//! [`DiagramRenderer`]. All containers of a pass are dispatched at once and
//! yielded as they settle; a failure only affects its own container.

use std::sync::Arc;

use folio_renderer::{DiagramDescriptor, DiagramStatus, Visual};
use futures::Stream;
use futures::stream::FuturesUnordered;

use crate::engine::{DiagramError, DiagramErrorKind, DiagramRenderer, DiagramRequest};
use crate::language::DiagramLanguage;
use crate::sizing::{SizingPolicy, has_svg_root, normalize_svg, size_visual};

/// Resolves diagram descriptors into sized visuals.
pub struct DiagramResolver<R> {
    renderer: Arc<R>,
    policy: SizingPolicy,
}

impl<R> Clone for DiagramResolver<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            policy: self.policy,
        }
    }
}

impl<R: DiagramRenderer> DiagramResolver<R> {
    /// Create a resolver with the default (intrinsic) sizing policy.
    #[must_use]
    pub fn new(renderer: R) -> Self {
        Self {
            renderer: Arc::new(renderer),
            policy: SizingPolicy::default(),
        }
    }

    /// Set the sizing policy.
    #[must_use]
    pub fn with_policy(mut self, policy: SizingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sizing policy in use.
    #[must_use]
    pub fn policy(&self) -> SizingPolicy {
        self.policy
    }

    /// Resolve one descriptor into a terminal state.
    ///
    /// Engine rejections and transport errors become `Failed` with a
    /// non-empty message.
    pub async fn resolve(&self, mut descriptor: DiagramDescriptor) -> DiagramDescriptor {
        descriptor.status = match self.render(&descriptor).await {
            Ok(svg) => {
                let visual = size_visual(&normalize_svg(&svg), self.policy);
                DiagramStatus::Resolved(Visual::Vector(visual))
            }
            Err(err) => {
                tracing::debug!(id = %err.id, error = %err.kind, "Diagram failed");
                DiagramStatus::Failed(failure_message(&err.kind))
            }
        };
        descriptor
    }

    async fn render(&self, descriptor: &DiagramDescriptor) -> Result<String, DiagramError> {
        let language = DiagramLanguage::parse(&descriptor.language).ok_or_else(|| {
            DiagramError::new(
                descriptor.id,
                DiagramErrorKind::UnsupportedLanguage(descriptor.language.clone()),
            )
        })?;

        let svg = self
            .renderer
            .render(DiagramRequest {
                id: descriptor.id,
                language,
                source: descriptor.source.clone(),
            })
            .await?;

        if has_svg_root(&svg) {
            Ok(svg)
        } else {
            Err(DiagramError::new(descriptor.id, DiagramErrorKind::InvalidSvg))
        }
    }

    /// Dispatch every descriptor at once and yield each as it settles.
    ///
    /// The stream ends only after all descriptors reached a terminal state,
    /// regardless of individual failures.
    pub fn resolve_all(
        &self,
        descriptors: Vec<DiagramDescriptor>,
    ) -> impl Stream<Item = DiagramDescriptor> + Send + '_ {
        descriptors
            .into_iter()
            .map(|descriptor| self.resolve(descriptor))
            .collect::<FuturesUnordered<_>>()
    }
}

fn failure_message(kind: &DiagramErrorKind) -> String {
    let message = kind.to_string();
    if message.trim().is_empty() {
        "unknown diagram error".to_owned()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use folio_renderer::{DiagramId, VisualSize};
    use futures::StreamExt;
    use pretty_assertions::assert_eq;

    /// Fails on sources containing `invalid`; sleeps `delay_ms=N` when given.
    #[derive(Default)]
    struct FakeRenderer {
        seen_ids: Mutex<Vec<DiagramId>>,
    }

    impl DiagramRenderer for FakeRenderer {
        async fn render(&self, request: DiagramRequest) -> Result<String, DiagramError> {
            self.seen_ids.lock().unwrap().push(request.id);
            if let Some(ms) = request
                .source
                .strip_prefix("delay_ms=")
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.parse().ok())
            {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            if request.source.contains("invalid") {
                return Err(DiagramError::new(
                    request.id,
                    DiagramErrorKind::Rejected("Parse error on line 1".to_owned()),
                ));
            }
            Ok(format!(
                r#"<svg id="{}" viewBox="0 0 200 100"><text>{}</text></svg>"#,
                request.id, request.source
            ))
        }
    }

    fn pending(id: u64, source: &str) -> DiagramDescriptor {
        DiagramDescriptor::pending(DiagramId::new(id), "mermaid", source)
    }

    #[tokio::test]
    async fn test_resolve_valid_diagram() {
        let resolver = DiagramResolver::new(FakeRenderer::default());
        let resolved = resolver.resolve(pending(1, "graph TD")).await;

        let DiagramStatus::Resolved(Visual::Vector(visual)) = &resolved.status else {
            panic!("expected resolved vector, got {:?}", resolved.status);
        };
        assert_eq!(
            visual.size,
            VisualSize::Absolute {
                width: 200.0,
                height: 100.0,
            }
        );
        assert!(visual.markup.contains(r#"xmlns="http://www.w3.org/2000/svg""#));
    }

    #[tokio::test]
    async fn test_resolve_invalid_diagram_fails_with_message() {
        let resolver = DiagramResolver::new(FakeRenderer::default());
        let resolved = resolver.resolve(pending(1, "graph TD; A -->")).await;
        let resolved_bad = resolver.resolve(pending(2, "invalid [[")).await;

        assert!(matches!(resolved.status, DiagramStatus::Resolved(_)));
        assert_eq!(
            resolved_bad.status,
            DiagramStatus::Failed("Parse error on line 1".to_owned())
        );
    }

    #[tokio::test]
    async fn test_unsupported_language_fails() {
        let resolver = DiagramResolver::new(FakeRenderer::default());
        let descriptor = DiagramDescriptor::pending(DiagramId::new(1), "rust", "fn main() {}");
        let resolved = resolver.resolve(descriptor).await;

        assert_eq!(
            resolved.status,
            DiagramStatus::Failed("unsupported diagram language 'rust'".to_owned())
        );
    }

    struct TextRenderer;

    impl DiagramRenderer for TextRenderer {
        async fn render(&self, _request: DiagramRequest) -> Result<String, DiagramError> {
            Ok("not an image".to_owned())
        }
    }

    #[tokio::test]
    async fn test_non_svg_output_fails() {
        let resolver = DiagramResolver::new(TextRenderer);
        let resolved = resolver.resolve(pending(1, "graph TD")).await;
        assert_eq!(
            resolved.status,
            DiagramStatus::Failed("engine returned no SVG content".to_owned())
        );
    }

    #[tokio::test]
    async fn test_same_source_different_ids_are_independent() {
        let resolver = DiagramResolver::new(FakeRenderer::default());
        let a = resolver.resolve(pending(10, "graph TD")).await;
        let b = resolver.resolve(pending(11, "graph TD")).await;

        assert_ne!(a.id, b.id);
        let (DiagramStatus::Resolved(Visual::Vector(va)), DiagramStatus::Resolved(Visual::Vector(vb))) =
            (&a.status, &b.status)
        else {
            panic!("both should resolve");
        };
        assert!(va.markup.contains(r#"id="diagram-10""#));
        assert!(vb.markup.contains(r#"id="diagram-11""#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_all_dispatches_concurrently() {
        let resolver = DiagramResolver::new(FakeRenderer::default());
        let descriptors = vec![
            pending(1, "delay_ms=300 slow"),
            pending(2, "delay_ms=100 invalid"),
            pending(3, "delay_ms=200 ok"),
        ];

        let start = tokio::time::Instant::now();
        let settled: Vec<DiagramDescriptor> = resolver.resolve_all(descriptors).collect().await;

        // Concurrent dispatch: total time is the slowest, not the sum.
        assert_eq!(start.elapsed(), Duration::from_millis(300));
        let order: Vec<u64> = settled.iter().map(|d| d.id.value()).collect();
        assert_eq!(order, vec![2, 3, 1]);
        assert!(settled.iter().all(DiagramDescriptor::is_terminal));
        assert!(matches!(settled[0].status, DiagramStatus::Failed(_)));

        let seen: HashSet<DiagramId> = resolver.renderer.seen_ids.lock().unwrap().iter().copied().collect();
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn test_resolve_all_empty() {
        let resolver = DiagramResolver::new(FakeRenderer::default());
        let settled: Vec<DiagramDescriptor> = resolver.resolve_all(Vec::new()).collect().await;
        assert!(settled.is_empty());
    }
}
