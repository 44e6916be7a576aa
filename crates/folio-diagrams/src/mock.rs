//! Mock diagram renderer for testing.
//!
//! Provides [`MockRenderer`] for exercising resolution without a Kroki server.

use std::sync::Mutex;
use std::time::Duration;

use folio_renderer::DiagramId;

use crate::engine::{DiagramError, DiagramErrorKind, DiagramRenderer, DiagramRequest};

/// Scripted diagram renderer.
///
/// Sources containing the failure marker are rejected with a parse error;
/// everything else renders to a small SVG that embeds the request id. A source
/// starting with `%% delay=<ms>` sleeps that long before answering.
///
/// # Example
///
/// ```ignore
/// use folio_diagrams::{DiagramResolver, MockRenderer};
///
/// let resolver = DiagramResolver::new(MockRenderer::new().with_delay_ms(50));
/// ```
#[derive(Debug)]
pub struct MockRenderer {
    fail_marker: String,
    delay: Duration,
    requests: Mutex<Vec<DiagramId>>,
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self {
            fail_marker: "invalid".to_owned(),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject sources containing `marker`.
    #[must_use]
    pub fn with_fail_marker(mut self, marker: &str) -> Self {
        marker.clone_into(&mut self.fail_marker);
        self
    }

    /// Delay every answer by `ms` milliseconds.
    #[must_use]
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    /// Ids of all requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<DiagramId> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn delay_for(&self, source: &str) -> Duration {
        source
            .strip_prefix("%% delay=")
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|ms| ms.parse().ok())
            .map_or(self.delay, Duration::from_millis)
    }
}

impl DiagramRenderer for MockRenderer {
    async fn render(&self, request: DiagramRequest) -> Result<String, DiagramError> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.id);

        let delay = self.delay_for(&request.source);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if request.source.contains(&self.fail_marker) {
            return Err(DiagramError::new(
                request.id,
                DiagramErrorKind::Rejected(format!(
                    "Parse error: unexpected input in {} description",
                    request.language.kroki_endpoint()
                )),
            ));
        }

        Ok(format!(
            r#"<svg data-request="{}" viewBox="0 0 240 120"><rect width="240" height="120" fill="none" stroke="black"/></svg>"#,
            request.id
        ))
    }
}
