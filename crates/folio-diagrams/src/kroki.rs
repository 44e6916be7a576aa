//! Kroki diagram rendering.
//!
//! Diagrams are sent to a Kroki server as plain text via HTTP POST and come
//! back as SVG. The HTTP client is blocking, so each request runs on the
//! blocking thread pool and the calling task only awaits its completion.

use std::sync::Arc;
use std::time::Duration;

use ureq::Agent;

use crate::consts::{DEFAULT_KROKI_URL, DEFAULT_TIMEOUT};
use crate::engine::{DiagramError, DiagramErrorKind, DiagramRenderer, DiagramRequest};

/// Create HTTP agent with the specified timeout.
///
/// Status codes are not turned into errors so the response body of a
/// rejected diagram can be surfaced to the user.
pub fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Diagram renderer backed by a Kroki server.
#[derive(Clone)]
pub struct KrokiRenderer {
    agent: Agent,
    server_url: Arc<str>,
}

impl KrokiRenderer {
    /// Create a renderer for the given Kroki server URL.
    #[must_use]
    pub fn new(server_url: &str, timeout: Duration) -> Self {
        Self {
            agent: create_agent(timeout),
            server_url: Arc::from(server_url.trim_end_matches('/')),
        }
    }

    /// Server URL without trailing slash.
    #[must_use]
    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

impl Default for KrokiRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_KROKI_URL, DEFAULT_TIMEOUT)
    }
}

impl DiagramRenderer for KrokiRenderer {
    async fn render(&self, request: DiagramRequest) -> Result<String, DiagramError> {
        let agent = self.agent.clone();
        let server_url = Arc::clone(&self.server_url);
        let id = request.id;

        tokio::task::spawn_blocking(move || render_svg(&agent, &request, &server_url))
            .await
            .map_err(|e| DiagramError::new(id, DiagramErrorKind::Io(e.to_string())))?
    }
}

/// Send a diagram to Kroki and return the SVG body.
///
/// 4xx responses mean Kroki could not parse the description and are reported
/// as rejections carrying the response body.
fn render_svg(
    agent: &Agent,
    request: &DiagramRequest,
    server_url: &str,
) -> Result<String, DiagramError> {
    let endpoint = request.language.kroki_endpoint();
    let url = format!("{server_url}/{endpoint}/svg");

    let response = agent
        .post(&url)
        .header("Content-Type", "text/plain")
        .send(request.source.as_bytes())
        .map_err(|e| DiagramError::new(request.id, DiagramErrorKind::Http(e.to_string())))?;

    let status = response.status().as_u16();
    let mut body = response.into_body();

    if status >= 400 {
        let error_body = body
            .read_to_string()
            .unwrap_or_else(|_| String::from("(unable to read error body)"));
        let message = error_body.trim();
        let kind = match status {
            400..=499 if !message.is_empty() => DiagramErrorKind::Rejected(message.to_owned()),
            _ => DiagramErrorKind::Http(format!("HTTP {status}: {message}")),
        };
        return Err(DiagramError::new(request.id, kind));
    }

    body.read_to_string()
        .map_err(|e| DiagramError::new(request.id, DiagramErrorKind::Io(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_url_trailing_slash_trimmed() {
        let renderer = KrokiRenderer::new("http://localhost:8000/", DEFAULT_TIMEOUT);
        assert_eq!(renderer.server_url(), "http://localhost:8000");
    }

    #[test]
    fn test_default_server() {
        assert_eq!(KrokiRenderer::default().server_url(), "https://kroki.io");
    }
}
