//! Internal constants for diagram rendering.

use std::time::Duration;

/// Default Kroki server.
pub const DEFAULT_KROKI_URL: &str = "https://kroki.io";

/// Default HTTP timeout for Kroki requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Box used by the fixed sizing policy and as the last-resort size.
pub const DEFAULT_BOX: (f32, f32) = (600.0, 400.0);
