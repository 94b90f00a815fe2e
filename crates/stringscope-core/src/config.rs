//! Panel configuration.

use std::time::Duration;

/// Default service address (the bundled server's default bind).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default polling interval in milliseconds.
pub const DEFAULT_POLL_MS: u64 = 2_000;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Shortest polling interval accepted.
const MIN_POLL_MS: u64 = 100;

/// Settings shared by the HTTP client and the reconciliation loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelConfig {
    /// Service root, without the API prefix.
    pub base_url: String,
    /// Tick interval. Also used as the suppression window after a local edit.
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            request_timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PanelConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the polling interval, clamped to at least 100 ms.
    pub fn with_poll_ms(mut self, ms: u64) -> Self {
        self.poll_interval = Duration::from_millis(ms.max(MIN_POLL_MS));
        self
    }

    /// Set the request timeout. Non-positive or non-finite values keep the default.
    pub fn with_timeout_secs(mut self, secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            self.request_timeout = Duration::from_secs_f64(secs);
        }
        self
    }

    /// Time after a local edit during which periodic refreshes are withheld.
    pub fn suppression_window(&self) -> Duration {
        self.poll_interval
    }
}
