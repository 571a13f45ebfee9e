//! Rate limiting configuration.

use std::time::Duration;

/// Rate limiting configuration for a provider.
///
/// Controls how aggressively we can call a provider to avoid
/// hitting their rate limits and getting blocked.
#[derive(Clone, Debug)]
pub struct RateLimit {
    /// Minimum delay between two consecutive requests.
    pub min_delay: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(100),
        }
    }
}
