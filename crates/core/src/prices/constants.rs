//! Price synchronization constants.

/// Canonical textual form of a stored day. This is the key format used by
/// every backend.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Start of record used as the watermark for instruments with no stored rows.
/// Far enough back that the provider returns the full available history.
pub const DEFAULT_START_DATE: &str = "1900-01-01";

/// Upper bound for a single provider request.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Extra attempts for transient provider errors (rate limit, timeout).
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Delay before the first retry; doubled for every further attempt.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1_000;
