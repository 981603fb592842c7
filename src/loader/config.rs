//! Loader configuration constants

use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of reports fetched at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Upper bound accepted for the concurrency limit.
pub const MAX_CONCURRENCY: usize = 32;

/// Error bodies longer than this many characters are truncated in outcome messages.
pub const MAX_ERROR_BODY_CHARS: usize = 512;

/// Initial backoff delay in milliseconds for client-side retries.
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000;

/// Calculate exponential backoff delay
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(retry_count));
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_MS))
}
