//! Central configuration constants for runtime limits and defaults.

/// Seconds between the end of one sync cycle and the start of the next.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// Shortest allowed refresh interval.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 1;

/// Only object keys ending with this suffix are tracked.
pub const DEFAULT_TRACKED_SUFFIX: &str = ".tfstate";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Path-style S3 endpoint; the bucket is appended to it.
pub const DEFAULT_S3_ENDPOINT: &str = "https://s3.amazonaws.com";

/// Default number of versions of one key fetched concurrently.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// Minimum allowed fetch concurrency.
pub const MIN_FETCH_CONCURRENCY: usize = 1;

/// Maximum allowed fetch concurrency.
pub const MAX_FETCH_CONCURRENCY: usize = 16;

/// Whole-request timeout for object store calls.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Convenience function to clamp a concurrency value into allowed range.
pub fn clamp_fetch_concurrency(v: usize) -> usize {
    v.clamp(MIN_FETCH_CONCURRENCY, MAX_FETCH_CONCURRENCY)
}

pub fn clamp_interval_secs(v: u64) -> u64 {
    v.max(MIN_REFRESH_INTERVAL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_into_allowed_ranges() {
        assert_eq!(clamp_fetch_concurrency(0), 1);
        assert_eq!(clamp_fetch_concurrency(DEFAULT_FETCH_CONCURRENCY), 4);
        assert_eq!(clamp_fetch_concurrency(1000), MAX_FETCH_CONCURRENCY);
        assert_eq!(clamp_interval_secs(0), 1);
        assert_eq!(clamp_interval_secs(DEFAULT_REFRESH_INTERVAL_SECS), 60);
    }
}
