//! Presence inference from heartbeat timestamps.

use std::time::Duration;

/// Interval at which an open client reports liveness.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// A peer counts as connected while its last heartbeat is younger than this.
/// Tolerates roughly two missed beats.
pub const CONNECTED_THRESHOLD_MS: i64 = 25_000;

/// `(now - last_activity) < CONNECTED_THRESHOLD_MS`
pub fn is_connected(last_activity: i64, now: i64) -> bool {
    now.saturating_sub(last_activity) < CONNECTED_THRESHOLD_MS
}
