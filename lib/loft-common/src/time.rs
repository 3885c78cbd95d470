//! Wall-clock helpers.

use std::time::SystemTime;

/// Returns the current Unix timestamp, in whole seconds.
///
/// Clamps to zero if the system clock reads before the Unix epoch.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
