//! Timing rules of the update rollout.

use log::debug;
use rand::Rng;
use std::time::Duration;

pub const THREE_DAYS: i64 = 3 * 24 * 60 * 60 * 1000;

/// Age after which the last update, and the last failover, count as stale.
pub const STALE_WINDOW: i64 = 10 * THREE_DAYS;

/// Delay before a stale-update failover when peers are connected.
pub const CONNECTED_FAILOVER_DELAY: Duration = Duration::from_secs(60);

/// Delay before a stale-update failover when offline.
pub const DISCONNECTED_FAILOVER_DELAY: Duration = Duration::from_secs(5 * 60);

/// Uniform value in `[0, bound)`, 0 when `bound` is 0.
pub fn random_below<R: Rng>(rng: &mut R, bound: u64) -> i64 {
    if bound == 0 {
        return 0;
    }
    rng.gen_range(0..bound.min(i64::MAX as u64)) as i64
}

/// How long to wait before telling the user about a collection published at
/// `timestamp`.
///
/// Timestamps more than three days in the future fire at once. Otherwise the
/// notification lands at a random point of `update_delay` after `timestamp`.
pub fn notification_delay<R: Rng>(
    now: i64,
    timestamp: i64,
    update_delay: u64,
    rng: &mut R,
) -> i64 {
    if timestamp.saturating_sub(now) > THREE_DAYS {
        return 0;
    }

    let random = random_below(rng, update_delay);
    let then = timestamp.saturating_add(random);
    debug!("Delaying notification: now {now}, stamp {timestamp}, random {random}, then {then}");
    then.saturating_sub(now).max(0)
}

/// Whether `time` is older than the stale window at `now`.
pub fn is_stale(now: i64, time: i64) -> bool {
    time < now.saturating_sub(STALE_WINDOW)
}

pub fn millis(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}
