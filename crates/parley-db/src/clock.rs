use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Creation timestamp in milliseconds since the epoch.
///
/// Strictly increasing within the process, so creation time alone orders
/// rows even when several are written inside the same millisecond.
pub fn now_millis() -> i64 {
    let wall = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = wall.max(last + 1);
        match LAST_MILLIS.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Stored millisecond timestamp as UTC. Out-of-range values map to the epoch.
pub fn to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_strictly_increase() {
        let mut prev = now_millis();
        for _ in 0..1000 {
            let next = now_millis();
            assert!(next > prev);
            prev = next;
        }
    }
}
