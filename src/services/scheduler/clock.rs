use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};

/// Longest single sleep before the wall clock is re-read.
const MAX_SLEEP_SLICE: Duration = Duration::from_secs(60);

/// Service-local wall clock. Cadences are evaluated against `now()`.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Resolves once `now() >= deadline`.
    async fn sleep_until(&self, deadline: NaiveDateTime);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep_until(&self, deadline: NaiveDateTime) {
        // Sleep in slices so wall clock jumps (NTP, DST) are picked up.
        loop {
            match (deadline - self.now()).to_std() {
                Ok(remaining) if !remaining.is_zero() => {
                    tokio::time::sleep(remaining.min(MAX_SLEEP_SLICE)).await;
                }
                _ => return,
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_clock_returns_for_past_deadline() {
        let clock = SystemClock;
        let past = clock.now() - chrono::Duration::minutes(5);
        tokio::time::timeout(Duration::from_secs(1), clock.sleep_until(past))
            .await
            .expect("past deadline must not block");
    }

    #[tokio::test]
    async fn test_manual_clock_jumps_to_deadline() {
        let start = chrono::NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let clock = manual::ManualClock::at(start);
        let deadline = start + chrono::Duration::hours(10);
        clock.sleep_until(deadline).await;
        assert_eq!(clock.now(), deadline);

        // Never moves backwards.
        clock.sleep_until(start).await;
        assert_eq!(clock.now(), deadline);
    }
}
