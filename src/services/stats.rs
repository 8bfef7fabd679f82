use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::db::DataGateway;
use crate::error::NotifyResult;

/// How many days back from today the weekly window reaches. Entries dated
/// `today - WINDOW_LOOKBACK_DAYS` are still counted; one day earlier is not.
pub const WINDOW_LOOKBACK_DAYS: i64 = 7;

/// Inclusive `(start, end)` calendar-date bounds of the weekly window.
pub fn trailing_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(WINDOW_LOOKBACK_DAYS), today)
}

/// Icon → number of mood entries in the trailing window. Zero counts are
/// never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeeklySummary {
    pub counts: BTreeMap<String, i64>,
}

impl WeeklySummary {
    pub fn from_counts(counts: impl IntoIterator<Item = (String, i64)>) -> Self {
        Self {
            counts: counts.into_iter().filter(|(_, n)| *n > 0).collect(),
        }
    }

    pub fn total(&self) -> i64 {
        self.counts.values().sum()
    }
}

pub async fn weekly_summary(
    gateway: &dyn DataGateway,
    user_id: &str,
    today: NaiveDate,
) -> NotifyResult<WeeklySummary> {
    let (start, end) = trailing_window(today);
    let counts = gateway.icon_counts(user_id, start, end).await?;
    Ok(WeeklySummary::from_counts(counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::gateway::memory::MemoryGateway;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trailing_window_bounds() {
        let (start, end) = trailing_window(day(2026, 3, 9));
        assert_eq!(start, day(2026, 3, 2));
        assert_eq!(end, day(2026, 3, 9));
    }

    #[test]
    fn test_from_counts_drops_zeroes() {
        let s = WeeklySummary::from_counts(vec![("🙂".to_string(), 2), ("😐".to_string(), 0)]);
        assert_eq!(s.counts.len(), 1);
        assert_eq!(s.total(), 2);
    }

    #[tokio::test]
    async fn test_weekly_summary_excludes_old_entries() {
        let today = day(2026, 3, 9);
        let gw = MemoryGateway::new()
            .with_user("u4", Some(444))
            .with_entry("u4", today, "🙂")
            .with_entry("u4", day(2026, 3, 7), "🙂")
            .with_entry("u4", day(2026, 3, 4), "🙂")
            .with_entry("u4", day(2026, 3, 5), "😢")
            .with_entry("u4", day(2026, 2, 27), "😢"); // 10 days ago

        let summary = weekly_summary(&gw, "u4", today).await.unwrap();
        let expected: BTreeMap<String, i64> =
            [("🙂".to_string(), 3), ("😢".to_string(), 1)].into_iter().collect();
        assert_eq!(summary.counts, expected);
        assert_eq!(summary.total(), 4);
    }

    #[tokio::test]
    async fn test_weekly_summary_window_edges() {
        let today = day(2026, 3, 9);
        let gw = MemoryGateway::new()
            .with_entry("u", day(2026, 3, 2), "🙂") // today - 7: counted
            .with_entry("u", day(2026, 3, 1), "🙂") // today - 8: not counted
            .with_entry("u", day(2026, 3, 10), "🙂") // tomorrow: not counted
            .with_entry("other", today, "🙂");

        let summary = weekly_summary(&gw, "u", today).await.unwrap();
        assert_eq!(summary.total(), 1);
    }

    #[tokio::test]
    async fn test_weekly_summary_sum_matches_rows_in_window() {
        let today = day(2026, 3, 9);
        let icons = ["🙂", "😢", "😡", "🙂", "😴", "🙂", "😢"];
        let mut gw = MemoryGateway::new();
        for (i, icon) in icons.iter().enumerate() {
            gw = gw.with_entry("u", today - Duration::days(i as i64), icon);
        }

        let summary = weekly_summary(&gw, "u", today).await.unwrap();
        assert_eq!(summary.total(), icons.len() as i64);
        assert!(summary.counts.values().all(|n| *n > 0));
    }

    #[tokio::test]
    async fn test_weekly_summary_empty_for_quiet_user() {
        let gw = MemoryGateway::new().with_user("u", Some(1));
        let summary = weekly_summary(&gw, "u", day(2026, 3, 9)).await.unwrap();
        assert!(summary.counts.is_empty());
    }
}
