use std::collections::HashSet;

use chrono::NaiveDate;

use crate::db::DataGateway;
use crate::error::NotifyResult;
use crate::models::user::{Address, ReportCandidate};

/// Addresses that should get today's reminder, each at most once.
pub async fn reminder_recipients(
    gateway: &dyn DataGateway,
    today: NaiveDate,
) -> NotifyResult<Vec<Address>> {
    let mut seen = HashSet::new();
    Ok(gateway
        .reminder_candidates(today)
        .await?
        .into_iter()
        .filter(|address| seen.insert(*address))
        .collect())
}

pub async fn report_recipients(gateway: &dyn DataGateway) -> NotifyResult<Vec<ReportCandidate>> {
    gateway.report_candidates().await
}
