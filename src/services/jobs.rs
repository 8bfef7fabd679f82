//! The two notification jobs and the wiring that registers them.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::NotifierSettings;
use crate::db::DataGateway;
use crate::error::{NotifyError, NotifyResult};
use crate::services::dispatcher::{
    dispatch_one, reminder_text, report_text, BatchReport, MessageChannel, TelegramChannel,
};
use crate::services::recipients::{reminder_recipients, report_recipients};
use crate::services::scheduler::{Cadence, Clock, Job, Scheduler};
use crate::services::stats::weekly_summary;

pub const DAILY_REMINDER: &str = "daily_reminder";
pub const WEEKLY_REPORT: &str = "weekly_report";

/// Nudges every registered user who has not logged a mood today.
pub struct DailyReminderJob {
    gateway: Arc<dyn DataGateway>,
    channel: Arc<dyn MessageChannel>,
}

impl DailyReminderJob {
    pub fn new(gateway: Arc<dyn DataGateway>, channel: Arc<dyn MessageChannel>) -> Self {
        Self { gateway, channel }
    }

    /// A candidate query failure aborts the whole batch before any send.
    pub async fn fire(&self, today: NaiveDate) -> NotifyResult<BatchReport> {
        let recipients = reminder_recipients(self.gateway.as_ref(), today).await?;

        let mut report = BatchReport::default();
        for address in recipients {
            dispatch_one(
                self.channel.as_ref(),
                &mut report,
                DAILY_REMINDER,
                address,
                reminder_text(),
            )
            .await;
        }
        Ok(report)
    }
}

#[async_trait]
impl Job for DailyReminderJob {
    fn name(&self) -> &'static str {
        DAILY_REMINDER
    }

    async fn run(&self, today: NaiveDate) -> NotifyResult<BatchReport> {
        self.fire(today).await
    }
}

/// Sends each registered user their icon counts for the trailing week.
pub struct WeeklyReportJob {
    gateway: Arc<dyn DataGateway>,
    channel: Arc<dyn MessageChannel>,
}

impl WeeklyReportJob {
    pub fn new(gateway: Arc<dyn DataGateway>, channel: Arc<dyn MessageChannel>) -> Self {
        Self { gateway, channel }
    }

    /// A failed statistics query only drops that user's report.
    pub async fn fire(&self, today: NaiveDate) -> NotifyResult<BatchReport> {
        let candidates = report_recipients(self.gateway.as_ref()).await?;

        let mut report = BatchReport::default();
        for candidate in candidates {
            let summary =
                match weekly_summary(self.gateway.as_ref(), &candidate.user_id, today).await {
                    Ok(summary) => summary,
                    Err(e) => {
                        tracing::warn!(
                            job = WEEKLY_REPORT,
                            user_id = %candidate.user_id,
                            error = %e,
                            "Skipping weekly report for user"
                        );
                        report.skipped += 1;
                        continue;
                    }
                };
            tracing::debug!(
                job = WEEKLY_REPORT,
                user_id = %candidate.user_id,
                icons = summary.counts.len(),
                entries = summary.total(),
                "Weekly summary computed"
            );

            dispatch_one(
                self.channel.as_ref(),
                &mut report,
                WEEKLY_REPORT,
                candidate.address,
                &report_text(&summary),
            )
            .await;
        }
        Ok(report)
    }
}

#[async_trait]
impl Job for WeeklyReportJob {
    fn name(&self) -> &'static str {
        WEEKLY_REPORT
    }

    async fn run(&self, today: NaiveDate) -> NotifyResult<BatchReport> {
        self.fire(today).await
    }
}

/// Registers the reminder and report jobs without starting them.
pub fn build_scheduler(
    settings: &NotifierSettings,
    channel: Arc<dyn MessageChannel>,
    gateway: Arc<dyn DataGateway>,
    clock: Arc<dyn Clock>,
) -> Scheduler {
    let mut scheduler = Scheduler::new(clock);
    scheduler
        .register(
            Cadence::Daily {
                at: settings.reminder_time,
            },
            Arc::new(DailyReminderJob::new(gateway.clone(), channel.clone())),
        )
        .register(
            Cadence::Weekly {
                weekday: settings.report_weekday,
                at: settings.report_time,
            },
            Arc::new(WeeklyReportJob::new(gateway, channel)),
        );
    scheduler
}

/// Checks the channel credential, then builds and starts the scheduler.
///
/// A missing or refused credential means no job is started and nothing is
/// queried or sent. An unreachable channel does not block startup: sends
/// fail per recipient until it comes back.
pub async fn start_notifications(
    settings: &NotifierSettings,
    gateway: Arc<dyn DataGateway>,
    clock: Arc<dyn Clock>,
) -> NotifyResult<Arc<Scheduler>> {
    let token = settings
        .telegram_bot_token
        .as_deref()
        .ok_or(NotifyError::ConfigurationMissing("TELEGRAM_BOT_TOKEN"))?;

    let channel = TelegramChannel::new(token, &settings.telegram_api_base, settings.send_timeout)?;
    match channel.verify().await {
        Ok(account) => tracing::info!(account = %account, "Telegram bot authorized"),
        Err(NotifyError::ChannelUnavailable(reason)) => tracing::warn!(
            reason = %reason,
            "Telegram API unreachable at startup, starting scheduler unverified"
        ),
        Err(e) => return Err(e),
    }

    let scheduler = Arc::new(build_scheduler(settings, Arc::new(channel), gateway, clock));
    scheduler.start();
    Ok(scheduler)
}
