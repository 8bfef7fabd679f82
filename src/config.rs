use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveTime, Weekday};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub database_max_connections: u32,

    pub notifier: NotifierSettings,
}

/// Everything the notification scheduler needs besides a store handle.
#[derive(Debug, Clone)]
pub struct NotifierSettings {
    /// Bot credential. `None` means the scheduler must not start.
    pub telegram_bot_token: Option<String>,
    pub telegram_api_base: String,

    pub reminder_time: NaiveTime,
    pub report_weekday: Weekday,
    pub report_time: NaiveTime,

    pub query_timeout: Duration,
    pub send_timeout: Duration,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            telegram_api_base: "https://api.telegram.org".into(),
            reminder_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default(),
            report_weekday: Weekday::Mon,
            report_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            query_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),

            notifier: NotifierSettings::from_env(),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl NotifierSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            telegram_api_base: env::var("TELEGRAM_API_BASE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.telegram_api_base),

            reminder_time: time_or("REMINDER_TIME", defaults.reminder_time),
            report_weekday: env_or("REPORT_WEEKDAY", defaults.report_weekday),
            report_time: time_or("REPORT_TIME", defaults.report_time),

            query_timeout: Duration::from_secs(env_or("QUERY_TIMEOUT_SECS", 10)),
            send_timeout: Duration::from_secs(env_or("SEND_TIMEOUT_SECS", 10)),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn time_or(key: &str, default: NaiveTime) -> NaiveTime {
    match env::var(key) {
        Ok(raw) => parse_wall_clock(&raw).unwrap_or_else(|| {
            tracing::warn!(key, value = %raw, "Invalid HH:MM value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn parse_or<T: FromStr>(key: &str, raw: &str, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = %raw, "Invalid config value, using default");
        default
    })
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_wall_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}
