use std::fmt;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};

/// Recurrence rule for a job, evaluated in service-local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Daily { at: NaiveTime },
    Weekly { weekday: Weekday, at: NaiveTime },
}

impl Cadence {
    /// First firing strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Cadence::Daily { at } => {
                let candidate = now.date().and_time(at);
                if candidate > now {
                    candidate
                } else {
                    candidate + Duration::days(1)
                }
            }
            Cadence::Weekly { weekday, at } => {
                let days_ahead = (7 + weekday.num_days_from_monday()
                    - now.weekday().num_days_from_monday())
                    % 7;
                let candidate = (now.date() + Duration::days(days_ahead as i64)).and_time(at);
                if candidate > now {
                    candidate
                } else {
                    candidate + Duration::days(7)
                }
            }
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            Cadence::Weekly { weekday, at } => {
                write!(f, "weekly on {} at {}", weekday, at.format("%H:%M"))
            }
        }
    }
}
