use serde::Serialize;
use sqlx::FromRow;

/// Telegram chat id. Users without one never receive notifications.
pub type Address = i64;

/// A user with a registered delivery address, as read by the weekly report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ReportCandidate {
    #[sqlx(rename = "telegram_chat_id")]
    pub address: Address,
    pub user_id: String,
}
