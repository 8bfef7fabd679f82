use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, NotifyResult};
use crate::models::user::Address;
use crate::services::stats::WeeklySummary;

pub const REMINDER_TEXT: &str = "Don't forget to log today's mood";
pub const REPORT_HEADER: &str = "Your mood report for the past week:";

/// Outbound messaging channel. One call is one delivery attempt.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send(&self, address: Address, text: &str) -> NotifyResult<()>;
}

/// Telegram Bot API client (`sendMessage`, `getMe`).
pub struct TelegramChannel {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct TelegramApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    first_name: String,
    username: Option<String>,
}

impl TelegramChannel {
    pub fn new(token: &str, api_base: &str, timeout: Duration) -> NotifyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::ChannelRejected(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Checks the credential with `getMe` and returns the bot's handle.
    ///
    /// Only an explicit refusal from the API is `ChannelRejected`; transport
    /// errors, 5xx/429 and unreadable bodies are `ChannelUnavailable`.
    pub async fn verify(&self) -> NotifyResult<String> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| NotifyError::ChannelUnavailable(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NotifyError::ChannelUnavailable(format!(
                "getMe returned HTTP {status}"
            )));
        }

        let body: TelegramApiResponse<BotUser> = response.json().await.map_err(|e| {
            NotifyError::ChannelUnavailable(format!(
                "HTTP {status}, unreadable getMe body: {}",
                e.without_url()
            ))
        })?;

        match body.result {
            Some(bot) if body.ok => Ok(bot.username.unwrap_or(bot.first_name)),
            _ => Err(NotifyError::ChannelRejected(format!(
                "HTTP {status}: {}",
                body.description.unwrap_or_else(|| "getMe failed".into())
            ))),
        }
    }
}

#[async_trait]
impl MessageChannel for TelegramChannel {
    async fn send(&self, address: Address, text: &str) -> NotifyResult<()> {
        let failure = |reason: String| NotifyError::ChannelSendFailure { address, reason };

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": address,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| failure(e.without_url().to_string()))?;

        let status = response.status();
        let body: TelegramApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| failure(format!("HTTP {status}, unreadable body: {}", e.without_url())))?;

        if status.is_success() && body.ok {
            Ok(())
        } else {
            Err(failure(format!(
                "HTTP {status}: {}",
                body.description.unwrap_or_default()
            )))
        }
    }
}

pub fn reminder_text() -> &'static str {
    REMINDER_TEXT
}

/// Header line, then one `"<icon> — <count>"` line per icon.
pub fn report_text(summary: &WeeklySummary) -> String {
    let mut text = String::from(REPORT_HEADER);
    for (icon, count) in &summary.counts {
        text.push('\n');
        text.push_str(&format!("{icon} — {count}"));
    }
    text
}

/// Outcome of one job firing across its recipient list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Recipients dropped before a send was attempted.
    pub skipped: usize,
}

impl BatchReport {
    fn record(&mut self, delivered: bool) {
        self.attempted += 1;
        if delivered {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Sends one message and records the outcome. A failure is logged and
/// absorbed so the caller can carry on with the rest of the batch.
pub async fn dispatch_one(
    channel: &dyn MessageChannel,
    report: &mut BatchReport,
    job: &'static str,
    address: Address,
    text: &str,
) {
    match channel.send(address, text).await {
        Ok(()) => {
            tracing::debug!(job, address, "Notification sent");
            report.record(true);
        }
        Err(e) => {
            tracing::warn!(job, address, error = %e, "Notification send failed");
            report.record(false);
        }
    }
}


#[cfg(test)]
pub mod stub_api {
    //! Local stand-in for the Bot API. `getMe` answers per token:
    //! `123:good` is accepted, `123:flaky` gets a 502 HTML page, anything
    //! else is refused with 401. `sendMessage` refuses chat id 13.

    use std::sync::{Arc, Mutex};

    use axum::{
        extract::Path,
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    pub type Seen = Arc<Mutex<Vec<(String, Value)>>>;

    pub async fn fake_telegram() -> (String, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let send_seen = seen.clone();

        let app = Router::new()
            .route(
                "/:bot/sendMessage",
                post(move |Path(bot): Path<String>, Json(body): Json<Value>| {
                    let seen = send_seen.clone();
                    async move {
                        let blocked = body["chat_id"] == json!(13);
                        seen.lock().unwrap().push((bot, body));
                        if blocked {
                            (
                                StatusCode::FORBIDDEN,
                                Json(json!({
                                    "ok": false,
                                    "error_code": 403,
                                    "description": "Forbidden: bot was blocked by the user"
                                })),
                            )
                        } else {
                            (
                                StatusCode::OK,
                                Json(json!({ "ok": true, "result": { "message_id": 1 } })),
                            )
                        }
                    }
                }),
            )
            .route(
                "/:bot/getMe",
                get(|Path(bot): Path<String>| async move {
                    match bot.as_str() {
                        "bot123:good" => (
                            StatusCode::OK,
                            Json(json!({
                                "ok": true,
                                "result": { "id": 123, "is_bot": true, "first_name": "Mood", "username": "mood_bot" }
                            })),
                        )
                            .into_response(),
                        "bot123:flaky" => (StatusCode::BAD_GATEWAY, "<html>502</html>").into_response(),
                        _ => (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({ "ok": false, "error_code": 401, "description": "Unauthorized" })),
                        )
                            .into_response(),
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/"), seen)
    }
}
