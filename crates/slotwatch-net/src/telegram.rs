//! Telegram Bot API delivery.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slotwatch_core::{Notifier, NotifyError};
use tracing::debug;

use crate::http::TransportError;

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: String,
    text: &'a str,
}

#[derive(Deserialize)]
struct BotReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    /// `<api_base>/bot<token>`; never logged.
    bot_url: String,
}

impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier").finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    /// `api_base` is normally `https://api.telegram.org`.
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            bot_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }
}

/// Public channels are addressed as `@name`; numeric ids and `@names` pass through.
pub fn chat_id(channel: &str) -> String {
    let channel = channel.trim();
    let numeric = channel
        .strip_prefix('-')
        .unwrap_or(channel)
        .chars()
        .all(|c| c.is_ascii_digit());
    if channel.starts_with('@') || (numeric && !channel.is_empty()) {
        channel.to_string()
    } else {
        format!("@{channel}")
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, channel: &str, text: &str) -> Result<(), NotifyError> {
        let failed = |reason: String| NotifyError {
            channel: channel.to_string(),
            reason,
        };

        let url = format!("{}/sendMessage", self.bot_url);
        let body = SendMessage {
            chat_id: chat_id(channel),
            text,
        };
        // reqwest errors carry the URL, which holds the token.
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| failed(e.without_url().to_string()))?;

        let status = resp.status();
        let reply: Option<BotReply> = resp.json().await.ok();
        match reply {
            Some(BotReply { ok: true, .. }) if status.is_success() => {
                debug!(channel, "telegram accepted message");
                Ok(())
            }
            Some(BotReply { description, .. }) => Err(failed(format!(
                "{}: {}",
                status.as_u16(),
                description.unwrap_or_else(|| "no description".into())
            ))),
            None => Err(failed(format!("{}: unreadable reply", status.as_u16()))),
        }
    }
}
