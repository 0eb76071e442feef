//! One poll cycle: fetch, normalise, dedup, notify.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::message::format_message;
use crate::parser::{Audience, NormalizeError, ResponseParser};
use crate::query::SlotQuery;
use crate::seen::SeenSessionStore;
use crate::slot::Bracket;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FetchError {
    /// Whether trying again within the same cycle could help.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout | Self::Transport(_) => true,
        }
    }
}

#[derive(Debug, Error)]
#[error("delivery to {channel} failed: {reason}")]
pub struct NotifyError {
    pub channel: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl PollError {
    /// Fetch failures clear up on their own; payload errors need an operator.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

/// Where appointment data comes from.
#[async_trait]
pub trait SlotSource: Send + Sync {
    async fn fetch(&self, query: &SlotQuery) -> Result<String, FetchError>;
}

/// Where notifications go.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel: &str, text: &str) -> Result<(), NotifyError>;
}

/// Destination channel per audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    pub age_18: String,
    pub age_45: String,
    pub postal: String,
}

impl Channels {
    pub fn for_audience(&self, audience: Audience) -> &str {
        match audience {
            Audience::Bracket(Bracket::Age18) => &self.age_18,
            Audience::Bracket(Bracket::Age45) => &self.age_45,
            Audience::AllowListed => &self.postal,
        }
    }
}

/// Outcome of a successful cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Slots that passed filtering and dedup.
    pub slots: usize,
    /// Messages handed to the notifier successfully.
    pub delivered: usize,
    /// Messages the notifier rejected.
    pub failed: usize,
}

pub struct Watcher {
    source: Box<dyn SlotSource>,
    notifier: Box<dyn Notifier>,
    parser: Box<dyn ResponseParser>,
    seen: SeenSessionStore,
    channels: Channels,
    area_code: String,
    previous_payload: Option<String>,
}

impl Watcher {
    pub fn new(
        source: Box<dyn SlotSource>,
        notifier: Box<dyn Notifier>,
        parser: Box<dyn ResponseParser>,
        seen: SeenSessionStore,
        channels: Channels,
        area_code: impl Into<String>,
    ) -> Self {
        Self {
            source,
            notifier,
            parser,
            seen,
            channels,
            area_code: area_code.into(),
            previous_payload: None,
        }
    }

    pub fn seen(&self) -> &SeenSessionStore {
        &self.seen
    }

    /// Run a full cycle for `date`.
    ///
    /// Sessions are marked seen during normalisation, before delivery, so a
    /// failed send is never retried on the next cycle.
    pub async fn poll(&mut self, date: NaiveDate) -> Result<PollReport, PollError> {
        self.seen.evict(date);

        let query = SlotQuery::new(self.parser.mode(), self.area_code.clone(), date);
        debug!(mode = %query.mode, area = %query.area_code, %date, "polling upstream");
        let raw = self.source.fetch(&query).await?;

        if self.previous_payload.as_deref() != Some(raw.as_str()) {
            info!(mode = %query.mode, bytes = raw.len(), "upstream result changed");
            self.previous_payload = Some(raw.clone());
        }

        let normalized = self.parser.normalize(&raw, &mut self.seen)?;
        let mut report = PollReport {
            slots: normalized.len(),
            ..PollReport::default()
        };

        for (audience, slots) in normalized.into_batches() {
            let Some(text) = format_message(&slots) else {
                continue;
            };
            let channel = self.channels.for_audience(audience);
            match serde_json::to_string(&slots) {
                Ok(json) => debug!(channel, count = slots.len(), slots = %json, "notifying"),
                Err(e) => debug!(channel, count = slots.len(), error = %e, "notifying"),
            }

            match self.notifier.send(channel, &text).await {
                Ok(()) => {
                    info!(channel, count = slots.len(), "notification sent");
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(error = %e, "notification failed");
                    report.failed += 1;
                }
            }
        }

        if report.slots == 0 {
            debug!(tracked = self.seen.len(), "no new slots");
        }
        Ok(report)
    }
}
