//! Fixed-interval scheduler around [`Watcher::poll`].

use std::time::Duration;

use chrono::NaiveDate;
use slotwatch_core::Watcher;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Notified,
    /// New slots found, but the notifier rejected every message.
    Undelivered,
    Idle,
    /// Upstream unreachable or refusing; the next tick tries again.
    Transient,
    /// Payload did not match the expected shape.
    DataError,
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Poll now, then once per `every`, until Ctrl-C.
///
/// No cycle error stops the loop.
pub async fn run(watcher: &mut Watcher, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                return;
            }
        }
        run_cycle(watcher, today()).await;
    }
}

pub async fn run_cycle(watcher: &mut Watcher, date: NaiveDate) -> CycleOutcome {
    let day = date.format("%d-%m-%Y").to_string();
    match watcher.poll(date).await {
        Ok(report) if report.slots > 0 && report.delivered == 0 => {
            warn!(
                date = %day,
                slots = report.slots,
                failed = report.failed,
                "new slots found but no message was delivered"
            );
            CycleOutcome::Undelivered
        }
        Ok(report) if report.slots > 0 => {
            info!(
                date = %day,
                slots = report.slots,
                delivered = report.delivered,
                failed = report.failed,
                "new slots announced"
            );
            CycleOutcome::Notified
        }
        Ok(_) => {
            info!(date = %day, tracked = watcher.seen().len(), "no new slots");
            CycleOutcome::Idle
        }
        Err(e) if e.is_transient() => {
            warn!(date = %day, error = %e, "poll failed, retrying next interval");
            CycleOutcome::Transient
        }
        Err(e) => {
            error!(date = %day, error = %e, "unexpected upstream payload, skipping cycle");
            CycleOutcome::DataError
        }
    }
}
