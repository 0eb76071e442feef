use std::io::{self, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use slotwatch_core::{Notifier, NotifyError};

/// Prints what would have been sent. Used by `--dry-run`.
pub struct StdoutNotifier<W = io::Stdout> {
    out: Mutex<W>,
}

impl StdoutNotifier {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> StdoutNotifier<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn write_message(out: &mut W, channel: &str, text: &str) -> io::Result<()> {
        writeln!(out, "── {channel} ──")?;
        write!(out, "{text}")?;
        // Terminal bell, so a watching operator notices.
        writeln!(out, "\x07")?;
        out.flush()
    }
}

#[async_trait]
impl<W: Write + Send> Notifier for StdoutNotifier<W> {
    async fn send(&self, channel: &str, text: &str) -> Result<(), NotifyError> {
        let fail = |reason: String| NotifyError {
            channel: channel.to_string(),
            reason,
        };
        let mut out = self
            .out
            .lock()
            .map_err(|_| fail("output lock poisoned".into()))?;
        Self::write_message(&mut out, channel, text).map_err(|e| fail(e.to_string()))
    }
}
