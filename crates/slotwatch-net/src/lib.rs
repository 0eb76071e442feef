//! HTTP transport: appointment API polling and Telegram delivery.

mod backoff;
pub mod http;
pub mod telegram;

#[cfg(test)]
mod test_server;

pub use backoff::Backoff;
pub use http::{SlotClient, TransportError};
pub use telegram::TelegramNotifier;
