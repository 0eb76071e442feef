pub mod config;
pub mod message;
pub mod parser;
pub mod payload;
pub mod poll;
pub mod query;
pub mod seen;
pub mod slot;

pub use config::{Config, ConfigError};
pub use message::{SCHEDULE_URL, format_message};
pub use parser::{
    AreaParser, Audience, NormalizeError, Normalized, PostalCodeParser, ResponseParser, parser_for,
};
pub use poll::{
    Channels, FetchError, Notifier, NotifyError, PollError, PollReport, SlotSource, Watcher,
};
pub use query::{QueryMode, SlotQuery};
pub use seen::{DropPastDates, EvictionPolicy, RetainAll, SeenSessionStore};
pub use slot::{Bracket, Fee, NormalizedSlot};
