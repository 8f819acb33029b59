//! Hands notifications from the request handlers to a long-running bot task.
//!
//! Producers hold a cheap [`RelayHandle`] and never touch the chat platform
//! themselves; a single consumer task owned by [`NotificationRelay`] delivers
//! tasks one at a time in the order they were queued.

pub mod config;
pub mod discord;
pub mod metrics_defs;
pub mod platform;
mod relay;
pub mod task;

pub use discord::DiscordClient;
pub use platform::{ChatPlatform, Delivery, DeliveryError};
pub use relay::{NotificationRelay, RelayError, RelayHandle, deliver};
pub use task::{LogMessage, NotificationTask};
