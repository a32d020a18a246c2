//! Pub/sub notification channel clients.

mod channel;
mod client;
mod error;
mod memory;
mod types;

pub use channel::NotificationChannel;
pub use client::HttpChannelClient;
pub use error::ChannelError;
pub use memory::{MemoryChannel, DEFAULT_DELIVERY_HISTORY};
pub use types::*;
