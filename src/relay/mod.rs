//! Relay pipeline - Telegram subscribe/unsubscribe commands, Facebook feed
//! polling and scheduled announcements, reconciled by one engine.

pub mod engine;
pub mod error;
pub mod facebook;
pub mod metrics;
pub mod store;
pub mod telegram;


pub use engine::RelayEngine;
pub use error::RelayError;
pub use facebook::{FacebookFeed, FeedPost, FeedSource};
pub use metrics::{Metrics, NoopMetrics, StatHat, spawn_heartbeat};
pub use store::{RedisStore, Store};
pub use telegram::{BotUpdate, TelegramTransport, Transport};
