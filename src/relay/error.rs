//! Error taxonomy for the relay pipeline.

use std::fmt;

/// Failure of one of the three external collaborators. A `Transport` error
/// from a send is recoverable at the call site; a `Transport` error from the
/// update fetch, or any `Store`/`Feed` error, aborts the current loop
/// iteration and is retried on the next one.
#[derive(Debug)]
pub enum RelayError {
    /// Telegram Bot API call failed.
    Transport(String),
    /// Key-value store operation failed.
    Store(String),
    /// Facebook feed fetch or decode failed.
    Feed(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "telegram transport error: {msg}"),
            Self::Store(msg) => write!(f, "store error: {msg}"),
            Self::Feed(msg) => write!(f, "feed error: {msg}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<redis::RedisError> for RelayError {
    fn from(e: redis::RedisError) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        Self::Feed(e.to_string())
    }
}
