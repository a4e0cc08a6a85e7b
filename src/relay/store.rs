//! Subscriber, seen-post and announcement state in Redis.
//!
//! Key layout matches the deployed bot: set `chats` holds subscriber chat
//! ids, set `posts` holds already-broadcast post ids, hash `news` maps
//! `YYYYMMDDHH` hour buckets to announcement text.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{info, warn};

use crate::relay::error::RelayError;

const SUBSCRIBERS_KEY: &str = "chats";
const SEEN_POSTS_KEY: &str = "posts";
const ANNOUNCEMENTS_KEY: &str = "news";

/// Storage seam: flat set/hash operations, no cross-key transactions.
#[async_trait]
pub trait Store: Send + Sync {
    async fn add_subscriber(&self, chat_id: i64) -> Result<(), RelayError>;
    async fn remove_subscriber(&self, chat_id: i64) -> Result<(), RelayError>;
    async fn subscribers(&self) -> Result<Vec<i64>, RelayError>;

    async fn is_post_seen(&self, post_id: &str) -> Result<bool, RelayError>;
    async fn mark_post_seen(&self, post_id: &str) -> Result<(), RelayError>;

    async fn announcement_buckets(&self) -> Result<Vec<String>, RelayError>;
    async fn announcement(&self, bucket: &str) -> Result<Option<String>, RelayError>;
    async fn delete_announcement(&self, bucket: &str) -> Result<(), RelayError>;
}

/// Redis-backed store over a reconnecting connection manager.
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn add_subscriber(&self, chat_id: i64) -> Result<(), RelayError> {
        let mut conn = self.conn.clone();
        let _: () = conn.sadd(SUBSCRIBERS_KEY, chat_id).await?;
        Ok(())
    }

    async fn remove_subscriber(&self, chat_id: i64) -> Result<(), RelayError> {
        let mut conn = self.conn.clone();
        let _: () = conn.srem(SUBSCRIBERS_KEY, chat_id).await?;
        Ok(())
    }

    async fn subscribers(&self) -> Result<Vec<i64>, RelayError> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.smembers(SUBSCRIBERS_KEY).await?;
        Ok(members
            .into_iter()
            .filter_map(|raw| match raw.parse::<i64>() {
                Ok(chat_id) => Some(chat_id),
                Err(_) => {
                    warn!("ignoring non-numeric subscriber entry {raw:?}");
                    None
                }
            })
            .collect())
    }

    async fn is_post_seen(&self, post_id: &str) -> Result<bool, RelayError> {
        let mut conn = self.conn.clone();
        let seen: bool = conn.sismember(SEEN_POSTS_KEY, post_id).await?;
        Ok(seen)
    }

    async fn mark_post_seen(&self, post_id: &str) -> Result<(), RelayError> {
        let mut conn = self.conn.clone();
        let _: () = conn.sadd(SEEN_POSTS_KEY, post_id).await?;
        Ok(())
    }

    async fn announcement_buckets(&self) -> Result<Vec<String>, RelayError> {
        let mut conn = self.conn.clone();
        let buckets: Vec<String> = conn.hkeys(ANNOUNCEMENTS_KEY).await?;
        Ok(buckets)
    }

    async fn announcement(&self, bucket: &str) -> Result<Option<String>, RelayError> {
        let mut conn = self.conn.clone();
        let text: Option<String> = conn.hget(ANNOUNCEMENTS_KEY, bucket).await?;
        Ok(text)
    }

    async fn delete_announcement(&self, bucket: &str) -> Result<(), RelayError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hdel(ANNOUNCEMENTS_KEY, bucket).await?;
        Ok(())
    }
}
