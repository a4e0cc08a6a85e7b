//! Relay engine - reconciles Telegram updates, the Facebook feed and the
//! scheduled-announcement table against subscriber state.

use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::relay::error::RelayError;
use crate::relay::facebook::FeedSource;
use crate::relay::metrics::Metrics;
use crate::relay::store::Store;
use crate::relay::telegram::Transport;

/// Long-poll timeout for the update fetch; keeps the loop fair between the
/// three polled sources when no updates are pending.
const UPDATE_TIMEOUT_SECS: u32 = 10;

pub const SUBSCRIBE_TEXT: &str = "You are now subscribed to the page feed. \
New posts will be delivered here as they are published.\n\n\
Send /stop to unsubscribe.";

pub const UNSUBSCRIBE_TEXT: &str =
    "You have unsubscribed. Send /start to subscribe again.";

pub const DEFAULT_TEXT: &str = "Unrecognized input. \
Send /start to subscribe or /stop to unsubscribe.";

/// The four relay components behind one struct: update dispatcher, command
/// handler, feed poller and announcement broadcaster. All external
/// collaborators are injected as capabilities.
pub struct RelayEngine {
    transport: Arc<dyn Transport>,
    store: Arc<dyn Store>,
    feed: Arc<dyn FeedSource>,
    metrics: Arc<dyn Metrics>,
}

impl RelayEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn Store>,
        feed: Arc<dyn FeedSource>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            transport,
            store,
            feed,
            metrics,
        }
    }

    /// Startup cursor: the id of the latest pending update, which the first
    /// loop pass will therefore process once. `None` when the backlog is
    /// empty or the fetch fails (the loop then starts from whatever Telegram
    /// still holds).
    pub async fn latest_cursor(&self) -> Option<i64> {
        match self.transport.updates(None, 0).await {
            Ok(updates) => updates.last().map(|u| u.update_id),
            Err(e) => {
                warn!("could not fetch initial updates: {e}");
                None
            }
        }
    }

    /// Update Dispatcher: fetch pending updates from `cursor` and process
    /// them in delivery order. Returns the advanced cursor. The cursor moves
    /// to `update_id + 1` after each processed update even when the reply
    /// send failed; a store failure leaves the failing update before the
    /// cursor so the next iteration retries it.
    pub async fn process_updates(
        &self,
        cursor: Option<i64>,
    ) -> Result<Option<i64>, RelayError> {
        let started = Instant::now();
        let updates = self.transport.updates(cursor, UPDATE_TIMEOUT_SECS).await?;
        self.metrics
            .count("telegram_response", started.elapsed().as_secs_f64());

        let mut cursor = cursor;
        for update in updates {
            if update.text.starts_with('/') {
                self.handle_command(update.chat_id, &update.text).await?;
            } else {
                debug!(
                    "unrecognized input {:?} from chat {}",
                    update.text, update.chat_id
                );
                self.send_ignoring_failure(update.chat_id, DEFAULT_TEXT).await;
            }
            cursor = Some(update.update_id + 1);
        }
        Ok(cursor)
    }

    /// Command Handler: `/start` subscribes, `/stop` unsubscribes, anything
    /// else gets the default reply. Storage mutations are idempotent;
    /// confirmation sends are best-effort.
    pub async fn handle_command(&self, chat_id: i64, command: &str) -> Result<(), RelayError> {
        match command {
            "/start" => {
                self.store.add_subscriber(chat_id).await?;
                info!("chat {chat_id} subscribed");
                self.metrics.count("user_subscribed", 1.0);
                self.send_ignoring_failure(chat_id, SUBSCRIBE_TEXT).await;
            }
            "/stop" => {
                self.store.remove_subscriber(chat_id).await?;
                info!("chat {chat_id} unsubscribed");
                self.metrics.count("user_unsubscribed", 1.0);
                self.send_ignoring_failure(chat_id, UNSUBSCRIBE_TEXT).await;
            }
            _ => {
                debug!("unknown command {command:?} from chat {chat_id}");
                self.metrics.count("user_sent_command", 1.0);
                self.send_ignoring_failure(chat_id, DEFAULT_TEXT).await;
            }
        }
        Ok(())
    }

    /// Feed Poller: broadcast posts published today that have a body and
    /// have not been seen yet. A post is marked seen before its broadcast,
    /// so a partial broadcast is never retried.
    pub async fn poll_feed(&self) -> Result<(), RelayError> {
        let started = Instant::now();
        let posts = self.feed.recent_posts().await?;
        self.metrics
            .count("facebook_response", started.elapsed().as_secs_f64());

        let today = Local::now().format("%Y%m%d").to_string();
        for post in posts {
            if post.published_date().as_deref() != Some(today.as_str()) {
                continue;
            }
            let Some(body) = post.message.clone() else {
                continue;
            };
            if self.store.is_post_seen(&post.id).await? {
                continue;
            }

            self.store.mark_post_seen(&post.id).await?;
            info!("new post {} in feed", post.id);
            let text = format!("{body}\n\n{}", post.permalink());
            self.broadcast(&text).await?;
            self.metrics.count("post_created", 1.0);
        }
        Ok(())
    }

    /// Announcement Broadcaster: an announcement keyed to the current hour
    /// bucket is broadcast and deleted. Past-due buckets are purged without
    /// broadcasting; future and malformed buckets are left untouched.
    pub async fn run_announcements(&self) -> Result<(), RelayError> {
        let buckets = self.store.announcement_buckets().await?;
        let now_bucket = Local::now().format("%Y%m%d%H").to_string();

        for bucket in buckets {
            if bucket == now_bucket {
                if let Some(text) = self.store.announcement(&bucket).await? {
                    info!("broadcasting announcement for bucket {bucket}");
                    self.broadcast(&text).await?;
                }
                self.store.delete_announcement(&bucket).await?;
            } else if is_past_bucket(&bucket, &now_bucket) {
                warn!("purging stale announcement bucket {bucket}");
                self.store.delete_announcement(&bucket).await?;
            }
        }
        Ok(())
    }

    /// Shared broadcast primitive: attempt delivery to every subscriber. A
    /// failing recipient is removed from the subscriber set and skipped, not
    /// retried; the rest of the pass continues.
    pub async fn broadcast(&self, text: &str) -> Result<(), RelayError> {
        let subscribers = self.store.subscribers().await?;
        debug!("broadcasting to {} subscriber(s)", subscribers.len());

        for chat_id in subscribers {
            match self.transport.send(chat_id, text).await {
                Ok(()) => self.metrics.count("post_delivered", 1.0),
                Err(e) => {
                    warn!("delivery to chat {chat_id} failed, unsubscribing: {e}");
                    self.store.remove_subscriber(chat_id).await?;
                }
            }
        }
        Ok(())
    }

    async fn send_ignoring_failure(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.transport.send(chat_id, text).await {
            warn!("send to chat {chat_id} failed: {e}");
        }
    }
}

/// A bucket counts as past-due only when it is a well-formed `YYYYMMDDHH`
/// key below the current one; fixed-width digit strings compare correctly
/// as text. Malformed keys are never purged.
fn is_past_bucket(bucket: &str, now_bucket: &str) -> bool {
    bucket.len() == now_bucket.len()
        && bucket.bytes().all(|b| b.is_ascii_digit())
        && bucket < now_bucket
}
