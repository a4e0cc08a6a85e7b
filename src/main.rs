mod config;
mod relay;

use std::sync::Arc;
use std::time::Duration;

use teloxide::Bot;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use config::Config;
use relay::{
    FacebookFeed, Metrics, NoopMetrics, RedisStore, RelayEngine, StatHat, TelegramTransport,
    spawn_heartbeat,
};

/// Pause after a failed loop iteration so a down dependency is retried
/// instead of spun against.
const RETRY_PAUSE: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_logging(&config);
    info!("starting feed relay");

    let store = match RedisStore::connect(&config.redis_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("could not connect to redis: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_token);
    let transport = Arc::new(TelegramTransport::new(bot));
    let feed = Arc::new(FacebookFeed::new(
        config.facebook_token.clone(),
        config.facebook_page_id.clone(),
        config.feed_page_size,
    ));

    let metrics: Arc<dyn Metrics> = match &config.stathat_key {
        Some(key) => Arc::new(StatHat::new(key.clone())),
        None => {
            info!("STATHAT_EZKEY not set, metrics disabled");
            Arc::new(NoopMetrics)
        }
    };
    spawn_heartbeat(metrics.clone());

    let engine = RelayEngine::new(transport, store, feed, metrics);

    let mut cursor = engine.latest_cursor().await;
    info!("waiting for updates (cursor: {cursor:?})");

    loop {
        let mut iteration_failed = false;

        match engine.process_updates(cursor).await {
            Ok(next) => cursor = next,
            Err(e) => {
                warn!("update pass failed: {e}");
                iteration_failed = true;
            }
        }

        if let Err(e) = engine.poll_feed().await {
            warn!("feed pass failed: {e}");
            iteration_failed = true;
        }

        if let Err(e) = engine.run_announcements().await {
            warn!("announcement pass failed: {e}");
            iteration_failed = true;
        }

        if iteration_failed {
            tokio::time::sleep(RETRY_PAUSE).await;
        }
    }
}

/// Stdout logging, plus a non-ANSI file layer when `LOG_DIR` is set. The
/// returned guard must stay alive for the file writer to flush.
fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        );
    let registry = tracing_subscriber::registry().with(stdout_layer);

    let Some(log_dir) = &config.log_dir else {
        registry.init();
        return None;
    };

    std::fs::create_dir_all(log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("feedrelay.log"))
    {
        Ok(file) => file,
        Err(e) => {
            registry.init();
            warn!("could not open log file in {}: {e}", log_dir.display());
            return None;
        }
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();
    Some(guard)
}
