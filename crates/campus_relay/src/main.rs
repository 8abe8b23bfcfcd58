mod assignments;
mod canvas;
mod commands;
mod config;
mod directory;
mod dispatch;
mod feeds;
mod grading;
mod logger;
mod menu;
mod preferences;
mod server;
mod sink;
mod temporal;
#[cfg(test)]
mod testing;
mod types;

use std::future::Future;
use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::assignments::AssignmentFeed;
use crate::canvas::{CanvasClient, CanvasConfig, DataSource};
use crate::config::RelayConfig;
use crate::directory::{CourseCacheDb, CourseDirectory};
use crate::dispatch::{NotificationDispatcher, PollScheduler};
use crate::feeds::{
    AnnouncementFeed, Feed, FeedContext, FileFeed, GradeFeed, MessageFeed, SeenSet,
};
use crate::menu::MenuSessions;
use crate::preferences::PreferenceStore;
use crate::sink::{HttpSink, SinkConfig};
use crate::temporal::{Clock, SystemClock};
use crate::types::RelayState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logger::init_logging();

    let config = RelayConfig::from_env().context("Invalid relay configuration")?;
    info!("Starting campus relay with {:?}", config);

    let source: Arc<dyn DataSource> = Arc::new(
        CanvasClient::new(CanvasConfig {
            base_url: config.canvas_api_url.clone(),
            api_token: config.canvas_api_token.clone(),
            request_timeout: config.request_timeout,
            ..Default::default()
        })
        .context("Failed to build Canvas client")?,
    );
    let sink = Arc::new(
        HttpSink::new(SinkConfig {
            base_url: config.sink_url.clone(),
            token: config.sink_token.clone(),
            request_timeout: config.request_timeout,
        })
        .context("Failed to build chat sink")?,
    );

    let store = CourseCacheDb::open(&config.course_cache_path)
        .with_context(|| format!("Failed to open {}", config.course_cache_path.display()))?;
    let directory = Arc::new(
        CourseDirectory::load(source.clone(), store).context("Failed to load course cache")?,
    );
    if !directory.is_synced() {
        match directory.sync().await {
            Ok(count) => info!(courses = count, "Initial course sync complete"),
            Err(e) => warn!(error = %e, "Initial course sync failed; feeds stay idle until a sync succeeds"),
        }
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let preferences = Arc::new(PreferenceStore::new());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        sink,
        preferences.clone(),
        config.broadcast_channels.clone(),
        clock.clone(),
    ));

    let ctx = FeedContext {
        source: source.clone(),
        directory: directory.clone(),
        clock: clock.clone(),
        timezone: config.timezone,
    };
    let feeds: Vec<Arc<dyn Feed>> = vec![
        Arc::new(GradeFeed::new(
            ctx.clone(),
            config.graded_since.clone(),
            SeenSet::new(config.seen_retention),
        )),
        Arc::new(AnnouncementFeed::new(ctx.clone(), SeenSet::new(config.seen_retention))),
        Arc::new(MessageFeed::new(ctx.clone(), SeenSet::new(config.seen_retention))),
        Arc::new(FileFeed::new(ctx, SeenSet::new(config.seen_retention))),
    ];
    let scheduler = PollScheduler::start(dispatcher.clone(), feeds, config.poll_interval);

    let state = Arc::new(RelayState {
        source: source.clone(),
        directory,
        preferences,
        dispatcher,
        assignments: AssignmentFeed::new(source, clock.clone(), config.timezone),
        menus: MenuSessions::default(),
        started_at: clock.now(),
        clock,
        due_horizon: config.due_horizon,
        recent_horizon: config.recent_grade_horizon,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, server::create_router(state))
        .with_graceful_shutdown(wait_for_shutdown(tokio::signal::ctrl_c()))
        .await
        .context("Server error")?;

    scheduler.shutdown().await;
    info!("Relay stopped");
    Ok(())
}

/// Resolves once `signal` fires. A signal handler that cannot be installed
/// is logged and treated as a request to stop.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for the shutdown signal, shutting down"),
    }
}
