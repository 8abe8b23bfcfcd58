use super::NotificationDispatcher;
use crate::feeds::Feed;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// One background task per feed, each ticking on its own interval.
///
/// A slow tick of one feed does not hold back the others. Missed ticks are
/// delayed rather than run in a burst.
pub struct PollScheduler {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PollScheduler {
    /// Spawns the poll loops. The first tick of every feed fires immediately.
    pub fn start(
        dispatcher: Arc<NotificationDispatcher>,
        feeds: Vec<Arc<dyn Feed>>,
        period: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);

        let tasks = feeds
            .into_iter()
            .map(|feed| {
                let dispatcher = Arc::clone(&dispatcher);
                let mut stop = shutdown.subscribe();

                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    info!(category = %feed.category(), period_secs = period.as_secs(), "Poll loop started");

                    loop {
                        tokio::select! {
                            _ = ticker.tick() => {
                                dispatcher.run_tick(feed.as_ref()).await;
                            }
                            _ = stop.changed() => break,
                        }
                    }

                    info!(category = %feed.category(), "Poll loop stopped");
                })
            })
            .collect();

        Self { shutdown, tasks }
    }

    /// Signals every loop to stop and waits for them. A tick in flight is
    /// allowed to finish.
    pub async fn shutdown(self) {
        // Fails only when every loop already exited.
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Poll loop ended abnormally");
            }
        }
    }
}
