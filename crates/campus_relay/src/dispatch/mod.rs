//! Fan-out of newly seen items to subscribed recipients.
//!
//! Each feed moves through `Idle -> Polling -> Distributing -> Idle` on every
//! tick. The feed marks items seen before returning them, so an item is never
//! offered twice even when ticks overlap.

mod scheduler;

pub use scheduler::PollScheduler;

use crate::feeds::{Feed, Notification};
use crate::preferences::{Category, PreferenceStore};
use crate::sink::{NotificationSink, Target};
use crate::temporal::Clock;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchPhase {
    Idle,
    Polling,
    Distributing,
}

/// Running totals for one feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedStatus {
    pub category: Category,
    pub phase: DispatchPhase,
    pub ticks: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub delivered_total: u64,
    pub failed_total: u64,
    /// Ids the feed currently remembers
    pub seen_ids: usize,
}

impl FeedStatus {
    fn new(category: Category) -> Self {
        Self {
            category,
            phase: DispatchPhase::Idle,
            ticks: 0,
            last_tick_at: None,
            delivered_total: 0,
            failed_total: 0,
            seen_ids: 0,
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub new_items: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
    preferences: Arc<PreferenceStore>,
    channels: Vec<String>,
    clock: Arc<dyn Clock>,
    status: DashMap<Category, FeedStatus>,
}

impl NotificationDispatcher {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        preferences: Arc<PreferenceStore>,
        channels: Vec<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let status = Category::ALL
            .into_iter()
            .map(|category| (category, FeedStatus::new(category)))
            .collect();

        Self {
            sink,
            preferences,
            channels,
            clock,
            status,
        }
    }

    /// Polls `feed` once and delivers every new item to its subscribers.
    pub async fn run_tick(&self, feed: &dyn Feed) -> DispatchReport {
        let category = feed.category();
        let correlation_id = generate_correlation_id();

        self.set_phase(category, DispatchPhase::Polling);
        let items = feed.poll().await;
        let mut report = DispatchReport {
            new_items: items.len(),
            ..Default::default()
        };

        if items.is_empty() {
            debug!(category = %category, correlation_id = %correlation_id, "No new items");
        } else {
            self.set_phase(category, DispatchPhase::Distributing);
            self.distribute(category, &items, &correlation_id, &mut report).await;
            info!(
                category = %category,
                correlation_id = %correlation_id,
                new_items = report.new_items,
                delivered = report.delivered,
                failed = report.failed,
                "Dispatched notifications"
            );
        }

        let now = self.clock.now();
        let seen_ids = feed.seen_count();
        self.status
            .entry(category)
            .and_modify(|status| {
                status.phase = DispatchPhase::Idle;
                status.ticks += 1;
                status.last_tick_at = Some(now);
                status.delivered_total += report.delivered as u64;
                status.failed_total += report.failed as u64;
                status.seen_ids = seen_ids;
            })
            .or_insert_with(|| FeedStatus::new(category));

        report
    }

    async fn distribute(
        &self,
        category: Category,
        items: &[Notification],
        correlation_id: &str,
        report: &mut DispatchReport,
    ) {
        let targets = match self.targets().await {
            Some(targets) => targets,
            None => return,
        };
        let subscribed: Vec<_> = targets
            .into_iter()
            .filter(|t| self.preferences.is_subscribed(t.preference_key(), category))
            .collect();

        for item in items {
            let text = item.render();
            for target in &subscribed {
                match self.sink.deliver(target, &text).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!(
                            correlation_id = %correlation_id,
                            destination = %target,
                            error = %e,
                            "Delivery failed"
                        );
                    }
                }
            }
        }
    }

    /// Human recipients plus configured channels, or `None` when the sink
    /// cannot list recipients.
    async fn targets(&self) -> Option<Vec<Target>> {
        let recipients = match self.sink.recipients().await {
            Ok(recipients) => recipients,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate recipients, skipping distribution");
                return None;
            }
        };

        let mut targets: Vec<_> = recipients
            .into_iter()
            .filter(|r| !r.bot)
            .map(|r| Target::Direct(r.id))
            .collect();
        targets.extend(self.channels.iter().cloned().map(Target::Channel));
        Some(targets)
    }

    fn set_phase(&self, category: Category, phase: DispatchPhase) {
        if let Some(mut status) = self.status.get_mut(&category) {
            status.phase = phase;
        }
    }

    /// Status of every feed in canonical category order.
    pub fn statuses(&self) -> Vec<FeedStatus> {
        Category::ALL
            .iter()
            .filter_map(|category| self.status.get(category).map(|s| s.value().clone()))
            .collect()
    }
}

fn generate_correlation_id() -> String {
    let timestamp = Utc::now().timestamp_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::test_support::context;
    use crate::feeds::{GradeFeed, MessageFeed, SeenSet};
    use crate::testing::{conversation, submission, FakeSource, FixedClock, RecordingSink};

    fn dispatcher(sink: Arc<RecordingSink>, prefs: Arc<PreferenceStore>, channels: &[&str]) -> NotificationDispatcher {
        NotificationDispatcher::new(
            sink,
            prefs,
            channels.iter().map(|c| c.to_string()).collect(),
            Arc::new(FixedClock::at("2024-11-20T12:00:00Z")),
        )
    }

    #[tokio::test]
    async fn test_grade_reaches_only_grade_subscribers() {
        let (ctx, _) = context(
            FakeSource::new()
                .with_course(1, "CS 420")
                .with_submissions(1, vec![submission(10, 1458290, 93.0)]),
        )
        .await;
        let feed = GradeFeed::new(ctx, "2023-01-01T00:00:00Z", SeenSet::new(None));

        let sink = Arc::new(RecordingSink::new().with_recipient("alice").with_recipient("bob"));
        let prefs = Arc::new(PreferenceStore::new());
        prefs.add("alice", &["grades"]);
        prefs.add("bob", &["messages"]);
        let dispatcher = dispatcher(sink.clone(), prefs, &[]);

        let report = dispatcher.run_tick(&feed).await;
        assert_eq!(
            report,
            DispatchReport {
                new_items: 1,
                delivered: 1,
                failed: 0
            }
        );

        let to_alice = sink.sent_to("alice");
        assert_eq!(to_alice.len(), 1);
        assert!(to_alice[0].contains("93"));
        assert!(to_alice[0].contains("Assignment 1458290"));
        assert!(sink.sent_to("bob").is_empty());

        // Nothing is delivered twice.
        assert_eq!(dispatcher.run_tick(&feed).await, DispatchReport::default());
        assert_eq!(sink.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_rejection_does_not_stop_fan_out() {
        let (ctx, _) = context(FakeSource::new().with_conversations(vec![
            conversation(1, "Prof. Lee", "Exam", "Room 201"),
            conversation(2, "TA", "Lab", "Cancelled"),
        ]))
        .await;
        let feed = MessageFeed::new(ctx, SeenSet::new(None));

        let sink = Arc::new(
            RecordingSink::new()
                .with_recipient("alice")
                .with_recipient("carol")
                .with_bot("relay-bot")
                .rejecting("alice"),
        );
        let prefs = Arc::new(PreferenceStore::new());
        for id in ["alice", "carol", "relay-bot", "general"] {
            prefs.add(id, &["messages"]);
        }
        let dispatcher = dispatcher(sink.clone(), prefs, &["general", "quiet"]);

        let report = dispatcher.run_tick(&feed).await;

        assert_eq!(report.new_items, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.delivered, 4);
        assert_eq!(sink.sent_to("carol").len(), 2);
        assert_eq!(sink.sent_to("general").len(), 2);
        assert!(sink.sent_to("relay-bot").is_empty());
        assert!(sink.sent_to("quiet").is_empty());
    }

    #[tokio::test]
    async fn test_recipient_failure_skips_distribution() {
        let (ctx, _) = context(
            FakeSource::new().with_conversations(vec![conversation(1, "Prof. Lee", "Exam", "Room 201")]),
        )
        .await;
        let feed = MessageFeed::new(ctx, SeenSet::new(None));
        let sink = Arc::new(RecordingSink::new().with_recipient("alice").failing_recipients());
        let prefs = Arc::new(PreferenceStore::new());
        prefs.add("alice", &["messages"]);
        let dispatcher = dispatcher(sink.clone(), prefs, &[]);

        let report = dispatcher.run_tick(&feed).await;

        assert_eq!(report.new_items, 1);
        assert_eq!(report.delivered, 0);
        assert!(sink.sent().is_empty());
        // The item stays seen; there is no redelivery queue.
        assert_eq!(dispatcher.run_tick(&feed).await.new_items, 0);
    }

    #[tokio::test]
    async fn test_status_tracks_ticks() {
        let (ctx, _) = context(
            FakeSource::new().with_conversations(vec![conversation(9, "Prof. Lee", "Exam", "Room 201")]),
        )
        .await;
        let feed = MessageFeed::new(ctx, SeenSet::new(None));
        let dispatcher = dispatcher(Arc::new(RecordingSink::new()), Arc::new(PreferenceStore::new()), &[]);

        dispatcher.run_tick(&feed).await;
        dispatcher.run_tick(&feed).await;

        let statuses = dispatcher.statuses();
        assert_eq!(statuses.len(), 4);
        let messages = statuses.iter().find(|s| s.category == Category::Messages).unwrap();
        assert_eq!(messages.ticks, 2);
        assert_eq!(messages.phase, DispatchPhase::Idle);
        assert!(messages.last_tick_at.is_some());
        assert_eq!(messages.seen_ids, 1);
    }
}
