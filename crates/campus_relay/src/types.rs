use crate::assignments::AssignmentFeed;
use crate::canvas::DataSource;
use crate::directory::CourseDirectory;
use crate::dispatch::NotificationDispatcher;
use crate::menu::MenuSessions;
use crate::preferences::PreferenceStore;
use crate::temporal::Clock;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;

/// Process-wide state shared by the poll loops, the command handler and the
/// HTTP surface.
pub struct RelayState {
    pub source: Arc<dyn DataSource>,
    pub directory: Arc<CourseDirectory>,
    pub preferences: Arc<PreferenceStore>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub assignments: AssignmentFeed,
    pub menus: MenuSessions,
    pub clock: Arc<dyn Clock>,
    /// Horizon for "due soon"
    pub due_horizon: TimeDelta,
    /// Horizon for "recently graded"
    pub recent_horizon: TimeDelta,
    pub started_at: DateTime<Utc>,
}
