//! Pollers that diff an upstream resource against what was already delivered.
//!
//! Every feed follows the same contract: query the resource for each tracked
//! course (or the single inbox), drop ids already in its [`SeenSet`], mark the
//! survivors as seen and return them in API order. A failure for one course is
//! logged and skipped; the rest of the poll carries on.

mod announcements;
mod files;
mod grades;
mod messages;
mod seen;

pub use announcements::{AnnouncementFeed, AnnouncementNotice};
pub use files::{FileFeed, FileNotice};
pub use grades::{GradeFeed, GradeNotice};
pub use messages::{MessageFeed, MessageNotice};
pub use seen::SeenSet;

use crate::canvas::DataSource;
use crate::directory::CourseDirectory;
use crate::preferences::Category;
use crate::temporal::{parse_and_localize, Clock, ParseError, DISPLAY_FORMAT};
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use std::sync::Arc;

/// Collaborators shared by all feeds.
#[derive(Clone)]
pub struct FeedContext {
    pub source: Arc<dyn DataSource>,
    pub directory: Arc<CourseDirectory>,
    pub clock: Arc<dyn Clock>,
    pub timezone: Tz,
}

impl FeedContext {
    /// Parses an optional upstream timestamp into the user's zone.
    fn localize(&self, raw: Option<&str>) -> Result<Option<DateTime<Tz>>, ParseError> {
        raw.map(|value| parse_and_localize(value, &self.timezone)).transpose()
    }
}

/// A newly seen item, ready to be rendered.
#[derive(Debug, Clone)]
pub enum Notification {
    Grade(GradeNotice),
    Message(MessageNotice),
    File(FileNotice),
    Announcement(AnnouncementNotice),
}

impl Notification {
    /// Chat-ready text.
    pub fn render(&self) -> String {
        match self {
            Notification::Grade(notice) => notice.render(),
            Notification::Message(notice) => notice.render(),
            Notification::File(notice) => notice.render(),
            Notification::Announcement(notice) => notice.render(),
        }
    }
}

#[async_trait]
pub trait Feed: Send + Sync {
    fn category(&self) -> Category;

    /// Items not handed out before, in discovery order.
    async fn poll(&self) -> Vec<Notification>;

    /// Number of ids currently remembered.
    fn seen_count(&self) -> usize;
}

fn display_time(at: Option<&DateTime<Tz>>) -> String {
    at.map(|at| at.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
