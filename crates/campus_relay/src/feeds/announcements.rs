use super::{display_time, Feed, FeedContext, Notification, SeenSet};
use crate::canvas::CourseId;
use crate::preferences::Category;
use crate::temporal::strip_html;
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AnnouncementNotice {
    pub announcement_id: u64,
    pub course_id: CourseId,
    pub course_name: String,
    pub title: String,
    /// Plain text, tags removed
    pub body: String,
    pub author: Option<String>,
    pub posted_at: Option<DateTime<Tz>>,
    pub link: Option<String>,
}

impl AnnouncementNotice {
    pub fn render(&self) -> String {
        let mut text = format!(
            "📣 **New Announcement**\n**Course:** {}\n**Title:** {}\n**Posted:** {}",
            self.course_name,
            self.title,
            display_time(self.posted_at.as_ref())
        );
        if let Some(author) = &self.author {
            text.push_str(&format!("\n**By:** {}", author));
        }
        text.push_str(&format!("\n**Message:** {}", self.body));
        if let Some(link) = &self.link {
            text.push_str(&format!("\n**Link:** {}", link));
        }
        text
    }
}

/// Polls announcements for every tracked course.
pub struct AnnouncementFeed {
    ctx: FeedContext,
    seen: SeenSet,
}

impl AnnouncementFeed {
    pub fn new(ctx: FeedContext, seen: SeenSet) -> Self {
        Self { ctx, seen }
    }
}

#[async_trait]
impl Feed for AnnouncementFeed {
    fn category(&self) -> Category {
        Category::Announcements
    }

    async fn poll(&self) -> Vec<Notification> {
        let now = self.ctx.clock.now();
        self.seen.prune(now);
        let mut fresh = Vec::new();

        for course in self.ctx.directory.courses() {
            let announcements = match self.ctx.source.announcements(course.id).await {
                Ok(announcements) => announcements,
                Err(e) => {
                    warn!(course_id = course.id, error = %e, "Skipping course in announcement poll");
                    continue;
                }
            };

            for announcement in announcements {
                if self.seen.contains(announcement.id) {
                    continue;
                }
                let posted_at = match self.ctx.localize(announcement.posted_at.as_deref()) {
                    Ok(at) => at,
                    Err(e) => {
                        warn!(announcement_id = announcement.id, error = %e, "Skipping announcement");
                        continue;
                    }
                };
                if !self.seen.insert_new(announcement.id, now) {
                    continue;
                }

                fresh.push(Notification::Announcement(AnnouncementNotice {
                    announcement_id: announcement.id,
                    course_id: announcement.course_id().unwrap_or(course.id),
                    course_name: course.name.clone(),
                    title: announcement.title,
                    body: strip_html(&announcement.message),
                    author: announcement.user_name,
                    posted_at,
                    link: announcement.html_url,
                }));
            }
        }

        fresh
    }

    fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
