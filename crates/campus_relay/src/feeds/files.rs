use super::{display_time, Feed, FeedContext, Notification, SeenSet};
use crate::canvas::CourseId;
use crate::preferences::Category;
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct FileNotice {
    pub file_id: u64,
    pub course_id: CourseId,
    pub course_name: String,
    pub display_name: String,
    pub url: String,
    pub created_at: Option<DateTime<Tz>>,
}

impl FileNotice {
    pub fn render(&self) -> String {
        format!(
            "📁 **New File Uploaded**\n**Course:** {}\n**File:** {}\n**Uploaded:** {}\n**Link:** {}",
            self.course_name,
            self.display_name,
            display_time(self.created_at.as_ref()),
            self.url
        )
    }
}

/// Polls course files, newest first per course.
pub struct FileFeed {
    ctx: FeedContext,
    seen: SeenSet,
}

impl FileFeed {
    pub fn new(ctx: FeedContext, seen: SeenSet) -> Self {
        Self { ctx, seen }
    }
}

#[async_trait]
impl Feed for FileFeed {
    fn category(&self) -> Category {
        Category::Files
    }

    async fn poll(&self) -> Vec<Notification> {
        let now = self.ctx.clock.now();
        self.seen.prune(now);
        let mut fresh = Vec::new();

        for course in self.ctx.directory.courses() {
            let files = match self.ctx.source.course_files(course.id).await {
                Ok(files) => files,
                Err(e) => {
                    warn!(course_id = course.id, error = %e, "Skipping course in file poll");
                    continue;
                }
            };

            for file in files {
                if self.seen.contains(file.id) {
                    continue;
                }
                let created_at = match self.ctx.localize(file.created_at.as_deref()) {
                    Ok(at) => at,
                    Err(e) => {
                        warn!(file_id = file.id, error = %e, "Skipping file");
                        continue;
                    }
                };
                if !self.seen.insert_new(file.id, now) {
                    continue;
                }

                fresh.push(Notification::File(FileNotice {
                    file_id: file.id,
                    course_id: course.id,
                    course_name: course.name.clone(),
                    display_name: file.display_name,
                    url: file.url,
                    created_at,
                }));
            }
        }

        fresh
    }

    fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
