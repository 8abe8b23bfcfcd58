use super::{display_time, Feed, FeedContext, Notification, SeenSet};
use crate::canvas::{Course, CourseId, Submission, SubmissionComment};
use crate::grading::describe_score;
use crate::preferences::Category;
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{debug, warn};

/// A submission that received a grade since the last poll.
#[derive(Debug, Clone)]
pub struct GradeNotice {
    pub submission_id: u64,
    pub course_id: CourseId,
    pub course_name: String,
    pub assignment_name: String,
    pub student_name: String,
    pub grade: Option<String>,
    pub score: Option<f64>,
    pub max_points: Option<f64>,
    pub graded_at: Option<DateTime<Tz>>,
    pub comments: Vec<SubmissionComment>,
    pub preview_url: Option<String>,
}

impl GradeNotice {
    pub fn render(&self) -> String {
        let comments = if self.comments.is_empty() {
            "No comments".to_string()
        } else {
            self.comments
                .iter()
                .map(|c| {
                    format!(
                        "- {} ({}): {}",
                        c.author_name.as_deref().unwrap_or("Unknown"),
                        c.created_at.as_deref().unwrap_or("unknown time"),
                        c.comment
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut text = format!(
            "📢 **New Grade Posted!**\n\
             **Course:** {}\n\
             **Assignment:** {}\n\
             **Student:** {}\n\
             **Grade:** {}\n\
             **Graded:** {}\n\
             **Comments:**\n{}",
            self.course_name,
            self.assignment_name,
            self.student_name,
            describe_score(self.grade.as_deref(), self.score, self.max_points),
            display_time(self.graded_at.as_ref()),
            comments
        );
        if let Some(url) = &self.preview_url {
            text.push_str(&format!("\n**Preview:** {}", url));
        }
        text
    }
}

/// Polls graded submissions for every tracked course.
pub struct GradeFeed {
    ctx: FeedContext,
    graded_since: String,
    seen: SeenSet,
}

impl GradeFeed {
    pub fn new(ctx: FeedContext, graded_since: impl Into<String>, seen: SeenSet) -> Self {
        Self {
            ctx,
            graded_since: graded_since.into(),
            seen,
        }
    }

    /// Fills in the parts the submission payload did not embed.
    async fn resolve(&self, course: &Course, submission: Submission, graded_at: Option<DateTime<Tz>>) -> GradeNotice {
        let source = &self.ctx.source;

        let embedded_name = submission.assignment.as_ref().and_then(|a| a.name.clone());
        let mut max_points = submission.assignment.as_ref().and_then(|a| a.points_possible);
        let assignment_name = match embedded_name {
            Some(name) => name,
            None => match source.assignment(course.id, submission.assignment_id).await {
                Ok(assignment) => {
                    max_points = max_points.or(assignment.points_possible);
                    assignment.name
                }
                Err(e) => {
                    warn!(
                        course_id = course.id,
                        assignment_id = submission.assignment_id,
                        error = %e,
                        "Failed to fetch assignment details"
                    );
                    "Unknown Assignment".to_string()
                }
            },
        };

        let student_name = match submission.user.as_ref().and_then(|u| u.name.clone()) {
            Some(name) => name,
            None => match source.user(submission.user_id).await {
                Ok(user) => user.name.unwrap_or_else(|| "Unknown Student".to_string()),
                Err(e) => {
                    warn!(user_id = submission.user_id, error = %e, "Failed to fetch user details");
                    "Unknown Student".to_string()
                }
            },
        };

        let comments = match submission.submission_comments {
            Some(comments) => comments,
            None => source
                .submission_comments(course.id, submission.assignment_id, submission.user_id)
                .await
                .unwrap_or_else(|e| {
                    warn!(submission_id = submission.id, error = %e, "Failed to fetch submission comments");
                    Vec::new()
                }),
        };

        GradeNotice {
            submission_id: submission.id,
            course_id: course.id,
            course_name: course.name.clone(),
            assignment_name,
            student_name,
            grade: submission.grade,
            score: submission.score,
            max_points,
            graded_at,
            comments,
            preview_url: submission.preview_url,
        }
    }
}

#[async_trait]
impl Feed for GradeFeed {
    fn category(&self) -> Category {
        Category::Grades
    }

    async fn poll(&self) -> Vec<Notification> {
        let now = self.ctx.clock.now();
        self.seen.prune(now);
        let mut fresh = Vec::new();

        for course in self.ctx.directory.courses() {
            let submissions = match self.ctx.source.graded_submissions(course.id, &self.graded_since).await {
                Ok(submissions) => submissions,
                Err(e) => {
                    warn!(course_id = course.id, error = %e, "Skipping course in grade poll");
                    continue;
                }
            };

            for submission in submissions {
                // Ungraded submissions stay unseen so the grade is reported once it lands.
                if submission.grade.is_none() || self.seen.contains(submission.id) {
                    continue;
                }
                let graded_at = match self.ctx.localize(submission.graded_at.as_deref()) {
                    Ok(at) => at,
                    Err(e) => {
                        warn!(submission_id = submission.id, error = %e, "Skipping submission");
                        continue;
                    }
                };
                if !self.seen.insert_new(submission.id, now) {
                    continue;
                }

                debug!(course_id = course.id, submission_id = submission.id, "New grade");
                let notice = self.resolve(&course, submission, graded_at).await;
                fresh.push(Notification::Grade(notice));
            }
        }

        fresh
    }

    fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::test_support::context;
    use crate::testing::{submission, FakeSource};

    fn grade_notices(items: Vec<Notification>) -> Vec<GradeNotice> {
        items
            .into_iter()
            .map(|n| match n {
                Notification::Grade(notice) => notice,
                other => panic!("unexpected notification {:?}", other),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_second_poll_is_empty() {
        let (ctx, _) = context(
            FakeSource::new()
                .with_course(1, "CS 420")
                .with_submissions(1, vec![submission(10, 100, 93.0), submission(11, 101, 80.0)]),
        )
        .await;
        let feed = GradeFeed::new(ctx, "2023-01-01T00:00:00Z", SeenSet::new(None));

        assert_eq!(feed.poll().await.len(), 2);
        assert!(feed.poll().await.is_empty());
        assert_eq!(feed.seen_count(), 2);
    }

    #[tokio::test]
    async fn test_embedded_data_avoids_lookups() {
        let (ctx, source) = context(
            FakeSource::new()
                .with_course(1, "CS 420")
                .with_submissions(1, vec![submission(10, 100, 93.0)]),
        )
        .await;
        let feed = GradeFeed::new(ctx, "2023-01-01T00:00:00Z", SeenSet::new(None));

        let notices = grade_notices(feed.poll().await);

        assert_eq!(notices[0].assignment_name, "Assignment 100");
        assert_eq!(notices[0].student_name, "Dana");
        assert_eq!(source.calls(), vec!["courses", "submissions:1"]);
    }

    #[tokio::test]
    async fn test_missing_pieces_are_fetched() {
        let mut bare = submission(10, 100, 45.0);
        bare.assignment = None;
        bare.user = None;
        bare.submission_comments = None;

        let mut details = crate::testing::assignment(100, 1, "Project Part #2", None);
        details.points_possible = Some(50.0);

        let (ctx, source) = context(
            FakeSource::new()
                .with_course(1, "CS 420")
                .with_submissions(1, vec![bare])
                .with_assignments(1, vec![details])
                .with_user(77, "Dana")
                .with_comments(
                    (1, 100, 77),
                    vec![SubmissionComment {
                        author_name: Some("Prof".into()),
                        created_at: Some("2024-11-20T09:01:00Z".into()),
                        comment: "See rubric".into(),
                    }],
                ),
        )
        .await;
        let feed = GradeFeed::new(ctx, "2023-01-01T00:00:00Z", SeenSet::new(None));

        let notices = grade_notices(feed.poll().await);
        let text = notices[0].render();

        assert!(source.calls().contains(&"comments:1:100:77".to_string()));
        assert!(text.contains("**Assignment:** Project Part #2"));
        assert!(text.contains("**Grade:** 45/50 (90%)"));
        assert!(text.contains("- Prof (2024-11-20T09:01:00Z): See rubric"));
    }

    #[tokio::test]
    async fn test_failed_lookups_use_placeholders() {
        let mut bare = submission(10, 100, 93.0);
        bare.assignment = None;
        bare.user = None;

        let (ctx, _) = context(
            FakeSource::new()
                .with_course(1, "CS 420")
                .with_submissions(1, vec![bare]),
        )
        .await;
        let feed = GradeFeed::new(ctx, "2023-01-01T00:00:00Z", SeenSet::new(None));

        let notices = grade_notices(feed.poll().await);
        assert_eq!(notices[0].assignment_name, "Unknown Assignment");
        assert_eq!(notices[0].student_name, "Unknown Student");
        assert!(notices[0].render().contains("No comments"));
    }

    #[tokio::test]
    async fn test_failed_course_does_not_abort_poll() {
        let (ctx, _) = context(
            FakeSource::new()
                .with_course(1, "CS 420")
                .with_course(2, "CS 457")
                .with_submissions(2, vec![submission(20, 200, 88.0)])
                .failing_course(1),
        )
        .await;
        let feed = GradeFeed::new(ctx, "2023-01-01T00:00:00Z", SeenSet::new(None));

        let notices = grade_notices(feed.poll().await);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].course_name, "CS 457");
    }

    #[tokio::test]
    async fn test_ungraded_and_malformed_items_stay_unseen() {
        let mut ungraded = submission(10, 100, 0.0);
        ungraded.grade = None;
        let mut malformed = submission(11, 101, 75.0);
        malformed.graded_at = Some("last tuesday".into());

        let (ctx, _) = context(
            FakeSource::new()
                .with_course(1, "CS 420")
                .with_submissions(1, vec![ungraded, malformed, submission(12, 102, 99.0)]),
        )
        .await;
        let feed = GradeFeed::new(ctx, "2023-01-01T00:00:00Z", SeenSet::new(None));

        let notices = grade_notices(feed.poll().await);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].submission_id, 12);
        assert_eq!(feed.seen_count(), 1);
    }
}
