//! On-demand lookup of assignments due soon.

use crate::canvas::{AssignmentBucket, AssignmentQuery, CourseId, DataSource};
use crate::temporal::{in_due_window, parse_and_localize, Clock, DISPLAY_FORMAT};
use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingAssignment {
    pub course_id: CourseId,
    pub name: String,
    pub due_at: DateTime<Tz>,
    pub link: String,
    pub submitted: bool,
    pub missing: bool,
}

impl UpcomingAssignment {
    pub fn render(&self, course_name: &str) -> String {
        let status = if self.submitted { " ✅ submitted" } else { "" };
        format!(
            "**{}**: {}{}\nDue: {}\n{}",
            course_name,
            self.name,
            status,
            self.due_at.format(DISPLAY_FORMAT),
            self.link
        )
    }
}

#[derive(Clone)]
pub struct AssignmentFeed {
    source: Arc<dyn DataSource>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    only_unsubmitted: bool,
}

impl AssignmentFeed {
    pub fn new(source: Arc<dyn DataSource>, clock: Arc<dyn Clock>, timezone: Tz) -> Self {
        Self {
            source,
            clock,
            timezone,
            only_unsubmitted: false,
        }
    }

    /// Asks the server to drop work that has already been turned in.
    pub fn only_unsubmitted(mut self) -> Self {
        self.only_unsubmitted = true;
        self
    }

    /// Assignments with a due date inside `[now, now + horizon]`, in API order.
    ///
    /// A course that fails to load and an assignment with a malformed due date
    /// are both skipped.
    pub async fn upcoming(&self, course_ids: &[CourseId], horizon: TimeDelta) -> Vec<UpcomingAssignment> {
        let now = self.clock.now();
        let query = AssignmentQuery {
            include_submission: true,
            bucket: self.only_unsubmitted.then_some(AssignmentBucket::Unsubmitted),
        };
        let mut upcoming = Vec::new();

        for &course_id in course_ids {
            let assignments = match self.source.assignments(course_id, &query).await {
                Ok(assignments) => assignments,
                Err(e) => {
                    warn!(course_id, error = %e, "Failed to fetch assignments");
                    continue;
                }
            };

            for assignment in assignments {
                let Some(raw_due) = assignment.due_at.as_deref() else {
                    continue;
                };
                let due_at = match parse_and_localize(raw_due, &self.timezone) {
                    Ok(due) => due,
                    Err(e) => {
                        warn!(assignment_id = assignment.id, error = %e, "Skipping assignment");
                        continue;
                    }
                };
                if !in_due_window(now, &due_at, horizon) {
                    continue;
                }

                let submission = assignment.submission.as_ref();
                upcoming.push(UpcomingAssignment {
                    course_id,
                    name: assignment.name.clone(),
                    due_at,
                    link: assignment.html_url.clone().unwrap_or_default(),
                    submitted: submission.is_some_and(|s| s.is_submitted()),
                    missing: submission.is_some_and(|s| s.missing),
                });
            }
        }

        debug!(count = upcoming.len(), "Collected upcoming assignments");
        upcoming
    }
}

/// Orders by due date, earliest first.
pub fn sort_by_due(assignments: &mut [UpcomingAssignment]) {
    assignments.sort_by_key(|a| a.due_at.timestamp());
}
