//! Work graded within the recency window.

use super::describe_score;
use crate::canvas::{Course, CourseId, DataSource, Submission};
use crate::temporal::{in_recency_window, parse_utc};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::warn;

const CANVAS_QUERY_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentGrade {
    pub course_id: CourseId,
    pub course_name: String,
    pub assignment_name: String,
    pub grade: Option<String>,
    pub score: Option<f64>,
    pub max_points: Option<f64>,
    pub graded_at: DateTime<Utc>,
}

impl RecentGrade {
    pub fn describe(&self) -> String {
        describe_score(self.grade.as_deref(), self.score, self.max_points)
    }
}

/// Collects every submission graded within `horizon` of `now`, newest first.
///
/// A course that fails to load is skipped; so is a submission with a
/// malformed `graded_at`.
pub async fn recent_grades(
    source: &dyn DataSource,
    courses: &[Course],
    now: DateTime<Utc>,
    horizon: TimeDelta,
) -> Vec<RecentGrade> {
    let since = (now - horizon).format(CANVAS_QUERY_FORMAT).to_string();
    let mut recent = Vec::new();

    for course in courses {
        let submissions = match source.graded_submissions(course.id, &since).await {
            Ok(submissions) => submissions,
            Err(e) => {
                warn!(course_id = course.id, error = %e, "Failed to fetch recent grades");
                continue;
            }
        };

        for submission in submissions {
            let Some(raw) = submission.graded_at.as_deref() else {
                continue;
            };
            let graded_at = match parse_utc(raw) {
                Ok(at) => at,
                Err(e) => {
                    warn!(submission_id = submission.id, error = %e, "Skipping submission");
                    continue;
                }
            };
            if !in_recency_window(graded_at, now, horizon) {
                continue;
            }

            let assignment_name = assignment_name(source, course.id, &submission).await;
            recent.push(RecentGrade {
                course_id: course.id,
                course_name: course.name.clone(),
                assignment_name,
                grade: submission.grade.clone(),
                score: submission.score,
                max_points: submission.assignment.as_ref().and_then(|a| a.points_possible),
                graded_at,
            });
        }
    }

    recent.sort_by(|a, b| b.graded_at.cmp(&a.graded_at));
    recent
}

async fn assignment_name(source: &dyn DataSource, course_id: CourseId, submission: &Submission) -> String {
    if let Some(name) = submission.assignment.as_ref().and_then(|a| a.name.clone()) {
        return name;
    }
    match source.assignment(course_id, submission.assignment_id).await {
        Ok(assignment) => assignment.name,
        Err(e) => {
            warn!(
                course_id,
                assignment_id = submission.assignment_id,
                error = %e,
                "Failed to fetch assignment name"
            );
            "Unknown Assignment".to_string()
        }
    }
}
