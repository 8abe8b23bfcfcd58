//! Read-only access to the Canvas LMS REST API.
//!
//! The [`DataSource`] trait is the seam every other subsystem depends on;
//! [`CanvasClient`] is the HTTP implementation used in production.

mod client;
mod error;
mod types;

pub use client::{CanvasClient, CanvasConfig};
pub use error::CanvasError;
pub use types::*;

use async_trait::async_trait;

/// Queries the relay issues against the learning-management system.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Courses the token holder is enrolled in as a student.
    async fn student_courses(&self) -> Result<Vec<Course>, CanvasError>;

    /// Enrollments for a course, used to read the current score.
    async fn enrollments(&self, course_id: CourseId) -> Result<Vec<Enrollment>, CanvasError>;

    /// Assignments for a course.
    async fn assignments(
        &self,
        course_id: CourseId,
        query: &AssignmentQuery,
    ) -> Result<Vec<Assignment>, CanvasError>;

    /// A single assignment.
    async fn assignment(
        &self,
        course_id: CourseId,
        assignment_id: AssignmentId,
    ) -> Result<Assignment, CanvasError>;

    /// Submissions in a course graded at or after `graded_since`.
    async fn graded_submissions(
        &self,
        course_id: CourseId,
        graded_since: &str,
    ) -> Result<Vec<Submission>, CanvasError>;

    /// User details by id.
    async fn user(&self, user_id: UserId) -> Result<UserProfile, CanvasError>;

    /// Comments left on one user's submission.
    async fn submission_comments(
        &self,
        course_id: CourseId,
        assignment_id: AssignmentId,
        user_id: UserId,
    ) -> Result<Vec<SubmissionComment>, CanvasError>;

    /// Inbox conversations.
    async fn conversations(&self) -> Result<Vec<Conversation>, CanvasError>;

    /// Files in a course, newest first.
    async fn course_files(&self, course_id: CourseId) -> Result<Vec<CourseFile>, CanvasError>;

    /// Announcements posted to a course.
    async fn announcements(&self, course_id: CourseId) -> Result<Vec<Announcement>, CanvasError>;
}
