/// Typed payloads returned by the Canvas REST API
use serde::{Deserialize, Serialize};

pub type CourseId = u64;
pub type AssignmentId = u64;
pub type UserId = u64;

/// A course the token holder is enrolled in as a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    #[serde(default = "unnamed_course")]
    pub name: String,
}

fn unnamed_course() -> String {
    "Unnamed Course".to_string()
}

/// One row of `/courses/:id/enrollments`.
#[derive(Debug, Clone, Deserialize)]
pub struct Enrollment {
    #[serde(rename = "type")]
    pub enrollment_type: String,
    #[serde(default)]
    pub grades: Option<EnrollmentGrades>,
}

impl Enrollment {
    pub fn is_student(&self) -> bool {
        self.enrollment_type == "StudentEnrollment"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentGrades {
    #[serde(default)]
    pub current_score: Option<f64>,
    #[serde(default)]
    pub current_grade: Option<String>,
}

/// An assignment, optionally with the caller's submission embedded
/// (`include[]=submission`).
#[derive(Debug, Clone, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub course_id: CourseId,
    pub name: String,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub submission: Option<AssignmentSubmission>,
}

/// The slice of a submission embedded in an assignment listing.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentSubmission {
    #[serde(default)]
    pub workflow_state: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub missing: bool,
}

impl AssignmentSubmission {
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
            || matches!(
                self.workflow_state.as_deref(),
                Some("submitted") | Some("graded") | Some("pending_review")
            )
    }
}

/// Server-side bucket filter for assignment listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentBucket {
    Unsubmitted,
}

impl AssignmentBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentBucket::Unsubmitted => "unsubmitted",
        }
    }
}

/// Query options for `/courses/:id/assignments`.
#[derive(Debug, Clone, Default)]
pub struct AssignmentQuery {
    pub include_submission: bool,
    pub bucket: Option<AssignmentBucket>,
}

/// A submission from `/courses/:id/students/submissions`.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub id: u64,
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub graded_at: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    /// Present when requested with `include[]=submission_comments`
    #[serde(default)]
    pub submission_comments: Option<Vec<SubmissionComment>>,
    /// Present when requested with `include[]=assignment`
    #[serde(default)]
    pub assignment: Option<EmbeddedAssignment>,
    /// Present when requested with `include[]=user`
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedAssignment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub points_possible: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmissionComment {
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub comment: String,
}

/// Response of `/courses/:id/assignments/:aid/submissions/:uid`, only the
/// part the relay reads.
#[derive(Debug, Clone, Deserialize)]
pub struct SingleSubmission {
    #[serde(default)]
    pub submission_comments: Vec<SubmissionComment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// An inbox conversation from `/conversations`.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: u64,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A file uploaded to a course.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseFile {
    pub id: u64,
    pub display_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A course announcement (discussion topic flagged as announcement).
#[derive(Debug, Clone, Deserialize)]
pub struct Announcement {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    /// HTML body
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub posted_at: Option<String>,
    #[serde(default)]
    pub context_code: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

impl Announcement {
    /// Course id parsed from a `course_123` context code.
    pub fn course_id(&self) -> Option<CourseId> {
        self.context_code
            .as_deref()
            .and_then(|code| code.strip_prefix("course_"))
            .and_then(|id| id.parse().ok())
    }
}
