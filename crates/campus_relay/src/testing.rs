//! In-memory doubles for the data source, the chat sink and the clock.

use crate::assignments::AssignmentFeed;
use crate::canvas::{
    Announcement, Assignment, AssignmentId, AssignmentQuery, CanvasError, Conversation, Course,
    CourseFile, CourseId, DataSource, EmbeddedAssignment, Enrollment, EnrollmentGrades,
    Participant, Submission, SubmissionComment, UserId, UserProfile,
};
use crate::directory::{CourseCacheDb, CourseDirectory};
use crate::dispatch::NotificationDispatcher;
use crate::menu::MenuSessions;
use crate::preferences::PreferenceStore;
use crate::sink::{DeliveryError, NotificationSink, Recipient, RecipientId, Target};
use crate::temporal::{parse_utc, Clock};
use crate::types::RelayState;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// A clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(timestamp: &str) -> Self {
        Self {
            now: Mutex::new(parse_utc(timestamp).unwrap()),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A graded submission with an embedded assignment named `Assignment {assignment_id}`
/// worth 100 points.
pub fn submission(id: u64, assignment_id: AssignmentId, score: f64) -> Submission {
    Submission {
        id,
        assignment_id,
        user_id: 77,
        grade: Some(format!("{}", score)),
        score: Some(score),
        graded_at: Some("2024-11-20T09:00:00Z".to_string()),
        preview_url: Some(format!("https://canvas.example/preview/{id}")),
        submission_comments: Some(Vec::new()),
        assignment: Some(EmbeddedAssignment {
            name: Some(format!("Assignment {assignment_id}")),
            points_possible: Some(100.0),
        }),
        user: Some(UserProfile {
            id: Some(77),
            name: Some("Dana".to_string()),
        }),
    }
}

pub fn assignment(id: AssignmentId, course_id: CourseId, name: &str, due_at: Option<&str>) -> Assignment {
    Assignment {
        id,
        course_id,
        name: name.to_string(),
        due_at: due_at.map(str::to_string),
        points_possible: Some(100.0),
        html_url: Some(format!("https://canvas.example/courses/{course_id}/assignments/{id}")),
        submission: None,
    }
}

pub fn conversation(id: u64, sender: &str, subject: &str, body: &str) -> Conversation {
    Conversation {
        id,
        subject: Some(subject.to_string()),
        last_message: Some(body.to_string()),
        participants: vec![Participant {
            id: Some(id * 10),
            name: Some(sender.to_string()),
        }],
    }
}

pub fn course_file(id: u64, name: &str, created_at: &str) -> CourseFile {
    CourseFile {
        id,
        display_name: name.to_string(),
        url: format!("https://canvas.example/files/{id}/download"),
        created_at: Some(created_at.to_string()),
    }
}

pub fn announcement(id: u64, course_id: CourseId, title: &str, html: &str, posted_at: &str) -> Announcement {
    Announcement {
        id,
        title: title.to_string(),
        message: html.to_string(),
        posted_at: Some(posted_at.to_string()),
        context_code: Some(format!("course_{course_id}")),
        html_url: None,
        user_name: Some("Prof. Lee".to_string()),
    }
}

#[derive(Default)]
struct SourceData {
    courses: Vec<Course>,
    course_list_fails: bool,
    inbox_fails: bool,
    failing: HashSet<CourseId>,
    enrollments: HashMap<CourseId, Vec<Enrollment>>,
    assignments: HashMap<CourseId, Vec<Assignment>>,
    submissions: HashMap<CourseId, Vec<Submission>>,
    users: HashMap<UserId, UserProfile>,
    comments: HashMap<(CourseId, AssignmentId, UserId), Vec<SubmissionComment>>,
    conversations: Vec<Conversation>,
    files: HashMap<CourseId, Vec<CourseFile>>,
    announcements: HashMap<CourseId, Vec<Announcement>>,
    calls: Vec<String>,
}

/// Canned [`DataSource`] that records every call it receives.
#[derive(Default)]
pub struct FakeSource {
    data: Mutex<SourceData>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn edit(mut self, f: impl FnOnce(&mut SourceData)) -> Self {
        f(self.data.get_mut().unwrap());
        self
    }

    pub fn with_course(self, id: CourseId, name: &str) -> Self {
        self.edit(|d| {
            d.courses.push(Course {
                id,
                name: name.to_string(),
            })
        })
    }

    /// A student enrollment whose grades carry `score`.
    pub fn with_score(self, course_id: CourseId, score: Option<f64>) -> Self {
        self.edit(|d| {
            d.enrollments.entry(course_id).or_default().push(Enrollment {
                enrollment_type: "StudentEnrollment".to_string(),
                grades: Some(EnrollmentGrades {
                    current_score: score,
                    current_grade: None,
                }),
            })
        })
    }

    pub fn with_submissions(self, course_id: CourseId, submissions: Vec<Submission>) -> Self {
        self.edit(|d| d.submissions.entry(course_id).or_default().extend(submissions))
    }

    pub fn with_assignments(self, course_id: CourseId, assignments: Vec<Assignment>) -> Self {
        self.edit(|d| d.assignments.entry(course_id).or_default().extend(assignments))
    }

    pub fn with_user(self, id: UserId, name: &str) -> Self {
        self.edit(|d| {
            d.users.insert(
                id,
                UserProfile {
                    id: Some(id),
                    name: Some(name.to_string()),
                },
            );
        })
    }

    pub fn with_comments(
        self,
        key: (CourseId, AssignmentId, UserId),
        comments: Vec<SubmissionComment>,
    ) -> Self {
        self.edit(|d| {
            d.comments.insert(key, comments);
        })
    }

    pub fn with_conversations(self, conversations: Vec<Conversation>) -> Self {
        self.edit(|d| d.conversations.extend(conversations))
    }

    pub fn with_files(self, course_id: CourseId, files: Vec<CourseFile>) -> Self {
        self.edit(|d| d.files.entry(course_id).or_default().extend(files))
    }

    pub fn with_announcements(self, course_id: CourseId, announcements: Vec<Announcement>) -> Self {
        self.edit(|d| d.announcements.entry(course_id).or_default().extend(announcements))
    }

    /// Every per-course call for `course_id` answers with a 500.
    pub fn failing_course(self, course_id: CourseId) -> Self {
        self.edit(|d| {
            d.failing.insert(course_id);
        })
    }

    pub fn failing_course_list(self) -> Self {
        self.edit(|d| d.course_list_fails = true)
    }

    pub fn failing_inbox(self) -> Self {
        self.edit(|d| d.inbox_fails = true)
    }

    pub fn set_courses(&self, courses: Vec<Course>) {
        self.data.lock().unwrap().courses = courses;
    }

    pub fn push_conversation(&self, conversation: Conversation) {
        self.data.lock().unwrap().conversations.push(conversation);
    }

    pub fn course_list(&self) -> Vec<Course> {
        self.data.lock().unwrap().courses.clone()
    }

    /// Calls received so far, e.g. `user:77`.
    pub fn calls(&self) -> Vec<String> {
        self.data.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) -> std::sync::MutexGuard<'_, SourceData> {
        let mut data = self.data.lock().unwrap();
        data.calls.push(call);
        data
    }

    fn course_call(&self, course_id: CourseId, call: String) -> Result<std::sync::MutexGuard<'_, SourceData>, CanvasError> {
        let data = self.record(call.clone());
        if data.failing.contains(&course_id) {
            return Err(CanvasError::Status {
                status: 500,
                endpoint: call,
            });
        }
        Ok(data)
    }
}

fn not_found(endpoint: String) -> CanvasError {
    CanvasError::Status {
        status: 404,
        endpoint,
    }
}

#[async_trait]
impl DataSource for FakeSource {
    async fn student_courses(&self) -> Result<Vec<Course>, CanvasError> {
        let data = self.record("courses".to_string());
        if data.course_list_fails {
            return Err(CanvasError::Timeout {
                message: "courses timed out".to_string(),
            });
        }
        Ok(data.courses.clone())
    }

    async fn enrollments(&self, course_id: CourseId) -> Result<Vec<Enrollment>, CanvasError> {
        let data = self.course_call(course_id, format!("enrollments:{course_id}"))?;
        Ok(data.enrollments.get(&course_id).cloned().unwrap_or_default())
    }

    async fn assignments(
        &self,
        course_id: CourseId,
        query: &AssignmentQuery,
    ) -> Result<Vec<Assignment>, CanvasError> {
        let bucket = query.bucket.map(|b| b.as_str()).unwrap_or("all");
        let data = self.course_call(course_id, format!("assignments:{course_id}:{bucket}"))?;
        Ok(data.assignments.get(&course_id).cloned().unwrap_or_default())
    }

    async fn assignment(
        &self,
        course_id: CourseId,
        assignment_id: AssignmentId,
    ) -> Result<Assignment, CanvasError> {
        let call = format!("assignment:{course_id}:{assignment_id}");
        let data = self.course_call(course_id, call.clone())?;
        data.assignments
            .get(&course_id)
            .and_then(|list| list.iter().find(|a| a.id == assignment_id))
            .cloned()
            .ok_or_else(|| not_found(call))
    }

    async fn graded_submissions(
        &self,
        course_id: CourseId,
        _graded_since: &str,
    ) -> Result<Vec<Submission>, CanvasError> {
        let data = self.course_call(course_id, format!("submissions:{course_id}"))?;
        Ok(data.submissions.get(&course_id).cloned().unwrap_or_default())
    }

    async fn user(&self, user_id: UserId) -> Result<UserProfile, CanvasError> {
        let call = format!("user:{user_id}");
        let data = self.record(call.clone());
        data.users.get(&user_id).cloned().ok_or_else(|| not_found(call))
    }

    async fn submission_comments(
        &self,
        course_id: CourseId,
        assignment_id: AssignmentId,
        user_id: UserId,
    ) -> Result<Vec<SubmissionComment>, CanvasError> {
        let data = self.course_call(
            course_id,
            format!("comments:{course_id}:{assignment_id}:{user_id}"),
        )?;
        Ok(data
            .comments
            .get(&(course_id, assignment_id, user_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn conversations(&self) -> Result<Vec<Conversation>, CanvasError> {
        let data = self.record("conversations".to_string());
        if data.inbox_fails {
            return Err(CanvasError::Status {
                status: 503,
                endpoint: "conversations".to_string(),
            });
        }
        Ok(data.conversations.clone())
    }

    async fn course_files(&self, course_id: CourseId) -> Result<Vec<CourseFile>, CanvasError> {
        let data = self.course_call(course_id, format!("files:{course_id}"))?;
        Ok(data.files.get(&course_id).cloned().unwrap_or_default())
    }

    async fn announcements(&self, course_id: CourseId) -> Result<Vec<Announcement>, CanvasError> {
        let data = self.course_call(course_id, format!("announcements:{course_id}"))?;
        Ok(data.announcements.get(&course_id).cloned().unwrap_or_default())
    }
}

/// [`NotificationSink`] that keeps every delivered message.
#[derive(Default)]
pub struct RecordingSink {
    recipients: Vec<Recipient>,
    rejecting: HashSet<String>,
    recipients_fail: bool,
    sent: Mutex<Vec<(Target, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipient(mut self, id: &str) -> Self {
        self.recipients.push(Recipient {
            id: id.to_string(),
            name: id.to_string(),
            bot: false,
        });
        self
    }

    pub fn with_bot(mut self, id: &str) -> Self {
        self.recipients.push(Recipient {
            id: id.to_string(),
            name: id.to_string(),
            bot: true,
        });
        self
    }

    /// Direct messages to `id` fail as if DMs were disabled.
    pub fn rejecting(mut self, id: &str) -> Self {
        self.rejecting.insert(id.to_string());
        self
    }

    pub fn failing_recipients(mut self) -> Self {
        self.recipients_fail = true;
        self
    }

    pub fn sent(&self) -> Vec<(Target, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages delivered to one recipient or channel id.
    pub fn sent_to(&self, id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(target, _)| target.preference_key() == id)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send_direct(&self, recipient: &RecipientId, text: &str) -> Result<(), DeliveryError> {
        if self.rejecting.contains(recipient) {
            return Err(DeliveryError::Rejected {
                target: recipient.clone(),
                status: 403,
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((Target::Direct(recipient.clone()), text.to_string()));
        Ok(())
    }

    async fn broadcast(&self, channel: &str, text: &str) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((Target::Channel(channel.to_string()), text.to_string()));
        Ok(())
    }

    async fn recipients(&self) -> Result<Vec<Recipient>, DeliveryError> {
        if self.recipients_fail {
            return Err(DeliveryError::Unreachable {
                message: "recipients returned status 502".to_string(),
            });
        }
        Ok(self.recipients.clone())
    }
}

/// Relay state over `source` with the course directory already synced.
pub async fn relay_state(source: FakeSource) -> (Arc<RelayState>, Arc<FakeSource>) {
    let source = Arc::new(source);
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::at("2024-11-20T12:00:00Z"));
    let preferences = Arc::new(PreferenceStore::new());

    let directory = CourseDirectory::load(source.clone(), CourseCacheDb::in_memory().unwrap()).unwrap();
    let list_fails = source.data.lock().unwrap().course_list_fails;
    if !list_fails {
        directory.sync().await.unwrap();
    }

    let state = RelayState {
        source: source.clone(),
        directory: Arc::new(directory),
        preferences: preferences.clone(),
        dispatcher: Arc::new(NotificationDispatcher::new(
            Arc::new(RecordingSink::new()),
            preferences,
            Vec::new(),
            clock.clone(),
        )),
        assignments: AssignmentFeed::new(source.clone(), clock.clone(), chrono_tz::America::Denver),
        menus: MenuSessions::default(),
        clock,
        due_horizon: TimeDelta::days(7),
        recent_horizon: TimeDelta::days(3),
        started_at: parse_utc("2024-11-20T11:00:00Z").unwrap(),
    };
    (Arc::new(state), source)
}
