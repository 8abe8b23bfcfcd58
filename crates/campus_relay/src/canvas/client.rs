//! HTTP client for the Canvas REST API.
//!
//! Every request carries the configured bearer token and is bounded by a
//! per-request timeout. List endpoints are paginated through the `Link`
//! response header.

use super::error::CanvasError;
use super::types::*;
use super::DataSource;
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::LINK;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

/// Canvas caps `per_page` at 100 for most list endpoints.
const PER_PAGE: &str = "100";

static NEXT_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]*)>\s*;\s*rel="next""#).unwrap());

/// Configuration for the Canvas client.
#[derive(Debug, Clone)]
pub struct CanvasConfig {
    /// Base URL including the API prefix, e.g. `https://canvas.example.edu/api/v1`
    pub base_url: String,
    /// Bearer token passed through on every request
    pub api_token: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Upper bound on pages followed for a single list request
    pub max_pages: u32,
    /// User agent string
    pub user_agent: String,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/api/v1".to_string(),
            api_token: String::new(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_pages: 50,
            user_agent: concat!("campus_relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Client for the Canvas REST API.
pub struct CanvasClient {
    client: Client,
    config: CanvasConfig,
}

impl CanvasClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: CanvasConfig) -> Result<Self, CanvasError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CanvasError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Builds an absolute endpoint URL from a path relative to the API base.
    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, CanvasError> {
        let mut url = Url::parse(&format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            path
        ))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Sends an authenticated GET and rejects non-2xx responses.
    async fn send(&self, url: Url) -> Result<reqwest::Response, CanvasError> {
        let endpoint = url.path().to_string();
        debug!(endpoint = %endpoint, "Canvas GET");

        let response = match self
            .client
            .get(url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let err = CanvasError::from(e);
                if err.is_timeout() {
                    warn!(endpoint = %endpoint, "Canvas request timed out");
                } else {
                    warn!(endpoint = %endpoint, error = %err, "Canvas request failed");
                }
                return Err(err);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let err = CanvasError::Status {
                status: status.as_u16(),
                endpoint,
            };
            if err.is_unauthorized() {
                error!(error = %err, "Canvas rejected the API token");
            } else {
                warn!(error = %err, retryable = err.is_retryable(), "Canvas request failed");
            }
            return Err(err);
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CanvasError> {
        let response = self.send(url).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Fetches every page of a list endpoint, following `rel="next"` links.
    async fn get_paginated<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, CanvasError> {
        let mut items = Vec::new();
        let mut next = Some(url);
        let mut pages = 0u32;

        while let Some(url) = next.take() {
            let response = self.send(url).await?;
            let next_link = response
                .headers()
                .get(LINK)
                .and_then(|h| h.to_str().ok())
                .and_then(parse_next_link);

            let text = response.text().await?;
            let page: Vec<T> = serde_json::from_str(&text)?;
            items.extend(page);
            pages += 1;

            if pages >= self.config.max_pages {
                if next_link.is_some() {
                    warn!(pages, "Stopped following pagination at page limit");
                }
                break;
            }

            next = next_link.map(|link| Url::parse(&link)).transpose()?;
        }

        Ok(items)
    }
}

/// Extracts the `rel="next"` target from a `Link` header.
fn parse_next_link(header: &str) -> Option<String> {
    NEXT_LINK_REGEX
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn per_page() -> (&'static str, String) {
    ("per_page", PER_PAGE.to_string())
}

#[async_trait]
impl DataSource for CanvasClient {
    async fn student_courses(&self) -> Result<Vec<Course>, CanvasError> {
        let url = self.endpoint(
            "/courses",
            &[("enrollment_type", "student".to_string()), per_page()],
        )?;
        self.get_paginated(url).await
    }

    async fn enrollments(&self, course_id: CourseId) -> Result<Vec<Enrollment>, CanvasError> {
        let url = self.endpoint(&format!("/courses/{course_id}/enrollments"), &[per_page()])?;
        self.get_paginated(url).await
    }

    async fn assignments(
        &self,
        course_id: CourseId,
        query: &AssignmentQuery,
    ) -> Result<Vec<Assignment>, CanvasError> {
        let mut params = vec![per_page()];
        if query.include_submission {
            params.push(("include[]", "submission".to_string()));
        }
        if let Some(bucket) = query.bucket {
            params.push(("bucket", bucket.as_str().to_string()));
        }
        let url = self.endpoint(&format!("/courses/{course_id}/assignments"), &params)?;
        self.get_paginated(url).await
    }

    async fn assignment(
        &self,
        course_id: CourseId,
        assignment_id: AssignmentId,
    ) -> Result<Assignment, CanvasError> {
        let url = self.endpoint(
            &format!("/courses/{course_id}/assignments/{assignment_id}"),
            &[],
        )?;
        self.get_json(url).await
    }

    async fn graded_submissions(
        &self,
        course_id: CourseId,
        graded_since: &str,
    ) -> Result<Vec<Submission>, CanvasError> {
        let url = self.endpoint(
            &format!("/courses/{course_id}/students/submissions"),
            &[
                ("graded_since", graded_since.to_string()),
                ("include[]", "submission_comments".to_string()),
                ("include[]", "assignment".to_string()),
                ("include[]", "user".to_string()),
                per_page(),
            ],
        )?;
        self.get_paginated(url).await
    }

    async fn user(&self, user_id: UserId) -> Result<UserProfile, CanvasError> {
        let url = self.endpoint(&format!("/users/{user_id}"), &[])?;
        self.get_json(url).await
    }

    async fn submission_comments(
        &self,
        course_id: CourseId,
        assignment_id: AssignmentId,
        user_id: UserId,
    ) -> Result<Vec<SubmissionComment>, CanvasError> {
        let url = self.endpoint(
            &format!("/courses/{course_id}/assignments/{assignment_id}/submissions/{user_id}"),
            &[("include[]", "submission_comments".to_string())],
        )?;
        let submission: SingleSubmission = self.get_json(url).await?;
        Ok(submission.submission_comments)
    }

    async fn conversations(&self) -> Result<Vec<Conversation>, CanvasError> {
        let url = self.endpoint("/conversations", &[per_page()])?;
        self.get_paginated(url).await
    }

    async fn course_files(&self, course_id: CourseId) -> Result<Vec<CourseFile>, CanvasError> {
        let url = self.endpoint(
            &format!("/courses/{course_id}/files"),
            &[
                ("sort", "created_at".to_string()),
                ("order", "desc".to_string()),
                per_page(),
            ],
        )?;
        self.get_paginated(url).await
    }

    async fn announcements(&self, course_id: CourseId) -> Result<Vec<Announcement>, CanvasError> {
        let url = self.endpoint(
            "/announcements",
            &[("context_codes[]", format!("course_{course_id}")), per_page()],
        )?;
        self.get_paginated(url).await
    }
}
