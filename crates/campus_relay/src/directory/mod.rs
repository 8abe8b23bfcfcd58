//! Locally cached course list.
//!
//! The directory holds one ordered list of `{id, name}` records, so names and
//! ids can never drift out of alignment. It is loaded from the SQLite cache at
//! startup and only changes on an explicit [`CourseDirectory::sync`].

mod store;

pub use store::{CachedCourses, CourseCacheDb};

use crate::canvas::{CanvasError, Course, CourseId, DataSource};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Courses could not be fetched; the previous cache is kept
    #[error("Failed to fetch courses: {0}")]
    Fetch(#[from] CanvasError),

    /// The cache file could not be read or written
    #[error("Course cache storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub struct CourseDirectory {
    source: Arc<dyn DataSource>,
    store: CourseCacheDb,
    /// `None` until a sync has happened (now or in an earlier run)
    cache: RwLock<Option<CachedCourses>>,
}

impl CourseDirectory {
    /// Creates a directory seeded from whatever the store already holds.
    pub fn load(source: Arc<dyn DataSource>, store: CourseCacheDb) -> Result<Self, DirectoryError> {
        let cache = store.load()?;
        if let Some(cached) = &cache {
            info!(
                courses = cached.courses.len(),
                synced_at = %cached.synced_at,
                "Loaded course cache"
            );
        }

        Ok(Self {
            source,
            store,
            cache: RwLock::new(cache),
        })
    }

    /// Refetches student courses and replaces the cache wholesale.
    ///
    /// On failure the existing cache is left untouched. A course listed more
    /// than once (one per enrollment) is kept at its first position.
    pub async fn sync(&self) -> Result<usize, DirectoryError> {
        let mut courses = match self.source.student_courses().await {
            Ok(courses) => courses,
            Err(e) => {
                warn!(error = %e, "Course sync failed, keeping existing cache");
                return Err(e.into());
            }
        };

        let mut ids = HashSet::new();
        courses.retain(|course| ids.insert(course.id));

        let synced_at = Utc::now();
        self.store.replace_all(&courses, synced_at)?;

        let count = courses.len();
        *self.cache.write().unwrap_or_else(|p| p.into_inner()) = Some(CachedCourses { courses, synced_at });

        info!(courses = count, "Course cache synced");
        Ok(count)
    }

    /// Whether a sync has ever completed.
    pub fn is_synced(&self) -> bool {
        self.read(|cache| cache.is_some())
    }

    pub fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.read(|cache| cache.as_ref().map(|c| c.synced_at))
    }

    /// Cached courses in API order; empty before the first sync.
    pub fn courses(&self) -> Vec<Course> {
        self.read(|cache| cache.as_ref().map(|c| c.courses.clone()).unwrap_or_default())
    }

    pub fn list_names(&self) -> Vec<String> {
        self.courses().into_iter().map(|c| c.name).collect()
    }

    pub fn list_ids(&self) -> Vec<CourseId> {
        self.courses().into_iter().map(|c| c.id).collect()
    }

    /// Display name for a course id.
    pub fn name_for(&self, id: CourseId) -> Option<String> {
        self.read(|cache| {
            cache
                .as_ref()
                .and_then(|c| c.courses.iter().find(|course| course.id == id))
                .map(|course| course.name.clone())
        })
    }

    /// Course id for a display name, compared case-insensitively.
    pub fn id_for_name(&self, name: &str) -> Option<CourseId> {
        let wanted = name.trim().to_lowercase();
        self.read(|cache| {
            cache
                .as_ref()
                .and_then(|c| c.courses.iter().find(|course| course.name.to_lowercase() == wanted))
                .map(|course| course.id)
        })
    }

    fn read<T>(&self, f: impl FnOnce(&Option<CachedCourses>) -> T) -> T {
        let guard = self.cache.read().unwrap_or_else(|p| p.into_inner());
        f(&guard)
    }
}
