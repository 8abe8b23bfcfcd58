/// SQLite persistence for the course cache
use crate::canvas::Course;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_course_cache.sql");

/// A snapshot read back from disk.
#[derive(Debug, Clone)]
pub struct CachedCourses {
    pub courses: Vec<Course>,
    pub synced_at: DateTime<Utc>,
}

pub struct CourseCacheDb {
    db: Mutex<Connection>,
}

impl CourseCacheDb {
    /// Opens (or creates) the cache file and initializes the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Loads the cached courses in stored order, or `None` if no sync was ever recorded.
    pub fn load(&self) -> Result<Option<CachedCourses>> {
        let db = self.lock();

        let synced_at: Option<DateTime<Utc>> = db
            .query_row(
                "SELECT synced_at FROM course_cache_sync WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let Some(synced_at) = synced_at else {
            return Ok(None);
        };

        let mut stmt = db.prepare("SELECT course_id, name FROM courses ORDER BY position")?;
        let courses = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                Ok(Course {
                    id: id as u64,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(CachedCourses { courses, synced_at }))
    }

    /// Replaces the whole cache in one transaction.
    pub fn replace_all(&self, courses: &[Course], synced_at: DateTime<Utc>) -> Result<()> {
        let mut db = self.lock();
        let tx = db.transaction()?;

        tx.execute("DELETE FROM courses", [])?;
        {
            let mut insert =
                tx.prepare("INSERT INTO courses (position, course_id, name) VALUES (?1, ?2, ?3)")?;
            for (position, course) in courses.iter().enumerate() {
                insert.execute(params![position as i64, course.id as i64, course.name])?;
            }
        }
        tx.execute(
            "INSERT INTO course_cache_sync (id, synced_at) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET synced_at = excluded.synced_at",
            params![synced_at],
        )?;

        tx.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: u64, name: &str) -> Course {
        Course {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_empty_cache_has_no_snapshot() {
        let db = CourseCacheDb::in_memory().unwrap();
        assert!(db.load().unwrap().is_none());
    }

    #[test]
    fn test_replace_keeps_order_and_drops_old_rows() {
        let db = CourseCacheDb::in_memory().unwrap();
        let now = Utc::now();

        db.replace_all(&[course(3, "CS 457"), course(1, "CS 420")], now).unwrap();
        db.replace_all(&[course(9, "CPE 470"), course(3, "CS 457")], now).unwrap();

        let cached = db.load().unwrap().unwrap();
        let ids: Vec<_> = cached.courses.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![9, 3]);
    }

    #[test]
    fn test_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.db");

        {
            let db = CourseCacheDb::open(&path).unwrap();
            db.replace_all(&[course(5, "CS 474")], Utc::now()).unwrap();
        }

        let reopened = CourseCacheDb::open(&path).unwrap();
        let cached = reopened.load().unwrap().unwrap();
        assert_eq!(cached.courses, vec![course(5, "CS 474")]);
    }

    #[test]
    fn test_synced_with_zero_courses() {
        let db = CourseCacheDb::in_memory().unwrap();
        db.replace_all(&[], Utc::now()).unwrap();

        let cached = db.load().unwrap().unwrap();
        assert!(cached.courses.is_empty());
    }
}
