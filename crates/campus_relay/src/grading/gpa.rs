//! Current course grades and the unweighted GPA built from them.

use super::{score_to_letter, LetterGrade};
use crate::canvas::{CanvasError, CourseId, DataSource};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

/// Score assumed when Canvas reports a student enrollment without a
/// `current_score` (nothing graded yet).
// NOTE: this rewards missing data; keep until product decides otherwise.
const MISSING_SCORE_DEFAULT: f64 = 100.0;

/// Current grade in one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseGrade {
    pub course_id: CourseId,
    pub letter: LetterGrade,
    pub percent: f64,
}

/// Aggregate over every course with a resolvable grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpaSummary {
    pub gpa: f64,
    pub average_percent: f64,
    pub courses_counted: usize,
}

/// Reads the current grade from the first student enrollment that carries grades.
///
/// Returns `Ok(None)` when the course has no such enrollment.
pub async fn current_grade(
    source: &dyn DataSource,
    course_id: CourseId,
) -> Result<Option<CourseGrade>, CanvasError> {
    let enrollments = source.enrollments(course_id).await?;

    let grade = enrollments
        .iter()
        .filter(|e| e.is_student())
        .find_map(|e| e.grades.as_ref())
        .map(|grades| {
            let percent = grades.current_score.unwrap_or(MISSING_SCORE_DEFAULT);
            CourseGrade {
                course_id,
                letter: score_to_letter(percent),
                percent,
            }
        });

    if grade.is_none() {
        debug!(course_id, "No grade data available for course");
    }

    Ok(grade)
}

/// Computes the unweighted GPA and mean percentage across `course_ids`.
///
/// Courses whose grade cannot be fetched or resolved are skipped. Returns
/// `None` when no course produced a grade, so "no data" is never reported
/// as a 0.0 GPA.
pub async fn calculate_gpa(source: &dyn DataSource, course_ids: &[CourseId]) -> Option<GpaSummary> {
    let lookups = course_ids.iter().map(|&id| async move { (id, current_grade(source, id).await) });

    let mut total_points = 0.0;
    let mut total_percent = 0.0;
    let mut counted = 0usize;

    for (course_id, result) in join_all(lookups).await {
        match result {
            Ok(Some(grade)) => {
                total_points += grade.letter.points();
                total_percent += grade.percent;
                counted += 1;
            }
            Ok(None) => {}
            Err(e) => warn!(course_id, error = %e, "Skipping course in GPA calculation"),
        }
    }

    if counted == 0 {
        return None;
    }

    Some(GpaSummary {
        gpa: total_points / counted as f64,
        average_percent: total_percent / counted as f64,
        courses_counted: counted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;

    #[tokio::test]
    async fn test_gpa_of_a_and_b() {
        let source = FakeSource::new()
            .with_score(1, Some(95.0))
            .with_score(2, Some(84.0));

        let summary = calculate_gpa(&source, &[1, 2]).await.unwrap();

        assert_eq!(summary.gpa, 3.5);
        assert_eq!(summary.average_percent, 89.5);
        assert_eq!(summary.courses_counted, 2);
    }

    #[tokio::test]
    async fn test_gpa_absent_without_courses() {
        let source = FakeSource::new();
        assert_eq!(calculate_gpa(&source, &[]).await, None);
    }

    #[tokio::test]
    async fn test_gpa_absent_without_resolvable_grades() {
        // Course 1 has no enrollments, course 2 fails to fetch.
        let source = FakeSource::new().failing_course(2);
        assert_eq!(calculate_gpa(&source, &[1, 2]).await, None);
    }

    #[tokio::test]
    async fn test_gpa_skips_failed_course() {
        let source = FakeSource::new()
            .with_score(1, Some(72.0))
            .with_score(2, Some(99.0))
            .failing_course(2);

        let summary = calculate_gpa(&source, &[1, 2]).await.unwrap();
        assert_eq!(summary.gpa, 2.0);
        assert_eq!(summary.courses_counted, 1);
    }

    #[tokio::test]
    async fn test_missing_score_defaults_to_full_marks() {
        let source = FakeSource::new().with_score(5, None);
        let grade = current_grade(&source, 5).await.unwrap().unwrap();

        assert_eq!(grade.percent, 100.0);
        assert_eq!(grade.letter, LetterGrade::A);
    }
}
