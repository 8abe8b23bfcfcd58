/// Letter grades, current course grades, GPA and recently graded work
mod gpa;
mod recent;

pub use gpa::{calculate_gpa, current_grade, CourseGrade, GpaSummary};
pub use recent::{recent_grades, RecentGrade};

use serde::Serialize;
use std::fmt;

/// Unweighted letter grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    /// Grade points on the 4.0 scale.
    pub fn points(&self) -> f64 {
        match self {
            LetterGrade::A => 4.0,
            LetterGrade::B => 3.0,
            LetterGrade::C => 2.0,
            LetterGrade::D => 1.0,
            LetterGrade::F => 0.0,
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        };
        f.write_str(letter)
    }
}

/// Maps a percentage to a letter using fixed 90/80/70/60 cutoffs.
///
/// Out-of-range input is not clamped: 109 is an A, -5 is an F.
pub fn score_to_letter(score: f64) -> LetterGrade {
    if score >= 90.0 {
        LetterGrade::A
    } else if score >= 80.0 {
        LetterGrade::B
    } else if score >= 70.0 {
        LetterGrade::C
    } else if score >= 60.0 {
        LetterGrade::D
    } else {
        LetterGrade::F
    }
}

/// `score/max (pct%)` when both are known, otherwise the raw grade string.
pub fn describe_score(grade: Option<&str>, score: Option<f64>, max_points: Option<f64>) -> String {
    match (score, max_points) {
        (Some(score), Some(max)) if max > 0.0 => {
            format!("{}/{} ({:.0}%)", fmt_points(score), fmt_points(max), score / max * 100.0)
        }
        _ => grade.unwrap_or("No Grade").to_string(),
    }
}

/// Trims a trailing `.0` from whole point values.
fn fmt_points(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_boundary_exact() {
        assert_eq!(score_to_letter(90.0), LetterGrade::A);
        assert_eq!(score_to_letter(89.999), LetterGrade::B);
        assert_eq!(score_to_letter(80.0), LetterGrade::B);
        assert_eq!(score_to_letter(70.0), LetterGrade::C);
        assert_eq!(score_to_letter(60.0), LetterGrade::D);
        assert_eq!(score_to_letter(59.999), LetterGrade::F);
    }

    #[test]
    fn test_out_of_range_scores() {
        assert_eq!(score_to_letter(109.32), LetterGrade::A);
        assert_eq!(score_to_letter(-4.0), LetterGrade::F);
    }

    #[test]
    fn test_points() {
        assert_eq!(LetterGrade::A.points(), 4.0);
        assert_eq!(LetterGrade::F.points(), 0.0);
        assert_eq!(LetterGrade::C.to_string(), "C");
    }

    #[test]
    fn test_describe_score() {
        assert_eq!(describe_score(Some("93"), Some(93.0), Some(100.0)), "93/100 (93%)");
        assert_eq!(describe_score(Some("A-"), Some(45.5), Some(50.0)), "45.5/50 (91%)");
        assert_eq!(describe_score(Some("complete"), None, Some(10.0)), "complete");
        assert_eq!(describe_score(None, Some(3.0), Some(0.0)), "No Grade");
    }
}
