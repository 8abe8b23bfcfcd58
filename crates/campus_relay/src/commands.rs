//! `!`-prefixed chat commands and the replies they produce.
//!
//! The reply builders here are shared with the menu and the HTTP surface, so
//! every entry point answers a question with the same text.

use crate::assignments::sort_by_due;
use crate::grading::{calculate_gpa, current_grade, recent_grades};
use crate::preferences::{describe, normalize_tags, Category};
use crate::types::RelayState;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetPreferences(Vec<String>),
    AddPreferences(Vec<String>),
    RemovePreferences(Vec<String>),
    ViewPreferences,
    AvailablePreferences,
    GetClasses,
    SyncClasses,
    GetClassGrade(Option<String>),
    GetGpa,
    Upcoming,
    RecentGrades,
    Help,
    Unknown(String),
}

impl Command {
    /// Parses a chat line. Returns `None` unless it starts with `!`.
    pub fn parse(text: &str) -> Option<Self> {
        let body = text.trim().strip_prefix('!')?;
        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };
        let tags = || -> Vec<String> {
            rest.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect()
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "set_preferences" => Command::SetPreferences(tags()),
            "add_preferences" => Command::AddPreferences(tags()),
            "remove_preferences" => Command::RemovePreferences(tags()),
            "view_preferences" => Command::ViewPreferences,
            "available_preferences" => Command::AvailablePreferences,
            "get_classes" => Command::GetClasses,
            "sync_classes" => Command::SyncClasses,
            "get_class_grade" => Command::GetClassGrade((!rest.is_empty()).then(|| rest.to_string())),
            "get_gpa" => Command::GetGpa,
            "upcoming" => Command::Upcoming,
            "recent_grades" => Command::RecentGrades,
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }
}

const HELP_TEXT: &str = "\
Available commands:
`!set_preferences <tags>` - replace your notification categories
`!add_preferences <tags>` - subscribe to more categories
`!remove_preferences <tags>` - unsubscribe from categories
`!view_preferences` - show your current categories
`!available_preferences` - list the categories you can pick
`!get_classes` - list your classes
`!sync_classes` - refresh your class list
`!get_class_grade <class name>` - current grade for one class
`!get_gpa` - GPA across your classes
`!upcoming` - assignments due soon
`!recent_grades` - recently graded work
`!help` - this message";

/// Runs one command on behalf of `invoker` and returns the reply.
pub async fn execute(state: &RelayState, invoker: &str, command: Command) -> String {
    info!(invoker, command = ?command, "Executing command");

    match command {
        Command::SetPreferences(tags) => match state.preferences.set(invoker, &tags) {
            Some(updated) => with_ignored(format!("Preferences updated: {}", describe(&updated)), &tags),
            None => format!("Invalid preferences! Choose from: {}", available_categories()),
        },
        Command::AddPreferences(tags) => {
            let updated = state.preferences.add(invoker, &tags);
            with_ignored(format!("Preferences updated: {}", describe(&updated)), &tags)
        }
        Command::RemovePreferences(tags) => {
            let updated = state.preferences.remove(invoker, &tags);
            with_ignored(format!("Preferences updated: {}", describe(&updated)), &tags)
        }
        Command::ViewPreferences => preferences_reply(state, invoker),
        Command::AvailablePreferences => {
            format!("Available preferences to set: {}", available_categories())
        }
        Command::GetClasses => classes_reply(state),
        Command::SyncClasses => sync_reply(state).await,
        Command::GetClassGrade(None) => "Please provide a class name".to_string(),
        Command::GetClassGrade(Some(name)) => class_grade_reply(state, &name).await,
        Command::GetGpa => gpa_reply(state).await,
        Command::Upcoming => upcoming_reply(state).await,
        Command::RecentGrades => recent_grades_reply(state).await,
        Command::Help => HELP_TEXT.to_string(),
        Command::Unknown(name) => {
            format!("Unknown command `!{}`. Type `!help` for a list of commands.", name)
        }
    }
}

fn available_categories() -> String {
    Category::ALL.iter().map(Category::as_str).collect::<Vec<_>>().join(", ")
}

fn with_ignored(reply: String, tags: &[String]) -> String {
    let (_, rejected) = normalize_tags(tags);
    if rejected.is_empty() {
        reply
    } else {
        format!("{}\nIgnored unknown preferences: {}", reply, rejected.join(", "))
    }
}

pub fn preferences_reply(state: &RelayState, recipient: &str) -> String {
    format!("Current preferences: {}", describe(&state.preferences.get(recipient)))
}

pub fn classes_reply(state: &RelayState) -> String {
    if !state.directory.is_synced() {
        return "No classes cached yet. Run `!sync_classes` first.".to_string();
    }
    let names = state.directory.list_names();
    if names.is_empty() {
        return "No classes found.".to_string();
    }
    let lines: Vec<_> = names.iter().map(|name| format!("- {}", name)).collect();
    format!("Your current classes are:\n{}", lines.join("\n"))
}

pub async fn sync_reply(state: &RelayState) -> String {
    match state.directory.sync().await {
        Ok(count) => format!("Synced {} classes.", count),
        Err(e) => format!("Failed to sync classes: {}", e),
    }
}

pub async fn class_grade_reply(state: &RelayState, name: &str) -> String {
    let Some(course_id) = state.directory.id_for_name(name) else {
        return format!("Class `{}` not found. Use `!get_classes` to see your classes.", name.trim());
    };
    let display = state
        .directory
        .name_for(course_id)
        .unwrap_or_else(|| name.trim().to_string());

    match current_grade(state.source.as_ref(), course_id).await {
        Ok(Some(grade)) => format!(
            "Your current grade for {} is: {}% ({})",
            display,
            round2(grade.percent),
            grade.letter
        ),
        Ok(None) => format!("No grade data available for {}.", display),
        Err(e) => {
            warn!(course_id, error = %e, "Failed to fetch class grade");
            format!("Could not fetch the grade for {}. Try again later.", display)
        }
    }
}

pub async fn gpa_reply(state: &RelayState) -> String {
    let course_ids = state.directory.list_ids();
    match calculate_gpa(state.source.as_ref(), &course_ids).await {
        Some(summary) => format!(
            "Your current GPA is: {:.2} (average {:.2}% across {} classes)",
            summary.gpa, summary.average_percent, summary.courses_counted
        ),
        None => "No grades found to calculate a GPA.".to_string(),
    }
}

pub async fn upcoming_reply(state: &RelayState) -> String {
    let course_ids = state.directory.list_ids();
    let mut upcoming = state.assignments.upcoming(&course_ids, state.due_horizon).await;
    if upcoming.is_empty() {
        return format!(
            "No assignments due in the next {} days.",
            state.due_horizon.num_days()
        );
    }
    sort_by_due(&mut upcoming);

    let entries: Vec<_> = upcoming
        .iter()
        .map(|a| {
            let course = state
                .directory
                .name_for(a.course_id)
                .unwrap_or_else(|| a.course_id.to_string());
            a.render(&course)
        })
        .collect();
    format!("Upcoming assignments:\n\n{}", entries.join("\n\n"))
}

pub async fn recent_grades_reply(state: &RelayState) -> String {
    let courses = state.directory.courses();
    let recent = recent_grades(
        state.source.as_ref(),
        &courses,
        state.clock.now(),
        state.recent_horizon,
    )
    .await;
    if recent.is_empty() {
        return format!(
            "No grades posted in the last {} days.",
            state.recent_horizon.num_days()
        );
    }

    let lines: Vec<_> = recent
        .iter()
        .map(|g| format!("- **{}** {}: {}", g.course_name, g.assignment_name, g.describe()))
        .collect();
    format!("Recent grades:\n{}", lines.join("\n"))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
