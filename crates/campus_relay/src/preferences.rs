//! Per-recipient notification subscriptions.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Kinds of notification a recipient can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Grades,
    Announcements,
    Messages,
    Files,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Grades,
        Category::Announcements,
        Category::Messages,
        Category::Files,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Grades => "grades",
            Category::Announcements => "announcements",
            Category::Messages => "messages",
            Category::Files => "files",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grades" => Ok(Category::Grades),
            "announcements" => Ok(Category::Announcements),
            "messages" => Ok(Category::Messages),
            "files" => Ok(Category::Files),
            other => Err(other.to_string()),
        }
    }
}

/// Splits raw tags into recognized categories and the rejected remainder.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> (BTreeSet<Category>, Vec<String>) {
    let mut valid = BTreeSet::new();
    let mut rejected = Vec::new();
    for tag in tags {
        match tag.as_ref().parse::<Category>() {
            Ok(category) => {
                valid.insert(category);
            }
            Err(other) => rejected.push(other),
        }
    }
    (valid, rejected)
}

/// Comma separated list in canonical order, or `None set`.
pub fn describe(categories: &BTreeSet<Category>) -> String {
    if categories.is_empty() {
        return "None set".to_string();
    }
    categories.iter().map(Category::as_str).collect::<Vec<_>>().join(", ")
}

/// Mapping from recipient id to subscribed categories.
///
/// Every read-modify-write runs under the map's per-key entry lock, so
/// concurrent updates for the same recipient never lose writes.
#[derive(Default)]
pub struct PreferenceStore {
    entries: DashMap<String, BTreeSet<Category>>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to every recognized tag; unknown tags are dropped.
    pub fn add<S: AsRef<str>>(&self, recipient: &str, tags: &[S]) -> BTreeSet<Category> {
        let (valid, _) = normalize_tags(tags);
        let mut entry = self.entries.entry(recipient.to_string()).or_default();
        entry.extend(valid);
        entry.value().clone()
    }

    /// Unsubscribes from every recognized tag; unknown or absent tags are no-ops.
    pub fn remove<S: AsRef<str>>(&self, recipient: &str, tags: &[S]) -> BTreeSet<Category> {
        let (valid, _) = normalize_tags(tags);
        match self.entries.get_mut(recipient) {
            Some(mut entry) => {
                entry.retain(|c| !valid.contains(c));
                entry.value().clone()
            }
            None => BTreeSet::new(),
        }
    }

    /// Replaces the whole set with the recognized tags.
    ///
    /// Returns `None`, leaving the stored set untouched, when no tag is recognized.
    pub fn set<S: AsRef<str>>(&self, recipient: &str, tags: &[S]) -> Option<BTreeSet<Category>> {
        let (valid, _) = normalize_tags(tags);
        if valid.is_empty() {
            return None;
        }
        self.entries.insert(recipient.to_string(), valid.clone());
        Some(valid)
    }

    /// Subscribed categories; empty if the recipient never subscribed.
    pub fn get(&self, recipient: &str) -> BTreeSet<Category> {
        self.entries
            .get(recipient)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, recipient: &str, category: Category) -> bool {
        self.entries
            .get(recipient)
            .is_some_and(|entry| entry.contains(&category))
    }

    /// Number of recipients with a stored record.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
