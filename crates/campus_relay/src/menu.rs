//! Interactive menu as a plain request/response state machine.
//!
//! A chat front-end sends one [`MenuAction`] per click together with its own
//! session identifier; the relay keeps the current screen per session and
//! answers with a [`MenuReply`] describing what to render next.

use crate::commands::{
    class_grade_reply, classes_reply, gpa_reply, preferences_reply, recent_grades_reply,
    upcoming_reply,
};
use crate::preferences::{describe, Category};
use crate::types::RelayState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

const SESSION_IDLE_TTL: Duration = Duration::from_secs(15 * 60);

/// Hashed chat-side session identifier. Raw ids are never stored or logged.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn from_session_id(raw: &str) -> Self {
        let digest = Sha256::digest(raw.as_bytes());
        Self(hex::encode(&digest[..16]))
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...", &self.0[..8.min(self.0.len())])
    }
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Main,
    Grades,
    Preferences,
    Classes,
}

impl Screen {
    fn title(&self) -> &'static str {
        match self {
            Screen::Main => "Main Menu",
            Screen::Grades => "Grade Options",
            Screen::Preferences => "Notification Preferences",
            Screen::Classes => "Class Options",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Screen::Main => "Choose a category.",
            Screen::Grades => "Select a class to see your grade, calculate your GPA or check recent grades.",
            Screen::Preferences => "View your preferences or subscribe to a category.",
            Screen::Classes => "View your current classes or upcoming assignments.",
        }
    }

    /// Action names offered on this screen.
    fn options(&self) -> Vec<String> {
        let names: &[&str] = match self {
            Screen::Main => &["grades", "preferences", "classes"],
            Screen::Grades => &["select_class", "gpa", "recent_grades", "back"],
            Screen::Preferences => &["view_preferences", "subscribe", "unsubscribe", "back"],
            Screen::Classes => &["view_classes", "view_assignments", "back"],
        };
        names.iter().map(|name| name.to_string()).collect()
    }
}

/// One click, as sent by the chat front-end.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MenuAction {
    Open,
    Grades,
    Preferences,
    Classes,
    Back,
    SelectClass { name: String },
    Gpa,
    RecentGrades,
    ViewPreferences,
    Subscribe { category: String },
    Unsubscribe { category: String },
    ViewClasses,
    ViewAssignments,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuReply {
    pub screen: Screen,
    pub title: String,
    pub body: String,
    pub options: Vec<String>,
}

impl MenuReply {
    fn screen(screen: Screen) -> Self {
        Self::with_body(screen, screen.description().to_string())
    }

    fn with_body(screen: Screen, body: String) -> Self {
        Self {
            screen,
            title: screen.title().to_string(),
            body,
            options: screen.options(),
        }
    }
}

#[derive(Debug, Clone)]
struct MenuSession {
    recipient: String,
    screen: Screen,
    touched_at: Instant,
}

/// Open menu sessions, dropped after sitting idle.
pub struct MenuSessions {
    sessions: DashMap<SessionKey, MenuSession>,
    idle_ttl: Duration,
}

impl MenuSessions {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
        }
    }

    fn prune_expired(&self) {
        self.sessions
            .retain(|_, session| session.touched_at.elapsed() < self.idle_ttl);
    }

    /// Current screen of a live session.
    fn screen(&self, key: &SessionKey) -> Option<(Screen, String)> {
        self.sessions
            .get(key)
            .map(|session| (session.screen, session.recipient.clone()))
    }

    fn store(&self, key: SessionKey, recipient: &str, screen: Screen) {
        self.sessions.insert(
            key,
            MenuSession {
                recipient: recipient.to_string(),
                screen,
                touched_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for MenuSessions {
    fn default() -> Self {
        Self::new(SESSION_IDLE_TTL)
    }
}

/// Applies one action to the session and returns what to show next.
///
/// An unknown or expired session starts on the main screen. An action not
/// offered on the current screen leaves the screen unchanged.
pub async fn handle(state: &RelayState, session_id: &str, recipient: &str, action: MenuAction) -> MenuReply {
    let sessions = &state.menus;
    sessions.prune_expired();

    let key = SessionKey::from_session_id(session_id);
    let (screen, owner) = match (&action, sessions.screen(&key)) {
        (MenuAction::Open, _) | (_, None) => (Screen::Main, recipient.to_string()),
        (_, Some(current)) => current,
    };
    debug!(session = %key, screen = ?screen, action = ?action, "Menu action");

    let reply = match (screen, action) {
        (_, MenuAction::Open) => MenuReply::screen(Screen::Main),

        (Screen::Main, MenuAction::Grades) => MenuReply::screen(Screen::Grades),
        (Screen::Main, MenuAction::Preferences) => MenuReply::screen(Screen::Preferences),
        (Screen::Main, MenuAction::Classes) => MenuReply::screen(Screen::Classes),

        (Screen::Grades, MenuAction::SelectClass { name }) => {
            MenuReply::with_body(Screen::Grades, class_grade_reply(state, &name).await)
        }
        (Screen::Grades, MenuAction::Gpa) => MenuReply::with_body(Screen::Grades, gpa_reply(state).await),
        (Screen::Grades, MenuAction::RecentGrades) => {
            MenuReply::with_body(Screen::Grades, recent_grades_reply(state).await)
        }

        (Screen::Preferences, MenuAction::ViewPreferences) => {
            MenuReply::with_body(Screen::Preferences, preferences_reply(state, &owner))
        }
        (Screen::Preferences, MenuAction::Subscribe { category }) => {
            MenuReply::with_body(Screen::Preferences, update_preferences(state, &owner, &category, true))
        }
        (Screen::Preferences, MenuAction::Unsubscribe { category }) => {
            MenuReply::with_body(Screen::Preferences, update_preferences(state, &owner, &category, false))
        }

        (Screen::Classes, MenuAction::ViewClasses) => MenuReply::with_body(Screen::Classes, classes_reply(state)),
        (Screen::Classes, MenuAction::ViewAssignments) => {
            MenuReply::with_body(Screen::Classes, upcoming_reply(state).await)
        }

        (Screen::Grades | Screen::Preferences | Screen::Classes, MenuAction::Back) => {
            MenuReply::screen(Screen::Main)
        }

        (screen, _) => MenuReply::with_body(screen, "That option is not available here.".to_string()),
    };

    sessions.store(key, &owner, reply.screen);
    reply
}

fn update_preferences(state: &RelayState, recipient: &str, category: &str, subscribe: bool) -> String {
    if category.parse::<Category>().is_err() {
        return format!("Unknown preference `{}`.", category);
    }
    let updated = if subscribe {
        state.preferences.add(recipient, &[category])
    } else {
        state.preferences.remove(recipient, &[category])
    };
    format!("Preferences updated: {}", describe(&updated))
}
