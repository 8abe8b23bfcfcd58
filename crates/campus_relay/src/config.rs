//! Process configuration, read from the environment.

use crate::temporal::parse_utc;
use chrono::TimeDelta;
use chrono_tz::Tz;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEZONE: &str = "America/Denver";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DUE_HORIZON_DAYS: i64 = 7;
const DEFAULT_RECENT_GRADE_DAYS: i64 = 3;
const DEFAULT_GRADED_SINCE: &str = "2023-01-01T00:00:00Z";
const DEFAULT_COURSE_CACHE_PATH: &str = "./course_cache.db";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required setting {key}")]
    Missing { key: &'static str },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Clone)]
pub struct RelayConfig {
    pub canvas_api_url: String,
    pub canvas_api_token: String,
    pub sink_url: String,
    pub sink_token: Option<String>,
    pub broadcast_channels: Vec<String>,
    pub timezone: Tz,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub due_horizon: TimeDelta,
    pub recent_grade_horizon: TimeDelta,
    pub graded_since: String,
    /// `None` keeps seen ids forever
    pub seen_retention: Option<TimeDelta>,
    pub course_cache_path: PathBuf,
    pub bind_address: SocketAddr,
}

impl RelayConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing { key });

        let timezone = parse_value::<Tz>("USER_TIMEZONE", get("USER_TIMEZONE"), DEFAULT_TIMEZONE)?;

        let poll_secs = parse_value::<u64>(
            "POLL_INTERVAL_SECS",
            get("POLL_INTERVAL_SECS"),
            &DEFAULT_POLL_INTERVAL_SECS.to_string(),
        )?;
        if poll_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_SECS",
                message: "must be greater than zero".to_string(),
            });
        }

        let timeout_secs = parse_value::<u64>(
            "REQUEST_TIMEOUT_SECS",
            get("REQUEST_TIMEOUT_SECS"),
            &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
        )?;
        let due_horizon = parse_window(
            "DUE_HORIZON_DAYS",
            get("DUE_HORIZON_DAYS"),
            DEFAULT_DUE_HORIZON_DAYS,
            TimeDelta::try_days,
        )?;
        let recent_grade_horizon = parse_window(
            "RECENT_GRADE_DAYS",
            get("RECENT_GRADE_DAYS"),
            DEFAULT_RECENT_GRADE_DAYS,
            TimeDelta::try_days,
        )?;

        let graded_since = get("GRADED_SINCE").unwrap_or_else(|| DEFAULT_GRADED_SINCE.to_string());
        parse_utc(&graded_since).map_err(|e| ConfigError::Invalid {
            key: "GRADED_SINCE",
            message: e.to_string(),
        })?;

        let seen_retention = match get("SEEN_RETENTION_HOURS") {
            Some(raw) => Some(parse_window(
                "SEEN_RETENTION_HOURS",
                Some(raw),
                0,
                TimeDelta::try_hours,
            )?),
            None => None,
        };

        let broadcast_channels = get("BROADCAST_CHANNELS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            canvas_api_url: required("CANVAS_API_URL")?,
            canvas_api_token: required("CANVAS_API_TOKEN")?,
            sink_url: required("SINK_URL")?,
            sink_token: get("SINK_TOKEN"),
            broadcast_channels,
            timezone,
            poll_interval: Duration::from_secs(poll_secs),
            request_timeout: Duration::from_secs(timeout_secs),
            due_horizon,
            recent_grade_horizon,
            graded_since,
            seen_retention,
            course_cache_path: PathBuf::from(
                get("COURSE_CACHE_PATH").unwrap_or_else(|| DEFAULT_COURSE_CACHE_PATH.to_string()),
            ),
            bind_address: parse_value("BIND_ADDRESS", get("BIND_ADDRESS"), DEFAULT_BIND_ADDRESS)?,
        })
    }
}

fn parse_value<T>(key: &'static str, raw: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = raw.unwrap_or_else(|| default.to_string());
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("{:?}: {}", raw, e),
    })
}

/// Positive whole number of units turned into a `TimeDelta`.
fn parse_window(
    key: &'static str,
    raw: Option<String>,
    default: i64,
    to_delta: fn(i64) -> Option<TimeDelta>,
) -> Result<TimeDelta, ConfigError> {
    let amount = parse_value::<i64>(key, raw, &default.to_string())?;
    if amount <= 0 {
        return Err(ConfigError::Invalid {
            key,
            message: format!("{} must be greater than zero", amount),
        });
    }
    to_delta(amount).ok_or_else(|| ConfigError::Invalid {
        key,
        message: format!("{} is out of range", amount),
    })
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("canvas_api_url", &self.canvas_api_url)
            .field("canvas_api_token", &"<redacted>")
            .field("sink_url", &self.sink_url)
            .field("sink_token", &self.sink_token.as_ref().map(|_| "<redacted>"))
            .field("broadcast_channels", &self.broadcast_channels)
            .field("timezone", &self.timezone)
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout", &self.request_timeout)
            .field("due_horizon", &self.due_horizon)
            .field("recent_grade_horizon", &self.recent_grade_horizon)
            .field("graded_since", &self.graded_since)
            .field("seen_retention", &self.seen_retention)
            .field("course_cache_path", &self.course_cache_path)
            .field("bind_address", &self.bind_address)
            .finish()
    }
}
