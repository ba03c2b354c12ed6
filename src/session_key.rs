//! Game session keys.
//!
//! The game client names every session `level_<level>_<day>_<month>_<year>_<hour>_<minute>`,
//! optionally followed by `_am` or `_pm`. The key is the only place the session's date is
//! stored, so it is parsed positionally.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;
use thiserror::Error;

const PREFIX: &str = "level";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionKeyError {
    #[error("session key '{0}' does not start with 'level_'")]
    MissingPrefix(String),

    #[error("session key '{key}' has {found} parts, expected 7 or 8")]
    WrongPartCount { key: String, found: usize },

    #[error("session key '{key}' has a non-numeric {field}: '{value}'")]
    NotANumber {
        key: String,
        field: &'static str,
        value: String,
    },

    #[error("session key '{0}' does not encode a valid date and time")]
    InvalidDateTime(String),

    #[error("session key '{key}' has an unknown meridiem suffix '{suffix}'")]
    UnknownMeridiem { key: String, suffix: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionKey {
    pub level: u32,
    pub played_at: NaiveDateTime,
}

impl SessionKey {
    pub fn parse(key: &str) -> Result<Self, SessionKeyError> {
        let parts: Vec<&str> = key.split('_').collect();

        if parts.first() != Some(&PREFIX) {
            return Err(SessionKeyError::MissingPrefix(key.to_string()));
        }
        if parts.len() != 7 && parts.len() != 8 {
            return Err(SessionKeyError::WrongPartCount {
                key: key.to_string(),
                found: parts.len(),
            });
        }

        let number = |index: usize, field: &'static str| -> Result<u32, SessionKeyError> {
            parts[index]
                .parse::<u32>()
                .map_err(|_| SessionKeyError::NotANumber {
                    key: key.to_string(),
                    field,
                    value: parts[index].to_string(),
                })
        };

        let level = number(1, "level")?;
        let day = number(2, "day")?;
        let month = number(3, "month")?;
        let year = number(4, "year")?;
        let mut hour = number(5, "hour")?;
        let minute = number(6, "minute")?;

        if let Some(suffix) = parts.get(7) {
            if hour == 0 || hour > 12 {
                return Err(SessionKeyError::InvalidDateTime(key.to_string()));
            }
            match suffix.to_ascii_lowercase().as_str() {
                "am" => hour %= 12,
                "pm" => hour = hour % 12 + 12,
                _ => {
                    return Err(SessionKeyError::UnknownMeridiem {
                        key: key.to_string(),
                        suffix: suffix.to_string(),
                    });
                }
            }
        }

        let played_at = i32::try_from(year)
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .ok_or_else(|| SessionKeyError::InvalidDateTime(key.to_string()))?;

        Ok(SessionKey { level, played_at })
    }

    /// Builds the 24-hour form of a key.
    pub fn new(level: u32, played_at: NaiveDateTime) -> Self {
        SessionKey { level, played_at }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}_{}_{}",
            PREFIX,
            self.level,
            self.played_at.day(),
            self.played_at.month(),
            self.played_at.year(),
            self.played_at.hour(),
            self.played_at.minute()
        )
    }
}

/// Extracts the level number from a level id such as `level_3` or `3`.
pub fn level_number(level_id: &str) -> Option<u32> {
    level_id
        .strip_prefix("level_")
        .unwrap_or(level_id)
        .parse()
        .ok()
}
