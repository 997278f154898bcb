//! Log entries as seen by the hook.
//!
//! A [`LogEntry`] is the logging pipeline's view of one record: a [`Level`], a
//! message and a bag of [`Fields`]. The pipeline adapter (for example
//! `faultline-tracing`) builds one entry per matching event and hands it to
//! [`Hook::fire`](crate::Hook::fire) by reference; the hook never mutates it.

use core::{fmt, str::FromStr};

use crate::{
    error::LoggedError,
    fields::{ERROR_KEY, FieldValue, Fields},
};

/// Severity level of a log entry, ordered from least to most severe.
///
/// ```
/// use faultline::Level;
///
/// assert!(Level::Warn < Level::Error);
/// assert!(Level::Panic > Level::Fatal);
/// assert_eq!("fatal".parse::<Level>(), Ok(Level::Fatal));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Finest-grained diagnostics.
    Trace,
    /// Debugging information.
    Debug,
    /// Informational messages.
    Info,
    /// Something unexpected that the program recovered from.
    Warn,
    /// An operation failed.
    Error,
    /// The process is about to exit.
    Fatal,
    /// The process is about to unwind.
    Panic,
}

impl Level {
    /// All levels, from least to most severe.
    pub const ALL: [Level; 7] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Panic,
    ];

    /// The lowercase name of the level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Panic => "panic",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown level name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level `{}`", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .or_else(|| s.eq_ignore_ascii_case("warning").then_some(Level::Warn))
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

/// One structured log record.
///
/// # Examples
///
/// ```
/// use faultline::{Level, LogEntry};
///
/// let entry = LogEntry::new(Level::Warn, "quota almost exhausted")
///     .with_field("@user.name", "Max")
///     .with_field("remaining", 3_u64);
///
/// assert_eq!(entry.fields.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct LogEntry {
    /// The entry's level.
    pub level: Level,
    /// The formatted log message.
    pub message: String,
    /// Structured fields attached to the entry.
    pub fields: Fields,
}

impl LogEntry {
    /// Creates an entry with an empty field bag.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: Fields::default(),
        }
    }

    /// Adds a field, replacing any previous value under the same key.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Stores an error under the reserved `"error"` key.
    #[must_use]
    pub fn with_error(self, error: impl Into<LoggedError>) -> Self {
        self.with_field(ERROR_KEY, FieldValue::Error(error.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order_matches_severity() {
        let mut sorted = Level::ALL;
        sorted.sort();
        assert_eq!(sorted, Level::ALL);
        assert!(Level::Trace < Level::Panic);
    }

    #[test]
    fn test_level_parse() {
        for level in Level::ALL {
            assert_eq!(level.as_str().parse::<Level>(), Ok(level));
            assert_eq!(level.as_str().to_uppercase().parse::<Level>(), Ok(level));
        }
        assert_eq!("warning".parse::<Level>(), Ok(Level::Warn));
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_with_field_replaces() {
        let entry = LogEntry::new(Level::Info, "m")
            .with_field("k", "a")
            .with_field("k", "b");
        assert_eq!(entry.fields.len(), 1);
        assert_eq!(entry.fields.get("k"), Some(&FieldValue::from("b")));
    }

    #[test]
    fn test_level_send_sync_copy() {
        static_assertions::assert_impl_all!(Level: Send, Sync, Copy);
        static_assertions::assert_impl_all!(LogEntry: Send, Sync, Clone);
    }
}
