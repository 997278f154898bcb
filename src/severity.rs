//! Mapping from log levels to report severities.

use core::fmt;

use crate::entry::Level;

/// Severity of a report, as understood by the notifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "lowercase"))]
pub enum Severity {
    /// Informational report.
    Info,
    /// Something went wrong but was handled.
    Warning,
    /// An unhandled failure.
    Error,
}

impl Severity {
    /// The lowercase name of the severity.
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a log level to the report severity and whether delivery must block.
///
/// Fatal and panic entries usually precede process termination, so their
/// delivery has to complete before the logging call returns.
///
/// | level | severity | must block |
/// |---|---|---|
/// | trace, debug, info | info | no |
/// | warn | warning | no |
/// | error | error | no |
/// | fatal, panic | error | yes |
///
/// ```
/// use faultline::{Level, Severity, severity::map_level};
///
/// assert_eq!(map_level(Level::Warn), (Severity::Warning, false));
/// assert_eq!(map_level(Level::Fatal), (Severity::Error, true));
/// ```
pub const fn map_level(level: Level) -> (Severity, bool) {
    match level {
        Level::Trace | Level::Debug | Level::Info => (Severity::Info, false),
        Level::Warn => (Severity::Warning, false),
        Level::Error => (Severity::Error, false),
        Level::Fatal | Level::Panic => (Severity::Error, true),
    }
}
