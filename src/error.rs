//! The error model handed to the notifier.
//!
//! Errors reach the hook in one of two states, modelled explicitly by
//! [`LoggedError`]:
//!
//! - [`LoggedError::Plain`]: any error value with no stack information.
//! - [`LoggedError::Attributed`]: a [`ReportableError`], i.e. an error that
//!   was paired with stack frames somewhere closer to where it happened.
//!
//! Whatever the input, the classifier always produces a [`ReportableError`]
//! for the notifier, so a report never goes out with "frames unknown".
//!
//! [`ReportableError`] implements [`std::error::Error`], so it can be returned
//! through `?` and logged through `tracing`'s `&dyn Error` field values; the
//! `faultline-tracing` layer recognises it again by downcasting.

use std::{error::Error, fmt, sync::Arc};

/// A shared, thread-safe error value.
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// A boxed, thread-safe error value.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// One location in an attributed call path.
///
/// Frames are ordered from the innermost call (where the frames were captured)
/// outwards. They are opaque to this crate and forwarded to the notifier as
/// they are.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StackFrame {
    /// Source file of the frame.
    pub file: String,
    /// Line number in [`file`](Self::file), `0` when unknown.
    pub line: u32,
    /// Demangled function path, without the symbol hash.
    pub method: String,
    /// Name of the crate the frame belongs to, when it could be determined.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub package: Option<String>,
}

impl StackFrame {
    /// Creates a frame without package information.
    pub fn new(file: impl Into<String>, line: u32, method: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            method: method.into(),
            package: None,
        }
    }

    /// Sets the crate the frame belongs to.
    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Returns true if the frame belongs to the crate family rooted at
    /// `package_root`: the crate itself, or any crate named
    /// `{package_root}-*` / `{package_root}_*`.
    pub fn belongs_to(&self, package_root: &str) -> bool {
        self.package
            .as_deref()
            .is_some_and(|package| is_in_package(package, package_root))
    }
}

/// Returns true if `crate_name` is `package_root` or one of its companion
/// crates (`{package_root}-*` or `{package_root}_*`).
///
/// ```
/// use faultline::error::is_in_package;
///
/// assert!(is_in_package("faultline", "faultline"));
/// assert!(is_in_package("faultline_tracing", "faultline"));
/// assert!(is_in_package("faultline-backtrace", "faultline"));
/// assert!(!is_in_package("faultlines", "faultline"));
/// ```
pub fn is_in_package(crate_name: &str, package_root: &str) -> bool {
    if package_root.is_empty() {
        return false;
    }
    let normalized_root = package_root.replace('-', "_");
    let normalized_name = crate_name.replace('-', "_");
    normalized_name
        .strip_prefix(&normalized_root)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
}

/// An error paired with the stack frames it was attributed to.
///
/// Cloning is cheap: both the error and the frames are reference counted, and
/// clones share them.
///
/// `Display` and [`Error::source`] delegate to the wrapped error, so wrapping
/// does not change how the error reads.
///
/// # Examples
///
/// ```
/// use std::io;
///
/// use faultline::{ReportableError, StackFrame};
///
/// let frames = vec![StackFrame::new("src/db.rs", 42, "app::db::connect")];
/// let error = ReportableError::new(io::Error::other("disk full"), frames);
///
/// assert_eq!(error.to_string(), "disk full");
/// assert_eq!(error.frames()[0].line, 42);
/// ```
#[derive(Clone)]
pub struct ReportableError {
    error: SharedError,
    frames: Arc<[StackFrame]>,
}

impl ReportableError {
    /// Wraps an error together with its frames.
    pub fn new<E>(error: E, frames: Vec<StackFrame>) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::from_shared(Arc::new(error), frames)
    }

    /// Pairs an already shared error with frames, keeping the same allocation.
    pub fn from_shared(error: SharedError, frames: Vec<StackFrame>) -> Self {
        Self {
            error,
            frames: frames.into(),
        }
    }

    /// The wrapped error.
    pub fn error(&self) -> &SharedError {
        &self.error
    }

    /// The frames the error was attributed to, innermost first.
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// The frames as a shared slice.
    pub fn shared_frames(&self) -> &Arc<[StackFrame]> {
        &self.frames
    }

    /// Splits into the wrapped error and its frames.
    pub fn into_parts(self) -> (SharedError, Arc<[StackFrame]>) {
        (self.error, self.frames)
    }
}

impl fmt::Display for ReportableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl fmt::Debug for ReportableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportableError")
            .field("error", &self.error)
            .field("frames", &self.frames.len())
            .finish()
    }
}

impl Error for ReportableError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.error.source()
    }
}

/// An error value found in a log entry's field bag.
#[derive(Clone, Debug)]
pub enum LoggedError {
    /// An error without stack information.
    Plain(SharedError),
    /// An error that already carries its frames.
    Attributed(ReportableError),
}

impl LoggedError {
    /// Wraps any error as a [`LoggedError::Plain`].
    pub fn plain<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        LoggedError::Plain(Arc::new(error))
    }

    /// The underlying error, whichever variant this is.
    pub fn error(&self) -> &SharedError {
        match self {
            LoggedError::Plain(error) => error,
            LoggedError::Attributed(attributed) => attributed.error(),
        }
    }

    /// The attributed frames, if there are any.
    pub fn frames(&self) -> Option<&[StackFrame]> {
        match self {
            LoggedError::Plain(_) => None,
            LoggedError::Attributed(attributed) => Some(attributed.frames()),
        }
    }
}

impl fmt::Display for LoggedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.error(), f)
    }
}

impl PartialEq for LoggedError {
    /// Two logged errors are equal when they share the same error allocation
    /// and the same frames.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LoggedError::Plain(a), LoggedError::Plain(b)) => Arc::ptr_eq(a, b),
            (LoggedError::Attributed(a), LoggedError::Attributed(b)) => {
                Arc::ptr_eq(&a.error, &b.error) && a.frames == b.frames
            }
            _ => false,
        }
    }
}

impl From<ReportableError> for LoggedError {
    fn from(error: ReportableError) -> Self {
        LoggedError::Attributed(error)
    }
}

impl From<SharedError> for LoggedError {
    fn from(error: SharedError) -> Self {
        match error.downcast_ref::<ReportableError>() {
            Some(attributed) => LoggedError::Attributed(attributed.clone()),
            None => LoggedError::Plain(error),
        }
    }
}

impl From<BoxError> for LoggedError {
    fn from(error: BoxError) -> Self {
        match error.downcast::<ReportableError>() {
            Ok(attributed) => LoggedError::Attributed(*attributed),
            Err(error) => LoggedError::Plain(Arc::from(error)),
        }
    }
}

/// An error synthesized from a log message when an entry carries no error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageError(String);

impl MessageError {
    /// Creates an error whose description is exactly `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The message text.
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for MessageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer(#[source] std::io::Error);

    fn frames() -> Vec<StackFrame> {
        vec![
            StackFrame::new("src/store.rs", 10, "app::store::write").with_package("app"),
            StackFrame::new("src/main.rs", 3, "app::main").with_package("app"),
        ]
    }

    #[test]
    fn test_reportable_error_delegates_display_and_source() {
        let error = ReportableError::new(Outer(std::io::Error::other("inner")), frames());
        assert_eq!(error.to_string(), "outer failure");
        assert_eq!(error.source().map(|s| s.to_string()).as_deref(), Some("inner"));
        assert_eq!(error.frames().len(), 2);
    }

    #[test]
    fn test_from_shared_keeps_allocation() {
        let shared: SharedError = Arc::new(MessageError::new("boom"));
        let error = ReportableError::from_shared(shared.clone(), Vec::new());
        assert!(Arc::ptr_eq(error.error(), &shared));
        assert!(error.frames().is_empty());
    }

    #[test]
    fn test_logged_error_recognizes_attributed_through_shared() {
        let attributed = ReportableError::new(MessageError::new("boom"), frames());
        let shared: SharedError = Arc::new(attributed.clone());
        let logged = LoggedError::from(shared);
        assert_eq!(logged, LoggedError::Attributed(attributed));
    }

    #[test]
    fn test_logged_error_recognizes_attributed_through_box() {
        let attributed = ReportableError::new(MessageError::new("boom"), frames());
        let boxed: BoxError = Box::new(attributed.clone());
        let logged = LoggedError::from(boxed);
        assert_eq!(logged.frames(), Some(attributed.frames()));
    }

    #[test]
    fn test_plain_box_stays_plain() {
        let boxed: BoxError = Box::new(MessageError::new("plain"));
        let logged = LoggedError::from(boxed);
        assert!(matches!(logged, LoggedError::Plain(_)));
        assert_eq!(logged.to_string(), "plain");
        assert_eq!(logged.frames(), None);
    }

    #[test]
    fn test_package_membership() {
        let frame = StackFrame::new("x.rs", 1, "faultline_tracing::on_event")
            .with_package("faultline-tracing");
        assert!(frame.belongs_to("faultline"));
        assert!(!frame.belongs_to("tracing"));
        assert!(!StackFrame::new("x.rs", 1, "f").belongs_to("faultline"));
        assert!(!is_in_package("anything", ""));
    }

    #[test]
    fn test_send_sync() {
        static_assertions::assert_impl_all!(ReportableError: Send, Sync, Clone);
        static_assertions::assert_impl_all!(LoggedError: Send, Sync, Clone);
        static_assertions::assert_impl_all!(StackFrame: Send, Sync);
    }
}
