//! Resolving the error and stack frames to report for a log entry.
//!
//! The classifier looks at the entry's [`"error"`](crate::fields::ERROR_KEY)
//! field and decides, in order:
//!
//! 1. The field holds an already [attributed](LoggedError::Attributed) error:
//!    it is reported as is, with its original frames, and the log message is
//!    attached as context. Nothing is captured.
//! 2. The field holds a [plain](LoggedError::Plain) error: frames are captured
//!    now and paired with that same error; the message is attached as context.
//! 3. There is no usable error: an error is synthesized from the message text
//!    and paired with freshly captured frames. No context is attached.
//!
//! An error attributed close to where it happened keeps the frames of the
//! failure site even after it has travelled through several layers; in the
//! other two cases the logging call site is the best location available.

use std::sync::Arc;

use crate::{
    entry::LogEntry,
    error::{LoggedError, MessageError, ReportableError},
    fields::ERROR_KEY,
    stack::{StackCapture, StackProvider},
};

/// Which kind of error evidence an entry carried.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Evidence {
    /// The entry carried an error with frames.
    Attributed,
    /// The entry carried an error without frames.
    Plain,
    /// The entry carried no usable error; one was built from the message.
    MessageOnly,
}

/// The outcome of classifying one entry.
#[derive(Clone, Debug)]
pub struct Classified {
    /// The error to report, always with frames attached.
    pub error: ReportableError,
    /// Context string to attach to the report, if any.
    pub context: Option<String>,
    /// How the error was obtained.
    pub evidence: Evidence,
}

/// Turns log entries into [`ReportableError`]s.
#[derive(Clone, Debug)]
pub struct ErrorClassifier<P> {
    provider: P,
    capture: StackCapture,
}

impl<P: StackProvider> ErrorClassifier<P> {
    /// Creates a classifier capturing with [`StackCapture::DEFAULT`].
    pub fn new(provider: P) -> Self {
        Self::with_capture(provider, StackCapture::DEFAULT)
    }

    /// Creates a classifier with custom capture parameters.
    pub fn with_capture(provider: P, capture: StackCapture) -> Self {
        Self { provider, capture }
    }

    /// The stack provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The capture parameters.
    pub fn capture(&self) -> StackCapture {
        self.capture
    }

    /// Consumes the classifier, returning its stack provider.
    pub fn into_provider(self) -> P {
        self.provider
    }

    /// Resolves the error, frames and context to report for `entry`.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline::{
    ///     Level, LogEntry, StackFrame,
    ///     classify::{ErrorClassifier, Evidence},
    /// };
    ///
    /// let classifier =
    ///     ErrorClassifier::new(|_: usize, _: &str| vec![StackFrame::new("src/lib.rs", 1, "app::run")]);
    ///
    /// let classified = classifier.classify(&LogEntry::new(Level::Error, "queue stalled"));
    /// assert_eq!(classified.evidence, Evidence::MessageOnly);
    /// assert_eq!(classified.error.to_string(), "queue stalled");
    /// assert_eq!(classified.context, None);
    /// ```
    pub fn classify(&self, entry: &LogEntry) -> Classified {
        match entry.fields.get(ERROR_KEY).and_then(|value| value.as_error()) {
            Some(LoggedError::Attributed(attributed)) => Classified {
                error: attributed.clone(),
                context: Some(entry.message.clone()),
                evidence: Evidence::Attributed,
            },
            Some(LoggedError::Plain(error)) => Classified {
                error: ReportableError::from_shared(
                    Arc::clone(error),
                    self.capture.capture(&self.provider),
                ),
                context: Some(entry.message.clone()),
                evidence: Evidence::Plain,
            },
            None => Classified {
                error: ReportableError::new(
                    MessageError::new(entry.message.clone()),
                    self.capture.capture(&self.provider),
                ),
                context: None,
                evidence: Evidence::MessageOnly,
            },
        }
    }
}
