//! The interface to the remote error-reporting transport.
//!
//! This crate does not deliver anything itself. A transport implements
//! [`Notifier`] (and usually [`FromNotifierConfig`], so
//! [`Hook::new`](crate::Hook::new) can build it from resolved options).
//!
//! Reports without a context string go through [`Notifier::notify_sync`];
//! reports carrying one go through [`Notifier::notify_sync_with_context`].
//! Both return the transport's delivery error, which the dispatcher does not
//! propagate.
//!
//! # Examples
//!
//! ```
//! use std::convert::Infallible;
//!
//! use faultline::notifier::{
//!     Context, FromNotifierConfig, Notification, Notifier, NotifierConfig,
//! };
//!
//! struct StderrNotifier {
//!     release_stage: String,
//! }
//!
//! impl FromNotifierConfig for StderrNotifier {
//!     fn from_config(config: NotifierConfig) -> Self {
//!         Self {
//!             release_stage: config.release_stage,
//!         }
//!     }
//! }
//!
//! impl Notifier for StderrNotifier {
//!     type Error = Infallible;
//!
//!     fn notify_sync(&self, notification: Notification<'_>) -> Result<(), Infallible> {
//!         eprintln!("[{}] {}: {}", self.release_stage, notification.severity, notification.error);
//!         Ok(())
//!     }
//!
//!     fn notify_sync_with_context(
//!         &self,
//!         notification: Notification<'_>,
//!         context: &Context,
//!     ) -> Result<(), Infallible> {
//!         eprintln!("({context})");
//!         self.notify_sync(notification)
//!     }
//! }
//! ```

use core::fmt;
use std::sync::Arc;

use crate::{
    error::ReportableError,
    fields::{Identity, MetaData},
    severity::Severity,
};

/// Free-form context attached to a report.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
pub struct Context(pub String);

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a notifier receives for one report.
#[derive(Copy, Clone, Debug)]
pub struct Notification<'a> {
    /// The error, with its frames.
    pub error: &'a ReportableError,
    /// Whether delivery must complete before returning.
    pub sync: bool,
    /// The report severity.
    pub severity: Severity,
    /// Metadata sections.
    pub metadata: &'a MetaData,
    /// The user the report concerns.
    pub user: &'a Identity,
}

/// A transport that delivers reports.
pub trait Notifier: Send + Sync {
    /// Delivery failure reported by the transport.
    type Error: fmt::Display;

    /// Delivers a report. When `notification.sync` is true the call must not
    /// return before delivery has completed.
    fn notify_sync(&self, notification: Notification<'_>) -> Result<(), Self::Error>;

    /// Delivers a report together with a context string.
    fn notify_sync_with_context(
        &self,
        notification: Notification<'_>,
        context: &Context,
    ) -> Result<(), Self::Error>;
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    type Error = N::Error;

    fn notify_sync(&self, notification: Notification<'_>) -> Result<(), Self::Error> {
        (**self).notify_sync(notification)
    }

    fn notify_sync_with_context(
        &self,
        notification: Notification<'_>,
        context: &Context,
    ) -> Result<(), Self::Error> {
        (**self).notify_sync_with_context(notification, context)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    type Error = N::Error;

    fn notify_sync(&self, notification: Notification<'_>) -> Result<(), Self::Error> {
        (**self).notify_sync(notification)
    }

    fn notify_sync_with_context(
        &self,
        notification: Notification<'_>,
        context: &Context,
    ) -> Result<(), Self::Error> {
        (**self).notify_sync_with_context(notification, context)
    }
}

/// Called by a notifier in place of its own panic recovery.
#[derive(Clone)]
pub struct PanicHandler(Arc<dyn Fn() + Send + Sync>);

impl PanicHandler {
    /// A handler that does nothing, leaving panics to the process.
    pub fn noop() -> Self {
        Self(Arc::new(|| {}))
    }

    /// Wraps a function.
    pub fn new<F: Fn() + Send + Sync + 'static>(handler: F) -> Self {
        Self(Arc::new(handler))
    }

    /// Runs the handler.
    pub fn call(&self) {
        (self.0)()
    }
}

impl Default for PanicHandler {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for PanicHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PanicHandler")
    }
}

/// Diagnostic logger handed to a notifier for its own messages.
///
/// Messages below the threshold are dropped; the rest are emitted as
/// `tracing` events under the `faultline::notifier` target with a `package`
/// field, which keeps them out of the hook itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticLogger {
    threshold: tracing::Level,
    package: &'static str,
}

impl DiagnosticLogger {
    /// The logger used by [`ResolvedOptions::notifier_config`]: errors only.
    ///
    /// [`ResolvedOptions::notifier_config`]: crate::options::ResolvedOptions::notifier_config
    pub const DEFAULT: Self = Self {
        threshold: tracing::Level::ERROR,
        package: "notifier",
    };

    /// Creates a logger with the given threshold and `package` field value.
    pub const fn new(threshold: tracing::Level, package: &'static str) -> Self {
        Self { threshold, package }
    }

    /// Returns true if messages at `level` are emitted.
    pub fn enabled(&self, level: tracing::Level) -> bool {
        level <= self.threshold
    }

    /// Emits a message at `level` if it passes the threshold.
    pub fn log(&self, level: tracing::Level, message: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let package = self.package;
        if level == tracing::Level::ERROR {
            tracing::error!(target: "faultline::notifier", package, "{message}");
        } else if level == tracing::Level::WARN {
            tracing::warn!(target: "faultline::notifier", package, "{message}");
        } else if level == tracing::Level::INFO {
            tracing::info!(target: "faultline::notifier", package, "{message}");
        } else if level == tracing::Level::DEBUG {
            tracing::debug!(target: "faultline::notifier", package, "{message}");
        } else {
            tracing::trace!(target: "faultline::notifier", package, "{message}");
        }
    }

    /// Emits an error message.
    pub fn error(&self, message: fmt::Arguments<'_>) {
        self.log(tracing::Level::ERROR, message)
    }
}

impl Default for DiagnosticLogger {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything a notifier needs to be constructed.
#[derive(Clone, Debug)]
pub struct NotifierConfig {
    /// The API key, possibly empty.
    pub api_key: String,
    /// The release stage this process runs in.
    pub release_stage: String,
    /// Patterns identifying the application's own frames.
    pub project_packages: Vec<String>,
    /// The application version, possibly empty.
    pub app_version: String,
    /// Release stages in which reports are actually delivered.
    pub notify_release_stages: Vec<String>,
    /// Runs instead of the notifier's own panic recovery.
    pub panic_handler: PanicHandler,
    /// Logger for the notifier's diagnostics.
    pub logger: DiagnosticLogger,
}

impl NotifierConfig {
    /// Returns true if reports should be delivered in the configured release
    /// stage.
    pub fn is_release_stage_enabled(&self) -> bool {
        self.notify_release_stages
            .iter()
            .any(|stage| stage == &self.release_stage)
    }
}

/// Notifiers that can be built from a [`NotifierConfig`].
pub trait FromNotifierConfig: Sized {
    /// Builds the notifier.
    fn from_config(config: NotifierConfig) -> Self;
}
