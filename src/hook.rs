//! The hook: one log entry in, at most one report out.

use core::fmt;

use crate::{
    classify::ErrorClassifier,
    dispatch::ReportDispatcher,
    entry::{Level, LogEntry},
    fields::{extract_identity, to_metadata},
    notifier::{FromNotifierConfig, Notifier},
    options::{HookOptions, ResolvedOptions},
    severity::map_level,
    stack::{StackCapture, StackProvider},
};

/// Reports log entries to a notifier.
///
/// The hook is invoked once per log entry by the logging pipeline (see
/// `faultline-tracing` for a [`tracing`] layer). It holds no mutable state,
/// so concurrent calls from several threads run independently.
///
/// # Examples
///
/// ```
/// use std::{convert::Infallible, sync::Mutex};
///
/// use faultline::{
///     Hook, HookOptions, Level, LogEntry, StackFrame,
///     notifier::{Context, Notification, Notifier},
/// };
///
/// #[derive(Default)]
/// struct Collect(Mutex<Vec<String>>);
///
/// impl Notifier for Collect {
///     type Error = Infallible;
///
///     fn notify_sync(&self, n: Notification<'_>) -> Result<(), Infallible> {
///         self.0.lock().unwrap().push(format!("{}: {}", n.severity, n.error));
///         Ok(())
///     }
///
///     fn notify_sync_with_context(&self, n: Notification<'_>, _: &Context) -> Result<(), Infallible> {
///         self.notify_sync(n)
///     }
/// }
///
/// let hook = Hook::with_notifier(
///     HookOptions::default().resolve_with(|_| None),
///     Collect::default(),
///     |_: usize, _: &str| vec![StackFrame::new("src/main.rs", 3, "app::main")],
/// );
///
/// hook.fire(&LogEntry::new(Level::Info, "ignored"));
/// hook.fire(&LogEntry::new(Level::Warn, "cache miss storm"));
///
/// assert_eq!(*hook.notifier().0.lock().unwrap(), ["warning: cache miss storm"]);
/// ```
pub struct Hook<N, P> {
    options: ResolvedOptions,
    classifier: ErrorClassifier<P>,
    dispatcher: ReportDispatcher<N>,
}

impl<N, P> Hook<N, P>
where
    N: Notifier,
    P: StackProvider,
{
    /// Resolves `options` and builds the notifier from them.
    pub fn new(options: HookOptions, provider: P) -> Self
    where
        N: FromNotifierConfig,
    {
        let options = options.resolve();
        let notifier = N::from_config(options.notifier_config());
        Self::with_notifier(options, notifier, provider)
    }

    /// Builds a hook around an existing notifier.
    pub fn with_notifier(options: ResolvedOptions, notifier: N, provider: P) -> Self {
        tracing::debug!(
            release_stage = options.env(),
            app_version = options.app_version(),
            levels = ?options.levels(),
            "error reporting hook configured"
        );
        Self {
            options,
            classifier: ErrorClassifier::new(provider),
            dispatcher: ReportDispatcher::new(notifier),
        }
    }

    /// Replaces the stack capture parameters.
    #[must_use]
    pub fn with_capture(self, capture: StackCapture) -> Self {
        let Self {
            options,
            classifier,
            dispatcher,
        } = self;
        let classifier = ErrorClassifier::with_capture(classifier.into_provider(), capture);
        Self {
            options,
            classifier,
            dispatcher,
        }
    }

    /// Observes delivery failures, which are otherwise dropped.
    #[must_use]
    pub fn on_delivery_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&dyn fmt::Display) + Send + Sync + 'static,
    {
        self.dispatcher = self.dispatcher.on_delivery_error(callback);
        self
    }

    /// The levels this hook reports.
    pub fn levels(&self) -> &[Level] {
        self.options.levels()
    }

    /// Returns true if entries at `level` are reported.
    pub fn is_enabled_for(&self, level: Level) -> bool {
        self.options.is_enabled_for(level)
    }

    /// The resolved options.
    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// The notifier reports are sent to.
    pub fn notifier(&self) -> &N {
        self.dispatcher.notifier()
    }

    /// Reports `entry` if its level is one of [`levels`](Self::levels).
    ///
    /// Blocks until the notifier returns. Never fails: malformed reserved
    /// fields are tolerated and delivery errors are not propagated.
    pub fn fire(&self, entry: &LogEntry) {
        if !self.is_enabled_for(entry.level) {
            return;
        }

        let classified = self.classifier.classify(entry);
        let (identity, residual) = extract_identity(&entry.fields);
        let metadata = to_metadata(&residual);
        let (severity, must_block) = map_level(entry.level);

        self.dispatcher.dispatch(
            &classified.error,
            &identity,
            &metadata,
            severity,
            must_block,
            classified.context.as_deref(),
        );
    }
}

impl<N: fmt::Debug, P: fmt::Debug> fmt::Debug for Hook<N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("options", &self.options)
            .field("classifier", &self.classifier)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::{
        error::StackFrame,
        notifier::{Context, Notification},
    };

    struct NullNotifier;

    impl Notifier for NullNotifier {
        type Error = Infallible;

        fn notify_sync(&self, _: Notification<'_>) -> Result<(), Infallible> {
            Ok(())
        }

        fn notify_sync_with_context(&self, _: Notification<'_>, _: &Context) -> Result<(), Infallible> {
            Ok(())
        }
    }

    fn no_frames(_: usize, _: &str) -> Vec<StackFrame> {
        Vec::new()
    }

    #[test]
    fn test_hook_send_sync() {
        type FnProvider = fn(usize, &str) -> Vec<StackFrame>;
        static_assertions::assert_impl_all!(Hook<NullNotifier, FnProvider>: Send, Sync);
    }

    #[test]
    fn test_with_capture_keeps_provider() {
        let hook = Hook::with_notifier(
            HookOptions::default().resolve_with(|_| None),
            NullNotifier,
            no_frames as fn(usize, &str) -> Vec<StackFrame>,
        )
        .with_capture(StackCapture {
            skip_depth: 5,
            package_root: "mylog",
        });
        assert_eq!(hook.classifier.capture().skip_depth, 5);
        assert_eq!(hook.levels().len(), 4);
    }
}
