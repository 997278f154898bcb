//! The single call into the notifier.
//!
//! Logging must not fail because reporting did, so the dispatcher never
//! returns the notifier's delivery error. It can be observed through
//! [`ReportDispatcher::on_delivery_error`]; without a callback the failure is
//! logged at `debug` and dropped.

use core::fmt;
use std::sync::Arc;

use crate::{
    error::ReportableError,
    fields::{Identity, MetaData},
    notifier::{Context, Notification, Notifier},
    severity::Severity,
};

type DeliveryErrorCallback = Arc<dyn Fn(&dyn fmt::Display) + Send + Sync>;

/// Calls the notifier once per report.
pub struct ReportDispatcher<N> {
    notifier: N,
    on_delivery_error: Option<DeliveryErrorCallback>,
}

impl<N: Notifier> ReportDispatcher<N> {
    /// Creates a dispatcher around `notifier`.
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            on_delivery_error: None,
        }
    }

    /// Observes delivery failures. The callback runs on the logging thread and
    /// must not log through the hook it belongs to.
    #[must_use]
    pub fn on_delivery_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&dyn fmt::Display) + Send + Sync + 'static,
    {
        self.on_delivery_error = Some(Arc::new(callback));
        self
    }

    /// The wrapped notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Sends one report.
    ///
    /// A non-empty `context` selects [`Notifier::notify_sync_with_context`];
    /// otherwise [`Notifier::notify_sync`] is called. Blocks for as long as the
    /// notifier does.
    pub fn dispatch(
        &self,
        error: &ReportableError,
        identity: &Identity,
        metadata: &MetaData,
        severity: Severity,
        must_block: bool,
        context: Option<&str>,
    ) {
        let notification = Notification {
            error,
            sync: must_block,
            severity,
            metadata,
            user: identity,
        };

        let result = match context.filter(|context| !context.is_empty()) {
            Some(context) => self
                .notifier
                .notify_sync_with_context(notification, &Context(context.to_string())),
            None => self.notifier.notify_sync(notification),
        };

        if let Err(delivery_error) = result {
            match &self.on_delivery_error {
                Some(callback) => callback(&delivery_error),
                None => tracing::debug!(
                    error = %delivery_error,
                    %severity,
                    "report delivery failed; dropping it"
                ),
            }
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for ReportDispatcher<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportDispatcher")
            .field("notifier", &self.notifier)
            .field("on_delivery_error", &self.on_delivery_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::MessageError;

    #[derive(Default)]
    struct Calls {
        plain: Mutex<Vec<bool>>,
        with_context: Mutex<Vec<String>>,
    }

    struct FailingNotifier(Arc<Calls>);

    impl Notifier for FailingNotifier {
        type Error = &'static str;

        fn notify_sync(&self, notification: Notification<'_>) -> Result<(), Self::Error> {
            self.0.plain.lock().unwrap().push(notification.sync);
            Err("connection refused")
        }

        fn notify_sync_with_context(
            &self,
            _notification: Notification<'_>,
            context: &Context,
        ) -> Result<(), Self::Error> {
            self.0.with_context.lock().unwrap().push(context.0.clone());
            Err("connection refused")
        }
    }

    fn error() -> ReportableError {
        ReportableError::new(MessageError::new("boom"), Vec::new())
    }

    #[test]
    fn test_context_selects_call_shape() {
        let calls = Arc::new(Calls::default());
        let dispatcher = ReportDispatcher::new(FailingNotifier(calls.clone()));
        let (identity, metadata) = (Identity::default(), MetaData::new());

        dispatcher.dispatch(&error(), &identity, &metadata, Severity::Error, true, None);
        dispatcher.dispatch(&error(), &identity, &metadata, Severity::Error, false, Some(""));
        dispatcher.dispatch(&error(), &identity, &metadata, Severity::Warning, false, Some("ctx"));

        assert_eq!(*calls.plain.lock().unwrap(), [true, false]);
        assert_eq!(*calls.with_context.lock().unwrap(), ["ctx"]);
    }

    #[test]
    fn test_delivery_error_reaches_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = ReportDispatcher::new(FailingNotifier(Arc::default())).on_delivery_error({
            let seen = Arc::clone(&seen);
            move |error| seen.lock().unwrap().push(error.to_string())
        });

        dispatcher.dispatch(&error(), &Identity::default(), &MetaData::new(), Severity::Info, false, None);
        assert_eq!(*seen.lock().unwrap(), ["connection refused"]);
    }
}
