#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Forwards [`tracing`] events to the faultline error reporting hook.
//!
//! # How It Works
//!
//! You add [`FaultlineLayer`] to your tracing subscriber alongside your
//! existing layers (formatting, filtering, log forwarding, etc.). Every event
//! becomes a [`LogEntry`]: the formatted message, the event's fields and the
//! fields of all enclosing spans. Entries at one of the hook's levels are then
//! reported.
//!
//! # Quick Start
//!
//! ```
//! use std::convert::Infallible;
//!
//! use faultline::{
//!     HookOptions,
//!     notifier::{Context, FromNotifierConfig, Notification, Notifier, NotifierConfig},
//! };
//! use faultline_tracing::FaultlineLayer;
//! use tracing_subscriber::{Registry, layer::SubscriberExt};
//!
//! struct Stderr;
//!
//! impl FromNotifierConfig for Stderr {
//!     fn from_config(_: NotifierConfig) -> Self {
//!         Stderr
//!     }
//! }
//!
//! impl Notifier for Stderr {
//!     type Error = Infallible;
//!
//!     fn notify_sync(&self, n: Notification<'_>) -> Result<(), Infallible> {
//!         eprintln!("{}: {}", n.severity, n.error);
//!         Ok(())
//!     }
//!
//!     fn notify_sync_with_context(&self, n: Notification<'_>, c: &Context) -> Result<(), Infallible> {
//!         eprintln!("{c}");
//!         self.notify_sync(n)
//!     }
//! }
//!
//! let subscriber = Registry::default()
//!     .with(FaultlineLayer::<Stderr>::new(HookOptions::default()))
//!     .with(tracing_subscriber::fmt::layer());
//!
//! tracing::subscriber::with_default(subscriber, || {
//!     let _checkout = tracing::info_span!("checkout", "@user.id" = "u-7", cart = 42).entered();
//!     tracing::error!(attempt = 3, "payment provider unreachable");
//! });
//! ```
//!
//! # Reserved fields
//!
//! - `error`: an error recorded as `&dyn Error` becomes the reported error.
//!   A [`ReportableError`] keeps its own frames.
//! - `@user.id`, `@user.name`, `@user.email`: the user the report concerns.
//! - `blob`: never forwarded.
//! - `@level`: `"fatal"` or `"panic"` raises the entry above `ERROR`, which
//!   `tracing` has no level for. Only event fields raise the level; the field
//!   is never forwarded, whether it is set on an event or a span.
//!
//! Events whose target starts with `faultline` are never reported, so the
//! hook's own diagnostics cannot loop back into it.

use std::{error::Error, fmt, str::FromStr, sync::Arc};

use faultline::{
    FieldValue, Fields, Hook, HookOptions, Level, LogEntry, LoggedError, Notifier,
    ReportableError, StackProvider, notifier::FromNotifierConfig,
};
use faultline_backtrace::BacktraceProvider;
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
    span,
};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// Event field raising an entry to [`Level::Fatal`] or [`Level::Panic`].
pub const LEVEL_OVERRIDE_FIELD: &str = "@level";

const MESSAGE_FIELD: &str = "message";

/// Field values recorded on a span.
struct SpanFields(Fields);

/// A tracing layer that reports events through a [`Hook`].
///
/// # Examples
///
/// Sharing one hook between the layer and the panic reporter:
///
/// ```
/// use std::{convert::Infallible, sync::Arc};
///
/// use faultline::{
///     Hook, HookOptions,
///     notifier::{Context, Notification, Notifier},
///     panic::install_panic_reporter,
/// };
/// use faultline_tracing::FaultlineLayer;
/// use tracing_subscriber::{Registry, layer::SubscriberExt};
///
/// struct Discard;
///
/// impl Notifier for Discard {
///     type Error = Infallible;
///
///     fn notify_sync(&self, _: Notification<'_>) -> Result<(), Infallible> {
///         Ok(())
///     }
///
///     fn notify_sync_with_context(&self, _: Notification<'_>, _: &Context) -> Result<(), Infallible> {
///         Ok(())
///     }
/// }
///
/// let hook = Arc::new(Hook::with_notifier(
///     HookOptions::default().resolve(),
///     Discard,
///     faultline_backtrace::BacktraceProvider::new_from_env(),
/// ));
///
/// install_panic_reporter(Arc::clone(&hook));
/// let subscriber = Registry::default().with(FaultlineLayer::from_shared(hook));
/// # drop(subscriber);
/// # let _ = std::panic::take_hook();
/// ```
pub struct FaultlineLayer<N, P = BacktraceProvider> {
    hook: Arc<Hook<N, P>>,
}

impl<N> FaultlineLayer<N, BacktraceProvider>
where
    N: Notifier + FromNotifierConfig,
{
    /// Builds the hook from `options`, with a [`BacktraceProvider`] configured
    /// from the environment.
    pub fn new(options: HookOptions) -> Self {
        Self::from_hook(Hook::new(options, BacktraceProvider::new_from_env()))
    }
}

impl<N, P> FaultlineLayer<N, P>
where
    N: Notifier,
    P: StackProvider,
{
    /// Wraps an existing hook.
    pub fn from_hook(hook: Hook<N, P>) -> Self {
        Self::from_shared(Arc::new(hook))
    }

    /// Wraps a hook that is shared with other reporters.
    pub fn from_shared(hook: Arc<Hook<N, P>>) -> Self {
        Self { hook }
    }

    /// The hook events are reported through.
    pub fn hook(&self) -> &Arc<Hook<N, P>> {
        &self.hook
    }
}

impl<N, P> Clone for FaultlineLayer<N, P> {
    fn clone(&self) -> Self {
        Self {
            hook: Arc::clone(&self.hook),
        }
    }
}

impl<N, P> fmt::Debug for FaultlineLayer<N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultlineLayer").finish_non_exhaustive()
    }
}

impl<S, N, P> Layer<S> for FaultlineLayer<N, P>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: Notifier + 'static,
    P: StackProvider + 'static,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::for_span();
        attrs.record(&mut visitor);
        span.extensions_mut().insert(SpanFields(visitor.fields));
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::for_span();
        values.record(&mut visitor);

        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() {
            fields.extend(visitor.fields);
        } else {
            extensions.insert(SpanFields(visitor.fields));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(faultline::INTERNAL_TARGET_PREFIX) {
            return;
        }

        let mut visitor = FieldVisitor::for_event();
        event.record(&mut visitor);

        let level = match visitor.level_override {
            Some(raised) => raised.max(level_of(metadata.level())),
            None => level_of(metadata.level()),
        };
        if !self.hook.is_enabled_for(level) {
            return;
        }

        let mut fields = Fields::default();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(SpanFields(span_fields)) = span.extensions().get::<SpanFields>() {
                    fields.extend(span_fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }
        fields.extend(visitor.fields);

        self.hook.fire(&LogEntry {
            level,
            message: visitor.message.unwrap_or_default(),
            fields,
        });
    }
}

fn level_of(level: &tracing::Level) -> Level {
    if *level == tracing::Level::TRACE {
        Level::Trace
    } else if *level == tracing::Level::DEBUG {
        Level::Debug
    } else if *level == tracing::Level::INFO {
        Level::Info
    } else if *level == tracing::Level::WARN {
        Level::Warn
    } else {
        Level::Error
    }
}

struct FieldVisitor {
    fields: Fields,
    message: Option<String>,
    level_override: Option<Level>,
    is_event: bool,
}

impl FieldVisitor {
    fn for_event() -> Self {
        Self {
            fields: Fields::default(),
            message: None,
            level_override: None,
            is_event: true,
        }
    }

    fn for_span() -> Self {
        Self {
            is_event: false,
            ..Self::for_event()
        }
    }

    fn insert(&mut self, field: &Field, value: FieldValue) {
        if field.name() != LEVEL_OVERRIDE_FIELD {
            self.fields.insert(field.name().to_string(), value);
        }
    }

    fn override_level(&mut self, value: &str) {
        self.level_override = Level::from_str(value.trim_matches('"'))
            .ok()
            .filter(|level| *level >= Level::Fatal);
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if self.is_event {
            match field.name() {
                MESSAGE_FIELD => {
                    self.message = Some(value.to_string());
                    return;
                }
                LEVEL_OVERRIDE_FIELD => {
                    self.override_level(value);
                    return;
                }
                _ => {}
            }
        }
        self.insert(field, FieldValue::Str(value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, FieldValue::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, FieldValue::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, FieldValue::U64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, FieldValue::F64(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        let error = match value.downcast_ref::<ReportableError>() {
            Some(attributed) => LoggedError::Attributed(attributed.clone()),
            None => LoggedError::plain(ErrorSnapshot::of(value)),
        };
        self.insert(field, FieldValue::Error(error));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let formatted = format!("{value:?}");
        if !self.is_event {
            self.insert(field, FieldValue::Str(formatted));
        } else if field.name() == MESSAGE_FIELD {
            self.message = Some(formatted);
        } else if field.name() == LEVEL_OVERRIDE_FIELD {
            self.override_level(&formatted);
        } else {
            self.insert(field, FieldValue::Str(formatted));
        }
    }
}

/// An owned copy of a borrowed error and its source chain.
///
/// `tracing` lends error values to the layer only for the duration of the
/// event, so plain errors are reported through a snapshot that displays the
/// same way.
#[derive(Debug)]
pub struct ErrorSnapshot {
    message: String,
    source: Option<Box<ErrorSnapshot>>,
}

impl ErrorSnapshot {
    /// Copies `error` and its sources.
    pub fn of(error: &(dyn Error + 'static)) -> Self {
        Self {
            message: error.to_string(),
            source: error.source().map(|source| Box::new(Self::of(source))),
        }
    }
}

impl fmt::Display for ErrorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ErrorSnapshot {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn Error + 'static))
    }
}
