#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Forwards log entries to a remote error-reporting notifier.
//!
//! ## Overview
//!
//! faultline sits between a structured logging pipeline and an error-reporting
//! service. For every log entry at a level of interest it works out which
//! error to report, where it happened, who it happened to and how severe it
//! is, then hands a single report to a [`Notifier`]:
//!
//! 1. **Filtering**: entries outside the configured [levels](HookOptions) are
//!    ignored.
//! 2. **Classification**: the entry's `"error"` field is reused when it
//!    already carries stack frames, paired with freshly captured frames when it
//!    doesn't, and synthesized from the message when there is none. See
//!    [`classify`].
//! 3. **Field extraction**: the reserved `@user.*` fields become an
//!    [`Identity`], everything else except `"error"` and `"blob"` becomes
//!    [`MetaData`]. See [`fields`].
//! 4. **Severity**: the [`Level`] maps to a [`Severity`], and fatal or panic
//!    entries are delivered synchronously. See [`severity`].
//! 5. **Dispatch**: one call into the notifier. Delivery failures never reach
//!    the logging call site. See [`dispatch`].
//!
//! Everything runs on the thread that logged the entry; there is no queue and
//! no background worker.
//!
//! ## Quick Example
//!
//! ```
//! use std::convert::Infallible;
//!
//! use faultline::{
//!     Hook, HookOptions, Level, LogEntry, StackFrame,
//!     notifier::{Context, Notification, Notifier},
//! };
//!
//! struct Print;
//!
//! impl Notifier for Print {
//!     type Error = Infallible;
//!
//!     fn notify_sync(&self, n: Notification<'_>) -> Result<(), Infallible> {
//!         println!("[{}] {} ({} frames)", n.severity, n.error, n.error.frames().len());
//!         Ok(())
//!     }
//!
//!     fn notify_sync_with_context(&self, n: Notification<'_>, c: &Context) -> Result<(), Infallible> {
//!         println!("{c}");
//!         self.notify_sync(n)
//!     }
//! }
//!
//! let hook = Hook::with_notifier(
//!     HookOptions::default().resolve(),
//!     Print,
//!     |_: usize, _: &str| vec![StackFrame::new("src/main.rs", 12, "app::main")],
//! );
//!
//! hook.fire(
//!     &LogEntry::new(Level::Error, "payment declined")
//!         .with_field("@user.id", "u-1138")
//!         .with_field("amount", 1999_u64),
//! );
//! ```
//!
//! ## Ecosystem
//!
//! - **`faultline-backtrace`** - a [`StackProvider`] built on the `backtrace`
//!   crate, and an extension trait that attributes frames to errors where
//!   they are wrapped.
//! - **`faultline-tracing`** - a `tracing-subscriber` layer that turns
//!   `tracing` events into log entries for a [`Hook`].

pub mod classify;
pub mod compat;
pub mod dispatch;
pub mod entry;
pub mod error;
pub mod fields;
pub mod hook;
pub mod notifier;
pub mod options;
pub mod panic;
pub mod prelude;
pub mod severity;
pub mod stack;

pub use self::{
    entry::{Level, LogEntry},
    error::{BoxError, LoggedError, MessageError, ReportableError, SharedError, StackFrame},
    fields::{FieldValue, Fields, Identity, MetaData},
    hook::Hook,
    notifier::Notifier,
    options::{HookOptions, ResolvedOptions},
    severity::Severity,
    stack::StackProvider,
};

/// Prefix of the `tracing` targets used by this crate and its companions.
///
/// Logging-pipeline adapters ignore events under this prefix so the hook never
/// reports on itself.
pub const INTERNAL_TARGET_PREFIX: &str = "faultline";

