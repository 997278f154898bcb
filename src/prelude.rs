//! Commonly used items for convenient importing.
//!
//! ```rust
//! use faultline::prelude::*;
//!
//! let entry = LogEntry::new(Level::Error, "replica lagging")
//!     .with_field("@user.id", "ops")
//!     .with_field("lag_ms", 5_400_u64);
//! assert_eq!(entry.fields.len(), 2);
//! ```
//!
//! # What's Included
//!
//! - **[`Hook`]**, **[`HookOptions`]**: building and firing the hook
//! - **[`LogEntry`]**, **[`Level`]**: the input records
//! - **[`Notifier`]**, **[`StackProvider`]**: the two seams to implement
//! - **[`ReportableError`]**, **[`LoggedError`]**, **[`StackFrame`]**: the
//!   error model
//! - **[`IntoLogged`]**: conversions from other error libraries

pub use crate::{
    Hook, HookOptions, Level, LogEntry, LoggedError, Notifier, ReportableError, StackFrame,
    StackProvider, compat::IntoLogged,
};
