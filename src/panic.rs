//! Reporting panics through a hook.
//!
//! Panics never pass through the logging pipeline, so they are reported from a
//! panic hook instead. [`install_panic_reporter`] chains onto whatever panic
//! hook is installed: the report is delivered first, synchronously, and the
//! previous hook (usually the one printing the panic message) runs afterwards.

use std::{
    panic::{self, PanicHookInfo},
    sync::Arc,
};

use crate::{
    entry::{Level, LogEntry},
    hook::Hook,
    notifier::Notifier,
    stack::StackProvider,
};

/// Field holding the `file:line:column` the panic originated from.
pub const PANIC_LOCATION_KEY: &str = "panic.location";
/// Field holding the name of the panicking thread.
pub const PANIC_THREAD_KEY: &str = "panic.thread";

/// Builds the [`Level::Panic`] entry describing a panic.
pub fn panic_entry(info: &PanicHookInfo<'_>) -> LogEntry {
    let message = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    };

    let mut entry = LogEntry::new(Level::Panic, message);
    if let Some(location) = info.location() {
        entry = entry.with_field(PANIC_LOCATION_KEY, location.to_string());
    }
    if let Some(name) = std::thread::current().name() {
        entry = entry.with_field(PANIC_THREAD_KEY, name);
    }
    entry
}

/// Reports every panic through `hook` before running the previous panic hook.
///
/// Nothing is reported if the hook's levels do not include
/// [`Level::Panic`].
pub fn install_panic_reporter<N, P>(hook: Arc<Hook<N, P>>)
where
    N: Notifier + 'static,
    P: StackProvider + 'static,
{
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        hook.fire(&panic_entry(info));
        previous(info);
    }));
}
