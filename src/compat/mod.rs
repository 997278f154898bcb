//! Conversions from other error handling libraries into [`LoggedError`].
//!
//! # Overview
//!
//! Applications built on another error library can log their errors through
//! the reserved `"error"` field without unwrapping them first. Each submodule
//! converts one library's error type, and `Result`s carrying it, with the
//! [`IntoLogged`] trait and a matching `From` implementation.
//!
//! A [`ReportableError`](crate::ReportableError) that was wrapped into the
//! foreign error type is recognised and comes back out as
//! [`LoggedError::Attributed`], keeping its frames.
//!
//! # Available Integrations
//!
//! - [`anyhow1`] - `anyhow` 1.x (requires the `compat-anyhow1` feature flag)
//! - [`eyre06`] - `eyre` 0.6.x (requires the `compat-eyre06` feature flag)
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "compat-anyhow1")] {
//! use faultline::{Level, LogEntry, compat::IntoLogged};
//!
//! fn legacy() -> anyhow::Result<u32> {
//!     anyhow::bail!("upstream timed out");
//! }
//!
//! if let Err(error) = legacy().into_logged() {
//!     let entry = LogEntry::new(Level::Error, "sync failed").with_error(error);
//!     assert_eq!(entry.fields.len(), 1);
//! }
//! # }
//! ```

#[cfg(any(feature = "compat-anyhow1", feature = "compat-eyre06"))]
use crate::LoggedError;

/// Converts a foreign error, or a `Result` carrying one, for logging.
pub trait IntoLogged {
    /// The type produced by the conversion.
    ///
    /// [`LoggedError`](crate::LoggedError) for error values,
    /// `Result<T, LoggedError>` for results.
    type Output;

    /// Performs the conversion.
    fn into_logged(self) -> Self::Output;
}

#[cfg(feature = "compat-anyhow1")]
#[cfg_attr(docsrs, doc(cfg(feature = "compat-anyhow1")))]
pub mod anyhow1;

#[cfg(feature = "compat-eyre06")]
#[cfg_attr(docsrs, doc(cfg(feature = "compat-eyre06")))]
pub mod eyre06;

#[cfg(any(feature = "compat-anyhow1", feature = "compat-eyre06"))]
impl<T, E> IntoLogged for Result<T, E>
where
    E: IntoLogged<Output = LoggedError>,
{
    type Output = Result<T, LoggedError>;

    #[inline]
    fn into_logged(self) -> Self::Output {
        self.map_err(IntoLogged::into_logged)
    }
}
