//! Integration with the [`anyhow`] 1.x error handling library.
//!
//! To enable this integration, add the `compat-anyhow1` feature flag to your
//! `Cargo.toml`.
//!
//! [`anyhow::Error`] converts into a [`LoggedError`] with `.into_logged()` or
//! `From`. If the anyhow error wraps a [`ReportableError`], the result is
//! [`LoggedError::Attributed`] with the original frames; otherwise it is a
//! [`LoggedError::Plain`] that displays exactly like the anyhow error.
//!
//! ```
//! use faultline::{LoggedError, compat::IntoLogged};
//!
//! let error: LoggedError = anyhow::anyhow!("failed to connect").into_logged();
//! assert_eq!(error.to_string(), "failed to connect");
//! assert!(error.frames().is_none());
//! ```

use super::IntoLogged;
use crate::{BoxError, LoggedError, ReportableError};

impl IntoLogged for anyhow::Error {
    type Output = LoggedError;

    fn into_logged(self) -> Self::Output {
        match self.downcast::<ReportableError>() {
            Ok(attributed) => LoggedError::Attributed(attributed),
            Err(error) => LoggedError::from(BoxError::from(error)),
        }
    }
}

impl From<anyhow::Error> for LoggedError {
    fn from(error: anyhow::Error) -> Self {
        error.into_logged()
    }
}
