//! Integration with the [`eyre`] 0.6.x error handling library.
//!
//! To enable this integration, add the `compat-eyre06` feature flag to your
//! `Cargo.toml`.
//!
//! Works like the [`anyhow1`](super::anyhow1) integration: a wrapped
//! [`ReportableError`] comes back out attributed, anything else becomes a
//! [`LoggedError::Plain`].
//!
//! ```
//! use faultline::{LoggedError, compat::IntoLogged};
//!
//! let error: LoggedError = eyre::eyre!("checksum mismatch").into_logged();
//! assert_eq!(error.to_string(), "checksum mismatch");
//! ```

use super::IntoLogged;
use crate::{BoxError, LoggedError, ReportableError};

impl IntoLogged for eyre::Report {
    type Output = LoggedError;

    fn into_logged(self) -> Self::Output {
        match self.downcast::<ReportableError>() {
            Ok(attributed) => LoggedError::Attributed(attributed),
            Err(report) => LoggedError::from(BoxError::from(report)),
        }
    }
}

impl From<eyre::Report> for LoggedError {
    fn from(report: eyre::Report) -> Self {
        report.into_logged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageError;

    #[test]
    fn test_attributed_survives_eyre() {
        let attributed = ReportableError::new(MessageError::new("lease lost"), Vec::new());
        let logged = eyre::Report::new(attributed.clone()).into_logged();
        assert_eq!(logged, LoggedError::Attributed(attributed));
    }

    #[test]
    fn test_plain_eyre_result() {
        let result: eyre::Result<u8> = Err(eyre::eyre!("no quorum"));
        let logged = result.into_logged().unwrap_err();
        assert_eq!(logged.to_string(), "no quorum");
    }
}
