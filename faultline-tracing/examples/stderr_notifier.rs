//! Reporting `tracing` events to a notifier that prints to stderr.
//!
//! Run with `FAULTLINE_ENV=staging cargo run --example stderr_notifier` to see
//! the release stage picked up from the environment.

use std::{convert::Infallible, io, sync::Arc};

use faultline::{
    Hook, HookOptions, ReportableError,
    notifier::{Context, FromNotifierConfig, Notification, Notifier, NotifierConfig},
    panic::install_panic_reporter,
};
use faultline_backtrace::{AttributeExt, BacktraceProvider};
use faultline_tracing::FaultlineLayer;
use tracing::instrument;
use tracing_subscriber::{Registry, layer::SubscriberExt};

struct StderrNotifier {
    release_stage: String,
    app_version: String,
}

impl FromNotifierConfig for StderrNotifier {
    fn from_config(config: NotifierConfig) -> Self {
        Self {
            release_stage: config.release_stage,
            app_version: config.app_version,
        }
    }
}

impl StderrNotifier {
    fn print(&self, n: Notification<'_>, context: Option<&Context>) {
        eprintln!(
            "--- {} report ({} {}, sync={})",
            n.severity, self.release_stage, self.app_version, n.sync
        );
        eprintln!("error: {}", n.error);
        if let Some(context) = context {
            eprintln!("context: {context}");
        }
        if !n.user.is_empty() {
            eprintln!("user: {:?}", n.user);
        }
        for (section, fields) in n.metadata.iter() {
            for (key, value) in fields {
                eprintln!("{section}.{key} = {value}");
            }
        }
        for frame in n.error.frames() {
            eprintln!("  at {} ({}:{})", frame.method, frame.file, frame.line);
        }
    }
}

impl Notifier for StderrNotifier {
    type Error = Infallible;

    fn notify_sync(&self, n: Notification<'_>) -> Result<(), Infallible> {
        self.print(n, None);
        Ok(())
    }

    fn notify_sync_with_context(&self, n: Notification<'_>, c: &Context) -> Result<(), Infallible> {
        self.print(n, Some(c));
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("upload rejected")]
struct UploadError(#[source] io::Error);

fn store(_bytes: &[u8]) -> Result<(), ReportableError> {
    Err(UploadError(io::Error::other("disk full"))).attribute()
}

#[instrument(fields(upload_id = 17))]
fn handle_upload(bytes: &[u8]) {
    if let Err(error) = store(bytes) {
        tracing::error!(
            error = &error as &dyn std::error::Error,
            "@user.id" = "u-1138",
            "@user.email" = "max@example.com",
            "failed to store upload"
        );
    }
}

fn main() {
    let hook = Arc::new(Hook::<StderrNotifier, _>::new(
        HookOptions::default(),
        BacktraceProvider::new_from_env(),
    ));
    install_panic_reporter(Arc::clone(&hook));

    let subscriber = Registry::default()
        .with(FaultlineLayer::from_shared(hook))
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber).expect("failed to set default subscriber");

    handle_upload(b"hello");
    tracing::warn!("@user.name" = "Max", quota_left = 3, "quota almost exhausted");
    tracing::error!("@level" = "fatal", "unrecoverable state");
    tracing::info!("not reported");
}
