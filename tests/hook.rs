use std::{
    convert::Infallible,
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use faultline::{
    BoxError, FieldValue, Hook, HookOptions, Identity, Level, LogEntry, LoggedError, MessageError,
    MetaData, ReportableError, Severity, SharedError, StackFrame, StackProvider,
    fields::FIELDS_SECTION,
    notifier::{Context, FromNotifierConfig, Notification, Notifier, NotifierConfig},
};

#[derive(Debug)]
struct Recorded {
    error: ReportableError,
    severity: Severity,
    sync: bool,
    metadata: MetaData,
    user: Identity,
    context: Option<String>,
}

#[derive(Default)]
struct RecordingNotifier {
    reports: Mutex<Vec<Recorded>>,
}

impl RecordingNotifier {
    fn record(&self, n: Notification<'_>, context: Option<&Context>) {
        self.reports.lock().unwrap().push(Recorded {
            error: n.error.clone(),
            severity: n.severity,
            sync: n.sync,
            metadata: n.metadata.clone(),
            user: n.user.clone(),
            context: context.map(|c| c.0.clone()),
        });
    }

    fn reports(&self) -> std::sync::MutexGuard<'_, Vec<Recorded>> {
        self.reports.lock().unwrap()
    }
}

impl Notifier for RecordingNotifier {
    type Error = Infallible;

    fn notify_sync(&self, n: Notification<'_>) -> Result<(), Infallible> {
        self.record(n, None);
        Ok(())
    }

    fn notify_sync_with_context(&self, n: Notification<'_>, c: &Context) -> Result<(), Infallible> {
        self.record(n, Some(c));
        Ok(())
    }
}

/// Returns one fixed frame and counts how often it was asked to.
#[derive(Default)]
struct CountingProvider {
    calls: AtomicUsize,
}

impl StackProvider for CountingProvider {
    fn capture_frames(&self, _skip_depth: usize, _package_root: &str) -> Vec<StackFrame> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        vec![StackFrame::new("src/worker.rs", 21, "app::worker::run").with_package("app")]
    }
}

type TestHook = Hook<RecordingNotifier, CountingProvider>;

fn hook() -> TestHook {
    Hook::with_notifier(
        HookOptions::default().resolve_with(|_| None),
        RecordingNotifier::default(),
        CountingProvider::default(),
    )
}

#[derive(Debug, thiserror::Error)]
#[error("disk full")]
struct DiskFull;

#[test]
fn test_scenario_plain_error_at_error_level() {
    let hook = hook();
    hook.fire(&LogEntry::new(Level::Error, "saving upload").with_error(LoggedError::plain(DiskFull)));

    let reports = hook.notifier().reports();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.severity, Severity::Error);
    assert!(!report.sync);
    assert_eq!(report.error.to_string(), "disk full");
    assert!(!report.error.frames().is_empty());
    assert!(
        report
            .metadata
            .iter()
            .all(|(_, fields)| !fields.contains_key("error"))
    );
}

#[test]
fn test_scenario_panic_without_error() {
    let hook = hook();
    hook.fire(&LogEntry::new(Level::Panic, "unrecoverable state"));

    let reports = hook.notifier().reports();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.error.to_string(), "unrecoverable state");
    assert!(report.error.error().downcast_ref::<MessageError>().is_some());
    assert!(report.sync);
    assert_eq!(report.severity, Severity::Error);
    assert_eq!(report.context, None);
}

#[test]
fn test_scenario_user_name_at_warn_level() {
    let hook = hook();
    hook.fire(
        &LogEntry::new(Level::Warn, "quota almost exhausted")
            .with_field("@user.name", "Max")
            .with_field("note", "x"),
    );

    let reports = hook.notifier().reports();
    let report = &reports[0];
    assert_eq!(report.severity, Severity::Warning);
    assert_eq!(report.user.name.as_deref(), Some("Max"));
    assert_eq!(report.user.id, None);
    assert_eq!(report.user.email, None);

    let sections: Vec<_> = report.metadata.iter().collect();
    assert_eq!(sections.len(), 1);
    let (name, fields) = sections[0];
    assert_eq!(name, FIELDS_SECTION);
    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("note"), Some(&FieldValue::from("x")));
}

#[test]
fn test_only_configured_levels_are_reported() {
    for configured in Level::ALL {
        let hook = Hook::with_notifier(
            HookOptions {
                levels: vec![configured],
                ..HookOptions::default()
            }
            .resolve_with(|_| None),
            RecordingNotifier::default(),
            CountingProvider::default(),
        );
        for level in Level::ALL {
            hook.fire(&LogEntry::new(level, level.as_str()));
        }

        let reports = hook.notifier().reports();
        assert_eq!(reports.len(), 1, "{configured}");
        assert_eq!(reports[0].error.to_string(), configured.as_str());
    }
}

#[test]
fn test_attributed_error_is_not_recaptured() {
    let provider = Arc::new(CountingProvider::default());
    let hook = Hook::with_notifier(
        HookOptions::default().resolve_with(|_| None),
        RecordingNotifier::default(),
        {
            let provider = Arc::clone(&provider);
            move |skip_depth: usize, package_root: &str| provider.capture_frames(skip_depth, package_root)
        },
    );
    let frames = vec![
        StackFrame::new("src/store.rs", 12, "app::store::write"),
        StackFrame::new("src/main.rs", 4, "app::main"),
    ];
    let attributed = ReportableError::new(DiskFull, frames.clone());

    hook.fire(&LogEntry::new(Level::Error, "saving upload").with_error(attributed.clone()));

    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    let reports = hook.notifier().reports();
    let report = &reports[0];
    assert_eq!(report.error.frames(), frames.as_slice());
    assert!(Arc::ptr_eq(report.error.error(), attributed.error()));
    assert_eq!(report.context.as_deref(), Some("saving upload"));
}

#[test]
fn test_plain_error_is_paired_not_replaced() {
    let hook = hook();
    let shared: SharedError = Arc::new(DiskFull);
    hook.fire(&LogEntry::new(Level::Error, "saving upload").with_error(shared.clone()));

    let reports = hook.notifier().reports();
    let report = &reports[0];
    assert!(Arc::ptr_eq(report.error.error(), &shared));
    assert_eq!(report.error.frames().len(), 1);
    assert_eq!(report.error.frames()[0].method, "app::worker::run");
    assert_eq!(report.context.as_deref(), Some("saving upload"));
}

#[test]
fn test_boxed_attributed_error_is_recognized() {
    let hook = hook();
    let boxed: BoxError = Box::new(ReportableError::new(
        DiskFull,
        vec![StackFrame::new("src/upload.rs", 7, "app::upload")],
    ));
    hook.fire(&LogEntry::new(Level::Error, "saving upload").with_error(boxed));

    let reports = hook.notifier().reports();
    assert_eq!(reports[0].error.frames()[0].method, "app::upload");
}

#[test]
fn test_non_error_error_field_is_ignored() {
    let hook = hook();
    hook.fire(
        &LogEntry::new(Level::Error, "odd entry")
            .with_field("error", "not an error value")
            .with_field("blob", "raw bytes")
            .with_field("@user.id", 42_u64),
    );

    let reports = hook.notifier().reports();
    let report = &reports[0];
    assert_eq!(report.error.to_string(), "odd entry");
    assert_eq!(report.context, None);
    assert_eq!(report.user, Identity::default());

    let fields = report.metadata.section(FIELDS_SECTION).unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("@user.id"), Some(&FieldValue::U64(42)));
}

#[test]
fn test_severity_table() {
    let cases = [
        (Level::Panic, Severity::Error, true),
        (Level::Fatal, Severity::Error, true),
        (Level::Error, Severity::Error, false),
        (Level::Warn, Severity::Warning, false),
        (Level::Info, Severity::Info, false),
        (Level::Debug, Severity::Info, false),
        (Level::Trace, Severity::Info, false),
    ];
    let hook = Hook::with_notifier(
        HookOptions {
            levels: Level::ALL.to_vec(),
            ..HookOptions::default()
        }
        .resolve_with(|_| None),
        RecordingNotifier::default(),
        CountingProvider::default(),
    );
    for (level, _, _) in cases {
        hook.fire(&LogEntry::new(level, "x"));
    }

    let reports = hook.notifier().reports();
    for ((level, severity, sync), report) in cases.iter().zip(reports.iter()) {
        assert_eq!(report.severity, *severity, "{level}");
        assert_eq!(report.sync, *sync, "{level}");
    }
}

#[test]
fn test_empty_fields_give_empty_metadata() {
    let hook = hook();
    hook.fire(&LogEntry::new(Level::Error, "bare"));
    assert!(hook.notifier().reports()[0].metadata.is_empty());
}

#[test]
fn test_entry_is_not_modified() {
    let hook = hook();
    let entry = LogEntry::new(Level::Warn, "quota")
        .with_field("@user.email", "max@example.com")
        .with_field("blob", "raw");
    hook.fire(&entry);
    assert_eq!(entry.fields.len(), 2);
    assert_eq!(entry.fields.get("@user.email"), Some(&FieldValue::from("max@example.com")));
}

#[derive(Debug)]
struct Refused;

impl fmt::Display for Refused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection refused")
    }
}

struct Unreachable {
    release_stage: String,
}

impl FromNotifierConfig for Unreachable {
    fn from_config(config: NotifierConfig) -> Self {
        Self {
            release_stage: config.release_stage,
        }
    }
}

impl Notifier for Unreachable {
    type Error = Refused;

    fn notify_sync(&self, _: Notification<'_>) -> Result<(), Refused> {
        Err(Refused)
    }

    fn notify_sync_with_context(&self, _: Notification<'_>, _: &Context) -> Result<(), Refused> {
        Err(Refused)
    }
}

#[test]
fn test_delivery_errors_are_swallowed() {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let hook: Hook<Unreachable, _> = Hook::new(
        HookOptions {
            env: Some("prod".to_string()),
            ..HookOptions::default()
        },
        |_: usize, _: &str| Vec::new(),
    )
    .on_delivery_error({
        let failures = Arc::clone(&failures);
        move |error| failures.lock().unwrap().push(error.to_string())
    });

    assert_eq!(hook.notifier().release_stage, "prod");
    hook.fire(&LogEntry::new(Level::Error, "first"));
    hook.fire(&LogEntry::new(Level::Error, "second").with_error(LoggedError::plain(DiskFull)));
    assert_eq!(*failures.lock().unwrap(), ["connection refused", "connection refused"]);
}

#[test]
fn test_concurrent_fire() {
    let hook = Arc::new(hook());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let hook = Arc::clone(&hook);
            std::thread::spawn(move || {
                for j in 0..25 {
                    hook.fire(&LogEntry::new(Level::Error, format!("{i}-{j}")).with_field("worker", i as u64));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(hook.notifier().reports().len(), 200);
}
