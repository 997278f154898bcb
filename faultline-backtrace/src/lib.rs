#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Stack frame capture for the faultline error reporting hook.
//!
//! This crate provides [`BacktraceProvider`], a [`StackProvider`] that walks
//! the current call stack with the [`backtrace`] crate and turns it into the
//! [`StackFrame`]s handed to the notifier, and [`AttributeExt`], which pairs
//! an error with the frames of the place it is attributed at.
//!
//! # Quick Start
//!
//! ```rust
//! use faultline::stack::StackCapture;
//! use faultline_backtrace::BacktraceProvider;
//!
//! let provider = BacktraceProvider::new_from_env();
//! let frames = StackCapture::DEFAULT.capture(&provider);
//! for frame in &frames {
//!     println!("{} - {}:{}", frame.method, frame.file, frame.line);
//! }
//! ```
//!
//! Attributing an error where it is first seen keeps the frames of that place,
//! even when the error is logged much further up:
//!
//! ```rust
//! use std::io;
//!
//! use faultline::ReportableError;
//! use faultline_backtrace::AttributeExt;
//!
//! fn load() -> Result<Vec<u8>, ReportableError> {
//!     std::fs::read("/definitely/not/here").attribute()
//! }
//!
//! let error = load().unwrap_err();
//! assert_eq!(
//!     error.error().downcast_ref::<io::Error>().map(io::Error::kind),
//!     Some(io::ErrorKind::NotFound)
//! );
//! ```
//!
//! # Frame selection
//!
//! Capture happens deep inside the logging pipeline, so the innermost frames
//! belong to this crate, the hook and the logging framework. Starting from the
//! innermost frame:
//!
//! 1. frames of the `backtrace` crate itself are dropped,
//! 2. `skip_depth` more frames are dropped,
//! 3. leading frames from [`BacktraceFilter::skipped_initial_crates`] or from
//!    the `package_root` crate family are dropped,
//! 4. at most [`BacktraceFilter::max_entry_count`] frames are kept,
//! 5. trailing runtime frames ([`BacktraceFilter::skipped_final_crates`] and
//!    the libc entry points) are dropped.
//!
//! # Environment Variables
//!
//! - `RUST_BACKTRACE=full` - Disables crate filtering and shows full paths
//! - `FAULTLINE_BACKTRACE` - Comma-separated options:
//!   - `full_paths` - Report full file paths instead of shortened paths
//!
//! # Path privacy
//!
//! Paths into the Rust sources and the cargo registry are shortened, but other
//! paths are reported as they were recorded in the debug information. Use
//! `rustc`'s `--remap-path-prefix` to keep build machine paths out of reports:
//!
//! ```sh
//! export RUSTFLAGS="--remap-path-prefix=$HOME=/home/user --remap-path-prefix=$PWD=/build"
//! ```
//!
//! # Debugging symbols in release builds
//!
//! Frames without symbol names or file names are skipped, so release builds
//! need debug information to produce useful reports:
//!
//! ```toml
//! [profile.release]
//! strip = false
//! debug = "line-tables-only"
//! ```

use std::{borrow::Cow, sync::OnceLock};

use backtrace::BytesOrWideString;
use faultline::{
    BoxError, ReportableError, StackFrame, StackProvider, error::is_in_package,
    stack::StackCapture,
};

/// File path information for a stack frame.
#[derive(Debug)]
pub struct FramePath {
    /// The raw file path from the debug information.
    pub raw_path: String,
    /// The crate name if detected from the path.
    pub crate_name: Option<Cow<'static, str>>,
    /// Common path prefix information for shortening display.
    pub split_path: Option<FramePrefix>,
}

/// A known prefix split off a frame path.
#[derive(Debug)]
pub struct FramePrefix {
    /// `"RUST_SRC"` for standard library paths, `"CARGO"` for registry crates.
    pub prefix_kind: &'static str,
    /// The prefix that was removed, e.g.
    /// `"/home/user/.cargo/registry/src/index.crates.io-1949cf8c6b5b557f"`.
    pub prefix: String,
    /// The rest of the path, e.g. `"indexmap-2.12.1/src/map/core/entry.rs"`.
    pub suffix: String,
}

/// Configuration for filtering frames from certain crates.
///
/// # Examples
///
/// ```rust
/// use faultline_backtrace::BacktraceFilter;
///
/// let filter = BacktraceFilter {
///     // Also hide the async runtime between the log call and the hook
///     skipped_initial_crates: &["backtrace", "std", "core", "alloc", "tracing", "tracing_core", "tracing_subscriber", "tokio"],
///     max_entry_count: 10,
///     ..BacktraceFilter::DEFAULT
/// };
/// ```
#[derive(Copy, Clone, Debug)]
pub struct BacktraceFilter {
    /// Crates whose frames are hidden while they appear at the beginning of
    /// the capture, right after the `skip_depth` frames.
    pub skipped_initial_crates: &'static [&'static str],
    /// Crates whose frames are hidden while they appear at the end of the
    /// capture.
    pub skipped_final_crates: &'static [&'static str],
    /// Maximum number of frames to keep.
    pub max_entry_count: usize,
    /// Whether to report full file paths.
    pub show_full_path: bool,
}

impl BacktraceFilter {
    /// Default filter settings.
    pub const DEFAULT: Self = Self {
        skipped_initial_crates: &[
            "backtrace",
            "std",
            "core",
            "alloc",
            "tracing",
            "tracing_core",
            "tracing_subscriber",
        ],
        skipped_final_crates: &["std", "core", "alloc", "tokio"],
        max_entry_count: 20,
        show_full_path: false,
    };

    /// No crate filtering, no frame limit.
    pub const FULL: Self = Self {
        skipped_initial_crates: &["backtrace"],
        skipped_final_crates: &[],
        max_entry_count: usize::MAX,
        show_full_path: true,
    };

    fn skips_initial(&self, crate_name: &str) -> bool {
        contains_crate(self.skipped_initial_crates, crate_name)
    }

    fn skips_final(&self, crate_name: &str) -> bool {
        contains_crate(self.skipped_final_crates, crate_name)
    }
}

impl Default for BacktraceFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn contains_crate(list: &[&str], crate_name: &str) -> bool {
    list.iter()
        .any(|candidate| same_crate(candidate, crate_name))
}

fn same_crate(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes()
            .zip(b.bytes())
            .all(|(x, y)| x == y || matches!((x, y), (b'-', b'_') | (b'_', b'-')))
}

#[derive(Debug)]
struct FaultlineEnvOptions {
    rust_backtrace_full: bool,
    show_full_path: bool,
}

impl FaultlineEnvOptions {
    fn get() -> &'static Self {
        static FAULTLINE_FLAGS: OnceLock<FaultlineEnvOptions> = OnceLock::new();

        FAULTLINE_FLAGS.get_or_init(|| {
            let rust_backtrace_full =
                std::env::var_os("RUST_BACKTRACE").is_some_and(|var| var == "full");
            let mut show_full_path = rust_backtrace_full;
            if let Some(var) = std::env::var_os("FAULTLINE_BACKTRACE") {
                for v in var.to_string_lossy().split(',') {
                    if v.trim().eq_ignore_ascii_case("full_paths") {
                        show_full_path = true;
                    }
                }
            }
            FaultlineEnvOptions {
                rust_backtrace_full,
                show_full_path,
            }
        })
    }
}

/// A [`StackProvider`] backed by the [`backtrace`] crate.
///
/// # Examples
///
/// ```rust
/// use faultline_backtrace::{BacktraceFilter, BacktraceProvider};
///
/// let provider = BacktraceProvider {
///     filter: BacktraceFilter {
///         max_entry_count: 30,
///         show_full_path: true,
///         ..BacktraceFilter::DEFAULT
///     },
/// };
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct BacktraceProvider {
    /// Configuration for filtering and formatting frames.
    pub filter: BacktraceFilter,
}

impl BacktraceProvider {
    /// Provider with [`BacktraceFilter::DEFAULT`].
    pub const DEFAULT: Self = Self {
        filter: BacktraceFilter::DEFAULT,
    };

    /// Creates a provider configured from the environment.
    ///
    /// - `RUST_BACKTRACE=full` selects [`BacktraceFilter::FULL`]
    /// - `FAULTLINE_BACKTRACE=full_paths` reports full file paths
    ///
    /// Both variables are read once per process.
    pub fn new_from_env() -> Self {
        let env_options = FaultlineEnvOptions::get();
        Self {
            filter: if env_options.rust_backtrace_full {
                BacktraceFilter::FULL
            } else {
                BacktraceFilter {
                    show_full_path: env_options.show_full_path,
                    ..BacktraceFilter::DEFAULT
                }
            },
        }
    }
}

impl StackProvider for BacktraceProvider {
    fn capture_frames(&self, skip_depth: usize, package_root: &str) -> Vec<StackFrame> {
        capture(&self.filter, skip_depth, package_root)
    }
}

struct RawFrame {
    method: String,
    frame_path: FramePath,
    lineno: Option<u32>,
    crate_name: Option<String>,
}

impl RawFrame {
    fn into_stack_frame(self, show_full_path: bool) -> StackFrame {
        let FramePath {
            raw_path,
            split_path,
            ..
        } = self.frame_path;
        let file = match split_path {
            Some(split_path) if !show_full_path => split_path.suffix,
            _ => raw_path,
        };
        StackFrame {
            file,
            line: self.lineno.unwrap_or(0),
            method: self.method,
            package: self.crate_name,
        }
    }
}

/// Captures the current call stack with `filter`.
///
/// See the [crate documentation](crate#frame-selection) for how `skip_depth`
/// and `package_root` select the frames.
pub fn capture(filter: &BacktraceFilter, skip_depth: usize, package_root: &str) -> Vec<StackFrame> {
    let mut entries: Vec<RawFrame> = Vec::new();
    let mut tracer_frames = true;
    let mut remaining_skip = skip_depth;
    let mut initial_filtering = true;

    backtrace::trace(|frame| {
        backtrace::resolve_frame(frame, |symbol| {
            // Don't consider frames without symbol names or filenames.
            let (Some(sym), Some(filename_raw)) = (symbol.name(), symbol.filename_raw()) else {
                return;
            };
            if entries.len() >= filter.max_entry_count {
                return;
            }

            let method = format!("{sym:#}");
            let frame_path = FramePath::new(filename_raw);
            let crate_name = frame_path
                .crate_name
                .as_deref()
                .or_else(|| symbol_crate(&method))
                .map(str::to_string);

            if tracer_frames {
                if crate_name.as_deref() == Some("backtrace") {
                    return;
                }
                tracer_frames = false;
            }

            if remaining_skip > 0 {
                remaining_skip -= 1;
                return;
            }

            if initial_filtering {
                if let Some(crate_name) = &crate_name
                    && (filter.skips_initial(crate_name) || is_in_package(crate_name, package_root))
                {
                    return;
                }
                initial_filtering = false;
            }

            entries.push(RawFrame {
                method,
                frame_path,
                lineno: symbol.lineno(),
                crate_name,
            });
        });

        entries.len() < filter.max_entry_count
    });

    while let Some(last) = entries.last() {
        let skip = if let Some(crate_name) = &last.crate_name
            && filter.skips_final(crate_name)
        {
            true
        } else {
            last.method == "__libc_start_call_main"
                || last.method == "__libc_start_main_impl"
                || (last.method == "_start" && last.frame_path.raw_path.contains("zig/libc/glibc"))
        };

        if skip {
            entries.pop();
        } else {
            break;
        }
    }

    entries
        .into_iter()
        .map(|entry| entry.into_stack_frame(filter.show_full_path))
        .collect()
}

/// Returns the crate a demangled symbol belongs to.
///
/// That is the first path segment, after any leading `<` of a trait
/// implementation:
///
/// ```text
/// faultline::hook::Hook<N,P>::fire                         -> faultline
/// <alloc::vec::Vec<T> as core::clone::Clone>::clone         -> alloc
/// __libc_start_main                                         -> (none)
/// ```
fn symbol_crate(symbol: &str) -> Option<&str> {
    let symbol = symbol.trim_start_matches('<');
    let mut chars = symbol.char_indices();
    let (_, first) = chars.next()?;
    if !(unicode_ident::is_xid_start(first) || first == '_') {
        return None;
    }
    let end = chars
        .find(|&(_, c)| !unicode_ident::is_xid_continue(c))
        .map_or(symbol.len(), |(i, _)| i);
    let (name, rest) = symbol.split_at(end);
    rest.starts_with("::").then_some(name)
}

impl FramePath {
    fn new(path: BytesOrWideString<'_>) -> Self {
        static REGEXES: OnceLock<[regex::Regex; 2]> = OnceLock::new();
        let [std_regex, registry_regex] = REGEXES.get_or_init(|| {
            [
                // Matches Rust standard library paths:
                // - /lib/rustlib/src/rust/library/{std|core|alloc}/src/...
                // - /rustc/{40-char-hash}/library/{std|core|alloc}/src/...
                regex::Regex::new(
                    r"(?:/lib/rustlib/src/rust|^/rustc/[0-9a-f]{40})/library/(std|core|alloc)/src/.*$",
                )
                .expect("built-in regex pattern for std library paths should be valid"),
                // Matches Cargo registry paths:
                // - /.cargo/registry/src/{index}-{16-char-hash}/{crate}-{version}/src/...
                regex::Regex::new(
                    r"/\.cargo/registry/src/[^/]+-[0-9a-f]{16}/([^./]+)-[0-9]+\.[^/]*/src/.*$",
                )
                .expect("built-in regex pattern for cargo registry paths should be valid"),
            ]
        });

        Self::from_path_str(&path.to_string(), std_regex, registry_regex)
    }

    fn from_path_str(path_str: &str, std_regex: &regex::Regex, registry_regex: &regex::Regex) -> Self {
        let known = [("RUST_SRC", std_regex), ("CARGO", registry_regex)]
            .into_iter()
            .find_map(|(prefix_kind, regex)| {
                let crate_capture = regex.captures(path_str)?.get(1)?;
                Some((prefix_kind, crate_capture))
            });

        match known {
            Some((prefix_kind, crate_capture)) => {
                let split = crate_capture.start();
                let (prefix, suffix) = (&path_str[..split - 1], &path_str[split..]);
                Self {
                    raw_path: path_str.to_string(),
                    crate_name: Some(Cow::Owned(crate_capture.as_str().to_string())),
                    split_path: Some(FramePrefix {
                        prefix_kind,
                        prefix: prefix.to_string(),
                        suffix: suffix.to_string(),
                    }),
                }
            }
            None => Self {
                raw_path: path_str.to_string(),
                crate_name: None,
                split_path: None,
            },
        }
    }
}

/// Extension trait for pairing errors with the frames of the current call
/// site.
///
/// The frames are captured with [`StackCapture::DEFAULT`], so the first frame
/// is the caller of `attribute`. An error that already is a
/// [`ReportableError`] keeps its original frames.
///
/// # Examples
///
/// ```rust
/// use std::io;
///
/// use faultline::{Level, LogEntry};
/// use faultline_backtrace::AttributeExt;
///
/// fn flush() -> Result<(), io::Error> {
///     Err(io::Error::other("broken pipe"))
/// }
///
/// if let Err(error) = flush().attribute() {
///     let entry = LogEntry::new(Level::Error, "flush failed").with_error(error);
///     assert!(entry.fields["error"].as_error().unwrap().frames().is_some());
/// }
/// ```
pub trait AttributeExt: Sized {
    /// The attributed value.
    type Output;

    /// Attributes with the default filter.
    fn attribute(self) -> Self::Output {
        self.attribute_with_filter(&BacktraceFilter::DEFAULT)
    }

    /// Attributes with the specified filter.
    fn attribute_with_filter(self, filter: &BacktraceFilter) -> Self::Output;
}

impl AttributeExt for BoxError {
    type Output = ReportableError;

    fn attribute_with_filter(self, filter: &BacktraceFilter) -> Self::Output {
        match self.downcast::<ReportableError>() {
            Ok(attributed) => *attributed,
            Err(error) => {
                let frames = StackCapture::DEFAULT.capture(&BacktraceProvider { filter: *filter });
                ReportableError::from_shared(error.into(), frames)
            }
        }
    }
}

impl<T, E> AttributeExt for Result<T, E>
where
    E: Into<BoxError>,
{
    type Output = Result<T, ReportableError>;

    fn attribute_with_filter(self, filter: &BacktraceFilter) -> Self::Output {
        self.map_err(|error| error.into().attribute_with_filter(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regexes() -> [regex::Regex; 2] {
        [
            regex::Regex::new(
                r"(?:/lib/rustlib/src/rust|^/rustc/[0-9a-f]{40})/library/(std|core|alloc)/src/.*$",
            )
            .unwrap(),
            regex::Regex::new(
                r"/\.cargo/registry/src/[^/]+-[0-9a-f]{16}/([^./]+)-[0-9]+\.[^/]*/src/.*$",
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_frame_path_std() {
        let [std_regex, registry_regex] = regexes();
        let path = FramePath::from_path_str(
            "/rustc/17067e9ac6d7e98f18d4a4b7e8bd3b8d7c5f3a1b/library/std/src/rt.rs",
            &std_regex,
            &registry_regex,
        );
        assert_eq!(path.crate_name.as_deref(), Some("std"));
        let split = path.split_path.unwrap();
        assert_eq!(split.prefix_kind, "RUST_SRC");
        assert_eq!(split.suffix, "std/src/rt.rs");
    }

    #[test]
    fn test_frame_path_registry() {
        let [std_regex, registry_regex] = regexes();
        let path = FramePath::from_path_str(
            "/home/dev/.cargo/registry/src/index.crates.io-1949cf8c6b5b557f/tracing-core-0.1.34/src/dispatcher.rs",
            &std_regex,
            &registry_regex,
        );
        assert_eq!(path.crate_name.as_deref(), Some("tracing-core"));
        let split = path.split_path.unwrap();
        assert_eq!(split.prefix_kind, "CARGO");
        assert_eq!(split.suffix, "tracing-core-0.1.34/src/dispatcher.rs");
        assert!(split.prefix.ends_with("index.crates.io-1949cf8c6b5b557f"));
    }

    #[test]
    fn test_frame_path_unknown() {
        let [std_regex, registry_regex] = regexes();
        let path = FramePath::from_path_str("/build/src/main.rs", &std_regex, &registry_regex);
        assert!(path.crate_name.is_none());
        assert!(path.split_path.is_none());
        assert_eq!(path.raw_path, "/build/src/main.rs");
    }

    #[test]
    fn test_symbol_crate() {
        assert_eq!(symbol_crate("faultline::hook::Hook<N,P>::fire"), Some("faultline"));
        assert_eq!(
            symbol_crate("<faultline_tracing::FaultlineLayer<N,P> as tracing_subscriber::layer::Layer<S>>::on_event"),
            Some("faultline_tracing")
        );
        assert_eq!(symbol_crate("<alloc::vec::Vec<T> as core::clone::Clone>::clone"), Some("alloc"));
        assert_eq!(symbol_crate("__libc_start_main"), None);
        assert_eq!(symbol_crate("_start"), None);
        assert_eq!(symbol_crate(""), None);
    }

    #[test]
    fn test_same_crate_ignores_separator() {
        assert!(same_crate("tracing-core", "tracing_core"));
        assert!(same_crate("std", "std"));
        assert!(!same_crate("tracing", "tracing_core"));
        assert!(BacktraceFilter::DEFAULT.skips_initial("tracing-subscriber"));
        assert!(!BacktraceFilter::DEFAULT.skips_initial("serde"));
    }

    #[test]
    fn test_capture_keeps_caller_when_not_internal() {
        let frames = capture(&BacktraceFilter::DEFAULT, 0, "not-a-crate");
        assert!(
            frames.iter().any(|frame| frame.method.contains("tests::")),
            "{frames:#?}"
        );
        assert!(frames.iter().all(|frame| frame.package.as_deref() != Some("backtrace")));
    }

    #[test]
    fn test_capture_drops_package_frames() {
        let frames = capture(&BacktraceFilter::DEFAULT, 0, "faultline");
        let first = frames.first().unwrap_or_else(|| panic!("no frames captured"));
        assert!(!first.belongs_to("faultline"), "{frames:#?}");
        assert!(!first.method.contains("faultline_backtrace"), "{frames:#?}");
    }

    #[test]
    fn test_capture_respects_max_entry_count() {
        let filter = BacktraceFilter {
            max_entry_count: 2,
            ..BacktraceFilter::DEFAULT
        };
        assert!(capture(&filter, 0, "not-a-crate").len() <= 2);
    }

    #[test]
    fn test_attribute_keeps_existing_frames() {
        let frames = vec![StackFrame::new("src/db.rs", 9, "app::db::open")];
        let attributed = ReportableError::new(std::io::Error::other("locked"), frames);
        let result: Result<(), ReportableError> = Err(attributed.clone());
        let again = result.attribute().unwrap_err();
        assert!(std::sync::Arc::ptr_eq(again.error(), attributed.error()));
        assert_eq!(again.frames()[0].line, 9);
    }

    #[test]
    fn test_provider_send_sync() {
        static_assertions::assert_impl_all!(BacktraceProvider: Send, Sync, Copy, StackProvider);
    }
}
