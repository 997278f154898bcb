//! Stack frame acquisition.
//!
//! Walking the stack is left to a [`StackProvider`]; `faultline-backtrace`
//! ships one built on the `backtrace` crate. Any closure with the signature
//! `Fn(usize, &str) -> Vec<StackFrame>` is a provider too, which keeps tests
//! deterministic:
//!
//! ```
//! use faultline::{StackFrame, stack::{StackCapture, StackProvider}};
//!
//! let provider = |_skip_depth: usize, _package_root: &str| {
//!     vec![StackFrame::new("src/main.rs", 7, "app::main")]
//! };
//!
//! let frames = StackCapture::DEFAULT.capture(&provider);
//! assert_eq!(frames[0].method, "app::main");
//! ```

use crate::error::StackFrame;

/// Produces the call stack of the logical caller.
///
/// Implementations must be callable concurrently from any thread.
pub trait StackProvider: Send + Sync {
    /// Captures the current call stack, innermost frame first.
    ///
    /// `skip_depth` frames of the capture machinery are dropped before
    /// anything is recorded. After that, leading frames belonging to the crate
    /// family rooted at `package_root` are dropped as well, so the first
    /// returned frame is the caller's own code. Capture never fails; it
    /// returns an empty list when nothing could be resolved.
    fn capture_frames(&self, skip_depth: usize, package_root: &str) -> Vec<StackFrame>;
}

impl<F> StackProvider for F
where
    F: Fn(usize, &str) -> Vec<StackFrame> + Send + Sync,
{
    fn capture_frames(&self, skip_depth: usize, package_root: &str) -> Vec<StackFrame> {
        self(skip_depth, package_root)
    }
}

/// Parameters passed to a [`StackProvider`] on every capture.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StackCapture {
    /// Number of frames to drop unconditionally: the provider's own capture
    /// call.
    pub skip_depth: usize,
    /// Crate family whose frames are internal to the reporting machinery.
    pub package_root: &'static str,
}

impl StackCapture {
    /// Drops the provider's own frame and every leading `faultline*` frame.
    pub const DEFAULT: Self = Self {
        skip_depth: 1,
        package_root: "faultline",
    };

    /// Captures frames with these parameters.
    pub fn capture<P: StackProvider + ?Sized>(&self, provider: &P) -> Vec<StackFrame> {
        provider.capture_frames(self.skip_depth, self.package_root)
    }
}

impl Default for StackCapture {
    fn default() -> Self {
        Self::DEFAULT
    }
}
