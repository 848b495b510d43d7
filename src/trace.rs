//! Shared nesting depth for log lines and error traces
//!
//! Readers that descend into a nested structure hold a [`Nest`] guard for
//! the duration of the descent. Log lines prefix themselves with
//! [`indent()`] and error frames record [`depth()`] when they are appended,
//! so interleaved logs and rendered traces line up visually.

use std::cell::Cell;
use std::fmt;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Current nesting depth on this thread.
pub fn depth() -> usize {
    DEPTH.with(|d| d.get())
}

/// Enter one nesting level until the returned guard is dropped.
#[must_use = "the nesting level is left as soon as the guard is dropped"]
pub fn nest() -> Nest {
    DEPTH.with(|d| d.set(d.get() + 1));
    Nest { _private: () }
}

/// RAII guard returned by [`nest`].
pub struct Nest {
    _private: (),
}

impl Drop for Nest {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Indentation for a log line at the current depth.
pub fn indent() -> Indent {
    Indent(depth())
}

/// Two spaces per nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indent(pub usize);

impl fmt::Display for Indent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.0 {
            f.write_str("  ")?;
        }
        Ok(())
    }
}
