//! Latched error state for the receive path.
//!
//! The byte sink runs in interrupt context and cannot report anything
//! directly. It raises an error here, and the condition surfaces later
//! as a single `#NNNN` reply once framing completes.
//!
//! When several errors are raised before the latch is taken, the most
//! severe one wins. The event counter is never cleared.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::error::ErrorKind;

/// Severity-accumulating error latch.
///
/// # Usage
///
/// ```ignore
/// static LATCH: ErrorLatch = ErrorLatch::new();
///
/// // In the receive callback:
/// if overflow {
///     LATCH.raise(ErrorKind::Protocol);
/// }
///
/// // When the command terminator arrives:
/// if let Some(err) = LATCH.take() {
///     publish_error(err);
/// }
/// ```
pub struct ErrorLatch {
    /// Highest error code raised since the last take (0 = none).
    code: AtomicU8,

    /// Total errors raised since boot (never cleared).
    count: AtomicU32,
}

impl ErrorLatch {
    /// Create new latch (no error).
    pub const fn new() -> Self {
        Self {
            code: AtomicU8::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Raise an error. A more severe error already latched is kept.
    #[inline]
    pub fn raise(&self, kind: ErrorKind) {
        self.code.fetch_max(kind.code(), Ordering::AcqRel);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Check if an error is currently latched.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.code.load(Ordering::Acquire) != 0
    }

    /// Currently latched error, without clearing it.
    #[inline]
    pub fn peek(&self) -> Option<ErrorKind> {
        ErrorKind::from_code(self.code.load(Ordering::Acquire))
    }

    /// Take the latched error, clearing the latch.
    #[inline]
    pub fn take(&self) -> Option<ErrorKind> {
        ErrorKind::from_code(self.code.swap(0, Ordering::AcqRel))
    }

    /// Clear the latch without reporting.
    ///
    /// Note: the event counter is preserved for diagnostics.
    #[inline]
    pub fn clear(&self) {
        self.code.store(0, Ordering::Release);
    }

    /// Get total error count since boot.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for ErrorLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_basic() {
        let latch = ErrorLatch::new();

        assert!(!latch.is_active());
        assert_eq!(latch.peek(), None);

        latch.raise(ErrorKind::Protocol);

        assert!(latch.is_active());
        assert_eq!(latch.peek(), Some(ErrorKind::Protocol));
        assert_eq!(latch.take(), Some(ErrorKind::Protocol));
        assert!(!latch.is_active());
        assert_eq!(latch.count(), 1);
    }

    #[test]
    fn test_most_severe_wins() {
        let latch = ErrorLatch::new();

        latch.raise(ErrorKind::Param);
        latch.raise(ErrorKind::Internal);
        latch.raise(ErrorKind::Protocol);

        assert_eq!(latch.take(), Some(ErrorKind::Internal));
        assert_eq!(latch.count(), 3);
    }

    #[test]
    fn test_clear_preserves_count() {
        let latch = ErrorLatch::new();

        latch.raise(ErrorKind::Protocol);
        latch.clear();
        latch.raise(ErrorKind::State);

        assert_eq!(latch.peek(), Some(ErrorKind::State));
        assert_eq!(latch.count(), 2);
    }
}
