//! Bounded reply buffer handed to handlers.
//!
//! Handlers append raw bytes or formatted text. Overflow is an
//! [`ErrorKind::Internal`] error and leaves the buffer as it was before
//! the failed append.

use core::fmt;

use crate::error::ErrorKind;

/// Reply under construction, backed by the framer's transmit buffer.
pub struct Reply<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> Reply<'a> {
    /// Wrap an empty transmit buffer.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    /// Append raw bytes.
    pub fn put(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        let end = self.len + bytes.len();
        if end > self.buf.len() {
            return Err(ErrorKind::Internal);
        }
        self.buf[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }

    /// Append formatted text. Use through [`reply!`](crate::reply).
    pub fn print(&mut self, args: fmt::Arguments<'_>) -> Result<(), ErrorKind> {
        let mark = self.len;
        fmt::write(&mut *self, args).map_err(|_| {
            self.len = mark;
            ErrorKind::Internal
        })
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Get reply length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free space left.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.len
    }

    /// Drop everything written so far.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl fmt::Write for Reply<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.put(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

/// Append formatted text to a [`Reply`], `printf` style.
///
/// ```ignore
/// reply!(out, "{}", value)?;
/// ```
#[macro_export]
macro_rules! reply {
    ($out:expr, $($arg:tt)*) => {
        $out.print(format_args!($($arg)*))
    };
}
