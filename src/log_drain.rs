//! Log output for the command engine.
//!
//! Drains a [`LogStream`] into any `core::fmt::Write` sink (UART, stdout).
//! Runs in the main loop only, never from the receive callback.
//!
//! # Format
//!
//! ```text
//! [timestamp_us] LEVEL: message
//! ```

use core::fmt::Write;

use crate::logging::{LogEntry, LogStream};

/// Format log entry into a buffer.
///
/// Format: `[timestamp_us] LEVEL: message\n`
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    crate::logging::format_to_buffer(
        buf,
        format_args!(
            "[{:10}] {}: {}\n",
            entry.timestamp_us,
            entry.level.as_str(),
            entry.message()
        ),
    )
}

/// Write every pending entry to `out`, then report dropped messages.
///
/// Returns the number of entries written.
pub fn drain_to<const N: usize>(stream: &LogStream<N>, out: &mut dyn Write) -> usize {
    let mut format_buf = [0u8; 160];
    let mut written = 0;

    while let Some(entry) = stream.drain() {
        let len = format_log_entry(&entry, &mut format_buf);
        if let Ok(text) = core::str::from_utf8(&format_buf[..len]) {
            let _ = out.write_str(text);
        }
        written += 1;
    }

    let dropped = stream.dropped();
    if dropped > 0 {
        let _ = writeln!(out, "[WARN] Dropped: {}", dropped);
        stream.reset_dropped();
    }

    written
}
