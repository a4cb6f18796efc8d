//! Global log stream instance.
//!
//! Single stream shared by the receive callback (interrupt context)
//! and the poll loop. Drained by the firmware main loop.

use crate::logging::LogStream;

/// Command engine log stream.
///
/// Producers: framer byte sink (ISR) and framer poll (main loop).
/// Consumer: [`crate::log_drain::drain_to`] in the main loop.
pub static CLI_LOG: LogStream = LogStream::new();
