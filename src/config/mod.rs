//! Module: config
//!
//! Purpose: Compile-time configuration for the controller.
//!
//! Architecture:
//! - Wire constants: terminator, resync abort char, error reply format
//! - Buffer sizes for the framer (static, no heap)
//! - Instrument identity reported by *IDN? and :SYSTem:VERSion?
//! - Feature bits for the command tree enabled mask
//!
//! Safety: RT-safe. Everything here is `const`.

/// Command and reply terminator.
pub const TERMINATOR: u8 = b'\r';

/// Abort character. Followed by [`TERMINATOR`] it forms the resync token.
pub const ABORT: u8 = b'-';

/// Receive slot capacity: command bytes, terminator excluded.
pub const RX_BUFFER_SIZE: usize = 0x1100;

/// Transmit buffer capacity (bytes, terminator included).
pub const TX_BUFFER_SIZE: usize = 0x1100;

/// Number of decimal digits in an error reply (`#0004`).
pub const ERROR_CODE_WIDTH: usize = 4;

/// Build identification injected by build.rs (includes git hash).
pub const BUILD_STRING: &str = env!("VERSION_STRING");

/// Framing parameters.
#[derive(Clone, Copy)]
pub struct FramingConfig {
    /// Line terminator for commands and replies.
    pub terminator: u8,
    /// Abort character of the resync token.
    pub abort: u8,
    /// Monotonic clock used to timestamp log entries (µs).
    pub clock: fn() -> i64,
}

impl FramingConfig {
    /// Default wire framing: `\r` terminated lines, `-\r` resync.
    pub const DEFAULT: Self = Self {
        terminator: TERMINATOR,
        abort: ABORT,
        clock: no_clock,
    };

    /// Same framing with a real clock for log timestamps.
    pub const fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn no_clock() -> i64 {
    0
}

/// Instrument identity.
#[derive(Clone, Copy, Debug)]
pub struct Identity {
    pub vendor: &'static str,
    pub family: &'static str,
    pub version_major: u8,
    pub version_minor: u8,
    pub revision: u8,
}

/// Identity of this controller firmware.
pub const IDENTITY: Identity = Identity {
    vendor: "TeraSense",
    family: "SmartVision",
    version_major: 0,
    version_minor: 1,
    revision: 1,
};

/// Feature bits for [`crate::scpi::Tree::enable`].
pub mod features {
    /// Diagnostic TEST subsystem.
    pub const TEST: u32 = 1 << 0;
    /// Peripheral EEPROM access.
    pub const EEPROM: u32 = 1 << 1;
}

/// EEPROM geometry (AT24C256 class device).
pub mod eeprom {
    /// One past the last valid byte address.
    pub const ADDR_END: u32 = 0x8000;
    /// Page size; writes may not cross a page boundary.
    pub const PAGE_SIZE: usize = 64;
}
