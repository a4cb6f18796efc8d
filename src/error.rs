//! Error kinds shared by the engine, its handlers and collaborators.
//!
//! Kinds are ordered by increasing severity. When several apply over one
//! accumulation window the higher code dominates (see [`crate::latch`]).

/// Engine error kind, rendered on the wire as `#NNNN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// 0001: Improper state to execute command
    State = 1,
    /// 0002: Invalid command parameter
    Param = 2,
    /// 0003: Invalid command
    Command = 3,
    /// 0004: Framing violation (overflow, out-of-order send, malformed message)
    Protocol = 4,
    /// 0005: Engine contract violation or transmit buffer overflow
    Internal = 5,
    /// 0006: Timeout waiting for a paired device response
    Timeout = 6,
}

impl ErrorKind {
    /// Numeric code sent in error replies.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Convert from the raw code. Returns `None` for 0 and unknown values.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::State),
            2 => Some(Self::Param),
            3 => Some(Self::Command),
            4 => Some(Self::Protocol),
            5 => Some(Self::Internal),
            6 => Some(Self::Timeout),
            _ => None,
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::State => "improper state",
            Self::Param => "invalid parameter",
            Self::Command => "invalid command",
            Self::Protocol => "protocol error",
            Self::Internal => "internal error",
            Self::Timeout => "timeout",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{:04}: {}", self.code(), self.message())
    }
}

/// Failure reported by a transport while queueing a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportError;

/// Failure reported by a peripheral bus (I2C/SPI page access).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusError;

impl From<TransportError> for ErrorKind {
    fn from(_: TransportError) -> Self {
        ErrorKind::Internal
    }
}

impl From<BusError> for ErrorKind {
    fn from(_: BusError) -> Self {
        ErrorKind::Internal
    }
}
