//! Byte-stream transport (USB CDC / UART) seen from the poll loop.

use crate::error::TransportError;

/// Reply path of the host link.
pub trait Transport {
    /// Host attached and configured.
    fn is_connected(&self) -> bool;

    /// A previous transmission is still draining.
    fn is_busy(&self) -> bool;

    /// Queue one complete reply.
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}
