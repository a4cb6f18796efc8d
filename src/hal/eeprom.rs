//! Paged serial EEPROM access (I2C, AT24C256 class).

use crate::error::BusError;

/// Register/page store reachable over a peripheral bus.
///
/// Implementations may busy-wait for the device write cycle; the
/// engine never calls them from interrupt context.
pub trait PageStore: Sync {
    /// Read `buf.len()` bytes starting at `addr`.
    fn read(&self, addr: u16, buf: &mut [u8]) -> Result<(), BusError>;

    /// Write `data` starting at `addr`. Never crosses a page boundary.
    fn write(&self, addr: u16, data: &[u8]) -> Result<(), BusError>;
}
