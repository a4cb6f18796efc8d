//! `:SYSTem:RESet[:LOADer]` actions.

use crate::error::ErrorKind;
use crate::hal::SystemControl;
use crate::scpi::{Handler, Reply};

/// Controller reset. Bound as the default action of the `RESet`
/// directory, so it also runs after `:SYSTem:RESet:LOADer`.
pub struct Reset<'a>(pub &'a dyn SystemControl);

impl Handler for Reset<'_> {
    fn handle(&self, _input: &[u8], _out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
        self.0.reset();
        Ok(0)
    }
}

/// Arrange for the boot loader to start after the next reset.
pub struct Loader<'a>(pub &'a dyn SystemControl);

impl Handler for Loader<'_> {
    fn handle(&self, _input: &[u8], _out: &mut Reply<'_>) -> Result<usize, ErrorKind> {
        self.0.schedule_bootloader();
        Ok(0)
    }
}
