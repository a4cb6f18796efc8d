//! Controller-level system services.

/// Reset and boot control.
pub trait SystemControl: Sync {
    /// Arrange for the boot loader to run after the next reset.
    fn schedule_bootloader(&self);

    /// Reset the controller. On hardware this does not return; test
    /// doubles record the request instead.
    fn reset(&self);
}
