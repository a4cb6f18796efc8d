//! GPIO HAL for control lines driven by the host.

use crate::scpi::Port;

/// Push-pull output pin that can read back its driven level.
pub trait OutputPin: Sync {
    fn is_set_high(&self) -> bool;
    fn set_level(&self, high: bool);
}

/// Logical view of an active-low line (e.g. `nRST`): `true` = low.
pub struct ActiveLow<'a>(pub &'a dyn OutputPin);

impl Port<bool> for ActiveLow<'_> {
    fn get(&self) -> bool {
        !self.0.is_set_high()
    }

    fn set(&self, value: bool) {
        self.0.set_level(!value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};

    struct Pin(AtomicBool);

    impl OutputPin for Pin {
        fn is_set_high(&self) -> bool {
            self.0.load(Ordering::Relaxed)
        }
        fn set_level(&self, high: bool) {
            self.0.store(high, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_active_low_inverts() {
        let pin = Pin(AtomicBool::new(true));
        let line = ActiveLow(&pin);

        assert!(!line.get());
        line.set(true);
        assert!(!pin.is_set_high());
        assert!(line.get());
    }

    #[test]
    fn test_active_low_release() {
        let pin = Pin(AtomicBool::new(false));
        let line = ActiveLow(&pin);

        assert!(line.get());
        line.set(false);
        assert!(pin.is_set_high());
    }
}
