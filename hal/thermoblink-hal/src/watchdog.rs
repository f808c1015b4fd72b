//! Watchdog abstraction

/// Errors from watchdog configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogError {
    /// The hardware has no prescaler setting for the requested timeout
    UnsupportedTimeout,
}

/// Watchdog timer
///
/// Once enabled, the device resets unless [`Watchdog::reset`] is called
/// at least once per timeout period.
pub trait Watchdog {
    /// Check if the watchdog is usable
    fn is_initialized(&self) -> bool;

    /// Check if the watchdog is armed
    fn is_enabled(&self) -> bool;

    /// Arm or disarm the watchdog
    fn set_enabled(&self, enabled: bool);

    /// Current timeout in milliseconds
    fn timeout_ms(&self) -> u16;

    /// Change the timeout
    fn set_timeout_ms(&self, timeout_ms: u16) -> Result<(), WatchdogError>;

    /// Acknowledge the watchdog, restarting its countdown
    fn reset(&self);
}

impl<T: Watchdog + ?Sized> Watchdog for &T {
    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        (**self).set_enabled(enabled)
    }

    fn timeout_ms(&self) -> u16 {
        (**self).timeout_ms()
    }

    fn set_timeout_ms(&self, timeout_ms: u16) -> Result<(), WatchdogError> {
        (**self).set_timeout_ms(timeout_ms)
    }

    fn reset(&self) {
        (**self).reset()
    }
}
