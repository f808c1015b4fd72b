use core::cell::Cell;

use thermoblink_hal::watchdog::{Watchdog, WatchdogError};

use crate::config::DEFAULT_WATCHDOG_TIMEOUT_MS;

/// Watchdog stub counting acknowledgements
#[derive(Debug)]
pub struct StubWatchdog {
    enabled: Cell<bool>,
    timeout_ms: Cell<u16>,
    resets: Cell<u32>,
}

impl Default for StubWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl StubWatchdog {
    /// Create a disabled stub with the default timeout
    pub fn new() -> Self {
        Self {
            enabled: Cell::new(false),
            timeout_ms: Cell::new(DEFAULT_WATCHDOG_TIMEOUT_MS),
            resets: Cell::new(0),
        }
    }

    /// Number of `reset()` calls
    pub fn resets(&self) -> u32 {
        self.resets.get()
    }
}

impl Watchdog for StubWatchdog {
    fn is_initialized(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    fn timeout_ms(&self) -> u16 {
        self.timeout_ms.get()
    }

    fn set_timeout_ms(&self, timeout_ms: u16) -> Result<(), WatchdogError> {
        if !timeout_ms.is_power_of_two() || !(16..=8192).contains(&timeout_ms) {
            return Err(WatchdogError::UnsupportedTimeout);
        }
        self.timeout_ms.set(timeout_ms);
        Ok(())
    }

    fn reset(&self) {
        self.resets.set(self.resets.get() + 1);
    }
}
