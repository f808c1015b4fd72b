use core::cell::Cell;

use thermoblink_hal::timer::{Timer, TimerError};

/// Timer stub whose timeout is signalled by the test
///
/// `set_timed_out(true)` stands in for the tick counter reaching its
/// limit. Stopping or restarting the timer clears the flag, as the real
/// counter would be reset.
#[derive(Debug)]
pub struct StubTimer {
    initialized: bool,
    enabled: Cell<bool>,
    timed_out: Cell<bool>,
    timeout_ms: Cell<u32>,
    restarts: Cell<u32>,
}

impl StubTimer {
    /// Create a stopped stub; a zero timeout leaves it uninitialized
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            initialized: timeout_ms > 0,
            enabled: Cell::new(false),
            timed_out: Cell::new(false),
            timeout_ms: Cell::new(timeout_ms),
            restarts: Cell::new(0),
        }
    }

    /// Signal (or clear) an elapsed timeout
    pub fn set_timed_out(&self, timed_out: bool) {
        self.timed_out.set(timed_out);
    }

    /// Number of `restart()` calls
    pub fn restarts(&self) -> u32 {
        self.restarts.get()
    }
}

impl Timer for StubTimer {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn has_timed_out(&self) -> bool {
        self.enabled.get() && self.timed_out.get()
    }

    fn timeout_ms(&self) -> u32 {
        self.timeout_ms.get()
    }

    fn set_timeout_ms(&self, timeout_ms: u32) -> Result<(), TimerError> {
        if !self.initialized {
            return Err(TimerError::NotInitialized);
        }
        if timeout_ms == 0 {
            return Err(TimerError::ZeroTimeout);
        }
        self.timeout_ms.set(timeout_ms);
        Ok(())
    }

    fn start(&self) {
        if self.initialized {
            self.enabled.set(true);
        }
    }

    fn stop(&self) {
        self.enabled.set(false);
        self.timed_out.set(false);
    }

    fn restart(&self) {
        self.restarts.set(self.restarts.get() + 1);
        self.timed_out.set(false);
        self.start();
    }
}
