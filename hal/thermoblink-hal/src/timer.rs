//! Timer channel abstraction
//!
//! A timer channel turns periodic hardware ticks into a millisecond
//! timeout. Once the timeout elapses the channel reports
//! [`Timer::has_timed_out`] until its tick counter is reset.

/// Errors from timer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// A timeout of zero milliseconds was requested
    ZeroTimeout,
    /// The channel never obtained a timer circuit
    NotInitialized,
}

/// Millisecond timer channel
pub trait Timer {
    /// Check if a timer circuit was reserved for this channel
    fn is_initialized(&self) -> bool;

    /// Check if the channel is counting ticks
    fn is_enabled(&self) -> bool;

    /// Check if the channel is enabled and its timeout has elapsed
    fn has_timed_out(&self) -> bool;

    /// Current timeout in milliseconds, rounded to the tick resolution
    fn timeout_ms(&self) -> u32;

    /// Change the timeout
    ///
    /// A zero timeout is rejected and the previous timeout kept.
    fn set_timeout_ms(&self, timeout_ms: u32) -> Result<(), TimerError>;

    /// Start counting ticks
    fn start(&self);

    /// Stop counting ticks
    fn stop(&self);

    /// Start the timer if stopped, stop it if running
    fn toggle(&self) {
        if self.is_enabled() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Zero the tick counter and start the timer
    fn restart(&self);
}

impl<T: Timer + ?Sized> Timer for &T {
    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn has_timed_out(&self) -> bool {
        (**self).has_timed_out()
    }

    fn timeout_ms(&self) -> u32 {
        (**self).timeout_ms()
    }

    fn set_timeout_ms(&self, timeout_ms: u32) -> Result<(), TimerError> {
        (**self).set_timeout_ms(timeout_ms)
    }

    fn start(&self) {
        (**self).start()
    }

    fn stop(&self) {
        (**self).stop()
    }

    fn toggle(&self) {
        (**self).toggle()
    }

    fn restart(&self) {
        (**self).restart()
    }
}
