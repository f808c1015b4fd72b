//! Button debounce gate
//!
//! A two-state machine driven by one timer. Servicing a button edge moves
//! the gate from [`DebounceState::Idle`] to [`DebounceState::Settling`]
//! and starts the timer; the gate only returns to idle once the timer
//! reports its timeout. Edges seen while settling are contact bounce and
//! are ignored by the caller.
//!
//! The state is read from the timer itself (running means settling), so
//! the gate and its timer can never disagree.

use thermoblink_hal::timer::Timer;

/// Debounce state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceState {
    /// Button edges are serviced
    Idle,
    /// Waiting out contact bounce; button edges are ignored
    Settling,
}

/// Debounce gate owning its settle timer
#[derive(Debug)]
pub struct DebounceGate<T> {
    timer: T,
}

impl<T: Timer> DebounceGate<T> {
    /// Create an idle gate around `timer`
    pub fn new(timer: T) -> Self {
        Self { timer }
    }

    /// Current state
    pub fn state(&self) -> DebounceState {
        if self.timer.is_enabled() {
            DebounceState::Settling
        } else {
            DebounceState::Idle
        }
    }

    /// Check if button edges should be serviced
    pub fn is_idle(&self) -> bool {
        self.state() == DebounceState::Idle
    }

    /// Enter the settle window
    ///
    /// Returns `false` and leaves the timer alone if already settling.
    pub fn settle(&self) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.timer.start();
        trace!("debounce: settling");
        true
    }

    /// Leave the settle window if the timer has elapsed
    ///
    /// Returns `true` on the transition back to idle.
    pub fn release(&self) -> bool {
        if !self.timer.has_timed_out() {
            return false;
        }
        self.timer.stop();
        trace!("debounce: idle");
        true
    }

    /// Abandon the settle window without waiting for the timeout
    pub fn cancel(&self) {
        self.timer.stop();
    }

    /// Check if the settle timer is usable
    pub fn is_initialized(&self) -> bool {
        self.timer.is_initialized()
    }

    /// The settle timer
    pub fn timer(&self) -> &T {
        &self.timer
    }
}
