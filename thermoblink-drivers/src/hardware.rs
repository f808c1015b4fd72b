//! Shared hardware state
//!
//! [`Hardware`] is the one owner of everything channels share with each
//! other and with interrupt handlers. It is created once, before any
//! channel, and every channel borrows it. Each piece of state sits
//! behind its own critical-section mutex; callbacks are copied out of
//! their table and invoked after the lock is released, so a callback may
//! freely start, stop or restart timers.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use thermoblink_core::arbiter::{ReserveError, ResourceArbiter};
use thermoblink_core::config::{PIN_COUNT, PORT_COUNT, TIMER_CIRCUITS};
use thermoblink_core::dispatch::{Callback, CallbackDispatch};

use crate::registers::{bit, bits, Port, Reg, RegisterBank};

/// Tick accounting for one timer circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerSlot {
    /// Ticks counted since the last timeout
    pub counter: u32,
    /// Ticks per timeout
    pub max_count: u32,
    /// Ticks are only counted while enabled
    pub enabled: bool,
}

impl TimerSlot {
    pub const IDLE: TimerSlot = TimerSlot {
        counter: 0,
        max_count: 0,
        enabled: false,
    };

    pub fn has_timed_out(&self) -> bool {
        self.enabled && self.counter >= self.max_count
    }
}

struct TimerPool {
    circuits: ResourceArbiter<TIMER_CIRCUITS>,
    slots: [TimerSlot; TIMER_CIRCUITS],
}

type Shared<T> = Mutex<CriticalSectionRawMutex, RefCell<T>>;

/// Registers plus the bookkeeping shared by all channels
pub struct Hardware<R> {
    regs: R,
    pins: Shared<ResourceArbiter<PIN_COUNT>>,
    timers: Shared<TimerPool>,
    port_callbacks: Shared<CallbackDispatch<PORT_COUNT>>,
    timer_callbacks: Shared<CallbackDispatch<TIMER_CIRCUITS>>,
}

impl<R> Hardware<R> {
    /// Wrap `regs` with every resource free and no callbacks
    ///
    /// `const` so the instance can live in a `static` on target.
    pub const fn new(regs: R) -> Self {
        Self {
            regs,
            pins: Mutex::new(RefCell::new(ResourceArbiter::new())),
            timers: Mutex::new(RefCell::new(TimerPool {
                circuits: ResourceArbiter::new(),
                slots: [TimerSlot::IDLE; TIMER_CIRCUITS],
            })),
            port_callbacks: Mutex::new(RefCell::new(CallbackDispatch::new())),
            timer_callbacks: Mutex::new(RefCell::new(CallbackDispatch::new())),
        }
    }

    /// The register bank
    pub fn regs(&self) -> &R {
        &self.regs
    }

    /// Reserve logical pin `pin`
    pub fn reserve_pin(&self, pin: u8) -> Result<(), ReserveError> {
        self.pins
            .lock(|pins| pins.borrow_mut().reserve(usize::from(pin)))
    }

    /// Release logical pin `pin`
    pub fn release_pin(&self, pin: u8) {
        self.pins.lock(|pins| pins.borrow_mut().release(usize::from(pin)));
    }

    /// Check if logical pin `pin` is owned by a channel
    pub fn is_pin_reserved(&self, pin: u8) -> bool {
        self.pins.lock(|pins| pins.borrow().is_reserved(usize::from(pin)))
    }

    /// Reserve the lowest free timer circuit
    pub fn reserve_circuit(&self) -> Option<usize> {
        self.timers
            .lock(|timers| timers.borrow_mut().circuits.reserve_first_free())
    }

    /// Release a timer circuit and forget its tick accounting
    pub fn release_circuit(&self, circuit: usize) {
        self.timers.lock(|timers| {
            let mut timers = timers.borrow_mut();
            timers.circuits.release(circuit);
            if let Some(slot) = timers.slots.get_mut(circuit) {
                *slot = TimerSlot::IDLE;
            }
        });
    }

    /// Number of timer circuits in use
    pub fn circuits_in_use(&self) -> usize {
        self.timers
            .lock(|timers| timers.borrow().circuits.reserved_count())
    }

    /// Run `f` on the tick accounting of `circuit`
    pub(crate) fn with_timer<U>(&self, circuit: usize, f: impl FnOnce(&mut TimerSlot) -> U) -> U {
        self.timers.lock(|timers| {
            let mut timers = timers.borrow_mut();
            let mut idle = TimerSlot::IDLE;
            f(timers.slots.get_mut(circuit).unwrap_or(&mut idle))
        })
    }

    /// Register the pin-change callback of `port`
    pub fn set_port_callback(&self, port: Port, callback: Callback) {
        self.port_callbacks.lock(|table| {
            // Port indexes are always in range
            let _ = table.borrow_mut().add(port.index(), callback);
        });
    }

    /// Check if `port` has a pin-change callback
    pub fn has_port_callback(&self, port: Port) -> bool {
        self.port_callbacks
            .lock(|table| table.borrow().is_set(port.index()))
    }

    /// Register the timeout callback of `circuit`
    pub fn set_timer_callback(&self, circuit: usize, callback: Callback) {
        self.timer_callbacks.lock(|table| {
            if table.borrow_mut().add(circuit, callback).is_err() {
                warn!("hardware: no timer circuit {}", circuit);
            }
        });
    }

    /// Remove the timeout callback of `circuit`
    pub fn clear_timer_callback(&self, circuit: usize) {
        self.timer_callbacks.lock(|table| {
            let _ = table.borrow_mut().remove(circuit);
        });
    }

    /// Check if `circuit` has a timeout callback
    pub fn has_timer_callback(&self, circuit: usize) -> bool {
        self.timer_callbacks
            .lock(|table| table.borrow().is_set(circuit))
    }

    /// Pin-change interrupt entry point for `port`
    ///
    /// Returns `true` if a callback ran.
    pub fn on_pin_change(&self, port: Port) -> bool {
        let callback = self
            .port_callbacks
            .lock(|table| table.borrow().get(port.index()));

        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Timer tick interrupt entry point for `circuit`
    ///
    /// Counts the tick if the circuit is enabled. When the count reaches
    /// the timeout, the circuit's callback runs and the count restarts
    /// from zero. Returns `true` on a timeout.
    pub fn on_timer_tick(&self, circuit: usize) -> bool {
        let timed_out = self.with_timer(circuit, |slot| {
            if !slot.enabled {
                return false;
            }
            slot.counter = slot.counter.saturating_add(1);
            slot.has_timed_out()
        });
        if !timed_out {
            return false;
        }

        let callback = self
            .timer_callbacks
            .lock(|table| table.borrow().get(circuit));
        if let Some(callback) = callback {
            callback();
        }

        self.with_timer(circuit, |slot| slot.counter = 0);
        true
    }
}

impl<R: RegisterBank> Hardware<R> {
    /// Set the global interrupt enable flag
    ///
    /// Called once by start-up code after channels are set up. Channels
    /// never touch the flag themselves.
    pub fn enable_interrupts(&self) {
        // Not a critical section: leaving one would restore the old flag
        let sreg = self.regs.read(Reg::Sreg);
        self.regs.write(Reg::Sreg, sreg | bit(bits::SREG_I));
    }

    /// Check the global interrupt enable flag
    pub fn interrupts_enabled(&self) -> bool {
        self.regs.is_set(Reg::Sreg, bits::SREG_I)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedRegisters;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static PORT_B_CALLS: AtomicUsize = AtomicUsize::new(0);
    static TIMEOUTS: AtomicUsize = AtomicUsize::new(0);

    fn on_port_b() {
        PORT_B_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    fn on_timeout() {
        TIMEOUTS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_pin_reservation() {
        let hw = Hardware::new(SimulatedRegisters::new());
        assert!(hw.reserve_pin(8).is_ok());
        assert!(hw.is_pin_reserved(8));
        assert_eq!(hw.reserve_pin(8), Err(ReserveError::AlreadyReserved));
        assert_eq!(hw.reserve_pin(20), Err(ReserveError::OutOfRange));

        hw.release_pin(8);
        assert!(!hw.is_pin_reserved(8));
    }

    #[test]
    fn test_circuit_pool() {
        let hw = Hardware::new(SimulatedRegisters::new());
        assert_eq!(hw.reserve_circuit(), Some(0));
        assert_eq!(hw.reserve_circuit(), Some(1));
        assert_eq!(hw.reserve_circuit(), Some(2));
        assert_eq!(hw.reserve_circuit(), None);
        assert_eq!(hw.circuits_in_use(), 3);

        hw.release_circuit(1);
        assert_eq!(hw.reserve_circuit(), Some(1));
    }

    #[test]
    fn test_pin_change_dispatch() {
        let hw = Hardware::new(SimulatedRegisters::new());
        assert!(!hw.on_pin_change(Port::B));

        hw.set_port_callback(Port::B, on_port_b);
        assert!(hw.has_port_callback(Port::B));
        assert!(hw.on_pin_change(Port::B));
        assert!(!hw.on_pin_change(Port::C));
        assert_eq!(PORT_B_CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tick_counts_only_when_enabled() {
        let hw = Hardware::new(SimulatedRegisters::new());
        let circuit = hw.reserve_circuit().unwrap();
        hw.set_timer_callback(circuit, on_timeout);
        hw.with_timer(circuit, |slot| slot.max_count = 3);

        assert!(!hw.on_timer_tick(circuit));
        assert_eq!(hw.with_timer(circuit, |slot| slot.counter), 0);

        hw.with_timer(circuit, |slot| slot.enabled = true);
        assert!(!hw.on_timer_tick(circuit));
        assert!(!hw.on_timer_tick(circuit));
        assert!(hw.on_timer_tick(circuit));
        assert_eq!(TIMEOUTS.load(Ordering::SeqCst), 1);

        // Counter restarted after the timeout
        assert_eq!(hw.with_timer(circuit, |slot| slot.counter), 0);
    }

    #[test]
    fn test_tick_on_unknown_circuit() {
        let hw = Hardware::new(SimulatedRegisters::new());
        assert!(!hw.on_timer_tick(7));
    }

    #[test]
    fn test_enable_interrupts() {
        let hw = Hardware::new(SimulatedRegisters::new());
        assert!(!hw.interrupts_enabled());
        hw.enable_interrupts();
        assert!(hw.interrupts_enabled());
    }
}
