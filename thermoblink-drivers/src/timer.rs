//! Timer channel driver
//!
//! A [`TimerChannel`] owns one of the hardware timer circuits. The
//! circuit raises a tick interrupt at a fixed interval; the channel
//! converts its millisecond timeout into a tick count once, at
//! construction, and [`Hardware::on_timer_tick`] does the counting.

use thermoblink_core::dispatch::Callback;
use thermoblink_hal::timer::{Timer, TimerError};

use crate::hardware::{Hardware, TimerSlot};
use crate::registers::{bit, CircuitDescriptor, RegisterBank, CIRCUITS};

/// Number of ticks closest to `timeout_ms`
pub fn ticks_for(timeout_ms: u32, tick_interval_us: u32) -> u32 {
    let tick = u64::from(tick_interval_us.max(1));
    let ticks = (u64::from(timeout_ms) * 1000 + tick / 2) / tick;
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

/// Milliseconds covered by `ticks`, rounded to the nearest millisecond
pub fn millis_for(ticks: u32, tick_interval_us: u32) -> u32 {
    let micros = u64::from(ticks) * u64::from(tick_interval_us);
    u32::try_from((micros + 500) / 1000).unwrap_or(u32::MAX)
}

/// One reserved timer circuit
pub struct TimerChannel<'a, R: RegisterBank> {
    hw: &'a Hardware<R>,
    /// `None` if no circuit was reserved
    circuit: Option<usize>,
}

impl<'a, R: RegisterBank> TimerChannel<'a, R> {
    /// Reserve a circuit ticking towards `timeout_ms`, stopped
    ///
    /// A zero timeout, or no free circuit, yields an uninitialized
    /// channel. `callback` runs from the tick interrupt on every timeout.
    pub fn new(hw: &'a Hardware<R>, timeout_ms: u32, callback: Option<Callback>) -> Self {
        let circuit = Self::setup(hw, timeout_ms, callback);
        Self { hw, circuit }
    }

    fn setup(hw: &Hardware<R>, timeout_ms: u32, callback: Option<Callback>) -> Option<usize> {
        if timeout_ms == 0 {
            warn!("timer: zero timeout");
            return None;
        }
        let Some(circuit) = hw.reserve_circuit() else {
            warn!("timer: no free circuit for {=u32} ms", timeout_ms);
            return None;
        };

        let desc = &CIRCUITS[circuit];
        let max_count = ticks_for(timeout_ms, desc.tick_interval_us);
        let regs = hw.regs();
        critical_section::with(|_| {
            regs.write(desc.control, desc.prescaler);
            if let Some(compare) = desc.compare {
                regs.write_u16(compare.low, compare.high, compare.value);
            }
        });
        hw.with_timer(circuit, |slot| {
            *slot = TimerSlot {
                max_count,
                ..TimerSlot::IDLE
            }
        });

        if let Some(callback) = callback {
            hw.set_timer_callback(circuit, callback);
        }
        debug!("timer: circuit {} counts {=u32} ticks", circuit, max_count);
        Some(circuit)
    }

    /// Reserved circuit, if initialized
    pub fn circuit(&self) -> Option<usize> {
        self.circuit
    }

    /// Ticks counted towards the next timeout
    pub fn counter(&self) -> u32 {
        self.slot(0, |slot| slot.counter)
    }

    /// Ticks per timeout
    pub fn max_count(&self) -> u32 {
        self.slot(0, |slot| slot.max_count)
    }

    /// Count one tick, as the tick interrupt does
    ///
    /// Returns `true` if the timeout elapsed and the callback ran.
    pub fn handle_callback(&self) -> bool {
        self.circuit
            .is_some_and(|circuit| self.hw.on_timer_tick(circuit))
    }

    fn slot<U>(&self, default: U, f: impl FnOnce(&mut TimerSlot) -> U) -> U {
        match self.circuit {
            Some(circuit) => self.hw.with_timer(circuit, f),
            None => default,
        }
    }

    fn descriptor(&self) -> Option<&'static CircuitDescriptor> {
        self.circuit.map(|circuit| &CIRCUITS[circuit])
    }
}

impl<R: RegisterBank> Timer for TimerChannel<'_, R> {
    fn is_initialized(&self) -> bool {
        self.circuit.is_some()
    }

    fn is_enabled(&self) -> bool {
        self.slot(false, |slot| slot.enabled)
    }

    fn has_timed_out(&self) -> bool {
        self.slot(false, |slot| slot.has_timed_out())
    }

    fn timeout_ms(&self) -> u32 {
        match self.descriptor() {
            Some(desc) => millis_for(self.max_count(), desc.tick_interval_us),
            None => 0,
        }
    }

    fn set_timeout_ms(&self, timeout_ms: u32) -> Result<(), TimerError> {
        let desc = self.descriptor().ok_or(TimerError::NotInitialized)?;
        let max_count = ticks_for(timeout_ms, desc.tick_interval_us);
        if max_count == 0 {
            return Err(TimerError::ZeroTimeout);
        }
        self.slot((), |slot| slot.max_count = max_count);
        Ok(())
    }

    fn start(&self) {
        let (Some(circuit), Some(desc)) = (self.circuit, self.descriptor()) else {
            return;
        };
        critical_section::with(|_| {
            let started = self.hw.with_timer(circuit, |slot| {
                slot.enabled = slot.max_count > 0;
                slot.enabled
            });
            if started {
                self.hw
                    .regs()
                    .set_bits(desc.interrupt_mask, bit(desc.interrupt_bit));
            }
        });
    }

    fn stop(&self) {
        let (Some(circuit), Some(desc)) = (self.circuit, self.descriptor()) else {
            return;
        };
        critical_section::with(|_| {
            self.hw
                .regs()
                .clear_bits(desc.interrupt_mask, bit(desc.interrupt_bit));
            self.hw.with_timer(circuit, |slot| slot.enabled = false);
        });
    }

    fn restart(&self) {
        self.slot((), |slot| slot.counter = 0);
        self.start();
    }
}

impl<R: RegisterBank> Drop for TimerChannel<'_, R> {
    fn drop(&mut self) {
        let (Some(circuit), Some(desc)) = (self.circuit, self.descriptor()) else {
            return;
        };
        let regs = self.hw.regs();
        critical_section::with(|_| {
            regs.clear_bits(desc.interrupt_mask, bit(desc.interrupt_bit));
            regs.write(desc.control, 0);
            if let Some(compare) = desc.compare {
                regs.write_u16(compare.low, compare.high, 0);
            }
        });
        self.hw.clear_timer_callback(circuit);
        self.hw.release_circuit(circuit);
    }
}
