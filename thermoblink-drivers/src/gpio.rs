//! GPIO channel driver
//!
//! A [`GpioChannel`] reserves one logical pin for its lifetime. Direction,
//! output and interrupt mask bits are changed with read-modify-write
//! sequences inside a critical section, since interrupt handlers may
//! touch other pins of the same port concurrently.

use core::convert::Infallible;

use thermoblink_core::dispatch::Callback;
use thermoblink_hal::gpio::{Direction, Gpio};

use crate::hardware::Hardware;
use crate::registers::{bit, locate_pin, Port, PortDescriptor, Reg, RegisterBank};

/// One reserved digital pin
pub struct GpioChannel<'a, R: RegisterBank> {
    hw: &'a Hardware<R>,
    pin: u8,
    direction: Direction,
    /// Port and bit position; `None` if the reservation failed
    location: Option<(Port, u8)>,
}

impl<'a, R: RegisterBank> GpioChannel<'a, R> {
    /// Reserve `pin` and configure it as `direction`
    ///
    /// If `callback` is given it becomes the pin-change callback of the
    /// pin's whole port. A pin that is out of range or already owned
    /// yields an uninitialized channel.
    pub fn new(hw: &'a Hardware<R>, pin: u8, direction: Direction, callback: Option<Callback>) -> Self {
        let location = Self::setup(hw, pin, direction, callback);
        Self {
            hw,
            pin,
            direction,
            location,
        }
    }

    fn setup(
        hw: &Hardware<R>,
        pin: u8,
        direction: Direction,
        callback: Option<Callback>,
    ) -> Option<(Port, u8)> {
        if let Err(err) = hw.reserve_pin(pin) {
            warn!("gpio: pin {=u8} unavailable: {}", pin, err);
            return None;
        }
        let Some((port, offset)) = locate_pin(pin) else {
            hw.release_pin(pin);
            return None;
        };

        let desc = port.descriptor();
        let mask = bit(offset);
        let regs = hw.regs();
        critical_section::with(|_| {
            regs.assign_bits(desc.direction, mask, direction.is_output());
            regs.assign_bits(desc.output, mask, direction.has_pullup());
        });

        if let Some(callback) = callback {
            hw.set_port_callback(port, callback);
        }
        debug!("gpio: pin {=u8} configured", pin);
        Some((port, offset))
    }

    /// Logical pin id
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Port the pin belongs to, if initialized
    pub fn port(&self) -> Option<Port> {
        self.location.map(|(port, _)| port)
    }

    /// Check if the output latch is high
    pub fn is_set_high(&self) -> bool {
        self.with_pin(false, |regs, desc, mask| regs.read(desc.output) & mask != 0)
    }

    fn with_pin<U>(&self, default: U, f: impl FnOnce(&R, &PortDescriptor, u8) -> U) -> U {
        match self.location {
            Some((port, offset)) => f(self.hw.regs(), port.descriptor(), bit(offset)),
            None => default,
        }
    }

    fn with_output(&self, f: impl FnOnce(&R, &PortDescriptor, u8)) {
        if self.direction.is_output() {
            self.with_pin((), f);
        }
    }
}

impl<R: RegisterBank> Gpio for GpioChannel<'_, R> {
    fn is_initialized(&self) -> bool {
        self.location.is_some()
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn read(&self) -> bool {
        self.with_pin(false, |regs, desc, mask| regs.read(desc.input) & mask != 0)
    }

    fn write(&self, high: bool) {
        self.with_output(|regs, desc, mask| regs.assign_bits(desc.output, mask, high));
    }

    fn toggle(&self) {
        // Writing a one to the input register flips the output latch
        self.with_output(|regs, desc, mask| regs.write(desc.input, mask));
    }

    fn enable_interrupt(&self, enable: bool) {
        self.with_pin((), |regs, desc, mask| {
            critical_section::with(|_| {
                regs.assign_bits(desc.interrupt_mask, mask, enable);
                if enable {
                    regs.set_bits(Reg::Pcicr, bit(desc.interrupt_enable_bit));
                }
            });
        });
    }

    fn enable_interrupt_on_port(&self, enable: bool) {
        self.with_pin((), |regs, desc, _| {
            regs.assign_bits(Reg::Pcicr, bit(desc.interrupt_enable_bit), enable);
        });
    }

    fn is_interrupt_enabled(&self) -> bool {
        self.with_pin(false, |regs, desc, mask| regs.read(desc.interrupt_mask) & mask != 0)
    }

    fn is_port_interrupt_enabled(&self) -> bool {
        self.with_pin(false, |regs, desc, _| {
            regs.is_set(Reg::Pcicr, desc.interrupt_enable_bit)
        })
    }
}

impl<R: RegisterBank> Drop for GpioChannel<'_, R> {
    fn drop(&mut self) {
        if self.location.is_none() {
            return;
        }
        // Back to a floating input with no interrupt
        self.with_pin((), |regs, desc, mask| {
            critical_section::with(|_| {
                regs.clear_bits(desc.interrupt_mask, mask);
                regs.clear_bits(desc.direction, mask);
                regs.clear_bits(desc.output, mask);
            });
        });
        self.hw.release_pin(self.pin);
    }
}

impl<R: RegisterBank> embedded_hal::digital::ErrorType for GpioChannel<'_, R> {
    type Error = Infallible;
}

impl<R: RegisterBank> embedded_hal::digital::InputPin for GpioChannel<'_, R> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(Gpio::read(self))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!Gpio::read(self))
    }
}

impl<R: RegisterBank> embedded_hal::digital::OutputPin for GpioChannel<'_, R> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Gpio::write(self, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Gpio::write(self, true);
        Ok(())
    }
}

impl<R: RegisterBank> embedded_hal::digital::StatefulOutputPin for GpioChannel<'_, R> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(GpioChannel::is_set_high(self))
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!GpioChannel::is_set_high(self))
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        Gpio::toggle(self);
        Ok(())
    }
}
