//! Register-level drivers for the Thermoblink controller
//!
//! The drivers implement the `thermoblink-hal` device traits on top of a
//! [`RegisterBank`], the narrow seam between driver logic and a concrete
//! chip. Register addresses and bit positions are data
//! ([`registers::PORTS`], [`registers::CIRCUITS`]), not control flow.
//!
//! All shared state lives in one [`Hardware`] instance created at start
//! up and borrowed by every channel:
//!
//! - Pin and timer-circuit ownership
//! - Per-circuit tick counters
//! - Callback tables for pin-change and timer interrupts
//!
//! Interrupt vectors forward to [`Hardware::on_pin_change`] and
//! [`Hardware::on_timer_tick`]. [`sim::SimulatedRegisters`] stands in for
//! the chip on the host.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod board;
pub mod eeprom;
pub mod gpio;
pub mod hardware;
pub mod registers;
pub mod serial;
pub mod sim;
pub mod timer;
pub mod watchdog;

pub use board::{assemble, BoardDevices, Callbacks};
pub use eeprom::PersistentStore;
pub use gpio::GpioChannel;
pub use hardware::Hardware;
pub use registers::{Port, Reg, RegisterBank};
pub use serial::Usart;
pub use sim::SimulatedRegisters;
pub use timer::TimerChannel;
pub use watchdog::{WatchdogTimeout, WatchdogTimer};
