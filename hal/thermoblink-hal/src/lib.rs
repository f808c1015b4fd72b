//! Thermoblink Hardware Abstraction Layer
//!
//! This crate defines the device traits the controller is written against.
//! Register-level drivers implement them for a concrete chip, and in-memory
//! stubs implement them for host tests, so the same controller logic runs
//! on both.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  thermoblink-core (controller, stubs)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  thermoblink-hal (this crate - traits)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  thermoblink-drivers (register level)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Every method takes `&self`. A channel is touched from the main loop and
//! from interrupt handlers alike, so implementations keep their state in
//! hardware registers, atomics or critical-section protected cells.
//!
//! # Traits
//!
//! - [`gpio::Gpio`] - Digital I/O with pin-change interrupts
//! - [`timer::Timer`] - Millisecond timeouts built from hardware ticks
//! - [`serial::SerialPort`] - Text output and byte input
//! - [`watchdog::Watchdog`] - Device reset on a stuck main loop
//! - [`eeprom::Eeprom`] - Byte-addressed persistent storage
//! - [`tempsensor::TemperatureSensor`] - Temperature in whole degrees

#![no_std]
#![deny(unsafe_code)]

pub mod eeprom;
pub mod gpio;
pub mod serial;
pub mod tempsensor;
pub mod timer;
pub mod watchdog;

// Re-export key traits at crate root for convenience
pub use eeprom::{Eeprom, StoreError, StoreValue};
pub use gpio::{Direction, Gpio};
pub use serial::{SerialError, SerialPort};
pub use tempsensor::TemperatureSensor;
pub use timer::{Timer, TimerError};
pub use watchdog::{Watchdog, WatchdogError};
