//! Board-agnostic core logic for the Thermoblink controller
//!
//! This crate contains the application logic that does not depend on a
//! specific register map:
//!
//! - Exclusive reservation of pins and timer circuits
//! - Interrupt-safe callback dispatch tables
//! - Button debounce state machine
//! - The controller sequencing LED, buttons, timers, serial, watchdog and
//!   persistent state
//! - Configuration types and board limits
//! - In-memory channel stubs for host tests (`stub` feature)

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod arbiter;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod dispatch;
#[cfg(any(test, feature = "stub"))]
pub mod stub;

pub use arbiter::{ReserveError, ResourceArbiter};
pub use controller::{Command, Controller, Devices};
pub use debounce::{DebounceGate, DebounceState};
pub use dispatch::{Callback, CallbackDispatch, DispatchError};
