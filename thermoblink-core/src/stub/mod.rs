//! In-memory channel doubles
//!
//! Every stub implements its device trait with interior mutability, so a
//! test can hand `&stub` to a [`Controller`](crate::Controller) and keep
//! inspecting or driving the stub while the controller is alive. Stubs
//! are `no_std` and usable from downstream crates' tests.

mod eeprom;
mod gpio;
mod serial;
mod tempsensor;
mod timer;
mod watchdog;

pub use eeprom::StubEeprom;
pub use gpio::StubGpio;
pub use serial::{StubSerial, OUTPUT_CAPACITY};
pub use tempsensor::StubTempSensor;
pub use timer::StubTimer;
pub use watchdog::StubWatchdog;
