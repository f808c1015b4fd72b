use core::cell::Cell;

use thermoblink_hal::tempsensor::TemperatureSensor;

/// Temperature sensor stub returning a fixed value
#[derive(Debug)]
pub struct StubTempSensor {
    celsius: Cell<i16>,
    reads: Cell<u32>,
}

impl StubTempSensor {
    /// Create a stub reporting `celsius`
    pub fn new(celsius: i16) -> Self {
        Self {
            celsius: Cell::new(celsius),
            reads: Cell::new(0),
        }
    }

    /// Change the reported temperature
    pub fn set_celsius(&self, celsius: i16) {
        self.celsius.set(celsius);
    }

    /// Number of `read()` calls
    pub fn reads(&self) -> u32 {
        self.reads.get()
    }
}

impl TemperatureSensor for StubTempSensor {
    fn is_initialized(&self) -> bool {
        true
    }

    fn read(&self) -> i16 {
        self.reads.set(self.reads.get() + 1);
        self.celsius.get()
    }
}
