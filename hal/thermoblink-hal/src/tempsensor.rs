//! Temperature sensor abstraction

/// Temperature sensor
pub trait TemperatureSensor {
    /// Check if the sensor is usable
    fn is_initialized(&self) -> bool;

    /// Read the temperature in whole degrees Celsius
    fn read(&self) -> i16;
}

impl<T: TemperatureSensor + ?Sized> TemperatureSensor for &T {
    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }

    fn read(&self) -> i16 {
        (**self).read()
    }
}
