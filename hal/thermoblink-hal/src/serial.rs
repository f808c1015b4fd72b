//! Serial port abstraction
//!
//! Output is plain text. Input is read as raw bytes with a cooperative
//! millisecond timeout.

use core::fmt;

/// Errors from serial reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// The destination buffer has no room for a single byte
    EmptyBuffer,
    /// A received byte was lost because the receive buffer was full
    Overrun,
    /// A received byte had no valid stop bit
    Framing,
}

/// Serial port
pub trait SerialPort {
    /// Check if the port is usable
    fn is_initialized(&self) -> bool;

    /// Check if output is enabled
    fn is_enabled(&self) -> bool;

    /// Enable or disable output
    fn set_enabled(&self, enabled: bool);

    /// Configured baud rate in bits per second
    fn baud_rate(&self) -> u32;

    /// Read received bytes into `buffer`
    ///
    /// Waits up to `timeout_ms` for the buffer to fill and returns the
    /// number of bytes read. A timeout of zero waits until the buffer is
    /// full.
    fn read(&self, buffer: &mut [u8], timeout_ms: u16) -> Result<usize, SerialError>;

    /// Transmit text; ignored while output is disabled
    fn print(&self, text: &str);

    /// Transmit formatted text
    fn print_fmt(&self, args: fmt::Arguments<'_>) {
        // Writer never fails, so neither does formatting
        let _ = fmt::write(&mut Writer(self), args);
    }
}

/// [`fmt::Write`] adapter that streams into a [`SerialPort`]
pub struct Writer<'a, S: ?Sized>(pub &'a S);

impl<S: SerialPort + ?Sized> fmt::Write for Writer<'_, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.print(s);
        Ok(())
    }
}

impl<T: SerialPort + ?Sized> SerialPort for &T {
    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        (**self).set_enabled(enabled)
    }

    fn baud_rate(&self) -> u32 {
        (**self).baud_rate()
    }

    fn read(&self, buffer: &mut [u8], timeout_ms: u16) -> Result<usize, SerialError> {
        (**self).read(buffer, timeout_ms)
    }

    fn print(&self, text: &str) {
        (**self).print(text)
    }
}
