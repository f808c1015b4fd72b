//! USART driver
//!
//! Polled transmit and receive at a fixed baud rate. Reads wait in
//! one-millisecond steps on an [`embedded_hal::delay::DelayNs`] so the
//! timeout holds on any clock.

use embedded_hal::delay::DelayNs;
use portable_atomic::{AtomicBool, Ordering};
use thermoblink_core::config::SERIAL_BAUD_RATE;
use thermoblink_hal::serial::{SerialError, SerialPort};

use crate::hardware::Hardware;
use crate::registers::{bit, bits, Reg, RegisterBank};

/// CPU clock feeding the baud rate generator
pub const CPU_FREQUENCY_HZ: u32 = 16_000_000;

/// Baud rate register value for `baud` in normal speed mode
pub const fn baud_divisor(baud: u32) -> u16 {
    let divisor = (CPU_FREQUENCY_HZ + 8 * baud) / (16 * baud);
    (divisor - 1) as u16
}

/// Serial port on USART0
pub struct Usart<'a, R: RegisterBank, D> {
    hw: &'a Hardware<R>,
    delay: D,
    enabled: AtomicBool,
}

impl<'a, R: RegisterBank, D: DelayNs + Clone> Usart<'a, R, D> {
    /// Configure 8N1 framing at 9600 baud with output enabled
    pub fn new(hw: &'a Hardware<R>, delay: D) -> Self {
        let regs = hw.regs();
        critical_section::with(|_| {
            regs.write_u16(Reg::Ubrr0l, Reg::Ubrr0h, baud_divisor(SERIAL_BAUD_RATE));
            regs.write(Reg::Ucsr0c, bit(bits::UCSZ00) | bit(bits::UCSZ01));
            regs.write(Reg::Ucsr0b, bit(bits::TXEN0) | bit(bits::RXEN0));
        });

        let usart = Self {
            hw,
            delay,
            enabled: AtomicBool::new(true),
        };
        // Start output on a fresh line
        usart.transmit(b'\r');
        usart
    }

    /// Send one byte once the data register is free
    pub fn transmit(&self, byte: u8) {
        let regs = self.hw.regs();
        while !regs.is_set(Reg::Ucsr0a, bits::UDRE0) {}
        regs.write(Reg::Udr0, byte);
    }

    /// Take one received byte, if any
    pub fn receive(&self) -> Option<Result<u8, SerialError>> {
        let regs = self.hw.regs();
        let status = regs.read(Reg::Ucsr0a);
        if status & bit(bits::RXC0) == 0 {
            return None;
        }
        // The data register must be read to clear the error flags
        let byte = regs.read(Reg::Udr0);
        if status & bit(bits::FE0) != 0 {
            return Some(Err(SerialError::Framing));
        }
        if status & bit(bits::DOR0) != 0 {
            return Some(Err(SerialError::Overrun));
        }
        Some(Ok(byte))
    }

    /// Move received bytes into `buffer` from `filled` on
    fn drain(&self, buffer: &mut [u8], mut filled: usize) -> Result<usize, SerialError> {
        while filled < buffer.len() {
            match self.receive() {
                Some(byte) => {
                    buffer[filled] = byte?;
                    filled += 1;
                }
                None => break,
            }
        }
        Ok(filled)
    }
}

impl<R: RegisterBank, D: DelayNs + Clone> SerialPort for Usart<'_, R, D> {
    fn is_initialized(&self) -> bool {
        let control = self.hw.regs().read(Reg::Ucsr0b);
        let both = bit(bits::TXEN0) | bit(bits::RXEN0);
        control & both == both
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn baud_rate(&self) -> u32 {
        SERIAL_BAUD_RATE
    }

    fn read(&self, buffer: &mut [u8], timeout_ms: u16) -> Result<usize, SerialError> {
        if buffer.is_empty() {
            return Err(SerialError::EmptyBuffer);
        }

        let mut delay = self.delay.clone();
        let mut filled = self.drain(buffer, 0)?;
        let mut waited = 0u16;
        while filled < buffer.len() && (timeout_ms == 0 || waited < timeout_ms) {
            delay.delay_ms(1);
            waited = waited.saturating_add(1);
            filled = self.drain(buffer, filled)?;
        }

        trace!("serial: read {} bytes", filled);
        Ok(filled)
    }

    fn print(&self, text: &str) {
        if !self.is_enabled() {
            return;
        }
        for byte in text.bytes() {
            match byte {
                b'\n' | b'\r' => {
                    self.transmit(b'\n');
                    self.transmit(b'\r');
                }
                _ => self.transmit(byte),
            }
        }
    }
}
