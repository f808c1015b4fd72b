use core::cell::{Cell, RefCell};

use heapless::{Deque, String};
use portable_atomic::{AtomicBool, Ordering};
use thermoblink_hal::serial::{SerialError, SerialPort};

use crate::config::SERIAL_BAUD_RATE;

/// Bytes of printed output the stub keeps
pub const OUTPUT_CAPACITY: usize = 1024;

/// Scripted reads the stub can queue
const SCRIPT_CAPACITY: usize = 16;

/// Serial stub with captured output and scripted input
///
/// Each queued entry answers one `read()`: a byte is returned as a
/// one-byte read, an error as a failed read. Once the script is drained,
/// reads return zero bytes and, if configured, raise a stop flag so a
/// run loop under test terminates.
#[derive(Debug)]
pub struct StubSerial<'a> {
    initialized: bool,
    enabled: Cell<bool>,
    output: RefCell<String<OUTPUT_CAPACITY>>,
    script: RefCell<Deque<Result<u8, SerialError>, SCRIPT_CAPACITY>>,
    stop_when_drained: Option<&'a AtomicBool>,
}

impl Default for StubSerial<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> StubSerial<'a> {
    /// Create an initialized stub with output disabled
    pub fn new() -> Self {
        Self {
            initialized: true,
            enabled: Cell::new(false),
            output: RefCell::new(String::new()),
            script: RefCell::new(Deque::new()),
            stop_when_drained: None,
        }
    }

    /// Create a stub that reports a failed initialization
    pub fn uninitialized() -> Self {
        Self {
            initialized: false,
            ..Self::new()
        }
    }

    /// Raise `flag` once the scripted input runs out
    pub fn stop_when_drained(mut self, flag: &'a AtomicBool) -> Self {
        self.stop_when_drained = Some(flag);
        self
    }

    /// Queue a received byte; returns `false` if the script is full
    pub fn push_input(&self, byte: u8) -> bool {
        self.script.borrow_mut().push_back(Ok(byte)).is_ok()
    }

    /// Queue a failed read; returns `false` if the script is full
    pub fn push_error(&self, error: SerialError) -> bool {
        self.script.borrow_mut().push_back(Err(error)).is_ok()
    }

    /// Everything printed so far
    pub fn output(&self) -> String<OUTPUT_CAPACITY> {
        self.output.borrow().clone()
    }

    /// Check if the printed output contains `needle`
    pub fn printed(&self, needle: &str) -> bool {
        self.output.borrow().contains(needle)
    }

    /// Number of times `needle` was printed
    pub fn count(&self, needle: &str) -> usize {
        self.output.borrow().matches(needle).count()
    }

    /// Forget captured output
    pub fn clear_output(&self) {
        self.output.borrow_mut().clear();
    }
}

impl SerialPort for StubSerial<'_> {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    fn baud_rate(&self) -> u32 {
        SERIAL_BAUD_RATE
    }

    fn read(&self, buffer: &mut [u8], _timeout_ms: u16) -> Result<usize, SerialError> {
        if buffer.is_empty() {
            return Err(SerialError::EmptyBuffer);
        }

        match self.script.borrow_mut().pop_front() {
            Some(Ok(byte)) => {
                buffer[0] = byte;
                Ok(1)
            }
            Some(Err(error)) => Err(error),
            None => {
                if let Some(flag) = self.stop_when_drained {
                    flag.store(true, Ordering::Release);
                }
                Ok(0)
            }
        }
    }

    fn print(&self, text: &str) {
        if !self.enabled.get() {
            return;
        }
        let mut output = self.output.borrow_mut();
        for c in text.chars() {
            // Overflowing output is dropped
            if output.push(c).is_err() {
                break;
            }
        }
    }
}
