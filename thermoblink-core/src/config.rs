//! Board limits and wiring configuration
//!
//! The limits describe the reference board (an 8-bit AVR with 20 GPIO
//! lines, three timer circuits and 1 KiB of EEPROM). [`BoardConfig`]
//! describes how the controller's devices are wired to it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of logical GPIO pins
pub const PIN_COUNT: usize = 20;

/// Number of GPIO port groups, each with its own pin-change interrupt
pub const PORT_COUNT: usize = 3;

/// Number of hardware timer circuits
pub const TIMER_CIRCUITS: usize = 3;

/// Time between two hardware timer ticks in microseconds
pub const TICK_INTERVAL_US: u32 = 128;

/// Persistent store size in bytes
pub const STORE_SIZE: u16 = 1024;

/// Persistent address of the toggle timer state (one byte, 0 or 1)
pub const TOGGLE_STATE_ADDRESS: u16 = 0;

/// Serial baud rate
pub const SERIAL_BAUD_RATE: u32 = 9600;

/// Bytes read per serial command poll
pub const COMMAND_BUFFER_LEN: usize = 5;

/// How long a serial command poll waits for input
pub const COMMAND_READ_TIMEOUT_MS: u16 = 100;

/// Watchdog timeout used when none is configured
pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u16 = 1024;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Pin id is not below [`PIN_COUNT`]
    PinOutOfRange(u8),
    /// Two devices are wired to the same pin
    DuplicatePin(u8),
    /// A timer period of zero milliseconds
    ZeroTimeout,
}

/// Device wiring and timing
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    /// LED output pin
    pub led_pin: u8,
    /// Button that toggles the LED blink timer
    pub toggle_button_pin: u8,
    /// Button that prints the temperature
    pub temp_button_pin: u8,
    /// Enable the internal pull-up on both button lines
    ///
    /// A button counts as pressed while its line reads high either way.
    pub button_pullup: bool,
    /// Button settle window
    pub debounce_timeout_ms: u32,
    /// LED blink half-period
    pub toggle_timeout_ms: u32,
    /// Periodic temperature report interval
    pub temp_timeout_ms: u32,
    /// Watchdog timeout
    pub watchdog_timeout_ms: u16,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            led_pin: 8,
            toggle_button_pin: 12,
            temp_button_pin: 13,
            button_pullup: true,
            debounce_timeout_ms: 300,
            toggle_timeout_ms: 100,
            temp_timeout_ms: 60_000,
            watchdog_timeout_ms: DEFAULT_WATCHDOG_TIMEOUT_MS,
        }
    }
}

impl BoardConfig {
    /// Check pins and timer periods
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pins = [self.led_pin, self.toggle_button_pin, self.temp_button_pin];

        for (i, &pin) in pins.iter().enumerate() {
            if usize::from(pin) >= PIN_COUNT {
                return Err(ConfigError::PinOutOfRange(pin));
            }
            if pins[..i].contains(&pin) {
                return Err(ConfigError::DuplicatePin(pin));
            }
        }

        if self.debounce_timeout_ms == 0 || self.toggle_timeout_ms == 0 || self.temp_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(())
    }
}
