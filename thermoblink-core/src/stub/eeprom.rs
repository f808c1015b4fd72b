use core::cell::{Cell, RefCell};

use thermoblink_hal::eeprom::Eeprom;

use crate::config::STORE_SIZE;

/// Persistent store stub backed by RAM
///
/// Starts zero-filled and disabled, like a store the controller has not
/// brought up yet.
#[derive(Debug)]
pub struct StubEeprom {
    bytes: RefCell<[u8; STORE_SIZE as usize]>,
    enabled: Cell<bool>,
}

impl Default for StubEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl StubEeprom {
    /// Create a zero-filled, disabled stub
    pub fn new() -> Self {
        Self {
            bytes: RefCell::new([0; STORE_SIZE as usize]),
            enabled: Cell::new(false),
        }
    }

    /// Preload a byte, bypassing the enable check
    pub fn preload(&self, address: u16, byte: u8) {
        self.bytes.borrow_mut()[usize::from(address)] = byte;
    }

    /// Raw byte content, bypassing the enable check
    pub fn peek(&self, address: u16) -> u8 {
        self.bytes.borrow()[usize::from(address)]
    }
}

impl Eeprom for StubEeprom {
    fn size(&self) -> u16 {
        STORE_SIZE
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    fn write_byte(&self, address: u16, byte: u8) {
        self.preload(address, byte);
    }

    fn read_byte(&self, address: u16) -> u8 {
        self.peek(address)
    }
}
