//! On-chip EEPROM driver

use portable_atomic::{AtomicBool, Ordering};
use thermoblink_core::config::STORE_SIZE;
use thermoblink_hal::eeprom::Eeprom;

use crate::hardware::Hardware;
use crate::registers::{bit, bits, Reg, RegisterBank};

/// Byte-addressed persistent store
///
/// Starts disabled; typed reads and writes fail with
/// [`StoreError::Disabled`](thermoblink_hal::StoreError::Disabled) until
/// [`Eeprom::set_enabled`] is called. Byte access bypasses the flag.
pub struct PersistentStore<'a, R: RegisterBank> {
    hw: &'a Hardware<R>,
    enabled: AtomicBool,
}

impl<'a, R: RegisterBank> PersistentStore<'a, R> {
    pub fn new(hw: &'a Hardware<R>) -> Self {
        Self {
            hw,
            enabled: AtomicBool::new(false),
        }
    }

    /// Wait for a previous write to finish
    fn wait_ready(&self) {
        while self.hw.regs().is_set(Reg::Eecr, bits::EEPE) {}
    }

    fn select(&self, address: u16) {
        self.hw.regs().write_u16(Reg::Eearl, Reg::Eearh, address);
    }
}

impl<R: RegisterBank> Eeprom for PersistentStore<'_, R> {
    fn size(&self) -> u16 {
        STORE_SIZE
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn write_byte(&self, address: u16, byte: u8) {
        self.wait_ready();
        let regs = self.hw.regs();
        // EEPE must follow EEMPE within four cycles
        critical_section::with(|_| {
            self.select(address);
            regs.write(Reg::Eedr, byte);
            regs.write(Reg::Eecr, bit(bits::EEMPE));
            regs.write(Reg::Eecr, bit(bits::EEMPE) | bit(bits::EEPE));
        });
    }

    fn read_byte(&self, address: u16) -> u8 {
        self.wait_ready();
        let regs = self.hw.regs();
        critical_section::with(|_| {
            self.select(address);
            regs.set_bits(Reg::Eecr, bit(bits::EERE));
            regs.read(Reg::Eedr)
        })
    }
}
