//! Watchdog timer driver
//!
//! Every change to the control register goes through the timed sequence
//! the chip demands: set change-enable together with enable, then write
//! the new configuration within four cycles. Both writes happen inside
//! one critical section.

use portable_atomic::{AtomicBool, AtomicU16, Ordering};
use thermoblink_core::config::DEFAULT_WATCHDOG_TIMEOUT_MS;
use thermoblink_hal::watchdog::{Watchdog, WatchdogError};

use crate::hardware::Hardware;
use crate::registers::{bit, bits, Reg, RegisterBank};

/// Watchdog periods the prescaler supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogTimeout {
    Ms16,
    Ms32,
    Ms64,
    Ms128,
    Ms256,
    Ms512,
    Ms1024,
    Ms2048,
    Ms4096,
    Ms8192,
}

impl WatchdogTimeout {
    pub const ALL: [WatchdogTimeout; 10] = [
        Self::Ms16,
        Self::Ms32,
        Self::Ms64,
        Self::Ms128,
        Self::Ms256,
        Self::Ms512,
        Self::Ms1024,
        Self::Ms2048,
        Self::Ms4096,
        Self::Ms8192,
    ];

    /// Look up an exact period
    pub fn from_ms(ms: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|timeout| timeout.as_ms() == ms)
    }

    /// Period in milliseconds
    pub const fn as_ms(self) -> u16 {
        16 << self as u8
    }

    /// Prescaler bits for the control register
    pub const fn prescaler_bits(self) -> u8 {
        let n = self as u8;
        let low = n & 0b111;
        if n & 0b1000 != 0 {
            low | bit(bits::WDP3)
        } else {
            low
        }
    }
}

impl Default for WatchdogTimeout {
    fn default() -> Self {
        Self::Ms1024
    }
}

/// The chip's watchdog
pub struct WatchdogTimer<'a, R: RegisterBank> {
    hw: &'a Hardware<R>,
    enabled: AtomicBool,
    timeout_ms: AtomicU16,
}

impl<'a, R: RegisterBank> WatchdogTimer<'a, R> {
    /// Take over the watchdog, disabled with the default period
    pub fn new(hw: &'a Hardware<R>) -> Self {
        let wdt = Self {
            hw,
            enabled: AtomicBool::new(false),
            timeout_ms: AtomicU16::new(DEFAULT_WATCHDOG_TIMEOUT_MS),
        };
        wdt.configure(false, wdt.timeout());
        wdt
    }

    /// Current period
    pub fn timeout(&self) -> WatchdogTimeout {
        WatchdogTimeout::from_ms(self.timeout_ms.load(Ordering::Acquire)).unwrap_or_default()
    }

    fn configure(&self, enabled: bool, timeout: WatchdogTimeout) {
        self.reset();
        let regs = self.hw.regs();
        let mut config = timeout.prescaler_bits();
        if enabled {
            config |= bit(bits::WDE);
        }
        critical_section::with(|_| {
            let current = regs.read(Reg::Wdtcsr);
            regs.write(Reg::Wdtcsr, current | bit(bits::WDCE) | bit(bits::WDE));
            regs.write(Reg::Wdtcsr, config);
        });
        self.enabled.store(enabled, Ordering::Release);
        self.timeout_ms.store(timeout.as_ms(), Ordering::Release);
    }
}

impl<R: RegisterBank> Watchdog for WatchdogTimer<'_, R> {
    fn is_initialized(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        self.configure(enabled, self.timeout());
    }

    fn timeout_ms(&self) -> u16 {
        self.timeout_ms.load(Ordering::Acquire)
    }

    fn set_timeout_ms(&self, timeout_ms: u16) -> Result<(), WatchdogError> {
        let timeout = WatchdogTimeout::from_ms(timeout_ms).ok_or(WatchdogError::UnsupportedTimeout)?;
        self.configure(self.is_enabled(), timeout);
        Ok(())
    }

    fn reset(&self) {
        let regs = self.hw.regs();
        critical_section::with(|_| {
            regs.watchdog_reset();
            regs.clear_bits(Reg::Mcusr, bit(bits::WDRF));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedRegisters;

    fn hardware() -> Hardware<SimulatedRegisters> {
        Hardware::new(SimulatedRegisters::new())
    }

    #[test]
    fn test_timeout_table() {
        assert_eq!(WatchdogTimeout::Ms16.as_ms(), 16);
        assert_eq!(WatchdogTimeout::Ms8192.as_ms(), 8192);
        assert_eq!(WatchdogTimeout::from_ms(2048), Some(WatchdogTimeout::Ms2048));
        assert_eq!(WatchdogTimeout::from_ms(1000), None);

        assert_eq!(WatchdogTimeout::Ms16.prescaler_bits(), 0);
        assert_eq!(WatchdogTimeout::Ms1024.prescaler_bits(), 0b0000_0110);
        assert_eq!(WatchdogTimeout::Ms4096.prescaler_bits(), 0b0010_0000);
        assert_eq!(WatchdogTimeout::Ms8192.prescaler_bits(), 0b0010_0001);
    }

    #[test]
    fn test_starts_disabled() {
        let hw = hardware();
        let wdt = WatchdogTimer::new(&hw);

        assert!(wdt.is_initialized());
        assert!(!wdt.is_enabled());
        assert_eq!(wdt.timeout_ms(), 1024);
        assert_eq!(hw.regs().read(Reg::Wdtcsr), 0b0000_0110);
    }

    #[test]
    fn test_enable_sets_wde() {
        let hw = hardware();
        let wdt = WatchdogTimer::new(&hw);

        wdt.set_enabled(true);
        assert!(wdt.is_enabled());
        assert_eq!(hw.regs().read(Reg::Wdtcsr), 0b0000_1110);

        wdt.set_enabled(false);
        assert!(!wdt.is_enabled());
        assert!(!hw.regs().is_set(Reg::Wdtcsr, bits::WDE));
    }

    #[test]
    fn test_timeout_change_keeps_enable_state() {
        let hw = hardware();
        let wdt = WatchdogTimer::new(&hw);
        wdt.set_enabled(true);

        assert_eq!(wdt.set_timeout_ms(250), Err(WatchdogError::UnsupportedTimeout));
        assert_eq!(wdt.timeout_ms(), 1024);

        assert_eq!(wdt.set_timeout_ms(8192), Ok(()));
        assert!(wdt.is_enabled());
        assert_eq!(wdt.timeout(), WatchdogTimeout::Ms8192);
        assert_eq!(hw.regs().read(Reg::Wdtcsr), 0b0010_1001);
    }

    #[test]
    fn test_reset_clears_reset_flag() {
        let hw = hardware();
        let wdt = WatchdogTimer::new(&hw);
        let before = hw.regs().watchdog_resets();
        hw.regs().write(Reg::Mcusr, bit(bits::WDRF));

        wdt.reset();
        assert_eq!(hw.regs().watchdog_resets(), before + 1);
        assert_eq!(hw.regs().read(Reg::Mcusr), 0);
    }
}
