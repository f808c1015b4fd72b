//! Board assembly
//!
//! Builds the device set for a [`Controller`](thermoblink_core::Controller)
//! from a [`BoardConfig`]. Interrupt glue supplies one [`Callback`] per
//! interrupt source; each typically forwards to the matching `handle_*`
//! method of the controller it lives next to.

use embedded_hal::delay::DelayNs;
use thermoblink_core::config::{BoardConfig, ConfigError};
use thermoblink_core::controller::Devices;
use thermoblink_core::dispatch::Callback;
use thermoblink_hal::gpio::Direction;
use thermoblink_hal::tempsensor::TemperatureSensor;
use thermoblink_hal::watchdog::Watchdog;

use crate::eeprom::PersistentStore;
use crate::gpio::GpioChannel;
use crate::hardware::Hardware;
use crate::registers::RegisterBank;
use crate::serial::Usart;
use crate::timer::TimerChannel;
use crate::watchdog::WatchdogTimer;

/// Interrupt callbacks wired into the channels
#[derive(Debug, Clone, Copy)]
pub struct Callbacks {
    /// Pin change on the buttons' port
    pub button: Callback,
    /// Debounce timer timeout
    pub debounce: Callback,
    /// LED blink timer timeout
    pub toggle: Callback,
    /// Temperature report timer timeout
    pub temp: Callback,
}

/// Device set built from register-level drivers
pub type BoardDevices<'a, R, D, P> = Devices<
    GpioChannel<'a, R>,
    TimerChannel<'a, R>,
    Usart<'a, R, D>,
    WatchdogTimer<'a, R>,
    PersistentStore<'a, R>,
    P,
>;

/// Build every channel `config` describes
///
/// Fails only if `config` itself is invalid. A channel that cannot get
/// its resource comes back uninitialized, and the controller refuses to
/// start.
pub fn assemble<'a, R, D, P>(
    hw: &'a Hardware<R>,
    config: &BoardConfig,
    callbacks: &Callbacks,
    delay: D,
    sensor: P,
) -> Result<BoardDevices<'a, R, D, P>, ConfigError>
where
    R: RegisterBank,
    D: DelayNs + Clone,
    P: TemperatureSensor,
{
    config.validate()?;

    let watchdog = WatchdogTimer::new(hw);
    if let Err(err) = watchdog.set_timeout_ms(config.watchdog_timeout_ms) {
        warn!(
            "board: watchdog keeps {=u16} ms: {}",
            watchdog.timeout_ms(),
            err
        );
    }

    let button = if config.button_pullup {
        Direction::InputPullup
    } else {
        Direction::Input
    };

    let devices = Devices {
        led: GpioChannel::new(hw, config.led_pin, Direction::Output, None),
        toggle_button: GpioChannel::new(
            hw,
            config.toggle_button_pin,
            button,
            Some(callbacks.button),
        ),
        temp_button: GpioChannel::new(
            hw,
            config.temp_button_pin,
            button,
            Some(callbacks.button),
        ),
        debounce_timer: TimerChannel::new(hw, config.debounce_timeout_ms, Some(callbacks.debounce)),
        toggle_timer: TimerChannel::new(hw, config.toggle_timeout_ms, Some(callbacks.toggle)),
        temp_timer: TimerChannel::new(hw, config.temp_timeout_ms, Some(callbacks.temp)),
        serial: Usart::new(hw, delay),
        watchdog,
        store: PersistentStore::new(hw),
        sensor,
    };
    info!("board: assembled");
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{Port, Reg};
    use crate::sim::{SimDelay, SimulatedRegisters};
    use thermoblink_core::stub::StubTempSensor;
    use thermoblink_hal::{Gpio, Timer};

    fn noop() {}

    const CALLBACKS: Callbacks = Callbacks {
        button: noop,
        debounce: noop,
        toggle: noop,
        temp: noop,
    };

    #[test]
    fn test_assembles_reference_board() {
        let hw = Hardware::new(SimulatedRegisters::new());
        let devices = assemble(
            &hw,
            &BoardConfig::default(),
            &CALLBACKS,
            SimDelay::new(),
            StubTempSensor::new(21),
        )
        .unwrap();

        assert!(devices.led.is_initialized());
        assert!(devices.led.direction().is_output());
        assert_eq!(devices.toggle_button.port(), Some(Port::B));
        assert!(hw.has_port_callback(Port::B));
        assert!(!hw.has_port_callback(Port::D));
        assert_eq!(hw.circuits_in_use(), 3);
        assert_eq!(devices.debounce_timer.timeout_ms(), 300);
        assert_eq!(devices.toggle_timer.timeout_ms(), 100);
        assert_eq!(devices.temp_timer.timeout_ms(), 60_000);
        assert_eq!(devices.watchdog.timeout_ms(), 1024);
    }

    #[test]
    fn test_buttons_use_pullups() {
        let hw = Hardware::new(SimulatedRegisters::new());
        let devices = assemble(
            &hw,
            &BoardConfig::default(),
            &CALLBACKS,
            SimDelay::new(),
            StubTempSensor::new(21),
        )
        .unwrap();

        assert_eq!(devices.toggle_button.direction(), Direction::InputPullup);
        assert_eq!(devices.temp_button.direction(), Direction::InputPullup);
        // Pull-ups on pins 12 and 13, LED latch low
        assert_eq!(hw.regs().read(Reg::Portb), 0b0011_0000);
        assert_eq!(hw.regs().read(Reg::Ddrb), 0b0000_0001);
    }

    #[test]
    fn test_plain_input_buttons() {
        let hw = Hardware::new(SimulatedRegisters::new());
        let config = BoardConfig {
            button_pullup: false,
            ..BoardConfig::default()
        };
        let devices = assemble(&hw, &config, &CALLBACKS, SimDelay::new(), StubTempSensor::new(0)).unwrap();

        assert_eq!(devices.toggle_button.direction(), Direction::Input);
        assert_eq!(hw.regs().read(Reg::Portb), 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let hw = Hardware::new(SimulatedRegisters::new());
        let config = BoardConfig {
            temp_button_pin: 8,
            ..BoardConfig::default()
        };

        let result = assemble(&hw, &config, &CALLBACKS, SimDelay::new(), StubTempSensor::new(0));
        assert_eq!(result.err(), Some(ConfigError::DuplicatePin(8)));
        assert!(!hw.is_pin_reserved(12));
    }

    #[test]
    fn test_unsupported_watchdog_timeout_keeps_default() {
        let hw = Hardware::new(SimulatedRegisters::new());
        let config = BoardConfig {
            watchdog_timeout_ms: 1000,
            ..BoardConfig::default()
        };

        let devices = assemble(&hw, &config, &CALLBACKS, SimDelay::new(), StubTempSensor::new(0)).unwrap();
        assert_eq!(devices.watchdog.timeout_ms(), 1024);
    }
}
