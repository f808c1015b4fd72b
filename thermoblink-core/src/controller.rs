//! Button/LED/temperature controller
//!
//! The controller owns every device the workflow needs and is shared
//! between the main loop ([`Controller::run`]) and interrupt glue (the
//! `handle_*` methods). All methods take `&self`; devices carry their own
//! interior mutability.
//!
//! # Workflow
//!
//! - Toggle button: start or stop the LED blink timer and persist the
//!   choice, so blinking resumes after a power cycle.
//! - Temperature button: print the temperature now and restart the
//!   periodic report.
//! - Serial commands mirror the buttons, see [`Command`].
//! - Button edges pass through a [`DebounceGate`]; while it settles the
//!   port-level button interrupts stay masked.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};
use thermoblink_hal::{Eeprom, Gpio, SerialPort, TemperatureSensor, Timer, Watchdog};

use crate::config::{COMMAND_BUFFER_LEN, COMMAND_READ_TIMEOUT_MS, TOGGLE_STATE_ADDRESS};
use crate::debounce::{DebounceGate, DebounceState};

/// Single-byte serial command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `'t'`: start or stop the LED blink timer
    ToggleTimer,
    /// `'r'`: print the temperature
    ReadTemperature,
    /// `'s'`: print whether the blink timer runs
    ReportState,
}

impl Command {
    /// The byte that selects this command
    pub fn as_byte(self) -> u8 {
        match self {
            Command::ToggleTimer => b't',
            Command::ReadTemperature => b'r',
            Command::ReportState => b's',
        }
    }
}

impl TryFrom<u8> for Command {
    /// The unrecognized byte
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b't' => Ok(Command::ToggleTimer),
            b'r' => Ok(Command::ReadTemperature),
            b's' => Ok(Command::ReportState),
            other => Err(other),
        }
    }
}

/// Devices handed to [`Controller::new`]
pub struct Devices<G, T, S, W, E, P> {
    /// Blinking LED (output)
    pub led: G,
    /// Button toggling the blink timer
    pub toggle_button: G,
    /// Button printing the temperature
    pub temp_button: G,
    /// Button settle timer
    pub debounce_timer: T,
    /// LED blink timer
    pub toggle_timer: T,
    /// Periodic temperature report timer
    pub temp_timer: T,
    /// Command input and text output
    pub serial: S,
    /// Main loop supervision
    pub watchdog: W,
    /// Persistent toggle state
    pub store: E,
    /// Temperature source
    pub sensor: P,
}

/// Workflow controller
pub struct Controller<G, T, S, W, E, P>
where
    G: Gpio,
    T: Timer,
    S: SerialPort,
    W: Watchdog,
    E: Eeprom,
    P: TemperatureSensor,
{
    led: G,
    toggle_button: G,
    temp_button: G,
    debounce: DebounceGate<T>,
    toggle_timer: T,
    temp_timer: T,
    serial: S,
    watchdog: W,
    store: E,
    sensor: P,
    temp_reads: AtomicU32,
    initialized: bool,
}

impl<G, T, S, W, E, P> Controller<G, T, S, W, E, P>
where
    G: Gpio,
    T: Timer,
    S: SerialPort,
    W: Watchdog,
    E: Eeprom,
    P: TemperatureSensor,
{
    /// Take ownership of `devices` and bring the system up
    ///
    /// If any device failed to initialize, nothing is enabled and
    /// [`Controller::run`] only reports the failure.
    pub fn new(devices: Devices<G, T, S, W, E, P>) -> Self {
        let mut controller = Self {
            led: devices.led,
            toggle_button: devices.toggle_button,
            temp_button: devices.temp_button,
            debounce: DebounceGate::new(devices.debounce_timer),
            toggle_timer: devices.toggle_timer,
            temp_timer: devices.temp_timer,
            serial: devices.serial,
            watchdog: devices.watchdog,
            store: devices.store,
            sensor: devices.sensor,
            temp_reads: AtomicU32::new(0),
            initialized: false,
        };

        controller.initialized = controller.devices_initialized();
        if controller.initialized {
            controller.bring_up();
        } else {
            error!("controller: device initialization failed");
        }
        controller
    }

    /// Check if every device initialized and the system is running
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn devices_initialized(&self) -> bool {
        self.led.is_initialized()
            && self.toggle_button.is_initialized()
            && self.temp_button.is_initialized()
            && self.debounce.is_initialized()
            && self.toggle_timer.is_initialized()
            && self.temp_timer.is_initialized()
            && self.serial.is_initialized()
            && self.watchdog.is_initialized()
            && self.store.is_initialized()
            && self.sensor.is_initialized()
    }

    fn bring_up(&self) {
        self.led.write(false);
        self.toggle_button.enable_interrupt(true);
        self.temp_button.enable_interrupt(true);
        self.temp_timer.start();
        self.serial.set_enabled(true);
        self.watchdog.set_enabled(true);
        self.store.set_enabled(true);
        self.restore_toggle_state();
        info!("controller: running");
    }

    fn restore_toggle_state(&self) {
        match self.store.read::<bool>(TOGGLE_STATE_ADDRESS) {
            Ok(true) => {
                self.toggle_timer.start();
                self.serial.print("Toggle timer enabled!\n");
            }
            Ok(false) => {}
            Err(err) => warn!("controller: toggle state unreadable: {}", err),
        }
    }

    /// Run the command loop until `stop` is raised
    ///
    /// Each iteration acknowledges the watchdog and polls the serial port
    /// for one command. Returns immediately, after printing one error
    /// line, if the controller failed to initialize.
    pub fn run(&self, stop: &AtomicBool) {
        if !self.initialized {
            self.report_init_failure();
            return;
        }

        self.serial.print("Running the system!\n");
        self.serial.print("Please enter one of the following commands:\n");
        self.serial.print("- 't' to toggle the toggle timer\n");
        self.serial.print("- 'r' to read the temperature\n");
        self.serial.print("- 's' to check the state of the toggle timer\n\n");

        while !stop.load(Ordering::Acquire) {
            self.watchdog.reset();
            self.poll_command();
        }
        info!("controller: stopped");
    }

    fn report_init_failure(&self) {
        if !self.serial.is_initialized() {
            return;
        }
        let enabled = self.serial.is_enabled();
        self.serial.set_enabled(true);
        self.serial.print("Failed to run the system: initialization failed!\n");
        self.serial.set_enabled(enabled);
    }

    /// Read one command from the serial port and execute it
    ///
    /// Only the first received byte counts.
    pub fn poll_command(&self) {
        let mut buffer = [0u8; COMMAND_BUFFER_LEN];

        match self.serial.read(&mut buffer, COMMAND_READ_TIMEOUT_MS) {
            Ok(0) => {}
            Ok(_) => match Command::try_from(buffer[0]) {
                Ok(command) => self.execute(command),
                Err(byte) => {
                    debug!("controller: unknown command {=u8}", byte);
                    self.serial
                        .print_fmt(format_args!("Unknown command {}!\n", char::from(byte)));
                }
            },
            Err(err) => {
                warn!("controller: serial read failed: {}", err);
                self.serial.print("Failed to receive data from the serial port!\n");
            }
        }
    }

    /// Execute a command
    pub fn execute(&self, command: Command) {
        match command {
            Command::ToggleTimer => self.toggle_blinking(),
            Command::ReadTemperature => self.read_temperature_now(),
            Command::ReportState => {
                let state = if self.is_toggle_enabled() { "enabled" } else { "disabled" };
                self.serial
                    .print_fmt(format_args!("The toggle timer is {}!\n", state));
            }
        }
    }

    /// Service a pin-change interrupt from either button
    ///
    /// Ignored while the debounce gate settles. Otherwise masks the
    /// button ports, starts the settle window and runs the action of
    /// every button that reads high.
    pub fn handle_button_event(&self) {
        if !self.debounce.is_idle() {
            return;
        }

        self.toggle_button.enable_interrupt_on_port(false);
        self.temp_button.enable_interrupt_on_port(false);
        self.debounce.settle();

        if self.toggle_button.read() {
            self.toggle_blinking();
        }
        if self.temp_button.read() {
            self.read_temperature_now();
        }
    }

    /// Service the debounce timer: unmask the button ports once settled
    pub fn handle_debounce_timer_timeout(&self) {
        if self.debounce.release() {
            self.toggle_button.enable_interrupt_on_port(true);
            self.temp_button.enable_interrupt_on_port(true);
        }
    }

    /// Service the blink timer: flip the LED
    pub fn handle_toggle_timer_timeout(&self) {
        if self.toggle_timer.has_timed_out() {
            self.led.toggle();
        }
    }

    /// Service the report timer: print the temperature
    pub fn handle_temp_timer_timeout(&self) {
        if self.temp_timer.has_timed_out() {
            self.print_temperature();
        }
    }

    fn toggle_blinking(&self) {
        self.toggle_timer.toggle();
        let enabled = self.toggle_timer.is_enabled();

        if let Err(err) = self.store.write(TOGGLE_STATE_ADDRESS, enabled) {
            warn!("controller: toggle state not persisted: {}", err);
        }

        if enabled {
            self.serial.print("Toggle timer enabled!\n");
        } else {
            // Don't leave the LED stuck on
            self.led.write(false);
            self.serial.print("Toggle timer disabled!\n");
        }
        info!("controller: blinking {}", enabled);
    }

    fn read_temperature_now(&self) {
        self.print_temperature();
        self.temp_timer.restart();
    }

    fn print_temperature(&self) {
        let celsius = self.sensor.read();
        self.temp_reads.fetch_add(1, Ordering::Relaxed);
        self.serial
            .print_fmt(format_args!("Temperature: {} Celsius\n", celsius));
    }

    /// Check if the LED blink timer runs
    pub fn is_toggle_enabled(&self) -> bool {
        self.toggle_timer.is_enabled()
    }

    /// Number of temperature readings printed so far
    pub fn temperature_reads(&self) -> u32 {
        self.temp_reads.load(Ordering::Relaxed)
    }

    /// Current debounce state
    pub fn debounce_state(&self) -> DebounceState {
        self.debounce.state()
    }

    /// Turn the LED off and disable every device
    ///
    /// Runs on drop as well, whether or not initialization succeeded.
    pub fn shutdown(&self) {
        self.led.write(false);
        self.toggle_button.enable_interrupt(false);
        self.temp_button.enable_interrupt(false);
        self.debounce.cancel();
        self.toggle_timer.stop();
        self.temp_timer.stop();
        self.serial.set_enabled(false);
        self.watchdog.set_enabled(false);
        self.store.set_enabled(false);
    }

    /// The LED
    pub fn led(&self) -> &G {
        &self.led
    }

    /// The toggle button
    pub fn toggle_button(&self) -> &G {
        &self.toggle_button
    }

    /// The temperature button
    pub fn temp_button(&self) -> &G {
        &self.temp_button
    }

    /// The debounce timer
    pub fn debounce_timer(&self) -> &T {
        self.debounce.timer()
    }

    /// The LED blink timer
    pub fn toggle_timer(&self) -> &T {
        &self.toggle_timer
    }

    /// The temperature report timer
    pub fn temp_timer(&self) -> &T {
        &self.temp_timer
    }

    /// The serial port
    pub fn serial(&self) -> &S {
        &self.serial
    }

    /// The watchdog
    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }

    /// The persistent store
    pub fn store(&self) -> &E {
        &self.store
    }

    /// The temperature sensor
    pub fn sensor(&self) -> &P {
        &self.sensor
    }
}

impl<G, T, S, W, E, P> Drop for Controller<G, T, S, W, E, P>
where
    G: Gpio,
    T: Timer,
    S: SerialPort,
    W: Watchdog,
    E: Eeprom,
    P: TemperatureSensor,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{StubEeprom, StubGpio, StubSerial, StubTempSensor, StubTimer, StubWatchdog};
    use thermoblink_hal::gpio::Direction;
    use thermoblink_hal::serial::SerialError;

    type TestController<'r, 'a> = Controller<
        &'r StubGpio,
        &'r StubTimer,
        &'r StubSerial<'a>,
        &'r StubWatchdog,
        &'r StubEeprom,
        &'r StubTempSensor,
    >;

    /// Stub devices wired like the reference board
    struct Rig<'a> {
        led: StubGpio,
        toggle_button: StubGpio,
        temp_button: StubGpio,
        debounce_timer: StubTimer,
        toggle_timer: StubTimer,
        temp_timer: StubTimer,
        serial: StubSerial<'a>,
        watchdog: StubWatchdog,
        store: StubEeprom,
        sensor: StubTempSensor,
    }

    impl<'a> Rig<'a> {
        fn new() -> Self {
            Self::with_serial(StubSerial::new())
        }

        fn with_serial(serial: StubSerial<'a>) -> Self {
            Self {
                led: StubGpio::new(Direction::Output),
                toggle_button: StubGpio::new(Direction::InputPullup),
                temp_button: StubGpio::new(Direction::InputPullup),
                debounce_timer: StubTimer::new(300),
                toggle_timer: StubTimer::new(100),
                temp_timer: StubTimer::new(60_000),
                serial,
                watchdog: StubWatchdog::new(),
                store: StubEeprom::new(),
                sensor: StubTempSensor::new(23),
            }
        }

        fn controller(&self) -> TestController<'_, 'a> {
            Controller::new(Devices {
                led: &self.led,
                toggle_button: &self.toggle_button,
                temp_button: &self.temp_button,
                debounce_timer: &self.debounce_timer,
                toggle_timer: &self.toggle_timer,
                temp_timer: &self.temp_timer,
                serial: &self.serial,
                watchdog: &self.watchdog,
                store: &self.store,
                sensor: &self.sensor,
            })
        }

        /// Simulate a press of `button` and service the interrupt
        fn press(&self, controller: &TestController<'_, 'a>, button: &StubGpio) {
            button.set_level(true);
            controller.handle_button_event();
            button.set_level(false);
        }

        /// Let the debounce window elapse and service the timer
        fn settle(&self, controller: &TestController<'_, 'a>) {
            self.debounce_timer.set_timed_out(true);
            controller.handle_debounce_timer_timeout();
        }
    }

    #[test]
    fn test_command_bytes() {
        assert_eq!(Command::try_from(b't'), Ok(Command::ToggleTimer));
        assert_eq!(Command::try_from(b'r'), Ok(Command::ReadTemperature));
        assert_eq!(Command::try_from(b's'), Ok(Command::ReportState));
        assert_eq!(Command::try_from(b'T'), Err(b'T'));
        assert_eq!(Command::ReportState.as_byte(), b's');
    }

    #[test]
    fn test_bring_up_enables_devices() {
        let rig = Rig::new();
        let controller = rig.controller();

        assert!(controller.is_initialized());
        assert!(rig.toggle_button.is_interrupt_enabled());
        assert!(rig.temp_button.is_interrupt_enabled());
        assert!(rig.toggle_button.is_port_interrupt_enabled());
        assert!(rig.temp_timer.is_enabled());
        assert!(rig.serial.is_enabled());
        assert!(rig.watchdog.is_enabled());
        assert!(rig.store.is_enabled());
        assert_eq!(controller.debounce_state(), DebounceState::Idle);
    }

    #[test]
    fn test_stored_disabled_state_keeps_timer_stopped() {
        let rig = Rig::new();
        rig.store.preload(TOGGLE_STATE_ADDRESS, 0);
        let controller = rig.controller();

        assert!(!controller.is_toggle_enabled());
        assert!(!rig.toggle_timer.is_enabled());
        assert!(!rig.serial.printed("Toggle timer enabled!\n"));
    }

    #[test]
    fn test_stored_enabled_state_restarts_blinking() {
        let rig = Rig::new();
        rig.store.preload(TOGGLE_STATE_ADDRESS, 1);
        let controller = rig.controller();

        assert!(controller.is_toggle_enabled());
        assert!(!rig.led.level());
        assert!(rig.serial.printed("Toggle timer enabled!\n"));
    }

    #[test]
    fn test_uninitialized_device_blocks_bring_up() {
        let mut rig = Rig::new();
        rig.temp_button = StubGpio::uninitialized(Direction::InputPullup);
        let controller = rig.controller();

        assert!(!controller.is_initialized());
        assert!(!rig.toggle_button.is_interrupt_enabled());
        assert!(!rig.temp_timer.is_enabled());
        assert!(!rig.watchdog.is_enabled());
        assert!(!rig.store.is_enabled());
        assert!(!rig.serial.is_enabled());
    }

    #[test]
    fn test_run_reports_init_failure_once() {
        let mut rig = Rig::new();
        rig.toggle_timer = StubTimer::new(0);
        let controller = rig.controller();

        let stop = AtomicBool::new(false);
        controller.run(&stop);

        assert_eq!(
            rig.serial.count("Failed to run the system: initialization failed!\n"),
            1
        );
        assert!(!rig.serial.printed("Running the system!"));
        assert_eq!(rig.watchdog.resets(), 0);
        // Serial output was only enabled for the message
        assert!(!rig.serial.is_enabled());
    }

    #[test]
    fn test_run_without_serial_stays_silent() {
        let rig = Rig::with_serial(StubSerial::uninitialized());
        let controller = rig.controller();

        controller.run(&AtomicBool::new(false));
        assert!(rig.serial.output().is_empty());
    }

    #[test]
    fn test_toggle_press_enables_and_persists() {
        let rig = Rig::new();
        let controller = rig.controller();

        rig.press(&controller, &rig.toggle_button);

        assert_eq!(controller.debounce_state(), DebounceState::Settling);
        assert!(controller.is_toggle_enabled());
        assert_eq!(rig.store.peek(TOGGLE_STATE_ADDRESS), 1);
        assert!(rig.serial.printed("Toggle timer enabled!\n"));
        assert!(!rig.toggle_button.is_port_interrupt_enabled());
        assert!(!rig.temp_button.is_port_interrupt_enabled());
    }

    #[test]
    fn test_edge_while_settling_is_ignored() {
        let rig = Rig::new();
        let controller = rig.controller();

        rig.press(&controller, &rig.toggle_button);
        rig.press(&controller, &rig.toggle_button);
        rig.press(&controller, &rig.temp_button);

        assert!(controller.is_toggle_enabled());
        assert_eq!(rig.store.peek(TOGGLE_STATE_ADDRESS), 1);
        assert_eq!(rig.serial.count("Toggle timer enabled!\n"), 1);
        assert_eq!(controller.temperature_reads(), 0);
    }

    #[test]
    fn test_debounce_timeout_restores_button_interrupts() {
        let rig = Rig::new();
        let controller = rig.controller();

        rig.press(&controller, &rig.toggle_button);
        rig.settle(&controller);

        assert_eq!(controller.debounce_state(), DebounceState::Idle);
        assert!(!rig.debounce_timer.is_enabled());
        assert!(rig.toggle_button.is_port_interrupt_enabled());
        assert!(rig.temp_button.is_port_interrupt_enabled());
    }

    #[test]
    fn test_debounce_timeout_before_elapsed_is_noop() {
        let rig = Rig::new();
        let controller = rig.controller();

        rig.press(&controller, &rig.toggle_button);
        controller.handle_debounce_timer_timeout();

        assert_eq!(controller.debounce_state(), DebounceState::Settling);
        assert!(!rig.toggle_button.is_port_interrupt_enabled());
    }

    #[test]
    fn test_second_press_disables_and_turns_led_off() {
        let rig = Rig::new();
        let controller = rig.controller();

        rig.press(&controller, &rig.toggle_button);
        rig.settle(&controller);

        // LED is mid-blink when blinking gets switched off
        rig.toggle_timer.set_timed_out(true);
        controller.handle_toggle_timer_timeout();
        assert!(rig.led.level());

        rig.press(&controller, &rig.toggle_button);

        assert!(!controller.is_toggle_enabled());
        assert!(!rig.led.level());
        assert_eq!(rig.store.peek(TOGGLE_STATE_ADDRESS), 0);
        assert!(rig.serial.printed("Toggle timer disabled!\n"));
    }

    #[test]
    fn test_toggle_timeout_flips_led() {
        let rig = Rig::new();
        let controller = rig.controller();
        controller.execute(Command::ToggleTimer);

        // Not elapsed
        controller.handle_toggle_timer_timeout();
        assert!(!rig.led.level());

        rig.toggle_timer.set_timed_out(true);
        controller.handle_toggle_timer_timeout();
        assert!(rig.led.level());
        controller.handle_toggle_timer_timeout();
        assert!(!rig.led.level());
    }

    #[test]
    fn test_temp_press_prints_and_restarts_timer() {
        let rig = Rig::new();
        let controller = rig.controller();

        rig.press(&controller, &rig.temp_button);

        assert!(rig.serial.printed("Temperature: 23 Celsius\n"));
        assert_eq!(rig.temp_timer.restarts(), 1);
        assert_eq!(controller.temperature_reads(), 1);
        assert!(!controller.is_toggle_enabled());
    }

    #[test]
    fn test_simultaneous_press_runs_both_actions() {
        let rig = Rig::new();
        let controller = rig.controller();

        rig.toggle_button.set_level(true);
        rig.temp_button.set_level(true);
        controller.handle_button_event();

        assert!(controller.is_toggle_enabled());
        assert_eq!(controller.temperature_reads(), 1);
    }

    #[test]
    fn test_temp_timeout_prints_without_restart() {
        let rig = Rig::new();
        let controller = rig.controller();
        rig.sensor.set_celsius(-4);

        controller.handle_temp_timer_timeout();
        assert_eq!(controller.temperature_reads(), 0);

        rig.temp_timer.set_timed_out(true);
        controller.handle_temp_timer_timeout();

        assert!(rig.serial.printed("Temperature: -4 Celsius\n"));
        assert_eq!(rig.temp_timer.restarts(), 0);
    }

    #[test]
    fn test_run_executes_serial_commands() {
        let stop = AtomicBool::new(false);
        let rig = Rig::with_serial(StubSerial::new().stop_when_drained(&stop));
        for byte in [b't', b's', b'r', b'x'] {
            rig.serial.push_input(byte);
        }
        rig.serial.push_error(SerialError::Overrun);

        let controller = rig.controller();
        controller.run(&stop);

        assert!(rig.serial.printed("Running the system!\n"));
        assert!(rig.serial.printed("- 's' to check the state of the toggle timer\n\n"));
        assert!(rig.serial.printed("Toggle timer enabled!\n"));
        assert!(rig.serial.printed("The toggle timer is enabled!\n"));
        assert!(rig.serial.printed("Temperature: 23 Celsius\n"));
        assert!(rig.serial.printed("Unknown command x!\n"));
        assert!(rig.serial.printed("Failed to receive data from the serial port!\n"));
        assert_eq!(rig.store.peek(TOGGLE_STATE_ADDRESS), 1);

        // One acknowledgement per loop iteration, including the final empty read
        assert_eq!(rig.watchdog.resets(), 6);
    }

    #[test]
    fn test_report_state_disabled() {
        let rig = Rig::new();
        let controller = rig.controller();
        controller.execute(Command::ReportState);
        assert!(rig.serial.printed("The toggle timer is disabled!\n"));
    }

    #[test]
    fn test_shutdown_disables_everything() {
        let rig = Rig::new();
        let controller = rig.controller();
        controller.execute(Command::ToggleTimer);
        rig.toggle_timer.set_timed_out(true);
        controller.handle_toggle_timer_timeout();
        assert!(rig.led.level());

        controller.shutdown();

        assert!(!rig.led.level());
        assert!(!rig.toggle_button.is_interrupt_enabled());
        assert!(!rig.temp_button.is_interrupt_enabled());
        assert!(!rig.debounce_timer.is_enabled());
        assert!(!rig.toggle_timer.is_enabled());
        assert!(!rig.temp_timer.is_enabled());
        assert!(!rig.serial.is_enabled());
        assert!(!rig.watchdog.is_enabled());
        assert!(!rig.store.is_enabled());
    }

    #[test]
    fn test_drop_shuts_down() {
        let rig = Rig::new();
        {
            let controller = rig.controller();
            controller.execute(Command::ToggleTimer);
            assert!(rig.watchdog.is_enabled());
        }

        assert!(!rig.toggle_timer.is_enabled());
        assert!(!rig.watchdog.is_enabled());
        // Persisted state survives for the next bring-up
        assert_eq!(rig.store.peek(TOGGLE_STATE_ADDRESS), 1);
        let controller = rig.controller();
        assert!(controller.is_toggle_enabled());
    }
}
