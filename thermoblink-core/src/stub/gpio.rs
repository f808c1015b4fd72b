use core::cell::Cell;

use thermoblink_hal::gpio::{Direction, Gpio};

/// GPIO stub with a settable input level
#[derive(Debug)]
pub struct StubGpio {
    initialized: bool,
    direction: Direction,
    level: Cell<bool>,
    interrupt: Cell<bool>,
    port_interrupt: Cell<bool>,
}

impl StubGpio {
    /// Create an initialized stub
    pub fn new(direction: Direction) -> Self {
        Self {
            initialized: true,
            direction,
            level: Cell::new(false),
            interrupt: Cell::new(false),
            port_interrupt: Cell::new(false),
        }
    }

    /// Create a stub that reports a failed reservation
    pub fn uninitialized(direction: Direction) -> Self {
        Self {
            initialized: false,
            ..Self::new(direction)
        }
    }

    /// Drive the pin level seen by `read()`, e.g. to simulate a press
    pub fn set_level(&self, high: bool) {
        self.level.set(high);
    }

    /// Current pin level, regardless of initialization
    pub fn level(&self) -> bool {
        self.level.get()
    }
}

impl Gpio for StubGpio {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn read(&self) -> bool {
        self.initialized && self.level.get()
    }

    fn write(&self, high: bool) {
        if self.initialized && self.direction.is_output() {
            self.level.set(high);
        }
    }

    fn toggle(&self) {
        if self.initialized && self.direction.is_output() {
            self.level.set(!self.level.get());
        }
    }

    fn enable_interrupt(&self, enable: bool) {
        if self.initialized {
            self.interrupt.set(enable);
            if enable {
                self.port_interrupt.set(true);
            }
        }
    }

    fn enable_interrupt_on_port(&self, enable: bool) {
        if self.initialized {
            self.port_interrupt.set(enable);
        }
    }

    fn is_interrupt_enabled(&self) -> bool {
        self.interrupt.get()
    }

    fn is_port_interrupt_enabled(&self) -> bool {
        self.port_interrupt.get()
    }
}
