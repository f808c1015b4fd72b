//! GPIO channel abstraction
//!
//! A channel owns one logical pin for its whole lifetime. Construction
//! reserves the pin; a channel whose reservation failed stays usable but
//! inert, reporting `false` from [`Gpio::is_initialized`].

/// Pin direction requested at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Floating input
    Input,
    /// Input with the internal pull-up resistor enabled
    InputPullup,
    /// Push-pull output
    Output,
}

impl Direction {
    /// Check if this direction drives the pin
    pub fn is_output(self) -> bool {
        matches!(self, Direction::Output)
    }

    /// Check if this direction enables the pull-up resistor
    pub fn has_pullup(self) -> bool {
        matches!(self, Direction::InputPullup)
    }
}

/// Digital pin channel
///
/// Operations on an uninitialized channel are no-ops: `read()` returns
/// `false` and writes are ignored. `write()` and `toggle()` only act on
/// output channels.
pub trait Gpio {
    /// Check if the pin was reserved and configured
    fn is_initialized(&self) -> bool;

    /// Direction the channel was created with
    fn direction(&self) -> Direction;

    /// Read the current pin level
    fn read(&self) -> bool;

    /// Drive the output high or low
    fn write(&self, high: bool);

    /// Invert the output level
    fn toggle(&self);

    /// Set or clear this pin's pin-change interrupt mask bit
    fn enable_interrupt(&self, enable: bool);

    /// Set or clear the port-level pin-change interrupt enable
    ///
    /// The port enable is shared by every channel on the same port, so
    /// callers have to coordinate it across channels.
    fn enable_interrupt_on_port(&self, enable: bool);

    /// Check if this pin's interrupt mask bit is set
    fn is_interrupt_enabled(&self) -> bool;

    /// Check if the port-level interrupt enable is set
    fn is_port_interrupt_enabled(&self) -> bool;
}

impl<T: Gpio + ?Sized> Gpio for &T {
    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }

    fn direction(&self) -> Direction {
        (**self).direction()
    }

    fn read(&self) -> bool {
        (**self).read()
    }

    fn write(&self, high: bool) {
        (**self).write(high)
    }

    fn toggle(&self) {
        (**self).toggle()
    }

    fn enable_interrupt(&self, enable: bool) {
        (**self).enable_interrupt(enable)
    }

    fn enable_interrupt_on_port(&self, enable: bool) {
        (**self).enable_interrupt_on_port(enable)
    }

    fn is_interrupt_enabled(&self) -> bool {
        (**self).is_interrupt_enabled()
    }

    fn is_port_interrupt_enabled(&self) -> bool {
        (**self).is_port_interrupt_enabled()
    }
}
