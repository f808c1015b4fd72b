//! Register map
//!
//! Drivers name registers through [`Reg`] and read bit positions from the
//! constants in [`bits`]. Port groups and timer circuits are described by
//! the [`PORTS`] and [`CIRCUITS`] tables, indexed by [`Port`] and circuit
//! number, so driver code never hard-codes which register belongs to
//! which resource. The layout matches the ATmega328P.

use thermoblink_core::config::{PORT_COUNT, TICK_INTERVAL_US, TIMER_CIRCUITS};

/// 8-bit registers used by the drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Reg {
    /// Status register (global interrupt enable)
    Sreg,
    /// MCU status register (reset flags)
    Mcusr,
    Pinb,
    Ddrb,
    Portb,
    Pinc,
    Ddrc,
    Portc,
    Pind,
    Ddrd,
    Portd,
    /// Pin change interrupt control
    Pcicr,
    Pcmsk0,
    Pcmsk1,
    Pcmsk2,
    Tccr0b,
    Timsk0,
    Tccr1b,
    Ocr1al,
    Ocr1ah,
    Timsk1,
    Tccr2b,
    Timsk2,
    /// EEPROM control
    Eecr,
    Eedr,
    Eearl,
    Eearh,
    Ucsr0a,
    Ucsr0b,
    Ucsr0c,
    Ubrr0l,
    Ubrr0h,
    Udr0,
    /// Watchdog control
    Wdtcsr,
}

impl Reg {
    /// Number of registers in the map
    pub const COUNT: usize = Reg::Wdtcsr as usize + 1;

    /// Position of the register in a dense table
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Bit positions
pub mod bits {
    /// SREG: global interrupt enable
    pub const SREG_I: u8 = 7;
    /// MCUSR: watchdog reset flag
    pub const WDRF: u8 = 3;

    pub const PCIE0: u8 = 0;
    pub const PCIE1: u8 = 1;
    pub const PCIE2: u8 = 2;

    pub const TOIE0: u8 = 0;
    pub const CS01: u8 = 1;
    pub const OCIE1A: u8 = 1;
    pub const CS11: u8 = 1;
    pub const WGM12: u8 = 3;
    pub const TOIE2: u8 = 0;
    pub const CS21: u8 = 1;

    pub const EERE: u8 = 0;
    pub const EEPE: u8 = 1;
    pub const EEMPE: u8 = 2;

    pub const DOR0: u8 = 3;
    pub const FE0: u8 = 4;
    pub const UDRE0: u8 = 5;
    pub const RXC0: u8 = 7;
    pub const TXEN0: u8 = 3;
    pub const RXEN0: u8 = 4;
    pub const UCSZ00: u8 = 1;
    pub const UCSZ01: u8 = 2;

    pub const WDP0: u8 = 0;
    pub const WDP1: u8 = 1;
    pub const WDP2: u8 = 2;
    pub const WDE: u8 = 3;
    pub const WDCE: u8 = 4;
    pub const WDP3: u8 = 5;
}

/// Mask with bit `n` set
pub const fn bit(n: u8) -> u8 {
    1 << n
}

/// Access to the chip's registers
///
/// Implementors provide plain reads and writes; the provided methods
/// build read-modify-write sequences that run inside a critical section,
/// so an interrupt can never interleave with them.
pub trait RegisterBank {
    /// Read a register
    fn read(&self, reg: Reg) -> u8;

    /// Write a register
    fn write(&self, reg: Reg, value: u8);

    /// Execute the watchdog reset instruction
    fn watchdog_reset(&self);

    /// Read-modify-write a register with interrupts disabled
    fn modify(&self, reg: Reg, f: impl FnOnce(u8) -> u8) {
        critical_section::with(|_| {
            let value = self.read(reg);
            self.write(reg, f(value));
        });
    }

    /// Set the bits in `mask`
    fn set_bits(&self, reg: Reg, mask: u8) {
        self.modify(reg, |value| value | mask);
    }

    /// Clear the bits in `mask`
    fn clear_bits(&self, reg: Reg, mask: u8) {
        self.modify(reg, |value| value & !mask);
    }

    /// Set or clear the bits in `mask`
    fn assign_bits(&self, reg: Reg, mask: u8, set: bool) {
        if set {
            self.set_bits(reg, mask);
        } else {
            self.clear_bits(reg, mask);
        }
    }

    /// Check if bit `n` is set
    fn is_set(&self, reg: Reg, n: u8) -> bool {
        self.read(reg) & bit(n) != 0
    }

    /// Write a 16-bit register pair, high byte first
    fn write_u16(&self, low: Reg, high: Reg, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        critical_section::with(|_| {
            self.write(high, hi);
            self.write(low, lo);
        });
    }
}

/// GPIO port group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    B,
    C,
    D,
}

impl Port {
    /// Every port, in callback index order
    pub const ALL: [Port; PORT_COUNT] = [Port::B, Port::C, Port::D];

    /// Callback table index of the port's pin-change interrupt
    pub const fn index(self) -> usize {
        match self {
            Port::B => 0,
            Port::C => 1,
            Port::D => 2,
        }
    }

    /// Registers and pin range of the port
    pub fn descriptor(self) -> &'static PortDescriptor {
        &PORTS[self.index()]
    }
}

/// Registers of one GPIO port group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDescriptor {
    /// Input level register; writing a one toggles the output latch
    pub input: Reg,
    /// Direction register (1 = output)
    pub direction: Reg,
    /// Output latch, or pull-up enable for inputs
    pub output: Reg,
    /// Per-pin pin-change interrupt mask
    pub interrupt_mask: Reg,
    /// Port enable bit in [`Reg::Pcicr`]
    pub interrupt_enable_bit: u8,
    /// First logical pin id on the port
    pub first_pin: u8,
    /// Number of pins on the port
    pub width: u8,
}

/// Port table, indexed by [`Port::index`]
pub static PORTS: [PortDescriptor; PORT_COUNT] = [
    PortDescriptor {
        input: Reg::Pinb,
        direction: Reg::Ddrb,
        output: Reg::Portb,
        interrupt_mask: Reg::Pcmsk0,
        interrupt_enable_bit: bits::PCIE0,
        first_pin: 8,
        width: 6,
    },
    PortDescriptor {
        input: Reg::Pinc,
        direction: Reg::Ddrc,
        output: Reg::Portc,
        interrupt_mask: Reg::Pcmsk1,
        interrupt_enable_bit: bits::PCIE1,
        first_pin: 14,
        width: 6,
    },
    PortDescriptor {
        input: Reg::Pind,
        direction: Reg::Ddrd,
        output: Reg::Portd,
        interrupt_mask: Reg::Pcmsk2,
        interrupt_enable_bit: bits::PCIE2,
        first_pin: 0,
        width: 8,
    },
];

/// Resolve a logical pin id to its port and bit position
pub fn locate_pin(pin: u8) -> Option<(Port, u8)> {
    Port::ALL.iter().find_map(|&port| {
        let desc = port.descriptor();
        let offset = pin.checked_sub(desc.first_pin)?;
        (offset < desc.width).then_some((port, offset))
    })
}

/// 16-bit compare value loaded when a circuit is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareMatch {
    pub low: Reg,
    pub high: Reg,
    pub value: u16,
}

/// Registers and timing of one timer circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitDescriptor {
    /// Interrupt mask register
    pub interrupt_mask: Reg,
    /// Tick interrupt bit in the mask register
    pub interrupt_bit: u8,
    /// Control register holding the prescaler
    pub control: Reg,
    /// Control register value while the circuit is in use
    pub prescaler: u8,
    /// Compare value for circuits ticking on compare match
    pub compare: Option<CompareMatch>,
    /// Time between ticks
    pub tick_interval_us: u32,
}

/// Timer circuit table, indexed by circuit number
pub static CIRCUITS: [CircuitDescriptor; TIMER_CIRCUITS] = [
    CircuitDescriptor {
        interrupt_mask: Reg::Timsk0,
        interrupt_bit: bits::TOIE0,
        control: Reg::Tccr0b,
        prescaler: bit(bits::CS01),
        compare: None,
        tick_interval_us: TICK_INTERVAL_US,
    },
    CircuitDescriptor {
        interrupt_mask: Reg::Timsk1,
        interrupt_bit: bits::OCIE1A,
        control: Reg::Tccr1b,
        prescaler: bit(bits::CS11) | bit(bits::WGM12),
        compare: Some(CompareMatch {
            low: Reg::Ocr1al,
            high: Reg::Ocr1ah,
            value: 256,
        }),
        tick_interval_us: TICK_INTERVAL_US,
    },
    CircuitDescriptor {
        interrupt_mask: Reg::Timsk2,
        interrupt_bit: bits::TOIE2,
        control: Reg::Tccr2b,
        prescaler: bit(bits::CS21),
        compare: None,
        tick_interval_us: TICK_INTERVAL_US,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use thermoblink_core::config::PIN_COUNT;

    #[test]
    fn test_pin_mapping() {
        assert_eq!(locate_pin(0), Some((Port::D, 0)));
        assert_eq!(locate_pin(7), Some((Port::D, 7)));
        assert_eq!(locate_pin(8), Some((Port::B, 0)));
        assert_eq!(locate_pin(13), Some((Port::B, 5)));
        assert_eq!(locate_pin(14), Some((Port::C, 0)));
        assert_eq!(locate_pin(19), Some((Port::C, 5)));
        assert_eq!(locate_pin(20), None);
    }

    #[test]
    fn test_every_pin_maps_once() {
        let mut seen = [[false; 8]; PORT_COUNT];
        for pin in 0..PIN_COUNT as u8 {
            let (port, offset) = locate_pin(pin).unwrap();
            assert!(!seen[port.index()][usize::from(offset)]);
            seen[port.index()][usize::from(offset)] = true;
        }
    }

    #[test]
    fn test_port_table_order() {
        for port in Port::ALL {
            assert_eq!(Port::ALL[port.index()], port);
        }
        assert_eq!(Port::B.descriptor().interrupt_mask, Reg::Pcmsk0);
        assert_eq!(Port::D.descriptor().interrupt_enable_bit, bits::PCIE2);
    }

    #[test]
    fn test_register_indices_are_dense() {
        assert_eq!(Reg::Sreg.index(), 0);
        assert_eq!(Reg::Wdtcsr.index(), Reg::COUNT - 1);
    }
}
