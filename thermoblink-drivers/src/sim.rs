//! Host simulation of the register bank
//!
//! [`SimulatedRegisters`] implements [`RegisterBank`] over plain memory
//! and models only the side effects the drivers depend on:
//!
//! - Input registers read the output latch for output pins and the
//!   externally driven level for input pins
//! - Writing an input register flips the output latch bits written
//! - EEPROM writes and reads complete instantly against a backing array
//! - The USART is always ready to transmit, logs transmitted bytes and
//!   serves a queue of received bytes, each optionally flagged with an
//!   error
//! - The watchdog reset instruction is counted

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use heapless::{Deque, Vec};
use portable_atomic::{AtomicU32, Ordering};
use thermoblink_core::config::{PORT_COUNT, STORE_SIZE};

use crate::registers::{bit, bits, locate_pin, Port, Reg, RegisterBank, CIRCUITS};

/// Bytes that can wait in the receive queue
pub const RX_CAPACITY: usize = 64;

/// Bytes kept in the transmit log
pub const TX_CAPACITY: usize = 1024;

const EEPROM_LEN: usize = STORE_SIZE as usize;

struct SimState {
    regs: [u8; Reg::COUNT],
    /// Externally driven pin levels, one bit per port pin
    inputs: [u8; PORT_COUNT],
    eeprom: [u8; EEPROM_LEN],
    eeprom_writes: u32,
    /// Received bytes with their status flags
    rx: Deque<(u8, u8), RX_CAPACITY>,
    tx: Vec<u8, TX_CAPACITY>,
    watchdog_resets: u32,
}

impl SimState {
    fn reg(&self, reg: Reg) -> u8 {
        self.regs[reg.index()]
    }

    fn set_reg(&mut self, reg: Reg, value: u8) {
        self.regs[reg.index()] = value;
    }

    fn eeprom_address(&self) -> usize {
        let address = u16::from_le_bytes([self.reg(Reg::Eearl), self.reg(Reg::Eearh)]);
        usize::from(address) % EEPROM_LEN
    }

    fn write_eecr(&mut self, value: u8) {
        let armed = self.reg(Reg::Eecr) & bit(bits::EEMPE) != 0;
        if value & bit(bits::EEPE) != 0 {
            if armed {
                let address = self.eeprom_address();
                self.eeprom[address] = self.reg(Reg::Eedr);
                self.eeprom_writes += 1;
            }
            self.set_reg(Reg::Eecr, 0);
        } else if value & bit(bits::EERE) != 0 {
            let byte = self.eeprom[self.eeprom_address()];
            self.set_reg(Reg::Eedr, byte);
            self.set_reg(Reg::Eecr, value & !bit(bits::EERE));
        } else {
            self.set_reg(Reg::Eecr, value);
        }
    }
}

fn port_of_input(reg: Reg) -> Option<Port> {
    Port::ALL
        .into_iter()
        .find(|port| port.descriptor().input == reg)
}

/// Register bank backed by memory
pub struct SimulatedRegisters {
    state: Mutex<CriticalSectionRawMutex, RefCell<SimState>>,
}

impl SimulatedRegisters {
    /// All registers zero, EEPROM erased, nothing received
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(SimState {
                regs: [0; Reg::COUNT],
                inputs: [0; PORT_COUNT],
                eeprom: [0xFF; EEPROM_LEN],
                eeprom_writes: 0,
                rx: Deque::new(),
                tx: Vec::new(),
                watchdog_resets: 0,
            })),
        }
    }

    fn with<U>(&self, f: impl FnOnce(&mut SimState) -> U) -> U {
        self.state.lock(|state| f(&mut state.borrow_mut()))
    }

    /// Drive the external level of logical pin `pin`
    ///
    /// Unknown pins are ignored.
    pub fn set_input(&self, pin: u8, high: bool) {
        let Some((port, offset)) = locate_pin(pin) else {
            return;
        };
        self.with(|state| {
            let level = &mut state.inputs[port.index()];
            if high {
                *level |= bit(offset);
            } else {
                *level &= !bit(offset);
            }
        });
    }

    /// Queue received bytes
    ///
    /// Bytes beyond [`RX_CAPACITY`] are dropped.
    pub fn push_rx(&self, bytes: &[u8]) {
        self.with(|state| {
            for &byte in bytes {
                if state.rx.push_back((byte, 0)).is_err() {
                    break;
                }
            }
        });
    }

    /// Queue a byte received without a valid stop bit
    pub fn inject_framing_error(&self) {
        self.with(|state| {
            let _ = state.rx.push_back((0, bit(bits::FE0)));
        });
    }

    /// Queue a byte flagged as following a lost byte
    pub fn inject_overrun(&self) {
        self.with(|state| {
            let _ = state.rx.push_back((0, bit(bits::DOR0)));
        });
    }

    /// Bytes transmitted so far
    pub fn transmitted(&self) -> Vec<u8, TX_CAPACITY> {
        self.with(|state| state.tx.clone())
    }

    pub fn clear_transmitted(&self) {
        self.with(|state| state.tx.clear());
    }

    /// Contents of EEPROM cell `address`
    pub fn eeprom_byte(&self, address: u16) -> u8 {
        self.with(|state| state.eeprom[usize::from(address) % EEPROM_LEN])
    }

    /// Fill EEPROM cells starting at `address`
    pub fn preload_eeprom(&self, address: u16, bytes: &[u8]) {
        self.with(|state| {
            let start = usize::from(address);
            for (cell, &byte) in state.eeprom.iter_mut().skip(start).zip(bytes) {
                *cell = byte;
            }
        });
    }

    /// Number of completed EEPROM programming operations
    pub fn eeprom_writes(&self) -> u32 {
        self.with(|state| state.eeprom_writes)
    }

    /// Number of watchdog reset instructions executed
    pub fn watchdog_resets(&self) -> u32 {
        self.with(|state| state.watchdog_resets)
    }

    /// Check if a level change on `pin` would raise an interrupt
    pub fn pin_interrupt_armed(&self, pin: u8) -> bool {
        let Some((port, offset)) = locate_pin(pin) else {
            return false;
        };
        let desc = port.descriptor();
        self.with(|state| {
            state.reg(desc.interrupt_mask) & bit(offset) != 0
                && state.reg(Reg::Pcicr) & bit(desc.interrupt_enable_bit) != 0
        })
    }

    /// Check if timer `circuit` raises tick interrupts
    pub fn timer_armed(&self, circuit: usize) -> bool {
        let Some(desc) = CIRCUITS.get(circuit) else {
            return false;
        };
        self.with(|state| state.reg(desc.interrupt_mask) & bit(desc.interrupt_bit) != 0)
    }
}

impl Default for SimulatedRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBank for SimulatedRegisters {
    fn read(&self, reg: Reg) -> u8 {
        self.with(|state| {
            if let Some(port) = port_of_input(reg) {
                let desc = port.descriptor();
                let ddr = state.reg(desc.direction);
                return (state.reg(desc.output) & ddr) | (state.inputs[port.index()] & !ddr);
            }
            match reg {
                Reg::Ucsr0a => {
                    let rx = match state.rx.front() {
                        Some(&(_, flags)) => bit(bits::RXC0) | flags,
                        None => 0,
                    };
                    bit(bits::UDRE0) | rx
                }
                Reg::Udr0 => state.rx.pop_front().map_or(0, |(byte, _)| byte),
                _ => state.reg(reg),
            }
        })
    }

    fn write(&self, reg: Reg, value: u8) {
        self.with(|state| {
            if let Some(port) = port_of_input(reg) {
                let output = port.descriptor().output;
                let latch = state.reg(output);
                state.set_reg(output, latch ^ value);
                return;
            }
            match reg {
                Reg::Udr0 => {
                    let _ = state.tx.push(value);
                }
                Reg::Eecr => state.write_eecr(value),
                _ => state.set_reg(reg, value),
            }
        });
    }

    fn watchdog_reset(&self) {
        self.with(|state| state.watchdog_resets += 1);
    }
}

/// [`DelayNs`] that returns at once, optionally tallying milliseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct SimDelay<'a> {
    elapsed_ms: Option<&'a AtomicU32>,
}

impl<'a> SimDelay<'a> {
    pub const fn new() -> Self {
        Self { elapsed_ms: None }
    }

    /// Add every requested delay to `elapsed_ms`
    pub const fn counting(elapsed_ms: &'a AtomicU32) -> Self {
        Self {
            elapsed_ms: Some(elapsed_ms),
        }
    }

    fn add(&self, ms: u32) {
        if let Some(elapsed) = self.elapsed_ms {
            elapsed.fetch_add(ms, Ordering::Relaxed);
        }
    }
}

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.add(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.add(ms);
    }
}
