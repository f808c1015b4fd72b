//! Persistent storage abstraction
//!
//! Byte-addressed non-volatile memory over a fixed address space
//! `[0, size)`. Multi-byte values are stored little-endian across
//! consecutive addresses.

/// Largest value, in bytes, that can be stored in one access
pub const MAX_VALUE_SIZE: usize = 8;

/// Errors from persistent storage access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The store is disabled
    Disabled,
    /// The value would extend past the end of the store
    OutOfRange,
}

mod private {
    pub trait Sealed {}
}

/// Value that can be stored in persistent storage
///
/// Implemented for unsigned integers up to 64 bits and for `bool`,
/// which is stored as a single `0`/`1` byte. Any nonzero byte reads back
/// as `true`, erased cells (`0xFF`) included.
pub trait StoreValue: Copy + private::Sealed {
    /// Number of bytes the value occupies
    const SIZE: usize;

    /// Encode into `out` (exactly `SIZE` bytes), low byte first
    fn write_le(self, out: &mut [u8]);

    /// Decode from `bytes` (exactly `SIZE` bytes), low byte first
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_store_value {
    ($($ty:ty),*) => {
        $(
            impl private::Sealed for $ty {}

            impl StoreValue for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_store_value!(u8, u16, u32, u64);

impl private::Sealed for bool {}

impl StoreValue for bool {
    const SIZE: usize = 1;

    fn write_le(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

/// Byte-addressed persistent storage
///
/// Implementors provide raw byte access; the typed, range-checked
/// [`Eeprom::write`] and [`Eeprom::read`] are built on top.
pub trait Eeprom {
    /// Size of the address space in bytes
    fn size(&self) -> u16;

    /// Check if the store is usable
    fn is_initialized(&self) -> bool;

    /// Check if reads and writes are allowed
    fn is_enabled(&self) -> bool;

    /// Allow or block reads and writes
    fn set_enabled(&self, enabled: bool);

    /// Write one byte, without range or enable checks
    fn write_byte(&self, address: u16, byte: u8);

    /// Read one byte, without range or enable checks
    fn read_byte(&self, address: u16) -> u8;

    /// Check if `len` bytes starting at `address` fit in the store
    fn is_address_valid(&self, address: u16, len: usize) -> bool {
        usize::from(address)
            .checked_add(len)
            .is_some_and(|end| end <= usize::from(self.size()))
    }

    /// Write `value` at `address`, low byte first
    fn write<V: StoreValue>(&self, address: u16, value: V) -> Result<(), StoreError> {
        check_access(self, address, V::SIZE)?;

        let mut bytes = [0u8; MAX_VALUE_SIZE];
        value.write_le(&mut bytes[..V::SIZE]);
        for (offset, byte) in (0u16..).zip(&bytes[..V::SIZE]) {
            self.write_byte(address + offset, *byte);
        }
        Ok(())
    }

    /// Read a value stored at `address`
    fn read<V: StoreValue>(&self, address: u16) -> Result<V, StoreError> {
        check_access(self, address, V::SIZE)?;

        let mut bytes = [0u8; MAX_VALUE_SIZE];
        for (offset, byte) in (0u16..).zip(bytes[..V::SIZE].iter_mut()) {
            *byte = self.read_byte(address + offset);
        }
        Ok(V::read_le(&bytes[..V::SIZE]))
    }
}

fn check_access<E: Eeprom + ?Sized>(store: &E, address: u16, len: usize) -> Result<(), StoreError> {
    if !store.is_enabled() {
        return Err(StoreError::Disabled);
    }
    if !store.is_address_valid(address, len) {
        return Err(StoreError::OutOfRange);
    }
    Ok(())
}

impl<T: Eeprom + ?Sized> Eeprom for &T {
    fn size(&self) -> u16 {
        (**self).size()
    }

    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        (**self).set_enabled(enabled)
    }

    fn write_byte(&self, address: u16, byte: u8) {
        (**self).write_byte(address, byte)
    }

    fn read_byte(&self, address: u16) -> u8 {
        (**self).read_byte(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};

    /// Mock store backed by a small array
    struct MockStore {
        bytes: RefCell<[u8; 16]>,
        enabled: Cell<bool>,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                bytes: RefCell::new([0xFF; 16]),
                enabled: Cell::new(true),
            }
        }
    }

    impl Eeprom for MockStore {
        fn size(&self) -> u16 {
            16
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
            self.bytes.borrow_mut()[usize::from(address)] = byte;
        }

        fn read_byte(&self, address: u16) -> u8 {
            self.bytes.borrow()[usize::from(address)]
        }
    }

    #[test]
    fn test_little_endian_layout() {
        let store = MockStore::new();
        store.write(2, 0x1234_5678u32).unwrap();

        assert_eq!(&store.bytes.borrow()[2..6], &[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(store.read::<u32>(2), Ok(0x1234_5678));
        assert_eq!(store.read::<u16>(4), Ok(0x1234));
    }

    #[test]
    fn test_last_fitting_address() {
        let store = MockStore::new();
        assert!(store.write(14, 0xBEEFu16).is_ok());
        assert_eq!(store.write(15, 0xBEEFu16), Err(StoreError::OutOfRange));
        assert_eq!(store.read::<u8>(16), Err(StoreError::OutOfRange));
        assert_eq!(store.read::<u64>(u16::MAX), Err(StoreError::OutOfRange));
    }

    #[test]
    fn test_disabled_store_is_untouched() {
        let store = MockStore::new();
        store.set_enabled(false);

        assert_eq!(store.write(0, 0u8), Err(StoreError::Disabled));
        assert_eq!(store.read::<u8>(0), Err(StoreError::Disabled));
        assert_eq!(store.bytes.borrow()[0], 0xFF);
    }

    #[test]
    fn test_bool_values() {
        let store = MockStore::new();
        store.write(0, true).unwrap();
        assert_eq!(store.bytes.borrow()[0], 1);
        assert_eq!(store.read::<bool>(0), Ok(true));

        store.write(0, false).unwrap();
        assert_eq!(store.read::<bool>(0), Ok(false));

        // Erased cell
        store.write(0, 0xFFu8).unwrap();
        assert_eq!(store.read::<bool>(0), Ok(true));

        store.write(0, 2u8).unwrap();
        assert_eq!(store.read::<bool>(0), Ok(true));
    }

    #[test]
    fn test_borrowed_store_forwards() {
        let store = MockStore::new();
        let borrowed = &store;
        borrowed.write(7, 0xA5u8).unwrap();
        assert_eq!(store.read::<u8>(7), Ok(0xA5));
    }
}
