//! Interrupt-safe callback dispatch
//!
//! A fixed-capacity table mapping a small resource index (a port group or
//! a timer circuit) to a zero-argument callback. Entries are written from
//! the main thread when channels are created or dropped; interrupt
//! handlers only look them up and call them.
//!
//! Lookup is direct indexing into an array: no allocation, no blocking.

/// Callback invoked from interrupt context
pub type Callback = fn();

/// Errors from dispatch table updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// The index is not below the table's capacity
    InvalidIndex,
}

/// Callback table with one slot per resource index
#[derive(Debug, Clone, Copy)]
pub struct CallbackDispatch<const N: usize> {
    slots: [Option<Callback>; N],
}

impl<const N: usize> Default for CallbackDispatch<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CallbackDispatch<N> {
    /// Create a table with every slot empty
    pub const fn new() -> Self {
        Self { slots: [None; N] }
    }

    /// Number of slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Register `callback` at `index`, replacing any previous entry
    pub fn add(&mut self, index: usize, callback: Callback) -> Result<(), DispatchError> {
        let slot = self.slots.get_mut(index).ok_or(DispatchError::InvalidIndex)?;
        *slot = Some(callback);
        Ok(())
    }

    /// Clear the entry at `index`
    pub fn remove(&mut self, index: usize) -> Result<(), DispatchError> {
        let slot = self.slots.get_mut(index).ok_or(DispatchError::InvalidIndex)?;
        *slot = None;
        Ok(())
    }

    /// Look up the callback at `index`
    pub fn get(&self, index: usize) -> Option<Callback> {
        self.slots.get(index).copied().flatten()
    }

    /// Check if a callback is registered at `index`
    pub fn is_set(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Call the callback at `index`
    ///
    /// Returns `false` without doing anything if the index is invalid or
    /// the slot is empty.
    pub fn invoke(&self, index: usize) -> bool {
        match self.get(index) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}
