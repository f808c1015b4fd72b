//! Exclusive reservation of discrete hardware resources
//!
//! One arbiter tracks one kind of resource (pins, timer circuits). Each
//! resource is identified by a small index and owned by at most one
//! channel at a time.

/// Errors from resource reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReserveError {
    /// The id is not below the arbiter's capacity
    OutOfRange,
    /// The resource is owned by another channel
    AlreadyReserved,
}

/// Ownership table for `N` resources
///
/// Backed by a single bitmask, so `N` may not exceed 32. The arbiter is a
/// plain value; owners that share it with interrupt handlers keep it
/// behind a critical-section mutex so reserve and release are atomic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceArbiter<const N: usize> {
    /// Bitmask of reserved ids
    reserved: u32,
}

impl<const N: usize> Default for ResourceArbiter<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ResourceArbiter<N> {
    const CAPACITY_CHECK: () = assert!(N <= 32, "ResourceArbiter holds at most 32 resources");

    /// Create an arbiter with every resource free
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_CHECK;
        Self { reserved: 0 }
    }

    /// Number of resources tracked
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Reserve resource `id`
    pub fn reserve(&mut self, id: usize) -> Result<(), ReserveError> {
        if id >= N {
            return Err(ReserveError::OutOfRange);
        }
        let mask = 1u32 << id;
        if self.reserved & mask != 0 {
            return Err(ReserveError::AlreadyReserved);
        }
        self.reserved |= mask;
        Ok(())
    }

    /// Reserve the lowest free resource, returning its id
    pub fn reserve_first_free(&mut self) -> Option<usize> {
        let id = (0..N).find(|&id| !self.is_reserved(id))?;
        self.reserved |= 1u32 << id;
        Some(id)
    }

    /// Release resource `id`
    ///
    /// Releasing a free or out-of-range id does nothing.
    pub fn release(&mut self, id: usize) {
        if id < N {
            self.reserved &= !(1u32 << id);
        }
    }

    /// Check if resource `id` is reserved
    pub fn is_reserved(&self, id: usize) -> bool {
        id < N && self.reserved & (1u32 << id) != 0
    }

    /// Number of reserved resources
    pub fn reserved_count(&self) -> usize {
        self.reserved.count_ones() as usize
    }

    /// Check if every resource is reserved
    pub fn is_full(&self) -> bool {
        self.reserved_count() == N
    }
}
