//! AddressRange type for IR entities.
//!
//! This module provides the AddressRange type that represents half-open
//! contiguous memory regions. Aggregate bounds of sections and modules and
//! the placement of byte intervals are reported through it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::address::span_contains;

/// A half-open contiguous memory region.
///
/// AddressRange represents a contiguous region of memory starting at an address
/// (inclusive) and extending for a given size (exclusive). Zero-sized ranges
/// are allowed; they contain no address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    /// The starting address of the range (inclusive)
    pub start: u64,
    /// The size of the range in bytes
    pub size: u64,
}

impl AddressRange {
    pub fn new(start: u64, size: u64) -> Self {
        AddressRange { start, size }
    }

    /// Get the end address of the range (exclusive).
    ///
    /// Returns `None` if the end is past the top of the address space.
    pub fn end(&self) -> Option<u64> {
        self.start.checked_add(self.size)
    }

    /// Check if the range is empty (size = 0).
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Check if this range contains the given address.
    pub fn contains(&self, address: u64) -> bool {
        span_contains(self.start, self.size, address)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "[{:#x}, {:#x})", self.start, end),
            None => write!(f, "[{:#x}, +{:#x})", self.start, self.size),
        }
    }
}
