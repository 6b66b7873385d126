//! Core value types for the IR object model.
//!
//! Addresses are plain `u64` values with a sentinel for "no address";
//! ranges are half-open; every entity is identified by a `NodeId`.

pub mod address;
pub mod address_range;
pub mod id;
