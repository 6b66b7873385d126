//! Address keys for indexed IR entities.
//!
//! Entities are located by a plain `u64` address. An entity without a fixed
//! address is keyed at [`UNDEFINED_ADDRESS_KEY`], which is the same key a
//! genuine address of `0` gets. Callers that need to tell the two apart must
//! look at the entity's `Option<u64>` address, not at its key.

/// Key used for entities whose address is not known.
///
/// NOTE: collides with real address zero. Items at address 0 and items with
/// no address share a bucket and are returned together by key queries.
pub const UNDEFINED_ADDRESS_KEY: u64 = 0;

/// Map an optional address to the key it is indexed under.
#[inline]
pub fn start_key(address: Option<u64>) -> u64 {
    address.unwrap_or(UNDEFINED_ADDRESS_KEY)
}

/// Exclusive end of `[start, start + size)` without overflow.
#[inline]
pub fn span_end(start: u64, size: u64) -> u128 {
    start as u128 + size as u128
}

/// Whether `[start, start + size)` contains `address`.
#[inline]
pub fn span_contains(start: u64, size: u64, address: u64) -> bool {
    address >= start && address - start < size
}

/// Whether `[start, start + size)` intersects the query `lo..=hi`.
///
/// `hi` is an inclusive endpoint: an item starting exactly at `hi` matches,
/// including zero-sized items there.
#[inline]
pub fn span_intersects(start: u64, size: u64, lo: u64, hi: u64) -> bool {
    start <= hi && span_end(start, size) > lo as u128
}
