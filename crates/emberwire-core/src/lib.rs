//! Emberwire Core
//!
//! This crate holds the pure, transport-free pieces of the Emberwire client:
//!
//! 1. **Error taxonomy**: every way a result stream can go wrong, with enough
//!    context (frame index, byte offset, column index) to diagnose a
//!    server/client protocol skew without re-running a query.
//! 2. **Varint codec**: unsigned LEB128 integers used by the wire header and
//!    every variable-width cell encoding.
//! 3. **Fingerprint hasher**: the 128-bit CityHash v1.0.2 checksum that guards
//!    every compressed frame.
//! 4. **Type system**: the declared-type grammar (`Nullable(Int32)`,
//!    `Array(Decimal(18, 4))`, ...) parsed into an exhaustive `ResolvedType`
//!    enum, plus the `Value` runtime representation of decoded cells.
//!
//! Everything here is deterministic and free of shared mutable state, so any
//! number of result sets can decode concurrently without coordination.

pub mod cityhash;
pub mod error;
pub mod types;
pub mod value;
pub mod varint;

pub use error::{Error, Result};
pub use types::ResolvedType;
pub use value::{Decimal, Value};
