//! # Record Deltas
//!
//! Partial updates between two versions of the same record. Instead of
//! shipping or logging a whole record after a small change, callers compute
//! a [`Delta`] against the snapshot the receiver already holds and send
//! only that.
//!
//! ```text
//!   original ──┐
//!              ├── compute_delta ──► Delta ──► serialize_delta ──► bytes
//!   current ───┘                                                     │
//!                                                                    ▼
//!   original ─────────── apply_delta ◄── Delta ◄── deserialize_delta
//!        │
//!        ▼
//!   record equal to current
//! ```
//!
//! ## Module Structure
//!
//! - `ops`: the operation types
//! - `compute`: minimal diff of two records
//! - `apply`: replay onto an original snapshot
//! - `codec`: self-delimiting byte format
//!
//! ## Guarantees
//!
//! For a delta computed from `(original, current)`, applying it to
//! `original` yields a record equal to `current`. A field that is unchanged
//! produces no operation. An explicit `Null` is a value like any other and
//! is distinct from a removed field.
//!
//! A delta is meant for the exact snapshot it was computed against. There is
//! no conflict detection; two independent deltas against the same original
//! must be reconciled by the caller before both are applied.

mod apply;
mod codec;
mod compute;
mod ops;

pub use apply::apply_delta;
pub use codec::{delta_field_names, deserialize_delta, serialize_delta};
pub use compute::compute_delta;
pub use ops::{CollectionDelta, Delta, DeltaOp, ListOp, MapOp, NestedChange, RidOp, SetOp};
