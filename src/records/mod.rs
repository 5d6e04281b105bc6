//! # Records
//!
//! In-memory record structures the codecs read from and write to.
//!
//! ## Module Structure
//!
//! - `record`: `Record`, an ordered field map with class name and identity
//! - `ridset`: `RidSet`, a sparse bitmap of record identities
//! - `arena`: `RecordArena`, a flattened record tree with dirty tracking
//!
//! ## Ownership
//!
//! None of these types are shared between threads by the codec. A caller
//! that shares a `Record` or `RidSet` across threads synchronizes access
//! itself; every codec call borrows its input only for the duration of the
//! call.

mod arena;
mod record;
mod ridset;

pub use arena::{NodeId, RecordArena};
pub use record::Record;
pub use ridset::{RidSet, RidSetIter};
