//! # Codec Constants
//!
//! This module centralizes all byte-format constants, grouping interdependent
//! values together. Anything written to a buffer by one component and read
//! back by another is defined here so the two sides cannot drift apart.
//!
//! ## Dependency Graph
//!
//! ```text
//! MAX_VARINT_LEN (10)
//!       │
//!       └─> ceil(64 / VARINT_PAYLOAD_BITS): a zigzagged i64 never needs more
//!
//! RID_BLOCK_BITS (64)
//!       │
//!       └─> RID_BLOCK_SHIFT (6): position >> 6 selects the block
//!           RID_BLOCK_MASK (63): position & 63 selects the bit
//!
//! MILLIS_PER_DAY
//!       │
//!       └─> Date payloads are whole days; DateTime payloads are millis
//! ```
//!
//! ## Stability
//!
//! Every constant in the "wire format" sections is part of the persisted
//! format. Changing one invalidates existing data.

// ============================================================================
// VARINT FORMAT
// Zigzag encoding followed by 7-bit groups, low-order group first
// ============================================================================

/// Bits of payload carried by each varint byte.
pub const VARINT_PAYLOAD_BITS: u32 = 7;

/// Continuation flag in each varint byte.
pub const VARINT_CONTINUATION: u8 = 0x80;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

const _: () = assert!(
    MAX_VARINT_LEN == 64usize.div_ceil(VARINT_PAYLOAD_BITS as usize),
    "MAX_VARINT_LEN must cover a full 64-bit payload"
);

// ============================================================================
// RID SET LAYOUT
// ============================================================================

/// Number of cluster positions covered by one bitmap block.
pub const RID_BLOCK_BITS: i64 = 64;

/// Shift that turns a cluster position into its block key.
pub const RID_BLOCK_SHIFT: u32 = 6;

/// Mask that turns a cluster position into its bit index inside a block.
pub const RID_BLOCK_MASK: i64 = RID_BLOCK_BITS - 1;

const _: () = assert!(
    1i64 << RID_BLOCK_SHIFT == RID_BLOCK_BITS,
    "RID_BLOCK_SHIFT must match RID_BLOCK_BITS"
);

// ============================================================================
// RECORD IDENTITY
// ============================================================================

/// Cluster id of the null record identity (`#-1:-1`).
pub const NULL_CLUSTER_ID: i32 = -1;

/// Cluster position of the null record identity (`#-1:-1`).
pub const NULL_CLUSTER_POSITION: i64 = -1;

// ============================================================================
// VALUE PAYLOADS (wire format)
// ============================================================================

/// Link-bag payload mode: RIDs stored inline in the record.
pub const LINKBAG_EMBEDDED: u8 = 1;

/// Link-bag payload mode: pointer to a tree owned by the storage layer.
pub const LINKBAG_TREE: u8 = 2;

/// Size of a storage-format value pointer in the field directory.
pub const VALUE_POINTER_SIZE: usize = 4;

/// Value pointer that marks a null field in the storage-format directory.
pub const NULL_VALUE_POINTER: u32 = 0;

// ============================================================================
// DELTA FORMAT (wire format)
// ============================================================================

/// A value was appended (list) or added (set/bag).
pub const DELTA_CREATED: u8 = 1;

/// A field or collection slot was overwritten with a full value.
pub const DELTA_REPLACED: u8 = 2;

/// A nested value was changed in place; the body is a nested delta.
pub const DELTA_CHANGED: u8 = 3;

/// A field, key, element or RID was removed.
pub const DELTA_REMOVED: u8 = 4;

// ============================================================================
// DATES
// ============================================================================

/// Milliseconds in one day; Date payloads are stored as whole days.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Default `strftime` pattern for Date values rendered as text.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Default `strftime` pattern for DateTime values rendered as text.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// LIMITS
// ============================================================================

/// Default maximum nesting of embedded records and collections accepted by
/// the decoders. Deeper input is rejected as corrupt.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Largest decimal scale magnitude the codec writes or accepts. Decimals
/// render as text for comparison, so the scale bounds that text.
pub const MAX_DECIMAL_SCALE: i32 = 1024;

/// Initial capacity of a cursor created for encoding a whole record.
pub const RECORD_BUFFER_CAPACITY: usize = 256;
