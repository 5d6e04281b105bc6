//! # RidSet - Sparse Bitmap of Record Identities
//!
//! `RidSet` stores a set of [`RecordId`]s as one sparse bitmap per cluster.
//! It is the value of a LinkBag field and the working set the delta engine
//! uses to diff link collections.
//!
//! ## Layout
//!
//! ```text
//! RidSet
//!   └─ BTreeMap<cluster_id, SparseBitmap>
//!        └─ BTreeMap<block, u64>      block = position >> 6
//!                                     bit   = position & 63
//! ```
//!
//! A RID is present iff bit `position & 63` of block `position >> 6` under
//! its cluster is set. Positions are bucketed with arithmetic shifts, which
//! floor toward negative infinity, so negative positions land in negative
//! blocks without colliding with positive ones.
//!
//! ## Memory
//!
//! Only blocks that ever held a RID are allocated, so positions anywhere in
//! the `i64` range (2×10^12 and beyond) cost one map entry per occupied
//! 64-position block. Removal clears the bit but leaves the block in place;
//! equality and iteration skip empty blocks.
//!
//! ## Iteration
//!
//! [`RidSet::iter`] is lazy and yields RIDs in ascending
//! `(cluster_id, position)` order: clusters, then blocks, then set bits
//! from low to high.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::{RID_BLOCK_MASK, RID_BLOCK_SHIFT};
use crate::types::RecordId;

#[derive(Debug, Clone, Default)]
struct SparseBitmap {
    blocks: BTreeMap<i64, u64>,
}

#[inline]
fn split_position(position: i64) -> (i64, u32) {
    (position >> RID_BLOCK_SHIFT, (position & RID_BLOCK_MASK) as u32)
}

impl SparseBitmap {
    fn insert(&mut self, position: i64) -> bool {
        let (block, bit) = split_position(position);
        let word = self.blocks.entry(block).or_insert(0);
        let mask = 1u64 << bit;
        let added = *word & mask == 0;
        *word |= mask;
        added
    }

    fn contains(&self, position: i64) -> bool {
        let (block, bit) = split_position(position);
        self.blocks
            .get(&block)
            .is_some_and(|word| word & (1u64 << bit) != 0)
    }

    fn remove(&mut self, position: i64) -> bool {
        let (block, bit) = split_position(position);
        match self.blocks.get_mut(&block) {
            Some(word) => {
                let mask = 1u64 << bit;
                let present = *word & mask != 0;
                *word &= !mask;
                present
            }
            None => false,
        }
    }

    fn count(&self) -> usize {
        self.blocks.values().map(|w| w.count_ones() as usize).sum()
    }
}

#[derive(Clone, Default)]
pub struct RidSet {
    clusters: BTreeMap<i32, SparseBitmap>,
}

impl RidSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `rid`, returning true if it was not already present.
    pub fn add(&mut self, rid: RecordId) -> bool {
        self.clusters
            .entry(rid.cluster_id)
            .or_default()
            .insert(rid.cluster_position)
    }

    pub fn contains(&self, rid: RecordId) -> bool {
        self.clusters
            .get(&rid.cluster_id)
            .is_some_and(|bitmap| bitmap.contains(rid.cluster_position))
    }

    /// Removes `rid`, returning true if it was present.
    pub fn remove(&mut self, rid: RecordId) -> bool {
        self.clusters
            .get_mut(&rid.cluster_id)
            .is_some_and(|bitmap| bitmap.remove(rid.cluster_position))
    }

    pub fn len(&self) -> usize {
        self.clusters.values().map(SparseBitmap::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn clear(&mut self) {
        self.clusters.clear();
    }

    pub fn iter(&self) -> RidSetIter<'_> {
        RidSetIter {
            clusters: self.clusters.iter(),
            cluster_id: 0,
            blocks: None,
            block: 0,
            word: 0,
        }
    }

    /// RIDs in `self` that are not in `other`, in ascending order.
    pub fn difference<'a>(&'a self, other: &'a RidSet) -> impl Iterator<Item = RecordId> + 'a {
        self.iter().filter(move |rid| !other.contains(*rid))
    }
}

pub struct RidSetIter<'a> {
    clusters: btree_map::Iter<'a, i32, SparseBitmap>,
    cluster_id: i32,
    blocks: Option<btree_map::Iter<'a, i64, u64>>,
    block: i64,
    word: u64,
}

impl Iterator for RidSetIter<'_> {
    type Item = RecordId;

    fn next(&mut self) -> Option<RecordId> {
        loop {
            if self.word != 0 {
                let bit = self.word.trailing_zeros();
                self.word &= self.word - 1;
                let position = (self.block << RID_BLOCK_SHIFT) | i64::from(bit);
                return Some(RecordId::new(self.cluster_id, position));
            }
            if let Some((&block, &word)) = self.blocks.as_mut().and_then(Iterator::next) {
                self.block = block;
                self.word = word;
                continue;
            }
            let (&cluster_id, bitmap) = self.clusters.next()?;
            self.cluster_id = cluster_id;
            self.blocks = Some(bitmap.blocks.iter());
        }
    }
}

impl<'a> IntoIterator for &'a RidSet {
    type Item = RecordId;
    type IntoIter = RidSetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<RecordId> for RidSet {
    fn from_iter<I: IntoIterator<Item = RecordId>>(iter: I) -> Self {
        let mut set = RidSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<RecordId> for RidSet {
    fn extend<I: IntoIterator<Item = RecordId>>(&mut self, iter: I) {
        for rid in iter {
            self.add(rid);
        }
    }
}

impl PartialEq for RidSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for RidSet {}

impl fmt::Debug for RidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
