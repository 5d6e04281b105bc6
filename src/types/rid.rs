//! # Record Identity
//!
//! A `RecordId` names a persisted record by `(cluster id, cluster position)`.
//! Ordering is by cluster first, then position, which is exactly the derived
//! field order. The textual form is `#<cluster>:<position>`; the null
//! identity `#-1:-1` stands for "no record" inside link collections.

use std::fmt;
use std::str::FromStr;

use eyre::{bail, Result, WrapErr};

use crate::config::{NULL_CLUSTER_ID, NULL_CLUSTER_POSITION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub cluster_id: i32,
    pub cluster_position: i64,
}

impl RecordId {
    pub const NULL: RecordId = RecordId {
        cluster_id: NULL_CLUSTER_ID,
        cluster_position: NULL_CLUSTER_POSITION,
    };

    pub const fn new(cluster_id: i32, cluster_position: i64) -> Self {
        Self {
            cluster_id,
            cluster_position,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// True when the identity points at a stored record.
    pub fn is_persistent(&self) -> bool {
        self.cluster_id >= 0 && self.cluster_position >= 0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster_id, self.cluster_position)
    }
}

impl FromStr for RecordId {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let body = s.trim().strip_prefix('#').unwrap_or(s.trim());
        let Some((cluster, position)) = body.split_once(':') else {
            bail!("invalid record id '{}': expected #<cluster>:<position>", s);
        };
        let cluster_id = cluster
            .parse::<i32>()
            .wrap_err_with(|| format!("invalid cluster id in '{}'", s))?;
        let cluster_position = position
            .parse::<i64>()
            .wrap_err_with(|| format!("invalid cluster position in '{}'", s))?;
        Ok(Self::new(cluster_id, cluster_position))
    }
}
