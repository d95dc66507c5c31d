use crate::attributes::AttributeSet;
use serde::{Deserialize, Serialize};

/// Run-wide synchronization settings. Identical on every node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Rank of the node that owns the accelerator.
    pub designated_rank: usize,
    /// Optional attribute groups present in the transfer records.
    pub attributes: AttributeSet,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            designated_rank: 0,
            attributes: AttributeSet::default(),
        }
    }
}
