//! Offset assignment for one gather or scatter cycle.
//!
//! Traversal order is rank ascending, then local cell index ascending, then
//! intra-cell index ascending. `TraversalPlan` assigns each rank its span of
//! the shared buffer; `LocalTraversal` assigns each local particle its offset
//! inside its own rank's span. Gather and scatter both go through these two
//! types and nothing else.

use crate::cells::LocalCells;
use crate::error::{SyncError, SyncResult};
use std::ops::Range;

/// Position of one local particle in traversal order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub cell: usize,
    pub index: usize,
    /// Offset within this node's span.
    pub offset: usize,
}

/// Per-cell start offsets of a node's own particles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalTraversal {
    /// `(start, len)` per cell.
    cells: Vec<(usize, usize)>,
    count: usize,
}

impl LocalTraversal {
    pub fn new<C: LocalCells + ?Sized>(store: &C) -> Self {
        let mut count = 0;
        let cells = store
            .cells()
            .iter()
            .map(|cell| {
                let start = count;
                count += cell.particles.len();
                (start, cell.particles.len())
            })
            .collect();
        Self { cells, count }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(cell, &(start, len))| {
                (0..len).map(move |index| Slot {
                    cell,
                    index,
                    offset: start + index,
                })
            })
    }
}

/// Per-rank spans of the designated node's shared buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraversalPlan {
    designated: usize,
    spans: Vec<Range<usize>>,
}

impl TraversalPlan {
    /// Build spans from the counts gathered on `designated`.
    pub fn new(counts: &[usize], designated: usize) -> SyncResult<Self> {
        if designated >= counts.len() {
            return Err(SyncError::InvalidRank {
                rank: designated,
                size: counts.len(),
            });
        }
        let mut cursor = 0;
        let spans = counts
            .iter()
            .map(|&n| {
                let span = cursor..cursor + n;
                cursor = span.end;
                span
            })
            .collect();
        Ok(Self { designated, spans })
    }

    /// Total records across all ranks.
    pub fn total(&self) -> usize {
        self.spans.last().map_or(0, |s| s.end)
    }

    pub fn span(&self, rank: usize) -> Range<usize> {
        self.spans[rank].clone()
    }

    /// The designated node's own span. Filled or drained in place, never
    /// through the transport.
    pub fn local_fast_path(&self) -> Range<usize> {
        self.span(self.designated)
    }

    /// Every other rank with particles, ascending.
    pub fn remote_spans(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        self.spans
            .iter()
            .enumerate()
            .filter(move |(rank, span)| *rank != self.designated && !span.is_empty())
            .map(|(rank, span)| (rank, span.clone()))
    }

    /// Fail if the designated node's traversal disagrees with its gathered count.
    pub fn expect_local(&self, traversal: &LocalTraversal) -> SyncResult<()> {
        let expected = self.local_fast_path().len();
        if traversal.len() == expected {
            Ok(())
        } else {
            Err(SyncError::CountDrift {
                rank: self.designated,
                expected,
                found: traversal.len(),
            })
        }
    }
}
