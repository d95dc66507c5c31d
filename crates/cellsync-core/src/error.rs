//! Error types for particle synchronization.
//!
//! Every fallible operation returns `SyncResult<T>`. None of these errors is
//! recoverable inside a step: offsets are meaningless once counts disagree,
//! so the caller must abort the step or the run.

use crate::transport::Tag;
use thiserror::Error;

/// Unified error type for gather/scatter and the transports beneath them.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration is inconsistent (e.g. composition enabled with no fluid components).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A rank outside the communicator was addressed.
    #[error("Rank {rank} is outside a communicator of size {size}")]
    InvalidRank { rank: usize, size: usize },

    /// Particle counts changed between a count exchange and the data that depends on it.
    #[error("Particle count drift on rank {rank}: expected {expected}, found {found}")]
    CountDrift {
        rank: usize,
        expected: usize,
        found: usize,
    },

    /// A received message does not match the size announced by the count exchange.
    #[error("Message from rank {peer} tagged {tag:?} carries {actual} bytes, expected {expected}")]
    MessageSize {
        peer: usize,
        tag: Tag,
        expected: usize,
        actual: usize,
    },

    /// A particle's optional attribute does not have the length the layout requires.
    #[error("Attribute `{attribute}` has {actual} entries, layout expects {expected}")]
    AttributeShape {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The designated node was asked to scatter without a result buffer.
    #[error("Designated rank {rank} has no result buffer to scatter")]
    MissingBuffer { rank: usize },

    /// A peer gave up on the step and told everyone else.
    #[error("Rank {rank} stopped: rank {peer} aborted the step ({reason})")]
    Aborted {
        rank: usize,
        peer: usize,
        reason: String,
    },

    /// A peer send or receive failed.
    #[error("Transport failure on rank {rank}: {message}")]
    Transport { rank: usize, message: String },
}

impl SyncError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        SyncError::InvalidConfig(message.into())
    }

    /// Creates a transport error for the given rank.
    pub fn transport(rank: usize, message: impl Into<String>) -> Self {
        SyncError::Transport {
            rank,
            message: message.into(),
        }
    }
}

/// Convenience alias for `Result<T, SyncError>`.
pub type SyncResult<T> = Result<T, SyncError>;
