//! Minimal collective and point-to-point messaging used by gather/scatter.
//!
//! All calls block. Receives name their peer and tag explicitly; an
//! implementation must hand back the message from that peer even when others
//! arrived first.

pub mod channel;
#[cfg(feature = "distributed")]
pub mod mpi;
pub mod single;

pub use channel::{run_cluster, ChannelTransport};
#[cfg(feature = "distributed")]
pub use self::mpi::MpiTransport;
pub use single::SingleNode;

use crate::error::SyncResult;

/// Message tag. Keeps the streams of one step apart on the wire.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Counts = 0xcc00,
    Particles = 0xcc01,
    Forces = 0xcc02,
    SwimVelocities = 0xcc03,
    Broadcast = 0xcc04,
    Abort = 0xcc05,
}

pub trait Transport {
    /// This node's rank.
    fn rank(&self) -> usize;

    /// Number of nodes.
    fn size(&self) -> usize;

    /// Collect every node's `local` count on `root`.
    ///
    /// Returns the counts indexed by rank on `root`, and an empty vector on
    /// every other node.
    fn gather_counts(&self, local: usize, root: usize) -> SyncResult<Vec<usize>>;

    /// Send one opaque message to `dest`.
    fn send(&self, dest: usize, tag: Tag, payload: &[u8]) -> SyncResult<()>;

    /// Receive the next `tag` message from `peer` into `buffer`.
    ///
    /// The message must fill `buffer` exactly.
    fn recv_into(&self, peer: usize, tag: Tag, buffer: &mut [u8]) -> SyncResult<()>;

    /// Overwrite `buffer` on every node with its contents on `root`.
    fn broadcast(&self, root: usize, buffer: &mut [u8]) -> SyncResult<()>;

    /// Give up on the current step.
    ///
    /// Every peer blocked in (or later entering) a receive fails instead of
    /// waiting for data that will never come. Peers that already left are
    /// skipped. A transport stays aborted afterwards.
    fn abort(&self, reason: &str);
}
