//! MPI transport for multi-process runs.
//!
//! Requires the `distributed` feature and an MPI installation. The caller
//! initializes MPI and keeps the universe alive for as long as the transport
//! is in use:
//!
//! ```ignore
//! let universe = mpi::initialize().expect("MPI init failed");
//! let transport = MpiTransport::new(universe.world());
//! ```

use super::{Tag, Transport};
use crate::error::{SyncError, SyncResult};
use log::{error, trace};
use ::mpi::topology::SimpleCommunicator;
use ::mpi::traits::*;

/// Error code handed to `MPI_Abort`.
const ABORT_CODE: i32 = 0xcc;

pub struct MpiTransport {
    world: SimpleCommunicator,
}

impl MpiTransport {
    pub fn new(world: SimpleCommunicator) -> Self {
        Self { world }
    }

    fn check_rank(&self, rank: usize) -> SyncResult<i32> {
        if rank < self.size() {
            Ok(rank as i32)
        } else {
            Err(SyncError::InvalidRank {
                rank,
                size: self.size(),
            })
        }
    }
}

impl Transport for MpiTransport {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn gather_counts(&self, local: usize, root: usize) -> SyncResult<Vec<usize>> {
        let root_process = self.world.process_at_rank(self.check_rank(root)?);
        let local = local as u64;
        if self.rank() != root {
            root_process.gather_into(&local);
            return Ok(Vec::new());
        }

        let mut counts = vec![0u64; self.size()];
        root_process.gather_into_root(&local, &mut counts[..]);
        Ok(counts.into_iter().map(|c| c as usize).collect())
    }

    fn send(&self, dest: usize, tag: Tag, payload: &[u8]) -> SyncResult<()> {
        if dest == self.rank() {
            return Err(SyncError::transport(
                self.rank(),
                format!("{tag:?} sent to self"),
            ));
        }
        let process = self.world.process_at_rank(self.check_rank(dest)?);
        process.send_with_tag(payload, tag as i32);
        trace!("{}: sent {:?} ({} bytes) to rank {}", self.rank(), tag, payload.len(), dest);
        Ok(())
    }

    fn recv_into(&self, peer: usize, tag: Tag, buffer: &mut [u8]) -> SyncResult<()> {
        let process = self.world.process_at_rank(self.check_rank(peer)?);
        let (message, status) = process.matched_probe_with_tag(tag as i32);
        let actual = status.count(u8::equivalent_datatype()) as usize;
        if actual != buffer.len() {
            // Drain it so the next receive from this peer is not misaligned.
            let _ = message.matched_receive_vec::<u8>();
            return Err(SyncError::MessageSize {
                peer,
                tag,
                expected: buffer.len(),
                actual,
            });
        }
        message.matched_receive_into(buffer);
        Ok(())
    }

    fn broadcast(&self, root: usize, buffer: &mut [u8]) -> SyncResult<()> {
        let root_process = self.world.process_at_rank(self.check_rank(root)?);
        root_process.broadcast_into(buffer);
        Ok(())
    }

    /// Terminates every process of the job; never returns.
    fn abort(&self, reason: &str) {
        error!("{}: MPI_Abort: {}", self.rank(), reason);
        self.world.abort(ABORT_CODE)
    }
}
