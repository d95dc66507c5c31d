use super::{Tag, Transport};
use crate::error::{SyncError, SyncResult};

/// Transport for a one-node run.
///
/// Collectives are local. Point-to-point traffic has no valid peer, so any
/// attempt is an error: a single-node step that succeeds passed no messages.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleNode;

impl SingleNode {
    fn check_root(root: usize) -> SyncResult<()> {
        if root == 0 {
            Ok(())
        } else {
            Err(SyncError::InvalidRank { rank: root, size: 1 })
        }
    }
}

impl Transport for SingleNode {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn gather_counts(&self, local: usize, root: usize) -> SyncResult<Vec<usize>> {
        Self::check_root(root)?;
        Ok(vec![local])
    }

    fn send(&self, dest: usize, tag: Tag, _payload: &[u8]) -> SyncResult<()> {
        Err(SyncError::transport(
            0,
            format!("single-node transport cannot send {tag:?} to rank {dest}"),
        ))
    }

    fn recv_into(&self, peer: usize, tag: Tag, _buffer: &mut [u8]) -> SyncResult<()> {
        Err(SyncError::transport(
            0,
            format!("single-node transport cannot receive {tag:?} from rank {peer}"),
        ))
    }

    fn broadcast(&self, root: usize, _buffer: &mut [u8]) -> SyncResult<()> {
        Self::check_root(root)
    }

    // No peers to tell.
    fn abort(&self, _reason: &str) {}
}
