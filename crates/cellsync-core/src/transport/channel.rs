//! In-process transport: N endpoints joined by `std::sync::mpsc` channels.
//!
//! Each endpoint owns one inbox. Messages that arrive ahead of the one being
//! waited for are parked and matched later on `(peer, tag)`, so receive
//! order is whatever the caller asks for, not arrival order. An abort
//! envelope fails the pending receive and every receive after it.

use super::{Tag, Transport};
use crate::error::{SyncError, SyncResult};
use log::trace;
use std::cell::{Cell, RefCell};
use std::sync::mpsc::{self, Receiver, Sender};

struct Envelope {
    from: usize,
    tag: Tag,
    payload: Vec<u8>,
}

pub struct ChannelTransport {
    rank: usize,
    /// Indexed by destination rank; `None` for this endpoint itself.
    outboxes: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    parked: RefCell<Vec<Envelope>>,
    sent: Cell<usize>,
}

impl ChannelTransport {
    /// Fully connected endpoints for ranks `0..size`.
    pub fn mesh(size: usize) -> Vec<Self> {
        let (senders, receivers): (Vec<Sender<Envelope>>, Vec<Receiver<Envelope>>) =
            (0..size).map(|_| mpsc::channel()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Self {
                rank,
                outboxes: senders
                    .iter()
                    .enumerate()
                    .map(|(dest, tx)| (dest != rank).then(|| tx.clone()))
                    .collect(),
                inbox,
                parked: RefCell::new(Vec::new()),
                sent: Cell::new(0),
            })
            .collect()
    }

    /// Number of messages this endpoint has sent, collectives included.
    pub fn messages_sent(&self) -> usize {
        self.sent.get()
    }

    fn check_rank(&self, rank: usize) -> SyncResult<()> {
        if rank < self.outboxes.len() {
            Ok(())
        } else {
            Err(SyncError::InvalidRank {
                rank,
                size: self.outboxes.len(),
            })
        }
    }

    fn aborted(&self, envelope: &Envelope) -> SyncError {
        SyncError::Aborted {
            rank: self.rank,
            peer: envelope.from,
            reason: String::from_utf8_lossy(&envelope.payload).into_owned(),
        }
    }

    /// An abort that already arrived, if any. A peer that aborted and left
    /// makes sends to it fail; this tells that apart from a plain hang-up.
    fn pending_abort(&self) -> Option<SyncError> {
        while let Ok(envelope) = self.inbox.try_recv() {
            self.parked.borrow_mut().push(envelope);
        }
        let parked = self.parked.borrow();
        let abort = parked.iter().find(|e| e.tag == Tag::Abort)?;
        Some(self.aborted(abort))
    }

    fn take_parked(&self, peer: usize, tag: Tag) -> SyncResult<Option<Vec<u8>>> {
        let mut parked = self.parked.borrow_mut();
        if let Some(abort) = parked.iter().find(|e| e.tag == Tag::Abort) {
            return Err(self.aborted(abort));
        }
        let at = parked.iter().position(|e| e.from == peer && e.tag == tag);
        Ok(at.map(|at| parked.remove(at).payload))
    }

    fn next_from(&self, peer: usize, tag: Tag) -> SyncResult<Vec<u8>> {
        if let Some(payload) = self.take_parked(peer, tag)? {
            return Ok(payload);
        }
        loop {
            let envelope = self.inbox.recv().map_err(|_| {
                SyncError::transport(
                    self.rank,
                    format!("all peers hung up while waiting for {tag:?} from rank {peer}"),
                )
            })?;
            if envelope.tag == Tag::Abort {
                let err = self.aborted(&envelope);
                self.parked.borrow_mut().push(envelope);
                return Err(err);
            }
            if envelope.from == peer && envelope.tag == tag {
                return Ok(envelope.payload);
            }
            trace!(
                "{}: parking {:?} from rank {} while waiting for rank {}",
                self.rank,
                envelope.tag,
                envelope.from,
                peer
            );
            self.parked.borrow_mut().push(envelope);
        }
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn gather_counts(&self, local: usize, root: usize) -> SyncResult<Vec<usize>> {
        self.check_rank(root)?;
        if self.rank != root {
            let count = local as u64;
            self.send(root, Tag::Counts, bytemuck::bytes_of(&count))?;
            return Ok(Vec::new());
        }

        let mut counts = Vec::with_capacity(self.size());
        for peer in 0..self.size() {
            if peer == root {
                counts.push(local);
                continue;
            }
            let mut count = 0u64;
            self.recv_into(peer, Tag::Counts, bytemuck::bytes_of_mut(&mut count))?;
            counts.push(count as usize);
        }
        Ok(counts)
    }

    fn send(&self, dest: usize, tag: Tag, payload: &[u8]) -> SyncResult<()> {
        self.check_rank(dest)?;
        let outbox = self.outboxes[dest]
            .as_ref()
            .ok_or_else(|| SyncError::transport(self.rank, format!("{tag:?} sent to self")))?;
        outbox
            .send(Envelope {
                from: self.rank,
                tag,
                payload: payload.to_vec(),
            })
            .map_err(|_| {
                self.pending_abort().unwrap_or_else(|| {
                    SyncError::transport(self.rank, format!("rank {dest} hung up before {tag:?}"))
                })
            })?;
        self.sent.set(self.sent.get() + 1);
        trace!("{}: sent {:?} ({} bytes) to rank {}", self.rank, tag, payload.len(), dest);
        Ok(())
    }

    fn recv_into(&self, peer: usize, tag: Tag, buffer: &mut [u8]) -> SyncResult<()> {
        self.check_rank(peer)?;
        let payload = self.next_from(peer, tag)?;
        if payload.len() != buffer.len() {
            return Err(SyncError::MessageSize {
                peer,
                tag,
                expected: buffer.len(),
                actual: payload.len(),
            });
        }
        buffer.copy_from_slice(&payload);
        Ok(())
    }

    fn broadcast(&self, root: usize, buffer: &mut [u8]) -> SyncResult<()> {
        self.check_rank(root)?;
        if self.rank == root {
            for dest in (0..self.size()).filter(|&d| d != root) {
                self.send(dest, Tag::Broadcast, buffer)?;
            }
            Ok(())
        } else {
            self.recv_into(root, Tag::Broadcast, buffer)
        }
    }

    fn abort(&self, reason: &str) {
        for (dest, outbox) in self.outboxes.iter().enumerate() {
            let Some(outbox) = outbox else { continue };
            let envelope = Envelope {
                from: self.rank,
                tag: Tag::Abort,
                payload: reason.as_bytes().to_vec(),
            };
            if outbox.send(envelope).is_err() {
                trace!("{}: rank {} already gone, abort not delivered", self.rank, dest);
            }
        }
    }
}

/// Run `node` once per rank of a fresh `size`-node mesh, each on its own
/// thread, and return the results in rank order.
///
/// A panic on any node is resumed on the caller.
pub fn run_cluster<R, F>(size: usize, node: F) -> Vec<R>
where
    R: Send,
    F: Fn(ChannelTransport) -> R + Sync,
{
    let endpoints = ChannelTransport::mesh(size);
    let node = &node;
    std::thread::scope(|scope| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|transport| scope.spawn(move || node(transport)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}
