use crate::buffer::ParticleBuffer;
use crate::cells::LocalCells;
use crate::error::SyncResult;
use crate::fold::PositionFolder;
use crate::plan::{LocalTraversal, TraversalPlan};
use crate::sync::Synchronizer;
use crate::transport::{Tag, Transport};
use log::debug;

impl<T: Transport> Synchronizer<T> {
    /// Collect every node's particles into one buffer on the designated node.
    ///
    /// Returns `Some` on the designated node and `None` everywhere else. The
    /// caller must keep particles from migrating until every node returns.
    /// A failure on any node aborts the gather on all of them.
    pub fn gather_particles<C, F>(&self, cells: &C, folder: &F) -> SyncResult<Option<ParticleBuffer>>
    where
        C: LocalCells + ?Sized,
        F: PositionFolder + ?Sized,
    {
        self.gather_step(cells, folder)
            .map_err(|err| self.abort(err))
    }

    fn gather_step<C, F>(&self, cells: &C, folder: &F) -> SyncResult<Option<ParticleBuffer>>
    where
        C: LocalCells + ?Sized,
        F: PositionFolder + ?Sized,
    {
        let traversal = LocalTraversal::new(cells);
        let counts = self
            .transport
            .gather_counts(traversal.len(), self.designated)?;

        if !self.is_designated() {
            if traversal.is_empty() {
                debug!("{}: gather, no particles to send", self.rank());
                return Ok(None);
            }
            let mut staging = self.codec.particle_buffer(traversal.len());
            self.serialize_local(cells, folder, &traversal, &mut staging, 0)?;
            self.transport
                .send(self.designated, Tag::Particles, staging.as_bytes())?;
            debug!("{}: gather, sent {} particles", self.rank(), traversal.len());
            return Ok(None);
        }

        let plan = TraversalPlan::new(&counts, self.designated)?;
        plan.expect_local(&traversal)?;
        let mut gathered = self.codec.particle_buffer(plan.total());

        let local = plan.local_fast_path();
        self.serialize_local(cells, folder, &traversal, &mut gathered, local.start)?;

        for (peer, span) in plan.remote_spans() {
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(gathered.records_mut().span_mut(span));
            self.transport.recv_into(peer, Tag::Particles, bytes)?;
        }

        debug!(
            "{}: gather finished, {} particles from {} nodes",
            self.rank(),
            plan.total(),
            counts.len()
        );
        Ok(Some(gathered))
    }

    /// Encode this node's particles in traversal order starting at record `base`.
    fn serialize_local<C, F>(
        &self,
        cells: &C,
        folder: &F,
        traversal: &LocalTraversal,
        out: &mut ParticleBuffer,
        base: usize,
    ) -> SyncResult<()>
    where
        C: LocalCells + ?Sized,
        F: PositionFolder + ?Sized,
    {
        let store = cells.cells();
        let records = out.records_mut();
        for slot in traversal.slots() {
            let particle = &store[slot.cell].particles[slot.index];
            self.codec
                .encode(particle, folder, records.record_mut(base + slot.offset))?;
        }
        Ok(())
    }
}
