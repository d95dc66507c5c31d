use crate::attributes::Attribute;
use crate::buffer::{ForceBuffer, RecordBuffer, SwimVelocityRecord, SWIM_VELOCITY_WORDS};
use crate::cells::LocalCells;
use crate::error::{SyncError, SyncResult};
use crate::particle::Particle;
use crate::plan::{LocalTraversal, TraversalPlan};
use crate::sync::Synchronizer;
use crate::transport::{Tag, Transport};
use log::debug;

impl<T: Transport> Synchronizer<T> {
    /// Return accelerator forces (and composition, if enabled) to their owners.
    ///
    /// `forces` is required on the designated node and ignored elsewhere. It
    /// must be laid out like the gather of this step. Forces are added to the
    /// local force accumulators; composition is overwritten.
    pub fn scatter_forces<C>(&self, cells: &mut C, forces: Option<&ForceBuffer>) -> SyncResult<()>
    where
        C: LocalCells + ?Sized,
    {
        let stride = self.codec.force_layout().stride();
        let words = match forces {
            Some(buffer) if buffer.layout() != self.codec.force_layout() => {
                return Err(self.abort(SyncError::config(format!(
                    "force buffer stride {} does not match the configured {} words",
                    buffer.layout().stride(),
                    stride
                ))));
            }
            Some(buffer) => Some(buffer.records().as_words()),
            None => None,
        };
        let codec = &self.codec;
        self.distribute(cells, Tag::Forces, stride, words, |record, particle| {
            codec.accumulate_force(record, particle)
        })
    }

    /// Return active-particle center/source velocities to their owners.
    ///
    /// Requires the `swimming` attribute. Velocities are overwritten. Every
    /// node shares the attribute set, so a missing `swimming` fails locally
    /// everywhere without aborting peers.
    pub fn scatter_swim_velocities<C>(
        &self,
        cells: &mut C,
        velocities: Option<&[SwimVelocityRecord]>,
    ) -> SyncResult<()>
    where
        C: LocalCells + ?Sized,
    {
        if !self.codec.swimming() {
            return Err(SyncError::config(format!(
                "swim velocities need the `{}` attribute",
                Attribute::Swimming.name()
            )));
        }
        let words = velocities.map(|v| bytemuck::cast_slice::<SwimVelocityRecord, f32>(v));
        let codec = &self.codec;
        self.distribute(
            cells,
            Tag::SwimVelocities,
            SWIM_VELOCITY_WORDS,
            words,
            |record, particle| {
                codec.apply_swim_velocity(bytemuck::from_bytes(bytemuck::cast_slice(record)), particle)
            },
        )
    }

    /// Shared scatter protocol: count exchange, local fast path on the
    /// designated node, then one message per remote rank in ascending order.
    /// A failure on any node aborts the scatter on all of them.
    fn distribute<C, A>(
        &self,
        cells: &mut C,
        tag: Tag,
        stride: usize,
        source: Option<&[f32]>,
        apply: A,
    ) -> SyncResult<()>
    where
        C: LocalCells + ?Sized,
        A: FnMut(&[f32], &mut Particle),
    {
        self.distribute_step(cells, tag, stride, source, apply)
            .map_err(|err| self.abort(err))
    }

    fn distribute_step<C, A>(
        &self,
        cells: &mut C,
        tag: Tag,
        stride: usize,
        source: Option<&[f32]>,
        mut apply: A,
    ) -> SyncResult<()>
    where
        C: LocalCells + ?Sized,
        A: FnMut(&[f32], &mut Particle),
    {
        let traversal = LocalTraversal::new(cells);
        let counts = self
            .transport
            .gather_counts(traversal.len(), self.designated)?;

        if !self.is_designated() {
            if traversal.is_empty() {
                debug!("{}: scatter {:?}, nothing to receive", self.rank(), tag);
                return Ok(());
            }
            let mut inbound = RecordBuffer::zeroed(stride, traversal.len());
            self.transport
                .recv_into(self.designated, tag, inbound.as_bytes_mut())?;
            apply_local(cells, &traversal, inbound.as_words(), stride, &mut apply);
            debug!(
                "{}: scatter {:?}, applied {} records",
                self.rank(),
                tag,
                traversal.len()
            );
            return Ok(());
        }

        let words = source.ok_or(SyncError::MissingBuffer {
            rank: self.designated,
        })?;
        let plan = TraversalPlan::new(&counts, self.designated)?;
        plan.expect_local(&traversal)?;
        if words.len() != plan.total() * stride {
            return Err(SyncError::CountDrift {
                rank: self.designated,
                expected: plan.total(),
                found: words.len() / stride,
            });
        }

        let local = plan.local_fast_path();
        apply_local(
            cells,
            &traversal,
            &words[local.start * stride..local.end * stride],
            stride,
            &mut apply,
        );

        for (peer, span) in plan.remote_spans() {
            let slice = &words[span.start * stride..span.end * stride];
            self.transport.send(peer, tag, bytemuck::cast_slice(slice))?;
        }

        debug!(
            "{}: scatter {:?} finished, {} records to {} nodes",
            self.rank(),
            tag,
            plan.total(),
            counts.len()
        );
        Ok(())
    }
}

/// Apply `words` (this node's records, traversal order) to the local particles.
fn apply_local<C, A>(
    cells: &mut C,
    traversal: &LocalTraversal,
    words: &[f32],
    stride: usize,
    apply: &mut A,
) where
    C: LocalCells + ?Sized,
    A: FnMut(&[f32], &mut Particle),
{
    let store = cells.cells_mut();
    for slot in traversal.slots() {
        let record = &words[slot.offset * stride..(slot.offset + 1) * stride];
        apply(record, &mut store[slot.cell].particles[slot.index]);
    }
}
