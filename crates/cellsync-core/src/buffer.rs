use crate::codec::{ForceLayout, ParticleLayout, FORCE, POSITION, VELOCITY};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::ops::Range;

/// Center/source velocity pair produced by the accelerator for an active particle.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SwimVelocityRecord {
    pub center: [f32; 3],
    pub source: [f32; 3],
}

/// Words per `SwimVelocityRecord`.
pub const SWIM_VELOCITY_WORDS: usize = std::mem::size_of::<SwimVelocityRecord>() / 4;

/// Contiguous fixed-stride f32 records.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordBuffer {
    stride: usize,
    words: Vec<f32>,
}

impl RecordBuffer {
    pub fn zeroed(stride: usize, len: usize) -> Self {
        Self {
            stride,
            words: vec![0.0; stride * len],
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.words.len() / self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn record(&self, index: usize) -> &[f32] {
        &self.words[index * self.stride..(index + 1) * self.stride]
    }

    pub fn record_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.words[index * self.stride..(index + 1) * self.stride]
    }

    pub fn records(&self) -> std::slice::ChunksExact<'_, f32> {
        self.words.chunks_exact(self.stride)
    }

    /// Words of the records in `span`.
    pub fn span(&self, span: Range<usize>) -> &[f32] {
        &self.words[span.start * self.stride..span.end * self.stride]
    }

    pub fn span_mut(&mut self, span: Range<usize>) -> &mut [f32] {
        &mut self.words[span.start * self.stride..span.end * self.stride]
    }

    pub fn as_words(&self) -> &[f32] {
        &self.words
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.words)
    }

    /// Zero every record and resize to `len`, keeping the allocation.
    pub fn reset(&mut self, len: usize) {
        self.words.clear();
        self.words.resize(self.stride * len, 0.0);
    }
}

/// Gathered transfer records, ready for accelerator upload.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleBuffer {
    layout: ParticleLayout,
    records: RecordBuffer,
}

/// Read-only view of a record's self-propulsion words.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwimView {
    pub v_swim: f32,
    pub f_swim: f32,
    pub orientation: Vec3,
    pub push_pull: i32,
    pub dipole_length: f32,
}

impl ParticleBuffer {
    pub fn zeroed(layout: ParticleLayout, len: usize) -> Self {
        let records = RecordBuffer::zeroed(layout.stride(), len);
        Self { layout, records }
    }

    pub fn layout(&self) -> &ParticleLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &RecordBuffer {
        &self.records
    }

    pub(crate) fn records_mut(&mut self) -> &mut RecordBuffer {
        &mut self.records
    }

    /// Raw bytes for upload or transmission.
    pub fn as_bytes(&self) -> &[u8] {
        self.records.as_bytes()
    }

    pub fn as_words(&self) -> &[f32] {
        self.records.as_words()
    }

    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.records.record(index)[POSITION])
    }

    pub fn velocity(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.records.record(index)[VELOCITY])
    }

    pub fn charge(&self, index: usize) -> Option<f32> {
        self.layout.charge().map(|at| self.records.record(index)[at])
    }

    pub fn solvation(&self, index: usize) -> Option<&[f32]> {
        self.layout
            .solvation()
            .map(|range| &self.records.record(index)[range])
    }

    pub fn mobility(&self, index: usize) -> Option<Vec3> {
        self.layout
            .mobility()
            .map(|at| Vec3::from_slice(&self.records.record(index)[at..at + 3]))
    }

    pub fn swim(&self, index: usize) -> Option<SwimView> {
        self.layout.swim().map(|at| {
            let r = self.records.record(index);
            SwimView {
                v_swim: r[at],
                f_swim: r[at + 1],
                orientation: Vec3::from_slice(&r[at + 2..at + 5]),
                push_pull: r[at + 5].to_bits() as i32,
                dipole_length: r[at + 6],
            }
        })
    }
}

/// Per-particle accelerator results, laid out like the gathered particles.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceBuffer {
    layout: ForceLayout,
    records: RecordBuffer,
}

impl ForceBuffer {
    pub fn zeroed(layout: ForceLayout, len: usize) -> Self {
        let records = RecordBuffer::zeroed(layout.stride(), len);
        Self { layout, records }
    }

    pub fn layout(&self) -> &ForceLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &RecordBuffer {
        &self.records
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.records.as_bytes_mut()
    }

    /// Zero and resize to `len` records.
    pub fn reset(&mut self, len: usize) {
        self.records.reset(len);
    }

    pub fn force(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.records.record(index)[FORCE])
    }

    pub fn set_force(&mut self, index: usize, force: Vec3) {
        self.records.record_mut(index)[FORCE].copy_from_slice(&force.to_array());
    }

    pub fn composition(&self, index: usize) -> Option<&[f32]> {
        self.layout
            .composition()
            .map(|range| &self.records.record(index)[range])
    }

    pub fn composition_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        let range = self.layout.composition()?;
        Some(&mut self.records.record_mut(index)[range])
    }
}
