//! Transfer record layouts and the particle <-> record codec.
//!
//! Records are flat runs of f32 words. Which words exist is decided once per
//! run from the `AttributeSet`; a disabled group takes no space at all.
//!
//! Particle record: `position[3] velocity[3] solvation[2K]? mobility[3]?
//! charge? swim[7]?`. Force record: `force[3] composition[K]?`.

use crate::attributes::{Attribute, AttributeSet};
use crate::buffer::{ForceBuffer, ParticleBuffer, SwimVelocityRecord};
use crate::error::{SyncError, SyncResult};
use crate::fold::PositionFolder;
use crate::particle::Particle;
use glam::{IVec3, Vec3};
use std::ops::Range;

pub const POSITION: Range<usize> = 0..3;
pub const VELOCITY: Range<usize> = 3..6;
pub const FORCE: Range<usize> = 0..3;

/// Words used by the self-propulsion group:
/// `v_swim f_swim orientation[3] push_pull dipole_length`.
pub const SWIM_WORDS: usize = 7;

fn claim(cursor: &mut usize, words: usize) -> Range<usize> {
    let range = *cursor..*cursor + words;
    *cursor = range.end;
    range
}

/// Word offsets of one exported particle record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticleLayout {
    stride: usize,
    solvation: Option<Range<usize>>,
    mobility: Option<usize>,
    charge: Option<usize>,
    swim: Option<usize>,
}

impl ParticleLayout {
    pub fn new(attrs: &AttributeSet) -> Self {
        let mut cursor = VELOCITY.end;
        let k = attrs.fluid_components();
        let solvation = attrs
            .contains(Attribute::Solvation)
            .then(|| claim(&mut cursor, 2 * k));
        let mobility = attrs
            .contains(Attribute::Mobility)
            .then(|| claim(&mut cursor, 3).start);
        let charge = attrs
            .contains(Attribute::Charge)
            .then(|| claim(&mut cursor, 1).start);
        let swim = attrs
            .contains(Attribute::Swimming)
            .then(|| claim(&mut cursor, SWIM_WORDS).start);
        Self {
            stride: cursor,
            solvation,
            mobility,
            charge,
            swim,
        }
    }

    /// Record size in f32 words.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn record_bytes(&self) -> usize {
        self.stride * std::mem::size_of::<f32>()
    }

    pub fn solvation(&self) -> Option<Range<usize>> {
        self.solvation.clone()
    }

    pub fn mobility(&self) -> Option<usize> {
        self.mobility
    }

    pub fn charge(&self) -> Option<usize> {
        self.charge
    }

    pub fn swim(&self) -> Option<usize> {
        self.swim
    }
}

/// Word offsets of one imported force record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForceLayout {
    stride: usize,
    composition: Option<Range<usize>>,
}

impl ForceLayout {
    pub fn new(attrs: &AttributeSet) -> Self {
        let mut cursor = FORCE.end;
        let composition = attrs
            .contains(Attribute::Composition)
            .then(|| claim(&mut cursor, attrs.fluid_components()));
        Self {
            stride: cursor,
            composition,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn record_bytes(&self) -> usize {
        self.stride * std::mem::size_of::<f32>()
    }

    pub fn composition(&self) -> Option<Range<usize>> {
        self.composition.clone()
    }
}

/// Converts between local particles and transfer records.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleCodec {
    particles: ParticleLayout,
    forces: ForceLayout,
    swimming: bool,
}

impl ParticleCodec {
    pub fn new(attrs: &AttributeSet) -> SyncResult<Self> {
        attrs.validate()?;
        Ok(Self {
            particles: ParticleLayout::new(attrs),
            forces: ForceLayout::new(attrs),
            swimming: attrs.contains(Attribute::Swimming),
        })
    }

    pub fn particle_layout(&self) -> &ParticleLayout {
        &self.particles
    }

    pub fn force_layout(&self) -> &ForceLayout {
        &self.forces
    }

    /// Whether center/source velocities are written back.
    pub fn swimming(&self) -> bool {
        self.swimming
    }

    /// Zeroed particle buffer of `len` records.
    pub fn particle_buffer(&self, len: usize) -> ParticleBuffer {
        ParticleBuffer::zeroed(self.particles.clone(), len)
    }

    /// Zeroed force buffer of `len` records.
    pub fn force_buffer(&self, len: usize) -> ForceBuffer {
        ForceBuffer::zeroed(self.forces.clone(), len)
    }

    /// Fold, narrow and write one particle into `record`.
    pub fn encode<F>(&self, particle: &Particle, folder: &F, record: &mut [f32]) -> SyncResult<()>
    where
        F: PositionFolder + ?Sized,
    {
        debug_assert_eq!(record.len(), self.particles.stride);

        let mut image = IVec3::ZERO;
        let folded = folder.fold(particle.position, &mut image);
        record[POSITION].copy_from_slice(&folded.as_vec3().to_array());
        record[VELOCITY].copy_from_slice(&particle.velocity.as_vec3().to_array());

        if let Some(range) = self.particles.solvation.clone() {
            if particle.solvation.len() != range.len() {
                return Err(SyncError::AttributeShape {
                    attribute: Attribute::Solvation.name(),
                    expected: range.len(),
                    actual: particle.solvation.len(),
                });
            }
            record[range].copy_from_slice(&particle.solvation);
        }
        if let Some(at) = self.particles.mobility {
            record[at..at + 3].copy_from_slice(&particle.mobility.as_vec3().to_array());
        }
        if let Some(at) = self.particles.charge {
            record[at] = particle.charge as f32;
        }
        if let Some(at) = self.particles.swim {
            let swim = &particle.swim;
            record[at] = swim.v_swim as f32;
            record[at + 1] = swim.f_swim as f32;
            record[at + 2..at + 5].copy_from_slice(&swim.orientation.as_vec3().to_array());
            // Integer flag travels as its bit pattern.
            record[at + 5] = f32::from_bits(swim.push_pull as u32);
            record[at + 6] = swim.dipole_length as f32;
        }
        Ok(())
    }

    /// Add the record's force to the particle; overwrite its composition.
    pub fn accumulate_force(&self, record: &[f32], particle: &mut Particle) {
        debug_assert_eq!(record.len(), self.forces.stride);

        particle.force += Vec3::from_slice(&record[FORCE]).as_dvec3();
        if let Some(range) = self.forces.composition.clone() {
            particle.composition.clear();
            particle
                .composition
                .extend(record[range].iter().map(|&w| f64::from(w)));
        }
    }

    /// Overwrite the particle's center/source velocities.
    pub fn apply_swim_velocity(&self, record: &SwimVelocityRecord, particle: &mut Particle) {
        particle.swim_velocity.center = Vec3::from_array(record.center).as_dvec3();
        particle.swim_velocity.source = Vec3::from_array(record.source).as_dvec3();
    }
}
