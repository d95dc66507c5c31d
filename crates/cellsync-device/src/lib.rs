//! Accelerator side of a step: the kernel seam and the per-step driver that
//! runs gather, compute, scatter and energy readback in order.

use cellsync_core::{
    DeviceEnergy, DeviceGlobals, EnergyAccumulator, ForceBuffer, LocalCells, ParticleBuffer,
    PositionFolder, SwimVelocityRecord, SyncError, SyncResult, Synchronizer, Transport,
};
use glam::Vec3;
use log::{debug, info};
use std::time::Instant;

/// Computation run on the gathered particle buffer. Only the designated node
/// holds one.
pub trait ForceKernel {
    /// Fill `forces` (zeroed, same length as `particles`).
    fn forces(&mut self, particles: &ParticleBuffer, forces: &mut ForceBuffer);

    /// Energy of the current configuration.
    fn energy(&mut self, particles: &ParticleBuffer) -> DeviceEnergy;

    /// Center/source velocities of active particles. `out` is zeroed.
    fn swim_velocities(&mut self, _particles: &ParticleBuffer, _out: &mut [SwimVelocityRecord]) {}
}

/// Isotropic harmonic trap: `f = -k (p - c)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HarmonicTrap {
    pub stiffness: f32,
    pub center: Vec3,
}

impl HarmonicTrap {
    pub fn new(stiffness: f32, center: Vec3) -> Self {
        Self { stiffness, center }
    }
}

impl ForceKernel for HarmonicTrap {
    fn forces(&mut self, particles: &ParticleBuffer, forces: &mut ForceBuffer) {
        for i in 0..particles.len() {
            let d = particles.position(i) - self.center;
            forces.set_force(i, -self.stiffness * d);
        }
    }

    fn energy(&mut self, particles: &ParticleBuffer) -> DeviceEnergy {
        let non_bonded = (0..particles.len())
            .map(|i| 0.5 * self.stiffness * (particles.position(i) - self.center).length_squared())
            .sum();
        DeviceEnergy {
            non_bonded,
            ..DeviceEnergy::default()
        }
    }
}

/// `len` as the device's 32-bit particle counter.
fn device_count(len: usize) -> SyncResult<u32> {
    u32::try_from(len).map_err(|_| {
        SyncError::config(format!("{len} particles exceed the device particle counter"))
    })
}

/// What one node saw during a step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    /// Particles across all nodes, as broadcast by the designated node.
    pub total_particles: usize,
    /// Device energy added this step; designated node only.
    pub energy: Option<DeviceEnergy>,
    pub elapsed_ms: f32,
}

/// Per-node step driver. The designated node owns the kernel and a force
/// buffer that is reused across steps.
pub struct DeviceStep<K> {
    kernel: Option<K>,
    forces: Option<ForceBuffer>,
    swim: Vec<SwimVelocityRecord>,
}

impl<K: ForceKernel> DeviceStep<K> {
    /// Driver for the designated node.
    pub fn host(kernel: K) -> Self {
        Self {
            kernel: Some(kernel),
            forces: None,
            swim: Vec::new(),
        }
    }

    /// Driver for every other node.
    pub fn follower() -> Self {
        Self {
            kernel: None,
            forces: None,
            swim: Vec::new(),
        }
    }

    pub fn kernel(&self) -> Option<&K> {
        self.kernel.as_ref()
    }

    /// Run one step. `energy` is updated on the designated node when given;
    /// other nodes leave it untouched.
    pub fn run<T, C, F>(
        &mut self,
        sync: &Synchronizer<T>,
        cells: &mut C,
        folder: &F,
        energy: Option<&mut EnergyAccumulator>,
    ) -> SyncResult<StepReport>
    where
        T: Transport,
        C: LocalCells + ?Sized,
        F: PositionFolder + ?Sized,
    {
        let start = Instant::now();
        if sync.is_designated() && self.kernel.is_none() {
            return Err(sync.abort(SyncError::config(format!(
                "designated rank {} has no force kernel",
                sync.rank()
            ))));
        }

        let gathered = sync.gather_particles(&*cells, folder)?;

        let mut globals = DeviceGlobals::default();
        if let Some(particles) = &gathered {
            globals.number_of_particles =
                device_count(particles.len()).map_err(|err| sync.abort(err))?;
            globals.communication_enabled = u32::from(sync.transport().size() > 1);
        }
        sync.broadcast_device_globals(&mut globals)?;

        let mut added = None;
        match (gathered, self.kernel.as_mut()) {
            (Some(particles), Some(kernel)) => {
                let forces = self
                    .forces
                    .get_or_insert_with(|| sync.codec().force_buffer(0));
                forces.reset(particles.len());
                kernel.forces(&particles, forces);
                sync.scatter_forces(&mut *cells, Some(&*forces))?;

                if sync.codec().swimming() {
                    self.swim.clear();
                    self.swim
                        .resize(particles.len(), SwimVelocityRecord::default());
                    kernel.swim_velocities(&particles, &mut self.swim);
                    sync.scatter_swim_velocities(&mut *cells, Some(&self.swim))?;
                }

                if let Some(acc) = energy {
                    let device = kernel.energy(&particles);
                    acc.add_device_energy(&device);
                    added = Some(device);
                }
            }
            _ => {
                sync.scatter_forces(&mut *cells, None)?;
                if sync.codec().swimming() {
                    sync.scatter_swim_velocities(&mut *cells, None)?;
                }
            }
        }

        let report = StepReport {
            total_particles: globals.number_of_particles as usize,
            energy: added,
            elapsed_ms: start.elapsed().as_secs_f32() * 1000.0,
        };
        if sync.is_designated() {
            info!(
                "step: {} particles, {:.3} ms",
                report.total_particles, report.elapsed_ms
            );
        } else {
            debug!("{}: step done", sync.rank());
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_count_fits_u32() {
        assert_eq!(device_count(0).unwrap(), 0);
        assert_eq!(device_count(u32::MAX as usize).unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_device_count_overflow_is_an_error() {
        let err = device_count(u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }
}
