use bytemuck::{Pod, Zeroable};

/// Energy contributions summed over the accelerator's output, as read back
/// from device memory.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DeviceEnergy {
    pub bonded: f32,
    pub non_bonded: f32,
    pub coulomb: f32,
    pub dipolar: f32,
}

/// The simulation's energy accumulator, one slot per contribution type.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnergyAccumulator {
    pub bonded: f64,
    pub non_bonded: f64,
    pub coulomb: f64,
    pub dipolar: f64,
}

impl EnergyAccumulator {
    /// Add each device contribution into its slot.
    ///
    /// Call once per step, on the designated node only, after the device
    /// energy computation has finished.
    pub fn add_device_energy(&mut self, energy: &DeviceEnergy) {
        self.bonded += f64::from(energy.bonded);
        self.non_bonded += f64::from(energy.non_bonded);
        self.coulomb += f64::from(energy.coulomb);
        self.dipolar += f64::from(energy.dipolar);
    }

    pub fn total(&self) -> f64 {
        self.bonded + self.non_bonded + self.coulomb + self.dipolar
    }
}
