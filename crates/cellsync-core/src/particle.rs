use glam::DVec3;

/// Self-propulsion parameters of an active particle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SwimParams {
    /// Imposed swimming speed.
    pub v_swim: f64,
    /// Imposed swimming force.
    pub f_swim: f64,
    /// Unit orientation (director) of the swimmer.
    pub orientation: DVec3,
    /// +1 pusher, -1 puller, 0 neither.
    pub push_pull: i32,
    /// Distance between the force center and the counter-force source.
    pub dipole_length: f64,
}

/// Center and source velocities of an active particle, written back by the accelerator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SwimVelocities {
    pub center: DVec3,
    pub source: DVec3,
}

/// Local particle record, owned by the node whose cell holds it.
///
/// Optional groups are always present in memory; only the groups enabled in
/// the run's `AttributeSet` cross the transfer boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Particle {
    pub position: DVec3,
    pub velocity: DVec3,
    /// Force accumulator, reset externally at the start of each step.
    pub force: DVec3,
    pub charge: f64,
    /// 2 x K solvation coefficients.
    pub solvation: Vec<f32>,
    /// Electrohydrodynamic mobility.
    pub mobility: DVec3,
    pub swim: SwimParams,
    /// K composition weights.
    pub composition: Vec<f64>,
    pub swim_velocity: SwimVelocities,
}

impl Particle {
    pub fn new(position: DVec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_velocity(mut self, velocity: DVec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_force(mut self, force: DVec3) -> Self {
        self.force = force;
        self
    }
}
