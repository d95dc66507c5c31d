use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

/// Maps a raw coordinate into the primary simulation box.
///
/// `image` is scratch: the number of box lengths removed along each axis is
/// added to it. Gather hands every particle a fresh zeroed scratch and
/// discards it afterwards, so folding stays a pure function of the position.
pub trait PositionFolder {
    fn fold(&self, position: DVec3, image: &mut IVec3) -> DVec3;
}

impl<F> PositionFolder for F
where
    F: Fn(DVec3, &mut IVec3) -> DVec3,
{
    fn fold(&self, position: DVec3, image: &mut IVec3) -> DVec3 {
        self(position, image)
    }
}

/// Rectangular box with per-axis periodicity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodicBox {
    pub length: DVec3,
    pub periodic: [bool; 3],
}

impl PeriodicBox {
    /// Fully periodic box.
    pub fn new(length: DVec3) -> Self {
        Self {
            length,
            periodic: [true; 3],
        }
    }

    /// Fully periodic cube of side `length`.
    pub fn cubic(length: f64) -> Self {
        Self::new(DVec3::splat(length))
    }

    pub fn with_periodicity(mut self, periodic: [bool; 3]) -> Self {
        self.periodic = periodic;
        self
    }
}

impl PositionFolder for PeriodicBox {
    fn fold(&self, position: DVec3, image: &mut IVec3) -> DVec3 {
        let mut folded = position;
        for axis in 0..3 {
            let length = self.length[axis];
            if !self.periodic[axis] || length <= 0.0 {
                continue;
            }
            let shift = (folded[axis] / length).floor();
            folded[axis] -= shift * length;
            image[axis] += shift as i32;
            // Rounding can land a tiny negative coordinate exactly on the upper face.
            if folded[axis] >= length {
                folded[axis] -= length;
                image[axis] += 1;
            }
        }
        folded
    }
}
