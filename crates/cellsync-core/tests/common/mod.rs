#![allow(dead_code)]

use cellsync_core::{Cell, CellStore, Particle};
use glam::{DVec3, IVec3};

/// Cells for `rank` with the given per-cell sizes.
///
/// Each particle's position encodes where it came from:
/// `x = 100 * rank + i` (i counts across the node in traversal order),
/// `y = cell`, `z = index in cell`.
pub fn node_cells(rank: usize, cell_sizes: &[usize]) -> CellStore {
    let mut i = 0;
    let cells = cell_sizes
        .iter()
        .enumerate()
        .map(|(cell, &n)| {
            Cell::new(
                (0..n)
                    .map(|index| {
                        let x = (100 * rank + i) as f64;
                        i += 1;
                        Particle::new(DVec3::new(x, cell as f64, index as f64))
                            .with_velocity(DVec3::new(0.0, 0.0, -x))
                    })
                    .collect(),
            )
        })
        .collect();
    CellStore::from_cells(cells)
}

pub fn identity(p: DVec3, _image: &mut IVec3) -> DVec3 {
    p
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
