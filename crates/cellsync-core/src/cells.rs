use crate::particle::Particle;
use glam::DVec3;

/// One local cell: an ordered particle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub particles: Vec<Particle>,
}

impl Cell {
    pub fn new(particles: Vec<Particle>) -> Self {
        Self { particles }
    }
}

/// Node-local cell storage as seen by the synchronization layer.
///
/// Cell order and intra-cell order are the traversal order: they must not
/// change between a count exchange and the data exchange that follows it.
pub trait LocalCells {
    fn cells(&self) -> &[Cell];
    fn cells_mut(&mut self) -> &mut [Cell];

    fn particle_count(&self) -> usize {
        self.cells().iter().map(|cell| cell.particles.len()).sum()
    }
}

/// Plain vector-of-cells store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellStore {
    cells: Vec<Cell>,
}

impl CellStore {
    /// Store with `cell_count` empty cells.
    pub fn new(cell_count: usize) -> Self {
        Self {
            cells: vec![Cell::default(); cell_count],
        }
    }

    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Append `particle` to the end of cell `cell`.
    ///
    /// # Panics
    ///
    /// Panics if `cell` is not below the store's cell count.
    pub fn push(&mut self, cell: usize, particle: Particle) {
        self.cells[cell].particles.push(particle);
    }

    /// Particles in traversal order.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.cells.iter().flat_map(|cell| cell.particles.iter())
    }

    pub fn particles_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.cells.iter_mut().flat_map(|cell| cell.particles.iter_mut())
    }
}

impl LocalCells for CellStore {
    fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }
}

impl LocalCells for Vec<Cell> {
    fn cells(&self) -> &[Cell] {
        self
    }

    fn cells_mut(&mut self) -> &mut [Cell] {
        self
    }
}

/// Regular grid over a node's subdomain, used to bin particles into cells.
///
/// Uses counting sort for O(N) construction: count particles per cell ->
/// reserve -> distribute in input order, so intra-cell order is stable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellGrid {
    origin: DVec3,
    inv_cell_size: DVec3,
    dims: [usize; 3],
}

impl CellGrid {
    /// Grid of `dims` cells spanning `origin .. origin + extent`.
    ///
    /// Zero dimensions are treated as one cell along that axis.
    pub fn new(origin: DVec3, extent: DVec3, dims: [usize; 3]) -> Self {
        let dims = dims.map(|d| d.max(1));
        let cells = DVec3::new(dims[0] as f64, dims[1] as f64, dims[2] as f64);
        Self {
            origin,
            inv_cell_size: cells / extent,
            dims,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Linear cell index (x fastest). Positions outside the subdomain are
    /// clamped into the nearest boundary cell.
    pub fn cell_of(&self, position: DVec3) -> usize {
        let scaled = (position - self.origin) * self.inv_cell_size;
        let mut coords = [0usize; 3];
        for axis in 0..3 {
            let c = scaled[axis].floor();
            coords[axis] = if c.is_finite() && c > 0.0 {
                (c as usize).min(self.dims[axis] - 1)
            } else {
                0
            };
        }
        coords[0] + self.dims[0] * (coords[1] + self.dims[1] * coords[2])
    }

    /// Bin `particles` into a fresh store.
    pub fn bin(&self, particles: Vec<Particle>) -> CellStore {
        // 1. Cell index per particle, and count per cell
        let mut counts = vec![0usize; self.cell_count()];
        let hashes: Vec<usize> = particles
            .iter()
            .map(|p| {
                let h = self.cell_of(p.position);
                counts[h] += 1;
                h
            })
            .collect();

        // 2. Reserve exactly, then distribute preserving input order
        let mut cells: Vec<Cell> = counts
            .iter()
            .map(|&n| Cell::new(Vec::with_capacity(n)))
            .collect();
        for (particle, h) in particles.into_iter().zip(hashes) {
            cells[h].particles.push(particle);
        }

        CellStore::from_cells(cells)
    }
}
