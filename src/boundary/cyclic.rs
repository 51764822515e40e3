//! Cyclic halo exchange as an injected capability.
//!
//! The surface scheme never talks to MPI. Whenever a freshly written 2D
//! plane is later read at halo indices, it requests an exchange through
//! this trait. In a distributed run the implementation wraps the halo
//! exchange of the host model; the [`PeriodicCyclic`] implementation
//! provided here performs the serial equivalent, wrapping the field
//! periodically at the domain edges.
//!
//! # Contract
//!
//! After `exec_2d` returns, every ghost cell of `field` holds the value of
//! the corresponding interior cell of the neighbouring subdomain, with
//! cyclic wrap-around at the domain edges.

use crate::grid::AtmosphereGrid;

/// Capability to make the ghost cells of a 2D plane consistent.
pub trait BoundaryCyclic {
    /// Fill the ghost cells of `field` (length `ijcells`).
    fn exec_2d(&self, field: &mut [f64]);
}

/// Serial periodic halo exchange.
#[derive(Clone, Debug)]
pub struct PeriodicCyclic {
    icells: usize,
    jcells: usize,
    igc: usize,
    jgc: usize,
    istart: usize,
    iend: usize,
    jstart: usize,
    jend: usize,
    itot: usize,
    jtot: usize,
}

impl PeriodicCyclic {
    /// Create an exchanger for the given grid.
    pub fn new(grid: &AtmosphereGrid) -> Self {
        Self {
            icells: grid.icells,
            jcells: grid.jcells,
            igc: grid.igc,
            jgc: grid.jgc,
            istart: grid.istart,
            iend: grid.iend,
            jstart: grid.jstart,
            jend: grid.jend,
            itot: grid.itot,
            jtot: grid.jtot,
        }
    }
}

impl BoundaryCyclic for PeriodicCyclic {
    fn exec_2d(&self, field: &mut [f64]) {
        debug_assert_eq!(field.len(), self.icells * self.jcells);

        // East-west, interior rows only.
        for j in self.jstart..self.jend {
            let row = j * self.icells;
            for i in 0..self.igc {
                field[row + i] = field[row + i + self.itot];
                field[row + self.iend + i] = field[row + self.istart + i];
            }
        }

        // North-south over the full row, so the corners wrap as well.
        for j in 0..self.jgc {
            let src_s = (j + self.jtot) * self.icells;
            let dst_s = j * self.icells;
            let src_n = (self.jstart + j) * self.icells;
            let dst_n = (self.jend + j) * self.icells;
            for i in 0..self.icells {
                field[dst_s + i] = field[src_s + i];
                field[dst_n + i] = field[src_n + i];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::AtmosphereGrid;

    #[test]
    fn test_periodic_wrap() {
        let grid = AtmosphereGrid::new(4, 3, 2, 2, 0, vec![5.0]);
        let cyclic = PeriodicCyclic::new(&grid);

        let mut field = grid.plane();
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                field[grid.ij(i, j)] = (100 * i + j) as f64;
            }
        }
        cyclic.exec_2d(&mut field);

        // West ghost equals the east interior edge.
        for j in grid.jstart..grid.jend {
            assert_eq!(field[grid.ij(grid.istart - 1, j)], field[grid.ij(grid.iend - 1, j)]);
            assert_eq!(field[grid.ij(grid.iend, j)], field[grid.ij(grid.istart, j)]);
        }
        // South ghost equals the north interior edge.
        for i in grid.istart..grid.iend {
            assert_eq!(field[grid.ij(i, grid.jstart - 1)], field[grid.ij(i, grid.jend - 1)]);
            assert_eq!(field[grid.ij(i, grid.jend)], field[grid.ij(i, grid.jstart)]);
        }
        // Corner ghost wraps in both directions.
        assert_eq!(
            field[grid.ij(grid.istart - 1, grid.jstart - 1)],
            field[grid.ij(grid.iend - 1, grid.jend - 1)]
        );
    }
}
