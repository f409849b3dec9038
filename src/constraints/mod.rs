//! Pluggable energy and veto terms consulted on every copy attempt.
//!
//! A term is either soft (contributes ΔH) or hard (may veto the move). The
//! engine keeps the two families in separate lists and calls them without
//! runtime type inspection. Terms that cache per-cell state keep it in their
//! own maps and update it from the lifecycle hooks on [`Constraint`].

pub mod activity;
pub mod adhesion;
pub mod barrier;
pub mod chemotaxis;
pub mod perimeter;
pub mod persistence;
pub mod preferred_direction;
pub mod volume;
pub mod volume_range;

use std::any::Any;

pub use activity::{ActivityConstraint, ActivityMean, ActivityParams};
pub use adhesion::{Adhesion, AdhesionParams};
pub use barrier::{BarrierConstraint, BarrierParams};
pub use chemotaxis::{ChemotaxisConstraint, ChemotaxisParams};
pub use perimeter::{PerimeterConstraint, PerimeterParams};
pub use persistence::{PersistenceConstraint, PersistenceParams};
pub use preferred_direction::{PreferredDirectionConstraint, PreferredDirectionParams};
pub use volume::{VolumeConstraint, VolumeParams};
pub use volume_range::{HardVolumeRangeConstraint, VolumeRangeParams};

use crate::cell::CellId;
use crate::engine::CellView;
use crate::error::{CpmError, CpmResult};
use crate::grid::{Lattice, Neighborhood, Point};
use crate::rng::Rng;

/// Downcasting support for typed constraint lookup.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// What a constraint may check itself against when registered.
#[derive(Clone, Copy, Debug)]
pub struct Setup<'a> {
    pub lattice: &'a Lattice,
    pub n_kinds: usize,
}

/// Lifecycle shared by soft and hard terms. All hooks default to no-ops.
pub trait Constraint: AsAny {
    fn name(&self) -> &'static str;

    /// Reject parameter sets that do not cover every kind, or lattices the
    /// term cannot work on.
    fn validate(&self, _setup: &Setup<'_>) -> CpmResult<()> {
        Ok(())
    }

    /// Rebuild cached state from the current grid. Called once on registration.
    fn attach(&mut self, _view: &CellView<'_>) {}

    /// Site `index` changed from `old` to `new`; the grid already holds `new`.
    fn on_pixel_changed(&mut self, _view: &CellView<'_>, _index: usize, _old: CellId, _new: CellId) {}

    /// `id` lost its last pixel and left the registry.
    fn on_cell_removed(&mut self, _id: CellId) {}

    /// End of a Monte Carlo step.
    fn on_step_end(&mut self, _view: &CellView<'_>, _rng: &mut Rng) -> CpmResult<()> {
        Ok(())
    }
}

/// Energy term. Must not mutate anything.
pub trait SoftConstraint: Constraint {
    /// Change in this term's energy if site `tgt` (owned by `tgt_id`) were
    /// copied over by `src_id` from neighbouring site `src`.
    fn delta_energy(&self, view: &CellView<'_>, src: usize, tgt: usize, src_id: CellId, tgt_id: CellId) -> f64;
}

/// Veto term. A single `false` rejects the copy attempt outright.
pub trait HardConstraint: Constraint {
    fn permits(&self, view: &CellView<'_>, src: usize, tgt: usize, src_id: CellId, tgt_id: CellId) -> bool;
}

/// A registered term, tagged by capability.
pub enum AnyConstraint {
    Soft(Box<dyn SoftConstraint>),
    Hard(Box<dyn HardConstraint>),
}

impl AnyConstraint {
    pub fn name(&self) -> &'static str {
        match self {
            AnyConstraint::Soft(c) => c.name(),
            AnyConstraint::Hard(c) => c.name(),
        }
    }
}

impl std::fmt::Debug for AnyConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnyConstraint::Soft(c) => write!(f, "Soft({})", c.name()),
            AnyConstraint::Hard(c) => write!(f, "Hard({})", c.name()),
        }
    }
}

/// Check that a per-kind parameter array has an entry for every kind.
pub(crate) fn require_kinds<T>(
    constraint: &'static str,
    parameter: &'static str,
    values: &[T],
    n_kinds: usize,
) -> CpmResult<()> {
    if values.len() < n_kinds {
        return Err(CpmError::MissingKindParameter {
            constraint,
            parameter,
            kind: values.len(),
        });
    }
    Ok(())
}

/// Terms that reason about copy directions need Cartesian coordinates.
pub(crate) fn require_cartesian(constraint: &'static str, lattice: &Lattice) -> CpmResult<()> {
    if lattice.neighborhood() == Neighborhood::Hex {
        return Err(CpmError::Capability {
            constraint,
            capability: "Cartesian site coordinates",
        });
    }
    Ok(())
}

/// Unit step from `src` to `tgt`, undoing a wrap across a periodic edge.
pub(crate) fn copy_vector(lattice: &Lattice, src: &Point, tgt: &Point) -> [f64; 3] {
    let mut v = [0f64; 3];
    for d in 0..lattice.ndim() {
        let mut step = tgt[d] as isize - src[d] as isize;
        if lattice.torus()[d] {
            if step > 1 {
                step = -1;
            } else if step < -1 {
                step = 1;
            }
        }
        v[d] = step as f64;
    }
    v
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::cell::{CellId, CellRegistry, DEFAULT_MAX_CELL_ID};
    use crate::grid::{Grid, Lattice, Neighborhood};

    /// Small fixture: a bounded Moore lattice with an id layout given as rows.
    pub struct Fixture {
        pub grid: Grid<CellId>,
        pub cells: CellRegistry,
    }

    impl Fixture {
        /// `rows[y][x]` holds ids; `kinds[id]` assigns kinds to ids 1.. in order.
        pub fn new(rows: &[&[CellId]], kinds: &[usize], n_kinds: usize) -> Self {
            Self::with_neighborhood(rows, kinds, n_kinds, Neighborhood::Moore, false)
        }

        pub fn with_neighborhood(
            rows: &[&[CellId]],
            kinds: &[usize],
            n_kinds: usize,
            nb: Neighborhood,
            torus: bool,
        ) -> Self {
            let h = rows.len();
            let w = rows[0].len();
            let lattice = Lattice::new(&[w, h], &[torus, torus], nb).unwrap();
            let mut grid = Grid::new(lattice);
            let mut cells = CellRegistry::new(n_kinds, DEFAULT_MAX_CELL_ID);
            for &k in kinds {
                cells.make_new_cell_id(k).unwrap();
            }
            for (y, row) in rows.iter().enumerate() {
                for (x, &id) in row.iter().enumerate() {
                    grid.data[y * w + x] = id;
                    cells.gain_pixel(id).unwrap();
                }
            }
            Self { grid, cells }
        }

        pub fn view(&self) -> crate::engine::CellView<'_> {
            crate::engine::CellView {
                grid: &self.grid,
                cells: &self.cells,
            }
        }

        pub fn idx(&self, x: usize, y: usize) -> usize {
            y * self.grid.lattice().extents()[0] + x
        }
    }
}
