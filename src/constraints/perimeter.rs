use serde::{Deserialize, Serialize};

use crate::cell::{BACKGROUND, CellId};
use crate::engine::CellView;
use crate::error::CpmResult;

use super::{AnyConstraint, Constraint, Setup, SoftConstraint, require_kinds};

/// Target perimeter and stiffness per kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerimeterParams {
    pub perimeter: Vec<f64>,
    pub lambda: Vec<f64>,
}

/// Quadratic penalty on each cell's perimeter, counted as the number of
/// (pixel, neighbour) pairs whose neighbour belongs to another identity.
///
/// Perimeters are cached per cell id and patched incrementally after every
/// accepted copy.
#[derive(Clone, Debug)]
pub struct PerimeterConstraint {
    params: PerimeterParams,
    perimeters: Vec<i64>,
}

impl PerimeterConstraint {
    pub fn new(params: PerimeterParams) -> Self {
        Self {
            params,
            perimeters: Vec::new(),
        }
    }

    /// Cached perimeter of `id`; 0 for unknown ids and background.
    pub fn perimeter_of(&self, id: CellId) -> i64 {
        self.perimeters.get(id as usize).copied().unwrap_or(0)
    }

    fn slot(&mut self, id: CellId) -> &mut i64 {
        let i = id as usize;
        if i >= self.perimeters.len() {
            self.perimeters.resize(i + 1, 0);
        }
        &mut self.perimeters[i]
    }

    fn energy_change(&self, view: &CellView<'_>, id: CellId, change: i64) -> f64 {
        if id == BACKGROUND {
            return 0.0;
        }
        let k = view.kind_of(id);
        let l = self.params.lambda[k];
        if l <= 0.0 {
            return 0.0;
        }
        let target = self.params.perimeter[k];
        let current = self.perimeter_of(id) as f64;
        let after = current + change as f64 - target;
        let before = current - target;
        l * (after * after - before * before)
    }
}

impl Constraint for PerimeterConstraint {
    fn name(&self) -> &'static str {
        "perimeter"
    }

    fn validate(&self, setup: &Setup<'_>) -> CpmResult<()> {
        require_kinds(self.name(), "P", &self.params.perimeter, setup.n_kinds)?;
        require_kinds(self.name(), "LAMBDA_P", &self.params.lambda, setup.n_kinds)
    }

    fn attach(&mut self, view: &CellView<'_>) {
        self.perimeters.clear();
        let lattice = view.lattice();
        for i in 0..lattice.size() {
            let id = view.id_at(i);
            if id == BACKGROUND {
                continue;
            }
            let edges = lattice
                .neighbors(i)
                .iter()
                .filter(|&&n| view.id_at(n) != id)
                .count() as i64;
            *self.slot(id) += edges;
        }
    }

    fn on_pixel_changed(&mut self, view: &CellView<'_>, index: usize, old: CellId, new: CellId) {
        if old == new {
            return;
        }
        let mut n_new = 0i64;
        let mut n_old = 0i64;
        for &n in view.lattice().neighbors(index).iter() {
            let nt = view.id_at(n);
            if nt != new {
                n_new += 1;
            }
            if nt != old {
                n_old += 1;
            }
            if nt != BACKGROUND {
                if nt == old {
                    *self.slot(nt) += 1;
                }
                if nt == new {
                    *self.slot(nt) -= 1;
                }
            }
        }
        if old != BACKGROUND {
            *self.slot(old) -= n_old;
        }
        if new != BACKGROUND {
            *self.slot(new) += n_new;
        }
    }

    fn on_cell_removed(&mut self, id: CellId) {
        if let Some(p) = self.perimeters.get_mut(id as usize) {
            *p = 0;
        }
    }
}

impl SoftConstraint for PerimeterConstraint {
    fn delta_energy(&self, view: &CellView<'_>, _src: usize, tgt: usize, src_id: CellId, tgt_id: CellId) -> f64 {
        if src_id == tgt_id {
            return 0.0;
        }
        let mut src_change = 0i64;
        let mut tgt_change = 0i64;
        for &n in view.lattice().neighbors(tgt).iter() {
            let nt = view.id_at(n);
            if nt != src_id {
                src_change += 1;
            } else {
                src_change -= 1;
            }
            if nt != tgt_id {
                tgt_change -= 1;
            } else {
                tgt_change += 1;
            }
        }
        self.energy_change(view, src_id, src_change) + self.energy_change(view, tgt_id, tgt_change)
    }
}

impl From<PerimeterConstraint> for AnyConstraint {
    fn from(c: PerimeterConstraint) -> Self {
        AnyConstraint::Soft(Box::new(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::test_support::Fixture;
    use crate::grid::Neighborhood;

    fn params() -> PerimeterParams {
        PerimeterParams {
            perimeter: vec![0.0, 10.0],
            lambda: vec![0.0, 1.0],
        }
    }

    #[test]
    fn attach_counts_foreign_contacts() {
        let fx = Fixture::new(&[&[0, 0, 0], &[0, 1, 0], &[0, 0, 0]], &[1], 2);
        let mut c = PerimeterConstraint::new(params());
        c.attach(&fx.view());
        assert_eq!(c.perimeter_of(1), 8);
        assert_eq!(c.perimeter_of(BACKGROUND), 0);
    }

    #[test]
    fn thin_periodic_strip_matches_recount() {
        let mut fx = Fixture::with_neighborhood(&[&[0, 1, 1, 0, 0, 0]], &[1], 2, Neighborhood::Moore, true);
        let mut c = PerimeterConstraint::new(params());
        c.attach(&fx.view());
        assert_eq!(c.perimeter_of(1), 2);

        let i = fx.idx(3, 0);
        fx.grid.data[i] = 1;
        fx.cells.gain_pixel(1).unwrap();
        c.on_pixel_changed(&fx.view(), i, 0, 1);

        let mut fresh = PerimeterConstraint::new(params());
        fresh.attach(&fx.view());
        assert_eq!(c.perimeter_of(1), fresh.perimeter_of(1));
        assert_eq!(c.perimeter_of(1), 2);
    }

    #[test]
    fn incremental_update_matches_recount() {
        let mut fx = Fixture::new(
            &[&[0, 0, 0, 0], &[0, 1, 1, 0], &[0, 2, 2, 0], &[0, 0, 0, 0]],
            &[1, 1],
            2,
        );
        let mut c = PerimeterConstraint::new(params());
        c.attach(&fx.view());

        // cell 1 takes over the site of cell 2 at (1, 2)
        let i = fx.idx(1, 2);
        let predicted = c.delta_energy(&fx.view(), fx.idx(1, 1), i, 1, 2);
        let before = (c.perimeter_of(1), c.perimeter_of(2));
        fx.grid.data[i] = 1;
        c.on_pixel_changed(&fx.view(), i, 2, 1);

        let mut fresh = PerimeterConstraint::new(params());
        fresh.attach(&fx.view());
        assert_eq!(c.perimeter_of(1), fresh.perimeter_of(1));
        assert_eq!(c.perimeter_of(2), fresh.perimeter_of(2));

        let energy = |p: i64| (p as f64 - 10.0).powi(2);
        let expected = energy(c.perimeter_of(1)) + energy(c.perimeter_of(2))
            - energy(before.0)
            - energy(before.1);
        assert!((predicted - expected).abs() < 1e-9);
    }
}
