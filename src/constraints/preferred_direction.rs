use serde::{Deserialize, Serialize};

use crate::cell::{BACKGROUND, CellId};
use crate::engine::CellView;
use crate::error::{CpmError, CpmResult};

use super::{AnyConstraint, Constraint, Setup, SoftConstraint, copy_vector, require_cartesian, require_kinds};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreferredDirectionParams {
    pub lambda: Vec<f64>,
    /// One direction vector per kind, with one component per lattice axis.
    pub direction: Vec<Vec<f64>>,
}

/// Fixed per-kind drift: copies along the preferred direction lower the
/// energy by `λ · (step · direction)`.
#[derive(Clone, Debug)]
pub struct PreferredDirectionConstraint {
    params: PreferredDirectionParams,
}

impl PreferredDirectionConstraint {
    pub fn new(params: PreferredDirectionParams) -> Self {
        Self { params }
    }
}

impl Constraint for PreferredDirectionConstraint {
    fn name(&self) -> &'static str {
        "preferred_direction"
    }

    fn validate(&self, setup: &Setup<'_>) -> CpmResult<()> {
        require_cartesian(self.name(), setup.lattice)?;
        require_kinds(self.name(), "LAMBDA_DIR", &self.params.lambda, setup.n_kinds)?;
        require_kinds(self.name(), "DIR", &self.params.direction, setup.n_kinds)?;
        let ndim = setup.lattice.ndim();
        if let Some(k) = self.params.direction.iter().position(|d| d.len() != ndim) {
            return Err(CpmError::config(format!(
                "preferred direction for kind {} has {} components on a {}D lattice",
                k,
                self.params.direction[k].len(),
                ndim
            )));
        }
        Ok(())
    }
}

impl SoftConstraint for PreferredDirectionConstraint {
    fn delta_energy(&self, view: &CellView<'_>, src: usize, tgt: usize, src_id: CellId, _tgt_id: CellId) -> f64 {
        if src_id == BACKGROUND {
            return 0.0;
        }
        let k = view.kind_of(src_id);
        let lambda = self.params.lambda[k];
        if lambda == 0.0 {
            return 0.0;
        }
        let lattice = view.lattice();
        let step = copy_vector(lattice, &lattice.point(src), &lattice.point(tgt));
        let r: f64 = step
            .iter()
            .zip(self.params.direction[k].iter())
            .map(|(a, b)| a * b)
            .sum();
        -r * lambda
    }
}

impl From<PreferredDirectionConstraint> for AnyConstraint {
    fn from(c: PreferredDirectionConstraint) -> Self {
        AnyConstraint::Soft(Box::new(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::test_support::Fixture;
    use crate::grid::Neighborhood;

    fn rightward() -> PreferredDirectionConstraint {
        PreferredDirectionConstraint::new(PreferredDirectionParams {
            lambda: vec![0.0, 5.0],
            direction: vec![vec![0.0, 0.0], vec![1.0, 0.0]],
        })
    }

    #[test]
    fn favours_copies_along_direction() {
        let fx = Fixture::new(&[&[0, 1, 0]], &[1], 2);
        let view = fx.view();
        let c = rightward();
        assert_eq!(c.delta_energy(&view, fx.idx(1, 0), fx.idx(2, 0), 1, 0), -5.0);
        assert_eq!(c.delta_energy(&view, fx.idx(1, 0), fx.idx(0, 0), 1, 0), 5.0);
        assert_eq!(c.delta_energy(&view, fx.idx(0, 0), fx.idx(1, 0), 0, 1), 0.0);
    }

    #[test]
    fn wrapped_copy_keeps_its_sign() {
        let fx = Fixture::with_neighborhood(&[&[0, 0, 1]], &[1], 2, Neighborhood::Moore, true);
        let view = fx.view();
        // x = 2 -> x = 0 across the periodic edge is a step to the right
        assert_eq!(rightward().delta_energy(&view, fx.idx(2, 0), fx.idx(0, 0), 1, 0), -5.0);
    }

    #[test]
    fn direction_dimension_checked() {
        let fx = Fixture::new(&[&[0, 0]], &[], 2);
        let setup = Setup {
            lattice: fx.grid.lattice(),
            n_kinds: 2,
        };
        assert!(rightward().validate(&setup).is_ok());
        let bad = PreferredDirectionConstraint::new(PreferredDirectionParams {
            lambda: vec![0.0, 5.0],
            direction: vec![vec![0.0, 0.0], vec![1.0]],
        });
        assert!(matches!(bad.validate(&setup), Err(CpmError::Configuration(_))));
    }
}
