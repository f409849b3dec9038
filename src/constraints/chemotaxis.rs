use serde::{Deserialize, Serialize};

use crate::cell::{BACKGROUND, CellId};
use crate::coarse::CoarseGrid;
use crate::engine::CellView;
use crate::error::{CpmError, CpmResult};
use crate::grid::Lattice;
use crate::rng::Rng;

use super::{AnyConstraint, Constraint, Setup, SoftConstraint, require_kinds};

fn default_upscale() -> usize {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChemotaxisParams {
    pub lambda: Vec<f64>,
    /// Amount each pixel of a kind deposits per step.
    #[serde(default)]
    pub secretion: Vec<f64>,
    #[serde(default = "default_upscale")]
    pub upscale: usize,
    #[serde(default)]
    pub diffusion: f64,
    #[serde(default)]
    pub diffusion_steps: usize,
    /// Fraction of the field lost per step.
    #[serde(default)]
    pub decay: f64,
}

/// Bias copies up the gradient of a chemical field.
///
/// The field lives on a [`CoarseGrid`] owned by the constraint. Cells may
/// secrete into it; after secretion the field diffuses and decays once per
/// Monte Carlo step.
#[derive(Clone, Debug)]
pub struct ChemotaxisConstraint {
    params: ChemotaxisParams,
    field: CoarseGrid,
}

impl ChemotaxisConstraint {
    pub fn new(params: ChemotaxisParams, lattice: &Lattice) -> CpmResult<Self> {
        if !(0.0..=1.0).contains(&params.decay) {
            return Err(CpmError::config(format!(
                "chemotaxis decay must lie in [0, 1], got {}",
                params.decay
            )));
        }
        let field = CoarseGrid::new(lattice, params.upscale)?;
        Ok(Self { params, field })
    }

    pub fn field(&self) -> &CoarseGrid {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut CoarseGrid {
        &mut self.field
    }
}

impl Constraint for ChemotaxisConstraint {
    fn name(&self) -> &'static str {
        "chemotaxis"
    }

    fn validate(&self, setup: &Setup<'_>) -> CpmResult<()> {
        require_kinds(self.name(), "LAMBDA_CH", &self.params.lambda, setup.n_kinds)?;
        if !self.params.secretion.is_empty() {
            require_kinds(self.name(), "SECRETION", &self.params.secretion, setup.n_kinds)?;
        }
        let fine = setup.lattice;
        let coarse = self.field.field().lattice();
        let matches = fine.ndim() == coarse.ndim()
            && fine
                .extents()
                .iter()
                .zip(coarse.extents())
                .all(|(&f, &c)| c * self.params.upscale == f);
        if !matches {
            return Err(CpmError::config(format!(
                "chemotaxis field {:?} x{} does not cover lattice {:?}",
                coarse.extents(),
                self.params.upscale,
                fine.extents()
            )));
        }
        Ok(())
    }

    fn on_step_end(&mut self, view: &CellView<'_>, _rng: &mut Rng) -> CpmResult<()> {
        if !self.params.secretion.is_empty() {
            let lattice = view.lattice();
            for (i, id) in view.grid.pixels() {
                let amount = self.params.secretion[view.kind_of(id)];
                if amount != 0.0 {
                    self.field.add_at_fine(&lattice.point(i), amount);
                }
            }
        }
        for _ in 0..self.params.diffusion_steps {
            self.field.diffusion(self.params.diffusion)?;
        }
        if self.params.decay > 0.0 {
            self.field.scale(1.0 - self.params.decay);
        }
        Ok(())
    }
}

impl SoftConstraint for ChemotaxisConstraint {
    fn delta_energy(&self, view: &CellView<'_>, src: usize, tgt: usize, src_id: CellId, _tgt_id: CellId) -> f64 {
        if src_id == BACKGROUND {
            return 0.0;
        }
        let lambda = self.params.lambda[view.kind_of(src_id)];
        if lambda == 0.0 {
            return 0.0;
        }
        let lattice = view.lattice();
        let delta = self.field.value_at_fine(&lattice.point(tgt)) - self.field.value_at_fine(&lattice.point(src));
        -lambda * delta
    }
}

impl From<ChemotaxisConstraint> for AnyConstraint {
    fn from(c: ChemotaxisConstraint) -> Self {
        AnyConstraint::Soft(Box::new(c))
    }
}
