use serde::{Deserialize, Serialize};

use crate::cell::{BACKGROUND, CellId};
use crate::engine::CellView;
use crate::error::CpmResult;

use super::{AnyConstraint, Constraint, Setup, SoftConstraint, require_kinds};

/// Target volume and stiffness per kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeParams {
    pub volume: Vec<f64>,
    pub lambda: Vec<f64>,
}

/// Quadratic penalty `λ_V (V* - v)²` on each cell's volume.
#[derive(Clone, Debug)]
pub struct VolumeConstraint {
    params: VolumeParams,
}

impl VolumeConstraint {
    pub fn new(params: VolumeParams) -> Self {
        Self { params }
    }

    fn term(&self, view: &CellView<'_>, id: CellId, gain: i64) -> f64 {
        if id == BACKGROUND {
            return 0.0;
        }
        let k = view.kind_of(id);
        let l = self.params.lambda[k];
        if l == 0.0 {
            return 0.0;
        }
        let diff = self.params.volume[k] - (view.volume_of(id) as i64 + gain) as f64;
        l * diff * diff
    }
}

impl Constraint for VolumeConstraint {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn validate(&self, setup: &Setup<'_>) -> CpmResult<()> {
        require_kinds(self.name(), "V", &self.params.volume, setup.n_kinds)?;
        require_kinds(self.name(), "LAMBDA_V", &self.params.lambda, setup.n_kinds)
    }
}

impl SoftConstraint for VolumeConstraint {
    fn delta_energy(&self, view: &CellView<'_>, _src: usize, _tgt: usize, src_id: CellId, tgt_id: CellId) -> f64 {
        self.term(view, src_id, 1) - self.term(view, src_id, 0) + self.term(view, tgt_id, -1)
            - self.term(view, tgt_id, 0)
    }
}

impl From<VolumeConstraint> for AnyConstraint {
    fn from(c: VolumeConstraint) -> Self {
        AnyConstraint::Soft(Box::new(c))
    }
}
