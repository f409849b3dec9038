use serde::{Deserialize, Serialize};

use crate::cell::{BACKGROUND, CellId};
use crate::engine::CellView;
use crate::error::{CpmError, CpmResult};

use super::{AnyConstraint, Constraint, HardConstraint, Setup, require_kinds};

/// Inclusive volume bounds per kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeRangeParams {
    pub min: Vec<u32>,
    pub max: Vec<u32>,
}

/// Vetoes copies that push the gaining cell above its maximum or the losing
/// cell below its minimum. Background is unbounded.
#[derive(Clone, Debug)]
pub struct HardVolumeRangeConstraint {
    params: VolumeRangeParams,
}

impl HardVolumeRangeConstraint {
    pub fn new(params: VolumeRangeParams) -> Self {
        Self { params }
    }
}

impl Constraint for HardVolumeRangeConstraint {
    fn name(&self) -> &'static str {
        "volume_range"
    }

    fn validate(&self, setup: &Setup<'_>) -> CpmResult<()> {
        require_kinds(self.name(), "VRANGE_MIN", &self.params.min, setup.n_kinds)?;
        require_kinds(self.name(), "VRANGE_MAX", &self.params.max, setup.n_kinds)?;
        for k in 1..setup.n_kinds {
            if self.params.min[k] > self.params.max[k] {
                return Err(CpmError::config(format!(
                    "volume range for kind {} has min {} above max {}",
                    k, self.params.min[k], self.params.max[k]
                )));
            }
        }
        Ok(())
    }
}

impl HardConstraint for HardVolumeRangeConstraint {
    fn permits(&self, view: &CellView<'_>, _src: usize, _tgt: usize, src_id: CellId, tgt_id: CellId) -> bool {
        if src_id != BACKGROUND {
            let k = view.kind_of(src_id);
            if view.volume_of(src_id) as u64 + 1 > self.params.max[k] as u64 {
                return false;
            }
        }
        if tgt_id != BACKGROUND {
            let k = view.kind_of(tgt_id);
            if (view.volume_of(tgt_id) as i64 - 1) < self.params.min[k] as i64 {
                return false;
            }
        }
        true
    }
}

impl From<HardVolumeRangeConstraint> for AnyConstraint {
    fn from(c: HardVolumeRangeConstraint) -> Self {
        AnyConstraint::Hard(Box::new(c))
    }
}
