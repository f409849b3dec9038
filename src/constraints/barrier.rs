use serde::{Deserialize, Serialize};

use crate::cell::CellId;
use crate::engine::CellView;
use crate::error::CpmResult;

use super::{AnyConstraint, Constraint, HardConstraint, Setup, require_kinds};

/// Which kinds are impermeable obstacles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BarrierParams {
    pub is_barrier: Vec<bool>,
}

/// Barrier kinds neither invade nor get invaded.
#[derive(Clone, Debug)]
pub struct BarrierConstraint {
    params: BarrierParams,
}

impl BarrierConstraint {
    pub fn new(params: BarrierParams) -> Self {
        Self { params }
    }
}

impl Constraint for BarrierConstraint {
    fn name(&self) -> &'static str {
        "barrier"
    }

    fn validate(&self, setup: &Setup<'_>) -> CpmResult<()> {
        require_kinds(self.name(), "IS_BARRIER", &self.params.is_barrier, setup.n_kinds)
    }
}

impl HardConstraint for BarrierConstraint {
    fn permits(&self, view: &CellView<'_>, _src: usize, _tgt: usize, src_id: CellId, tgt_id: CellId) -> bool {
        !self.params.is_barrier[view.kind_of(src_id)] && !self.params.is_barrier[view.kind_of(tgt_id)]
    }
}

impl From<BarrierConstraint> for AnyConstraint {
    fn from(c: BarrierConstraint) -> Self {
        AnyConstraint::Hard(Box::new(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::test_support::Fixture;

    #[test]
    fn barrier_blocks_both_directions() {
        // kind 1 is a barrier (cell 1), kind 2 is a regular cell (cell 2)
        let fx = Fixture::new(&[&[1, 0, 2]], &[1, 2], 3);
        let view = fx.view();
        let c = BarrierConstraint::new(BarrierParams {
            is_barrier: vec![false, true, false],
        });
        assert!(!c.permits(&view, fx.idx(0, 0), fx.idx(1, 0), 1, 0));
        assert!(!c.permits(&view, fx.idx(1, 0), fx.idx(0, 0), 0, 1));
        assert!(c.permits(&view, fx.idx(2, 0), fx.idx(1, 0), 2, 0));
        assert!(c.permits(&view, fx.idx(1, 0), fx.idx(2, 0), 0, 2));
    }
}
