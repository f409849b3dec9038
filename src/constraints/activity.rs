use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cell::{BACKGROUND, CellId};
use crate::engine::CellView;
use crate::error::CpmResult;
use crate::rng::Rng;

use super::{AnyConstraint, Constraint, Setup, SoftConstraint, require_kinds};

/// How pixel activities around a site are pooled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityMean {
    #[default]
    Arithmetic,
    Geometric,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityParams {
    pub max_act: Vec<f64>,
    pub lambda: Vec<f64>,
    #[serde(default)]
    pub mean: ActivityMean,
}

/// Act model: freshly copied pixels get activity `max_act[kind]`, which
/// decays by one per Monte Carlo step. Copies from high-activity regions into
/// low-activity ones are favoured, producing protrusive, persistent motion.
#[derive(Clone, Debug)]
pub struct ActivityConstraint {
    params: ActivityParams,
    activity: Vec<f64>,
}

impl ActivityConstraint {
    pub fn new(params: ActivityParams) -> Self {
        Self {
            params,
            activity: Vec::new(),
        }
    }

    /// Raw activity of one pixel.
    pub fn pixel_activity(&self, i: usize) -> f64 {
        self.activity.get(i).copied().unwrap_or(0.0)
    }

    /// Pooled activity of site `i` over itself and same-cell neighbours.
    pub fn activity_at(&self, view: &CellView<'_>, i: usize) -> f64 {
        let id = view.id_at(i);
        if id == BACKGROUND {
            return 0.0;
        }
        let nb = view.lattice().neighbors(i);
        let own = nb
            .iter()
            .copied()
            .filter(|&n| view.id_at(n) == id)
            .map(|n| self.pixel_activity(n));
        match self.params.mean {
            ActivityMean::Arithmetic => {
                let (sum, count) = own.fold((self.pixel_activity(i), 1usize), |(s, c), a| (s + a, c + 1));
                sum / count as f64
            }
            ActivityMean::Geometric => {
                let (prod, count) = own.fold((self.pixel_activity(i), 1usize), |(p, c), a| (p * a, c + 1));
                prod.powf(1.0 / count as f64)
            }
        }
    }
}

impl Constraint for ActivityConstraint {
    fn name(&self) -> &'static str {
        "activity"
    }

    fn validate(&self, setup: &Setup<'_>) -> CpmResult<()> {
        require_kinds(self.name(), "MAX_ACT", &self.params.max_act, setup.n_kinds)?;
        require_kinds(self.name(), "LAMBDA_ACT", &self.params.lambda, setup.n_kinds)
    }

    fn attach(&mut self, view: &CellView<'_>) {
        self.activity = vec![0.0; view.lattice().size()];
    }

    fn on_pixel_changed(&mut self, view: &CellView<'_>, index: usize, _old: CellId, new: CellId) {
        self.activity[index] = self.params.max_act[view.kind_of(new)];
    }

    fn on_step_end(&mut self, _view: &CellView<'_>, _rng: &mut Rng) -> CpmResult<()> {
        self.activity.par_iter_mut().for_each(|a| {
            if *a > 0.0 {
                *a = (*a - 1.0).max(0.0);
            }
        });
        Ok(())
    }
}

impl SoftConstraint for ActivityConstraint {
    fn delta_energy(&self, view: &CellView<'_>, src: usize, tgt: usize, src_id: CellId, tgt_id: CellId) -> f64 {
        // source parameters, unless the source is background
        let k = if src_id != BACKGROUND {
            view.kind_of(src_id)
        } else {
            view.kind_of(tgt_id)
        };
        let max_act = self.params.max_act[k];
        let lambda = self.params.lambda[k];
        if max_act == 0.0 || lambda == 0.0 {
            return 0.0;
        }
        lambda * (self.activity_at(view, tgt) - self.activity_at(view, src)) / max_act
    }
}

impl From<ActivityConstraint> for AnyConstraint {
    fn from(c: ActivityConstraint) -> Self {
        AnyConstraint::Soft(Box::new(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::test_support::Fixture;

    fn params(mean: ActivityMean) -> ActivityParams {
        ActivityParams {
            max_act: vec![0.0, 20.0],
            lambda: vec![0.0, 100.0],
            mean,
        }
    }

    #[test]
    fn stamps_and_decays() {
        let mut fx = Fixture::new(&[&[1, 0, 0]], &[1], 2);
        let mut c = ActivityConstraint::new(params(ActivityMean::Arithmetic));
        c.attach(&fx.view());
        let i = fx.idx(1, 0);
        fx.grid.data[i] = 1;
        fx.cells.gain_pixel(1).unwrap();
        c.on_pixel_changed(&fx.view(), i, 0, 1);
        assert_eq!(c.pixel_activity(i), 20.0);
        let mut rng = Rng::new(1);
        for _ in 0..5 {
            c.on_step_end(&fx.view(), &mut rng).unwrap();
        }
        assert_eq!(c.pixel_activity(i), 15.0);
        for _ in 0..30 {
            c.on_step_end(&fx.view(), &mut rng).unwrap();
        }
        assert_eq!(c.pixel_activity(i), 0.0);
    }

    #[test]
    fn protrusion_from_active_front_is_favoured() {
        let mut fx = Fixture::new(&[&[1, 1, 0]], &[1], 2);
        let mut c = ActivityConstraint::new(params(ActivityMean::Arithmetic));
        c.attach(&fx.view());
        let front = fx.idx(1, 0);
        c.on_pixel_changed(&fx.view(), front, 0, 1);
        fx.grid.data[front] = 1;
        let view = fx.view();
        // activity at front: mean(20, 0) = 10; background target has 0
        let extend = c.delta_energy(&view, front, fx.idx(2, 0), 1, 0);
        assert_eq!(extend, 100.0 * (0.0 - 10.0) / 20.0);
        // retraction of the active front is penalised
        let retract = c.delta_energy(&view, fx.idx(2, 0), front, 0, 1);
        assert!(retract > 0.0);
    }

    #[test]
    fn geometric_mean_zero_when_any_pixel_idle() {
        let fx = Fixture::new(&[&[1, 1, 0]], &[1], 2);
        let mut c = ActivityConstraint::new(params(ActivityMean::Geometric));
        c.attach(&fx.view());
        c.on_pixel_changed(&fx.view(), fx.idx(1, 0), 0, 1);
        assert_eq!(c.activity_at(&fx.view(), fx.idx(1, 0)), 0.0);
    }
}
