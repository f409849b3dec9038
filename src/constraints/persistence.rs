use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::cell::{BACKGROUND, CellId};
use crate::engine::CellView;
use crate::error::{CpmError, CpmResult};
use crate::grid::MAX_DIMS;
use crate::rng::Rng;
use crate::stats;

use super::{AnyConstraint, Constraint, Setup, SoftConstraint, copy_vector, require_cartesian, require_kinds};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistenceParams {
    pub lambda: Vec<f64>,
    /// Centroid history length (in steps) used to estimate displacement.
    /// At least 2 for every kind with a non-zero `lambda`.
    pub delta_t: Vec<usize>,
    /// Weight of the previous direction when updating, in [0, 1].
    pub persist: Vec<f64>,
}

#[derive(Clone, Debug)]
struct Track {
    centroids: VecDeque<[f64; MAX_DIMS]>,
    direction: [f64; MAX_DIMS],
}

/// Each cell prefers to keep moving the way it has recently moved.
///
/// At the end of every step the cell's centroid is recorded; once
/// `delta_t` centroids are stored the displacement across that window is
/// blended with the previous direction.
#[derive(Clone, Debug)]
pub struct PersistenceConstraint {
    params: PersistenceParams,
    tracks: BTreeMap<CellId, Track>,
}

impl PersistenceConstraint {
    pub fn new(params: PersistenceParams) -> Self {
        Self {
            params,
            tracks: BTreeMap::new(),
        }
    }

    /// Current unit direction of `id`, if it has one.
    pub fn direction_of(&self, id: CellId) -> Option<[f64; MAX_DIMS]> {
        self.tracks.get(&id).map(|t| t.direction)
    }
}

fn normalize(v: &mut [f64; MAX_DIMS]) -> bool {
    let len = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if len == 0.0 || !len.is_finite() {
        return false;
    }
    for x in v.iter_mut() {
        *x /= len;
    }
    true
}

/// Uniformly distributed unit vector in `ndim` dimensions.
pub(crate) fn random_direction(rng: &mut Rng, ndim: usize) -> [f64; MAX_DIMS] {
    loop {
        let mut v = [0f64; MAX_DIMS];
        for x in v.iter_mut().take(ndim) {
            *x = rng.range_f64(-1.0, 1.0);
        }
        let len_sq: f64 = v.iter().map(|x| x * x).sum();
        if len_sq > 0.0 && len_sq <= 1.0 && normalize(&mut v) {
            return v;
        }
    }
}

impl Constraint for PersistenceConstraint {
    fn name(&self) -> &'static str {
        "persistence"
    }

    fn validate(&self, setup: &Setup<'_>) -> CpmResult<()> {
        require_cartesian(self.name(), setup.lattice)?;
        require_kinds(self.name(), "LAMBDA_DIR", &self.params.lambda, setup.n_kinds)?;
        require_kinds(self.name(), "DELTA_T", &self.params.delta_t, setup.n_kinds)?;
        require_kinds(self.name(), "PERSIST", &self.params.persist, setup.n_kinds)?;
        for (k, (&lambda, &delta_t)) in self.params.lambda.iter().zip(&self.params.delta_t).enumerate() {
            if lambda != 0.0 && delta_t < 2 {
                return Err(CpmError::config(format!(
                    "persistence DELTA_T for kind {} must be at least 2, got {}",
                    k, delta_t
                )));
            }
        }
        Ok(())
    }

    fn on_cell_removed(&mut self, id: CellId) {
        self.tracks.remove(&id);
    }

    fn on_step_end(&mut self, view: &CellView<'_>, rng: &mut Rng) -> CpmResult<()> {
        let lattice = view.lattice();
        let ndim = lattice.ndim();
        for (id, centroid) in stats::centroids(view) {
            let k = view.kind_of(id);
            if self.params.lambda[k] == 0.0 {
                self.tracks.remove(&id);
                continue;
            }
            let track = self.tracks.entry(id).or_insert_with(|| Track {
                centroids: VecDeque::new(),
                direction: random_direction(rng, ndim),
            });
            track.centroids.push_front(centroid);
            if track.centroids.len() < self.params.delta_t[k] {
                continue;
            }
            let Some(oldest) = track.centroids.pop_back() else {
                continue;
            };
            let mut dx = [0f64; MAX_DIMS];
            for d in 0..ndim {
                let ext = lattice.extents()[d] as f64;
                let mut v = centroid[d] - oldest[d];
                if lattice.torus()[d] {
                    if v > ext / 2.0 {
                        v -= ext;
                    } else if v < -ext / 2.0 {
                        v += ext;
                    }
                }
                dx[d] = v;
            }
            if !normalize(&mut dx) {
                continue;
            }
            let per = self.params.persist[k];
            for d in 0..ndim {
                dx[d] = (1.0 - per) * dx[d] + per * track.direction[d];
            }
            if normalize(&mut dx) {
                track.direction = dx;
            }
        }
        Ok(())
    }
}

impl SoftConstraint for PersistenceConstraint {
    fn delta_energy(&self, view: &CellView<'_>, src: usize, tgt: usize, src_id: CellId, _tgt_id: CellId) -> f64 {
        if src_id == BACKGROUND {
            return 0.0;
        }
        let Some(track) = self.tracks.get(&src_id) else {
            return 0.0;
        };
        let lattice = view.lattice();
        let step = copy_vector(lattice, &lattice.point(src), &lattice.point(tgt));
        let r: f64 = step.iter().zip(track.direction.iter()).map(|(a, b)| a * b).sum();
        -r * self.params.lambda[view.kind_of(src_id)]
    }
}

impl From<PersistenceConstraint> for AnyConstraint {
    fn from(c: PersistenceConstraint) -> Self {
        AnyConstraint::Soft(Box::new(c))
    }
}
