/*!
The Cellular Potts engine.

[`Cpm`] owns the identity grid, the cell registry, the border-pixel set and
every registered constraint. One Monte Carlo step draws border pixels,
proposes copying a random neighbour's identity onto them, and accepts or
rejects each proposal with the Metropolis rule. All randomness comes from the
engine's single seeded generator, so a run is reproducible from its params.
*/

use tracing::{debug, error, info, trace, warn};

use crate::cell::{BACKGROUND, CellId, CellKind, CellRegistry};
use crate::config::{Params, StepSchedule};
use crate::constraints::{
    ActivityConstraint, Adhesion, AnyConstraint, BarrierConstraint, ChemotaxisConstraint, Constraint,
    HardConstraint, HardVolumeRangeConstraint, PerimeterConstraint, PersistenceConstraint,
    PreferredDirectionConstraint, Setup, SoftConstraint, VolumeConstraint,
};
use crate::dice_set::DiceSet;
use crate::error::{CpmError, CpmResult};
use crate::grid::{Grid, Lattice, MAX_NEIGHBORS, Point};
use crate::rng::Rng;
use crate::stats::{self, CellPixels};

/// Read-only view of grid and registry handed to constraints.
#[derive(Clone, Copy, Debug)]
pub struct CellView<'a> {
    pub grid: &'a Grid<CellId>,
    pub cells: &'a CellRegistry,
}

impl<'a> CellView<'a> {
    #[inline]
    pub fn lattice(&self) -> &'a Lattice {
        self.grid.lattice()
    }

    #[inline]
    pub fn id_at(&self, i: usize) -> CellId {
        self.grid.data[i]
    }

    #[inline]
    pub fn kind_at(&self, i: usize) -> CellKind {
        self.cells.kind_of(self.grid.data[i])
    }

    #[inline]
    pub fn kind_of(&self, id: CellId) -> CellKind {
        self.cells.kind_of(id)
    }

    #[inline]
    pub fn volume_of(&self, id: CellId) -> u32 {
        self.cells.volume_of(id)
    }
}

/// Outcome counts for one Monte Carlo step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Attempts made; fewer than scheduled when the border set empties.
    pub attempts: usize,
    /// Source and target already shared an identity.
    pub discarded: usize,
    pub rejected_connectivity: usize,
    pub rejected_hard: usize,
    pub rejected_energy: usize,
    pub accepted: usize,
}

pub struct Cpm {
    grid: Grid<CellId>,
    cells: CellRegistry,
    border: DiceSet,
    soft: Vec<Box<dyn SoftConstraint>>,
    hard: Vec<Box<dyn HardConstraint>>,
    rng: Rng,
    temperature: f64,
    check_connectivity: bool,
    schedule: StepSchedule,
    time: u64,
    poisoned: Option<CpmError>,
}

impl Cpm {
    /// Empty (all background) engine without constraints.
    pub fn new(params: &Params) -> CpmResult<Self> {
        params.validate()?;
        let lattice = Lattice::new(&params.extents, &params.torus, params.neighborhood)?;
        info!(
            "Created {:?} lattice {:?} (torus {:?}), T = {}, seed = {}",
            params.neighborhood, params.extents, params.torus, params.temperature, params.seed
        );
        let size = lattice.size();
        Ok(Self {
            grid: Grid::new(lattice),
            cells: CellRegistry::new(params.n_kinds, params.max_cell_id),
            border: DiceSet::with_capacity(size),
            soft: Vec::new(),
            hard: Vec::new(),
            rng: Rng::new(params.seed),
            temperature: params.temperature,
            check_connectivity: params.check_connectivity,
            schedule: params.schedule,
            time: 0,
            poisoned: None,
        })
    }

    /// Engine with every constraint whose block is present in
    /// `params.constraints`, hard terms first.
    pub fn from_params(params: &Params) -> CpmResult<Self> {
        let mut cpm = Self::new(params)?;
        let c = &params.constraints;
        if let Some(p) = &c.barrier {
            cpm.add(BarrierConstraint::new(p.clone()))?;
        }
        if let Some(p) = &c.volume_range {
            cpm.add(HardVolumeRangeConstraint::new(p.clone()))?;
        }
        if let Some(p) = &c.adhesion {
            cpm.add(Adhesion::new(p.clone()))?;
        }
        if let Some(p) = &c.volume {
            cpm.add(VolumeConstraint::new(p.clone()))?;
        }
        if let Some(p) = &c.perimeter {
            cpm.add(PerimeterConstraint::new(p.clone()))?;
        }
        if let Some(p) = &c.activity {
            cpm.add(ActivityConstraint::new(p.clone()))?;
        }
        if let Some(p) = &c.persistence {
            cpm.add(PersistenceConstraint::new(p.clone()))?;
        }
        if let Some(p) = &c.preferred_direction {
            cpm.add(PreferredDirectionConstraint::new(p.clone()))?;
        }
        if let Some(p) = &c.chemotaxis {
            let chemotaxis = ChemotaxisConstraint::new(p.clone(), cpm.lattice())?;
            cpm.add(chemotaxis)?;
        }
        Ok(cpm)
    }

    // ---- constraints -------------------------------------------------------

    /// Validate, attach and register a constraint. Only between steps.
    pub fn add(&mut self, constraint: impl Into<AnyConstraint>) -> CpmResult<()> {
        let setup = Setup {
            lattice: self.grid.lattice(),
            n_kinds: self.cells.n_kinds(),
        };
        let view = CellView {
            grid: &self.grid,
            cells: &self.cells,
        };
        match constraint.into() {
            AnyConstraint::Soft(mut c) => {
                c.validate(&setup)?;
                c.attach(&view);
                info!("Registered soft constraint {}", c.name());
                self.soft.push(c);
            }
            AnyConstraint::Hard(mut c) => {
                c.validate(&setup)?;
                c.attach(&view);
                info!("Registered hard constraint {}", c.name());
                self.hard.push(c);
            }
        }
        Ok(())
    }

    /// Drop every constraint called `name`. Returns how many were removed.
    pub fn remove_constraint(&mut self, name: &str) -> usize {
        let before = self.soft.len() + self.hard.len();
        self.soft.retain(|c| c.name() != name);
        self.hard.retain(|c| c.name() != name);
        let removed = before - self.soft.len() - self.hard.len();
        if removed > 0 {
            info!("Removed {} constraint(s) named {}", removed, name);
        }
        removed
    }

    /// First registered constraint of type `T`.
    pub fn constraint<T: Constraint>(&self) -> Option<&T> {
        self.soft
            .iter()
            .find_map(|c| (**c).as_any().downcast_ref::<T>())
            .or_else(|| self.hard.iter().find_map(|c| (**c).as_any().downcast_ref::<T>()))
    }

    pub fn constraint_mut<T: Constraint>(&mut self) -> Option<&mut T> {
        if let Some(pos) = self.soft.iter().position(|c| (**c).as_any().is::<T>()) {
            return (*self.soft[pos]).as_any_mut().downcast_mut::<T>();
        }
        self.hard
            .iter_mut()
            .find_map(|c| (**c).as_any_mut().downcast_mut::<T>())
    }

    pub fn constraint_names(&self) -> Vec<&'static str> {
        self.hard
            .iter()
            .map(|c| c.name())
            .chain(self.soft.iter().map(|c| c.name()))
            .collect()
    }

    // ---- queries -----------------------------------------------------------

    pub fn grid(&self) -> &Grid<CellId> {
        &self.grid
    }

    pub fn cells(&self) -> &CellRegistry {
        &self.cells
    }

    pub fn lattice(&self) -> &Lattice {
        self.grid.lattice()
    }

    pub fn view(&self) -> CellView<'_> {
        CellView {
            grid: &self.grid,
            cells: &self.cells,
        }
    }

    /// Completed Monte Carlo steps.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn set_temperature(&mut self, temperature: f64) -> CpmResult<()> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(CpmError::config(format!(
                "temperature must be finite and non-negative, got {}",
                temperature
            )));
        }
        self.temperature = temperature;
        Ok(())
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    pub fn cell_id_at(&self, p: &Point) -> CpmResult<CellId> {
        Ok(self.grid.data[self.lattice().try_index(p)?])
    }

    pub fn kind_of(&self, id: CellId) -> CellKind {
        self.cells.kind_of(id)
    }

    pub fn volume_of(&self, id: CellId) -> u32 {
        self.cells.volume_of(id)
    }

    pub fn live_cell_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells.live_ids()
    }

    pub fn cell_pixels(&self, id: CellId) -> CellPixels<'_> {
        stats::cell_pixels(&self.grid, id)
    }

    pub fn neighbors_of(&self, p: &Point) -> CpmResult<Vec<Point>> {
        let lattice = self.lattice();
        let i = lattice.try_index(p)?;
        Ok(lattice.neighbors(i).iter().map(|&n| lattice.point(n)).collect())
    }

    pub fn border_pixels(&self) -> impl Iterator<Item = usize> + '_ {
        self.border.iter()
    }

    pub fn border_len(&self) -> usize {
        self.border.len()
    }

    pub(crate) fn rng_mut(&mut self) -> &mut Rng {
        &mut self.rng
    }

    // ---- mutation ----------------------------------------------------------

    /// Register a new cell of `kind`. It owns no pixels until some are set.
    pub fn make_new_cell_id(&mut self, kind: CellKind) -> CpmResult<CellId> {
        self.cells.make_new_cell_id(kind)
    }

    /// Assign `id` to the site at `p`, with the same bookkeeping as an
    /// accepted copy. Only between steps.
    pub fn set_pixel(&mut self, p: &Point, id: CellId) -> CpmResult<()> {
        let i = self.lattice().try_index(p)?;
        self.set_pixel_index(i, id)
    }

    pub fn set_pixel_index(&mut self, i: usize, id: CellId) -> CpmResult<()> {
        if let Some(e) = &self.poisoned {
            return Err(e.clone());
        }
        if i >= self.lattice().size() {
            return Err(CpmError::OutOfBounds {
                point: vec![i],
                extents: vec![self.lattice().size()],
            });
        }
        if id != BACKGROUND && !self.cells.is_live(id) {
            return Err(CpmError::UnknownCell(id));
        }
        self.apply_copy(i, id).inspect_err(|e| self.poison(e))
    }

    // ---- Monte Carlo step --------------------------------------------------

    /// Advance the simulation by one Monte Carlo step.
    ///
    /// Any error inside the step leaves the engine poisoned; later steps
    /// return the same error.
    pub fn monte_carlo_step(&mut self) -> CpmResult<StepReport> {
        if let Some(e) = &self.poisoned {
            return Err(e.clone());
        }
        self.run_step().inspect_err(|e| self.poison(e))
    }

    fn poison(&mut self, e: &CpmError) {
        error!("Engine poisoned at step {}: {}", self.time, e);
        self.poisoned = Some(e.clone());
    }

    fn run_step(&mut self) -> CpmResult<StepReport> {
        let scheduled = match self.schedule {
            StepSchedule::SiteCount => self.lattice().size(),
            StepSchedule::BorderAdaptive => self.border.len(),
            StepSchedule::Fixed(n) => n,
        };
        let mut report = StepReport::default();
        if self.border.is_empty() {
            warn!("Step {} runs on an empty border set", self.time);
        }
        // A copy can leave a single identity on the whole lattice; the
        // remaining attempts of the step have nothing to draw from.
        while report.attempts < scheduled && !self.border.is_empty() {
            report.attempts += 1;
            self.copy_attempt(&mut report)?;
        }
        if report.attempts < scheduled && report.attempts > 0 {
            debug!(
                "Border set emptied after {} of {} attempts in step {}",
                report.attempts, scheduled, self.time
            );
        }

        let view = CellView {
            grid: &self.grid,
            cells: &self.cells,
        };
        for c in self.hard.iter_mut() {
            c.on_step_end(&view, &mut self.rng)?;
        }
        for c in self.soft.iter_mut() {
            c.on_step_end(&view, &mut self.rng)?;
        }
        self.time += 1;
        debug!("Step {} done: {:?}", self.time, report);
        Ok(report)
    }

    fn copy_attempt(&mut self, report: &mut StepReport) -> CpmResult<()> {
        let Some(tgt) = self.border.sample(&mut self.rng) else {
            return Err(CpmError::invariant("border set emptied during a step"));
        };
        let neighbors = self.grid.lattice().neighbors(tgt);
        if neighbors.is_empty() {
            report.discarded += 1;
            return Ok(());
        }
        let src = neighbors[self.rng.range_usize(neighbors.len())];
        let src_id = self.grid.data[src];
        let tgt_id = self.grid.data[tgt];
        if src_id == tgt_id {
            report.discarded += 1;
            return Ok(());
        }
        if self.check_connectivity && !self.stays_connected(tgt, tgt_id) {
            report.rejected_connectivity += 1;
            return Ok(());
        }

        let view = CellView {
            grid: &self.grid,
            cells: &self.cells,
        };
        if !self.hard.iter().all(|c| c.permits(&view, src, tgt, src_id, tgt_id)) {
            report.rejected_hard += 1;
            return Ok(());
        }
        let dh: f64 = self
            .soft
            .iter()
            .map(|c| c.delta_energy(&view, src, tgt, src_id, tgt_id))
            .sum();
        trace!("copy {} -> {} ({} over {}): dH = {}", src, tgt, src_id, tgt_id, dh);

        if self.metropolis(dh) {
            self.apply_copy(tgt, src_id)?;
            report.accepted += 1;
        } else {
            report.rejected_energy += 1;
        }
        Ok(())
    }

    /// Accept with probability min(1, exp(-dh / T)).
    fn metropolis(&mut self, dh: f64) -> bool {
        if dh <= 0.0 {
            return true;
        }
        if self.temperature <= 0.0 {
            return false;
        }
        self.rng.next_f64() < (-dh / self.temperature).exp()
    }

    /// Would `id` stay connected without site `tgt`?
    ///
    /// Only the 3^D box around `tgt` is examined: the neighbours of `tgt`
    /// owned by `id` must reach each other through sites of `id` inside that
    /// box, linked by the lattice adjacency. This may reject moves a full
    /// flood fill would allow, never the reverse.
    fn stays_connected(&self, tgt: usize, id: CellId) -> bool {
        if id == BACKGROUND {
            return true;
        }
        let lattice = self.grid.lattice();
        let adjacent_to_tgt = lattice.neighbors(tgt);
        let mut own = [0usize; MAX_NEIGHBORS];
        let mut touches = [false; MAX_NEIGHBORS];
        let mut n = 0;
        let mut required = 0;
        for &i in lattice.box_neighbors(tgt).iter() {
            if self.grid.data[i] == id {
                own[n] = i;
                touches[n] = adjacent_to_tgt.contains(&i);
                required += usize::from(touches[n]);
                n += 1;
            }
        }
        if required <= 1 {
            return true;
        }
        let Some(start) = touches[..n].iter().position(|&t| t) else {
            return true;
        };

        let mut seen = [false; MAX_NEIGHBORS];
        let mut stack = [0usize; MAX_NEIGHBORS];
        stack[0] = start;
        seen[start] = true;
        let mut top = 1;
        let mut reached = 1;
        while top > 0 {
            top -= 1;
            let adjacent = lattice.neighbors(own[stack[top]]);
            for j in 0..n {
                if !seen[j] && adjacent.contains(&own[j]) {
                    seen[j] = true;
                    reached += usize::from(touches[j]);
                    stack[top] = j;
                    top += 1;
                }
            }
        }
        reached == required
    }

    /// Reassign site `i` to `new` and propagate to the registry, the border
    /// set and every constraint.
    fn apply_copy(&mut self, i: usize, new: CellId) -> CpmResult<()> {
        let old = self.grid.data[i];
        if old == new {
            return Ok(());
        }
        let died = self.cells.lose_pixel(old)?;
        self.grid.data[i] = new;
        self.cells.gain_pixel(new)?;

        self.refresh_border(i);
        for n in self.grid.lattice().neighbors(i).iter().copied() {
            self.refresh_border(n);
        }

        let view = CellView {
            grid: &self.grid,
            cells: &self.cells,
        };
        for c in self.hard.iter_mut() {
            c.on_pixel_changed(&view, i, old, new);
        }
        for c in self.soft.iter_mut() {
            c.on_pixel_changed(&view, i, old, new);
        }
        if died {
            trace!("Cell {} lost its last pixel", old);
            for c in self.hard.iter_mut() {
                c.on_cell_removed(old);
            }
            for c in self.soft.iter_mut() {
                c.on_cell_removed(old);
            }
        }
        Ok(())
    }

    fn is_border(&self, i: usize) -> bool {
        let id = self.grid.data[i];
        self.grid
            .lattice()
            .neighbors(i)
            .iter()
            .any(|&n| self.grid.data[n] != id)
    }

    fn refresh_border(&mut self, i: usize) {
        if self.is_border(i) {
            self.border.insert(i);
        } else {
            self.border.remove(i);
        }
    }

    /// Recompute volumes and border membership from the grid and compare
    /// them with the incrementally maintained state.
    pub fn verify(&self) -> CpmResult<()> {
        self.border.check_consistency()?;

        let mut volumes: Vec<u32> = Vec::new();
        for (_, id) in self.grid.pixels() {
            if !self.cells.is_live(id) {
                return Err(CpmError::invariant(format!("grid holds dead cell id {}", id)));
            }
            let slot = id as usize;
            if slot >= volumes.len() {
                volumes.resize(slot + 1, 0);
            }
            volumes[slot] += 1;
        }
        for id in self.cells.live_ids() {
            let counted = volumes.get(id as usize).copied().unwrap_or(0);
            if counted != self.cells.volume_of(id) {
                return Err(CpmError::invariant(format!(
                    "cell {} has volume {} but owns {} pixels",
                    id,
                    self.cells.volume_of(id),
                    counted
                )));
            }
        }

        let mut border_count = 0;
        for i in 0..self.lattice().size() {
            let expected = self.is_border(i);
            if expected != self.border.contains(i) {
                return Err(CpmError::invariant(format!(
                    "site {} border membership is {} but should be {}",
                    i,
                    self.border.contains(i),
                    expected
                )));
            }
            border_count += usize::from(expected);
        }
        if border_count != self.border.len() {
            return Err(CpmError::invariant(format!(
                "border set holds {} sites, expected {}",
                self.border.len(),
                border_count
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Cpm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpm")
            .field("extents", &self.lattice().extents())
            .field("time", &self.time)
            .field("temperature", &self.temperature)
            .field("live_cells", &self.cells.live_count())
            .field("border", &self.border.len())
            .field("constraints", &self.constraint_names())
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConstraintParams;
    use crate::constraints::{AdhesionParams, BarrierParams, VolumeParams};
    use crate::grid::Neighborhood;

    fn bare(w: usize, h: usize) -> Params {
        Params {
            extents: vec![w, h],
            torus: vec![false, false],
            neighborhood: Neighborhood::Moore,
            temperature: 10.0,
            seed: 3,
            constraints: ConstraintParams::default(),
            ..Params::default()
        }
    }

    #[test]
    fn set_pixel_keeps_border_and_volume() {
        let mut cpm = Cpm::new(&bare(5, 5)).unwrap();
        let id = cpm.make_new_cell_id(1).unwrap();
        cpm.set_pixel(&Point::xy(2, 2), id).unwrap();
        assert_eq!(cpm.volume_of(id), 1);
        assert_eq!(cpm.border_len(), 9);
        cpm.verify().unwrap();

        cpm.set_pixel(&Point::xy(2, 2), BACKGROUND).unwrap();
        assert!(!cpm.cells().is_live(id));
        assert_eq!(cpm.border_len(), 0);
        cpm.verify().unwrap();
    }

    #[test]
    fn set_pixel_rejects_unknown_ids() {
        let mut cpm = Cpm::new(&bare(3, 3)).unwrap();
        assert_eq!(
            cpm.set_pixel(&Point::xy(0, 0), 7),
            Err(CpmError::UnknownCell(7))
        );
        assert!(matches!(
            cpm.set_pixel(&Point::xy(3, 0), BACKGROUND),
            Err(CpmError::OutOfBounds { .. })
        ));
        assert!(!cpm.is_poisoned());
    }

    #[test]
    fn connectivity_check_is_local() {
        let mut cpm = Cpm::new(&bare(5, 3)).unwrap();
        let id = cpm.make_new_cell_id(1).unwrap();
        for x in 0..5 {
            cpm.set_pixel(&Point::xy(x, 1), id).unwrap();
        }
        // removing the middle of a horizontal bar splits it
        let mid = cpm.lattice().index(&Point::xy(2, 1));
        assert!(!cpm.stays_connected(mid, id));
        // removing an end does not
        let end = cpm.lattice().index(&Point::xy(4, 1));
        assert!(cpm.stays_connected(end, id));
        assert!(cpm.stays_connected(mid, BACKGROUND));
    }

    #[test]
    fn von_neumann_corner_can_leave_a_block() {
        let mut p = bare(6, 6);
        p.neighborhood = Neighborhood::VonNeumann;
        let mut cpm = Cpm::new(&p).unwrap();
        let id = cpm.make_new_cell_id(1).unwrap();
        for (x, y) in [(2, 2), (3, 2), (2, 3), (3, 3)] {
            cpm.set_pixel(&Point::xy(x, y), id).unwrap();
        }
        // the other three pixels stay linked through (2, 2)
        let corner = cpm.lattice().index(&Point::xy(3, 3));
        assert!(cpm.stays_connected(corner, id));

        // a diagonal link alone does not connect under von Neumann
        cpm.set_pixel(&Point::xy(2, 2), BACKGROUND).unwrap();
        assert!(!cpm.stays_connected(corner, id));
    }

    #[test]
    fn last_cell_dying_mid_step_ends_the_step() {
        let mut p = bare(3, 3);
        p.temperature = 0.0;
        p.constraints.adhesion = Some(AdhesionParams {
            j: vec![vec![0.0, 20.0], vec![20.0, 0.0]],
        });
        let mut cpm = Cpm::from_params(&p).unwrap();
        let id = cpm.make_new_cell_id(1).unwrap();
        cpm.set_pixel(&Point::xy(1, 1), id).unwrap();
        // growth is uphill and shrinking downhill, so the cell can only die
        let mut steps = 0;
        while cpm.cells().is_live(id) && steps < 100 {
            let report = cpm.monte_carlo_step().unwrap();
            assert!(report.accepted <= 1);
            steps += 1;
        }
        assert!(!cpm.cells().is_live(id));
        assert_eq!(cpm.border_len(), 0);
        assert!(!cpm.is_poisoned());
        cpm.verify().unwrap();

        let idle = cpm.monte_carlo_step().unwrap();
        assert_eq!(idle.attempts, 0);
    }

    #[test]
    fn typed_lookup_and_removal() {
        let mut p = bare(6, 6);
        p.constraints.adhesion = Some(AdhesionParams {
            j: vec![vec![0.0, 10.0], vec![10.0, 0.0]],
        });
        p.constraints.volume = Some(VolumeParams {
            volume: vec![0.0, 9.0],
            lambda: vec![0.0, 1.0],
        });
        p.constraints.barrier = Some(BarrierParams {
            is_barrier: vec![false, false],
        });
        let mut cpm = Cpm::from_params(&p).unwrap();
        assert_eq!(cpm.constraint_names(), vec!["barrier", "adhesion", "volume"]);
        assert!(cpm.constraint::<Adhesion>().is_some());
        assert!(cpm.constraint::<BarrierConstraint>().is_some());
        assert!(cpm.constraint_mut::<VolumeConstraint>().is_some());
        assert!(cpm.constraint::<PerimeterConstraint>().is_none());
        assert_eq!(cpm.remove_constraint("adhesion"), 1);
        assert!(cpm.constraint::<Adhesion>().is_none());
        assert_eq!(cpm.remove_constraint("adhesion"), 0);
    }

    #[test]
    fn missing_kind_parameter_fails_registration() {
        let mut p = bare(4, 4);
        p.n_kinds = 3;
        p.constraints.volume = Some(VolumeParams {
            volume: vec![0.0, 9.0],
            lambda: vec![0.0, 1.0],
        });
        assert!(matches!(
            Cpm::from_params(&p),
            Err(CpmError::MissingKindParameter { kind: 2, .. })
        ));
    }

    #[test]
    fn empty_grid_step_is_a_no_op() {
        let mut cpm = Cpm::new(&bare(4, 4)).unwrap();
        let report = cpm.monte_carlo_step().unwrap();
        assert_eq!(report.accepted, 0);
        assert_eq!(cpm.time(), 1);
    }

    #[test]
    fn metropolis_boundaries() {
        let mut cpm = Cpm::new(&bare(2, 2)).unwrap();
        cpm.set_temperature(0.0).unwrap();
        assert!(cpm.metropolis(0.0));
        assert!(cpm.metropolis(-5.0));
        assert!(!cpm.metropolis(1e-9));
        cpm.set_temperature(1e12).unwrap();
        assert!(cpm.metropolis(-1.0));
        assert!(cpm.set_temperature(-1.0).is_err());
    }
}
