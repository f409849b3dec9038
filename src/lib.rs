pub mod cell;
pub mod coarse;
pub mod config;
pub mod constraints;
pub mod dice_set;
pub mod engine;
pub mod error;
pub mod grid;
pub mod render;
pub mod rng;
pub mod seed;
pub mod stats;

use std::time::Instant;

use tracing::info;

pub use cell::{BACKGROUND, CellId, CellKind};
pub use config::{ConstraintParams, Params, StepSchedule};
pub use engine::{CellView, Cpm, StepReport};
pub use error::{CpmError, CpmResult};
pub use grid::{Lattice, Neighborhood, Point};

pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// Build an engine from `params`, let `setup` place the initial cells, then
/// run `steps` Monte Carlo steps. Returns the engine and per-phase timings.
pub fn simulate<F>(params: &Params, steps: u64, setup: F) -> CpmResult<(Cpm, Vec<Timing>)>
where
    F: FnOnce(&mut Cpm) -> CpmResult<()>,
{
    let mut timings = Vec::new();
    let total_start = Instant::now();

    // 1. Engine and constraints
    let t = Instant::now();
    let mut cpm = Cpm::from_params(params)?;
    timings.push(Timing {
        name: "build",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    // 2. Initial cells
    let t = Instant::now();
    setup(&mut cpm)?;
    timings.push(Timing {
        name: "seed",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });
    info!("Seeded {} cells", cpm.cells().live_count());

    // 3. Monte Carlo steps
    let t = Instant::now();
    let mut accepted = 0usize;
    for _ in 0..steps {
        accepted += cpm.monte_carlo_step()?.accepted;
    }
    timings.push(Timing {
        name: "steps",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });
    info!("Ran {} steps, {} copies accepted", steps, accepted);

    timings.push(Timing {
        name: "TOTAL",
        ms: total_start.elapsed().as_secs_f64() * 1000.0,
    });

    Ok((cpm, timings))
}
