use serde::{Deserialize, Serialize};

use crate::cell::{CellId, DEFAULT_MAX_CELL_ID};
use crate::constraints::{
    ActivityParams, AdhesionParams, BarrierParams, ChemotaxisParams, PerimeterParams, PersistenceParams,
    PreferredDirectionParams, VolumeParams, VolumeRangeParams,
};
use crate::error::{CpmError, CpmResult};
use crate::grid::Neighborhood;

/// How many copy attempts make up one Monte Carlo step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSchedule {
    /// One attempt per lattice site.
    #[default]
    SiteCount,
    /// One attempt per border pixel, counted when the step starts.
    BorderAdaptive,
    /// A fixed attempt count.
    Fixed(usize),
}

/// Per-kind parameter blocks. Every block present is registered by
/// [`crate::engine::Cpm::from_params`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintParams {
    pub barrier: Option<BarrierParams>,
    pub volume_range: Option<VolumeRangeParams>,
    pub adhesion: Option<AdhesionParams>,
    pub volume: Option<VolumeParams>,
    pub perimeter: Option<PerimeterParams>,
    pub activity: Option<ActivityParams>,
    pub persistence: Option<PersistenceParams>,
    pub preferred_direction: Option<PreferredDirectionParams>,
    pub chemotaxis: Option<ChemotaxisParams>,
}

/// Everything needed to build an engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    // Lattice
    pub extents: Vec<usize>,
    pub torus: Vec<bool>,
    pub neighborhood: Neighborhood,

    // Dynamics
    pub temperature: f64,
    pub seed: u64,
    pub check_connectivity: bool,
    pub schedule: StepSchedule,

    // Cells
    /// Number of kinds including background kind 0.
    pub n_kinds: usize,
    pub max_cell_id: CellId,

    pub constraints: ConstraintParams,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            extents: vec![100, 100],
            torus: vec![true, true],
            neighborhood: Neighborhood::Moore,
            temperature: 20.0,
            seed: 1,
            check_connectivity: true,
            schedule: StepSchedule::SiteCount,
            n_kinds: 2,
            max_cell_id: DEFAULT_MAX_CELL_ID,
            constraints: ConstraintParams {
                adhesion: Some(AdhesionParams {
                    j: vec![vec![0.0, 20.0], vec![20.0, 0.0]],
                }),
                volume: Some(VolumeParams {
                    volume: vec![0.0, 200.0],
                    lambda: vec![0.0, 50.0],
                }),
                ..ConstraintParams::default()
            },
        }
    }
}

impl Params {
    /// Checks that do not need a lattice. Lattice shape is checked when the
    /// lattice is built.
    pub fn validate(&self) -> CpmResult<()> {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(CpmError::config(format!(
                "temperature must be finite and non-negative, got {}",
                self.temperature
            )));
        }
        if self.n_kinds == 0 {
            return Err(CpmError::config("n_kinds must count the background kind"));
        }
        if self.max_cell_id == 0 {
            return Err(CpmError::config("max_cell_id must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let p = Params::default();
        assert!(p.validate().is_ok());
        assert!(p.constraints.adhesion.is_some());
        assert!(p.constraints.barrier.is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let p: Params = serde_json::from_str(
            r#"{
                "extents": [20, 30],
                "torus": [false, false],
                "neighborhood": "von_neumann",
                "schedule": { "fixed": 50 },
                "constraints": { "barrier": { "is_barrier": [false, true] } }
            }"#,
        )
        .unwrap();
        assert_eq!(p.extents, vec![20, 30]);
        assert_eq!(p.neighborhood, Neighborhood::VonNeumann);
        assert_eq!(p.schedule, StepSchedule::Fixed(50));
        assert_eq!(p.temperature, 20.0);
        assert!(p.constraints.barrier.is_some());
        // an explicit constraints block replaces the default bag entirely
        assert!(p.constraints.adhesion.is_none());
    }

    #[test]
    fn bad_temperature_rejected() {
        let p = Params {
            temperature: -1.0,
            ..Params::default()
        };
        assert!(matches!(p.validate(), Err(CpmError::Configuration(_))));
        let p = Params {
            temperature: f64::NAN,
            ..Params::default()
        };
        assert!(p.validate().is_err());
    }
}
