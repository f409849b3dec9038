/*!
Error types for lattice setup, seeding and engine bookkeeping.

Configuration and capability errors surface while building the engine or
registering constraints, before any Monte Carlo step runs. An invariant
violation means the engine's own bookkeeping is broken; the engine refuses to
step again after reporting one.
*/

use crate::cell::CellId;

/// Result type for simulation operations
pub type CpmResult<T> = Result<T, CpmError>;

/// Errors that can occur while configuring or driving a simulation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CpmError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Constraint {constraint}: missing {parameter} entry for cell kind {kind}")]
    MissingKindParameter {
        constraint: &'static str,
        parameter: &'static str,
        kind: usize,
    },

    #[error("Constraint {constraint} requires {capability}, which this lattice does not provide")]
    Capability {
        constraint: &'static str,
        capability: &'static str,
    },

    #[error("Seeding gave up after {attempts} attempts without finding a free site")]
    SeedingExhausted { attempts: usize },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Cell id space exhausted: all ids up to {max} are live")]
    IdSpaceExhausted { max: CellId },

    #[error("Unknown cell id {0}")]
    UnknownCell(CellId),

    #[error("Out of bounds: point {point:?} not in extents {extents:?}")]
    OutOfBounds {
        point: Vec<usize>,
        extents: Vec<usize>,
    },
}

impl CpmError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        CpmError::Configuration(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        CpmError::InvariantViolation(msg.into())
    }
}
