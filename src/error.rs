//! Error types.
//!
//! - [`ConfigError`]: a scenario that must not be simulated
//! - [`ParseError`]: a legacy input or trajectory file that cannot be read
//! - [`SimulationError`]: a run that ended without reaching the goal

use thiserror::Error;

use crate::engine::Sample;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },
    #[error("sampling step dt2 ({dt2}) must not be smaller than the integration step dt ({dt})")]
    SamplingStep { dt: f64, dt2: f64 },
    #[error("thresholds must satisfy D_MIN < D_MID < D_MAX, got {d_min} / {d_mid} / {d_max}")]
    Thresholds { d_min: f64, d_mid: f64, d_max: f64 },
    #[error("blend weights must be non-empty, non-negative and sum to 1, got {0:?}")]
    Weights(Vec<f64>),
    #[error("particle {id} at ({x}, {y}) lies outside the {width}x{height} arena")]
    OutsideArena { id: usize, x: f64, y: f64, width: f64, height: f64 },
    #[error("no particle with id 0 to act as the agent")]
    MissingAgent,
    #[error("particle id {0} is used more than once")]
    DuplicateId(usize),
    #[error("could not place {requested} obstacles, only {placed} fit")]
    Crowded { requested: usize, placed: usize },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: invalid number {token:?}")]
    Number { line: usize, token: String },
    #[error("{file} file is missing {what}")]
    Missing { file: &'static str, what: &'static str },
    #[error("static file describes {expected} particles but dynamic file has {found}")]
    ParticleCount { expected: usize, found: usize },
    #[error("line {line}: expected 4 values per particle, got {found}")]
    Record { line: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum SimulationError {
    /// The agent did not reach the goal in time. The trajectory up to that
    /// point is kept for inspection.
    #[error("goal not reached within the time limit ({elapsed:.2} time units elapsed)")]
    TimeLimitExceeded { elapsed: f64, samples: Vec<Sample> },
}

impl SimulationError {
    pub fn samples(&self) -> &[Sample] {
        match self {
            SimulationError::TimeLimitExceeded { samples, .. } => samples,
        }
    }
}
