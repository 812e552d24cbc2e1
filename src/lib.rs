//! # Predictive Avoidance
//!
//! Simulation of a single agent crossing a rectangular arena toward a fixed
//! goal while anticipating collisions with moving obstacles.
//!
//! ## Model
//!
//! - **Goal force**: relaxation toward the preferred velocity pointing at the goal
//! - **Wall force**: steep repulsion once the agent is closer than the safe wall distance
//! - **Predictive avoidance**: the obstacles the agent would hit soonest along its
//!   desired velocity each contribute a maneuver force, blended by rank
//!
//! Motion is integrated with explicit Euler steps until the goal is reached or
//! a time limit is hit.
//!
//! ## Usage
//!
//! ```no_run
//! use predictive_avoidance::ScenarioConfig;
//! use std::path::Path;
//!
//! let scenario = ScenarioConfig::from_yaml_file(Path::new("scenario.yaml"))?;
//! let samples = scenario.build()?.simulate()?;
//! println!("{} samples", samples.len());
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Python bindings are available behind the `python` feature.

pub mod config;
pub mod engine;
pub mod error;
pub mod files;
pub mod forces;
pub mod generator;
pub mod particle;
pub mod predictor;
pub mod summary;
pub mod vector;

#[cfg(feature = "python")]
mod python;

pub use config::{GoalPlacement, ScenarioConfig};
pub use engine::{ParticleState, RunState, Sample, Simulation, SimulationParams};
pub use error::{ConfigError, ParseError, SimulationError};
pub use forces::{Arena, AvoidanceLaw, AvoidanceTuning};
pub use particle::Particle;
pub use predictor::CollisionCandidate;
pub use summary::{summarize, TrajectorySummary};
pub use vector::Vector2D;
