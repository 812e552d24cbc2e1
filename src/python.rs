//! Python bindings.
//!
//! Trajectories cross the boundary as plain lists of
//! `(time, [(x, y, vx, vy), ...])` tuples.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::ScenarioConfig;
use crate::engine::{ParticleState, Sample};
use crate::summary::summarize;

type PySample = (f64, Vec<(f64, f64, f64, f64)>);

fn to_py(samples: Vec<Sample>) -> Vec<PySample> {
    samples
        .into_iter()
        .map(|s| (s.time, s.particles.iter().map(|p| (p.x, p.y, p.vx, p.vy)).collect()))
        .collect()
}

fn from_py(samples: Vec<PySample>) -> Vec<Sample> {
    samples
        .into_iter()
        .map(|(time, particles)| Sample {
            time,
            particles: particles
                .into_iter()
                .map(|(x, y, vx, vy)| ParticleState { x, y, vx, vy })
                .collect(),
        })
        .collect()
}

/// Runs the YAML scenario in `yaml` to completion.
#[pyfunction]
fn simulate_scenario(yaml: &str) -> PyResult<Vec<PySample>> {
    let scenario =
        ScenarioConfig::from_yaml_str(yaml).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let simulation = scenario.build().map_err(|e| PyValueError::new_err(e.to_string()))?;
    let samples = simulation.simulate().map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    Ok(to_py(samples))
}

/// `(elapsed, distance_travelled, mean_speed, closest_approach)` of a trajectory.
#[pyfunction]
fn summarize_trajectory(samples: Vec<PySample>) -> PyResult<Option<(f64, f64, f64, Option<f64>)>> {
    Ok(summarize(&from_py(samples))
        .map(|s| (s.elapsed, s.distance_travelled, s.mean_speed, s.closest_approach)))
}

#[pymodule]
fn predictive_avoidance(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(simulate_scenario, m)?)?;
    m.add_function(wrap_pyfunction!(summarize_trajectory, m)?)?;
    Ok(())
}
