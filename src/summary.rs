//! Post-run statistics of the agent's trajectory.

use crate::engine::{ParticleState, Sample};
use crate::vector::Vector2D;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySummary {
    /// Time of the last sample
    pub elapsed: f64,
    /// Length of the agent's sampled path
    pub distance_travelled: f64,
    /// Agent speed averaged over samples
    pub mean_speed: f64,
    /// Smallest center distance between the agent and any obstacle
    pub closest_approach: Option<f64>,
}

fn position(p: &ParticleState) -> Vector2D {
    Vector2D::new(p.x, p.y)
}

pub fn path_length(path: &[Vector2D]) -> f64 {
    path.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Summarizes the agent (first particle of every sample). `None` for an
/// empty trajectory.
pub fn summarize(samples: &[Sample]) -> Option<TrajectorySummary> {
    let last = samples.last()?;
    let agent: Vec<&ParticleState> = samples.iter().filter_map(|s| s.particles.first()).collect();
    if agent.is_empty() {
        return None;
    }

    let path: Vec<Vector2D> = agent.iter().map(|p| position(p)).collect();
    let total_speed: f64 = agent.iter().map(|p| Vector2D::new(p.vx, p.vy).magnitude()).sum();
    let mean_speed = total_speed / agent.len() as f64;

    let closest_approach = samples
        .iter()
        .filter_map(|s| {
            let (first, others) = s.particles.split_first()?;
            let me = position(first);
            others.iter().map(|o| me.distance(&position(o))).reduce(f64::min)
        })
        .reduce(f64::min);

    Some(TrajectorySummary {
        elapsed: last.time,
        distance_travelled: path_length(&path),
        mean_speed,
        closest_approach,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn state(x: f64, y: f64, vx: f64, vy: f64) -> ParticleState {
        ParticleState { x, y, vx, vy }
    }

    #[test]
    fn test_path_length_empty_and_single() {
        assert_eq!(path_length(&[]), 0.0);
        assert_eq!(path_length(&[Vector2D::new(1.0, 1.0)]), 0.0);
    }

    #[test]
    fn test_path_length_multi_segment() {
        let path = [Vector2D::new(0.0, 0.0), Vector2D::new(3.0, 0.0), Vector2D::new(3.0, 4.0)];
        assert_eq!(path_length(&path), 7.0); // 3 + 4
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_summarize_agent_only() {
        let samples = vec![
            Sample { time: 0.0, particles: vec![state(0.0, 0.0, 0.0, 0.0)] },
            Sample { time: 1.0, particles: vec![state(3.0, 0.0, 3.0, 4.0)] },
            Sample { time: 2.0, particles: vec![state(3.0, 4.0, 0.0, 1.0)] },
        ];
        let summary = summarize(&samples).unwrap();
        assert_eq!(summary.elapsed, 2.0);
        assert_relative_eq!(summary.distance_travelled, 7.0, epsilon = 1e-12);
        assert_relative_eq!(summary.mean_speed, 2.0, epsilon = 1e-12); // (0 + 5 + 1) / 3
        assert!(summary.closest_approach.is_none());
    }

    #[test]
    fn test_summarize_closest_approach() {
        let samples = vec![
            Sample {
                time: 0.0,
                particles: vec![
                    state(0.0, 0.0, 1.0, 0.0),
                    state(5.0, 0.0, 0.0, 0.0),
                    state(0.0, 9.0, 0.0, 0.0),
                ],
            },
            Sample {
                time: 1.0,
                particles: vec![
                    state(2.0, 0.0, 1.0, 0.0),
                    state(5.0, 0.0, 0.0, 0.0),
                    state(0.0, 9.0, 0.0, 0.0),
                ],
            },
        ];
        let summary = summarize(&samples).unwrap();
        assert_relative_eq!(summary.closest_approach.unwrap(), 3.0, epsilon = 1e-12);
    }
}
