//! Scenario configuration.
//!
//! A scenario file describes the time stepping, the arena, the agent and the
//! obstacles. Everything is validated up front; a [`Simulation`] is only ever
//! built from a configuration that passed [`ScenarioConfig::validate`].
//!
//! # YAML format
//!
//! ```yaml
//! simulation:
//!   dt: 0.01                # integration step
//!   dt2: 0.1                # sampling step
//!   time_limit: 150.0       # optional, give up after this long
//!
//! arena:
//!   width: 20.0
//!   height: 10.0
//!   safe_wall_distance: 0.5
//!   goal: centered          # or "corner"
//!
//! agent:
//!   radius: 0.25
//!   mass: 70.0
//!   comfort_radius: 0.5
//!   max_speed: 2.0
//!   preferred_speed: 1.3
//!   relaxation_time: 0.5
//!   anticipation_time: 2.0
//!   position: [0.5, 5.0]
//!   velocity: [0.0, 0.0]
//!
//! obstacles:
//!   - radius: 0.25
//!     mass: 70.0
//!     position: [8.0, 4.0]
//!     velocity: [0.0, 1.0]
//!
//! tuning:                   # optional, every field has a default
//!   d_mid: 1.5
//!   amplitude: 4.0
//!   blowup_rate: 2.0
//!   wall_steepness: 2
//!   weights: [0.8, 0.15, 0.05]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::engine::{Simulation, SimulationParams, TIME_LIMIT};
use crate::error::ConfigError;
use crate::forces::{Arena, AvoidanceTuning};
use crate::particle::{Particle, MAIN_PARTICLE_ID};
use crate::vector::Vector2D;

/// Tolerance on the sum of the blend weights
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

fn default_time_limit() -> f64 {
    TIME_LIMIT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    pub dt: f64,
    pub dt2: f64,
    #[serde(default = "default_time_limit")]
    pub time_limit: f64,
}

/// Where the goal sits relative to the far (right) wall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPlacement {
    /// `(width - comfort_radius, height / 2)`
    #[default]
    Centered,
    /// `(width - comfort_radius, height - comfort_radius)`
    Corner,
}

impl GoalPlacement {
    pub fn resolve(&self, width: f64, height: f64, comfort_radius: f64) -> Vector2D {
        match self {
            GoalPlacement::Centered => Vector2D::new(width - comfort_radius, height / 2.0),
            GoalPlacement::Corner => Vector2D::new(width - comfort_radius, height - comfort_radius),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub width: f64,
    pub height: f64,
    pub safe_wall_distance: f64,
    #[serde(default)]
    pub goal: GoalPlacement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub radius: f64,
    pub mass: f64,
    pub comfort_radius: f64,
    pub max_speed: f64,
    pub preferred_speed: f64,
    pub relaxation_time: f64,
    pub anticipation_time: f64,
    pub position: Vector2D,
    #[serde(default)]
    pub velocity: Vector2D,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleConfig {
    pub radius: f64,
    pub mass: f64,
    pub position: Vector2D,
    #[serde(default)]
    pub velocity: Vector2D,
}

/// Top-level scenario loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub simulation: StepConfig,
    pub arena: ArenaConfig,
    pub agent: AgentConfig,
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    #[serde(default)]
    pub tuning: AvoidanceTuning,
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    // also rejects NaN
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

impl ScenarioConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;
        let config: ScenarioConfig = serde_yaml::from_reader(std::io::BufReader::new(file))?;
        log::debug!("loaded scenario {} with {} obstacles", path.display(), config.obstacles.len());
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn goal(&self) -> Vector2D {
        self.arena
            .goal
            .resolve(self.arena.width, self.arena.height, self.agent.comfort_radius)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let step = &self.simulation;
        positive("dt", step.dt)?;
        positive("dt2", step.dt2)?;
        positive("time_limit", step.time_limit)?;
        if step.dt2 < step.dt {
            return Err(ConfigError::SamplingStep { dt: step.dt, dt2: step.dt2 });
        }

        let arena = &self.arena;
        positive("arena width", arena.width)?;
        positive("arena height", arena.height)?;
        non_negative("safe_wall_distance", arena.safe_wall_distance)?;

        let agent = &self.agent;
        positive("agent radius", agent.radius)?;
        positive("agent mass", agent.mass)?;
        non_negative("comfort_radius", agent.comfort_radius)?;
        positive("max_speed", agent.max_speed)?;
        positive("preferred_speed", agent.preferred_speed)?;
        positive("relaxation_time", agent.relaxation_time)?;
        positive("anticipation_time", agent.anticipation_time)?;
        self.check_inside(MAIN_PARTICLE_ID, agent.position)?;

        for (id, obstacle) in self.obstacle_ids() {
            positive("obstacle radius", obstacle.radius)?;
            positive("obstacle mass", obstacle.mass)?;
            self.check_inside(id, obstacle.position)?;
        }

        let tuning = &self.tuning;
        let d_min = agent.comfort_radius;
        let d_max = agent.max_speed * agent.anticipation_time;
        if !(d_min < tuning.d_mid && tuning.d_mid < d_max) {
            return Err(ConfigError::Thresholds { d_min, d_mid: tuning.d_mid, d_max });
        }
        positive("amplitude", tuning.amplitude)?;
        non_negative("blowup_rate", tuning.blowup_rate)?;
        positive("wall_steepness", tuning.wall_steepness as f64)?;

        let weight_sum: f64 = tuning.weights.iter().sum();
        if tuning.weights.is_empty()
            || tuning.weights.iter().any(|w| !(*w >= 0.0))
            || (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE
        {
            return Err(ConfigError::Weights(tuning.weights.clone()));
        }

        Ok(())
    }

    /// Validates and builds a ready-to-run simulation.
    pub fn build(&self) -> Result<Simulation, ConfigError> {
        self.validate()?;

        let agent = &self.agent;
        let mut particles = Vec::with_capacity(self.obstacles.len() + 1);
        particles.push(
            Particle::new(MAIN_PARTICLE_ID, agent.radius, agent.mass, agent.comfort_radius)
                .with_navigation(
                    agent.max_speed,
                    agent.preferred_speed,
                    agent.relaxation_time,
                    agent.anticipation_time,
                )
                .with_state(agent.position, agent.velocity),
        );
        for (id, obstacle) in self.obstacle_ids() {
            particles.push(
                Particle::new(id, obstacle.radius, obstacle.mass, agent.comfort_radius)
                    .with_state(obstacle.position, obstacle.velocity),
            );
        }

        let params = SimulationParams {
            dt: self.simulation.dt,
            dt2: self.simulation.dt2,
            time_limit: self.simulation.time_limit,
            arena: Arena::new(self.arena.width, self.arena.height, self.arena.safe_wall_distance),
            tuning: self.tuning.clone(),
        };
        Simulation::new(params, self.goal(), particles)
    }

    /// Body radii in id order, agent first
    pub fn radii(&self) -> Vec<f64> {
        std::iter::once(self.agent.radius)
            .chain(self.obstacles.iter().map(|o| o.radius))
            .collect()
    }

    /// Obstacles with their ids, numbered from 1 in file order
    fn obstacle_ids(&self) -> impl Iterator<Item = (usize, &ObstacleConfig)> {
        self.obstacles.iter().enumerate().map(|(i, o)| (i + 1, o))
    }

    fn check_inside(&self, id: usize, position: Vector2D) -> Result<(), ConfigError> {
        let inside = (0.0..=self.arena.width).contains(&position.x)
            && (0.0..=self.arena.height).contains(&position.y);
        if inside {
            Ok(())
        } else {
            Err(ConfigError::OutsideArena {
                id,
                x: position.x,
                y: position.y,
                width: self.arena.width,
                height: self.arena.height,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunState;

    const SCENARIO: &str = r#"
simulation:
  dt: 0.01
  dt2: 0.1

arena:
  width: 20.0
  height: 10.0
  safe_wall_distance: 0.5

agent:
  radius: 0.25
  mass: 70.0
  comfort_radius: 0.5
  max_speed: 2.0
  preferred_speed: 1.3
  relaxation_time: 0.5
  anticipation_time: 2.0
  position: [0.5, 5.0]

obstacles:
  - radius: 0.25
    mass: 70.0
    position: [8.0, 4.0]
    velocity: [0.0, 1.0]
  - radius: 0.3
    mass: 80.0
    position: [12.0, 6.0]
"#;

    fn scenario() -> ScenarioConfig {
        ScenarioConfig::from_yaml_str(SCENARIO).unwrap()
    }

    #[test]
    fn test_parse_with_defaults() {
        let cfg = scenario();
        assert_eq!(cfg.simulation.time_limit, TIME_LIMIT);
        assert_eq!(cfg.arena.goal, GoalPlacement::Centered);
        assert_eq!(cfg.agent.velocity, Vector2D::ZERO);
        assert_eq!(cfg.obstacles.len(), 2);
        assert_eq!(cfg.obstacles[1].velocity, Vector2D::ZERO);
        assert_eq!(cfg.tuning, AvoidanceTuning::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_tuning_keeps_other_defaults() {
        let yaml = format!("{}\ntuning:\n  amplitude: 6.0\n", SCENARIO);
        let cfg = ScenarioConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(cfg.tuning.amplitude, 6.0);
        assert_eq!(cfg.tuning.weights, vec![0.8, 0.15, 0.05]);
    }

    #[test]
    fn test_goal_placement() {
        let mut cfg = scenario();
        assert_eq!(cfg.goal(), Vector2D::new(19.5, 5.0));
        cfg.arena.goal = GoalPlacement::Corner;
        assert_eq!(cfg.goal(), Vector2D::new(19.5, 9.5));
    }

    #[test]
    fn test_goal_placement_from_yaml() {
        let yaml = SCENARIO.replace(
            "safe_wall_distance: 0.5",
            "safe_wall_distance: 0.5\n  goal: corner",
        );
        let cfg = ScenarioConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(cfg.arena.goal, GoalPlacement::Corner);
    }

    #[test]
    fn test_build_assigns_ids_in_order() {
        let sim = scenario().build().unwrap();
        let ids: Vec<usize> = sim.particles().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(sim.particle(2).unwrap().radius, 0.3);
        assert_eq!(sim.agent().anticipation_time, 2.0);
        assert_eq!(sim.goal(), Vector2D::new(19.5, 5.0));
        assert_eq!(sim.state(), RunState::Running);
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        let mut cfg = scenario();
        cfg.simulation.dt = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::NonPositive { name: "dt", value: 0.0 }));
        assert!(cfg.build().is_err());
    }

    #[test]
    fn test_rejects_sampling_step_below_dt() {
        let mut cfg = scenario();
        cfg.simulation.dt2 = 0.001;
        assert!(matches!(cfg.validate(), Err(ConfigError::SamplingStep { .. })));
    }

    #[test]
    fn test_rejects_negative_wall_distance() {
        let mut cfg = scenario();
        cfg.arena.safe_wall_distance = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Negative { .. })));
    }

    #[test]
    fn test_rejects_inconsistent_thresholds() {
        let mut cfg = scenario();
        cfg.tuning.d_mid = 5.0; // above max_speed * anticipation_time = 4
        assert!(matches!(cfg.validate(), Err(ConfigError::Thresholds { .. })));
    }

    #[test]
    fn test_rejects_bad_weights() {
        let mut cfg = scenario();
        cfg.tuning.weights = vec![0.5, 0.2];
        assert!(matches!(cfg.validate(), Err(ConfigError::Weights(_))));
        cfg.tuning.weights = vec![];
        assert!(matches!(cfg.validate(), Err(ConfigError::Weights(_))));
        cfg.tuning.weights = vec![1.2, -0.2];
        assert!(matches!(cfg.validate(), Err(ConfigError::Weights(_))));
    }

    #[test]
    fn test_rejects_obstacle_outside() {
        let mut cfg = scenario();
        cfg.obstacles[1].position = Vector2D::new(25.0, 5.0);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::OutsideArena { id: 2, x: 25.0, y: 5.0, width: 20.0, height: 10.0 })
        );
    }

    #[test]
    fn test_yaml_round_trip_preserves_scenario() {
        let cfg = scenario();
        let again = ScenarioConfig::from_yaml_str(&cfg.to_yaml_string().unwrap()).unwrap();
        assert_eq!(cfg, again);
    }
}
