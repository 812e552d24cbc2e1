//! Random scenario generation.
//!
//! The agent starts at rest on the left wall, vertically centred. Obstacles are
//! scattered uniformly inside the border limit and walk straight up or down at
//! a fixed speed, which makes them bounce between the top and bottom walls
//! across the agent's path. Generation is deterministic for a given seed.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::config::{
    AgentConfig, ArenaConfig, GoalPlacement, ObstacleConfig, ScenarioConfig, StepConfig,
};
use crate::engine::TIME_LIMIT;
use crate::error::ConfigError;
use crate::forces::AvoidanceTuning;
use crate::vector::Vector2D;

/// Placement attempts per obstacle before the arena is declared full
const MAX_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub width: f64,
    pub height: f64,
    pub safe_wall_distance: f64,
    /// Obstacles are kept at least this far from every wall
    pub border_limit: f64,
    pub obstacle_count: usize,
    pub obstacle_radius: f64,
    pub obstacle_speed: f64,
    pub mass: f64,
    pub agent_radius: f64,
    pub comfort_radius: f64,
    pub max_speed: f64,
    pub preferred_speed: f64,
    pub relaxation_time: f64,
    pub anticipation_time: f64,
    pub dt: f64,
    pub dt2: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            width: 20.0,
            height: 10.0,
            safe_wall_distance: 0.5,
            border_limit: 2.0,
            obstacle_count: 10,
            obstacle_radius: 0.25,
            obstacle_speed: 1.0,
            mass: 70.0,
            agent_radius: 0.25,
            comfort_radius: 0.5,
            max_speed: 2.0,
            preferred_speed: 1.3,
            relaxation_time: 0.5,
            anticipation_time: 2.0,
            dt: 0.01,
            dt2: 0.1,
            seed: 42,
        }
    }
}

struct Placed {
    position: Vector2D,
    radius: f64,
}

/// Clearance left between a new obstacle and everything placed so far,
/// reserving one agent diameter so the agent can always squeeze through.
fn overlaps(placed: &[Placed], position: Vector2D, radius: f64, agent_diameter: f64) -> bool {
    placed
        .iter()
        .any(|p| p.position.distance(&position) - p.radius - radius - agent_diameter <= 0.0)
}

pub fn generate(cfg: &GeneratorConfig) -> Result<ScenarioConfig, ConfigError> {
    let usable_width = cfg.width - 2.0 * cfg.border_limit;
    let usable_height = cfg.height - 2.0 * cfg.border_limit;
    if !(usable_width > 0.0) {
        return Err(ConfigError::NonPositive {
            name: "width inside the border limit",
            value: usable_width,
        });
    }
    if !(usable_height > 0.0) {
        return Err(ConfigError::NonPositive {
            name: "height inside the border limit",
            value: usable_height,
        });
    }

    let mut rng = Pcg32::seed_from_u64(cfg.seed);
    let agent_position = Vector2D::new(cfg.comfort_radius, cfg.height / 2.0);
    let mut placed = vec![Placed {
        position: agent_position,
        radius: cfg.agent_radius,
    }];
    let mut obstacles = Vec::with_capacity(cfg.obstacle_count);

    let x_range = cfg.border_limit..cfg.width - cfg.border_limit;
    let y_range = cfg.border_limit..cfg.height - cfg.border_limit;
    let mut attempts = 0;
    while obstacles.len() < cfg.obstacle_count {
        if attempts >= MAX_ATTEMPTS * cfg.obstacle_count {
            return Err(ConfigError::Crowded {
                requested: cfg.obstacle_count,
                placed: obstacles.len(),
            });
        }
        attempts += 1;

        let position = Vector2D::new(
            rng.random_range(x_range.clone()),
            rng.random_range(y_range.clone()),
        );
        if overlaps(&placed, position, cfg.obstacle_radius, 2.0 * cfg.agent_radius) {
            continue;
        }
        let vy = if rng.random_bool(0.5) { -cfg.obstacle_speed } else { cfg.obstacle_speed };
        placed.push(Placed {
            position,
            radius: cfg.obstacle_radius,
        });
        obstacles.push(ObstacleConfig {
            radius: cfg.obstacle_radius,
            mass: cfg.mass,
            position,
            velocity: Vector2D::new(0.0, vy),
        });
    }
    log::debug!("placed {} obstacles in {} attempts", obstacles.len(), attempts);

    Ok(ScenarioConfig {
        simulation: StepConfig {
            dt: cfg.dt,
            dt2: cfg.dt2,
            time_limit: TIME_LIMIT,
        },
        arena: ArenaConfig {
            width: cfg.width,
            height: cfg.height,
            safe_wall_distance: cfg.safe_wall_distance,
            goal: GoalPlacement::Centered,
        },
        agent: AgentConfig {
            radius: cfg.agent_radius,
            mass: cfg.mass,
            comfort_radius: cfg.comfort_radius,
            max_speed: cfg.max_speed,
            preferred_speed: cfg.preferred_speed,
            relaxation_time: cfg.relaxation_time,
            anticipation_time: cfg.anticipation_time,
            position: agent_position,
            velocity: Vector2D::ZERO,
        },
        obstacles,
        tuning: AvoidanceTuning::default(),
    })
}
