//! # Force Laws
//!
//! The agent is driven by three kinds of forces:
//!
//! - **Goal force**: relaxation toward the preferred velocity (see [`Particle::goal_force`])
//! - **Wall force**: repulsion from each of the four arena walls once the agent
//!   is closer than the safe wall distance
//! - **Avoidance force**: repulsion from an obstacle the agent is predicted to
//!   collide with, scaled by the piecewise [`AvoidanceLaw`]
//!
//! ## Avoidance profile
//!
//! ```text
//!  f(D)
//!   |\
//!   | \  A exp(k (D_MIN - D))
//!   |  \______________
//! A |                 |\
//!   |                 | \   linear decay
//!   |                 |  \
//! 0 +-----------------+---+----------- D
//!        D_MIN      D_MID  D_MAX
//! ```
//!
//! `D` combines how far the agent travels before the predicted collision with
//! the clearance left at that moment, so close and committed encounters push
//! hardest.

use serde::{Deserialize, Serialize};

use crate::particle::Particle;
use crate::vector::Vector2D;

pub const WALLS: usize = 4;

/// Inward normals, ordered top, bottom, left, right
const WALL_NORMALS: [Vector2D; WALLS] = [
    Vector2D { x: 0.0, y: -1.0 },
    Vector2D { x: 0.0, y: 1.0 },
    Vector2D { x: 1.0, y: 0.0 },
    Vector2D { x: -1.0, y: 0.0 },
];

/// Smallest clearance used in the wall force denominator
const MIN_WALL_CLEARANCE: f64 = 1e-6;

/// Below this |sin| between heading and avoidance direction the encounter is head-on
const HEAD_ON_TOLERANCE: f64 = 1e-3;
/// Lateral bias added to a head-on avoidance direction
const PERTURBATION: f64 = 0.1;

pub const DEFAULT_D_MID: f64 = 1.5;
pub const DEFAULT_AMPLITUDE: f64 = 4.0;
pub const DEFAULT_BLOWUP_RATE: f64 = 2.0;
pub const DEFAULT_WALL_STEEPNESS: i32 = 2;
pub const BASE_WEIGHTS: [f64; 3] = [0.8, 0.15, 0.05];

/// Hand-tuned constants of the force model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceTuning {
    /// End of the constant plateau of the avoidance profile
    pub d_mid: f64,
    /// Plateau height of the avoidance profile
    pub amplitude: f64,
    /// Exponential rate below `D_MIN`
    pub blowup_rate: f64,
    /// Power applied to the wall clearance
    pub wall_steepness: i32,
    /// Blend weights by collision rank; its length bounds the number of obstacles considered
    pub weights: Vec<f64>,
}

impl Default for AvoidanceTuning {
    fn default() -> Self {
        AvoidanceTuning {
            d_mid: DEFAULT_D_MID,
            amplitude: DEFAULT_AMPLITUDE,
            blowup_rate: DEFAULT_BLOWUP_RATE,
            wall_steepness: DEFAULT_WALL_STEEPNESS,
            weights: BASE_WEIGHTS.to_vec(),
        }
    }
}

impl AvoidanceTuning {
    pub fn obstacle_limit(&self) -> usize {
        self.weights.len()
    }
}

/// Rectangular arena with its lower-left corner at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
    pub safe_wall_distance: f64,
}

impl Arena {
    pub fn new(width: f64, height: f64, safe_wall_distance: f64) -> Self {
        Arena {
            width,
            height,
            safe_wall_distance,
        }
    }

    /// Distance from `position` to each wall, in [`WALL_NORMALS`] order
    fn wall_distances(&self, position: Vector2D) -> [f64; WALLS] {
        [
            self.height - position.y,
            position.y,
            position.x,
            self.width - position.x,
        ]
    }

    /// Sum of the repulsion of all four walls on `particle`.
    ///
    /// A wall only pushes once the surface clearance `dw - radius` drops below
    /// the safe wall distance; the push then grows without bound as the
    /// clearance goes to zero.
    pub fn wall_force(&self, particle: &Particle, steepness: i32) -> Vector2D {
        let mut total = Vector2D::ZERO;
        for (dw, normal) in self.wall_distances(particle.position).iter().zip(WALL_NORMALS.iter()) {
            total += *normal * self.wall_force_magnitude(particle.radius, *dw, steepness);
        }
        total
    }

    pub fn wall_force_magnitude(&self, radius: f64, dw: f64, steepness: i32) -> f64 {
        let clearance = dw - radius;
        if clearance >= self.safe_wall_distance {
            return 0.0;
        }
        (self.safe_wall_distance + radius - dw) / clearance.max(MIN_WALL_CLEARANCE).powi(steepness)
    }
}

/// Piecewise magnitude of the avoidance force as a function of the closing gap `D`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvoidanceLaw {
    pub d_min: f64,
    pub d_mid: f64,
    pub d_max: f64,
    pub amplitude: f64,
    pub blowup_rate: f64,
}

impl AvoidanceLaw {
    /// Thresholds derived from the agent: `D_MIN` is its comfort radius and
    /// `D_MAX` the distance it can cover within its anticipation time.
    pub fn for_agent(agent: &Particle, tuning: &AvoidanceTuning) -> Self {
        AvoidanceLaw {
            d_min: agent.comfort_radius,
            d_mid: tuning.d_mid,
            d_max: agent.max_speed * agent.anticipation_time,
            amplitude: tuning.amplitude,
            blowup_rate: tuning.blowup_rate,
        }
    }

    pub fn magnitude(&self, d: f64) -> f64 {
        if d < self.d_min {
            self.amplitude * (self.blowup_rate * (self.d_min - d)).exp()
        } else if d < self.d_mid {
            self.amplitude
        } else if d < self.d_max {
            self.amplitude * (self.d_max - d) / (self.d_max - self.d_mid)
        } else {
            0.0
        }
    }
}

/// Force steering `agent` away from `obstacle`, whose collision was predicted at `time`.
///
/// Both particles are advanced along straight lines to `time`: the agent with
/// `desired_velocity`, the obstacle with its own velocity. The force points
/// from the obstacle's predicted position to the agent's.
pub fn maneuver_force(
    agent: &Particle,
    desired_velocity: Vector2D,
    obstacle: &Particle,
    time: f64,
    law: &AvoidanceLaw,
) -> Vector2D {
    let predicted_agent = agent.position + desired_velocity * time;
    let predicted_obstacle = obstacle.position + obstacle.velocity * time;

    let separation = predicted_agent - predicted_obstacle;
    let d = (predicted_agent - agent.position).magnitude() + separation.magnitude()
        - agent.radius
        - obstacle.radius;

    let direction = break_head_on_symmetry(separation.normalize(), desired_velocity.normalize());
    direction * law.magnitude(d)
}

/// A direction straight against the heading would only brake the agent;
/// bias it toward the agent's right so the maneuver has a lateral part.
fn break_head_on_symmetry(direction: Vector2D, heading: Vector2D) -> Vector2D {
    let head_on = heading.magnitude_squared() > 0.0
        && direction.dot(&heading) < 0.0
        && direction.cross(&heading).abs() < HEAD_ON_TOLERANCE;
    if head_on {
        let right = -heading.perpendicular();
        (direction + right * PERTURBATION).normalize()
    } else {
        direction
    }
}
