//! # Simulation Engine
//!
//! Fixed-step driver for one agent crossing an arena full of passive obstacles.
//!
//! ## Step pipeline
//!
//! 1. Store a sample if a new `dt2` boundary was crossed
//! 2. Wall force and goal force on the agent
//! 3. Desired velocity, then rank up to `weights.len()` predicted collisions
//! 4. One maneuver force per candidate, blended by rank weight
//! 5. Explicit Euler update of the agent, speed capped at `max_speed`
//! 6. Obstacles drift in straight lines and bounce off the top and bottom walls
//! 7. Goal check, clock advance
//!
//! A run ends in [`RunState::GoalReached`] or [`RunState::TimeLimitExceeded`];
//! only the former is a successful [`Simulation::simulate`].

use crate::error::{ConfigError, SimulationError};
use crate::forces::{maneuver_force, Arena, AvoidanceLaw, AvoidanceTuning};
use crate::particle::{Particle, MAIN_PARTICLE_ID};
use crate::predictor::{blend, desired_velocity, rank_collisions};
use crate::vector::Vector2D;

/// Default cutoff after which the avoidance policy is considered to have failed
pub const TIME_LIMIT: f64 = 150.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    /// Integration step
    pub dt: f64,
    /// Sampling step
    pub dt2: f64,
    pub time_limit: f64,
    pub arena: Arena,
    pub tuning: AvoidanceTuning,
}

/// Kinematic snapshot of one particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl From<&Particle> for ParticleState {
    fn from(p: &Particle) -> Self {
        ParticleState {
            x: p.position.x,
            y: p.position.y,
            vx: p.velocity.x,
            vy: p.velocity.y,
        }
    }
}

/// All particles at one sampled instant, in ascending id order
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub particles: Vec<ParticleState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    GoalReached,
    TimeLimitExceeded,
}

pub struct Simulation {
    params: SimulationParams,
    goal: Vector2D,
    law: AvoidanceLaw,
    /// Sorted by id; index 0 is the agent
    particles: Vec<Particle>,
    total_time: f64,
    reached_goal: bool,
    last_sample_index: Option<u64>,
    samples: Vec<Sample>,
}

impl Simulation {
    pub fn new(
        params: SimulationParams,
        goal: Vector2D,
        mut particles: Vec<Particle>,
    ) -> Result<Self, ConfigError> {
        particles.sort_by_key(|p| p.id);
        if let Some(pair) = particles.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(ConfigError::DuplicateId(pair[0].id));
        }
        match particles.first() {
            Some(agent) if agent.id == MAIN_PARTICLE_ID => {}
            _ => return Err(ConfigError::MissingAgent),
        }

        let law = AvoidanceLaw::for_agent(&particles[0], &params.tuning);
        let mut simulation = Simulation {
            params,
            goal,
            law,
            particles,
            total_time: 0.0,
            reached_goal: false,
            last_sample_index: None,
            samples: Vec::new(),
        };
        simulation.check_goal();
        Ok(simulation)
    }

    pub fn agent(&self) -> &Particle {
        &self.particles[0]
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle(&self, id: usize) -> Option<&Particle> {
        self.particles
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|index| &self.particles[index])
    }

    pub fn goal(&self) -> Vector2D {
        self.goal
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    pub fn reached_goal(&self) -> bool {
        self.reached_goal
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn state(&self) -> RunState {
        if self.reached_goal {
            RunState::GoalReached
        } else if self.total_time >= self.params.time_limit {
            RunState::TimeLimitExceeded
        } else {
            RunState::Running
        }
    }

    /// Runs to completion.
    ///
    /// Returns the sampled trajectory when the goal is reached. Hitting the
    /// time limit is an error that still carries the trajectory so far.
    pub fn simulate(mut self) -> Result<Vec<Sample>, SimulationError> {
        log::info!(
            "simulating {} particles, dt={} dt2={}, goal at ({:.2}, {:.2})",
            self.particles.len(),
            self.params.dt,
            self.params.dt2,
            self.goal.x,
            self.goal.y
        );

        while self.state() == RunState::Running {
            self.step();
        }

        match self.state() {
            RunState::GoalReached => {
                log::info!(
                    "goal reached at t={:.3} ({} samples)",
                    self.total_time,
                    self.samples.len()
                );
                Ok(self.samples)
            }
            _ => {
                let distance = self.agent().position.distance(&self.goal);
                log::warn!(
                    "time limit of {} exceeded, agent still {:.3} from the goal",
                    self.params.time_limit,
                    distance
                );
                Err(SimulationError::TimeLimitExceeded {
                    elapsed: self.total_time,
                    samples: self.samples,
                })
            }
        }
    }

    /// Advances the simulation by one integration step.
    pub fn step(&mut self) {
        let dt = self.params.dt;
        self.store_sample_if_due();

        let avoidance = self.avoidance_force();
        let agent = &mut self.particles[0];
        agent.update_velocity(avoidance, dt);
        agent.clamp_speed();
        agent.update_position(dt);

        self.update_obstacles();
        self.check_goal();
        self.total_time += dt;
    }

    /// Wall, goal and blended avoidance forces acting on the agent.
    fn avoidance_force(&self) -> Vector2D {
        let agent = self.agent();
        let tuning = &self.params.tuning;

        let wall_force = self.params.arena.wall_force(agent, tuning.wall_steepness);
        let goal_force = agent.goal_force(self.goal);
        let desired = desired_velocity(agent, wall_force, goal_force, self.params.dt);

        let limit = tuning.obstacle_limit();
        let candidates = rank_collisions(agent, desired, &self.particles[1..], limit);
        let maneuvers: Vec<Vector2D> = candidates
            .iter()
            .filter_map(|candidate| {
                self.particle(candidate.id).map(|obstacle| {
                    maneuver_force(agent, desired, obstacle, candidate.time, &self.law)
                })
            })
            .collect();

        blend(&maneuvers, &tuning.weights) + wall_force + goal_force
    }

    fn update_obstacles(&mut self) {
        let dt = self.params.dt;
        let height = self.params.arena.height;
        for obstacle in self.particles.iter_mut().skip(1) {
            obstacle.update_position(dt);

            let y = obstacle.position.y;
            let into_bottom = y < obstacle.radius && obstacle.velocity.y < 0.0;
            let into_top = y > height - obstacle.radius && obstacle.velocity.y > 0.0;
            if into_bottom || into_top {
                obstacle.velocity = -obstacle.velocity;
            }
        }
    }

    fn check_goal(&mut self) {
        let agent = self.agent();
        if agent.position.distance(&self.goal) <= agent.radius {
            self.reached_goal = true;
        }
    }

    fn store_sample_if_due(&mut self) {
        let index = (self.total_time / self.params.dt2).floor() as u64;
        if self.last_sample_index.map_or(true, |last| index > last) {
            log::debug!("sample {} at t={:.3}", index, self.total_time);
            self.samples.push(Sample {
                time: self.total_time,
                particles: self.particles.iter().map(ParticleState::from).collect(),
            });
            self.last_sample_index = Some(index);
        }
    }
}
