//! # Particles
//!
//! A [`Particle`] is either the navigating agent (id 0) or a passive obstacle.
//! Physical properties are fixed at construction; only `position` and
//! `velocity` change while a simulation runs.
//!
//! Collision prediction treats both particles as moving in straight lines:
//! the agent with the velocity it *wants* to have this step, the other with
//! its current velocity. The time at which the gap between the two paths
//! equals the agent's comfort radius plus the other particle's radius is the
//! smallest root of
//!
//! ```text
//! |v|^2 t^2 - 2 (v . d) t + |d|^2 - R^2 = 0
//! ```
//!
//! with `v` the relative velocity and `d` the relative displacement.

use crate::vector::Vector2D;

/// Id reserved for the navigating agent
pub const MAIN_PARTICLE_ID: usize = 0;

const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct Particle {
    pub id: usize,
    pub radius: f64,
    pub mass: f64,
    /// Buffer this particle wants others to keep from it
    pub comfort_radius: f64,
    pub max_speed: f64,
    pub preferred_speed: f64,
    /// Time needed to relax toward the preferred speed
    pub relaxation_time: f64,
    /// Predicted collisions further away than this are ignored
    pub anticipation_time: f64,
    pub position: Vector2D,
    pub velocity: Vector2D,
}

impl Particle {
    /// A particle at rest at the origin with no navigation parameters.
    pub fn new(id: usize, radius: f64, mass: f64, comfort_radius: f64) -> Self {
        Particle {
            id,
            radius,
            mass,
            comfort_radius,
            max_speed: 0.0,
            preferred_speed: 0.0,
            relaxation_time: 1.0,
            anticipation_time: 0.0,
            position: Vector2D::ZERO,
            velocity: Vector2D::ZERO,
        }
    }

    pub fn with_navigation(
        mut self,
        max_speed: f64,
        preferred_speed: f64,
        relaxation_time: f64,
        anticipation_time: f64,
    ) -> Self {
        self.max_speed = max_speed;
        self.preferred_speed = preferred_speed;
        self.relaxation_time = relaxation_time;
        self.anticipation_time = anticipation_time;
        self
    }

    pub fn with_state(mut self, position: Vector2D, velocity: Vector2D) -> Self {
        self.position = position;
        self.velocity = velocity;
        self
    }

    pub fn is_main(&self) -> bool {
        self.id == MAIN_PARTICLE_ID
    }

    pub fn distance_to(&self, other: &Particle) -> f64 {
        self.position.distance(&other.position)
    }

    /// Relaxation toward moving at the preferred speed straight at `goal`.
    pub fn goal_force(&self, goal: Vector2D) -> Vector2D {
        let heading = (goal - self.position).normalize();
        (heading * self.preferred_speed - self.velocity) * (1.0 / self.relaxation_time)
    }

    pub fn update_velocity(&mut self, force: Vector2D, dt: f64) {
        self.velocity += force * dt;
    }

    pub fn update_position(&mut self, dt: f64) {
        self.position += self.velocity * dt;
    }

    /// Caps the speed at `max_speed`, keeping the heading.
    pub fn clamp_speed(&mut self) {
        self.velocity = self.velocity.clamp_magnitude(self.max_speed);
    }

    pub fn personal_space_invaded_by(&self, other: &Particle) -> bool {
        self.distance_to(other) <= self.comfort_radius + other.radius
    }

    /// Time until `other` enters this particle's comfort zone, if that happens
    /// within `anticipation_time`.
    ///
    /// `desired_velocity` stands in for this particle's velocity; the other
    /// particle keeps its current one. A collision already in progress reports
    /// `Some(0.0)`.
    pub fn collision_is_near(
        &self,
        desired_velocity: Vector2D,
        other: &Particle,
        anticipation_time: f64,
    ) -> Option<f64> {
        let v = desired_velocity - other.velocity;
        let d = other.position - self.position;
        let combined_radius = self.comfort_radius + other.radius;

        let a = v.magnitude_squared();
        let b = -2.0 * v.dot(&d);
        let c = d.magnitude_squared() - combined_radius * combined_radius;

        time_to_collision(a, b, c, anticipation_time)
    }
}

impl PartialEq for Particle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Particle {}

/// Smallest non-negative root of `a t^2 + b t + c = 0` within `horizon`.
///
/// - no real roots, a double root, or both roots negative: `None`
/// - roots on both sides of zero (already overlapping): `Some(0.0)`
/// - otherwise the smaller root, if it is not beyond `horizon`
///
/// Without relative motion (`a == 0`) the gap never changes, so nothing is
/// predicted.
pub fn time_to_collision(a: f64, b: f64, c: f64, horizon: f64) -> Option<f64> {
    if a <= EPSILON {
        return None;
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let t1 = (-b + root) / (2.0 * a);
    let t2 = (-b - root) / (2.0 * a);
    let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };

    if near == far || far < 0.0 {
        None
    } else if near < 0.0 {
        Some(0.0)
    } else {
        (near <= horizon).then_some(near)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn agent_at(x: f64, y: f64) -> Particle {
        Particle::new(MAIN_PARTICLE_ID, 0.25, 70.0, 0.5)
            .with_navigation(2.0, 1.3, 0.5, 2.0)
            .with_state(Vector2D::new(x, y), Vector2D::ZERO)
    }

    fn obstacle_at(id: usize, x: f64, y: f64, vx: f64, vy: f64) -> Particle {
        Particle::new(id, 0.25, 70.0, 0.5).with_state(Vector2D::new(x, y), Vector2D::new(vx, vy))
    }

    #[test]
    fn test_distance_to() {
        let a = agent_at(0.0, 0.0);
        let b = obstacle_at(1, 3.0, 4.0, 0.0, 0.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn test_goal_force_from_rest() {
        let a = agent_at(0.0, 0.0);
        let f = a.goal_force(Vector2D::new(10.0, 0.0));
        // (1.3 * x_hat - 0) / 0.5
        assert_relative_eq!(f.x, 2.6, epsilon = 1e-12);
        assert_relative_eq!(f.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_goal_force_vanishes_at_preferred_velocity() {
        let mut a = agent_at(0.0, 0.0);
        a.velocity = Vector2D::new(0.0, 1.3);
        let f = a.goal_force(Vector2D::new(0.0, 5.0));
        assert_relative_eq!(f.magnitude(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_euler_updates() {
        let mut a = agent_at(1.0, 1.0);
        a.update_velocity(Vector2D::new(2.0, 0.0), 0.5);
        assert_eq!(a.velocity, Vector2D::new(1.0, 0.0));
        a.update_position(0.5);
        assert_eq!(a.position, Vector2D::new(1.5, 1.0));
    }

    #[test]
    fn test_clamp_speed() {
        let mut a = agent_at(0.0, 0.0);
        a.velocity = Vector2D::new(3.0, 4.0);
        a.clamp_speed();
        assert_relative_eq!(a.velocity.magnitude(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(a.velocity.x, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_identity_by_id() {
        let a = obstacle_at(3, 0.0, 0.0, 0.0, 0.0);
        let b = obstacle_at(3, 9.0, 9.0, 1.0, 1.0);
        let c = obstacle_at(4, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_personal_space() {
        let a = agent_at(0.0, 0.0);
        assert!(a.personal_space_invaded_by(&obstacle_at(1, 0.7, 0.0, 0.0, 0.0)));
        assert!(!a.personal_space_invaded_by(&obstacle_at(1, 0.8, 0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_head_on_collision_time() {
        let a = agent_at(0.0, 0.0);
        let b = obstacle_at(1, 5.0, 0.0, 0.0, 0.0);
        // gap closes from 5.0 to 0.75 at unit speed
        let t = a.collision_is_near(Vector2D::new(1.0, 0.0), &b, 10.0);
        assert_relative_eq!(t.unwrap(), 4.25, epsilon = 1e-9);
    }

    #[test]
    fn test_collision_beyond_horizon_is_ignored() {
        let a = agent_at(0.0, 0.0);
        let b = obstacle_at(1, 5.0, 0.0, 0.0, 0.0);
        assert!(a.collision_is_near(Vector2D::new(1.0, 0.0), &b, 4.0).is_none());
    }

    #[test]
    fn test_moving_apart_is_no_collision() {
        let a = agent_at(0.0, 0.0);
        let b = obstacle_at(1, 5.0, 0.0, 0.0, 0.0);
        assert!(a.collision_is_near(Vector2D::new(-1.0, 0.0), &b, 100.0).is_none());
    }

    #[test]
    fn test_missing_paths_is_no_collision() {
        let a = agent_at(0.0, 0.0);
        let b = obstacle_at(1, 5.0, 2.0, 0.0, 0.0);
        assert!(a.collision_is_near(Vector2D::new(1.0, 0.0), &b, 100.0).is_none());
    }

    #[test]
    fn test_overlap_is_imminent() {
        let a = agent_at(0.0, 0.0);
        let b = obstacle_at(1, 0.5, 0.0, 0.0, 0.0);
        assert_eq!(a.collision_is_near(Vector2D::new(1.0, 0.0), &b, 1.0), Some(0.0));
    }

    #[test]
    fn test_no_relative_motion_is_no_collision() {
        let a = agent_at(0.0, 0.0);
        let b = obstacle_at(1, 3.0, 0.0, 1.0, 0.0);
        assert!(a.collision_is_near(Vector2D::new(1.0, 0.0), &b, 100.0).is_none());
    }

    #[test]
    fn test_discriminant_exactly_zero_is_no_collision() {
        // (t - 2)^2 = t^2 - 4t + 4
        assert!(time_to_collision(1.0, -4.0, 4.0, 10.0).is_none());
    }

    #[test]
    fn test_tangent_paths_are_no_collision() {
        let a = agent_at(0.0, 0.0);
        // offset by exactly comfort radius + radius: the paths graze
        let b = obstacle_at(1, 4.0, 0.75, 0.0, 0.0);
        assert!(a.collision_is_near(Vector2D::new(1.0, 0.0), &b, 100.0).is_none());
    }

    #[test]
    fn test_both_roots_negative_is_no_collision() {
        // roots at -1 and -3
        assert!(time_to_collision(1.0, 4.0, 3.0, 10.0).is_none());
    }

    #[test]
    fn test_roots_straddling_zero_report_zero() {
        // roots at -1 and 2
        assert_eq!(time_to_collision(1.0, -1.0, -2.0, 10.0), Some(0.0));
    }

    #[test]
    fn test_root_at_zero_is_never_negative() {
        // roots at -2 and 0
        assert_eq!(time_to_collision(1.0, 2.0, 0.0, 10.0), Some(0.0));
    }

    #[test]
    fn test_horizon_is_inclusive() {
        // roots at 1 and 3
        assert_eq!(time_to_collision(1.0, -4.0, 3.0, 1.0), Some(1.0));
        assert!(time_to_collision(1.0, -4.0, 3.0, 0.99).is_none());
    }

    proptest! {
        #[test]
        fn prop_speed_never_exceeds_max(
            vx in -5.0f64..5.0, vy in -5.0f64..5.0,
            fx in -100.0f64..100.0, fy in -100.0f64..100.0,
            dt in 0.001f64..0.1,
        ) {
            let mut a = agent_at(0.0, 0.0);
            a.velocity = Vector2D::new(vx, vy).clamp_magnitude(a.max_speed);
            a.update_velocity(Vector2D::new(fx, fy), dt);
            a.clamp_speed();
            prop_assert!(a.velocity.magnitude() <= a.max_speed + 1e-9);
        }

        #[test]
        fn prop_collision_prediction_agrees_when_roles_swap(
            x in -5.0f64..5.0, y in -5.0f64..5.0,
            v1x in -2.0f64..2.0, v1y in -2.0f64..2.0,
            v2x in -2.0f64..2.0, v2y in -2.0f64..2.0,
        ) {
            // equal comfort and body radii make R the same from both sides
            let first = Particle::new(0, 0.5, 1.0, 0.5)
                .with_state(Vector2D::ZERO, Vector2D::new(v1x, v1y));
            let second = Particle::new(1, 0.5, 1.0, 0.5)
                .with_state(Vector2D::new(x, y), Vector2D::new(v2x, v2y));

            let forward = first.collision_is_near(first.velocity, &second, 3.0);
            let backward = second.collision_is_near(second.velocity, &first, 3.0);
            prop_assert_eq!(forward.is_some(), backward.is_some());
            if let (Some(t1), Some(t2)) = (forward, backward) {
                prop_assert!((t1 - t2).abs() < 1e-9);
            }
        }
    }
}
