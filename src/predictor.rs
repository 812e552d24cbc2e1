//! # Collision Predictor
//!
//! Each step the agent looks ahead along the velocity it would have without
//! avoidance (its *desired velocity*) and ranks the obstacles it would run
//! into by how soon that happens.
//!
//! Ranking key is `(time, current distance, id)`, so two obstacles predicted
//! at the same instant are still ordered deterministically. Only the first
//! few candidates are kept; their maneuvers are blended with rank weights.

use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;
use std::cmp::Reverse;

use crate::particle::Particle;
use crate::vector::Vector2D;

type RankKey = Reverse<(OrderedFloat<f64>, OrderedFloat<f64>, usize)>;

/// An obstacle the agent is predicted to collide with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionCandidate {
    /// Predicted time until the comfort zone is entered
    pub time: f64,
    /// Distance between centers right now
    pub distance: f64,
    pub id: usize,
}

impl CollisionCandidate {
    fn rank_key(&self) -> RankKey {
        Reverse((OrderedFloat(self.time), OrderedFloat(self.distance), self.id))
    }
}

/// Velocity after one step under the wall and goal forces alone.
pub fn desired_velocity(
    agent: &Particle,
    wall_force: Vector2D,
    goal_force: Vector2D,
    dt: f64,
) -> Vector2D {
    agent.velocity + (wall_force + goal_force) * dt
}

/// Up to `limit` obstacles the agent would collide with inside its
/// anticipation time, soonest first.
pub fn rank_collisions<'a, I>(
    agent: &Particle,
    desired_velocity: Vector2D,
    obstacles: I,
    limit: usize,
) -> Vec<CollisionCandidate>
where
    I: IntoIterator<Item = &'a Particle>,
{
    let mut open_set: PriorityQueue<usize, RankKey> = PriorityQueue::new();
    let mut candidates = Vec::new();

    for obstacle in obstacles {
        if obstacle.id == agent.id {
            continue;
        }
        let horizon = agent.anticipation_time;
        if let Some(time) = agent.collision_is_near(desired_velocity, obstacle, horizon) {
            let candidate = CollisionCandidate {
                time,
                distance: agent.distance_to(obstacle),
                id: obstacle.id,
            };
            log::trace!("collision with {} predicted in {:.3}", candidate.id, candidate.time);
            open_set.push(candidates.len(), candidate.rank_key());
            candidates.push(candidate);
        }
    }

    let mut ranked = Vec::with_capacity(limit.min(candidates.len()));
    while ranked.len() < limit {
        match open_set.pop() {
            Some((index, _)) => ranked.push(candidates[index]),
            None => break,
        }
    }
    ranked
}

/// Rank weights for `count` maneuvers.
///
/// Weights beyond `count` are pooled and shared equally among the maneuvers
/// present, so the applied weights always sum to the same total as `base`.
pub fn blend_weights(base: &[f64], count: usize) -> Vec<f64> {
    let count = count.min(base.len());
    if count == 0 {
        return Vec::new();
    }
    let spare: f64 = base[count..].iter().sum::<f64>() / count as f64;
    base[..count].iter().map(|w| w + spare).collect()
}

/// Weighted sum of maneuvers ordered by rank.
pub fn blend(maneuvers: &[Vector2D], base: &[f64]) -> Vector2D {
    let weights = blend_weights(base, maneuvers.len());
    maneuvers
        .iter()
        .zip(weights.iter())
        .fold(Vector2D::ZERO, |total, (force, weight)| total + *force * *weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::BASE_WEIGHTS;
    use crate::particle::MAIN_PARTICLE_ID;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn agent() -> Particle {
        Particle::new(MAIN_PARTICLE_ID, 0.25, 70.0, 0.5)
            .with_navigation(2.0, 1.3, 0.5, 10.0)
            .with_state(Vector2D::ZERO, Vector2D::new(1.0, 0.0))
    }

    fn obstacle(id: usize, x: f64, y: f64) -> Particle {
        Particle::new(id, 0.25, 70.0, 0.5).with_state(Vector2D::new(x, y), Vector2D::ZERO)
    }

    #[test]
    fn test_desired_velocity() {
        let a = agent();
        let v = desired_velocity(&a, Vector2D::new(0.0, 1.0), Vector2D::new(2.0, 0.0), 0.5);
        assert_eq!(v, Vector2D::new(2.0, 0.5));
    }

    #[test]
    fn test_rank_orders_by_time() {
        let a = agent();
        let obstacles = vec![obstacle(1, 6.0, 0.0), obstacle(2, 3.0, 0.0), obstacle(3, 9.0, 0.0)];
        let ranked = rank_collisions(&a, a.velocity, &obstacles, 3);
        let ids: Vec<usize> = ranked.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert!(ranked.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn test_rank_keeps_limit() {
        let a = agent();
        let obstacles: Vec<Particle> = (1..=6).map(|i| obstacle(i, 2.0 + i as f64, 0.0)).collect();
        let ranked = rank_collisions(&a, a.velocity, &obstacles, 3);
        let ids: Vec<usize> = ranked.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_skips_misses_and_far_collisions() {
        let mut a = agent();
        a.anticipation_time = 5.0;
        let obstacles = vec![
            obstacle(1, 3.0, 4.0),  // paths never close
            obstacle(2, 20.0, 0.0), // beyond the horizon
            obstacle(3, -3.0, 0.0), // behind
            obstacle(4, 4.0, 0.0),
        ];
        let ranked = rank_collisions(&a, a.velocity, &obstacles, 3);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, 4);
    }

    #[test]
    fn test_rank_ignores_agent_itself() {
        let a = agent();
        let everyone = vec![a.clone(), obstacle(1, 3.0, 0.0)];
        let ranked = rank_collisions(&a, a.velocity, &everyone, 3);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, 1);
    }

    #[test]
    fn test_rank_tie_broken_by_distance_then_id() {
        let a = agent();
        // All three overlap the comfort zone already: time 0 for everyone.
        let obstacles = vec![obstacle(7, 0.6, 0.0), obstacle(5, 0.4, 0.0), obstacle(3, 0.6, 0.0)];
        let ranked = rank_collisions(&a, a.velocity, &obstacles, 3);
        assert!(ranked.iter().all(|c| c.time == 0.0));
        let ids: Vec<usize> = ranked.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![5, 3, 7]);
    }

    #[test]
    fn test_rank_independent_of_input_order() {
        let a = agent();
        let mut obstacles = vec![
            obstacle(1, 0.6, 0.0),
            obstacle(2, 0.6, 0.0),
            obstacle(3, 5.0, 0.0),
            obstacle(4, 0.5, 0.1),
        ];
        let forward = rank_collisions(&a, a.velocity, &obstacles, 3);
        obstacles.reverse();
        let backward = rank_collisions(&a, a.velocity, &obstacles, 3);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_weights_full_set_unchanged() {
        assert_eq!(blend_weights(&BASE_WEIGHTS, 3), BASE_WEIGHTS.to_vec());
    }

    #[test]
    fn test_weights_redistributed() {
        let two = blend_weights(&BASE_WEIGHTS, 2);
        assert_relative_eq!(two[0], 0.825, epsilon = 1e-12);
        assert_relative_eq!(two[1], 0.175, epsilon = 1e-12);

        let one = blend_weights(&BASE_WEIGHTS, 1);
        assert_relative_eq!(one[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_empty() {
        assert!(blend_weights(&BASE_WEIGHTS, 0).is_empty());
        assert_eq!(blend(&[], &BASE_WEIGHTS), Vector2D::ZERO);
    }

    #[test]
    fn test_weights_sum_to_one() {
        for count in 1..=3 {
            let total: f64 = blend_weights(&BASE_WEIGHTS, count).iter().sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_blend_single_maneuver_is_full_strength() {
        let f = Vector2D::new(-2.0, 1.0);
        let total = blend(&[f], &BASE_WEIGHTS);
        assert_relative_eq!(total.x, -2.0, epsilon = 1e-12);
        assert_relative_eq!(total.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_blend_weighted_sum() {
        let maneuvers = [
            Vector2D::new(1.0, 0.0),
            Vector2D::new(0.0, 1.0),
            Vector2D::new(-1.0, 0.0),
        ];
        let total = blend(&maneuvers, &BASE_WEIGHTS);
        assert_relative_eq!(total.x, 0.75, epsilon = 1e-12);
        assert_relative_eq!(total.y, 0.15, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_weights_sum_to_base_total(
            base in proptest::collection::vec(0.0f64..1.0, 1..6),
            count in 1usize..6,
        ) {
            let count = count.min(base.len());
            let total: f64 = blend_weights(&base, count).iter().sum();
            let expected: f64 = base.iter().sum();
            prop_assert!((total - expected).abs() < 1e-9);
        }
    }
}
