//! Movement behaviours for the `Steer` node
//!
//! A [`Steering`] looks at the AI and its surroundings and returns the
//! velocity its character should move with on this tick. Steerings never
//! move the character themselves: the `Steer` node blends them and applies
//! the result through the [`Character`](crate::character::Character)
//! setters.

use std::sync::Arc;

use crate::ai::Ai;
use crate::condition::describe;
use crate::util::vec3::Vec3;

mod target;
mod wander;

pub use target::{Approach, GroupSteering, SelectionSteering, TargetSteering};
pub use wander::Wander;

pub type SteeringRef = Arc<dyn Steering>;

/// Distance below which a seek counts as arrived
const ARRIVED: f32 = 1e-3;

/// Velocity and heading requested by a steering for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveVector {
    /// Units per second
    pub vector: Vec3,
    /// Heading in radians around the up axis
    pub orientation: f32,
}

impl MoveVector {
    /// Returned when the steering has nothing to move towards
    pub const INVALID: MoveVector = MoveVector {
        vector: Vec3::INFINITE,
        orientation: 0.0,
    };

    pub fn new(vector: Vec3, orientation: f32) -> Self {
        Self { vector, orientation }
    }

    pub fn is_valid(&self) -> bool {
        !self.vector.is_infinite()
    }
}

pub trait Steering: Send + Sync {
    fn name(&self) -> &str;

    fn parameters(&self) -> String {
        String::new()
    }

    /// Velocity for `ai` moving at `speed` units per second
    fn execute(&self, ai: &Ai, speed: f32) -> MoveVector;

    fn describe(&self) -> String {
        describe(self.name(), &self.parameters(), &[])
    }
}

/// Move from `position` towards (or away from) `target` at `speed`
///
/// An unknown target yields [`MoveVector::INVALID`]. Standing on the target
/// yields a zero vector that keeps `orientation`.
pub(crate) fn approach(
    approach: Approach,
    position: Vec3,
    target: Vec3,
    speed: f32,
    orientation: f32,
) -> MoveVector {
    if target.is_infinite() || position.is_infinite() {
        return MoveVector::INVALID;
    }
    let offset = match approach {
        Approach::Seek => target - position,
        Approach::Flee => position - target,
    };
    let distance = offset.length();
    if distance < ARRIVED {
        return MoveVector::new(Vec3::ZERO, orientation);
    }
    MoveVector::new(offset / distance * speed, offset.angle())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_and_flee_directions() {
        let from = Vec3::new(1.0, 0.0, 1.0);
        let to = Vec3::new(4.0, 0.0, 5.0);

        let seek = approach(Approach::Seek, from, to, 10.0, 0.0);
        assert!(seek.vector.approx_eq(Vec3::new(6.0, 0.0, 8.0), 1e-4));
        assert!((seek.orientation - (4.0f32).atan2(3.0)).abs() < 1e-5);

        let flee = approach(Approach::Flee, from, to, 10.0, 0.0);
        assert!(flee.vector.approx_eq(Vec3::new(-6.0, 0.0, -8.0), 1e-4));
    }

    #[test]
    fn test_arrived_keeps_heading() {
        let here = Vec3::new(2.0, 0.0, 2.0);
        let mv = approach(Approach::Seek, here, here, 5.0, 1.5);
        assert!(mv.is_valid());
        assert_eq!(mv.vector, Vec3::ZERO);
        assert_eq!(mv.orientation, 1.5);
    }

    #[test]
    fn test_unknown_target_is_invalid() {
        let mv = approach(Approach::Seek, Vec3::ZERO, Vec3::INFINITE, 5.0, 0.0);
        assert!(!mv.is_valid());
        assert!(!MoveVector::INVALID.is_valid());
    }
}
