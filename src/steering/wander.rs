use rand::Rng;

use crate::ai::Ai;
use crate::steering::{MoveVector, Steering};
use crate::util::vec3::Vec3;

/// Move along the current heading after turning by a random angle of at
/// most `rotation` radians, e.g. `Wander{0.3}`
pub struct Wander {
    rotation: f32,
}

impl Wander {
    pub const NAME: &'static str = "Wander";

    /// Ten degrees
    pub const DEFAULT_ROTATION: f32 = std::f32::consts::PI / 18.0;

    pub fn new(rotation: f32) -> Self {
        Self {
            rotation: rotation.abs(),
        }
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }
}

impl Default for Wander {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROTATION)
    }
}

impl Steering for Wander {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> String {
        self.rotation.to_string()
    }

    fn execute(&self, ai: &Ai, speed: f32) -> MoveVector {
        let Some(character) = ai.character() else {
            return MoveVector::INVALID;
        };
        let turn = if self.rotation > 0.0 {
            rand::thread_rng().gen_range(-self.rotation..=self.rotation)
        } else {
            0.0
        };
        let orientation = character.orientation() + turn;
        MoveVector::new(Vec3::from_angle(orientation) * speed, orientation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::test_util::*;
    use crate::tree::TreeNodeStatus;

    #[test]
    fn test_wander_turns_within_rotation() {
        let ai = ai_with(leaf("root", TreeNodeStatus::Finished));
        ai.character().unwrap().set_orientation(1.0);
        let wander = Wander::new(0.25);

        for _ in 0..100 {
            let mv = wander.execute(&ai, 4.0);
            assert!((mv.orientation - 1.0).abs() <= 0.25 + 1e-6);
            assert!((mv.vector.length() - 4.0).abs() < 1e-4);
            assert_eq!(mv.vector.y, 0.0);
        }
    }

    #[test]
    fn test_wander_without_rotation_goes_straight() {
        let ai = ai_with(leaf("root", TreeNodeStatus::Finished));
        let mv = Wander::new(0.0).execute(&ai, 2.0);
        assert!(mv.vector.approx_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
        assert_eq!(mv.orientation, 0.0);
        assert_eq!(Wander::default().describe(), format!("Wander{{{}}}", Wander::DEFAULT_ROTATION));
    }
}
