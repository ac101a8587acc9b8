use std::f32::consts::TAU;

use crate::ai::Ai;
use crate::error::{AiError, Result};
use crate::steering::{MoveVector, SteeringRef};
use crate::tree::{NodeCore, TreeNode, TreeNodeStatus};
use crate::util::vec3::Vec3;

/// Leaf that moves the character by the weighted blend of its steerings,
/// e.g. `Steer{0.7,0.3}(GroupSeek{1},Wander)`
///
/// Weights default to 1. Steerings without a valid move are left out of the
/// blend. The node fails when none of them has one and finishes otherwise.
pub struct Steer {
    core: NodeCore,
    steerings: Vec<(SteeringRef, f32)>,
}

impl Steer {
    pub const KIND: &'static str = "Steer";

    pub fn new(name: &str, steerings: Vec<SteeringRef>) -> Result<Self> {
        Self::from_core(NodeCore::new(Self::KIND, name), steerings)
    }

    pub fn from_core(core: NodeCore, steerings: Vec<SteeringRef>) -> Result<Self> {
        if !core.children().is_empty() {
            return Err(AiError::InvalidChildCount {
                kind: Self::KIND.to_string(),
                expected: "0",
                actual: core.children().len(),
            });
        }
        if steerings.is_empty() {
            return Err(AiError::invalid_parameters(
                Self::KIND,
                "needs at least one steering",
            ));
        }

        let weights = Self::parse_weights(core.parameters(), steerings.len())?;
        Ok(Self {
            core,
            steerings: steerings.into_iter().zip(weights).collect(),
        })
    }

    fn parse_weights(parameters: &str, count: usize) -> Result<Vec<f32>> {
        if parameters.trim().is_empty() {
            return Ok(vec![1.0; count]);
        }
        let weights = parameters
            .split(',')
            .map(|w| match w.trim().parse::<f32>() {
                Ok(weight) if weight.is_finite() && weight >= 0.0 => Ok(weight),
                _ => Err(AiError::invalid_parameters(
                    Self::KIND,
                    format!("invalid weight '{}'", w.trim()),
                )),
            })
            .collect::<Result<Vec<f32>>>()?;
        if weights.len() != count {
            return Err(AiError::invalid_parameters(
                Self::KIND,
                format!("{} weights for {} steerings", weights.len(), count),
            ));
        }
        Ok(weights)
    }

    pub fn steerings(&self) -> impl Iterator<Item = (&SteeringRef, f32)> {
        self.steerings.iter().map(|(steering, weight)| (steering, *weight))
    }

    /// Weighted average of the valid moves, heading along the result
    fn blend(&self, ai: &Ai, speed: f32) -> Option<MoveVector> {
        let mut sum = MoveVector::new(Vec3::ZERO, 0.0);
        let mut total = 0.0;
        let mut heaviest: Option<(f32, f32)> = None;

        for (steering, weight) in &self.steerings {
            let mv = steering.execute(ai, speed);
            if !mv.is_valid() {
                continue;
            }
            sum.vector += mv.vector * *weight;
            total += *weight;
            if heaviest.map_or(true, |(w, _)| *weight > w) {
                heaviest = Some((*weight, mv.orientation));
            }
        }

        let (_, orientation) = heaviest?;
        if total <= 0.0 {
            return None;
        }
        sum.vector = sum.vector / total;
        sum.orientation = if sum.vector.length_sq() > f32::EPSILON {
            sum.vector.angle()
        } else {
            orientation
        };
        Some(sum)
    }
}

impl TreeNode for Steer {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus {
        if !self.core.enter(ai) {
            return self.core.state(ai, TreeNodeStatus::CannotExecute);
        }
        let Some(character) = ai.character() else {
            return self.core.state(ai, TreeNodeStatus::Failed);
        };
        let Some(mv) = self.blend(ai, character.speed()) else {
            return self.core.state(ai, TreeNodeStatus::Failed);
        };

        let seconds = delta_millis as f32 / 1000.0;
        character.set_position(character.position() + mv.vector * seconds);
        character.set_orientation(mv.orientation.rem_euclid(TAU));
        self.core.state(ai, TreeNodeStatus::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steering::{Approach, Steering, TargetSteering};
    use crate::tree::test_util::*;
    use crate::tree::TreeNodeRef;
    use std::sync::Arc;

    /// Steering that never has a move
    struct Lost;

    impl Steering for Lost {
        fn name(&self) -> &str {
            "Lost"
        }

        fn execute(&self, _ai: &Ai, _speed: f32) -> MoveVector {
            MoveVector::INVALID
        }
    }

    fn seek(x: f32, z: f32) -> SteeringRef {
        Arc::new(TargetSteering::new(Approach::Seek, Vec3::new(x, 0.0, z)))
    }

    #[test]
    fn test_steer_moves_character() {
        let node: TreeNodeRef = Arc::new(Steer::new("steer", vec![seek(0.0, 100.0)]).unwrap());
        let ai = ai_with(node.clone());
        let character = ai.character().unwrap();
        character.set_speed(4.0);

        assert_eq!(node.execute(&ai, 500), TreeNodeStatus::Finished);
        assert!(character.position().approx_eq(Vec3::new(0.0, 0.0, 2.0), 1e-5));
        assert!((character.orientation() - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_weighted_blend_skips_invalid() {
        let lost: SteeringRef = Arc::new(Lost);
        let core = NodeCore::new(Steer::KIND, "steer").with_parameters("3,1,5");
        let node: TreeNodeRef = Arc::new(
            Steer::from_core(core, vec![seek(10.0, 0.0), seek(0.0, 10.0), lost]).unwrap(),
        );
        let ai = ai_with(node.clone());
        let character = ai.character().unwrap();
        character.set_speed(4.0);

        assert_eq!(node.execute(&ai, 1000), TreeNodeStatus::Finished);
        assert!(character.position().approx_eq(Vec3::new(3.0, 0.0, 1.0), 1e-5));
    }

    #[test]
    fn test_steer_fails_without_valid_move() {
        let lost: SteeringRef = Arc::new(Lost);
        let node: TreeNodeRef = Arc::new(Steer::new("steer", vec![lost]).unwrap());
        let ai = ai_with(node.clone());
        ai.update(16, true);
        assert_eq!(ai.last_status(node.id()), Some(TreeNodeStatus::Failed));
        assert_eq!(ai.character().unwrap().position(), Vec3::ZERO);

        let orphan = crate::ai::Ai::shared(node.clone());
        assert_eq!(node.execute(&orphan, 16), TreeNodeStatus::Failed);
    }

    #[test]
    fn test_orientation_wrapped() {
        let node: TreeNodeRef = Arc::new(Steer::new("steer", vec![seek(0.0, -5.0)]).unwrap());
        let ai = ai_with(node.clone());
        node.execute(&ai, 10);
        let orientation = ai.character().unwrap().orientation();
        assert!((orientation - 1.5 * std::f32::consts::PI).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(Steer::new("steer", vec![]).is_err());

        let two_weights = NodeCore::new(Steer::KIND, "steer").with_parameters("1,2");
        assert!(Steer::from_core(two_weights, vec![seek(1.0, 1.0)]).is_err());

        let negative = NodeCore::new(Steer::KIND, "steer").with_parameters("-1");
        assert!(Steer::from_core(negative, vec![seek(1.0, 1.0)]).is_err());

        let with_child = NodeCore::new(Steer::KIND, "steer")
            .with_children(vec![leaf("child", TreeNodeStatus::Finished)]);
        assert!(Steer::from_core(with_child, vec![seek(1.0, 1.0)]).is_err());
    }
}
