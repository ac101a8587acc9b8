use crate::ai::Ai;
use crate::group::GroupId;
use crate::steering::{approach, MoveVector, Steering};
use crate::util::vec3::Vec3;

/// Whether a steering moves towards its target or away from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approach {
    Seek,
    Flee,
}

fn own_position(ai: &Ai) -> Option<(Vec3, f32)> {
    let character = ai.character()?;
    Some((character.position(), character.orientation()))
}

/// Seek or flee a fixed point, e.g. `TargetSeek{10:0:-4}`
pub struct TargetSteering {
    approach: Approach,
    target: Vec3,
}

impl TargetSteering {
    pub const SEEK: &'static str = "TargetSeek";
    pub const FLEE: &'static str = "TargetFlee";

    pub fn new(approach: Approach, target: Vec3) -> Self {
        Self { approach, target }
    }

    /// Parse `x:y:z`
    pub fn parse_target(parameters: &str) -> Option<Vec3> {
        let mut parts = parameters.split(':').map(|part| part.trim().parse::<f32>());
        let target = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => Vec3::new(x, y, z),
            _ => return None,
        };
        (!target.is_infinite() && !target.x.is_nan() && !target.y.is_nan() && !target.z.is_nan())
            .then_some(target)
    }
}

impl Steering for TargetSteering {
    fn name(&self) -> &str {
        match self.approach {
            Approach::Seek => Self::SEEK,
            Approach::Flee => Self::FLEE,
        }
    }

    fn parameters(&self) -> String {
        format!("{}:{}:{}", self.target.x, self.target.y, self.target.z)
    }

    fn execute(&self, ai: &Ai, speed: f32) -> MoveVector {
        let Some((position, orientation)) = own_position(ai) else {
            return MoveVector::INVALID;
        };
        approach(self.approach, position, self.target, speed, orientation)
    }
}

/// Seek or flee the averaged position of a group, e.g. `GroupFlee{2}`
pub struct GroupSteering {
    approach: Approach,
    group_id: GroupId,
}

impl GroupSteering {
    pub const SEEK: &'static str = "GroupSeek";
    pub const FLEE: &'static str = "GroupFlee";

    pub fn new(approach: Approach, group_id: GroupId) -> Self {
        Self { approach, group_id }
    }
}

impl Steering for GroupSteering {
    fn name(&self) -> &str {
        match self.approach {
            Approach::Seek => Self::SEEK,
            Approach::Flee => Self::FLEE,
        }
    }

    fn parameters(&self) -> String {
        self.group_id.to_string()
    }

    fn execute(&self, ai: &Ai, speed: f32) -> MoveVector {
        let Some((position, orientation)) = own_position(ai) else {
            return MoveVector::INVALID;
        };
        let target = ai.get_group_position(self.group_id);
        approach(self.approach, position, target, speed, orientation)
    }
}

/// Seek or flee the first entity of the AI's selection
///
/// The selected entity is looked up in the AI's zone, so a selection that
/// is empty or points outside the zone gives an invalid move.
pub struct SelectionSteering {
    approach: Approach,
}

impl SelectionSteering {
    pub const SEEK: &'static str = "SelectionSeek";
    pub const FLEE: &'static str = "SelectionFlee";

    pub fn new(approach: Approach) -> Self {
        Self { approach }
    }

    fn selected_position(ai: &Ai) -> Option<Vec3> {
        let id = ai.filtered_entities().first().copied()?;
        let zone = ai.zone()?;
        let selected = zone.get_ai(id)?;
        let character = selected.character()?;
        Some(character.position())
    }
}

impl Steering for SelectionSteering {
    fn name(&self) -> &str {
        match self.approach {
            Approach::Seek => Self::SEEK,
            Approach::Flee => Self::FLEE,
        }
    }

    fn execute(&self, ai: &Ai, speed: f32) -> MoveVector {
        let Some((position, orientation)) = own_position(ai) else {
            return MoveVector::INVALID;
        };
        let Some(target) = Self::selected_position(ai) else {
            return MoveVector::INVALID;
        };
        approach(self.approach, position, target, speed, orientation)
    }
}
