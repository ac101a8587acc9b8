//! The host side entity an `Ai` drives
//!
//! Every entity visible mutation done by tree nodes goes through the setters
//! of [`Character`], so a host can intercept, validate or forward them.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::util::vec3::Vec3;

/// Identifier of a character inside a zone
pub type CharacterId = i32;

/// "Nothing selected" marker for character ids
pub const AI_NOTHING_SELECTED: CharacterId = -1;

/// Debug attributes shown by introspection tools, ordered by key
pub type CharacterAttributes = BTreeMap<String, String>;

pub type CharacterRef = Arc<dyn Character>;

/// Real world entity contract
pub trait Character: Send + Sync {
    fn id(&self) -> CharacterId;

    fn position(&self) -> Vec3;
    fn set_position(&self, position: Vec3);

    /// Orientation in radians around the up axis
    fn orientation(&self) -> f32;
    fn set_orientation(&self, orientation: f32);

    fn speed(&self) -> f32;
    fn set_speed(&self, speed: f32);

    fn attributes(&self) -> CharacterAttributes;
    fn set_attribute(&self, key: &str, value: &str);

    /// Called by `Ai::update` before the behaviour tree runs
    fn update(&self, _delta_millis: i64, _debugging_active: bool) {}
}

#[derive(Debug, Clone, Default)]
struct CharacterState {
    position: Vec3,
    orientation: f32,
    speed: f32,
    attributes: CharacterAttributes,
}

/// Plain `Character` implementation for hosts without their own entity type
#[derive(Debug)]
pub struct BasicCharacter {
    id: CharacterId,
    state: RwLock<CharacterState>,
}

impl BasicCharacter {
    pub fn new(id: CharacterId) -> Self {
        Self::with_position(id, Vec3::ZERO)
    }

    pub fn with_position(id: CharacterId, position: Vec3) -> Self {
        Self {
            id,
            state: RwLock::new(CharacterState {
                position,
                ..Default::default()
            }),
        }
    }

    pub fn shared(id: CharacterId, position: Vec3) -> CharacterRef {
        Arc::new(Self::with_position(id, position))
    }
}

impl Character for BasicCharacter {
    fn id(&self) -> CharacterId {
        self.id
    }

    fn position(&self) -> Vec3 {
        self.state.read().position
    }

    fn set_position(&self, position: Vec3) {
        self.state.write().position = position;
    }

    fn orientation(&self) -> f32 {
        self.state.read().orientation
    }

    fn set_orientation(&self, orientation: f32) {
        self.state.write().orientation = orientation;
    }

    fn speed(&self) -> f32 {
        self.state.read().speed
    }

    fn set_speed(&self, speed: f32) {
        self.state.write().speed = speed;
    }

    fn attributes(&self) -> CharacterAttributes {
        self.state.read().attributes.clone()
    }

    fn set_attribute(&self, key: &str, value: &str) {
        self.state
            .write()
            .attributes
            .insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_character_setters() {
        let chr = BasicCharacter::new(7);
        chr.set_position(Vec3::new(1.0, 2.0, 3.0));
        chr.set_orientation(1.5);
        chr.set_speed(4.0);

        assert_eq!(chr.id(), 7);
        assert_eq!(chr.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(chr.orientation(), 1.5);
        assert_eq!(chr.speed(), 4.0);
    }

    #[test]
    fn test_attributes_overwrite() {
        let chr = BasicCharacter::new(1);
        chr.set_attribute("Name", "wolf");
        chr.set_attribute("Name", "rabbit");
        chr.set_attribute("Hp", "10");

        let attributes = chr.attributes();
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes.get("Name").map(String::as_str), Some("rabbit"));
    }
}
