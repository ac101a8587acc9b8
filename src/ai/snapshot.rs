//! Serializable view of one AI for debugging tools

use serde::Serialize;

use crate::aggro::Entry;
use crate::character::{CharacterAttributes, CharacterId};
use crate::tree::{NodeId, TreeNodeRef, TreeNodeStatus};
use crate::util::vec3::Vec3;

use super::Ai;

/// One node of the behaviour tree together with the AI's state for it
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub kind: String,
    pub parameters: String,
    pub condition: String,
    /// Only known for nodes executed while debugging was active
    pub status: Option<TreeNodeStatus>,
    /// Millis of AI time since the node last executed
    pub last_run: Option<i64>,
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    fn capture(ai: &Ai, node: &TreeNodeRef, now: i64) -> Self {
        let id = node.id();
        Self {
            id,
            name: node.name().to_string(),
            kind: node.kind().to_string(),
            parameters: node.parameters().to_string(),
            condition: node.condition().describe(),
            status: ai.last_status(id),
            last_run: ai.last_exec_millis(id).map(|at| now - at),
            children: node
                .children()
                .iter()
                .map(|child| Self::capture(ai, child, now))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AiStateSnapshot {
    pub id: CharacterId,
    pub position: Option<Vec3>,
    pub orientation: Option<f32>,
    pub time: i64,
    pub paused: bool,
    pub aggro: Vec<Entry>,
    pub attributes: CharacterAttributes,
    pub root: NodeSnapshot,
}

impl AiStateSnapshot {
    pub(crate) fn capture(ai: &Ai) -> Self {
        let character = ai.character();
        let time = ai.time();
        Self {
            id: ai.get_id(),
            position: character.as_ref().map(|c| c.position()),
            orientation: character.as_ref().map(|c| c.orientation()),
            time,
            paused: ai.is_pause(),
            aggro: ai.aggro_mgr().entries(),
            attributes: character.map(|c| c.attributes()).unwrap_or_default(),
            root: NodeSnapshot::capture(ai, &ai.behaviour(), time),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
