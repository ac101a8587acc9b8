use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::condition::True;
use crate::error::{AiError, Result};
use crate::tree::{node_count, TreeNodeRef};

use super::AiRegistry;

/// Serializable description of a tree
///
/// ```json
/// { "type": "PrioritySelector", "name": "root", "children": [
///     { "type": "Idle{1000}", "name": "rest", "condition": "Not(HasEnemies)" }
/// ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(node_type: &str, name: &str) -> Self {
        Self {
            node_type: node_type.to_string(),
            name: name.to_string(),
            condition: None,
            children: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }

    pub fn with_child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// Builds trees out of expressions through an [`AiRegistry`]
pub struct TreeBuilder {
    registry: Arc<AiRegistry>,
}

impl TreeBuilder {
    pub fn new(registry: Arc<AiRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<AiRegistry> {
        &self.registry
    }

    /// Build one node. A missing condition means `True`.
    pub fn node(
        &self,
        node_type: &str,
        name: &str,
        condition: Option<&str>,
        children: Vec<TreeNodeRef>,
    ) -> Result<TreeNodeRef> {
        let condition = match condition {
            Some(expr) if !expr.trim().is_empty() => self.registry.parse_condition(expr)?,
            _ => True::shared(),
        };
        self.registry
            .create_node_from_type(node_type, name, condition, children)
    }

    /// Build a tree bottom up
    pub fn build(&self, spec: &NodeSpec) -> Result<TreeNodeRef> {
        let children = spec
            .children
            .iter()
            .map(|child| self.build(child))
            .collect::<Result<Vec<_>>>()?;
        self.node(
            &spec.node_type,
            &spec.name,
            spec.condition.as_deref(),
            children,
        )
    }

    pub fn from_json(&self, json: &str) -> Result<TreeNodeRef> {
        let spec: NodeSpec =
            serde_json::from_str(json).map_err(|e| AiError::InvalidTree(e.to_string()))?;
        let root = self.build(&spec)?;
        debug!("Built tree '{}' with {} nodes", root.name(), node_count(&root));
        Ok(root)
    }
}
