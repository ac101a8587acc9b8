//! Behaviour tree nodes
//!
//! Trees are immutable once built and shared between many `Ai` instances
//! through [`TreeNodeRef`]. A node never stores per-entity state on itself:
//! resume indices, limit counters and timers are kept in the executing
//! `Ai`, keyed by the node's [`NodeId`].

use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::ai::Ai;
use crate::condition::{ConditionRef, True};

pub mod composite;
pub mod decorator;
pub mod steer;
pub mod task;
pub mod timed;

pub use composite::{Parallel, PrioritySelector, ProbabilitySelector, RandomSelector, Sequence};
pub use decorator::{Fail, Invert, Limit, Succeed};
pub use steer::Steer;
pub use task::{Task, TaskFn};
pub use timed::{Idle, TimedBehaviour, TimedNode, Wait};

/// Node identifier, unique across every tree built in this process
pub type NodeId = i32;

pub type TreeNodeRef = Arc<dyn TreeNode>;

static NEXT_NODE_ID: AtomicI32 = AtomicI32::new(0);

/// Allocate a fresh node id
pub fn next_node_id() -> NodeId {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Result of evaluating one node for one AI on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TreeNodeStatus {
    /// The node's condition did not hold
    CannotExecute,
    /// Still working; resume next tick
    Running,
    Finished,
    Failed,
    /// The node's action failed unexpectedly
    Exception,
}

impl TreeNodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeNodeStatus::CannotExecute => "CANNOTEXECUTE",
            TreeNodeStatus::Running => "RUNNING",
            TreeNodeStatus::Finished => "FINISHED",
            TreeNodeStatus::Failed => "FAILED",
            TreeNodeStatus::Exception => "EXCEPTION",
        }
    }
}

impl fmt::Display for TreeNodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data every node kind shares
pub struct NodeCore {
    id: NodeId,
    name: String,
    kind: String,
    parameters: String,
    condition: ConditionRef,
    children: Vec<TreeNodeRef>,
}

impl NodeCore {
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            id: next_node_id(),
            name: name.to_string(),
            kind: kind.to_string(),
            parameters: String::new(),
            condition: True::shared(),
            children: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: &str) -> Self {
        self.parameters = parameters.to_string();
        self
    }

    pub fn with_condition(mut self, condition: ConditionRef) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_children(mut self, children: Vec<TreeNodeRef>) -> Self {
        self.children = children;
        self
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    pub fn condition(&self) -> &ConditionRef {
        &self.condition
    }

    pub fn children(&self) -> &[TreeNodeRef] {
        &self.children
    }

    /// Common prologue of `execute`: stamps the execution time while
    /// debugging and evaluates the node's condition.
    pub fn enter(&self, ai: &Ai) -> bool {
        ai.record_exec(self.id);
        self.condition.evaluate(ai)
    }

    /// Record `status` as this node's last status for `ai` and return it
    #[inline]
    pub fn state(&self, ai: &Ai, status: TreeNodeStatus) -> TreeNodeStatus {
        ai.record_status(self.id, status);
        status
    }
}

impl fmt::Debug for NodeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .field("condition", &self.condition.describe())
            .field("children", &self.children.len())
            .finish()
    }
}

/// A behaviour tree node
pub trait TreeNode: Send + Sync {
    fn core(&self) -> &NodeCore;

    /// Evaluate this node for `ai`
    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus;

    /// Forget the per-AI resume state of this subtree. Limit counters survive.
    fn reset_state(&self, ai: &Ai) {
        ai.reset_node_state(self.id());
        for child in self.children() {
            child.reset_state(ai);
        }
    }

    fn id(&self) -> NodeId {
        self.core().id()
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn kind(&self) -> &str {
        self.core().kind()
    }

    fn parameters(&self) -> &str {
        self.core().parameters()
    }

    fn condition(&self) -> &ConditionRef {
        self.core().condition()
    }

    fn children(&self) -> &[TreeNodeRef] {
        self.core().children()
    }

    /// Depth first search for a descendant with the given id
    fn find_child(&self, id: NodeId) -> Option<TreeNodeRef> {
        for child in self.children() {
            if child.id() == id {
                return Some(child.clone());
            }
            if let Some(found) = child.find_child(id) {
                return Some(found);
            }
        }
        None
    }
}

/// Find the node with `id` in the tree below (and including) `root`
pub fn find_node(root: &TreeNodeRef, id: NodeId) -> Option<TreeNodeRef> {
    if root.id() == id {
        return Some(root.clone());
    }
    root.find_child(id)
}

/// Find the parent of the node with `id`; `None` for the root or unknown ids
pub fn find_parent(root: &TreeNodeRef, id: NodeId) -> Option<TreeNodeRef> {
    for child in root.children() {
        if child.id() == id {
            return Some(root.clone());
        }
        if let Some(parent) = find_parent(child, id) {
            return Some(parent);
        }
    }
    None
}

/// Number of nodes in the tree below (and including) `root`
pub fn node_count(root: &TreeNodeRef) -> usize {
    1 + root.children().iter().map(node_count).sum::<usize>()
}
