use std::sync::Arc;

use tracing::warn;

use crate::ai::Ai;
use crate::character::Character;
use crate::error::TaskError;
use crate::tree::{NodeCore, TreeNode, TreeNodeStatus};

/// Action run by a [`Task`] leaf
pub type TaskFn =
    Arc<dyn Fn(&Ai, &dyn Character, i64) -> Result<TreeNodeStatus, TaskError> + Send + Sync>;

/// Leaf node running a host supplied action against the AI's character
///
/// An action error is logged and reported as `Exception`; it never unwinds
/// the tick. Without an attached character the task reports `Failed`.
pub struct Task {
    core: NodeCore,
    action: TaskFn,
}

impl Task {
    pub const KIND: &'static str = "Task";

    pub fn new<F>(name: &str, action: F) -> Self
    where
        F: Fn(&Ai, &dyn Character, i64) -> Result<TreeNodeStatus, TaskError>
            + Send
            + Sync
            + 'static,
    {
        Self::from_core(NodeCore::new(Self::KIND, name), Arc::new(action))
    }

    /// Build from a prepared core, used by registry factories that carry
    /// their own kind name, parameters and condition
    pub fn from_core(core: NodeCore, action: TaskFn) -> Self {
        Self { core, action }
    }
}

impl TreeNode for Task {
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

        match (self.action)(ai, character.as_ref(), delta_millis) {
            Ok(status) => self.core.state(ai, status),
            Err(e) => {
                warn!(
                    "Task '{}' ({}) of character {} failed: {}",
                    self.core.name(),
                    self.core.id(),
                    character.id(),
                    e
                );
                self.core.state(ai, TreeNodeStatus::Exception)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::False;
    use crate::tree::test_util::*;

    #[test]
    fn test_task_returns_action_status() {
        let node = leaf("ok", TreeNodeStatus::Finished);
        let ai = ai_with(node.clone());
        assert_eq!(node.execute(&ai, 10), TreeNodeStatus::Finished);
    }

    #[test]
    fn test_task_error_maps_to_exception() {
        let node = broken("bad");
        let ai = ai_with(node.clone());
        ai.update(10, true);
        assert_eq!(ai.last_status(node.id()), Some(TreeNodeStatus::Exception));
    }

    #[test]
    fn test_task_without_character_fails() {
        let node = leaf("ok", TreeNodeStatus::Finished);
        let ai = Ai::shared(node.clone());
        assert_eq!(node.execute(&ai, 10), TreeNodeStatus::Failed);
    }

    #[test]
    fn test_task_condition_blocks_execution() {
        let node: crate::tree::TreeNodeRef = Arc::new(Task::from_core(
            NodeCore::new(Task::KIND, "blocked").with_condition(False::shared()),
            Arc::new(|_ai: &Ai, _chr: &dyn Character, _dt: i64| {
                Ok::<_, TaskError>(TreeNodeStatus::Finished)
            }),
        ));
        let ai = ai_with(node.clone());
        assert_eq!(node.execute(&ai, 10), TreeNodeStatus::CannotExecute);
    }

    #[test]
    fn test_task_sees_character() {
        let node: crate::tree::TreeNodeRef = Arc::new(Task::new("move", |_ai, chr, _dt| {
            chr.set_speed(3.0);
            Ok(TreeNodeStatus::Finished)
        }));
        let ai = ai_with(node.clone());
        node.execute(&ai, 10);
        assert_eq!(ai.character().unwrap().speed(), 3.0);
    }
}
