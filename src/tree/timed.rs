//! Nodes that run for a fixed amount of AI time
//!
//! The countdown is kept per AI (see `Ai::timer_state`), so one timed node
//! can be shared by many AIs that started it at different ticks.

use crate::ai::Ai;
use crate::error::{AiError, Result};
use crate::tree::{NodeCore, TreeNode, TreeNodeStatus};

/// Hooks called by [`TimedNode`] at the three phases of its countdown
pub trait TimedBehaviour: Send + Sync + 'static {
    /// First tick of a fresh countdown
    fn execute_start(&self, _ai: &Ai, _delta_millis: i64) -> TreeNodeStatus {
        TreeNodeStatus::Running
    }

    /// Ticks while time is left
    fn execute_running(&self, _ai: &Ai, _delta_millis: i64) -> TreeNodeStatus {
        TreeNodeStatus::Running
    }

    /// Tick on which the countdown ran out
    fn execute_expired(&self, _ai: &Ai, _delta_millis: i64) -> TreeNodeStatus {
        TreeNodeStatus::Finished
    }
}

/// Runs a [`TimedBehaviour`] for `millis` of AI time, parameters `{millis}`
///
/// A phase returning `Finished` early stops the countdown; the next
/// execution starts a new one.
pub struct TimedNode<B: TimedBehaviour> {
    core: NodeCore,
    millis: i64,
    behaviour: B,
}

impl<B: TimedBehaviour> TimedNode<B> {
    pub fn new(kind: &str, name: &str, millis: i64, behaviour: B) -> Self {
        Self {
            core: NodeCore::new(kind, name).with_parameters(&millis.to_string()),
            millis: millis.max(0),
            behaviour,
        }
    }

    pub fn from_core(core: NodeCore, behaviour: B) -> Result<Self> {
        let millis = core
            .parameters()
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|m| *m >= 0)
            .ok_or_else(|| {
                AiError::invalid_parameters(
                    core.kind(),
                    format!("'{}' is not a duration in millis", core.parameters()),
                )
            })?;
        Ok(Self {
            core,
            millis,
            behaviour,
        })
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }

    pub fn behaviour(&self) -> &B {
        &self.behaviour
    }

    fn finish_phase(&self, ai: &Ai, status: TreeNodeStatus) -> TreeNodeStatus {
        if status == TreeNodeStatus::Finished {
            ai.set_timer_state(self.core.id(), None);
        }
        self.core.state(ai, status)
    }
}

impl<B: TimedBehaviour> TreeNode for TimedNode<B> {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus {
        if !self.core.enter(ai) {
            return self.core.state(ai, TreeNodeStatus::CannotExecute);
        }

        let id = self.core.id();
        match ai.timer_state(id) {
            None => {
                ai.set_timer_state(id, Some(self.millis));
                let status = self.behaviour.execute_start(ai, delta_millis);
                self.finish_phase(ai, status)
            }
            Some(left) if left - delta_millis > 0 => {
                ai.set_timer_state(id, Some(left - delta_millis));
                let status = self.behaviour.execute_running(ai, delta_millis);
                self.finish_phase(ai, status)
            }
            Some(_) => {
                ai.set_timer_state(id, None);
                let status = self.behaviour.execute_expired(ai, delta_millis);
                self.core.state(ai, status)
            }
        }
    }
}

/// Behaviour of [`Idle`]: does nothing until the time is up
#[derive(Debug, Default, Clone, Copy)]
pub struct Wait;

impl TimedBehaviour for Wait {}

/// Waits for the given amount of millis, e.g. `Idle{1000}`
pub type Idle = TimedNode<Wait>;

impl TimedNode<Wait> {
    pub const KIND: &'static str = "Idle";

    pub fn idle(name: &str, millis: i64) -> Self {
        Self::new(Self::KIND, name, millis, Wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::test_util::*;
    use crate::tree::TreeNodeRef;
    use std::sync::Arc;

    #[test]
    fn test_idle_runs_until_expired() {
        let idle: TreeNodeRef = Arc::new(Idle::idle("wait", 100));
        let ai = ai_with(idle.clone());

        assert_eq!(idle.execute(&ai, 40), TreeNodeStatus::Running);
        assert_eq!(ai.timer_state(idle.id()), Some(100));
        assert_eq!(idle.execute(&ai, 40), TreeNodeStatus::Running);
        assert_eq!(ai.timer_state(idle.id()), Some(60));
        assert_eq!(idle.execute(&ai, 40), TreeNodeStatus::Running);
        assert_eq!(idle.execute(&ai, 40), TreeNodeStatus::Finished);
        assert_eq!(ai.timer_state(idle.id()), None);

        // A new countdown starts afterwards
        assert_eq!(idle.execute(&ai, 40), TreeNodeStatus::Running);
    }

    #[test]
    fn test_idle_timers_are_per_ai() {
        let idle: TreeNodeRef = Arc::new(Idle::idle("wait", 50));
        let first = ai_with(idle.clone());
        let second = ai_with(idle.clone());

        idle.execute(&first, 10);
        idle.execute(&first, 10);
        assert_eq!(first.timer_state(idle.id()), Some(40));
        assert_eq!(second.timer_state(idle.id()), None);
    }

    #[test]
    fn test_reset_state_clears_timer() {
        let idle: TreeNodeRef = Arc::new(Idle::idle("wait", 50));
        let ai = ai_with(idle.clone());

        idle.execute(&ai, 10);
        idle.reset_state(&ai);
        assert_eq!(ai.timer_state(idle.id()), None);
    }

    struct Quick;

    impl TimedBehaviour for Quick {
        fn execute_start(&self, _ai: &Ai, _delta_millis: i64) -> TreeNodeStatus {
            TreeNodeStatus::Finished
        }
    }

    #[test]
    fn test_finished_start_stops_countdown() {
        let node: TreeNodeRef = Arc::new(TimedNode::new("Quick", "quick", 1000, Quick));
        let ai = ai_with(node.clone());

        assert_eq!(node.execute(&ai, 10), TreeNodeStatus::Finished);
        assert_eq!(ai.timer_state(node.id()), None);
    }

    #[test]
    fn test_from_core_rejects_negative_millis() {
        let core = NodeCore::new(Idle::KIND, "wait").with_parameters("-5");
        assert!(Idle::from_core(core, Wait).is_err());
    }
}
