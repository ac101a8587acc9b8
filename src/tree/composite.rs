//! Composite nodes: sequences, selectors and parallel execution
//!
//! Selectors remember the child that returned `Running` in the executing
//! AI (the selector state) and resume it on the next tick instead of
//! starting over from the first child.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;

use crate::ai::Ai;
use crate::error::{AiError, Result};
use crate::tree::{NodeCore, TreeNode, TreeNodeRef, TreeNodeStatus};

/// Store or clear the resume index depending on the child's status
fn remember(core: &NodeCore, ai: &Ai, index: usize, status: TreeNodeStatus) {
    if status == TreeNodeStatus::Running {
        ai.set_selector_state(core.id(), Some(index));
    } else {
        ai.set_selector_state(core.id(), None);
    }
}

/// Reset the previously running child when a different one takes over
fn reset_previous(core: &NodeCore, ai: &Ai, previous: Option<usize>, chosen: Option<usize>) {
    if let Some(previous) = previous {
        if Some(previous) != chosen {
            if let Some(child) = core.children().get(previous) {
                child.reset_state(ai);
            }
        }
    }
}

/// Executes its children in order until one does not finish
///
/// `Running` children are resumed on the next tick. The sequence finishes
/// once every child finished; it fails as soon as one child fails or cannot
/// execute. An `Exception` from a child is passed through.
pub struct Sequence {
    core: NodeCore,
}

impl Sequence {
    pub const KIND: &'static str = "Sequence";

    pub fn new(name: &str, children: Vec<TreeNodeRef>) -> Self {
        Self::from_core(NodeCore::new(Self::KIND, name).with_children(children))
    }

    pub fn from_core(core: NodeCore) -> Self {
        Self { core }
    }
}

impl TreeNode for Sequence {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus {
        if !self.core.enter(ai) {
            return self.core.state(ai, TreeNodeStatus::CannotExecute);
        }

        let start = ai.selector_state(self.core.id()).unwrap_or(0);
        for (index, child) in self.core.children().iter().enumerate().skip(start) {
            match child.execute(ai, delta_millis) {
                TreeNodeStatus::Finished => continue,
                TreeNodeStatus::Running => {
                    remember(&self.core, ai, index, TreeNodeStatus::Running);
                    return self.core.state(ai, TreeNodeStatus::Running);
                }
                status => {
                    self.reset_state(ai);
                    let status = if status == TreeNodeStatus::Exception {
                        TreeNodeStatus::Exception
                    } else {
                        TreeNodeStatus::Failed
                    };
                    return self.core.state(ai, status);
                }
            }
        }

        self.reset_state(ai);
        self.core.state(ai, TreeNodeStatus::Finished)
    }
}

/// Executes the first child that is able to execute
///
/// A running child is resumed first. If it can no longer execute, the
/// children are scanned in order again. Fails when no child can execute.
pub struct PrioritySelector {
    core: NodeCore,
}

impl PrioritySelector {
    pub const KIND: &'static str = "PrioritySelector";

    pub fn new(name: &str, children: Vec<TreeNodeRef>) -> Self {
        Self::from_core(NodeCore::new(Self::KIND, name).with_children(children))
    }

    pub fn from_core(core: NodeCore) -> Self {
        Self { core }
    }
}

impl TreeNode for PrioritySelector {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus {
        if !self.core.enter(ai) {
            return self.core.state(ai, TreeNodeStatus::CannotExecute);
        }

        let children = self.core.children();
        let previous = ai.selector_state(self.core.id());
        let order = previous
            .into_iter()
            .chain((0..children.len()).filter(|i| Some(*i) != previous));

        for index in order {
            let Some(child) = children.get(index) else {
                continue;
            };
            let status = child.execute(ai, delta_millis);
            if status == TreeNodeStatus::CannotExecute {
                continue;
            }
            reset_previous(&self.core, ai, previous, Some(index));
            remember(&self.core, ai, index, status);
            return self.core.state(ai, status);
        }

        reset_previous(&self.core, ai, previous, None);
        ai.set_selector_state(self.core.id(), None);
        self.core.state(ai, TreeNodeStatus::Failed)
    }
}

/// Executes one randomly chosen child that is able to execute
///
/// The pick is kept while the child is running.
pub struct RandomSelector {
    core: NodeCore,
}

impl RandomSelector {
    pub const KIND: &'static str = "RandomSelector";

    pub fn new(name: &str, children: Vec<TreeNodeRef>) -> Self {
        Self::from_core(NodeCore::new(Self::KIND, name).with_children(children))
    }

    pub fn from_core(core: NodeCore) -> Self {
        Self { core }
    }
}

impl TreeNode for RandomSelector {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus {
        if !self.core.enter(ai) {
            return self.core.state(ai, TreeNodeStatus::CannotExecute);
        }

        let children = self.core.children();
        let previous = ai.selector_state(self.core.id());
        let mut order: Vec<usize> = (0..children.len()).filter(|i| Some(*i) != previous).collect();
        order.shuffle(&mut rand::thread_rng());

        for index in previous.into_iter().chain(order) {
            let Some(child) = children.get(index) else {
                continue;
            };
            let status = child.execute(ai, delta_millis);
            if status == TreeNodeStatus::CannotExecute {
                continue;
            }
            reset_previous(&self.core, ai, previous, Some(index));
            remember(&self.core, ai, index, status);
            return self.core.state(ai, status);
        }

        reset_previous(&self.core, ai, previous, None);
        ai.set_selector_state(self.core.id(), None);
        self.core.state(ai, TreeNodeStatus::Failed)
    }
}

/// Executes one child picked by weight, e.g. `ProbabilitySelector{1,3}`
///
/// Only the picked child is tried; if it cannot execute the selector fails.
pub struct ProbabilitySelector {
    core: NodeCore,
    weights: WeightedIndex<f32>,
}

impl ProbabilitySelector {
    pub const KIND: &'static str = "ProbabilitySelector";

    pub fn new(name: &str, children: Vec<TreeNodeRef>, weights: &[f32]) -> Result<Self> {
        let parameters = weights
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self::from_core(
            NodeCore::new(Self::KIND, name)
                .with_parameters(&parameters)
                .with_children(children),
        )
    }

    /// Weights are read from the comma separated parameters, one per child
    pub fn from_core(core: NodeCore) -> Result<Self> {
        let weights = core
            .parameters()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f32>()
                    .map_err(|_| AiError::invalid_parameters(Self::KIND, format!("'{}' is not a weight", s)))
            })
            .collect::<Result<Vec<f32>>>()?;

        if weights.len() != core.children().len() {
            return Err(AiError::invalid_parameters(
                Self::KIND,
                format!(
                    "{} weights for {} children",
                    weights.len(),
                    core.children().len()
                ),
            ));
        }
        let weights = WeightedIndex::new(&weights)
            .map_err(|e| AiError::invalid_parameters(Self::KIND, e.to_string()))?;

        Ok(Self { core, weights })
    }
}

impl TreeNode for ProbabilitySelector {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus {
        if !self.core.enter(ai) {
            return self.core.state(ai, TreeNodeStatus::CannotExecute);
        }

        let index = match ai.selector_state(self.core.id()) {
            Some(index) => index,
            None => self.weights.sample(&mut rand::thread_rng()),
        };
        let Some(child) = self.core.children().get(index) else {
            ai.set_selector_state(self.core.id(), None);
            return self.core.state(ai, TreeNodeStatus::Failed);
        };

        let status = match child.execute(ai, delta_millis) {
            TreeNodeStatus::CannotExecute => TreeNodeStatus::Failed,
            status => status,
        };
        remember(&self.core, ai, index, status);
        self.core.state(ai, status)
    }
}

/// Executes every child on every tick
///
/// Runs while at least one child is running, finishes otherwise.
pub struct Parallel {
    core: NodeCore,
}

impl Parallel {
    pub const KIND: &'static str = "Parallel";

    pub fn new(name: &str, children: Vec<TreeNodeRef>) -> Self {
        Self::from_core(NodeCore::new(Self::KIND, name).with_children(children))
    }

    pub fn from_core(core: NodeCore) -> Self {
        Self { core }
    }
}

impl TreeNode for Parallel {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus {
        if !self.core.enter(ai) {
            return self.core.state(ai, TreeNodeStatus::CannotExecute);
        }

        let mut any_running = false;
        for child in self.core.children() {
            if child.execute(ai, delta_millis) == TreeNodeStatus::Running {
                any_running = true;
            }
        }

        let status = if any_running {
            TreeNodeStatus::Running
        } else {
            TreeNodeStatus::Finished
        };
        self.core.state(ai, status)
    }
}
