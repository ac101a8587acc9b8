//! Single child decorators

use crate::ai::Ai;
use crate::error::{AiError, Result};
use crate::tree::{NodeCore, TreeNode, TreeNodeRef, TreeNodeStatus};

fn check_children(core: &NodeCore, expected: &'static str, ok: bool) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(AiError::InvalidChildCount {
            kind: core.kind().to_string(),
            expected,
            actual: core.children().len(),
        })
    }
}

/// Swaps `Finished` and `Failed` of its only child
pub struct Invert {
    core: NodeCore,
}

impl Invert {
    pub const KIND: &'static str = "Invert";

    pub fn new(name: &str, child: TreeNodeRef) -> Self {
        Self {
            core: NodeCore::new(Self::KIND, name).with_children(vec![child]),
        }
    }

    pub fn from_core(core: NodeCore) -> Result<Self> {
        check_children(&core, "exactly one", core.children().len() == 1)?;
        Ok(Self { core })
    }
}

impl TreeNode for Invert {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus {
        if !self.core.enter(ai) {
            return self.core.state(ai, TreeNodeStatus::CannotExecute);
        }
        let status = match self.core.children().first() {
            Some(child) => match child.execute(ai, delta_millis) {
                TreeNodeStatus::Finished => TreeNodeStatus::Failed,
                TreeNodeStatus::Failed => TreeNodeStatus::Finished,
                status => status,
            },
            None => TreeNodeStatus::Failed,
        };
        self.core.state(ai, status)
    }
}

/// Runs its optional child and always reports `Finished`
pub struct Succeed {
    core: NodeCore,
}

impl Succeed {
    pub const KIND: &'static str = "Succeed";

    pub fn new(name: &str, child: Option<TreeNodeRef>) -> Self {
        Self {
            core: NodeCore::new(Self::KIND, name).with_children(child.into_iter().collect()),
        }
    }

    pub fn from_core(core: NodeCore) -> Result<Self> {
        check_children(&core, "at most one", core.children().len() <= 1)?;
        Ok(Self { core })
    }
}

impl TreeNode for Succeed {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus {
        if !self.core.enter(ai) {
            return self.core.state(ai, TreeNodeStatus::CannotExecute);
        }
        if let Some(child) = self.core.children().first() {
            child.execute(ai, delta_millis);
        }
        self.core.state(ai, TreeNodeStatus::Finished)
    }
}

/// Runs its optional child and always reports `Failed`
pub struct Fail {
    core: NodeCore,
}

impl Fail {
    pub const KIND: &'static str = "Fail";

    pub fn new(name: &str, child: Option<TreeNodeRef>) -> Self {
        Self {
            core: NodeCore::new(Self::KIND, name).with_children(child.into_iter().collect()),
        }
    }

    pub fn from_core(core: NodeCore) -> Result<Self> {
        check_children(&core, "at most one", core.children().len() <= 1)?;
        Ok(Self { core })
    }
}

impl TreeNode for Fail {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus {
        if !self.core.enter(ai) {
            return self.core.state(ai, TreeNodeStatus::CannotExecute);
        }
        if let Some(child) = self.core.children().first() {
            child.execute(ai, delta_millis);
        }
        self.core.state(ai, TreeNodeStatus::Failed)
    }
}

/// Lets its child execute at most `amount` times per AI, e.g. `Limit{3}`
///
/// Once exhausted the node reports `Finished` without touching the child.
/// The counter is not cleared by `reset_state`; only a tree swap clears it.
pub struct Limit {
    core: NodeCore,
    amount: u32,
}

impl Limit {
    pub const KIND: &'static str = "Limit";

    pub fn new(name: &str, amount: u32, child: TreeNodeRef) -> Self {
        Self {
            core: NodeCore::new(Self::KIND, name)
                .with_parameters(&amount.to_string())
                .with_children(vec![child]),
            amount,
        }
    }

    pub fn from_core(core: NodeCore) -> Result<Self> {
        check_children(&core, "exactly one", core.children().len() == 1)?;
        let amount = core.parameters().trim().parse::<u32>().map_err(|_| {
            AiError::invalid_parameters(
                Self::KIND,
                format!("'{}' is not an execution count", core.parameters()),
            )
        })?;
        Ok(Self { core, amount })
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }
}

impl TreeNode for Limit {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn execute(&self, ai: &Ai, delta_millis: i64) -> TreeNodeStatus {
        if !self.core.enter(ai) {
            return self.core.state(ai, TreeNodeStatus::CannotExecute);
        }
        let executed = ai.limit_state(self.core.id());
        if executed >= self.amount {
            return self.core.state(ai, TreeNodeStatus::Finished);
        }
        let Some(child) = self.core.children().first() else {
            return self.core.state(ai, TreeNodeStatus::Failed);
        };
        let status = child.execute(ai, delta_millis);
        ai.set_limit_state(self.core.id(), executed + 1);
        self.core.state(ai, status)
    }
}
