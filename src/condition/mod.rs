//! Conditions guarding tree nodes
//!
//! A node only executes when its condition holds for the executing AI.
//! [`Condition::describe`] renders the expression form accepted by the
//! parser, e.g. `And(Not(HasEnemies),IsInGroup{2})`.

use std::sync::{Arc, OnceLock};

use crate::ai::Ai;

mod entity;

pub use entity::{FilterCondition, HasEnemies, IsCloseToGroup, IsGroupLeader, IsInGroup};

pub type ConditionRef = Arc<dyn Condition>;

pub trait Condition: Send + Sync {
    fn name(&self) -> &str;

    /// Raw parameter string, empty when the condition takes none
    fn parameters(&self) -> String {
        String::new()
    }

    fn evaluate(&self, ai: &Ai) -> bool;

    fn describe(&self) -> String {
        describe(self.name(), &self.parameters(), &[])
    }
}

/// Render `Name{params}(sub,..)`, leaving out empty parts
pub(crate) fn describe(name: &str, parameters: &str, subs: &[String]) -> String {
    let mut out = name.to_string();
    if !parameters.is_empty() {
        out.push('{');
        out.push_str(parameters);
        out.push('}');
    }
    if !subs.is_empty() {
        out.push('(');
        out.push_str(&subs.join(","));
        out.push(')');
    }
    out
}

#[derive(Debug, Default, Clone, Copy)]
pub struct True;

impl True {
    pub const NAME: &'static str = "True";

    /// Process wide instance used as the default node condition
    pub fn shared() -> ConditionRef {
        static INSTANCE: OnceLock<ConditionRef> = OnceLock::new();
        INSTANCE.get_or_init(|| Arc::new(True)).clone()
    }
}

impl Condition for True {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, _ai: &Ai) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct False;

impl False {
    pub const NAME: &'static str = "False";

    pub fn shared() -> ConditionRef {
        static INSTANCE: OnceLock<ConditionRef> = OnceLock::new();
        INSTANCE.get_or_init(|| Arc::new(False)).clone()
    }
}

impl Condition for False {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, _ai: &Ai) -> bool {
        false
    }
}

/// Holds when every sub condition holds; an empty `And` holds
pub struct And {
    conditions: Vec<ConditionRef>,
}

impl And {
    pub const NAME: &'static str = "And";

    pub fn new(conditions: Vec<ConditionRef>) -> Self {
        Self { conditions }
    }
}

impl Condition for And {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, ai: &Ai) -> bool {
        self.conditions.iter().all(|c| c.evaluate(ai))
    }

    fn describe(&self) -> String {
        let subs: Vec<String> = self.conditions.iter().map(|c| c.describe()).collect();
        describe(Self::NAME, "", &subs)
    }
}

/// Holds when any sub condition holds; an empty `Or` does not
pub struct Or {
    conditions: Vec<ConditionRef>,
}

impl Or {
    pub const NAME: &'static str = "Or";

    pub fn new(conditions: Vec<ConditionRef>) -> Self {
        Self { conditions }
    }
}

impl Condition for Or {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, ai: &Ai) -> bool {
        self.conditions.iter().any(|c| c.evaluate(ai))
    }

    fn describe(&self) -> String {
        let subs: Vec<String> = self.conditions.iter().map(|c| c.describe()).collect();
        describe(Self::NAME, "", &subs)
    }
}

pub struct Not {
    condition: ConditionRef,
}

impl Not {
    pub const NAME: &'static str = "Not";

    pub fn new(condition: ConditionRef) -> Self {
        Self { condition }
    }
}

impl Condition for Not {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, ai: &Ai) -> bool {
        !self.condition.evaluate(ai)
    }

    fn describe(&self) -> String {
        describe(Self::NAME, "", &[self.condition.describe()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::test_util::*;
    use crate::tree::TreeNodeStatus;

    #[test]
    fn test_logic_conditions() {
        let ai = ai_with(leaf("root", TreeNodeStatus::Finished));

        assert!(True.evaluate(&ai));
        assert!(!False.evaluate(&ai));
        assert!(And::new(vec![]).evaluate(&ai));
        assert!(!Or::new(vec![]).evaluate(&ai));
        assert!(!And::new(vec![True::shared(), False::shared()]).evaluate(&ai));
        assert!(Or::new(vec![False::shared(), True::shared()]).evaluate(&ai));
        assert!(Not::new(False::shared()).evaluate(&ai));
    }

    #[test]
    fn test_describe_nested() {
        let inner: ConditionRef = Arc::new(Not::new(True::shared()));
        let cond = And::new(vec![inner, Arc::new(HasEnemies::new(2))]);
        assert_eq!(cond.describe(), "And(Not(True),HasEnemies{2})");
    }

    #[test]
    fn test_shared_instances_are_reused() {
        assert!(Arc::ptr_eq(&True::shared(), &True::shared()));
    }
}
