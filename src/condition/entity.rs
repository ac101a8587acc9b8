use crate::ai::Ai;
use crate::condition::{describe, Condition};
use crate::filter::FilterRef;
use crate::group::GroupId;

/// Holds when the aggro list has at least `amount` entries, e.g. `HasEnemies{2}`
pub struct HasEnemies {
    amount: usize,
}

impl HasEnemies {
    pub const NAME: &'static str = "HasEnemies";

    pub fn new(amount: usize) -> Self {
        Self { amount }
    }
}

impl Condition for HasEnemies {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> String {
        self.amount.to_string()
    }

    fn evaluate(&self, ai: &Ai) -> bool {
        ai.aggro_mgr().len() >= self.amount
    }
}

pub struct IsGroupLeader {
    group_id: GroupId,
}

impl IsGroupLeader {
    pub const NAME: &'static str = "IsGroupLeader";

    pub fn new(group_id: GroupId) -> Self {
        Self { group_id }
    }
}

impl Condition for IsGroupLeader {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> String {
        self.group_id.to_string()
    }

    fn evaluate(&self, ai: &Ai) -> bool {
        ai.zone()
            .is_some_and(|zone| zone.group_mgr().is_group_leader(self.group_id, ai))
    }
}

/// `IsInGroup{g}` checks one group, plain `IsInGroup` any group
pub struct IsInGroup {
    group_id: Option<GroupId>,
}

impl IsInGroup {
    pub const NAME: &'static str = "IsInGroup";

    pub fn new(group_id: Option<GroupId>) -> Self {
        Self { group_id }
    }
}

impl Condition for IsInGroup {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> String {
        self.group_id.map(|g| g.to_string()).unwrap_or_default()
    }

    fn evaluate(&self, ai: &Ai) -> bool {
        let Some(zone) = ai.zone() else {
            return false;
        };
        match self.group_id {
            Some(group_id) => zone.group_mgr().is_in_group(group_id, ai),
            None => zone.group_mgr().is_in_any_group(ai),
        }
    }
}

/// Holds when the character is within `distance` of the group's average
/// position, e.g. `IsCloseToGroup{1,10}`
pub struct IsCloseToGroup {
    group_id: GroupId,
    distance: f32,
}

impl IsCloseToGroup {
    pub const NAME: &'static str = "IsCloseToGroup";

    pub fn new(group_id: GroupId, distance: f32) -> Self {
        Self { group_id, distance }
    }
}

impl Condition for IsCloseToGroup {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> String {
        format!("{},{}", self.group_id, self.distance)
    }

    fn evaluate(&self, ai: &Ai) -> bool {
        let Some(character) = ai.character() else {
            return false;
        };
        let target = ai.get_group_position(self.group_id);
        if target.is_infinite() {
            return false;
        }
        character.position().distance_to(target) <= self.distance
    }
}

/// `Filter(f1,..)`: replaces the selection with the output of its filters
/// and holds when something was selected
pub struct FilterCondition {
    filters: Vec<FilterRef>,
}

impl FilterCondition {
    pub const NAME: &'static str = "Filter";

    pub fn new(filters: Vec<FilterRef>) -> Self {
        Self { filters }
    }
}

impl Condition for FilterCondition {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, ai: &Ai) -> bool {
        ai.clear_filtered_entities();
        for filter in &self.filters {
            filter.filter(ai);
        }
        !ai.filtered_entities().is_empty()
    }

    fn describe(&self) -> String {
        let subs: Vec<String> = self.filters.iter().map(|f| f.describe()).collect();
        describe(Self::NAME, "", &subs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SelectEmpty, SelectHighestAggro};
    use crate::tree::test_util::*;
    use crate::tree::TreeNodeStatus;
    use std::sync::Arc;

    #[test]
    fn test_has_enemies() {
        let ai = ai_with(leaf("root", TreeNodeStatus::Finished));
        let cond = HasEnemies::new(2);
        assert!(!cond.evaluate(&ai));

        ai.aggro_mgr().add_aggro(1, 1.0);
        ai.aggro_mgr().add_aggro(2, 1.0);
        assert!(cond.evaluate(&ai));
    }

    #[test]
    fn test_group_conditions_without_zone() {
        let ai = ai_with(leaf("root", TreeNodeStatus::Finished));
        assert!(!IsGroupLeader::new(1).evaluate(&ai));
        assert!(!IsInGroup::new(None).evaluate(&ai));
        assert!(!IsCloseToGroup::new(1, 100.0).evaluate(&ai));
    }

    #[test]
    fn test_filter_condition_selects() {
        let ai = ai_with(leaf("root", TreeNodeStatus::Finished));
        ai.add_filtered_entity(99);
        let cond = FilterCondition::new(vec![Arc::new(SelectHighestAggro)]);
        assert!(!cond.evaluate(&ai));
        assert!(ai.filtered_entities().is_empty());

        ai.aggro_mgr().add_aggro(4, 3.0);
        assert!(cond.evaluate(&ai));
        assert_eq!(ai.filtered_entities().as_slice(), &[4]);

        let empty = FilterCondition::new(vec![Arc::new(SelectHighestAggro), Arc::new(SelectEmpty)]);
        assert!(!empty.evaluate(&ai));
        assert_eq!(empty.describe(), "Filter(SelectHighestAggro,SelectEmpty)");
    }
}
