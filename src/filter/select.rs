use crate::ai::Ai;
use crate::filter::Filter;
use crate::group::GroupId;

/// Clears the selection
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectEmpty;

impl SelectEmpty {
    pub const NAME: &'static str = "SelectEmpty";
}

impl Filter for SelectEmpty {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn filter(&self, ai: &Ai) {
        ai.clear_filtered_entities();
    }
}

/// Keeps the selection as it is
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectAll;

impl SelectAll {
    pub const NAME: &'static str = "SelectAll";
}

impl Filter for SelectAll {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn filter(&self, _ai: &Ai) {}
}

/// Selects the character with the highest aggro
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectHighestAggro;

impl SelectHighestAggro {
    pub const NAME: &'static str = "SelectHighestAggro";
}

impl Filter for SelectHighestAggro {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn filter(&self, ai: &Ai) {
        let highest = ai.aggro_mgr().highest_entry().map(|e| e.character_id);
        if let Some(id) = highest {
            ai.add_filtered_entity(id);
        }
    }
}

pub struct SelectGroupLeader {
    group_id: GroupId,
}

impl SelectGroupLeader {
    pub const NAME: &'static str = "SelectGroupLeader";

    pub fn new(group_id: GroupId) -> Self {
        Self { group_id }
    }
}

impl Filter for SelectGroupLeader {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> String {
        self.group_id.to_string()
    }

    fn filter(&self, ai: &Ai) {
        let Some(zone) = ai.zone() else {
            return;
        };
        if let Some(leader) = zone.group_mgr().get_leader(self.group_id) {
            ai.add_filtered_entity(leader.get_id());
        }
    }
}

/// Selects every member of a group, the AI itself included, ordered by id
pub struct SelectGroupMembers {
    group_id: GroupId,
}

impl SelectGroupMembers {
    pub const NAME: &'static str = "SelectGroupMembers";

    pub fn new(group_id: GroupId) -> Self {
        Self { group_id }
    }
}

impl Filter for SelectGroupMembers {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> String {
        self.group_id.to_string()
    }

    fn filter(&self, ai: &Ai) {
        let Some(zone) = ai.zone() else {
            return;
        };
        let mut ids = Vec::new();
        zone.group_mgr().visit(self.group_id, |member| {
            ids.push(member.get_id());
            true
        });
        ids.sort_unstable();
        for id in ids {
            ai.add_filtered_entity(id);
        }
    }
}

/// Selects every other AI of the zone, ordered by id
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectZone;

impl SelectZone {
    pub const NAME: &'static str = "SelectZone";
}

impl Filter for SelectZone {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn filter(&self, ai: &Ai) {
        let Some(zone) = ai.zone() else {
            return;
        };
        let own = ai.get_id();
        let mut ids = Vec::with_capacity(zone.size());
        zone.execute(|other| {
            let id = other.get_id();
            if id != own {
                ids.push(id);
            }
        });
        ids.sort_unstable();
        for id in ids {
            ai.add_filtered_entity(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::test_util::*;
    use crate::tree::TreeNodeStatus;

    #[test]
    fn test_select_highest_aggro_appends() {
        let ai = ai_with(leaf("root", TreeNodeStatus::Finished));
        ai.add_filtered_entity(8);
        ai.aggro_mgr().add_aggro(2, 1.0);
        ai.aggro_mgr().add_aggro(3, 5.0);

        SelectHighestAggro.filter(&ai);
        assert_eq!(ai.filtered_entities().as_slice(), &[8, 3]);

        SelectAll.filter(&ai);
        assert_eq!(ai.filtered_entities().len(), 2);

        SelectEmpty.filter(&ai);
        assert!(ai.filtered_entities().is_empty());
    }

    #[test]
    fn test_zone_filters_without_zone_select_nothing() {
        let ai = ai_with(leaf("root", TreeNodeStatus::Finished));
        SelectZone.filter(&ai);
        SelectGroupLeader::new(1).filter(&ai);
        SelectGroupMembers::new(1).filter(&ai);
        assert!(ai.filtered_entities().is_empty());
    }
}
