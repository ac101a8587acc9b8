//! Per zone group registry
//!
//! A group exists while it has at least one member. The member that created
//! a group leads it; when the leader leaves, the longest standing remaining
//! member takes over. The average position of each group is recomputed once
//! per tick by [`GroupMgr::update`].
//!
//! Every operation holds the registry lock for its whole duration. Callbacks
//! passed to [`GroupMgr::visit`] run under that lock and must not call back
//! into the same `GroupMgr`.

use hashbrown::{HashMap, HashSet};
use tracing::debug;

use crate::ai::{Ai, AiRef};
use crate::sync::ReadWriteLock;
use crate::util::vec3::Vec3;

pub type GroupId = i32;

/// Identity of an AI inside the registry: the address of the shared `Ai`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AiKey(usize);

impl AiKey {
    fn of(ai: &Ai) -> Self {
        AiKey(ai as *const Ai as usize)
    }
}

struct Member {
    ai: AiRef,
    /// Registry wide join sequence, lower joined earlier
    joined: u64,
}

struct Group {
    leader: AiKey,
    members: HashMap<AiKey, Member>,
    position: ReadWriteLock<Vec3>,
}

impl Group {
    fn leader(&self) -> Option<&AiRef> {
        self.members.get(&self.leader).map(|m| &m.ai)
    }

    /// Longest standing member
    fn oldest(&self) -> Option<AiKey> {
        self.members
            .iter()
            .min_by_key(|(_, member)| member.joined)
            .map(|(key, _)| *key)
    }

    fn mean_position(&self) -> Option<Vec3> {
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;
        for member in self.members.values() {
            if let Some(character) = member.ai.character() {
                sum += character.position();
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f32)
    }
}

#[derive(Default)]
struct Registry {
    groups: HashMap<GroupId, Group>,
    memberships: HashMap<AiKey, HashSet<GroupId>>,
    next_join: u64,
}

impl Registry {
    fn remove(&mut self, group_id: GroupId, key: AiKey) -> bool {
        let Some(group) = self.groups.get_mut(&group_id) else {
            return false;
        };
        if group.members.remove(&key).is_none() {
            return false;
        }

        if let Some(groups) = self.memberships.get_mut(&key) {
            groups.remove(&group_id);
            if groups.is_empty() {
                self.memberships.remove(&key);
            }
        }

        if group.members.is_empty() {
            self.groups.remove(&group_id);
            debug!("Group {} removed, no members left", group_id);
        } else if group.leader == key {
            if let Some(next) = group.oldest() {
                group.leader = next;
                let id = group.leader().map_or(-1, |ai| ai.get_id());
                debug!("Group {} elected {} as new leader", group_id, id);
            }
        }
        true
    }
}

/// Thread safe registry of the groups in one zone
pub struct GroupMgr {
    registry: ReadWriteLock<Registry>,
}

impl GroupMgr {
    pub fn new() -> Self {
        Self {
            registry: ReadWriteLock::new("groupmgr", Registry::default()),
        }
    }

    /// Add `ai` to a group, creating the group with `ai` as leader if needed
    ///
    /// Returns false if `ai` already is a member.
    pub fn add(&self, group_id: GroupId, ai: &AiRef) -> bool {
        let key = AiKey::of(ai);
        let mut registry = self.registry.lock_write();
        let joined = registry.next_join;

        let group = registry.groups.entry(group_id).or_insert_with(|| {
            let start = ai.character().map_or(Vec3::INFINITE, |c| c.position());
            debug!("Group {} created by {}", group_id, ai.get_id());
            Group {
                leader: key,
                members: HashMap::new(),
                position: ReadWriteLock::new("groupposition", start),
            }
        });
        if group.members.contains_key(&key) {
            return false;
        }
        group.members.insert(
            key,
            Member {
                ai: ai.clone(),
                joined,
            },
        );

        registry.next_join += 1;
        registry.memberships.entry(key).or_default().insert(group_id);
        true
    }

    /// Remove `ai` from a group. Returns false if it was not a member.
    pub fn remove(&self, group_id: GroupId, ai: &Ai) -> bool {
        self.registry.lock_write().remove(group_id, AiKey::of(ai))
    }

    /// Remove `ai` from every group it belongs to. Always returns true.
    pub fn remove_from_all_groups(&self, ai: &Ai) -> bool {
        let key = AiKey::of(ai);
        let mut registry = self.registry.lock_write();
        let groups: Vec<GroupId> = registry
            .memberships
            .get(&key)
            .map(|groups| groups.iter().copied().collect())
            .unwrap_or_default();
        for group_id in groups {
            registry.remove(group_id, key);
        }
        true
    }

    /// Recompute the average member position of every group
    ///
    /// Members without a character are left out; a group where no member
    /// has one keeps its previous position.
    pub fn update(&self, _delta_millis: i64) {
        let registry = self.registry.lock_read();
        for group in registry.groups.values() {
            if let Some(mean) = group.mean_position() {
                *group.position.lock_write() = mean;
            }
        }
    }

    /// Average position as of the last `update`, `Vec3::INFINITE` for
    /// unknown groups
    pub fn get_position(&self, group_id: GroupId) -> Vec3 {
        let registry = self.registry.lock_read();
        registry
            .groups
            .get(&group_id)
            .map_or(Vec3::INFINITE, |group| *group.position.lock_read())
    }

    pub fn get_leader(&self, group_id: GroupId) -> Option<AiRef> {
        let registry = self.registry.lock_read();
        registry
            .groups
            .get(&group_id)
            .and_then(|group| group.leader().cloned())
    }

    pub fn get_group_size(&self, group_id: GroupId) -> usize {
        let registry = self.registry.lock_read();
        registry
            .groups
            .get(&group_id)
            .map_or(0, |group| group.members.len())
    }

    pub fn is_in_any_group(&self, ai: &Ai) -> bool {
        self.registry
            .lock_read()
            .memberships
            .contains_key(&AiKey::of(ai))
    }

    pub fn is_in_group(&self, group_id: GroupId, ai: &Ai) -> bool {
        let registry = self.registry.lock_read();
        registry
            .groups
            .get(&group_id)
            .is_some_and(|group| group.members.contains_key(&AiKey::of(ai)))
    }

    pub fn is_group_leader(&self, group_id: GroupId, ai: &Ai) -> bool {
        let registry = self.registry.lock_read();
        registry
            .groups
            .get(&group_id)
            .is_some_and(|group| group.leader == AiKey::of(ai))
    }

    /// Call `func` for each member until it returns false
    pub fn visit<F>(&self, group_id: GroupId, mut func: F)
    where
        F: FnMut(&AiRef) -> bool,
    {
        let registry = self.registry.lock_read();
        let Some(group) = registry.groups.get(&group_id) else {
            return;
        };
        for member in group.members.values() {
            if !func(&member.ai) {
                break;
            }
        }
    }

    /// Groups `ai` is a member of, ascending
    pub fn group_ids_of(&self, ai: &Ai) -> Vec<GroupId> {
        let registry = self.registry.lock_read();
        let mut ids: Vec<GroupId> = registry
            .memberships
            .get(&AiKey::of(ai))
            .map(|groups| groups.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    pub fn group_count(&self) -> usize {
        self.registry.lock_read().groups.len()
    }
}

impl Default for GroupMgr {
    fn default() -> Self {
        Self::new()
    }
}
