//! The per entity controller
//!
//! An [`Ai`] ticks one behaviour tree against one [`Character`]. Trees are
//! shared between AIs, so every piece of state a node needs across ticks
//! (selector resume index, limit counter, timer) lives here, keyed by
//! [`NodeId`].
//!
//! `update` is never called concurrently for the same AI. Zones guarantee
//! this; hosts driving AIs by hand must do the same.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::debug;

use crate::aggro::AggroMgr;
use crate::character::{CharacterId, CharacterRef, AI_NOTHING_SELECTED};
use crate::group::GroupId;
use crate::sync::{ReadWriteLock, ScopedWriteLock};
use crate::tree::{NodeId, TreeNodeRef, TreeNodeStatus};
use crate::util::vec3::Vec3;
use crate::zone::Zone;

mod snapshot;
mod state;

pub use snapshot::{AiStateSnapshot, NodeSnapshot};
use state::NodeStates;

pub type AiRef = Arc<Ai>;

/// Selection buffer written by filters and read by the nodes after them
pub type FilteredEntities = SmallVec<[CharacterId; 8]>;

pub struct Ai {
    behaviour: RwLock<TreeNodeRef>,
    character: RwLock<Option<CharacterRef>>,
    zone: RwLock<Weak<Zone>>,
    aggro: ReadWriteLock<AggroMgr>,
    states: ReadWriteLock<NodeStates>,
    filtered: ReadWriteLock<FilteredEntities>,
    time: AtomicI64,
    pause: AtomicBool,
    debugging_active: AtomicBool,
    reset: AtomicBool,
}

impl Ai {
    pub fn new(behaviour: TreeNodeRef) -> Self {
        Self {
            behaviour: RwLock::new(behaviour),
            character: RwLock::new(None),
            zone: RwLock::new(Weak::new()),
            aggro: ReadWriteLock::new("aggro", AggroMgr::new()),
            states: ReadWriteLock::new("nodestates", NodeStates::default()),
            filtered: ReadWriteLock::new("filteredentities", FilteredEntities::new()),
            time: AtomicI64::new(0),
            pause: AtomicBool::new(false),
            debugging_active: AtomicBool::new(false),
            reset: AtomicBool::new(false),
        }
    }

    pub fn shared(behaviour: TreeNodeRef) -> AiRef {
        Arc::new(Self::new(behaviour))
    }

    /// Advance this AI by one tick
    ///
    /// Order: character update, pending reset, aggro decay, tree walk. The
    /// root's status is not returned; it is visible through
    /// [`Ai::last_status`] while debugging.
    pub fn update(&self, delta_millis: i64, debugging_active: bool) {
        if self.is_pause() {
            return;
        }

        if let Some(character) = self.character() {
            character.update(delta_millis, debugging_active);
        }

        if self.reset.swap(false, Ordering::AcqRel) {
            self.states.with_write(NodeStates::clear);
            self.clear_filtered_entities();
        }

        self.debugging_active.store(debugging_active, Ordering::Release);
        self.time.fetch_add(delta_millis, Ordering::AcqRel);
        self.aggro.with_write(|aggro| aggro.update(delta_millis));

        let root = self.behaviour();
        root.execute(self, delta_millis);
    }

    /// Swap the behaviour tree and return the old one
    ///
    /// All node state is cleared lazily on the next `update`.
    pub fn set_behaviour(&self, behaviour: TreeNodeRef) -> TreeNodeRef {
        let old = std::mem::replace(&mut *self.behaviour.write(), behaviour);
        self.reset.store(true, Ordering::Release);
        debug!("AI {} changed behaviour from '{}'", self.get_id(), old.name());
        old
    }

    pub fn behaviour(&self) -> TreeNodeRef {
        self.behaviour.read().clone()
    }

    pub fn character(&self) -> Option<CharacterRef> {
        self.character.read().clone()
    }

    pub fn set_character(&self, character: Option<CharacterRef>) {
        *self.character.write() = character;
    }

    /// Character id, or `AI_NOTHING_SELECTED` without a character
    pub fn get_id(&self) -> CharacterId {
        self.character
            .read()
            .as_ref()
            .map_or(AI_NOTHING_SELECTED, |c| c.id())
    }

    pub fn zone(&self) -> Option<Arc<Zone>> {
        self.zone.read().upgrade()
    }

    pub fn has_zone(&self) -> bool {
        self.zone().is_some()
    }

    pub fn set_zone(&self, zone: Option<&Arc<Zone>>) {
        self.attach_zone(zone.map_or_else(Weak::new, Arc::downgrade));
    }

    pub(crate) fn attach_zone(&self, zone: Weak<Zone>) {
        *self.zone.write() = zone;
    }

    /// Average position of a group, `Vec3::INFINITE` when unknown
    pub fn get_group_position(&self, group_id: GroupId) -> Vec3 {
        if group_id < 0 {
            return Vec3::INFINITE;
        }
        self.zone()
            .map_or(Vec3::INFINITE, |zone| zone.group_mgr().get_position(group_id))
    }

    /// Position of the group leader's character, `Vec3::INFINITE` when unknown
    pub fn get_group_leader_position(&self, group_id: GroupId) -> Vec3 {
        if group_id < 0 {
            return Vec3::INFINITE;
        }
        self.zone()
            .and_then(|zone| zone.group_mgr().get_leader(group_id))
            .and_then(|leader| leader.character())
            .map_or(Vec3::INFINITE, |c| c.position())
    }

    pub fn set_pause(&self, pause: bool) {
        self.pause.store(pause, Ordering::Release);
    }

    pub fn is_pause(&self) -> bool {
        self.pause.load(Ordering::Acquire)
    }

    pub fn is_debugging_active(&self) -> bool {
        self.debugging_active.load(Ordering::Acquire)
    }

    /// Cumulative millis of all non paused updates
    pub fn time(&self) -> i64 {
        self.time.load(Ordering::Acquire)
    }

    /// Locked access to the aggro list
    ///
    /// Do not hold the guard across `update`; the lock is not reentrant.
    pub fn aggro_mgr(&self) -> ScopedWriteLock<'_, AggroMgr> {
        self.aggro.lock_write()
    }

    /// Copy of the current selection
    pub fn filtered_entities(&self) -> FilteredEntities {
        self.filtered.lock_read().clone()
    }

    pub fn add_filtered_entity(&self, id: CharacterId) {
        self.filtered.lock_write().push(id);
    }

    pub fn set_filtered_entities<I>(&self, ids: I)
    where
        I: IntoIterator<Item = CharacterId>,
    {
        let mut filtered = self.filtered.lock_write();
        filtered.clear();
        filtered.extend(ids);
    }

    pub fn clear_filtered_entities(&self) {
        self.filtered.lock_write().clear();
    }

    pub(crate) fn record_status(&self, node: NodeId, status: TreeNodeStatus) {
        if self.is_debugging_active() {
            self.states.lock_write().last_status.insert(node, status);
        }
    }

    pub(crate) fn record_exec(&self, node: NodeId) {
        if self.is_debugging_active() {
            let now = self.time();
            self.states.lock_write().last_exec_millis.insert(node, now);
        }
    }

    /// Last status of a node, recorded while debugging was active
    pub fn last_status(&self, node: NodeId) -> Option<TreeNodeStatus> {
        self.states.lock_read().last_status.get(&node).copied()
    }

    /// AI time at which the node last executed while debugging was active
    pub fn last_exec_millis(&self, node: NodeId) -> Option<i64> {
        self.states.lock_read().last_exec_millis.get(&node).copied()
    }

    pub fn selector_state(&self, node: NodeId) -> Option<usize> {
        self.states.lock_read().selector.get(&node).copied()
    }

    pub fn set_selector_state(&self, node: NodeId, index: Option<usize>) {
        let mut states = self.states.lock_write();
        match index {
            Some(index) => states.selector.insert(node, index),
            None => states.selector.remove(&node),
        };
    }

    pub fn limit_state(&self, node: NodeId) -> u32 {
        self.states.lock_read().limit.get(&node).copied().unwrap_or(0)
    }

    pub fn set_limit_state(&self, node: NodeId, executed: u32) {
        self.states.lock_write().limit.insert(node, executed);
    }

    /// Millis left on a timed node's countdown, `None` when not started
    pub fn timer_state(&self, node: NodeId) -> Option<i64> {
        self.states.lock_read().timer.get(&node).copied()
    }

    pub fn set_timer_state(&self, node: NodeId, millis: Option<i64>) {
        let mut states = self.states.lock_write();
        match millis {
            Some(millis) => states.timer.insert(node, millis),
            None => states.timer.remove(&node),
        };
    }

    /// Forget the resume state of a single node
    pub fn reset_node_state(&self, node: NodeId) {
        self.states.lock_write().reset_node(node);
    }

    pub fn snapshot(&self) -> AiStateSnapshot {
        AiStateSnapshot::capture(self)
    }
}

impl fmt::Debug for Ai {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ai")
            .field("id", &self.get_id())
            .field("behaviour", &self.behaviour().name())
            .field("time", &self.time())
            .field("pause", &self.is_pause())
            .finish()
    }
}
