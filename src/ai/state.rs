use rustc_hash::FxHashMap;

use crate::tree::{NodeId, TreeNodeStatus};

/// Per-AI bookkeeping of the nodes of a shared tree
///
/// `last_status` and `last_exec_millis` are only written while debugging is
/// active. The resume state (selector index, limit counter, timer) is always
/// kept because the tree semantics depend on it.
#[derive(Debug, Default)]
pub(crate) struct NodeStates {
    pub last_status: FxHashMap<NodeId, TreeNodeStatus>,
    pub last_exec_millis: FxHashMap<NodeId, i64>,
    pub selector: FxHashMap<NodeId, usize>,
    pub limit: FxHashMap<NodeId, u32>,
    pub timer: FxHashMap<NodeId, i64>,
}

impl NodeStates {
    pub fn clear(&mut self) {
        self.last_status.clear();
        self.last_exec_millis.clear();
        self.selector.clear();
        self.limit.clear();
        self.timer.clear();
    }

    /// Forget the resume state of one node; limit counters are kept
    pub fn reset_node(&mut self, id: NodeId) {
        self.selector.remove(&id);
        self.timer.remove(&id);
    }
}
