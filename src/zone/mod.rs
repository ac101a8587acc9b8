//! A simulated world partition
//!
//! The zone owns the AIs of one partition and their [`GroupMgr`]. Adding and
//! removing AIs is scheduled and applied at the start of the next `update`,
//! so a tree node may spawn or despawn entities in the middle of a tick.
//! AIs are then updated in parallel on the zone's own rayon pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use crossbeam_channel::Receiver;
use hashbrown::HashMap;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::ai::AiRef;
use crate::character::{CharacterId, AI_NOTHING_SELECTED};
use crate::error::{AiError, Result};
use crate::group::GroupMgr;
use crate::metrics::ZoneMetrics;
use crate::sync::ReadWriteLock;

#[derive(Default)]
struct Schedules {
    add: Vec<AiRef>,
    remove: Vec<AiRef>,
    destroy: Vec<CharacterId>,
}

pub struct Zone {
    name: String,
    ais: ReadWriteLock<HashMap<CharacterId, AiRef>>,
    schedules: ReadWriteLock<Schedules>,
    debug: AtomicBool,
    group_mgr: GroupMgr,
    pool: ThreadPool,
    metrics: ZoneMetrics,
    this: Weak<Zone>,
}

impl Zone {
    /// Create a zone whose AIs are ticked by `threads` workers
    pub fn new(name: &str, threads: usize) -> Result<Arc<Zone>> {
        let thread_prefix = name.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(move |i| format!("zone-{}-{}", thread_prefix, i))
            .build()
            .map_err(|e| AiError::InvalidConfig(format!("zone thread pool: {}", e)))?;

        Ok(Arc::new_cyclic(|this| Zone {
            name: name.to_string(),
            ais: ReadWriteLock::new("zone", HashMap::new()),
            schedules: ReadWriteLock::new("zone-schedulelock", Schedules::default()),
            debug: AtomicBool::new(false),
            group_mgr: GroupMgr::new(),
            pool,
            metrics: ZoneMetrics::new(),
            this: this.clone(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schedule `ai` to join the zone on the next update
    ///
    /// Returns false for AIs without a character.
    pub fn add_ai(&self, ai: AiRef) -> bool {
        if ai.get_id() == AI_NOTHING_SELECTED {
            return false;
        }
        self.schedules.lock_write().add.push(ai);
        true
    }

    /// Schedule `ai` to leave the zone on the next update
    pub fn remove_ai(&self, ai: AiRef) -> bool {
        if ai.get_id() == AI_NOTHING_SELECTED {
            return false;
        }
        self.schedules.lock_write().remove.push(ai);
        true
    }

    /// Schedule the AI with `id` to leave the zone on the next update
    pub fn destroy_ai(&self, id: CharacterId) -> bool {
        if id == AI_NOTHING_SELECTED {
            return false;
        }
        self.schedules.lock_write().destroy.push(id);
        true
    }

    /// Apply pending schedules, tick every AI in parallel, then refresh the
    /// group positions
    pub fn update(&self, delta_millis: i64) {
        let start = Instant::now();
        self.apply_schedules();

        let debug = self.is_debug();
        let ais = self.snapshot();
        self.pool
            .install(|| ais.par_iter().for_each(|ai| ai.update(delta_millis, debug)));

        self.group_mgr.update(delta_millis);

        self.metrics
            .ai_updates
            .fetch_add(ais.len() as u64, Ordering::Relaxed);
        self.metrics
            .ai_count
            .store(ais.len() as u64, Ordering::Relaxed);
        self.metrics
            .group_count
            .store(self.group_mgr.group_count() as u64, Ordering::Relaxed);
        self.metrics.record_tick_time(start.elapsed());
    }

    fn apply_schedules(&self) {
        let Schedules {
            add,
            remove,
            destroy,
        } = std::mem::take(&mut *self.schedules.lock_write());
        if add.is_empty() && remove.is_empty() && destroy.is_empty() {
            return;
        }

        let mut left = Vec::new();
        {
            let mut ais = self.ais.lock_write();
            for ai in add {
                let id = ai.get_id();
                if ais.contains_key(&id) {
                    debug!("Zone {}: AI {} is already present", self.name, id);
                    continue;
                }
                ai.attach_zone(self.this.clone());
                ais.insert(id, ai);
                self.metrics.ais_added.fetch_add(1, Ordering::Relaxed);
                debug!("Zone {}: added AI {}", self.name, id);
            }

            for ai in remove {
                let id = ai.get_id();
                let same = ais.get(&id).is_some_and(|present| Arc::ptr_eq(present, &ai));
                if let Some(removed) = same.then(|| ais.remove(&id)).flatten() {
                    self.metrics.ais_removed.fetch_add(1, Ordering::Relaxed);
                    debug!("Zone {}: removed AI {}", self.name, id);
                    left.push(removed);
                }
            }

            for id in destroy {
                if let Some(removed) = ais.remove(&id) {
                    self.metrics.ais_destroyed.fetch_add(1, Ordering::Relaxed);
                    debug!("Zone {}: destroyed AI {}", self.name, id);
                    left.push(removed);
                }
            }
        }

        for ai in left {
            self.group_mgr.remove_from_all_groups(&ai);
            ai.attach_zone(Weak::new());
        }
    }

    fn snapshot(&self) -> Vec<AiRef> {
        self.ais.lock_read().values().cloned().collect()
    }

    pub fn get_ai(&self, id: CharacterId) -> Option<AiRef> {
        self.ais.lock_read().get(&id).cloned()
    }

    /// Number of AIs currently in the zone; scheduled adds are not counted
    pub fn size(&self) -> usize {
        self.ais.lock_read().len()
    }

    /// Call `func` for every AI while holding the zone lock
    ///
    /// `func` must not call back into methods of this zone that lock the
    /// AI map (`get_ai`, `size`, `execute`).
    pub fn execute<F>(&self, mut func: F)
    where
        F: FnMut(&AiRef),
    {
        let ais = self.ais.lock_read();
        for ai in ais.values() {
            func(ai);
        }
    }

    /// Call `func` for every AI on the zone's pool and wait for all of them
    pub fn execute_parallel<F>(&self, func: F)
    where
        F: Fn(&AiRef) + Send + Sync,
    {
        let ais = self.snapshot();
        self.pool.install(|| ais.par_iter().for_each(|ai| func(ai)));
    }

    /// Call `func` for the AI with `id`
    ///
    /// The zone lock is released before `func` runs. Returns `None` if no
    /// such AI is in the zone.
    pub fn execute_on<F, R>(&self, id: CharacterId, func: F) -> Option<R>
    where
        F: FnOnce(&AiRef) -> R,
    {
        let ai = self.get_ai(id)?;
        Some(func(&ai))
    }

    /// Run `func` for the AI with `id` on the zone's pool without waiting
    ///
    /// The result arrives on the returned channel. Returns `None` if no such
    /// AI is in the zone.
    pub fn execute_async<F, R>(&self, id: CharacterId, func: F) -> Option<Receiver<R>>
    where
        F: FnOnce(&AiRef) -> R + Send + 'static,
        R: Send + 'static,
    {
        let ai = self.get_ai(id)?;
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.pool.spawn(move || {
            // the caller may have dropped the receiver
            let _ = tx.send(func(&ai));
        });
        Some(rx)
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Release);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Acquire)
    }

    pub fn group_mgr(&self) -> &GroupMgr {
        &self.group_mgr
    }

    pub fn metrics(&self) -> &ZoneMetrics {
        &self.metrics
    }
}
