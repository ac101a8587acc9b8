//! Per-AI threat list
//!
//! Every entry accumulates aggro against one character and decays once per
//! tick according to its [`ReduceType`]. Entries that decay away (value at or
//! below zero, or below the ratio floor) are dropped during [`AggroMgr::update`].

use serde::Serialize;

use crate::character::CharacterId;

/// How an entry loses aggro over time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub enum ReduceType {
    /// Aggro stays until removed
    #[default]
    Disabled,
    /// Subtract a fixed amount per elapsed second
    ByValue { per_second: f32 },
    /// Lose `ratio_per_second` of the current value per elapsed second; drop
    /// the entry once it falls below `min_aggro`
    ByRatio { ratio_per_second: f32, min_aggro: f32 },
}

impl ReduceType {
    /// Negative rates would let aggro grow during decay, so they are clamped
    fn sanitized(self) -> Self {
        match self {
            ReduceType::Disabled => ReduceType::Disabled,
            ReduceType::ByValue { per_second } => ReduceType::ByValue {
                per_second: per_second.max(0.0),
            },
            ReduceType::ByRatio {
                ratio_per_second,
                min_aggro,
            } => ReduceType::ByRatio {
                ratio_per_second: ratio_per_second.clamp(0.0, 1.0),
                min_aggro,
            },
        }
    }
}

/// One target in the aggro list
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub character_id: CharacterId,
    pub aggro: f32,
    pub reduce: ReduceType,
    /// Creation order, used to break ties
    #[serde(skip)]
    created: u64,
}

impl Entry {
    /// Apply the decay for `delta_millis`. Returns false when the entry is gone.
    fn reduce(&mut self, delta_millis: i64) -> bool {
        let seconds = delta_millis as f32 / 1000.0;
        match self.reduce {
            ReduceType::Disabled => {}
            ReduceType::ByValue { per_second } => {
                self.aggro -= per_second * seconds;
            }
            ReduceType::ByRatio {
                ratio_per_second,
                min_aggro,
            } => {
                let factor = (1.0 - ratio_per_second * seconds).max(0.0);
                self.aggro *= factor;
                if self.aggro < min_aggro {
                    return false;
                }
            }
        }
        self.aggro > 0.0
    }

    /// Ordering key: higher aggro first, then the newer entry
    #[inline]
    fn rank(&self) -> (f32, u64) {
        (self.aggro, self.created)
    }
}

/// Decaying threat list owned by one `Ai`
#[derive(Debug, Default)]
pub struct AggroMgr {
    entries: Vec<Entry>,
    reduce: ReduceType,
    next_created: u64,
}

impl AggroMgr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decay every entry by `delta_millis` and drop the ones that ran out
    pub fn update(&mut self, delta_millis: i64) {
        if delta_millis <= 0 || self.entries.is_empty() {
            return;
        }
        self.entries.retain_mut(|entry| entry.reduce(delta_millis));
    }

    /// Add aggro against `character_id`, creating the entry with the manager's
    /// current reduce type if needed. An existing entry keeps its own decay.
    /// Returns the resulting aggro value.
    pub fn add_aggro(&mut self, character_id: CharacterId, amount: f32) -> f32 {
        self.add(character_id, amount, None)
    }

    /// Like [`add_aggro`](Self::add_aggro) but sets the decay of this entry
    pub fn add_aggro_with_reduce(
        &mut self,
        character_id: CharacterId,
        amount: f32,
        reduce: ReduceType,
    ) -> f32 {
        self.add(character_id, amount, Some(reduce.sanitized()))
    }

    fn add(&mut self, character_id: CharacterId, amount: f32, reduce: Option<ReduceType>) -> f32 {
        if let Some(index) = self.position_of(character_id) {
            let entry = &mut self.entries[index];
            entry.aggro += amount;
            if let Some(reduce) = reduce {
                entry.reduce = reduce;
            }
            let aggro = entry.aggro;
            if aggro <= 0.0 {
                self.entries.swap_remove(index);
                return 0.0;
            }
            return aggro;
        }

        if amount <= 0.0 {
            return 0.0;
        }
        let created = self.next_created;
        self.next_created += 1;
        self.entries.push(Entry {
            character_id,
            aggro: amount,
            reduce: reduce.unwrap_or(self.reduce),
            created,
        });
        amount
    }

    /// Remove the entry for `character_id`; unknown ids are a no-op
    pub fn remove(&mut self, character_id: CharacterId) -> bool {
        match self.position_of(character_id) {
            Some(index) => {
                self.entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Current aggro against `character_id`
    pub fn aggro(&self, character_id: CharacterId) -> Option<f32> {
        self.position_of(character_id)
            .map(|index| self.entries[index].aggro)
    }

    /// Entry with the greatest aggro; on equal values the newer entry wins
    pub fn highest_entry(&self) -> Option<&Entry> {
        self.entries.iter().max_by(|a, b| {
            a.rank()
                .partial_cmp(&b.rank())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// All entries, highest aggro first
    pub fn entries(&self) -> Vec<Entry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| {
            b.rank()
                .partial_cmp(&a.rank())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reduce type applied to new entries
    pub fn reduce_type(&self) -> ReduceType {
        self.reduce
    }

    /// Subtract `per_second` from every entry each second
    pub fn set_reduce_by_value(&mut self, per_second: f32) {
        self.set_reduce(ReduceType::ByValue { per_second });
    }

    /// Reduce every entry by a ratio per second and drop it below `min_aggro`
    pub fn set_reduce_by_ratio(&mut self, ratio_per_second: f32, min_aggro: f32) {
        self.set_reduce(ReduceType::ByRatio {
            ratio_per_second,
            min_aggro,
        });
    }

    /// Disable decay for existing and future entries
    pub fn reset_reduce_value(&mut self) {
        self.set_reduce(ReduceType::Disabled);
    }

    fn set_reduce(&mut self, reduce: ReduceType) {
        let reduce = reduce.sanitized();
        self.reduce = reduce;
        for entry in &mut self.entries {
            entry.reduce = reduce;
        }
    }

    fn position_of(&self, character_id: CharacterId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.character_id == character_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f32 = 1e-3;

    #[test]
    fn test_reduce_by_value_one_second() {
        let mut mgr = AggroMgr::new();
        mgr.set_reduce_by_value(10.0);
        mgr.add_aggro(42, 100.0);

        mgr.update(1000);

        let aggro = mgr.aggro(42).unwrap();
        assert!((aggro - 90.0).abs() < EPSILON, "aggro was {}", aggro);
        assert_eq!(mgr.highest_entry().map(|e| e.character_id), Some(42));
    }

    #[test]
    fn test_add_aggro_keeps_entry_decay() {
        let mut mgr = AggroMgr::new();
        mgr.add_aggro_with_reduce(2, 30.0, ReduceType::ByValue { per_second: 20.0 });
        assert_eq!(mgr.add_aggro(2, 5.0), 35.0);

        mgr.update(1000);

        let aggro = mgr.aggro(2).unwrap();
        assert!((aggro - 15.0).abs() < EPSILON, "aggro was {}", aggro);
        assert_eq!(
            mgr.entries()[0].reduce,
            ReduceType::ByValue { per_second: 20.0 }
        );
    }

    #[test]
    fn test_add_aggro_with_reduce_overrides_decay() {
        let mut mgr = AggroMgr::new();
        mgr.set_reduce_by_value(10.0);
        mgr.add_aggro(3, 50.0);
        mgr.add_aggro_with_reduce(3, 0.0, ReduceType::Disabled);

        mgr.update(1000);

        assert_eq!(mgr.aggro(3), Some(50.0));
    }

    #[test]
    fn test_empty_has_no_highest() {
        let mgr = AggroMgr::new();
        assert!(mgr.highest_entry().is_none());
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_add_accumulates() {
        let mut mgr = AggroMgr::new();
        assert_eq!(mgr.add_aggro(1, 5.0), 5.0);
        assert_eq!(mgr.add_aggro(1, 7.0), 12.0);
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_highest_entry() {
        let mut mgr = AggroMgr::new();
        mgr.add_aggro(1, 5.0);
        mgr.add_aggro(2, 50.0);
        mgr.add_aggro(3, 20.0);
        assert_eq!(mgr.highest_entry().map(|e| e.character_id), Some(2));

        let ids: Vec<CharacterId> = mgr.entries().iter().map(|e| e.character_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_tie_prefers_newest_entry() {
        let mut mgr = AggroMgr::new();
        mgr.add_aggro(1, 10.0);
        mgr.add_aggro(2, 10.0);
        assert_eq!(mgr.highest_entry().map(|e| e.character_id), Some(2));
    }

    #[test]
    fn test_decayed_entries_are_removed() {
        let mut mgr = AggroMgr::new();
        mgr.set_reduce_by_value(10.0);
        mgr.add_aggro(1, 5.0);
        mgr.add_aggro(2, 50.0);

        mgr.update(1000);

        assert!(mgr.aggro(1).is_none());
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_reduce_by_ratio_floor() {
        let mut mgr = AggroMgr::new();
        mgr.set_reduce_by_ratio(0.5, 10.0);
        mgr.add_aggro(1, 40.0);

        mgr.update(1000);
        assert!((mgr.aggro(1).unwrap() - 20.0).abs() < EPSILON);

        mgr.update(1000);
        assert!((mgr.aggro(1).unwrap() - 10.0).abs() < EPSILON);

        mgr.update(1000);
        assert!(mgr.aggro(1).is_none());
    }

    #[test]
    fn test_reset_reduce_value_stops_decay() {
        let mut mgr = AggroMgr::new();
        mgr.set_reduce_by_value(10.0);
        mgr.add_aggro(1, 30.0);
        mgr.reset_reduce_value();

        mgr.update(5000);
        assert_eq!(mgr.aggro(1), Some(30.0));
    }

    #[test]
    fn test_per_entry_reduce() {
        let mut mgr = AggroMgr::new();
        mgr.add_aggro(1, 30.0);
        mgr.add_aggro_with_reduce(2, 30.0, ReduceType::ByValue { per_second: 20.0 });

        mgr.update(1000);
        assert_eq!(mgr.aggro(1), Some(30.0));
        assert!((mgr.aggro(2).unwrap() - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut mgr = AggroMgr::new();
        mgr.add_aggro(1, 1.0);
        assert!(!mgr.remove(99));
        assert!(mgr.remove(1));
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_negative_rate_is_clamped() {
        let mut mgr = AggroMgr::new();
        mgr.set_reduce_by_value(-10.0);
        mgr.add_aggro(1, 10.0);
        mgr.update(1000);
        assert_eq!(mgr.aggro(1), Some(10.0));
    }

    fn reduce_strategy() -> impl Strategy<Value = ReduceType> {
        prop_oneof![
            Just(ReduceType::Disabled),
            (0.0f32..50.0).prop_map(|per_second| ReduceType::ByValue { per_second }),
            (0.0f32..1.0, 0.0f32..5.0).prop_map(|(ratio_per_second, min_aggro)| {
                ReduceType::ByRatio {
                    ratio_per_second,
                    min_aggro,
                }
            }),
        ]
    }

    proptest! {
        #[test]
        fn prop_decay_is_monotonic(
            adds in prop::collection::vec((0i32..8, 1.0f32..500.0, reduce_strategy()), 1..20),
            steps in prop::collection::vec(0i64..2000, 1..20),
        ) {
            let mut mgr = AggroMgr::new();
            for (id, amount, reduce) in adds {
                mgr.add_aggro_with_reduce(id, amount, reduce);
            }
            for dt in steps {
                let before: Vec<(CharacterId, f32)> =
                    mgr.entries().iter().map(|e| (e.character_id, e.aggro)).collect();
                mgr.update(dt);
                for entry in mgr.entries() {
                    let previous = before
                        .iter()
                        .find(|(id, _)| *id == entry.character_id)
                        .map(|(_, aggro)| *aggro);
                    prop_assert!(previous.is_some());
                    prop_assert!(entry.aggro <= previous.unwrap());
                }
            }
        }

        #[test]
        fn prop_highest_is_maximum(
            adds in prop::collection::vec((0i32..16, 1.0f32..500.0), 1..32),
        ) {
            let mut mgr = AggroMgr::new();
            for (id, amount) in adds {
                mgr.add_aggro(id, amount);
            }
            let highest = mgr.highest_entry().unwrap().aggro;
            for entry in mgr.entries() {
                prop_assert!(highest >= entry.aggro);
            }
        }
    }
}
