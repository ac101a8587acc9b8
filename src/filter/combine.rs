use rand::seq::SliceRandom;

use crate::ai::Ai;
use crate::character::CharacterId;
use crate::filter::{describe_combinator, run_each, Filter, FilterRef};

fn push_unique(out: &mut Vec<CharacterId>, id: CharacterId) {
    if !out.contains(&id) {
        out.push(id);
    }
}

/// Every id selected by any sub filter, first occurrence order
pub struct Union {
    filters: Vec<FilterRef>,
}

impl Union {
    pub const NAME: &'static str = "Union";

    pub fn new(filters: Vec<FilterRef>) -> Self {
        Self { filters }
    }
}

impl Filter for Union {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn filter(&self, ai: &Ai) {
        let ids = union_of(ai, &self.filters);
        ai.set_filtered_entities(ids);
    }

    fn describe(&self) -> String {
        describe_combinator(Self::NAME, "", &self.filters)
    }
}

/// Ids selected by every sub filter
pub struct Intersection {
    filters: Vec<FilterRef>,
}

impl Intersection {
    pub const NAME: &'static str = "Intersection";

    pub fn new(filters: Vec<FilterRef>) -> Self {
        Self { filters }
    }
}

impl Filter for Intersection {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn filter(&self, ai: &Ai) {
        let mut results = run_each(ai, &self.filters).into_iter();
        let Some(first) = results.next() else {
            ai.clear_filtered_entities();
            return;
        };
        let rest: Vec<Vec<CharacterId>> = results.collect();
        let mut out = Vec::new();
        for id in first {
            if rest.iter().all(|ids| ids.contains(&id)) {
                push_unique(&mut out, id);
            }
        }
        ai.set_filtered_entities(out);
    }

    fn describe(&self) -> String {
        describe_combinator(Self::NAME, "", &self.filters)
    }
}

/// Ids of the first sub filter not selected by any of the others
pub struct Difference {
    filters: Vec<FilterRef>,
}

impl Difference {
    pub const NAME: &'static str = "Difference";

    pub fn new(filters: Vec<FilterRef>) -> Self {
        Self { filters }
    }
}

impl Filter for Difference {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn filter(&self, ai: &Ai) {
        let mut results = run_each(ai, &self.filters).into_iter();
        let Some(first) = results.next() else {
            ai.clear_filtered_entities();
            return;
        };
        let rest: Vec<Vec<CharacterId>> = results.collect();
        let mut out = Vec::new();
        for id in first {
            if !rest.iter().any(|ids| ids.contains(&id)) {
                push_unique(&mut out, id);
            }
        }
        ai.set_filtered_entities(out);
    }

    fn describe(&self) -> String {
        describe_combinator(Self::NAME, "", &self.filters)
    }
}

/// Ids of the current selection that no sub filter selects, e.g.
/// `Filter(SelectZone,Complement(SelectGroupMembers{1}))`
pub struct Complement {
    filters: Vec<FilterRef>,
}

impl Complement {
    pub const NAME: &'static str = "Complement";

    pub fn new(filters: Vec<FilterRef>) -> Self {
        Self { filters }
    }
}

impl Filter for Complement {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn filter(&self, ai: &Ai) {
        let selected = ai.filtered_entities().into_vec();
        let excluded = union_of(ai, &self.filters);
        let mut out = Vec::new();
        for id in selected {
            if !excluded.contains(&id) {
                push_unique(&mut out, id);
            }
        }
        ai.set_filtered_entities(out);
    }

    fn describe(&self) -> String {
        describe_combinator(Self::NAME, "", &self.filters)
    }
}

fn union_of(ai: &Ai, filters: &[FilterRef]) -> Vec<CharacterId> {
    let mut out = Vec::new();
    for ids in run_each(ai, filters) {
        for id in ids {
            push_unique(&mut out, id);
        }
    }
    out
}

/// Keeps only the first id of the union of its sub filters
pub struct First {
    filters: Vec<FilterRef>,
}

impl First {
    pub const NAME: &'static str = "First";

    pub fn new(filters: Vec<FilterRef>) -> Self {
        Self { filters }
    }
}

impl Filter for First {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn filter(&self, ai: &Ai) {
        let ids = union_of(ai, &self.filters);
        ai.set_filtered_entities(ids.first().copied());
    }

    fn describe(&self) -> String {
        describe_combinator(Self::NAME, "", &self.filters)
    }
}

/// Keeps only the last id of the union of its sub filters
pub struct Last {
    filters: Vec<FilterRef>,
}

impl Last {
    pub const NAME: &'static str = "Last";

    pub fn new(filters: Vec<FilterRef>) -> Self {
        Self { filters }
    }
}

impl Filter for Last {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn filter(&self, ai: &Ai) {
        let ids = union_of(ai, &self.filters);
        ai.set_filtered_entities(ids.last().copied());
    }

    fn describe(&self) -> String {
        describe_combinator(Self::NAME, "", &self.filters)
    }
}

/// Keeps `amount` random ids of the union of its sub filters, e.g.
/// `Random{2}(SelectZone)`
pub struct Random {
    amount: usize,
    filters: Vec<FilterRef>,
}

impl Random {
    pub const NAME: &'static str = "Random";

    pub fn new(amount: usize, filters: Vec<FilterRef>) -> Self {
        Self { amount, filters }
    }
}

impl Filter for Random {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> String {
        self.amount.to_string()
    }

    fn filter(&self, ai: &Ai) {
        let mut ids = union_of(ai, &self.filters);
        ids.shuffle(&mut rand::thread_rng());
        ids.truncate(self.amount);
        ai.set_filtered_entities(ids);
    }

    fn describe(&self) -> String {
        describe_combinator(Self::NAME, &self.parameters(), &self.filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::test_util::*;
    use crate::tree::TreeNodeStatus;
    use std::sync::Arc;

    /// Appends a fixed list of ids
    struct Fixed(Vec<CharacterId>);

    impl Filter for Fixed {
        fn name(&self) -> &str {
            "Fixed"
        }

        fn filter(&self, ai: &Ai) {
            for id in &self.0 {
                ai.add_filtered_entity(*id);
            }
        }
    }

    fn fixed(ids: &[CharacterId]) -> FilterRef {
        Arc::new(Fixed(ids.to_vec()))
    }

    fn run(filter: &dyn Filter) -> Vec<CharacterId> {
        let ai = ai_with(leaf("root", TreeNodeStatus::Finished));
        ai.add_filtered_entity(100);
        filter.filter(&ai);
        ai.filtered_entities().into_vec()
    }

    #[test]
    fn test_set_operations() {
        assert_eq!(run(&Union::new(vec![fixed(&[1, 2]), fixed(&[2, 3])])), vec![1, 2, 3]);
        assert_eq!(
            run(&Intersection::new(vec![fixed(&[1, 2, 3]), fixed(&[3, 2])])),
            vec![2, 3]
        );
        assert_eq!(
            run(&Difference::new(vec![fixed(&[1, 2, 3]), fixed(&[2]), fixed(&[3])])),
            vec![1]
        );
        assert!(run(&Intersection::new(vec![])).is_empty());
    }

    #[test]
    fn test_complement_of_selection() {
        let ai = ai_with(leaf("root", TreeNodeStatus::Finished));
        ai.set_filtered_entities([1, 2, 3, 4, 3]);

        Complement::new(vec![fixed(&[2]), fixed(&[4, 9])]).filter(&ai);
        assert_eq!(ai.filtered_entities().as_slice(), &[1, 3]);

        Complement::new(vec![]).filter(&ai);
        assert_eq!(ai.filtered_entities().as_slice(), &[1, 3]);

        Complement::new(vec![fixed(&[1, 3])]).filter(&ai);
        assert!(ai.filtered_entities().is_empty());
    }

    #[test]
    fn test_first_and_last() {
        assert_eq!(run(&First::new(vec![fixed(&[4, 5, 6])])), vec![4]);
        assert_eq!(run(&Last::new(vec![fixed(&[4, 5]), fixed(&[6])])), vec![6]);
        assert!(run(&First::new(vec![fixed(&[])])).is_empty());
    }

    #[test]
    fn test_random_picks_subset() {
        let picked = run(&Random::new(2, vec![fixed(&[1, 2, 3, 4])]));
        assert_eq!(picked.len(), 2);
        assert!(picked.iter().all(|id| (1..=4).contains(id)));
        assert_ne!(picked[0], picked[1]);

        assert_eq!(run(&Random::new(10, vec![fixed(&[7])])), vec![7]);
    }

    #[test]
    fn test_describe_combinator() {
        let random = Random::new(1, vec![fixed(&[1])]);
        assert_eq!(random.describe(), "Random{1}(Fixed)");
    }
}
