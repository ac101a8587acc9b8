//! Filters populate the AI's selection (`Ai::filtered_entities`)
//!
//! Simple filters append to the current selection. Combinators run each of
//! their sub filters on an empty selection and then replace the selection
//! with the combined result.

use std::sync::Arc;

use crate::ai::Ai;
use crate::character::CharacterId;
use crate::condition::describe;

mod combine;
mod select;

pub use combine::{Complement, Difference, First, Intersection, Last, Random, Union};
pub use select::{
    SelectAll, SelectEmpty, SelectGroupLeader, SelectGroupMembers, SelectHighestAggro, SelectZone,
};

pub type FilterRef = Arc<dyn Filter>;

pub trait Filter: Send + Sync {
    fn name(&self) -> &str;

    fn parameters(&self) -> String {
        String::new()
    }

    fn filter(&self, ai: &Ai);

    fn describe(&self) -> String {
        describe(self.name(), &self.parameters(), &[])
    }
}

/// Output of every sub filter, each run on an empty selection
pub(crate) fn run_each(ai: &Ai, filters: &[FilterRef]) -> Vec<Vec<CharacterId>> {
    filters
        .iter()
        .map(|filter| {
            ai.clear_filtered_entities();
            filter.filter(ai);
            ai.filtered_entities().into_vec()
        })
        .collect()
}

pub(crate) fn describe_combinator(name: &str, parameters: &str, filters: &[FilterRef]) -> String {
    let subs: Vec<String> = filters.iter().map(|f| f.describe()).collect();
    describe(name, parameters, &subs)
}
