use std::str::FromStr;
use std::sync::Arc;

use crate::condition::{
    And, ConditionRef, False, FilterCondition, HasEnemies, IsCloseToGroup, IsGroupLeader,
    IsInGroup, Not, Or, True,
};
use crate::error::{AiError, Result};
use crate::filter::{
    Complement, Difference, FilterRef, First, Intersection, Last, Random, SelectAll, SelectEmpty,
    SelectGroupLeader, SelectGroupMembers, SelectHighestAggro, SelectZone, Union,
};
use crate::group::GroupId;
use crate::steering::{
    Approach, GroupSteering, SelectionSteering, SteeringRef, TargetSteering, Wander,
};
use crate::tree::{
    Fail, Idle, Invert, Limit, Parallel, PrioritySelector, ProbabilitySelector, RandomSelector,
    Sequence, Steer, Succeed, TimedNode, TreeNodeRef, Wait,
};
use crate::util::vec3::Vec3;

use super::{
    AiRegistry, ConditionFactory, ConditionFactoryContext, FilterFactory, FilterFactoryContext,
    NodeFactory, NodeFactoryContext, SteeringFactory, SteeringFactoryContext,
};

pub(super) fn register_all(registry: &AiRegistry) {
    register_nodes(registry);
    register_conditions(registry);
    register_filters(registry);
    register_steerings(registry);
}

/// Factory for a node kind without steering arguments
fn node<F>(build: F) -> NodeFactory
where
    F: Fn(NodeFactoryContext) -> Result<TreeNodeRef> + Send + Sync + 'static,
{
    Arc::new(move |ctx: NodeFactoryContext| -> Result<TreeNodeRef> {
        ctx.reject_steerings()?;
        build(ctx)
    })
}

fn condition_factory<F>(build: F) -> ConditionFactory
where
    F: Fn(ConditionFactoryContext) -> Result<ConditionRef> + Send + Sync + 'static,
{
    Arc::new(build)
}

fn filter_factory<F>(build: F) -> FilterFactory
where
    F: Fn(FilterFactoryContext) -> Result<FilterRef> + Send + Sync + 'static,
{
    Arc::new(build)
}

fn register_nodes(registry: &AiRegistry) {
    let factories: [(&str, NodeFactory); 11] = [
        (
            Sequence::KIND,
            node(|ctx| Ok(Arc::new(Sequence::from_core(ctx.into_core())))),
        ),
        (
            PrioritySelector::KIND,
            node(|ctx| Ok(Arc::new(PrioritySelector::from_core(ctx.into_core())))),
        ),
        (
            RandomSelector::KIND,
            node(|ctx| Ok(Arc::new(RandomSelector::from_core(ctx.into_core())))),
        ),
        (
            ProbabilitySelector::KIND,
            node(|ctx| Ok(Arc::new(ProbabilitySelector::from_core(ctx.into_core())?))),
        ),
        (
            Parallel::KIND,
            node(|ctx| Ok(Arc::new(Parallel::from_core(ctx.into_core())))),
        ),
        (
            Invert::KIND,
            node(|ctx| Ok(Arc::new(Invert::from_core(ctx.into_core())?))),
        ),
        (
            Succeed::KIND,
            node(|ctx| Ok(Arc::new(Succeed::from_core(ctx.into_core())?))),
        ),
        (
            Fail::KIND,
            node(|ctx| Ok(Arc::new(Fail::from_core(ctx.into_core())?))),
        ),
        (
            Limit::KIND,
            node(|ctx| Ok(Arc::new(Limit::from_core(ctx.into_core())?))),
        ),
        (
            Idle::KIND,
            node(|ctx| {
                let idle: Idle = TimedNode::from_core(ctx.into_core(), Wait)?;
                Ok(Arc::new(idle))
            }),
        ),
        (
            Steer::KIND,
            Arc::new(|mut ctx: NodeFactoryContext| -> Result<TreeNodeRef> {
                let steerings = std::mem::take(&mut ctx.steerings);
                Ok(Arc::new(Steer::from_core(ctx.into_core(), steerings)?))
            }),
        ),
    ];

    for (kind, factory) in factories {
        registry.register_node_factory(kind, factory);
    }
}

fn parse_param<T: FromStr>(kind: &str, parameters: &str) -> Result<T> {
    parameters.trim().parse::<T>().map_err(|_| {
        AiError::invalid_parameters(kind, format!("cannot parse '{}'", parameters))
    })
}

/// Parameter that falls back to `default` when empty
fn param_or<T: FromStr>(kind: &str, parameters: &str, default: T) -> Result<T> {
    if parameters.trim().is_empty() {
        Ok(default)
    } else {
        parse_param(kind, parameters)
    }
}

fn no_args(kind: &str, ctx: &ConditionFactoryContext) -> Result<()> {
    if ctx.conditions.is_empty() && ctx.filters.is_empty() {
        Ok(())
    } else {
        Err(AiError::invalid_parameters(kind, "takes no sub expressions"))
    }
}

fn register_conditions(registry: &AiRegistry) {
    let factories: Vec<(&str, ConditionFactory)> = vec![
        (
            True::NAME,
            condition_factory(|ctx| {
                no_args(True::NAME, &ctx)?;
                Ok(True::shared())
            }),
        ),
        (
            False::NAME,
            condition_factory(|ctx| {
                no_args(False::NAME, &ctx)?;
                Ok(False::shared())
            }),
        ),
        (
            And::NAME,
            condition_factory(|ctx| {
                let condition: ConditionRef = Arc::new(And::new(ctx.conditions));
                Ok(condition)
            }),
        ),
        (
            Or::NAME,
            condition_factory(|ctx| {
                let condition: ConditionRef = Arc::new(Or::new(ctx.conditions));
                Ok(condition)
            }),
        ),
        (
            Not::NAME,
            condition_factory(|mut ctx| {
                if ctx.conditions.len() != 1 {
                    return Err(AiError::InvalidChildCount {
                        kind: Not::NAME.to_string(),
                        expected: "exactly 1",
                        actual: ctx.conditions.len(),
                    });
                }
                let inner = ctx.conditions.remove(0);
                let condition: ConditionRef = Arc::new(Not::new(inner));
                Ok(condition)
            }),
        ),
        (
            HasEnemies::NAME,
            condition_factory(|ctx| {
                no_args(HasEnemies::NAME, &ctx)?;
                let amount = param_or(HasEnemies::NAME, &ctx.parameters, 1usize)?;
                let condition: ConditionRef = Arc::new(HasEnemies::new(amount));
                Ok(condition)
            }),
        ),
        (
            IsGroupLeader::NAME,
            condition_factory(|ctx| {
                no_args(IsGroupLeader::NAME, &ctx)?;
                let group_id: GroupId = parse_param(IsGroupLeader::NAME, &ctx.parameters)?;
                let condition: ConditionRef = Arc::new(IsGroupLeader::new(group_id));
                Ok(condition)
            }),
        ),
        (
            IsInGroup::NAME,
            condition_factory(|ctx| {
                no_args(IsInGroup::NAME, &ctx)?;
                let group_id = if ctx.parameters.trim().is_empty() {
                    None
                } else {
                    Some(parse_param::<GroupId>(IsInGroup::NAME, &ctx.parameters)?)
                };
                let condition: ConditionRef = Arc::new(IsInGroup::new(group_id));
                Ok(condition)
            }),
        ),
        (
            IsCloseToGroup::NAME,
            condition_factory(|ctx| {
                no_args(IsCloseToGroup::NAME, &ctx)?;
                let (group, distance) = ctx.parameters.split_once(',').ok_or_else(|| {
                    AiError::invalid_parameters(
                        IsCloseToGroup::NAME,
                        "expected 'group,distance'",
                    )
                })?;
                let group_id: GroupId = parse_param(IsCloseToGroup::NAME, group)?;
                let distance: f32 = parse_param(IsCloseToGroup::NAME, distance)?;
                let condition: ConditionRef = Arc::new(IsCloseToGroup::new(group_id, distance));
                Ok(condition)
            }),
        ),
        (
            FilterCondition::NAME,
            condition_factory(|ctx| {
                if ctx.filters.is_empty() {
                    return Err(AiError::InvalidChildCount {
                        kind: FilterCondition::NAME.to_string(),
                        expected: "at least 1",
                        actual: 0,
                    });
                }
                let condition: ConditionRef = Arc::new(FilterCondition::new(ctx.filters));
                Ok(condition)
            }),
        ),
    ];

    for (name, factory) in factories {
        registry.register_condition_factory(name, factory);
    }
}

fn leaf_filter(kind: &str, ctx: &FilterFactoryContext) -> Result<()> {
    if ctx.filters.is_empty() {
        Ok(())
    } else {
        Err(AiError::invalid_parameters(kind, "takes no sub filters"))
    }
}

fn combinator(kind: &str, ctx: &FilterFactoryContext) -> Result<()> {
    if ctx.filters.is_empty() {
        Err(AiError::InvalidChildCount {
            kind: kind.to_string(),
            expected: "at least 1",
            actual: 0,
        })
    } else {
        Ok(())
    }
}

fn register_filters(registry: &AiRegistry) {
    let factories: Vec<(&str, FilterFactory)> = vec![
        (
            SelectEmpty::NAME,
            filter_factory(|ctx| {
                leaf_filter(SelectEmpty::NAME, &ctx)?;
                let filter: FilterRef = Arc::new(SelectEmpty);
                Ok(filter)
            }),
        ),
        (
            SelectAll::NAME,
            filter_factory(|ctx| {
                leaf_filter(SelectAll::NAME, &ctx)?;
                let filter: FilterRef = Arc::new(SelectAll);
                Ok(filter)
            }),
        ),
        (
            SelectHighestAggro::NAME,
            filter_factory(|ctx| {
                leaf_filter(SelectHighestAggro::NAME, &ctx)?;
                let filter: FilterRef = Arc::new(SelectHighestAggro);
                Ok(filter)
            }),
        ),
        (
            SelectZone::NAME,
            filter_factory(|ctx| {
                leaf_filter(SelectZone::NAME, &ctx)?;
                let filter: FilterRef = Arc::new(SelectZone);
                Ok(filter)
            }),
        ),
        (
            SelectGroupLeader::NAME,
            filter_factory(|ctx| {
                leaf_filter(SelectGroupLeader::NAME, &ctx)?;
                let group_id: GroupId = parse_param(SelectGroupLeader::NAME, &ctx.parameters)?;
                let filter: FilterRef = Arc::new(SelectGroupLeader::new(group_id));
                Ok(filter)
            }),
        ),
        (
            SelectGroupMembers::NAME,
            filter_factory(|ctx| {
                leaf_filter(SelectGroupMembers::NAME, &ctx)?;
                let group_id: GroupId = parse_param(SelectGroupMembers::NAME, &ctx.parameters)?;
                let filter: FilterRef = Arc::new(SelectGroupMembers::new(group_id));
                Ok(filter)
            }),
        ),
        (
            Union::NAME,
            filter_factory(|ctx| {
                combinator(Union::NAME, &ctx)?;
                let filter: FilterRef = Arc::new(Union::new(ctx.filters));
                Ok(filter)
            }),
        ),
        (
            Intersection::NAME,
            filter_factory(|ctx| {
                combinator(Intersection::NAME, &ctx)?;
                let filter: FilterRef = Arc::new(Intersection::new(ctx.filters));
                Ok(filter)
            }),
        ),
        (
            Difference::NAME,
            filter_factory(|ctx| {
                combinator(Difference::NAME, &ctx)?;
                let filter: FilterRef = Arc::new(Difference::new(ctx.filters));
                Ok(filter)
            }),
        ),
        (
            Complement::NAME,
            filter_factory(|ctx| {
                combinator(Complement::NAME, &ctx)?;
                let filter: FilterRef = Arc::new(Complement::new(ctx.filters));
                Ok(filter)
            }),
        ),
        (
            First::NAME,
            filter_factory(|ctx| {
                combinator(First::NAME, &ctx)?;
                let filter: FilterRef = Arc::new(First::new(ctx.filters));
                Ok(filter)
            }),
        ),
        (
            Last::NAME,
            filter_factory(|ctx| {
                combinator(Last::NAME, &ctx)?;
                let filter: FilterRef = Arc::new(Last::new(ctx.filters));
                Ok(filter)
            }),
        ),
        (
            Random::NAME,
            filter_factory(|ctx| {
                combinator(Random::NAME, &ctx)?;
                let amount = param_or(Random::NAME, &ctx.parameters, 1usize)?;
                let filter: FilterRef = Arc::new(Random::new(amount, ctx.filters));
                Ok(filter)
            }),
        ),
    ];

    for (name, factory) in factories {
        registry.register_filter_factory(name, factory);
    }
}

fn steering_factory<F>(build: F) -> SteeringFactory
where
    F: Fn(SteeringFactoryContext) -> Result<SteeringRef> + Send + Sync + 'static,
{
    Arc::new(build)
}

fn no_parameters(kind: &str, ctx: &SteeringFactoryContext) -> Result<()> {
    if ctx.parameters.trim().is_empty() {
        Ok(())
    } else {
        Err(AiError::invalid_parameters(kind, "takes no parameters"))
    }
}

fn target_param(kind: &str, ctx: &SteeringFactoryContext) -> Result<Vec3> {
    TargetSteering::parse_target(&ctx.parameters).ok_or_else(|| {
        AiError::invalid_parameters(kind, format!("expected 'x:y:z', got '{}'", ctx.parameters))
    })
}

fn register_steerings(registry: &AiRegistry) {
    let factories: Vec<(&str, SteeringFactory)> = vec![
        (
            GroupSteering::SEEK,
            steering_factory(|ctx| {
                let group_id: GroupId = parse_param(GroupSteering::SEEK, &ctx.parameters)?;
                let steering: SteeringRef =
                    Arc::new(GroupSteering::new(Approach::Seek, group_id));
                Ok(steering)
            }),
        ),
        (
            GroupSteering::FLEE,
            steering_factory(|ctx| {
                let group_id: GroupId = parse_param(GroupSteering::FLEE, &ctx.parameters)?;
                let steering: SteeringRef =
                    Arc::new(GroupSteering::new(Approach::Flee, group_id));
                Ok(steering)
            }),
        ),
        (
            SelectionSteering::SEEK,
            steering_factory(|ctx| {
                no_parameters(SelectionSteering::SEEK, &ctx)?;
                let steering: SteeringRef = Arc::new(SelectionSteering::new(Approach::Seek));
                Ok(steering)
            }),
        ),
        (
            SelectionSteering::FLEE,
            steering_factory(|ctx| {
                no_parameters(SelectionSteering::FLEE, &ctx)?;
                let steering: SteeringRef = Arc::new(SelectionSteering::new(Approach::Flee));
                Ok(steering)
            }),
        ),
        (
            TargetSteering::SEEK,
            steering_factory(|ctx| {
                let target = target_param(TargetSteering::SEEK, &ctx)?;
                let steering: SteeringRef = Arc::new(TargetSteering::new(Approach::Seek, target));
                Ok(steering)
            }),
        ),
        (
            TargetSteering::FLEE,
            steering_factory(|ctx| {
                let target = target_param(TargetSteering::FLEE, &ctx)?;
                let steering: SteeringRef = Arc::new(TargetSteering::new(Approach::Flee, target));
                Ok(steering)
            }),
        ),
        (
            Wander::NAME,
            steering_factory(|ctx| {
                let rotation = param_or(Wander::NAME, &ctx.parameters, Wander::DEFAULT_ROTATION)?;
                if !rotation.is_finite() {
                    return Err(AiError::invalid_parameters(
                        Wander::NAME,
                        "rotation must be finite",
                    ));
                }
                let steering: SteeringRef = Arc::new(Wander::new(rotation));
                Ok(steering)
            }),
        ),
    ];

    for (name, factory) in factories {
        registry.register_steering_factory(name, factory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_or_default() {
        assert_eq!(param_or("HasEnemies", "", 1usize).unwrap(), 1);
        assert_eq!(param_or("HasEnemies", " 4 ", 1usize).unwrap(), 4);
        assert!(param_or("HasEnemies", "-1", 1usize).is_err());
    }

    #[test]
    fn test_filter_factories() {
        let registry = AiRegistry::new();
        let filter = registry
            .parse_filter("Random{2}(Union(SelectGroupMembers{1},SelectZone))")
            .unwrap();
        assert_eq!(
            filter.describe(),
            "Random{2}(Union(SelectGroupMembers{1},SelectZone))"
        );
        assert!(registry.parse_filter("Union").is_err());
        assert!(registry.parse_filter("SelectAll(SelectZone)").is_err());
        assert!(registry.parse_filter("SelectGroupLeader").is_err());
    }

    #[test]
    fn test_complement_factory() {
        let registry = AiRegistry::new();
        let filter = registry
            .parse_filter("Complement(SelectHighestAggro,SelectGroupLeader{2})")
            .unwrap();
        assert_eq!(filter.name(), "Complement");
        assert_eq!(
            filter.describe(),
            "Complement(SelectHighestAggro,SelectGroupLeader{2})"
        );
        assert!(registry.parse_filter("Complement").is_err());
    }

    #[test]
    fn test_is_in_group_optional_parameter() {
        let registry = AiRegistry::new();
        assert_eq!(registry.parse_condition("IsInGroup").unwrap().describe(), "IsInGroup");
        assert_eq!(
            registry.parse_condition("IsInGroup{3}").unwrap().describe(),
            "IsInGroup{3}"
        );
    }

    #[test]
    fn test_steering_factories() {
        let registry = AiRegistry::new();
        for (input, described) in [
            ("GroupSeek{1}", "GroupSeek{1}"),
            ("GroupFlee{2}", "GroupFlee{2}"),
            ("SelectionSeek", "SelectionSeek"),
            ("SelectionFlee", "SelectionFlee"),
            ("TargetSeek{1:2:3}", "TargetSeek{1:2:3}"),
            ("TargetFlee{ -4 : 0 : 0.5 }", "TargetFlee{-4:0:0.5}"),
            ("Wander{0.5}", "Wander{0.5}"),
        ] {
            let steering = registry.parse_steering(input).unwrap();
            assert_eq!(steering.describe(), described);
        }

        assert!(registry.parse_steering("Wander").is_ok());
        assert!(registry.parse_steering("GroupSeek").is_err());
        assert!(registry.parse_steering("TargetSeek{1:2}").is_err());
        assert!(registry.parse_steering("SelectionFlee{3}").is_err());
        assert!(registry.parse_steering("Wander{NaN}").is_err());
    }

    #[test]
    fn test_builtin_nodes_reject_steerings() {
        let registry = AiRegistry::new();
        assert!(matches!(
            registry.create_node_from_type("Idle{10}(Wander)", "idle", True::shared(), vec![]),
            Err(AiError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_idle_requires_duration() {
        let registry = AiRegistry::new();
        assert!(registry
            .create_node_from_type("Idle", "idle", True::shared(), vec![])
            .is_err());
        let idle = registry
            .create_node_from_type("Idle{250}", "idle", True::shared(), vec![])
            .unwrap();
        assert_eq!(idle.kind(), "Idle");
        assert_eq!(idle.parameters(), "250");
    }
}
