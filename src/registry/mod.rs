//! Name to factory registry for nodes, conditions, filters and steerings
//!
//! Every built-in kind is registered by [`AiRegistry::new`]. Hosts add their
//! own tasks with [`AiRegistry::register_task`] or a custom factory.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::ai::Ai;
use crate::character::Character;
use crate::condition::{ConditionRef, FilterCondition, True};
use crate::error::{AiError, Result, TaskError};
use crate::filter::FilterRef;
use crate::parser::{parse_expression, Expr};
use crate::steering::SteeringRef;
use crate::tree::{NodeCore, Task, TreeNodeRef, TreeNodeStatus};

mod builder;
mod builtin;

pub use builder::{NodeSpec, TreeBuilder};

/// Everything a node factory needs to build one node
///
/// `steerings` holds the arguments of a node type such as
/// `Steer(GroupSeek{1},Wander)`.
pub struct NodeFactoryContext {
    pub kind: String,
    pub name: String,
    pub parameters: String,
    pub condition: ConditionRef,
    pub children: Vec<TreeNodeRef>,
    pub steerings: Vec<SteeringRef>,
}

impl NodeFactoryContext {
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            parameters: String::new(),
            condition: True::shared(),
            children: Vec::new(),
            steerings: Vec::new(),
        }
    }

    /// Error for node kinds that take no steering arguments
    pub fn reject_steerings(&self) -> Result<()> {
        if self.steerings.is_empty() {
            Ok(())
        } else {
            Err(AiError::invalid_parameters(&self.kind, "takes no steerings"))
        }
    }

    pub fn into_core(self) -> NodeCore {
        NodeCore::new(&self.kind, &self.name)
            .with_parameters(&self.parameters)
            .with_condition(self.condition)
            .with_children(self.children)
    }
}

pub struct ConditionFactoryContext {
    pub parameters: String,
    pub conditions: Vec<ConditionRef>,
    pub filters: Vec<FilterRef>,
}

pub struct FilterFactoryContext {
    pub parameters: String,
    pub filters: Vec<FilterRef>,
}

pub struct SteeringFactoryContext {
    pub parameters: String,
}

pub type NodeFactory = Arc<dyn Fn(NodeFactoryContext) -> Result<TreeNodeRef> + Send + Sync>;
pub type ConditionFactory =
    Arc<dyn Fn(ConditionFactoryContext) -> Result<ConditionRef> + Send + Sync>;
pub type FilterFactory = Arc<dyn Fn(FilterFactoryContext) -> Result<FilterRef> + Send + Sync>;
pub type SteeringFactory =
    Arc<dyn Fn(SteeringFactoryContext) -> Result<SteeringRef> + Send + Sync>;

pub struct AiRegistry {
    nodes: RwLock<HashMap<String, NodeFactory>>,
    conditions: RwLock<HashMap<String, ConditionFactory>>,
    filters: RwLock<HashMap<String, FilterFactory>>,
    steerings: RwLock<HashMap<String, SteeringFactory>>,
}

impl AiRegistry {
    /// Registry with every built-in node, condition, filter and steering
    pub fn new() -> Self {
        let registry = Self::empty();
        builtin::register_all(&registry);
        registry
    }

    /// Registry without any factory
    pub fn empty() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            conditions: RwLock::new(HashMap::new()),
            filters: RwLock::new(HashMap::new()),
            steerings: RwLock::new(HashMap::new()),
        }
    }

    /// Returns false if a node factory with this name exists
    pub fn register_node_factory(&self, name: &str, factory: NodeFactory) -> bool {
        insert_new(&self.nodes, name, factory)
    }

    pub fn unregister_node_factory(&self, name: &str) -> bool {
        self.nodes.write().remove(name).is_some()
    }

    pub fn register_condition_factory(&self, name: &str, factory: ConditionFactory) -> bool {
        insert_new(&self.conditions, name, factory)
    }

    pub fn unregister_condition_factory(&self, name: &str) -> bool {
        self.conditions.write().remove(name).is_some()
    }

    pub fn register_filter_factory(&self, name: &str, factory: FilterFactory) -> bool {
        insert_new(&self.filters, name, factory)
    }

    pub fn unregister_filter_factory(&self, name: &str) -> bool {
        self.filters.write().remove(name).is_some()
    }

    pub fn register_steering_factory(&self, name: &str, factory: SteeringFactory) -> bool {
        insert_new(&self.steerings, name, factory)
    }

    pub fn unregister_steering_factory(&self, name: &str) -> bool {
        self.steerings.write().remove(name).is_some()
    }

    /// Register a task node type running `action`
    pub fn register_task<F>(&self, name: &str, action: F) -> bool
    where
        F: Fn(&Ai, &dyn Character, i64) -> std::result::Result<TreeNodeStatus, TaskError>
            + Send
            + Sync
            + 'static,
    {
        let action: crate::tree::TaskFn = Arc::new(action);
        self.register_node_factory(
            name,
            Arc::new(move |ctx: NodeFactoryContext| -> Result<TreeNodeRef> {
                ctx.reject_steerings()?;
                let node: TreeNodeRef = Arc::new(Task::from_core(ctx.into_core(), action.clone()));
                Ok(node)
            }),
        )
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.read().contains_key(name)
    }

    /// Build a node. `ctx.kind` selects the factory.
    pub fn create_node(&self, ctx: NodeFactoryContext) -> Result<TreeNodeRef> {
        let factory = self
            .nodes
            .read()
            .get(&ctx.kind)
            .cloned()
            .ok_or_else(|| AiError::UnknownNode(ctx.kind.clone()))?;
        factory(ctx)
    }

    /// Build a node from a type expression such as `Limit{3}` or
    /// `Steer{0.5,0.5}(GroupSeek{1},Wander)`
    ///
    /// Arguments of the type expression are built as steerings.
    pub fn create_node_from_type(
        &self,
        node_type: &str,
        name: &str,
        condition: ConditionRef,
        children: Vec<TreeNodeRef>,
    ) -> Result<TreeNodeRef> {
        let expr = parse_expression(node_type)?;
        let steerings = expr
            .args
            .iter()
            .map(|arg| self.create_steering(arg))
            .collect::<Result<_>>()?;
        self.create_node(NodeFactoryContext {
            kind: expr.name,
            name: name.to_string(),
            parameters: expr.parameters,
            condition,
            children,
            steerings,
        })
    }

    /// Build a condition from a parsed expression
    ///
    /// The arguments of `Filter(..)` are filter expressions, those of every
    /// other condition are condition expressions.
    pub fn create_condition(&self, expr: &Expr) -> Result<ConditionRef> {
        let factory = self
            .conditions
            .read()
            .get(&expr.name)
            .cloned()
            .ok_or_else(|| AiError::UnknownCondition(expr.name.clone()))?;

        let mut ctx = ConditionFactoryContext {
            parameters: expr.parameters.clone(),
            conditions: Vec::new(),
            filters: Vec::new(),
        };
        if expr.name == FilterCondition::NAME {
            ctx.filters = self.create_filters(&expr.args)?;
        } else {
            ctx.conditions = expr
                .args
                .iter()
                .map(|arg| self.create_condition(arg))
                .collect::<Result<_>>()?;
        }
        factory(ctx)
    }

    pub fn create_filter(&self, expr: &Expr) -> Result<FilterRef> {
        let factory = self
            .filters
            .read()
            .get(&expr.name)
            .cloned()
            .ok_or_else(|| AiError::UnknownFilter(expr.name.clone()))?;
        factory(FilterFactoryContext {
            parameters: expr.parameters.clone(),
            filters: self.create_filters(&expr.args)?,
        })
    }

    pub fn create_steering(&self, expr: &Expr) -> Result<SteeringRef> {
        let factory = self
            .steerings
            .read()
            .get(&expr.name)
            .cloned()
            .ok_or_else(|| AiError::UnknownSteering(expr.name.clone()))?;
        if !expr.args.is_empty() {
            return Err(AiError::invalid_parameters(
                &expr.name,
                "takes no sub expressions",
            ));
        }
        factory(SteeringFactoryContext {
            parameters: expr.parameters.clone(),
        })
    }

    fn create_filters(&self, exprs: &[Expr]) -> Result<Vec<FilterRef>> {
        exprs.iter().map(|arg| self.create_filter(arg)).collect()
    }

    /// Parse and build a condition, e.g. `And(HasEnemies,Not(IsInGroup{1}))`
    pub fn parse_condition(&self, input: &str) -> Result<ConditionRef> {
        self.create_condition(&parse_expression(input)?)
    }

    /// Parse and build a filter, e.g. `First(SelectHighestAggro)`
    pub fn parse_filter(&self, input: &str) -> Result<FilterRef> {
        self.create_filter(&parse_expression(input)?)
    }

    /// Parse and build a steering, e.g. `TargetSeek{0:0:10}`
    pub fn parse_steering(&self, input: &str) -> Result<SteeringRef> {
        self.create_steering(&parse_expression(input)?)
    }
}

impl Default for AiRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_new<F>(map: &RwLock<HashMap<String, F>>, name: &str, factory: F) -> bool {
    let mut map = map.write();
    if map.contains_key(name) {
        return false;
    }
    map.insert(name.to_string(), factory);
    true
}
