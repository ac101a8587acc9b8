//! SimpleAI kernel
//!
//! Behaviour tree AI for game servers. Trees are built once, shared between
//! any number of [`Ai`] instances and evaluated per tick with the per-AI
//! resume state kept inside the AI. A [`Zone`] owns the AIs of one map and
//! ticks them in parallel, a [`GroupMgr`] tracks groups with leaders and
//! averaged positions, and the [`ThreadScheduler`] runs delayed and
//! repeating callbacks on its own thread. Movement is expressed as
//! [`Steering`] behaviours blended by the `Steer` node.
//!
//! Trees are either assembled in code or described with expressions such as
//! `And(HasEnemies{2},Not(IsInGroup{1}))` and built through an
//! [`AiRegistry`].

pub mod aggro;
pub mod ai;
pub mod character;
pub mod condition;
pub mod config;
pub mod error;
pub mod filter;
pub mod group;
pub mod metrics;
pub mod parser;
pub mod registry;
pub mod scheduler;
pub mod steering;
pub mod sync;
pub mod tree;
pub mod util;
pub mod zone;

pub use aggro::AggroMgr;
pub use ai::{Ai, AiRef};
pub use character::{BasicCharacter, Character, CharacterId, CharacterRef, AI_NOTHING_SELECTED};
pub use config::KernelConfig;
pub use error::{AiError, Result, TaskError};
pub use group::{GroupId, GroupMgr};
pub use registry::{AiRegistry, NodeSpec, TreeBuilder};
pub use scheduler::{ThreadScheduler, TimerId};
pub use steering::{MoveVector, Steering, SteeringRef};
pub use sync::ReadWriteLock;
pub use tree::{TreeNode, TreeNodeRef, TreeNodeStatus};
pub use util::Vec3;
pub use zone::Zone;
