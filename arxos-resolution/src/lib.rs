//! Rule-based conflict resolution for ArxOS equipment fusion.
//!
//! A [`ConflictResolver`] holds a priority-ordered set of
//! [`ResolutionRule`]s. Each rule targets one conflict type, gates on a
//! [`RuleCondition`] and decides with a [`RuleAction`]. Resolving never
//! fails: conflicts no rule claims fall through to the resolver's default
//! method. Every decision is kept in an audit history.

pub mod defaults;
mod engine;
mod error;
mod history;
pub mod rule;

pub use defaults::default_rules;
pub use engine::{
    ConflictResolver, ResolutionResult, ResolutionStatistics, ResolverConfig, RuleSet,
    ACTION_APPROVAL, ACTION_FIELD_VERIFICATION, ACTION_MANUAL_REVIEW,
};
pub use error::ResolutionError;
pub use history::{ResolutionHistory, ResolutionRecord};
pub use rule::{PreferSource, ResolutionMethod, ResolutionRule, RuleAction, RuleCondition};
