//! Activation conditions for configuration units.
//!
//! A [`Conditional`] folds predicates left to right with `and`/`or`
//! operators chosen as they are appended. Predicates read the property store,
//! a [`BeanRegistry`] query surface and the active profiles through a
//! [`ConditionContext`].

#![warn(missing_docs, clippy::pedantic)]

mod condition;
mod context;

/// Predicates, the conditional fold and evaluation errors.
pub use condition::{
    CondError, CondResult, Condition, Conditional, EXPR_PREFIX, LogicOp, MatchFn,
};
/// Evaluation context and the bean query surface.
pub use context::{
    ACTIVE_PROFILES_KEY, BeanRegistry, BeanSelector, BeanSet, ConditionContext, NoBeans,
};
