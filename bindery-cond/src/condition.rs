//! Predicates and their left-fold composition.

use std::fmt;
use std::sync::Arc;

use bindery_bind::eval_bool;
use bindery_core::{BindTarget, BoxError, Resolver};
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use crate::context::{BeanSelector, ConditionContext};

/// Prefix marking an expected property value as an expression over `$`.
pub const EXPR_PREFIX: &str = "expr:";

/// Errors raised while evaluating a condition.
#[derive(Debug, Error)]
pub enum CondError {
    /// A placeholder inside a condition could not be resolved.
    #[error("cannot resolve condition input: {0}")]
    Resolve(#[from] bindery_core::Error),

    /// An expression failed to evaluate to a boolean.
    #[error("condition expression `{expression}` failed")]
    Expression {
        /// The expression as written.
        expression: String,
        /// Underlying evaluation error.
        #[source]
        source: BoxError,
    },
}

/// Result alias for condition evaluation.
pub type CondResult<T> = Result<T, CondError>;

/// User supplied predicate.
pub type MatchFn = Arc<dyn Fn(&ConditionContext<'_>) -> bool + Send + Sync>;

/// A single activation predicate.
#[derive(Clone)]
pub enum Condition {
    /// The property exists, as a leaf or as a prefix.
    OnProperty(String),
    /// The property does not exist.
    OnMissingProperty(String),
    /// The property exists and its resolved value equals `expected`, or
    /// satisfies the expression when `expected` starts with `expr:`.
    OnPropertyValue {
        /// Property key.
        name: String,
        /// Expected value or `expr:` expression.
        expected: String,
    },
    /// A matching bean is registered.
    OnBean(BeanSelector),
    /// No matching bean is registered.
    OnMissingBean(BeanSelector),
    /// A boolean expression; `${...}` placeholders are resolved first.
    OnExpression(String),
    /// The profile is active.
    OnProfile(String),
    /// A user supplied predicate.
    OnMatches(MatchFn),
    /// Negation of the inner condition.
    Not(Box<Condition>),
    /// A nested conditional.
    All(Conditional),
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnProperty(name) => f.debug_tuple("OnProperty").field(name).finish(),
            Self::OnMissingProperty(name) => {
                f.debug_tuple("OnMissingProperty").field(name).finish()
            }
            Self::OnPropertyValue { name, expected } => f
                .debug_struct("OnPropertyValue")
                .field("name", name)
                .field("expected", expected)
                .finish(),
            Self::OnBean(selector) => f.debug_tuple("OnBean").field(selector).finish(),
            Self::OnMissingBean(selector) => f.debug_tuple("OnMissingBean").field(selector).finish(),
            Self::OnExpression(expression) => {
                f.debug_tuple("OnExpression").field(expression).finish()
            }
            Self::OnProfile(profile) => f.debug_tuple("OnProfile").field(profile).finish(),
            Self::OnMatches(_) => f.write_str("OnMatches(..)"),
            Self::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Self::All(conditional) => f.debug_tuple("All").field(conditional).finish(),
        }
    }
}

impl From<Conditional> for Condition {
    fn from(conditional: Conditional) -> Self {
        Self::All(conditional)
    }
}

impl Condition {
    /// Wraps a predicate function.
    #[must_use]
    pub fn matches_fn<F>(predicate: F) -> Self
    where
        F: Fn(&ConditionContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self::OnMatches(Arc::new(predicate))
    }

    /// Evaluates the condition.
    ///
    /// # Errors
    ///
    /// Returns [`CondError`] when a placeholder or expression cannot be
    /// evaluated.
    pub fn matches(&self, ctx: &ConditionContext<'_>) -> CondResult<bool> {
        let properties = ctx.properties();
        let matched = match self {
            Self::OnProperty(name) => properties.has(name),
            Self::OnMissingProperty(name) => !properties.has(name),
            Self::OnPropertyValue { name, expected } => {
                property_value_matches(ctx, name, expected)?
            }
            Self::OnBean(selector) => ctx.beans().contains(selector),
            Self::OnMissingBean(selector) => !ctx.beans().contains(selector),
            Self::OnExpression(expression) => {
                let resolved = Resolver::new(properties).resolve_str(expression)?;
                evaluate(expression, &resolved, None)?
            }
            Self::OnProfile(profile) => ctx.is_profile_active(profile),
            Self::OnMatches(predicate) => predicate(ctx),
            Self::Not(inner) => !inner.matches(ctx)?,
            Self::All(conditional) => conditional.matches(ctx)?,
        };
        trace!(condition = ?self, matched, "condition evaluated");
        Ok(matched)
    }
}

fn property_value_matches(
    ctx: &ConditionContext<'_>,
    name: &str,
    expected: &str,
) -> CondResult<bool> {
    let properties = ctx.properties();
    if !properties.has(name) {
        return Ok(false);
    }
    let value = Resolver::new(properties).resolve(&BindTarget::new(name, name))?;
    match expected.strip_prefix(EXPR_PREFIX) {
        Some(expression) => evaluate(expression, expression, Some(&typed(&value))),
        None => Ok(value == expected),
    }
}

fn evaluate(original: &str, expression: &str, value: Option<&Value>) -> CondResult<bool> {
    eval_bool(expression, value).map_err(|source| CondError::Expression {
        expression: original.to_owned(),
        source,
    })
}

/// Reads a property string as the most specific JSON scalar it spells.
fn typed(text: &str) -> Value {
    if let Ok(int) = text.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(float) = text.parse::<f64>().ok().filter(|f| f.is_finite()) {
        return Value::from(float);
    }
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(text.to_owned()),
    }
}

/// Operator joining the next appended condition to the accumulated result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogicOp {
    /// Both must hold.
    #[default]
    And,
    /// Either may hold.
    Or,
}

/// Conditions folded left to right, each joined by the operator selected
/// before it was appended.
///
/// An operator applies only to the next appended condition and resets to
/// [`LogicOp::And`] afterwards. Evaluation short-circuits: once the
/// accumulated result decides an `and` or `or` step, the step's condition is
/// not evaluated. An empty conditional matches.
#[derive(Clone, Debug, Default)]
pub struct Conditional {
    steps: Vec<(LogicOp, Condition)>,
    pending: LogicOp,
}

impl Conditional {
    /// Creates an empty conditional.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the next condition with `and`.
    #[must_use]
    pub fn and(mut self) -> Self {
        self.select(LogicOp::And);
        self
    }

    /// Joins the next condition with `or`.
    #[must_use]
    pub fn or(mut self) -> Self {
        self.select(LogicOp::Or);
        self
    }

    /// Appends a condition.
    #[must_use]
    pub fn on(mut self, condition: impl Into<Condition>) -> Self {
        self.push(condition.into());
        self
    }

    /// Appends the negation of a condition.
    #[must_use]
    pub fn on_not(self, condition: impl Into<Condition>) -> Self {
        self.on(Condition::Not(Box::new(condition.into())))
    }

    /// Requires the property to exist.
    #[must_use]
    pub fn on_property(self, name: impl Into<String>) -> Self {
        self.on(Condition::OnProperty(name.into()))
    }

    /// Requires the property to be absent.
    #[must_use]
    pub fn on_missing_property(self, name: impl Into<String>) -> Self {
        self.on(Condition::OnMissingProperty(name.into()))
    }

    /// Requires the property value to equal `expected`, or to satisfy it when
    /// it is written as `expr:<expression>`.
    #[must_use]
    pub fn on_property_value(self, name: impl Into<String>, expected: impl Into<String>) -> Self {
        self.on(Condition::OnPropertyValue {
            name: name.into(),
            expected: expected.into(),
        })
    }

    /// Requires a matching bean.
    #[must_use]
    pub fn on_bean(self, selector: impl Into<BeanSelector>) -> Self {
        self.on(Condition::OnBean(selector.into()))
    }

    /// Requires that no matching bean exists.
    #[must_use]
    pub fn on_missing_bean(self, selector: impl Into<BeanSelector>) -> Self {
        self.on(Condition::OnMissingBean(selector.into()))
    }

    /// Requires a boolean expression to hold.
    #[must_use]
    pub fn on_expression(self, expression: impl Into<String>) -> Self {
        self.on(Condition::OnExpression(expression.into()))
    }

    /// Requires a user predicate to hold.
    #[must_use]
    pub fn on_matches<F>(self, predicate: F) -> Self
    where
        F: Fn(&ConditionContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.on(Condition::matches_fn(predicate))
    }

    /// Requires the profile to be active.
    #[must_use]
    pub fn on_profile(self, profile: impl Into<String>) -> Self {
        self.on(Condition::OnProfile(profile.into()))
    }

    /// Selects the operator for the next appended condition.
    pub fn select(&mut self, op: LogicOp) {
        self.pending = op;
    }

    /// Appends a condition using the selected operator.
    pub fn push(&mut self, condition: Condition) {
        self.steps.push((self.pending, condition));
        self.pending = LogicOp::And;
    }

    /// Number of appended conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` when no condition has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Evaluates the fold.
    ///
    /// # Errors
    ///
    /// Returns the first [`CondError`] raised by an evaluated condition.
    pub fn matches(&self, ctx: &ConditionContext<'_>) -> CondResult<bool> {
        let mut steps = self.steps.iter();
        let Some((_, first)) = steps.next() else {
            return Ok(true);
        };
        let mut matched = first.matches(ctx)?;
        for (op, condition) in steps {
            matched = match op {
                LogicOp::And => matched && condition.matches(ctx)?,
                LogicOp::Or => matched || condition.matches(ctx)?,
            };
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bindery_core::Properties;

    use super::*;
    use crate::context::BeanSet;

    fn props() -> Properties {
        Properties::from_pairs([
            ("x", "1"),
            ("server.port", "8080"),
            ("mode", "${server.port}"),
            ("app.profiles.active", "dev"),
        ])
        .unwrap()
    }

    #[test]
    fn empty_conditional_matches() {
        let p = Properties::new();
        assert!(Conditional::new().matches(&ConditionContext::new(&p)).unwrap());
    }

    #[test]
    fn property_and_missing_property() {
        let p = props();
        let ctx = ConditionContext::new(&p);
        let cond = Conditional::new().on_property("x").and().on_missing_property("y");
        assert!(cond.matches(&ctx).unwrap());

        let cond = Conditional::new().on_property("x").on_missing_property("server");
        assert!(!cond.matches(&ctx).unwrap());
    }

    #[test]
    fn operators_apply_left_to_right() {
        let p = props();
        let ctx = ConditionContext::new(&p);
        // (false || true) && false
        let cond = Conditional::new()
            .on_property("nope")
            .or()
            .on_property("x")
            .on_property("nope");
        assert!(!cond.matches(&ctx).unwrap());

        // (false && true) || true
        let cond = Conditional::new()
            .on_property("nope")
            .on_property("x")
            .or()
            .on_property("x");
        assert!(cond.matches(&ctx).unwrap());
    }

    #[test]
    fn trailing_and_repeated_operators() {
        let p = props();
        let ctx = ConditionContext::new(&p);
        let cond = Conditional::new().or().and().or().on_property("nope").or();
        assert!(!cond.matches(&ctx).unwrap());
        assert_eq!(cond.len(), 1);
    }

    #[test]
    fn evaluation_short_circuits() {
        let p = props();
        let ctx = ConditionContext::new(&p);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let counted = move |_: &ConditionContext<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        };

        let cond = Conditional::new()
            .on_property("x")
            .or()
            .on_matches(counted.clone())
            .on_missing_property("x")
            .on_matches(counted);
        assert!(!cond.matches(&ctx).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn property_values_compare_or_evaluate() {
        let p = props();
        let ctx = ConditionContext::new(&p);
        let check = |name: &str, expected: &str| {
            Conditional::new()
                .on_property_value(name, expected)
                .matches(&ctx)
                .unwrap()
        };
        assert!(check("server.port", "8080"));
        assert!(check("mode", "8080"));
        assert!(!check("server.port", "80"));
        assert!(!check("absent", "8080"));
        assert!(check("server.port", "expr:$ > 1024"));
        assert!(!check("x", "expr:$ > 3"));
    }

    #[test]
    fn expressions_resolve_placeholders() {
        let p = props();
        let ctx = ConditionContext::new(&p);
        let cond = Conditional::new().on_expression("${server.port} == 8080 && ${x:=0} > 0");
        assert!(cond.matches(&ctx).unwrap());

        let err = Conditional::new()
            .on_expression("${missing} > 1")
            .matches(&ctx)
            .expect_err("missing property");
        assert!(matches!(err, CondError::Resolve(_)));

        let err = Conditional::new()
            .on_expression("1 +")
            .matches(&ctx)
            .expect_err("malformed");
        assert!(matches!(err, CondError::Expression { .. }));
    }

    #[test]
    fn beans_profiles_and_negation() {
        let p = props();
        let beans = BeanSet::new().with::<Properties>("store");
        let ctx = ConditionContext::new(&p).with_beans(&beans);

        assert!(Conditional::new().on_bean("store").matches(&ctx).unwrap());
        assert!(Conditional::new().on_missing_bean("cache").matches(&ctx).unwrap());
        assert!(Conditional::new().on_profile("dev").matches(&ctx).unwrap());

        let nested = Conditional::new().on_profile("prod").or().on_bean("cache");
        assert!(Conditional::new().on_not(nested).matches(&ctx).unwrap());
    }
}
