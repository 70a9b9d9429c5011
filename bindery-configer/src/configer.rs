//! A single named configuration unit.

use std::fmt;

use bindery_bind::Binder;
use bindery_cond::{BeanSelector, Condition, ConditionContext, Conditional};
use bindery_core::PropertySource;

use crate::args::ConfigFn;
use crate::error::{ConfigerError, ConfigerResult};

type RunFn = Box<dyn FnOnce(&Binder, &dyn PropertySource, &str) -> ConfigerResult<()> + Send>;

/// Named unit of configuration logic, gated by a condition and ordered by
/// `before`/`after` constraints.
pub struct Configer {
    name: String,
    tags: Vec<String>,
    run: RunFn,
    condition: Conditional,
    before: Vec<String>,
    after: Vec<String>,
}

impl fmt::Debug for Configer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configer")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("condition", &self.condition)
            .field("before", &self.before)
            .field("after", &self.after)
            .finish_non_exhaustive()
    }
}

impl Configer {
    /// Creates a configer running `f` with one argument bound per tag.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigerError::EmptyName`] for a blank name and
    /// [`ConfigerError::Arity`] when the tag count differs from the number of
    /// parameters `f` takes.
    pub fn new<Args, F, I, S>(name: impl Into<String>, tags: I, f: F) -> ConfigerResult<Self>
    where
        Args: 'static,
        F: ConfigFn<Args>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigerError::EmptyName);
        }
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if tags.len() != F::ARITY {
            return Err(ConfigerError::Arity {
                name,
                expected: F::ARITY,
                found: tags.len(),
            });
        }
        let bound_tags = tags.clone();
        let run: RunFn =
            Box::new(move |binder, source, name| f.call(binder, source, &bound_tags, name));
        Ok(Self {
            name,
            tags,
            run,
            condition: Conditional::new(),
            before: Vec::new(),
            after: Vec::new(),
        })
    }

    /// Joins the next condition with OR.
    #[must_use]
    pub fn or(mut self) -> Self {
        self.condition = self.condition.or();
        self
    }

    /// Joins the next condition with AND.
    #[must_use]
    pub fn and(mut self) -> Self {
        self.condition = self.condition.and();
        self
    }

    /// Appends an arbitrary condition.
    #[must_use]
    pub fn condition_on(mut self, condition: impl Into<Condition>) -> Self {
        self.condition = self.condition.on(condition);
        self
    }

    /// Appends the negation of `condition`.
    #[must_use]
    pub fn condition_not(mut self, condition: impl Into<Condition>) -> Self {
        self.condition = self.condition.on_not(condition);
        self
    }

    /// Requires property `name` to exist.
    #[must_use]
    pub fn condition_on_property(mut self, name: impl Into<String>) -> Self {
        self.condition = self.condition.on_property(name);
        self
    }

    /// Requires property `name` to be absent.
    #[must_use]
    pub fn condition_on_missing_property(mut self, name: impl Into<String>) -> Self {
        self.condition = self.condition.on_missing_property(name);
        self
    }

    /// Requires property `name` to equal `expected`, or to satisfy it when it
    /// starts with `expr:`.
    #[must_use]
    pub fn condition_on_property_value(
        mut self,
        name: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        self.condition = self.condition.on_property_value(name, expected);
        self
    }

    /// Requires a bean matching `selector`.
    #[must_use]
    pub fn condition_on_bean(mut self, selector: impl Into<BeanSelector>) -> Self {
        self.condition = self.condition.on_bean(selector);
        self
    }

    /// Requires no bean matching `selector`.
    #[must_use]
    pub fn condition_on_missing_bean(mut self, selector: impl Into<BeanSelector>) -> Self {
        self.condition = self.condition.on_missing_bean(selector);
        self
    }

    /// Requires `expression` to evaluate to `true`.
    #[must_use]
    pub fn condition_on_expression(mut self, expression: impl Into<String>) -> Self {
        self.condition = self.condition.on_expression(expression);
        self
    }

    /// Requires `predicate` to accept the context.
    #[must_use]
    pub fn condition_on_matches<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ConditionContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.condition = self.condition.on_matches(predicate);
        self
    }

    /// Requires `profile` to be active.
    #[must_use]
    pub fn condition_on_profile(mut self, profile: impl Into<String>) -> Self {
        self.condition = self.condition.on_profile(profile);
        self
    }

    /// Runs this configer before each of `names`, replacing any earlier list.
    #[must_use]
    pub fn before<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before = names.into_iter().map(Into::into).collect();
        self
    }

    /// Runs this configer after each of `names`, replacing any earlier list.
    #[must_use]
    pub fn after<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after = names.into_iter().map(Into::into).collect();
        self
    }

    /// Evaluates the activation condition; no condition means active.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigerError::Condition`] when a condition cannot be
    /// evaluated.
    pub fn matches(&self, ctx: &ConditionContext<'_>) -> ConfigerResult<bool> {
        self.condition
            .matches(ctx)
            .map_err(|source| ConfigerError::Condition {
                name: self.name.clone(),
                source,
            })
    }

    /// Binds the arguments and runs the function once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigerError::Bind`] or [`ConfigerError::Execution`].
    pub fn execute(self, binder: &Binder, source: &dyn PropertySource) -> ConfigerResult<()> {
        (self.run)(binder, source, &self.name)
    }

    /// Unit name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument tags, one per function parameter.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Activation condition.
    #[must_use]
    pub fn condition(&self) -> &Conditional {
        &self.condition
    }

    /// Names this configer must precede.
    #[must_use]
    pub fn before_names(&self) -> &[String] {
        &self.before
    }

    /// Names this configer must follow.
    #[must_use]
    pub fn after_names(&self) -> &[String] {
        &self.after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::{BoxError, Properties};

    fn noop() -> Result<(), BoxError> {
        Ok(())
    }

    #[test]
    fn registration_checks_name_and_arity() {
        let err = Configer::new(" ", Vec::<String>::new(), noop).expect_err("blank name");
        assert!(matches!(err, ConfigerError::EmptyName));

        let err = Configer::new("db", ["${db}"], noop).expect_err("too many tags");
        assert!(matches!(
            err,
            ConfigerError::Arity { expected: 0, found: 1, .. }
        ));

        let unit = Configer::new("db", ["${db.url}"], |_: String| Ok::<_, BoxError>(())).unwrap();
        assert_eq!(unit.tags(), ["${db.url}"]);
    }

    #[test]
    fn builder_collects_constraints_and_conditions() {
        let unit = Configer::new("web", Vec::<String>::new(), noop)
            .unwrap()
            .after(["db"])
            .after(["db", "cache"])
            .before(["routes"])
            .condition_on_property("web.port")
            .or()
            .condition_on_profile("dev");

        assert_eq!(unit.after_names(), ["db", "cache"]);
        assert_eq!(unit.before_names(), ["routes"]);
        assert_eq!(unit.condition().len(), 2);

        let props = Properties::from_pairs([("app.profiles.active", "dev")]).unwrap();
        assert!(unit.matches(&ConditionContext::new(&props)).unwrap());
        let empty = Properties::new();
        assert!(!unit.matches(&ConditionContext::new(&empty)).unwrap());
    }

    #[test]
    fn later_constraint_lists_replace_earlier_ones() {
        let unit = Configer::new("web", Vec::<String>::new(), noop)
            .unwrap()
            .before(["routes", "static"])
            .before(["routes"])
            .after(["db"])
            .after(Vec::<String>::new());

        assert_eq!(unit.before_names(), ["routes"]);
        assert!(unit.after_names().is_empty());
    }

    #[test]
    fn condition_errors_carry_the_unit_name() {
        let unit = Configer::new("web", Vec::<String>::new(), noop)
            .unwrap()
            .condition_on_expression("${missing} > 1");
        let props = Properties::new();
        let err = unit
            .matches(&ConditionContext::new(&props))
            .expect_err("unresolvable expression");
        assert!(matches!(err, ConfigerError::Condition { ref name, .. } if name == "web"));
    }

    #[test]
    fn execute_runs_the_function() {
        let props = Properties::from_pairs([("greeting", "hi")]).unwrap();
        let unit = Configer::new("greet", ["${greeting}"], |g: String| {
            if g == "hi" { Ok(()) } else { Err("unexpected greeting") }
        })
        .unwrap();
        unit.execute(&Binder::default(), &props).unwrap();
    }
}
