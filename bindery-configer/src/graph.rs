//! Registration, ordering and execution of configers.

use std::collections::HashSet;
use std::fmt;

use bindery_bind::Binder;
use bindery_cond::ConditionContext;
use tracing::{debug, info, warn};

use crate::configer::Configer;
use crate::error::{ConfigerError, ConfigerResult};

/// Outcome of [`ConfigerGraph::run`], names listed in run order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    executed: Vec<String>,
    skipped: Vec<String>,
}

impl RunReport {
    /// Configers whose condition held and which ran.
    #[must_use]
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Configers whose condition did not hold.
    #[must_use]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }
}

/// Collection of uniquely named configers.
#[derive(Default)]
pub struct ConfigerGraph {
    units: Vec<Configer>,
}

impl fmt::Debug for ConfigerGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigerGraph")
            .field("units", &self.names())
            .finish()
    }
}

impl ConfigerGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a configer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigerError::Duplicate`] if the name is already taken.
    pub fn register(&mut self, configer: Configer) -> ConfigerResult<()> {
        if self.contains(configer.name()) {
            return Err(ConfigerError::Duplicate {
                name: configer.name().to_owned(),
            });
        }
        self.units.push(configer);
        Ok(())
    }

    /// Returns `true` if a configer named `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.units.iter().any(|unit| unit.name() == name)
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(Configer::name).collect()
    }

    /// Number of registered configers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Orders the configers so every `before`/`after` constraint holds.
    ///
    /// Unconstrained configers keep their registration order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigerError::Cycle`] naming every configer on the first
    /// cycle found.
    pub fn sorted_names(&self) -> ConfigerResult<Vec<&str>> {
        Ok(self
            .sorted_indices()?
            .into_iter()
            .map(|index| self.units[index].name())
            .collect())
    }

    /// Sorts the configers, then runs each one whose condition holds.
    ///
    /// Arguments bind from the context's properties. Running stops at the
    /// first failure.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigerError::Cycle`] before anything runs, or the
    /// condition, bind or execution error of the failing configer.
    pub fn run(self, binder: &Binder, ctx: &ConditionContext<'_>) -> ConfigerResult<RunReport> {
        let order = self.sorted_indices()?;
        let mut units: Vec<Option<Configer>> = self.units.into_iter().map(Some).collect();
        let mut report = RunReport::default();
        for index in order {
            let Some(unit) = units[index].take() else {
                continue;
            };
            if !unit.matches(ctx)? {
                debug!(configer = unit.name(), "condition not met, skipping configer");
                report.skipped.push(unit.name().to_owned());
                continue;
            }
            let name = unit.name().to_owned();
            info!(configer = %name, "running configer");
            unit.execute(binder, ctx.properties())?;
            report.executed.push(name);
        }
        Ok(report)
    }

    fn sorted_indices(&self) -> ConfigerResult<Vec<usize>> {
        self.warn_unknown_references();
        let mut sorter = Sorter {
            units: &self.units,
            marks: vec![Mark::Unsorted; self.units.len()],
            stack: Vec::new(),
            order: Vec::with_capacity(self.units.len()),
        };
        for index in 0..self.units.len() {
            if sorter.marks[index] == Mark::Unsorted {
                sorter.visit(index)?;
            }
        }
        debug!(order = ?sorter.names(), "sorted configers");
        Ok(sorter.order)
    }

    fn warn_unknown_references(&self) {
        let known: HashSet<&str> = self.units.iter().map(Configer::name).collect();
        for unit in &self.units {
            let references = unit.before_names().iter().chain(unit.after_names());
            for name in references.filter(|name| !known.contains(name.as_str())) {
                warn!(configer = unit.name(), reference = %name, "unknown configer referenced in ordering");
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    Unsorted,
    InProgress,
    Sorted,
}

struct Sorter<'a> {
    units: &'a [Configer],
    marks: Vec<Mark>,
    stack: Vec<usize>,
    order: Vec<usize>,
}

impl Sorter<'_> {
    fn visit(&mut self, index: usize) -> ConfigerResult<()> {
        self.marks[index] = Mark::InProgress;
        self.stack.push(index);
        for dep in self.predecessors(index) {
            match self.marks[dep] {
                Mark::Sorted => {}
                Mark::Unsorted => self.visit(dep)?,
                Mark::InProgress => return Err(self.cycle(dep)),
            }
        }
        self.stack.pop();
        self.marks[index] = Mark::Sorted;
        self.order.push(index);
        Ok(())
    }

    /// Units that must run before `index`, in registration order.
    fn predecessors(&self, index: usize) -> Vec<usize> {
        let current = &self.units[index];
        self.units
            .iter()
            .enumerate()
            .filter(|(_, unit)| {
                unit.before_names().iter().any(|name| name == current.name())
                    || current.after_names().iter().any(|name| name == unit.name())
            })
            .map(|(dep, _)| dep)
            .collect()
    }

    fn cycle(&self, dep: usize) -> ConfigerError {
        let start = self
            .stack
            .iter()
            .position(|&index| index == dep)
            .unwrap_or_default();
        let chain = self.stack[start..]
            .iter()
            .chain(std::iter::once(&dep))
            .map(|&index| self.units[index].name().to_owned())
            .collect();
        ConfigerError::Cycle { chain }
    }

    fn names(&self) -> Vec<&str> {
        self.order.iter().map(|&index| self.units[index].name()).collect()
    }
}
