//! Evaluation context: properties, known beans and active profiles.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use bindery_bind::TypeKey;
use bindery_core::PropertySource;

/// Property holding the comma separated list of active profiles.
pub const ACTIVE_PROFILES_KEY: &str = "app.profiles.active";

/// Identifies a bean by registered name or by type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BeanSelector {
    /// Bean registered under a name.
    Name(String),
    /// Bean of a concrete type.
    Type(TypeKey),
}

impl BeanSelector {
    /// Selects the bean registered under `name`.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Selects beans of type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeKey::of::<T>())
    }
}

impl From<&str> for BeanSelector {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl From<String> for BeanSelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for BeanSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Type(key) => write!(f, "<{}>", key.name()),
        }
    }
}

/// Query surface over whatever container owns the beans.
pub trait BeanRegistry {
    /// Returns `true` if a bean matching `selector` is registered.
    fn contains(&self, selector: &BeanSelector) -> bool;
}

/// Registry that knows no beans.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBeans;

impl BeanRegistry for NoBeans {
    fn contains(&self, _selector: &BeanSelector) -> bool {
        false
    }
}

/// In-memory set of bean names and types.
#[derive(Clone, Debug, Default)]
pub struct BeanSet {
    names: BTreeSet<String>,
    types: HashSet<TypeKey>,
}

impl BeanSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a bean of type `T` under `name`.
    #[must_use]
    pub fn with<T: ?Sized + 'static>(mut self, name: impl Into<String>) -> Self {
        self.insert::<T>(name);
        self
    }

    /// Records a bean of type `T` under `name`.
    pub fn insert<T: ?Sized + 'static>(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
        self.types.insert(TypeKey::of::<T>());
    }
}

impl BeanRegistry for BeanSet {
    fn contains(&self, selector: &BeanSelector) -> bool {
        match selector {
            BeanSelector::Name(name) => self.names.contains(name),
            BeanSelector::Type(key) => self.types.contains(key),
        }
    }
}

/// Everything a condition may inspect.
#[derive(Clone, Copy)]
pub struct ConditionContext<'a> {
    properties: &'a dyn PropertySource,
    beans: &'a dyn BeanRegistry,
    profiles: Option<&'a [String]>,
}

impl fmt::Debug for ConditionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionContext")
            .field("profiles", &self.profiles())
            .finish_non_exhaustive()
    }
}

impl<'a> ConditionContext<'a> {
    /// Creates a context without beans; profiles come from
    /// [`ACTIVE_PROFILES_KEY`].
    #[must_use]
    pub fn new(properties: &'a dyn PropertySource) -> Self {
        Self {
            properties,
            beans: &NoBeans,
            profiles: None,
        }
    }

    /// Uses `beans` for bean conditions.
    #[must_use]
    pub fn with_beans(mut self, beans: &'a dyn BeanRegistry) -> Self {
        self.beans = beans;
        self
    }

    /// Overrides the active profiles read from the properties.
    #[must_use]
    pub fn with_profiles(mut self, profiles: &'a [String]) -> Self {
        self.profiles = Some(profiles);
        self
    }

    /// Property source conditions read from.
    #[must_use]
    pub fn properties(&self) -> &'a dyn PropertySource {
        self.properties
    }

    /// Bean registry conditions query.
    #[must_use]
    pub fn beans(&self) -> &'a dyn BeanRegistry {
        self.beans
    }

    /// Active profiles, explicit ones first, else the property list.
    #[must_use]
    pub fn profiles(&self) -> Vec<String> {
        if let Some(profiles) = self.profiles {
            return profiles.to_vec();
        }
        self.properties
            .get(ACTIVE_PROFILES_KEY)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns `true` if `profile` is active.
    #[must_use]
    pub fn is_profile_active(&self, profile: &str) -> bool {
        self.profiles().iter().any(|active| active == profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::Properties;

    #[test]
    fn bean_set_matches_names_and_types() {
        struct Pool;
        let beans = BeanSet::new().with::<Pool>("pool");

        assert!(beans.contains(&"pool".into()));
        assert!(beans.contains(&BeanSelector::of::<Pool>()));
        assert!(!beans.contains(&BeanSelector::of::<String>()));
        assert!(!NoBeans.contains(&"pool".into()));
        assert_eq!(BeanSelector::name("cache").to_string(), "cache");
    }

    #[test]
    fn profiles_come_from_properties_unless_overridden() {
        let p = Properties::from_pairs([(ACTIVE_PROFILES_KEY, "dev, local,")]).unwrap();
        let ctx = ConditionContext::new(&p);
        assert_eq!(ctx.profiles(), ["dev", "local"]);
        assert!(ctx.is_profile_active("local"));

        let explicit = vec!["prod".to_owned()];
        let ctx = ctx.with_profiles(&explicit);
        assert!(!ctx.is_profile_active("dev"));
        assert!(ctx.is_profile_active("prod"));
    }
}
