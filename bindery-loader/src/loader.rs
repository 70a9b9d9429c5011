//! Merging resources and the environment into one property store.

use bindery_core::Properties;
use tracing::{debug, warn};

use crate::error::{LoaderError, LoaderResult};
use crate::format::Format;
use crate::resource::{Resource, ResourceLocator};

/// Accumulates properties; later sources override earlier ones.
#[derive(Clone, Debug, Default)]
pub struct PropertyLoader {
    properties: Properties,
}

impl PropertyLoader {
    /// Creates a loader with an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from existing properties.
    #[must_use]
    pub fn with_properties(properties: Properties) -> Self {
        Self { properties }
    }

    /// Parses `resource` by its extension and merges it.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::UnsupportedFormat`] for unknown extensions, the
    /// format's parse error, or [`LoaderError::Store`] on key conflicts.
    pub fn load_resource(&mut self, resource: &Resource) -> LoaderResult<()> {
        let format = Format::from_name(resource.name()).ok_or_else(|| LoaderError::UnsupportedFormat {
            name: resource.name().to_owned(),
        })?;
        let parsed = format.parse(resource)?;
        let count = parsed.len();
        self.properties
            .merge(parsed)
            .map_err(|source| LoaderError::Store {
                name: resource.name().to_owned(),
                source,
            })?;
        debug!(resource = resource.name(), ?format, count, "loaded properties");
        Ok(())
    }

    /// Loads every resource `locator` finds for `filename`.
    ///
    /// # Errors
    ///
    /// Returns the first locate or load error.
    pub fn load_located(&mut self, locator: &dyn ResourceLocator, filename: &str) -> LoaderResult<usize> {
        let resources = locator.locate(filename)?;
        for resource in &resources {
            self.load_resource(resource)?;
        }
        Ok(resources.len())
    }

    /// Loads `base.<ext>` for every supported extension, then
    /// `base-<profile>.<ext>` for each profile in order.
    ///
    /// # Errors
    ///
    /// Returns the first locate or load error.
    pub fn load_application(
        &mut self,
        locator: &dyn ResourceLocator,
        base: &str,
        profiles: &[String],
    ) -> LoaderResult<usize> {
        let mut loaded = 0;
        let stems = std::iter::once(base.to_owned())
            .chain(profiles.iter().map(|profile| format!("{base}-{profile}")));
        for stem in stems {
            for format in Format::ALL {
                loaded += self.load_located(locator, &format!("{stem}.{}", format.extension()))?;
            }
        }
        Ok(loaded)
    }

    /// Loads the process environment; see [`PropertyLoader::load_env_vars`].
    ///
    /// # Errors
    ///
    /// Never fails today; conflicting variables are skipped.
    pub fn load_env(&mut self, prefix: &str) -> LoaderResult<usize> {
        self.load_env_vars(prefix, std::env::vars())
    }

    /// Loads variables starting with `prefix_`, mapping `PREFIX_SERVER_PORT`
    /// to `server.port`.
    ///
    /// Variables whose key collides with an existing leaf or container are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Never fails today; the result leaves room for stricter sources.
    pub fn load_env_vars<I, K, V>(&mut self, prefix: &str, vars: I) -> LoaderResult<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut count = 0;
        for (name, value) in vars {
            let Some(key) = env_key(prefix, name.as_ref()) else {
                continue;
            };
            match self.properties.set(key.as_str(), value) {
                Ok(()) => count += 1,
                Err(err) => warn!(variable = name.as_ref(), %err, "skipping environment variable"),
            }
        }
        debug!(prefix, count, "loaded environment properties");
        Ok(count)
    }

    /// Properties loaded so far.
    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Consumes the loader.
    #[must_use]
    pub fn into_properties(self) -> Properties {
        self.properties
    }
}

fn env_key(prefix: &str, name: &str) -> Option<String> {
    let rest = if prefix.is_empty() {
        name
    } else {
        name.strip_prefix(prefix)?.strip_prefix('_')?
    };
    if rest.is_empty() || rest.split('_').any(str::is_empty) {
        return None;
    }
    Some(rest.to_ascii_lowercase().replace('_', "."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FileResourceLocator;
    use bindery_core::PropertySource;

    #[test]
    fn env_names_map_to_dotted_keys() {
        assert_eq!(env_key("APP", "APP_SERVER_PORT").as_deref(), Some("server.port"));
        assert_eq!(env_key("APP", "APPLE_PIE"), None);
        assert_eq!(env_key("APP", "APP_"), None);
        assert_eq!(env_key("APP", "APP_BAD__NAME"), None);
        assert_eq!(env_key("", "HOME"), Some("home".to_owned()));
    }

    #[test]
    fn env_vars_override_and_skip_conflicts() {
        let mut loader =
            PropertyLoader::with_properties(Properties::from_pairs([("server.port", "80")]).unwrap());
        let count = loader
            .load_env_vars(
                "APP",
                [
                    ("APP_SERVER_PORT", "9090"),
                    ("APP_SERVER", "clash"),
                    ("PATH", "/bin"),
                ],
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(loader.properties().get("server.port"), Some("9090"));
        assert!(!loader.properties().has("path"));
    }

    #[test]
    fn profiles_override_base_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.properties"), "db.host=localhost\ndb.port=5432\n").unwrap();
        std::fs::write(dir.path().join("app.toml"), "[web]\nport = 80\n").unwrap();
        std::fs::write(dir.path().join("app-prod.json"), r#"{"db": {"host": "db.internal"}}"#).unwrap();

        let locator = FileResourceLocator::new([dir.path().display().to_string()]);
        let mut loader = PropertyLoader::new();
        let loaded = loader
            .load_application(&locator, "app", &["prod".to_owned(), "missing".to_owned()])
            .unwrap();
        assert_eq!(loaded, 3);

        let props = loader.into_properties();
        assert_eq!(props.get("db.host"), Some("db.internal"));
        assert_eq!(props.get("db.port"), Some("5432"));
        assert_eq!(props.get("web.port"), Some("80"));
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        let err = PropertyLoader::new()
            .load_resource(&Resource::new("app.yaml", "a: 1"))
            .expect_err("yaml unsupported");
        assert!(matches!(err, LoaderError::UnsupportedFormat { ref name } if name == "app.yaml"));
    }
}
