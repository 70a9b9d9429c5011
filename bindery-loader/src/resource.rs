//! Locating configuration resources.

use std::path::{Path, PathBuf};

use bindery_bind::{Binder, Describe};
use bindery_core::PropertySource;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{LoaderError, LoaderResult};

/// Named configuration text, usually the contents of a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    name: String,
    content: String,
}

impl Resource {
    /// Creates an in-memory resource; `name` decides the format by extension.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Reads a resource from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Io`] when the file cannot be read.
    pub fn read(path: impl AsRef<Path>) -> LoaderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path.display().to_string(), content))
    }

    /// Resource name, a path for files.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Finds every resource with a given file name.
pub trait ResourceLocator {
    /// Returns the resources named `filename`, in precedence order; later
    /// resources override earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError`] when an existing resource cannot be read.
    fn locate(&self, filename: &str) -> LoaderResult<Vec<Resource>>;
}

/// Looks up files below a list of directories.
#[derive(Clone, Debug, PartialEq, Eq, Describe, Serialize, Deserialize)]
pub struct FileResourceLocator {
    #[value("${app.config.locations:=config/}")]
    config_locations: Vec<String>,
}

impl Default for FileResourceLocator {
    fn default() -> Self {
        Self::new(["config/"])
    }
}

impl FileResourceLocator {
    /// Searches the given directories in order.
    #[must_use]
    pub fn new<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            config_locations: locations.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads the directories from `app.config.locations`, defaulting to
    /// `config/`.
    ///
    /// # Errors
    ///
    /// Returns the binding error when the property cannot be bound.
    pub fn from_properties(
        binder: &Binder,
        source: &dyn PropertySource,
    ) -> bindery_core::Result<Self> {
        binder.bind(source, "${ROOT}")
    }

    /// Directories searched, in order.
    #[must_use]
    pub fn locations(&self) -> &[String] {
        &self.config_locations
    }
}

impl ResourceLocator for FileResourceLocator {
    fn locate(&self, filename: &str) -> LoaderResult<Vec<Resource>> {
        let mut resources = Vec::new();
        for location in &self.config_locations {
            let path = PathBuf::from(location).join(filename);
            match Resource::read(&path) {
                Ok(resource) => resources.push(resource),
                Err(LoaderError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    trace!(path = %path.display(), "resource not found");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::Properties;

    #[test]
    fn locations_bind_from_properties() {
        let binder = Binder::default();
        let locator = FileResourceLocator::from_properties(&binder, &Properties::new()).unwrap();
        assert_eq!(locator.locations(), ["config/"]);

        let props = Properties::from_pairs([("app.config.locations", "etc/, conf.d/")]).unwrap();
        let locator = FileResourceLocator::from_properties(&binder, &props).unwrap();
        assert_eq!(locator.locations(), ["etc/", "conf.d/"]);
    }

    #[test]
    fn missing_files_are_skipped() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("app.properties"), "a=1").unwrap();

        let locator = FileResourceLocator::new([
            first.path().display().to_string(),
            second.path().display().to_string(),
        ]);
        let found = locator.locate("app.properties").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content(), "a=1");
        assert!(found[0].name().ends_with("app.properties"));
    }
}
