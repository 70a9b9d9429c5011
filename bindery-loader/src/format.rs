//! Parsing resource text into properties.

use std::path::Path;

use bindery_core::Properties;
use serde_json::{Map, Number, Value};

use crate::error::{LoaderError, LoaderResult};
use crate::resource::Resource;

/// Supported configuration file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// `key=value` lines.
    Properties,
    /// A JSON object.
    Json,
    /// A TOML document.
    Toml,
}

impl Format {
    /// Every format, in the order the loader tries them.
    pub const ALL: [Format; 3] = [Format::Properties, Format::Json, Format::Toml];

    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Properties => "properties",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }

    /// Picks the format from the extension of `name`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(extension))
    }

    /// Parses `resource` into a flat property store.
    ///
    /// # Errors
    ///
    /// Returns the syntax error of the format, or [`LoaderError::Store`] when
    /// keys conflict.
    pub fn parse(self, resource: &Resource) -> LoaderResult<Properties> {
        let name = resource.name();
        let text = resource.content();
        let document = match self {
            Self::Properties => return parse_properties(name, text),
            Self::Json => serde_json::from_str(text).map_err(|source| LoaderError::Json {
                name: name.to_owned(),
                source,
            })?,
            Self::Toml => {
                let table: toml::Table = text.parse().map_err(|source| LoaderError::Toml {
                    name: name.to_owned(),
                    source,
                })?;
                toml_to_json(toml::Value::Table(table))
            }
        };
        let mut properties = Properties::new();
        properties
            .extend_json("", &document)
            .map_err(|source| store_error(name, source))?;
        Ok(properties)
    }
}

fn store_error(name: &str, source: bindery_core::Error) -> LoaderError {
    LoaderError::Store {
        name: name.to_owned(),
        source,
    }
}

fn parse_properties(name: &str, text: &str) -> LoaderResult<Properties> {
    let mut properties = Properties::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some(split) = line.find(['=', ':']) else {
            return Err(LoaderError::PropertiesSyntax {
                name: name.to_owned(),
                line: index + 1,
            });
        };
        let key = line[..split].trim();
        let value = line[split + 1..].trim();
        properties
            .set(key, value)
            .map_err(|source| store_error(name, source))?;
    }
    Ok(properties)
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(text) => Value::String(text),
        toml::Value::Integer(int) => Value::from(int),
        toml::Value::Float(float) => {
            Number::from_f64(float).map_or_else(|| Value::String(float.to_string()), Value::Number)
        }
        toml::Value::Boolean(flag) => Value::Bool(flag),
        toml::Value::Datetime(datetime) => Value::String(datetime.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect::<Map<_, _>>(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::PropertySource;

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_name("config/app.TOML"), Some(Format::Toml));
        assert_eq!(Format::from_name("app.properties"), Some(Format::Properties));
        assert_eq!(Format::from_name("app.yaml"), None);
        assert_eq!(Format::from_name("app"), None);
    }

    #[test]
    fn properties_lines_skip_comments() {
        let resource = Resource::new(
            "app.properties",
            "# comment\n! also comment\n\nserver.port = 8080\nserver.host: localhost\nurl=http://x?a=b\n",
        );
        let props = Format::Properties.parse(&resource).unwrap();
        assert_eq!(props.get("server.port"), Some("8080"));
        assert_eq!(props.get("server.host"), Some("localhost"));
        assert_eq!(props.get("url"), Some("http://x?a=b"));
    }

    #[test]
    fn properties_syntax_errors_name_the_line() {
        let resource = Resource::new("bad.properties", "a=1\nnot a pair\n");
        let err = Format::Properties.parse(&resource).expect_err("no separator");
        assert!(matches!(err, LoaderError::PropertiesSyntax { line: 2, .. }));
        assert_eq!(err.to_string(), "bad.properties:2: expected `key=value` or `key: value`");
    }

    #[test]
    fn toml_tables_and_arrays_flatten() {
        let resource = Resource::new(
            "app.toml",
            "[server]\nport = 8080\nratio = 0.5\nhosts = [\"a\", \"b\"]\n\n[[users]]\nname = \"ann\"\n",
        );
        let props = Format::Toml.parse(&resource).unwrap();
        assert_eq!(props.get("server.port"), Some("8080"));
        assert_eq!(props.get("server.ratio"), Some("0.5"));
        assert_eq!(props.get("server.hosts[1]"), Some("b"));
        assert_eq!(props.get("users[0].name"), Some("ann"));
    }

    #[test]
    fn json_objects_flatten() {
        let resource = Resource::new("app.json", r#"{"db": {"pool": {"size": 4}, "ssl": true}}"#);
        let props = Format::Json.parse(&resource).unwrap();
        assert_eq!(props.get("db.pool.size"), Some("4"));
        assert_eq!(props.get("db.ssl"), Some("true"));

        let err = Format::Json
            .parse(&Resource::new("broken.json", "{"))
            .expect_err("malformed");
        assert!(matches!(err, LoaderError::Json { .. }));
    }
}
