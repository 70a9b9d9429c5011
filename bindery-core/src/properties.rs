//! Flat, dotted-key property store.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Read surface the binder consumes; any property source can implement it.
pub trait PropertySource {
    /// Returns `true` if `key` is a leaf or a prefix of other keys.
    fn has(&self, key: &str) -> bool;

    /// Returns the leaf value stored under `key`.
    fn get(&self, key: &str) -> Option<&str>;

    /// Lists the distinct child segment names one level below `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropertyConflict`] when `prefix` is itself a leaf.
    fn sub_keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Ordered mapping from dotted keys (`a.b[0].c`) to string values.
///
/// A key is either a leaf holding a value or a container prefixing other
/// keys, never both.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    data: BTreeMap<String, String>,
}

impl Properties {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Properties::set`].
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut properties = Self::new();
        for (key, value) in pairs {
            properties.set(key, value)?;
        }
        Ok(properties)
    }

    /// Stores `value` under `key`, replacing an existing leaf.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSyntax`] for malformed keys and
    /// [`Error::PropertyConflict`] when the key would turn a leaf into a
    /// container or the other way around.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        for ancestor in ancestors(&key)? {
            if self.data.contains_key(ancestor) {
                return Err(Error::PropertyConflict {
                    key: key.clone(),
                    reason: format!("`{ancestor}` already holds a value"),
                });
            }
        }
        if !self.data.contains_key(&key) && self.has_children(&key) {
            return Err(Error::PropertyConflict {
                reason: format!("`{key}` already has nested properties"),
                key,
            });
        }
        self.data.insert(key, value.into());
        Ok(())
    }

    /// Merges every entry of `other` into this store.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Properties::set`].
    pub fn merge(&mut self, other: Properties) -> Result<()> {
        for (key, value) in other.data {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Flattens a JSON document into the store below `prefix`.
    ///
    /// Objects contribute `.child` segments, arrays `[i]` segments, and
    /// scalars are stored in their textual form. Nulls and empty containers
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Properties::set`], including a
    /// scalar document with an empty prefix.
    pub fn extend_json(&mut self, prefix: &str, value: &Value) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::Object(map) => {
                for (name, child) in map {
                    let key = if prefix.is_empty() {
                        name.clone()
                    } else {
                        format!("{prefix}.{name}")
                    };
                    self.extend_json(&key, child)?;
                }
                Ok(())
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    self.extend_json(&format!("{prefix}[{index}]"), child)?;
                }
                Ok(())
            }
            Value::String(text) => self.set(prefix, text.as_str()),
            Value::Bool(_) | Value::Number(_) => self.set(prefix, value.to_string()),
        }
    }

    /// Number of leaf entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over leaf entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn descendants<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.data
            .range::<str, _>((Bound::Excluded(prefix), Bound::Unbounded))
            .map(|(key, _)| key.as_str())
            .take_while(move |key| key.starts_with(prefix))
            .filter(move |key| {
                prefix.is_empty() || matches!(key.as_bytes().get(prefix.len()), Some(b'.' | b'['))
            })
    }

    fn has_children(&self, prefix: &str) -> bool {
        self.descendants(prefix).next().is_some()
    }
}

impl PropertySource for Properties {
    fn has(&self, key: &str) -> bool {
        self.data.contains_key(key) || self.has_children(key)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    fn sub_keys(&self, prefix: &str) -> Result<Vec<String>> {
        if self.data.contains_key(prefix) {
            return Err(Error::PropertyConflict {
                key: prefix.to_owned(),
                reason: "property holds a value, not nested properties".into(),
            });
        }
        let start = if prefix.is_empty() { 0 } else { prefix.len() + 1 };
        let mut names = BTreeSet::new();
        for key in self.descendants(prefix) {
            if !prefix.is_empty() && key.as_bytes()[prefix.len()] != b'.' {
                continue;
            }
            let rest = &key[start..];
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            names.insert(rest[..end].to_owned());
        }
        Ok(names.into_iter().collect())
    }
}

/// Read-only view layering `top` over a borrowed base source.
#[derive(Clone, Copy)]
pub struct Overlay<'a> {
    top: &'a Properties,
    base: &'a dyn PropertySource,
}

impl<'a> Overlay<'a> {
    /// Creates a view where entries in `top` shadow those in `base`.
    #[must_use]
    pub fn new(top: &'a Properties, base: &'a dyn PropertySource) -> Self {
        Self { top, base }
    }
}

impl PropertySource for Overlay<'_> {
    fn has(&self, key: &str) -> bool {
        self.top.has(key) || self.base.has(key)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.top.get(key).or_else(|| self.base.get(key))
    }

    fn sub_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> = self.top.sub_keys(prefix)?.into_iter().collect();
        names.extend(self.base.sub_keys(prefix)?);
        Ok(names.into_iter().collect())
    }
}

/// Validates `key` and returns every container prefix, outermost first.
fn ancestors(key: &str) -> Result<Vec<&str>> {
    if key.is_empty() {
        return Err(Error::syntax(key, "property key cannot be empty"));
    }
    let bytes = key.as_bytes();
    let mut found = Vec::new();
    let mut expect_name = true;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'.' => {
                if expect_name {
                    return Err(Error::syntax(key, "empty path segment"));
                }
                found.push(&key[..i]);
                expect_name = true;
                i += 1;
            }
            b'[' => {
                if expect_name {
                    return Err(Error::syntax(key, "index without a name"));
                }
                let close = key[i..]
                    .find(']')
                    .map(|offset| i + offset)
                    .ok_or_else(|| Error::syntax(key, "unclosed index"))?;
                let index = &key[i + 1..close];
                if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Error::syntax(key, "index must be a non-negative integer"));
                }
                found.push(&key[..i]);
                i = close + 1;
                if i < bytes.len() && !matches!(bytes[i], b'.' | b'[') {
                    return Err(Error::syntax(key, "unexpected character after index"));
                }
            }
            b']' => return Err(Error::syntax(key, "unbalanced `]`")),
            _ => {
                expect_name = false;
                i += 1;
            }
        }
    }
    if expect_name {
        return Err(Error::syntax(key, "empty path segment"));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn store() -> Properties {
        Properties::from_pairs([
            ("server.port", "8080"),
            ("server.hosts[0]", "a"),
            ("server.hosts[1]", "b"),
            ("server.tls.enabled", "true"),
            ("server-name", "edge"),
            ("name", "demo"),
        ])
        .unwrap()
    }

    #[test]
    fn has_covers_leaves_and_containers() {
        let p = store();
        assert!(p.has("server"));
        assert!(p.has("server.hosts"));
        assert!(p.has("server.hosts[1]"));
        assert!(!p.has("server.hosts[2]"));
        assert!(!p.has("serv"));
        assert_eq!(p.get("server.port"), Some("8080"));
        assert_eq!(p.get("server"), None);
    }

    #[test]
    fn sub_keys_lists_one_level() {
        let p = store();
        assert_eq!(p.sub_keys("server").unwrap(), ["hosts", "port", "tls"]);
        assert_eq!(p.sub_keys("").unwrap(), ["name", "server", "server-name"]);
        assert!(p.sub_keys("missing").unwrap().is_empty());

        let err = p.sub_keys("name").expect_err("leaf has no sub keys");
        assert_eq!(err.kind(), ErrorKind::PropertyConflict);
    }

    #[test]
    fn leaf_and_container_conflict() {
        let mut p = store();
        let err = p.set("name.first", "x").expect_err("name is a leaf");
        assert_eq!(err.kind(), ErrorKind::PropertyConflict);

        let err = p.set("server", "x").expect_err("server is a container");
        assert_eq!(err.kind(), ErrorKind::PropertyConflict);

        p.set("name", "other").unwrap();
        assert_eq!(p.get("name"), Some("other"));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        let mut p = Properties::new();
        for key in ["", "a..b", ".a", "a.", "[0]", "a[x]", "a[0", "a[0]b", "a]"] {
            let err = p.set(key, "v").expect_err(key);
            assert_eq!(err.kind(), ErrorKind::InvalidSyntax, "{key}");
        }
        p.set("a[0][1].b", "v").unwrap();
        assert!(p.has("a[0]"));
    }

    #[test]
    fn json_documents_flatten() {
        let mut p = Properties::new();
        let doc = serde_json::json!({
            "db": { "url": "postgres://", "pool": 4, "replicas": ["r1", "r2"] },
            "debug": false,
            "unused": null
        });
        p.extend_json("", &doc).unwrap();

        assert_eq!(p.get("db.url"), Some("postgres://"));
        assert_eq!(p.get("db.pool"), Some("4"));
        assert_eq!(p.get("db.replicas[1]"), Some("r2"));
        assert_eq!(p.get("debug"), Some("false"));
        assert!(!p.has("unused"));
    }

    #[test]
    fn overlay_prefers_top() {
        let base = store();
        let top = Properties::from_pairs([("name", "shadow"), ("extra.k", "v")]).unwrap();
        let view = Overlay::new(&top, &base);

        assert_eq!(view.get("name"), Some("shadow"));
        assert_eq!(view.get("server.port"), Some("8080"));
        assert!(view.has("extra"));
        assert_eq!(
            view.sub_keys("").unwrap(),
            ["extra", "name", "server", "server-name"]
        );
    }
}
