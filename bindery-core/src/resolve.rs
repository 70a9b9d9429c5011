//! Placeholder expansion for `${key:=default}` references.

use std::borrow::Cow;

use tracing::trace;

use crate::error::{Error, Result};
use crate::properties::PropertySource;
use crate::tag::BindTarget;

/// Upper bound on nested lookups, reached by self-referencing properties.
const MAX_DEPTH: usize = 64;

/// Expands placeholders against a borrowed property source.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    source: &'a dyn PropertySource,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver reading from `source`.
    #[must_use]
    pub fn new(source: &'a dyn PropertySource) -> Self {
        Self { source }
    }

    /// Returns the effective string value of a binding target.
    ///
    /// A non-empty stored value wins, then the tag default, then an empty
    /// string when the key exists without a value. The chosen value is
    /// expanded with [`Resolver::resolve_str`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotExist`] when neither the key nor a default exists,
    /// and [`Error::InvalidSyntax`] for unbalanced placeholders.
    pub fn resolve(&self, target: &BindTarget) -> Result<String> {
        self.lookup(target, 0)
    }

    /// Expands every top-level `${...}` span of `s`, left to right.
    ///
    /// Input without `${` is returned borrowed and unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSyntax`] for unbalanced braces and
    /// [`Error::NotExist`] when a referenced key has neither value nor default.
    pub fn resolve_str<'s>(&self, s: &'s str) -> Result<Cow<'s, str>> {
        self.expand(s, 0)
    }

    fn lookup(&self, target: &BindTarget, depth: usize) -> Result<String> {
        if depth > MAX_DEPTH {
            return Err(Error::syntax(
                target.key(),
                "placeholder references nest too deeply",
            ));
        }
        let key = target.key();
        if let Some(value) = self.source.get(key).filter(|v| !v.is_empty()) {
            return self.expand(value, depth).map(Cow::into_owned);
        }
        if let Some(default) = target.tag().default_value() {
            return self.expand(default, depth).map(Cow::into_owned);
        }
        if self.source.has(key) {
            return Ok(String::new());
        }
        Err(Error::NotExist {
            key: key.to_owned(),
            path: target.path().to_owned(),
        })
    }

    fn expand<'s>(&self, s: &'s str, depth: usize) -> Result<Cow<'s, str>> {
        let bytes = s.as_bytes();
        let mut count = 0usize;
        let mut start = None;
        let mut end = None;

        for (i, byte) in bytes.iter().enumerate() {
            match *byte {
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    if count == 0 {
                        start = Some(i);
                    }
                    count += 1;
                }
                b'}' if count > 0 => {
                    count -= 1;
                    if count == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        let Some(start) = start else {
            return Ok(Cow::Borrowed(s));
        };
        let Some(end) = end else {
            return Err(Error::syntax(s, "unbalanced placeholder braces"));
        };

        let span = &s[start..=end];
        let target = BindTarget::from_tag(span, "")?;
        let value = self.lookup(&target, depth + 1)?;
        trace!(placeholder = span, key = target.key(), "placeholder resolved");
        let rest = self.expand(&s[end + 1..], depth)?;

        Ok(Cow::Owned(format!("{}{value}{rest}", &s[..start])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Properties};

    fn store() -> Properties {
        Properties::from_pairs([
            ("host", "localhost"),
            ("port", "8080"),
            ("url", "http://${host}:${port}/"),
            ("empty", ""),
            ("self", "${self}"),
        ])
        .unwrap()
    }

    #[test]
    fn plain_strings_are_borrowed() {
        let p = store();
        let resolver = Resolver::new(&p);
        let out = resolver.resolve_str("no placeholders {here}").unwrap();
        assert!(matches!(out, Cow::Borrowed("no placeholders {here}")));
    }

    #[test]
    fn expands_left_to_right_and_recursively() {
        let p = store();
        let resolver = Resolver::new(&p);
        assert_eq!(
            resolver.resolve_str("GET ${url}index").unwrap(),
            "GET http://localhost:8080/index"
        );
        assert_eq!(
            resolver.resolve_str("${missing:=${host}}-${port}").unwrap(),
            "localhost-8080"
        );
    }

    #[test]
    fn default_applies_to_absent_and_empty_values() {
        let p = store();
        let resolver = Resolver::new(&p);
        assert_eq!(resolver.resolve_str("${nope:=fallback}").unwrap(), "fallback");
        assert_eq!(resolver.resolve_str("${empty:=fallback}").unwrap(), "fallback");
        assert_eq!(resolver.resolve_str("[${empty}]").unwrap(), "[]");
    }

    #[test]
    fn missing_key_is_not_exist() {
        let p = store();
        let err = Resolver::new(&p)
            .resolve_str("x ${nope} y")
            .expect_err("nope is absent");
        assert!(err.is_not_exist());
        assert!(matches!(err, Error::NotExist { ref key, .. } if key == "nope"));
    }

    #[test]
    fn unbalanced_braces_are_syntax_errors() {
        let p = store();
        let resolver = Resolver::new(&p);
        for input in ["${host", "${a:=${b}", "x ${"] {
            let err = resolver.resolve_str(input).expect_err(input);
            assert_eq!(err.kind(), ErrorKind::InvalidSyntax, "{input}");
        }
    }

    #[test]
    fn self_reference_is_bounded() {
        let p = store();
        let err = Resolver::new(&p)
            .resolve_str("${self}")
            .expect_err("self reference never terminates");
        assert_eq!(err.kind(), ErrorKind::InvalidSyntax);
    }

    #[test]
    fn resolve_target_uses_stored_value_then_default() {
        let p = store();
        let resolver = Resolver::new(&p);
        let target = BindTarget::from_tag("${port:=9090}", "Config.port").unwrap();
        assert_eq!(resolver.resolve(&target).unwrap(), "8080");

        let target = BindTarget::from_tag("${timeout:=${port}}", "Config.timeout").unwrap();
        assert_eq!(resolver.resolve(&target).unwrap(), "8080");

        let target = BindTarget::from_tag("${timeout}", "Config.timeout").unwrap();
        let err = resolver.resolve(&target).expect_err("no default");
        assert_eq!(err.path(), "Config.timeout");
    }
}
