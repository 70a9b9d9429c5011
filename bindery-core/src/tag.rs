//! Value tags and binding targets.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tag key that binds the whole store at the current path.
pub const ROOT_KEY: &str = "ROOT";

/// Reserved key substituted for an empty tag key.
pub const ANONYMOUS_KEY: &str = "ANONYMOUS";

/// Decomposition of a `${key:=default}||splitter` value tag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedTag {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    splitter: Option<String>,
}

impl ParsedTag {
    /// Creates a tag for `key` without default or splitter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSyntax`] when `key` contains `:=` or `}`, which
    /// a parsed tag could not reproduce.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.contains(":=") || key.contains('}') {
            return Err(Error::syntax(&key, "tag key must not contain `:=` or `}`"));
        }
        Ok(Self {
            key,
            default: None,
            splitter: None,
        })
    }

    /// Attaches a default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Names the splitter used for sequence binding. Blank names clear it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSyntax`] when the name contains `|` or `}`.
    pub fn with_splitter(mut self, splitter: impl Into<String>) -> Result<Self> {
        let splitter = splitter.into().trim().to_owned();
        if splitter.contains(['|', '}']) {
            return Err(Error::syntax(
                &splitter,
                "splitter name must not contain `|` or `}`",
            ));
        }
        self.splitter = (!splitter.is_empty()).then_some(splitter);
        Ok(self)
    }

    /// Parses a value tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSyntax`] when the tag lacks `${` or `}`, or starts
    /// with the `||` splitter separator.
    pub fn parse(tag: &str) -> Result<Self> {
        let splitter_at = tag.rfind("||");
        if splitter_at == Some(0) {
            return Err(Error::syntax(tag, "splitter without a value tag"));
        }
        let close = match tag.rfind('}') {
            Some(close) if close > 0 => close,
            _ => return Err(Error::syntax(tag, "missing closing `}`")),
        };
        let Some(open) = tag.find("${") else {
            return Err(Error::syntax(tag, "missing opening `${`"));
        };
        if open + 2 > close {
            return Err(Error::syntax(tag, "closing `}` precedes `${`"));
        }

        let invalid = |err: Error| match err {
            Error::InvalidSyntax { reason, .. } => Error::syntax(tag, reason),
            other => other,
        };
        let mut parsed = match tag[open + 2..close].split_once(":=") {
            Some((key, default)) => Self::new(key).map_err(invalid)?.with_default(default),
            None => Self::new(&tag[open + 2..close]).map_err(invalid)?,
        };
        if let Some(at) = splitter_at.filter(|at| *at > close) {
            parsed = parsed.with_splitter(&tag[at + 2..]).map_err(invalid)?;
        }
        Ok(parsed)
    }

    /// Returns the property key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Returns `true` when the tag carries a default value, even an empty one.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Returns the splitter name, if any.
    #[must_use]
    pub fn splitter(&self) -> Option<&str> {
        self.splitter.as_deref()
    }
}

impl Display for ParsedTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}", self.key)?;
        if let Some(default) = &self.default {
            write!(f, ":={default}")?;
        }
        f.write_str("}")?;
        if let Some(splitter) = &self.splitter {
            write!(f, "||{splitter}")?;
        }
        Ok(())
    }
}

impl FromStr for ParsedTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A named validation rule attached to a field, e.g. `expr = "$ > 0"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// Validator tag name.
    pub name: String,
    /// Rule content handed to the validator.
    pub content: String,
}

impl Rule {
    /// Creates a rule for the validator registered under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Key, diagnostic path, tag and validation rules threaded through one bind call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindTarget {
    key: String,
    path: String,
    tag: ParsedTag,
    rules: Vec<Rule>,
}

impl BindTarget {
    /// Creates a target bound at `key` and reported as `path`.
    #[must_use]
    pub fn new(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            tag: ParsedTag::default(),
            rules: Vec::new(),
        }
    }

    /// Creates a target from a value tag, resolved relative to the store root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSyntax`] when the tag cannot be parsed.
    pub fn from_tag(tag: &str, path: impl Into<String>) -> Result<Self> {
        let mut target = Self::new("", path);
        target.apply_tag(tag, Vec::new())?;
        Ok(target)
    }

    /// Applies a value tag on top of the current key.
    ///
    /// `ROOT` keeps the current key, an empty tag key becomes
    /// [`ANONYMOUS_KEY`], anything else is appended as a child segment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSyntax`] when the tag cannot be parsed.
    pub fn apply_tag(&mut self, tag: &str, rules: Vec<Rule>) -> Result<()> {
        let mut parsed = ParsedTag::parse(tag)?;
        if parsed.key == ROOT_KEY {
            parsed.key.clear();
        } else if parsed.key.is_empty() {
            ANONYMOUS_KEY.clone_into(&mut parsed.key);
        }
        if self.key.is_empty() {
            self.key.clone_from(&parsed.key);
        } else if !parsed.key.is_empty() {
            self.key = format!("{}.{}", self.key, parsed.key);
        }
        self.tag = parsed;
        self.rules = rules;
        Ok(())
    }

    /// Returns a child target for a named segment, without tag or rules.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        let key = if self.key.is_empty() {
            segment.to_owned()
        } else {
            format!("{}.{segment}", self.key)
        };
        Self::new(key, format!("{}.{segment}", self.path))
    }

    /// Returns the target of the `index`-th sequence element.
    #[must_use]
    pub fn element(&self, index: usize) -> Self {
        Self::new(
            format!("{}[{index}]", self.key),
            format!("{}[{index}]", self.path),
        )
    }

    /// Replaces the validation rules.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    /// Replaces the diagnostic path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Full dotted property key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Full diagnostic path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parsed value tag.
    #[must_use]
    pub fn tag(&self) -> &ParsedTag {
        &self.tag
    }

    /// Validation rules attached to the target.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}
