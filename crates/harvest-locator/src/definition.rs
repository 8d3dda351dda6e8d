//! Locator strategies, manifest definitions and concrete locators.
//!
//! A [`LocatorDefinition`] is what the manifest declares: a name, a strategy
//! and a value template. A [`Locator`] is what the driver resolves: a strategy,
//! a concrete value and optionally a 1-based position among the matches.

use crate::error::{LocatorError, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Element lookup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    /// `id` attribute
    Id,
    /// XPath 1.0 expression
    XPath,
    /// CSS selector
    Css,
    /// Single class name
    Class,
    /// Exact anchor text
    LinkText,
    /// Tag name
    TagName,
    /// `name` attribute
    Name,
    /// Substring of anchor text
    PartialLinkText,
}

impl LocatorKind {
    /// Manifest spelling of this strategy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::XPath => "xpath",
            Self::Css => "css",
            Self::Class => "class",
            Self::LinkText => "linktext",
            Self::TagName => "tagname",
            Self::Name => "name",
            Self::PartialLinkText => "partiallinktext",
        }
    }
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocatorKind {
    type Err = ();

    /// Case-insensitive match against the manifest spellings.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "xpath" => Ok(Self::XPath),
            "css" => Ok(Self::Css),
            "class" => Ok(Self::Class),
            "linktext" => Ok(Self::LinkText),
            "tagname" => Ok(Self::TagName),
            "name" => Ok(Self::Name),
            "partiallinktext" => Ok(Self::PartialLinkText),
            _ => Err(()),
        }
    }
}

/// One named entry of a locator manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorDefinition {
    name: String,
    kind: LocatorKind,
    value: String,
}

impl LocatorDefinition {
    /// Build a definition from the manifest's raw strings.
    ///
    /// # Errors
    /// Returns [`LocatorError::UnknownType`] if `kind` is not a known strategy.
    pub fn parse(name: impl Into<String>, kind: &str, value: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let kind = kind.parse().map_err(|()| LocatorError::UnknownType {
            name: name.clone(),
            found: kind.to_string(),
        })?;
        Ok(Self::new(name, kind, value))
    }

    /// Build a definition from an already-typed strategy.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
        }
    }

    /// Element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lookup strategy.
    #[must_use]
    pub fn kind(&self) -> LocatorKind {
        self.kind
    }

    /// Value template, possibly containing `{0}`/`{1}` placeholders.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Placeholder indexes present in the value template.
    #[must_use]
    pub fn placeholders(&self) -> BTreeSet<usize> {
        placeholder_regex()
            .captures_iter(&self.value)
            .filter_map(|c| c[1].parse().ok())
            .collect()
    }

    /// Locator for the template as written.
    #[must_use]
    pub fn locator(&self) -> Locator {
        Locator::new(self.kind, self.value.clone())
    }
}

/// A concrete element query handed to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    kind: LocatorKind,
    value: String,
    nth: Option<usize>,
}

impl Locator {
    /// Locator matching the first element for `value`.
    #[must_use]
    pub fn new(kind: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            nth: None,
        }
    }

    /// Lookup strategy.
    #[must_use]
    pub fn kind(&self) -> LocatorKind {
        self.kind
    }

    /// Raw query value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// 1-based position among all matches, if pinned.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.nth
    }

    /// Stable identity of the query, used for logging and test doubles.
    ///
    /// A positioned locator renders as `(value)[n]`.
    #[must_use]
    pub fn key(&self) -> String {
        match self.nth {
            Some(n) => format!("({})[{n}]", self.value),
            None => self.value.clone(),
        }
    }

    /// Substitute `{i}` placeholders with `args[i]`.
    ///
    /// Tokens without a matching argument are left untouched. The receiver is
    /// not modified.
    #[must_use]
    pub fn specialize(&self, args: &[usize]) -> Self {
        let value = placeholder_regex().replace_all(&self.value, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| args.get(i))
                .map_or_else(|| caps[0].to_string(), ToString::to_string)
        });

        Self {
            kind: self.kind,
            value: value.into_owned(),
            nth: self.nth,
        }
    }

    /// Locator for the `position`-th (1-based) match of this query.
    ///
    /// XPath queries are rewritten as `(value)[position]` so the browser does
    /// the indexing; other strategies carry the position alongside the value.
    #[must_use]
    pub fn nth(&self, position: usize) -> Self {
        match self.kind {
            LocatorKind::XPath => Self {
                kind: self.kind,
                value: format!("({})[{position}]", self.value),
                nth: None,
            },
            _ => Self {
                kind: self.kind,
                value: self.value.clone(),
                nth: Some(position),
            },
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.key())
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"\{(\d+)\}").expect("valid regex"))
}
