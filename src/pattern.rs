//! Route template compilation.
//!
//! A template is a path with `{name}` or `{name:modifier}` placeholders:
//!
//! ```text
//! /users/{id:integer}/files/{rest:path}
//! ```
//!
//! Each placeholder becomes exactly one capturing group in an anchored regex,
//! in left-to-right order, and its name is recorded in the same order. A
//! template without placeholders compiles to a literal and is matched by
//! plain string comparison.
//!
//! | Modifier | Aliases | Matches |
//! |---|---|---|
//! | *(none)* | | the shortest run of non-slash characters, possibly empty |
//! | `path` | `p` | anything, slashes included |
//! | `integer` | `i`, `int` | `[+-]?\d+` |
//! | `float` | `f`, `number` | `[+-]?(\d*.)?\d+` |
//! | `boolean` | `b`, `bool` | `1 0 t f true false T F TRUE FALSE` |
//! | `uuid` | | RFC 4122 UUID, dashes optional |
//! | `hex` | | optional `0x` prefix, hex digits |
//! | `file.ext` | `f.e`, `ext` | `.ext` or nothing |
//! | `rid` | | 20 lowercase alphanumerics |
//! | `enum(a,b)` | `e(…)` | one of the listed words |
//! | `regexp(expr)` | `rgx(…)` | `expr` |
//!
//! Unknown modifiers fall back to a plain segment.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

/// Path parameters extracted from a match, keyed by placeholder name.
pub type Params = HashMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([^/]*?)\}").unwrap_or_else(|e| panic!("placeholder scanner: {e}"))
});

/// How a placeholder segment is matched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Modifier {
    Plain,
    Path,
    Integer,
    Float,
    Boolean,
    Uuid,
    Hex,
    FileExt,
    Rid,
    Enum(Vec<String>),
    Regexp(String),
}

impl Modifier {
    /// Parses the text after the `:` of a placeholder.
    ///
    /// Named modifiers are case-insensitive. The body of `regexp(…)` keeps
    /// its case; `enum(…)` is split on every non-alphanumeric character.
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        match text.to_ascii_lowercase().as_str() {
            "p" | "path" => Self::Path,
            "i" | "int" | "integer" => Self::Integer,
            "f" | "number" | "float" => Self::Float,
            "b" | "bool" | "boolean" => Self::Boolean,
            "uuid" => Self::Uuid,
            "hex" => Self::Hex,
            "f.e" | "file.ext" | "ext" => Self::FileExt,
            "rid" => Self::Rid,
            _ => Self::parse_inline(text).unwrap_or(Self::Plain),
        }
    }

    fn parse_inline(text: &str) -> Option<Self> {
        let open = text.find('(')?;
        let close = text.rfind(')')?;
        if open == 0 || close <= open {
            return None;
        }
        let body = text[open + 1..close].trim();
        if body.is_empty() {
            return None;
        }
        match text[..open].trim().to_ascii_lowercase().as_str() {
            "regexp" | "rgx" => Some(Self::Regexp(body.to_owned())),
            "enum" | "e" => {
                let values: Vec<String> = body
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|v| !v.is_empty())
                    .map(str::to_owned)
                    .collect();
                (!values.is_empty()).then_some(Self::Enum(values))
            }
            _ => None,
        }
    }

    /// The regex body placed inside this placeholder's capturing group.
    pub fn fragment(&self) -> Cow<'_, str> {
        match self {
            Self::Plain => Cow::Borrowed(r"[^/\\]*?"),
            Self::Path => Cow::Borrowed(".*?"),
            Self::Integer => Cow::Borrowed(r"[+-]?\d+"),
            Self::Float => Cow::Borrowed(r"[+-]?(?:\d*[.])?\d+"),
            Self::Boolean => Cow::Borrowed("1|0|t|f|true|false|T|F|TRUE|FALSE"),
            Self::Uuid => Cow::Borrowed(
                "[a-fA-F0-9]{8}-?[a-f0-9]{4}-?[1-5][a-fA-F0-9]{3}-?[89abAB][a-fA-F0-9]{3}-?[a-fA-F0-9]{12}",
            ),
            Self::Hex => Cow::Borrowed("(?:0[xX])?[0-9a-fA-F]+"),
            Self::FileExt => Cow::Borrowed(r"\.[A-Za-z0-9]+|"),
            Self::Rid => Cow::Borrowed("[0-9a-z]{20}"),
            Self::Enum(values) => Cow::Owned(values.join("|")),
            Self::Regexp(expr) => Cow::Borrowed(expr),
        }
    }
}

/// Where a compiled pattern must stop matching.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Anchor {
    /// The whole path must match (routes).
    Exact,
    /// The pattern must match a leading run of whole segments (groups).
    Prefix,
}

/// A compiled route template.
#[derive(Clone, Debug)]
pub struct CompiledPattern {
    template: String,
    regex: Option<Regex>,
    names: Vec<String>,
}

impl CompiledPattern {
    /// Compiles `template` for whole-path matching.
    pub fn compile(template: &str) -> Result<Self, Error> {
        Self::compile_anchored(template, Anchor::Exact)
    }

    pub(crate) fn compile_anchored(template: &str, anchor: Anchor) -> Result<Self, Error> {
        let body = match anchor {
            Anchor::Exact => template,
            Anchor::Prefix if template.len() > 1 => template.trim_end_matches('/'),
            Anchor::Prefix => template,
        };

        let mut pattern = String::from("^");
        let mut names = Vec::new();
        let mut last = 0;
        for token in PLACEHOLDER.find_iter(body) {
            pattern.push_str(&regex::escape(&body[last..token.start()]));
            let inner = &body[token.start() + 1..token.end() - 1];
            let (name, modifier) = match inner.split_once(':') {
                Some((name, modifier)) if !name.trim().is_empty() => {
                    (name.trim(), Modifier::parse(modifier))
                }
                _ => (inner.trim(), Modifier::Plain),
            };
            names.push(name.to_owned());
            pattern.push('(');
            pattern.push_str(&modifier.fragment());
            pattern.push(')');
            last = token.end();
        }

        if names.is_empty() {
            return Ok(Self { template: template.to_owned(), regex: None, names });
        }

        pattern.push_str(&regex::escape(&body[last..]));
        pattern.push_str(match anchor {
            Anchor::Exact => "$",
            Anchor::Prefix => "(?:/|$)",
        });

        let regex = Regex::new(&pattern).map_err(|source| Error::Pattern {
            template: template.to_owned(),
            source,
        })?;
        Ok(Self { template: template.to_owned(), regex: Some(regex), names })
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// `true` when the template has no placeholders.
    pub fn is_literal(&self) -> bool {
        self.regex.is_none()
    }

    /// Placeholder names in left-to-right order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The generated regex source, if any.
    pub fn regex_source(&self) -> Option<&str> {
        self.regex.as_ref().map(Regex::as_str)
    }

    /// Matches `path`, returning the extracted parameters.
    ///
    /// Captured spans are taken left to right, skipping any group nested in
    /// (or overlapping) one already taken, so capturing groups inside a
    /// user-supplied `regexp(…)` do not shift the names that follow. A match
    /// that yields fewer values than names is rejected.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let Some(regex) = &self.regex else {
            return (path == self.template).then(Params::new);
        };
        let caps = regex.captures(path)?;

        let mut values = Vec::with_capacity(self.names.len());
        let mut end = 0;
        for group in caps.iter().skip(1).flatten() {
            if group.start() >= end {
                values.push(group.as_str());
                end = group.end();
            }
        }
        if values.len() < self.names.len() {
            return None;
        }

        Some(
            self.names
                .iter()
                .zip(values)
                .map(|(name, value)| (name.clone(), value.to_owned()))
                .collect(),
        )
    }

    /// `true` when `path` matches, without extracting parameters.
    pub fn is_match(&self, path: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(path),
            None => path == self.template,
        }
    }
}
