use std::fmt;
use std::str::FromStr;

use super::EventTarget;
use crate::error::{CoreError, CoreResult};

/// A compound selector: an optional tag (or `*`) followed by any number of
/// `.class`, `[attr]` and `[attr=value]` conditions.
///
/// Descendant and sibling combinators are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Selector {
    pub fn parse(input: &str) -> CoreResult<Self> {
        let source = input.trim();
        let fail = |message: &str| CoreError::InvalidSelector {
            selector: input.to_string(),
            message: message.to_string(),
        };
        if source.is_empty() {
            return Err(fail("empty selector"));
        }

        let tag_end = source.find(['.', '[']).unwrap_or(source.len());
        let tag = &source[..tag_end];
        let tag = match tag {
            "" | "*" => None,
            name if is_ident(name) => Some(name.to_ascii_lowercase()),
            _ => return Err(fail("invalid tag name")),
        };

        let mut classes = Vec::new();
        let mut attrs = Vec::new();
        let mut rest = &source[tag_end..];
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                let class = &after[..end];
                if !is_ident(class) {
                    return Err(fail("invalid class name"));
                }
                classes.push(class.to_string());
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let Some(close) = after.find(']') else {
                    return Err(fail("unterminated attribute condition"));
                };
                let condition = &after[..close];
                let (name, value) = match condition.split_once('=') {
                    Some((name, value)) => (name.trim(), Some(unquote(value.trim()))),
                    None => (condition.trim(), None),
                };
                if !is_ident(name) {
                    return Err(fail("invalid attribute name"));
                }
                attrs.push((name.to_string(), value.map(str::to_string)));
                rest = &after[close + 1..];
            } else {
                return Err(fail("unsupported selector syntax"));
            }
        }

        Ok(Self {
            source: source.to_string(),
            tag,
            classes,
            attrs,
        })
    }

    pub fn matches(&self, target: &EventTarget) -> bool {
        if let Some(tag) = &self.tag
            && !target.tag().eq_ignore_ascii_case(tag)
        {
            return false;
        }
        self.classes.iter().all(|class| target.has_class(class))
            && self.attrs.iter().all(|(name, expected)| match expected {
                Some(value) => target.get(name) == Some(value.as_str()),
                None => target.get(name).is_some(),
            })
    }
}

impl FromStr for Selector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}
