//! Text templates.
//!
//! Two tag forms are recognised:
//!
//! | Tag | Output |
//! |-----|--------|
//! | `<%- field %>` | the parameter, HTML-escaped |
//! | `<%= field %>` | the parameter, verbatim |
//!
//! Strings render as-is, numbers and booleans in their JSON form, and `null`
//! or a missing parameter as nothing.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use helios_provider::Fields;

const OPEN: &str = "<%";
const CLOSE: &str = "%>";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Escaped(String),
    Raw(String),
}

#[derive(Clone)]
enum Body {
    Parsed(Rc<[Segment]>),
    Func(Rc<dyn Fn(&Fields) -> String>),
}

/// A parsed template, or a function producing markup from parameters.
#[derive(Clone)]
pub struct Template {
    body: Body,
}

impl Template {
    /// Parse template text.
    ///
    /// Unterminated tags, tags without a `-`/`=` marker, and tags without a
    /// field name are rejected.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let mut segments = Vec::new();
        let mut rest = text;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let position = offset + start;
            let after_open = &rest[start + OPEN.len()..];
            let Some(end) = after_open.find(CLOSE) else {
                return Err(template_error(position, "unterminated tag"));
            };
            let tag = &after_open[..end];
            let (escaped, name) = match tag.chars().next() {
                Some('-') => (true, tag[1..].trim()),
                Some('=') => (false, tag[1..].trim()),
                _ => return Err(template_error(position, "expected '<%-' or '<%='")),
            };
            if !is_field_name(name) {
                return Err(template_error(
                    position,
                    &format!("invalid field name '{name}'"),
                ));
            }
            segments.push(if escaped {
                Segment::Escaped(name.to_string())
            } else {
                Segment::Raw(name.to_string())
            });

            let consumed = start + OPEN.len() + end + CLOSE.len();
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            body: Body::Parsed(segments.into()),
        })
    }

    /// Wrap a function template.
    pub fn from_fn(render: impl Fn(&Fields) -> String + 'static) -> Self {
        Self {
            body: Body::Func(Rc::new(render)),
        }
    }

    /// A template that renders nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            body: Body::Parsed(Rc::from(Vec::new())),
        }
    }

    pub fn render(&self, params: &Fields) -> String {
        match &self.body {
            Body::Func(render) => render(params),
            Body::Parsed(segments) => {
                let mut out = String::new();
                for segment in segments.iter() {
                    match segment {
                        Segment::Text(text) => out.push_str(text),
                        Segment::Escaped(name) => out.push_str(&escape_html(&lookup(params, name))),
                        Segment::Raw(name) => out.push_str(&lookup(params, name)),
                    }
                }
                out
            }
        }
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Body::Parsed(segments) => f
                .debug_struct("Template")
                .field("segments", &segments.len())
                .finish(),
            Body::Func(_) => f.write_str("Template(fn)"),
        }
    }
}

fn template_error(position: usize, message: &str) -> CoreError {
    CoreError::Template {
        position,
        message: message.to_string(),
    }
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn lookup(params: &Fields, name: &str) -> String {
    match params.get(name) {
        Some(value) => value_to_text(value),
        None => {
            log::debug!("Template parameter '{name}' missing, rendering empty");
            String::new()
        }
    }
}

/// Render a JSON value as template text.
#[must_use]
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escape text for inclusion in HTML content or attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '`' => out.push_str("&#x60;"),
            _ => out.push(c),
        }
    }
    out
}
