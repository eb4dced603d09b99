use std::collections::BTreeMap;

use super::Element;

/// Description of the element that received an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTarget {
    tag: String,
    attrs: BTreeMap<String, String>,
}

impl EventTarget {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Describe an existing element.
    #[must_use]
    pub fn of(element: &Element) -> Self {
        Self {
            tag: element.tag().to_string(),
            attrs: element.attrs(),
        }
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// A user interaction delivered to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    kind: String,
    target: EventTarget,
}

impl DomEvent {
    pub fn new(kind: impl Into<String>, target: EventTarget) -> Self {
        Self {
            kind: kind.into(),
            target,
        }
    }

    pub fn click(target: EventTarget) -> Self {
        Self::new("click", target)
    }

    /// A click on `<button name="...">`.
    pub fn click_button(name: &str) -> Self {
        Self::click(EventTarget::new("button").attr("name", name))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn target(&self) -> &EventTarget {
        &self.target
    }
}
