use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::Modal;
use crate::record::{Comparator, DefaultValue, Record, RecordKind};
use helios_provider::Fields;

/// Runs when its button is clicked, before the modal reacts to the click.
pub type ButtonAction = Rc<dyn Fn(&Modal)>;

/// Record kind of modal buttons. Buttons are never persisted.
pub static BUTTON: RecordKind = RecordKind {
    name: "button",
    endpoint: "",
    defaults: &[
        ("name", DefaultValue::Str("close")),
        ("icon", DefaultValue::Str("check")),
        ("label", DefaultValue::Str("Button")),
    ],
};

/// Display order of well-known button names, left to right.
const PRIORITY: [&str; 8] = ["no", "cancel", "close", "destroy", "save", "yes", "prev", "next"];

pub(crate) const BUTTON_TEMPLATE: &str = r#"<button type="button" name="<%-name%>"><span class="oi" data-glyph="<%-icon%>" aria-hidden="true"> </span><%-label%></button>"#;

/// A button shown in a modal's button bar.
#[derive(Clone)]
pub struct ButtonSpec {
    pub name: String,
    pub icon: String,
    pub label: String,
    pub action: Option<ButtonAction>,
}

impl ButtonSpec {
    pub fn new(name: &str, icon: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            icon: icon.to_string(),
            label: label.to_string(),
            action: None,
        }
    }

    #[must_use]
    pub fn with_action(mut self, action: impl Fn(&Modal) + 'static) -> Self {
        self.action = Some(Rc::new(action));
        self
    }

    pub(crate) fn to_record(&self) -> Record {
        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::from(self.name.as_str()));
        fields.insert("icon".to_string(), Value::from(self.icon.as_str()));
        fields.insert("label".to_string(), Value::from(self.label.as_str()));
        Record::from_fields(&BUTTON, fields)
    }
}

impl fmt::Debug for ButtonSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonSpec")
            .field("name", &self.name)
            .field("icon", &self.icon)
            .field("label", &self.label)
            .field("action", &self.action.is_some())
            .finish()
    }
}

/// The standard button catalog.
pub struct StandardButton;

impl StandardButton {
    pub fn close() -> ButtonSpec {
        ButtonSpec::new("close", "x", "Close")
    }

    pub fn cancel() -> ButtonSpec {
        ButtonSpec::new("cancel", "x", "Cancel")
    }

    pub fn destroy() -> ButtonSpec {
        ButtonSpec::new("destroy", "trash", "Delete")
    }

    pub fn no() -> ButtonSpec {
        ButtonSpec::new("no", "x", "No")
    }

    pub fn yes() -> ButtonSpec {
        ButtonSpec::new("yes", "check", "Yes")
    }

    pub fn create() -> ButtonSpec {
        ButtonSpec::new("create", "file", "Create")
    }

    pub fn ok() -> ButtonSpec {
        ButtonSpec::new("ok", "check", "Ok")
    }

    pub fn save() -> ButtonSpec {
        ButtonSpec::new("save", "data-transfer-download", "Save")
    }

    pub fn prev() -> ButtonSpec {
        ButtonSpec::new("prev", "chevron-left", "Prev")
    }

    pub fn next() -> ButtonSpec {
        ButtonSpec::new("next", "chevron-right", "Next")
    }
}

/// Order two button names for display.
///
/// Well-known names follow `no, cancel, close, destroy, save, yes, prev,
/// next`; any other name comes after all of them, alphabetically.
pub fn button_order(a: &str, b: &str) -> Ordering {
    let rank = |name: &str| PRIORITY.iter().position(|known| *known == name);
    match (rank(a), rank(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

pub(crate) fn button_comparator() -> Comparator {
    Comparator::by(|a, b| button_order(&a.get_str("name"), &b.get_str("name")))
}

/// Whether clicking the named button dismisses the modal.
pub(crate) fn is_dismissal(name: &str) -> bool {
    matches!(name, "cancel" | "close")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = names.iter().map(ToString::to_string).collect();
        names.sort_by(|a, b| button_order(a, b));
        names
    }

    #[test]
    fn save_cancel_destroy_order() {
        assert_eq!(sorted(&["save", "cancel", "destroy"]), vec!["cancel", "destroy", "save"]);
    }

    #[test]
    fn unknown_names_last_alphabetically() {
        assert_eq!(
            sorted(&["zoom", "next", "apply", "no"]),
            vec!["no", "next", "apply", "zoom"]
        );
    }

    #[test]
    fn spec_becomes_button_record() {
        let record = StandardButton::destroy().to_record();
        assert_eq!(record.get_str("name"), "destroy");
        assert_eq!(record.get_str("icon"), "trash");
        assert_eq!(record.get_str("label"), "Delete");
        assert!(record.is_new());
    }

    #[test]
    fn catalog_icons() {
        assert_eq!(StandardButton::save().icon, "data-transfer-download");
        assert_eq!(StandardButton::prev().icon, "chevron-left");
        assert_eq!(StandardButton::create().label, "Create");
    }
}
