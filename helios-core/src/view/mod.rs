//! Views and collection bindings.
//!
//! A [`View`] owns a root [`Element`], renders markup into it and reacts to
//! events dispatched on it. [`ListBinding`] keeps one child view per record
//! of a [`RecordSet`](crate::record::RecordSet) rendered into a region, in
//! the set's order; [`TableBinding`] adds a header row and an empty state on
//! top of it.

mod checked;
mod list;
mod table;
mod template_view;

pub use checked::CheckedListBinding;
pub use list::{ListBinding, ListBindingBuilder, ListEvent, RecordFilter};
pub use table::{TableBinding, TableBindingBuilder};
pub use template_view::{EventBinding, EventHandler, TemplateView, TemplateViewBuilder};

use std::rc::Rc;

use crate::dom::Element;
use crate::record::Record;
use crate::signal::Emitter;

/// Signals a view raises towards whoever owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewSignal {
    Click,
    /// The view is done; a modal hosting it closes.
    Finished,
    /// Any other named signal, e.g. a forwarded modal button name.
    Named(String),
}

impl ViewSignal {
    pub fn name(&self) -> &str {
        match self {
            Self::Click => "click",
            Self::Finished => "finished",
            Self::Named(name) => name,
        }
    }
}

impl From<&str> for ViewSignal {
    fn from(name: &str) -> Self {
        match name {
            "click" => Self::Click,
            "finished" => Self::Finished,
            other => Self::Named(other.to_string()),
        }
    }
}

/// A renderable unit bound to at most one record.
pub trait View {
    /// Root element.
    fn el(&self) -> &Element;

    /// The bound record, if it is still alive.
    fn record(&self) -> Option<Record>;

    /// Replace the root element's content.
    fn render(&self);

    /// Attach the view's declared event listeners to its root element.
    fn delegate_events(&self);

    fn undelegate_events(&self);

    fn signals(&self) -> &Emitter<ViewSignal>;

    fn trigger(&self, signal: ViewSignal) {
        self.signals().emit(&signal);
    }

    /// Release subscriptions, drop listeners and detach the root element.
    fn teardown(&self);

    fn is_torn_down(&self) -> bool;
}

pub type ViewRef = Rc<dyn View>;

/// Builds the child view for one record.
pub type ViewFactory = Rc<dyn Fn(&Record) -> ViewRef>;

/// Builds a view that is not bound to a record (headers, empty states).
pub type StaticViewFactory = Rc<dyn Fn() -> ViewRef>;
