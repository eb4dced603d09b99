//! The retained render tree.
//!
//! Views render markup into [`Element`]s and listen for [`DomEvent`]s on
//! them. Events bubble from the receiving element through its ancestors;
//! a listener may restrict itself to targets matching a [`Selector`].
//!
//! Replacing an element's content ([`Element::set_html`], [`Element::empty`])
//! drops the listeners of every removed descendant, so anything that renders
//! into a shared region re-attaches its listeners afterwards.

mod element;
mod event;
mod selector;

pub use element::{Element, Handler, ListenerOwner};
pub use event::{DomEvent, EventTarget};
pub use selector::Selector;
