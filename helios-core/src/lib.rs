//! Helios Core Library
//!
//! The view-binding kernel of the Helios photograph catalog:
//! - Records and record sets synchronized with the catalog server
//! - Template views and list/table bindings that follow a record set
//! - A modal stack with sorted button bars and confirmation dialogs
//!
//! Rendering targets an in-memory [`dom::Element`] tree, and remote access
//! goes through the [`ResourceClient`](helios_provider::ResourceClient)
//! trait, so the kernel runs the same under a browser shell, a desktop
//! shell or a test harness.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`); observers are
//! registered through [`signal::Emitter`] and released by dropping the
//! returned [`signal::Subscription`].

pub mod dom;
pub mod error;
pub mod modal;
pub mod record;
pub mod signal;
pub mod template;
pub mod view;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use error::{CoreError, CoreResult};
pub use modal::{ButtonSpec, ConfirmModal, Modal, ModalConfig, ModalEvent, ModalStack, Outcome, StandardButton};
pub use record::{Record, RecordEvent, RecordKind, RecordSet, RecordSetEvent, SaveOptions};
pub use signal::{Emitter, Subscription};
pub use template::Template;
pub use view::{ListBinding, TableBinding, TemplateView, View, ViewRef, ViewSignal};
