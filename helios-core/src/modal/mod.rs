//! Modal dialogs.
//!
//! A [`ModalStack`] renders modals into one container. Each [`Modal`] wraps
//! a content view in chrome with a sorted button bar; clicking a button
//! runs its action, forwards the button name to the content view and
//! notifies subscribers. Cancel and close dismiss the modal, and the
//! content view can close it by raising
//! [`ViewSignal::Finished`](crate::view::ViewSignal::Finished).

mod button;
mod confirm;
mod dialog;
mod stack;

pub use button::{BUTTON, ButtonAction, ButtonSpec, StandardButton, button_order};
pub use confirm::{ConfirmModal, DEFAULT_MESSAGE};
pub use dialog::{
    ContentFactory, Modal, ModalConfig, ModalEvent, ModalId, ModalState, Outcome, WeakModal,
};
pub use stack::ModalStack;

pub(crate) use stack::WeakModalStack;
