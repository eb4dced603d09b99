use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::{ConfirmModal, Modal, ModalConfig, ModalId};
use crate::dom::Element;
use crate::error::CoreResult;

struct StackInner {
    container: Element,
    modals: RefCell<Vec<Modal>>,
}

/// The open modals, bottom first, all rendered into one container element.
///
/// Opening pushes, closing removes the modal wherever it sits, so a nested
/// help modal can be closed without touching the modal that opened it.
#[derive(Clone)]
pub struct ModalStack {
    inner: Rc<StackInner>,
}

#[derive(Clone)]
pub(crate) struct WeakModalStack(Weak<StackInner>);

impl WeakModalStack {
    pub(crate) fn upgrade(&self) -> Option<ModalStack> {
        self.0.upgrade().map(|inner| ModalStack { inner })
    }
}

impl ModalStack {
    pub fn new(container: &Element) -> Self {
        Self {
            inner: Rc::new(StackInner {
                container: container.clone(),
                modals: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn container(&self) -> &Element {
        &self.inner.container
    }

    /// Build a modal from `config` and put it on top.
    pub fn open(&self, config: ModalConfig) -> CoreResult<Modal> {
        Modal::open(self, config)
    }

    /// Ask a yes/no question; `on_yes` runs once if the answer is yes.
    pub fn confirm(
        &self,
        message: Option<&str>,
        on_yes: impl FnOnce() + 'static,
    ) -> CoreResult<ConfirmModal> {
        ConfirmModal::open(self, message, on_yes)
    }

    pub fn depth(&self) -> usize {
        self.inner.modals.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.modals.borrow().is_empty()
    }

    pub fn top(&self) -> Option<Modal> {
        self.inner.modals.borrow().last().cloned()
    }

    pub fn modals(&self) -> Vec<Modal> {
        self.inner.modals.borrow().clone()
    }

    /// Dismiss the topmost modal. Returns whether there was one.
    pub fn dismiss_top(&self) -> bool {
        let Some(top) = self.top() else {
            return false;
        };
        top.dismiss();
        true
    }

    /// Dismiss every modal, topmost first.
    pub fn dismiss_all(&self) {
        while self.dismiss_top() {}
    }

    pub(crate) fn push(&self, modal: Modal) {
        self.inner.modals.borrow_mut().push(modal);
    }

    pub(crate) fn forget(&self, id: ModalId) {
        self.inner.modals.borrow_mut().retain(|modal| modal.id() != id);
    }

    pub(crate) fn downgrade(&self) -> WeakModalStack {
        WeakModalStack(Rc::downgrade(&self.inner))
    }
}

impl fmt::Debug for ModalStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalStack")
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}
