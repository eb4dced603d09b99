use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use super::{Modal, ModalConfig, ModalEvent, ModalStack, StandardButton};
use crate::error::CoreResult;
use crate::template::Template;
use crate::view::{TemplateView, ViewRef};
use helios_provider::Fields;

pub const DEFAULT_MESSAGE: &str = "Are you sure?";

const MESSAGE_TEMPLATE: &str = "<p><%- message %></p>";

type Callback = Rc<RefCell<Option<Box<dyn FnOnce()>>>>;

/// A yes/no modal that runs a callback when answered yes.
#[derive(Debug, Clone)]
pub struct ConfirmModal {
    modal: Modal,
}

impl ConfirmModal {
    pub(crate) fn open(
        stack: &ModalStack,
        message: Option<&str>,
        on_yes: impl FnOnce() + 'static,
    ) -> CoreResult<Self> {
        let template = Template::parse(MESSAGE_TEMPLATE)?;
        let message = message.unwrap_or(DEFAULT_MESSAGE).to_string();
        let config = ModalConfig::new()
            .view(move |region, _| -> ViewRef {
                let message = message.clone();
                TemplateView::builder()
                    .element(region.clone())
                    .template(template.clone())
                    .params(move |_| {
                        let mut fields = Fields::new();
                        fields.insert("message".to_string(), Value::from(message.as_str()));
                        fields
                    })
                    .build()
            })
            .buttons(vec![StandardButton::yes(), StandardButton::no()]);
        let modal = stack.open(config)?;

        let on_yes: Box<dyn FnOnce()> = Box::new(on_yes);
        let callback: Callback = Rc::new(RefCell::new(Some(on_yes)));
        let weak = modal.downgrade();
        modal.retain(modal.subscribe(move |event| {
            let ModalEvent::Button(name) = event else {
                return;
            };
            let Some(modal) = weak.upgrade() else {
                return;
            };
            if name == "yes" {
                let on_yes = callback.borrow_mut().take();
                if let Some(on_yes) = on_yes {
                    on_yes();
                }
            }
            if name == "yes" || name == "no" {
                modal.remove();
            }
        }));
        Ok(Self { modal })
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    /// Answer yes.
    pub fn yes(&self) -> bool {
        self.modal.click("yes")
    }

    /// Answer no.
    pub fn no(&self) -> bool {
        self.modal.click("no")
    }
}
