use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::button::{BUTTON, BUTTON_TEMPLATE, button_comparator, is_dismissal};
use super::{ButtonAction, ButtonSpec, ModalStack, StandardButton, WeakModalStack};
use crate::dom::{DomEvent, Element, ListenerOwner, Selector};
use crate::error::{CoreError, CoreResult};
use crate::record::{Record, RecordSet};
use crate::signal::{Emitter, Subscription};
use crate::template::Template;
use crate::view::{EventBinding, ListBinding, TemplateView, View, ViewRef, ViewSignal};

static NEXT_MODAL_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of an open modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModalId(u64);

impl ModalId {
    fn next() -> Self {
        Self(NEXT_MODAL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ModalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "modal-{}", self.0)
    }
}

/// How a modal was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A button other than cancel/close was clicked last.
    Resolved(String),
    /// The content view reported it was finished.
    Completed,
    /// Closed through cancel, close or [`Modal::dismiss`].
    Dismissed,
}

/// Lifecycle of a modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalState {
    Open,
    Resolved(String),
    Dismissed,
    Closed,
}

/// Notifications emitted by a [`Modal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalEvent {
    /// A button was clicked.
    Button(String),
    /// The modal was removed. Emitted exactly once.
    Finished(Outcome),
}

/// Builds the content view over the content region.
pub type ContentFactory = Rc<dyn Fn(&Element, Option<&Record>) -> ViewRef>;

/// Options for [`ModalStack::open`].
#[derive(Default)]
pub struct ModalConfig {
    view: Option<ContentFactory>,
    record: Option<Record>,
    buttons: Option<Vec<ButtonSpec>>,
    help: Option<ContentFactory>,
}

impl ModalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content view constructor. Required.
    #[must_use]
    pub fn view(mut self, factory: impl Fn(&Element, Option<&Record>) -> ViewRef + 'static) -> Self {
        self.view = Some(Rc::new(factory));
        self
    }

    /// Record handed to the content view.
    #[must_use]
    pub fn record(mut self, record: &Record) -> Self {
        self.record = Some(record.clone());
        self
    }

    /// Button bar contents; defaults to a single close button.
    #[must_use]
    pub fn buttons(mut self, buttons: Vec<ButtonSpec>) -> Self {
        self.buttons = Some(buttons);
        self
    }

    /// Help view constructor, opened in a nested modal from the help button.
    #[must_use]
    pub fn help(mut self, factory: impl Fn(&Element, Option<&Record>) -> ViewRef + 'static) -> Self {
        self.help = Some(Rc::new(factory));
        self
    }

    fn help_factory(mut self, factory: ContentFactory) -> Self {
        self.view = Some(factory);
        self
    }
}

impl fmt::Debug for ModalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalConfig")
            .field("view", &self.view.is_some())
            .field("record", &self.record)
            .field("buttons", &self.buttons)
            .field("help", &self.help.is_some())
            .finish()
    }
}

struct ModalInner {
    id: ModalId,
    stack: WeakModalStack,
    root: Element,
    help_button: Option<Element>,
    help: Option<ContentFactory>,
    record: Option<Record>,
    actions: Vec<(Record, Option<ButtonAction>)>,
    buttons: RecordSet,
    bar: RefCell<Option<ListBinding>>,
    content: RefCell<Option<ViewRef>>,
    state: RefCell<ModalState>,
    outcome: RefCell<Option<Outcome>>,
    owner: ListenerOwner,
    signals: Emitter<ModalEvent>,
    retained: RefCell<Vec<Subscription>>,
}

/// A dialog on a [`ModalStack`]: chrome, content view and button bar.
#[derive(Clone)]
pub struct Modal {
    inner: Rc<ModalInner>,
}

/// A non-owning reference to a [`Modal`].
#[derive(Clone)]
pub struct WeakModal(Weak<ModalInner>);

impl WeakModal {
    pub fn upgrade(&self) -> Option<Modal> {
        self.0.upgrade().map(|inner| Modal { inner })
    }
}

const HELP_BUTTON: &str =
    r#"<span class="oi" data-glyph="question-mark" aria-hidden="true"> </span>Help"#;

impl Modal {
    pub(crate) fn open(stack: &ModalStack, config: ModalConfig) -> CoreResult<Self> {
        let Some(construct_content) = config.view else {
            log::error!("Modal opened without a content view");
            return Err(CoreError::MissingContentView);
        };
        let button_template = Template::parse(BUTTON_TEMPLATE)?;
        let button_click = EventBinding::parse("click button", |view, _| {
            view.trigger(ViewSignal::Click);
        })?;

        // Chrome
        let root = Element::new("div").with_class("modal");
        let dialog = Element::new("div").with_class("modal-dialog");
        let content_box = Element::new("div").with_class("modal-content");
        let content_region = Element::new("div").with_attr("name", "modal-content");
        let button_box = Element::new("div")
            .with_class("modal-button-box")
            .with_attr("name", "buttons");
        let help_button = config.help.as_ref().map(|_| {
            let button = Element::new("button")
                .with_attr("type", "button")
                .with_attr("name", "help")
                .with_class("modal-help-button");
            button.set_html(HELP_BUTTON);
            button
        });
        root.append(&dialog);
        dialog.append(&content_box);
        if let Some(button) = &help_button {
            content_box.append(button);
        }
        content_box.append(&content_region);
        dialog.append(&button_box);

        // Buttons
        let buttons = RecordSet::builder(&BUTTON)
            .comparator(button_comparator())
            .build();
        let specs = config
            .buttons
            .unwrap_or_else(|| vec![StandardButton::close()]);
        let mut actions = Vec::with_capacity(specs.len());
        for spec in specs {
            let record = spec.to_record();
            buttons.insert(record.clone());
            actions.push((record, spec.action));
        }

        let modal = Self {
            inner: Rc::new(ModalInner {
                id: ModalId::next(),
                stack: stack.downgrade(),
                root,
                help_button,
                help: config.help,
                record: config.record,
                actions,
                buttons,
                bar: RefCell::new(None),
                content: RefCell::new(None),
                state: RefCell::new(ModalState::Open),
                outcome: RefCell::new(None),
                owner: ListenerOwner::next(),
                signals: Emitter::new(),
                retained: RefCell::new(Vec::new()),
            }),
        };

        let weak = modal.downgrade();
        let bar = ListBinding::builder(&modal.inner.buttons, &button_box)
            .view(move |record| -> ViewRef {
                TemplateView::builder()
                    .record(record)
                    .tag("span")
                    .template(button_template.clone())
                    .on(button_click.clone())
                    .build()
            })
            .initialize_view(move |view| {
                let (Some(modal), Some(button)) = (weak.upgrade(), view.record()) else {
                    return;
                };
                let target = modal.downgrade();
                modal.retain(view.signals().subscribe(move |signal| {
                    if *signal == ViewSignal::Click
                        && let Some(modal) = target.upgrade()
                    {
                        modal.end(&button);
                    }
                }));
            })
            .build()?;
        *modal.inner.bar.borrow_mut() = Some(bar);

        let content = construct_content(&content_region, modal.inner.record.as_ref());
        if !content_region.contains(content.el()) {
            content_region.append(content.el());
        }
        content.render();
        let weak = modal.downgrade();
        modal.retain(content.signals().subscribe(move |signal| {
            if *signal == ViewSignal::Finished
                && let Some(modal) = weak.upgrade()
            {
                modal.finish();
            }
        }));
        *modal.inner.content.borrow_mut() = Some(content);

        modal.delegate_events()?;
        stack.container().append(&modal.inner.root);
        stack.push(modal.clone());
        log::debug!("Opened {} (depth {})", modal.inner.id, stack.depth());
        Ok(modal)
    }

    fn delegate_events(&self) -> CoreResult<()> {
        let root = &self.inner.root;
        root.remove_listeners(self.inner.owner);
        for name in ["cancel", "close"] {
            let weak = self.downgrade();
            root.add_listener(
                self.inner.owner,
                "click",
                Some(Selector::parse(&format!("button[name={name}]"))?),
                Rc::new(move |_: &DomEvent| {
                    if let Some(modal) = weak.upgrade() {
                        modal.dismiss();
                    }
                }),
            );
        }
        let weak = self.downgrade();
        root.add_listener(
            self.inner.owner,
            "click",
            Some(Selector::parse("button[name=help]")?),
            Rc::new(move |_: &DomEvent| {
                if let Some(modal) = weak.upgrade()
                    && let Err(e) = modal.open_help()
                {
                    log::error!("Failed to open help for {}: {e}", modal.id());
                }
            }),
        );
        Ok(())
    }

    /// React to a click on one of the bar's buttons.
    fn end(&self, button: &Record) {
        if self.is_closed() {
            log::debug!("Ignoring button click on closed {}", self.inner.id);
            return;
        }
        let name = button.get_str("name");
        let dismissal = is_dismissal(&name);
        if dismissal {
            self.settle(Outcome::Dismissed, ModalState::Dismissed);
        } else {
            self.settle(Outcome::Resolved(name.clone()), ModalState::Resolved(name.clone()));
        }

        let action = self
            .inner
            .actions
            .iter()
            .find(|(record, _)| record.ptr_eq(button))
            .and_then(|(_, action)| action.clone());
        if let Some(action) = action {
            action(self);
        }
        if dismissal {
            self.remove();
        }
        if let Some(content) = self.content() {
            content.trigger(ViewSignal::Named(name.clone()));
        }
        self.inner.signals.emit(&ModalEvent::Button(name));
    }

    fn settle(&self, outcome: Outcome, state: ModalState) {
        if self.is_closed() {
            return;
        }
        *self.inner.outcome.borrow_mut() = Some(outcome);
        *self.inner.state.borrow_mut() = state;
    }

    fn finish(&self) {
        if self.inner.outcome.borrow().is_none() {
            self.settle(Outcome::Completed, ModalState::Open);
        }
        self.remove();
    }

    /// Close the modal as dismissed.
    pub fn dismiss(&self) {
        self.settle(Outcome::Dismissed, ModalState::Dismissed);
        self.remove();
    }

    /// Close the modal, keeping the outcome recorded so far.
    ///
    /// Idempotent: only the first call detaches the chrome, tears down the
    /// content and buttons and emits [`ModalEvent::Finished`].
    pub fn remove(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if *state == ModalState::Closed {
                return;
            }
            *state = ModalState::Closed;
        }
        let outcome = self
            .inner
            .outcome
            .borrow_mut()
            .get_or_insert(Outcome::Dismissed)
            .clone();

        self.inner.root.remove();
        let bar = self.inner.bar.borrow_mut().take();
        if let Some(bar) = bar {
            bar.teardown();
        }
        if let Some(content) = self.content() {
            content.teardown();
        }
        let retained = std::mem::take(&mut *self.inner.retained.borrow_mut());
        drop(retained);
        if let Some(stack) = self.inner.stack.upgrade() {
            stack.forget(self.inner.id);
        }

        log::debug!("Closed {} ({outcome:?})", self.inner.id);
        self.inner.signals.emit(&ModalEvent::Finished(outcome));
    }

    /// Open the help view in a nested modal.
    ///
    /// Returns `None` when no help view was configured or the stack is gone.
    pub fn open_help(&self) -> CoreResult<Option<Modal>> {
        let Some(help) = self.inner.help.clone() else {
            return Ok(None);
        };
        let Some(stack) = self.inner.stack.upgrade() else {
            log::warn!("Help requested for {} after its stack was dropped", self.inner.id);
            return Ok(None);
        };
        stack.open(ModalConfig::new().help_factory(help)).map(Some)
    }

    /// Click the named button in the bar. Returns whether it exists.
    pub fn click(&self, name: &str) -> bool {
        let bar = self.inner.bar.borrow().clone();
        let Some(bar) = bar else {
            return false;
        };
        bar.views()
            .into_iter()
            .find(|view| view.record().is_some_and(|record| record.get_str("name") == name))
            .is_some_and(|view| view.el().dispatch(&DomEvent::click_button(name)) > 0)
    }

    /// Click the help button. Returns whether the modal has one.
    pub fn click_help(&self) -> bool {
        self.inner
            .help_button
            .as_ref()
            .is_some_and(|button| button.click() > 0)
    }

    /// Button names in display order.
    pub fn button_names(&self) -> Vec<String> {
        self.inner
            .buttons
            .records()
            .iter()
            .map(|record| record.get_str("name"))
            .collect()
    }

    pub fn id(&self) -> ModalId {
        self.inner.id
    }

    pub fn el(&self) -> &Element {
        &self.inner.root
    }

    pub fn content(&self) -> Option<ViewRef> {
        self.inner.content.borrow().clone()
    }

    pub fn record(&self) -> Option<Record> {
        self.inner.record.clone()
    }

    /// The stack the modal was opened on, while it exists.
    pub fn stack(&self) -> Option<ModalStack> {
        self.inner.stack.upgrade()
    }

    pub fn has_help(&self) -> bool {
        self.inner.help.is_some()
    }

    pub fn state(&self) -> ModalState {
        self.inner.state.borrow().clone()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.inner.outcome.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.state.borrow() == ModalState::Closed
    }

    pub fn subscribe(&self, callback: impl Fn(&ModalEvent) + 'static) -> Subscription {
        self.inner.signals.subscribe(callback)
    }

    /// Keep `subscription` alive until the modal closes.
    pub fn retain(&self, subscription: Subscription) {
        if self.is_closed() {
            return;
        }
        self.inner.retained.borrow_mut().push(subscription);
    }

    pub fn downgrade(&self) -> WeakModal {
        WeakModal(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Modal) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Modal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modal")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.state.borrow())
            .field("buttons", &self.button_names())
            .finish_non_exhaustive()
    }
}
