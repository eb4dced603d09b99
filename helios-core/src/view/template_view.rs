use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::{View, ViewSignal};
use crate::dom::{DomEvent, Element, ListenerOwner, Selector};
use crate::error::{CoreError, CoreResult};
use crate::record::{Record, RecordEvent, WeakRecord};
use crate::signal::{Emitter, Subscription};
use crate::template::Template;
use helios_provider::Fields;

pub type EventHandler = Rc<dyn Fn(&TemplateView, &DomEvent)>;

type ParamsFn = Rc<dyn Fn(Option<&Record>) -> Fields>;

/// A declarative `"<event> [selector]"` → handler pair.
#[derive(Clone)]
pub struct EventBinding {
    kind: String,
    selector: Option<Selector>,
    handler: EventHandler,
}

impl EventBinding {
    /// Parse `"click"` or `"click button[name=save]"`.
    pub fn parse(
        spec: &str,
        handler: impl Fn(&TemplateView, &DomEvent) + 'static,
    ) -> CoreResult<Self> {
        let spec = spec.trim();
        let (kind, selector) = match spec.split_once(char::is_whitespace) {
            Some((kind, selector)) => (kind, Some(Selector::parse(selector)?)),
            None => (spec, None),
        };
        if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::InvalidEventBinding(spec.to_string()));
        }
        Ok(Self {
            kind: kind.to_string(),
            selector,
            handler: Rc::new(handler),
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBinding")
            .field("kind", &self.kind)
            .field("selector", &self.selector.as_ref().map(ToString::to_string))
            .finish_non_exhaustive()
    }
}

/// The default [`View`]: renders a template with the bound record's fields.
///
/// Re-renders whenever the record changes until torn down.
pub struct TemplateView {
    me: Weak<TemplateView>,
    el: Element,
    record: Option<WeakRecord>,
    template: Template,
    params: Option<ParamsFn>,
    bindings: Vec<EventBinding>,
    owner: ListenerOwner,
    signals: Emitter<ViewSignal>,
    watch: RefCell<Option<Subscription>>,
    torn_down: Cell<bool>,
}

/// Builder for [`TemplateView`].
pub struct TemplateViewBuilder {
    record: Option<Record>,
    template: Template,
    params: Option<ParamsFn>,
    element: Option<Element>,
    tag: String,
    classes: Vec<String>,
    bindings: Vec<EventBinding>,
}

impl TemplateViewBuilder {
    #[must_use]
    pub fn record(mut self, record: &Record) -> Self {
        self.record = Some(record.clone());
        self
    }

    #[must_use]
    pub fn template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    /// Compute template parameters; defaults to the record's JSON.
    #[must_use]
    pub fn params(mut self, params: impl Fn(Option<&Record>) -> Fields + 'static) -> Self {
        self.params = Some(Rc::new(params));
        self
    }

    /// Render into an existing element instead of a new one.
    #[must_use]
    pub fn element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: &str) -> Self {
        tag.clone_into(&mut self.tag);
        self
    }

    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    #[must_use]
    pub fn on(mut self, binding: EventBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Create the view and attach its event listeners. Rendering is left to the caller.
    pub fn build(self) -> Rc<TemplateView> {
        let el = self.element.unwrap_or_else(|| Element::new(self.tag));
        for class in &self.classes {
            el.add_class(class);
        }
        let view = Rc::new_cyclic(|me| TemplateView {
            me: me.clone(),
            el,
            record: self.record.as_ref().map(Record::downgrade),
            template: self.template,
            params: self.params,
            bindings: self.bindings,
            owner: ListenerOwner::next(),
            signals: Emitter::new(),
            watch: RefCell::new(None),
            torn_down: Cell::new(false),
        });

        if let Some(record) = &self.record {
            let weak = Rc::downgrade(&view);
            let watch = record.subscribe(move |event| {
                if let RecordEvent::Change { .. } = event
                    && let Some(view) = weak.upgrade()
                {
                    view.render();
                }
            });
            *view.watch.borrow_mut() = Some(watch);
        }
        view.delegate_events();
        view
    }
}

impl TemplateView {
    pub fn builder() -> TemplateViewBuilder {
        TemplateViewBuilder {
            record: None,
            template: Template::empty(),
            params: None,
            element: None,
            tag: "div".to_string(),
            classes: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// An empty `div`, the default empty-state view of list bindings.
    pub fn empty() -> Rc<TemplateView> {
        Self::builder().build()
    }

    fn params(&self) -> Fields {
        let record = self.record();
        match &self.params {
            Some(params) => params(record.as_ref()),
            None => record.as_ref().map(Record::to_json).unwrap_or_default(),
        }
    }
}

impl View for TemplateView {
    fn el(&self) -> &Element {
        &self.el
    }

    fn record(&self) -> Option<Record> {
        self.record.as_ref().and_then(WeakRecord::upgrade)
    }

    fn render(&self) {
        if self.torn_down.get() {
            log::debug!("Ignoring render of torn-down <{}> view", self.el.tag());
            return;
        }
        let html = self.template.render(&self.params());
        self.el.set_html(&html);
    }

    fn delegate_events(&self) {
        if self.torn_down.get() {
            return;
        }
        self.undelegate_events();
        for binding in &self.bindings {
            let me = self.me.clone();
            let handler = Rc::clone(&binding.handler);
            self.el.add_listener(
                self.owner,
                &binding.kind,
                binding.selector.clone(),
                Rc::new(move |event: &DomEvent| {
                    if let Some(view) = me.upgrade()
                        && !view.torn_down.get()
                    {
                        handler(&view, event);
                    }
                }),
            );
        }
    }

    fn undelegate_events(&self) {
        self.el.remove_listeners(self.owner);
    }

    fn signals(&self) -> &Emitter<ViewSignal> {
        &self.signals
    }

    fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        self.watch.borrow_mut().take();
        self.undelegate_events();
        self.el.remove();
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.get()
    }
}

impl fmt::Debug for TemplateView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateView")
            .field("el", &self.el)
            .field("record", &self.record())
            .field("torn_down", &self.torn_down.get())
            .finish_non_exhaustive()
    }
}
