use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{DomEvent, EventTarget, Selector};
use crate::template::escape_html;

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Identifies the component that attached a group of listeners, so the group
/// can be detached together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerOwner(u64);

impl ListenerOwner {
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
    }
}

pub type Handler = Rc<dyn Fn(&DomEvent)>;

struct Listener {
    owner: ListenerOwner,
    kind: String,
    selector: Option<Selector>,
    callback: Handler,
}

impl Listener {
    fn accepts(&self, event: &DomEvent) -> bool {
        self.kind == event.kind()
            && self
                .selector
                .as_ref()
                .is_none_or(|selector| selector.matches(event.target()))
    }
}

struct Node {
    tag: String,
    attrs: RefCell<BTreeMap<String, String>>,
    html: RefCell<String>,
    children: RefCell<Vec<Element>>,
    parent: RefCell<Weak<Node>>,
    listeners: RefCell<Vec<Listener>>,
    checked: Cell<bool>,
}

/// A node of the retained render tree.
///
/// An element carries its own markup (`html`) followed by child elements.
/// Handles are cheap to clone and compare by identity.
#[derive(Clone)]
pub struct Element {
    node: Rc<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            node: Rc::new(Node {
                tag: tag.into(),
                attrs: RefCell::new(BTreeMap::new()),
                html: RefCell::new(String::new()),
                children: RefCell::new(Vec::new()),
                parent: RefCell::new(Weak::new()),
                listeners: RefCell::new(Vec::new()),
                checked: Cell::new(false),
            }),
        }
    }

    #[must_use]
    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn with_class(self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn tag(&self) -> &str {
        &self.node.tag
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.node.attrs.borrow().get(name).cloned()
    }

    pub fn attrs(&self) -> BTreeMap<String, String> {
        self.node.attrs.borrow().clone()
    }

    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        self.node.attrs.borrow_mut().insert(name.into(), value.into());
    }

    pub fn add_class(&self, class: &str) {
        let mut attrs = self.node.attrs.borrow_mut();
        let classes = attrs.entry("class".to_string()).or_default();
        if !classes.split_whitespace().any(|c| c == class) {
            if !classes.is_empty() {
                classes.push(' ');
            }
            classes.push_str(class);
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.node
            .attrs
            .borrow()
            .get("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Own markup, excluding child elements.
    pub fn html(&self) -> String {
        self.node.html.borrow().clone()
    }

    /// Replace the content: own markup becomes `html` and every child element
    /// is removed.
    pub fn set_html(&self, html: &str) {
        self.empty();
        *self.node.html.borrow_mut() = html.to_string();
    }

    pub fn is_checked(&self) -> bool {
        self.node.checked.get()
    }

    pub fn set_checked(&self, checked: bool) {
        self.node.checked.set(checked);
    }

    pub fn children(&self) -> Vec<Element> {
        self.node.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.node.children.borrow().len()
    }

    pub fn parent(&self) -> Option<Element> {
        self.node.parent.borrow().upgrade().map(|node| Self { node })
    }

    pub fn is_attached(&self) -> bool {
        self.parent().is_some()
    }

    /// Whether `other` is this element or one of its descendants.
    pub fn contains(&self, other: &Element) -> bool {
        let mut current = Some(other.clone());
        while let Some(element) = current {
            if element.ptr_eq(self) {
                return true;
            }
            current = element.parent();
        }
        false
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// Append `child` as the last child, moving it out of any previous parent.
    pub fn append(&self, child: &Element) {
        if child.contains(self) {
            log::warn!("Refusing to append <{}> into its own subtree", child.tag());
            return;
        }
        child.detach();
        *child.node.parent.borrow_mut() = Rc::downgrade(&self.node);
        self.node.children.borrow_mut().push(child.clone());
    }

    /// Take the element out of its parent, keeping its listeners.
    pub fn detach(&self) {
        let parent = self.node.parent.replace(Weak::new()).upgrade();
        if let Some(parent) = parent {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(&child.node, &self.node));
        }
    }

    /// Take the element out of its parent and drop every listener in its subtree.
    pub fn remove(&self) {
        self.detach();
        self.strip_listeners();
    }

    /// Detach all child elements, dropping their listeners.
    ///
    /// Own markup is kept. Components that render into a shared region
    /// re-attach their listeners after every call.
    pub fn empty(&self) {
        let children = std::mem::take(&mut *self.node.children.borrow_mut());
        for child in children {
            *child.node.parent.borrow_mut() = Weak::new();
            child.strip_listeners();
        }
    }

    fn strip_listeners(&self) {
        self.node.listeners.borrow_mut().clear();
        for child in self.children() {
            child.strip_listeners();
        }
    }

    /// Attach a listener for `kind`, optionally restricted to targets matching `selector`.
    pub fn add_listener(
        &self,
        owner: ListenerOwner,
        kind: &str,
        selector: Option<Selector>,
        callback: Handler,
    ) {
        self.node.listeners.borrow_mut().push(Listener {
            owner,
            kind: kind.to_string(),
            selector,
            callback,
        });
    }

    /// Detach every listener `owner` attached to this element.
    pub fn remove_listeners(&self, owner: ListenerOwner) {
        self.node
            .listeners
            .borrow_mut()
            .retain(|listener| listener.owner != owner);
    }

    pub fn listener_count(&self) -> usize {
        self.node.listeners.borrow().len()
    }

    /// Deliver `event` to this element and then each ancestor in turn.
    ///
    /// Returns how many listeners ran.
    pub fn dispatch(&self, event: &DomEvent) -> usize {
        let mut handled = 0;
        let mut current = Some(self.clone());
        while let Some(element) = current {
            let callbacks: Vec<Handler> = element
                .node
                .listeners
                .borrow()
                .iter()
                .filter(|listener| listener.accepts(event))
                .map(|listener| Rc::clone(&listener.callback))
                .collect();
            for callback in callbacks {
                callback(event);
                handled += 1;
            }
            current = element.parent();
        }
        handled
    }

    /// Click this element.
    pub fn click(&self) -> usize {
        self.dispatch(&DomEvent::click(EventTarget::of(self)))
    }

    /// Own markup followed by the markup of every child.
    pub fn inner_html(&self) -> String {
        let mut out = self.html();
        for child in self.children() {
            out.push_str(&child.outer_html());
        }
        out
    }

    pub fn outer_html(&self) -> String {
        let mut out = format!("<{}", self.node.tag);
        for (name, value) in self.node.attrs.borrow().iter() {
            out.push_str(&format!(" {name}=\"{}\"", escape_html(value)));
        }
        out.push('>');
        out.push_str(&self.inner_html());
        out.push_str(&format!("</{}>", self.node.tag));
        out
    }

    /// First descendant (depth-first, document order) matching `selector`.
    pub fn find(&self, selector: &Selector) -> Option<Element> {
        for child in self.children() {
            if selector.matches(&EventTarget::of(&child)) {
                return Some(child);
            }
            if let Some(found) = child.find(selector) {
                return Some(found);
            }
        }
        None
    }

    /// First descendant with `name="<name>"`.
    pub fn find_by_name(&self, name: &str) -> Option<Element> {
        for child in self.children() {
            if child.attr("name").as_deref() == Some(name) {
                return Some(child);
            }
            if let Some(found) = child.find_by_name(name) {
                return Some(found);
            }
        }
        None
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.node.tag)
            .field("attrs", &*self.node.attrs.borrow())
            .field("children", &self.child_count())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
