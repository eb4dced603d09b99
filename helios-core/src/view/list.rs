use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::{StaticViewFactory, TemplateView, ViewFactory, ViewRef};
use crate::dom::{DomEvent, Element, ListenerOwner, Selector};
use crate::error::{CoreError, CoreResult};
use crate::record::{Record, RecordSet, RecordSetEvent};
use crate::signal::{Emitter, Subscription};

pub type RecordFilter = Rc<dyn Fn(&Record) -> bool>;

type InitializeHook = Rc<dyn Fn(&ViewRef)>;
type RegionHandler = Rc<dyn Fn(&ListBinding, &DomEvent)>;

/// Notifications emitted by a [`ListBinding`].
#[derive(Clone)]
pub enum ListEvent {
    Add { record: Record, view: ViewRef },
    Remove { record: Record },
    Reset,
}

impl fmt::Debug for ListEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { record, .. } => f.debug_struct("Add").field("record", record).finish_non_exhaustive(),
            Self::Remove { record } => f.debug_struct("Remove").field("record", record).finish(),
            Self::Reset => f.write_str("Reset"),
        }
    }
}

#[derive(Clone)]
struct Child {
    record: Record,
    view: ViewRef,
}

struct RegionBinding {
    kind: String,
    selector: Option<Selector>,
    handler: RegionHandler,
}

struct ListInner {
    records: RecordSet,
    region: Element,
    construct_view: ViewFactory,
    initialize_view: Option<InitializeHook>,
    empty_view: StaticViewFactory,
    filter: RefCell<Option<RecordFilter>>,
    offset: Cell<usize>,
    limit: Cell<Option<usize>>,
    children: RefCell<Vec<Child>>,
    empty: RefCell<Option<ViewRef>>,
    region_bindings: Vec<RegionBinding>,
    owner: ListenerOwner,
    signals: Emitter<ListEvent>,
    watch: RefCell<Option<Subscription>>,
}

/// Keeps one child view per record of a [`RecordSet`], rendered into a
/// region element in the set's order.
///
/// Rendering applies the filter first and the `offset`/`limit` window
/// second. When nothing is visible a single empty-state view is shown.
#[derive(Clone)]
pub struct ListBinding {
    inner: Rc<ListInner>,
}

/// Builder for [`ListBinding`].
pub struct ListBindingBuilder {
    records: RecordSet,
    region: Element,
    view: Option<ViewFactory>,
    initialize_view: Option<InitializeHook>,
    empty_view: Option<StaticViewFactory>,
    filter: Option<RecordFilter>,
    offset: usize,
    limit: Option<usize>,
    region_bindings: Vec<(String, RegionHandler)>,
}

impl ListBindingBuilder {
    /// Child view factory. Required.
    #[must_use]
    pub fn view(mut self, factory: impl Fn(&Record) -> ViewRef + 'static) -> Self {
        self.view = Some(Rc::new(factory));
        self
    }

    /// Runs on every child view after construction, before its first render.
    #[must_use]
    pub fn initialize_view(mut self, hook: impl Fn(&ViewRef) + 'static) -> Self {
        self.initialize_view = Some(Rc::new(hook));
        self
    }

    /// Empty-state view factory; defaults to an empty `div`.
    #[must_use]
    pub fn empty_view(mut self, factory: impl Fn() -> ViewRef + 'static) -> Self {
        self.empty_view = Some(Rc::new(factory));
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: impl Fn(&Record) -> bool + 'static) -> Self {
        self.filter = Some(Rc::new(filter));
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Maximum number of visible children; negative means unbounded.
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = usize::try_from(limit).ok();
        self
    }

    /// Listen on the region itself, e.g. `"click button[name=more]"`.
    #[must_use]
    pub fn on(mut self, spec: &str, handler: impl Fn(&ListBinding, &DomEvent) + 'static) -> Self {
        self.region_bindings.push((spec.to_string(), Rc::new(handler)));
        self
    }

    /// Create child views for the current records, render, and start
    /// following the record set.
    pub fn build(self) -> CoreResult<ListBinding> {
        let Some(construct_view) = self.view else {
            log::error!("List binding over {} built without a view factory", self.records.kind().name);
            return Err(CoreError::MissingViewFactory);
        };
        let region_bindings = self
            .region_bindings
            .into_iter()
            .map(|(spec, handler)| parse_region_binding(&spec, handler))
            .collect::<CoreResult<Vec<_>>>()?;

        let binding = ListBinding {
            inner: Rc::new(ListInner {
                records: self.records,
                region: self.region,
                construct_view,
                initialize_view: self.initialize_view,
                empty_view: self.empty_view.unwrap_or_else(default_empty_view),
                filter: RefCell::new(self.filter),
                offset: Cell::new(self.offset),
                limit: Cell::new(self.limit),
                children: RefCell::new(Vec::new()),
                empty: RefCell::new(None),
                region_bindings,
                owner: ListenerOwner::next(),
                signals: Emitter::new(),
                watch: RefCell::new(None),
            }),
        };

        let children: Vec<Child> = binding
            .inner
            .records
            .records()
            .into_iter()
            .map(|record| {
                let view = binding.construct(&record);
                Child { record, view }
            })
            .collect();
        *binding.inner.children.borrow_mut() = children;
        binding.render();
        binding.follow();
        Ok(binding)
    }
}

fn default_empty_view() -> StaticViewFactory {
    Rc::new(|| -> ViewRef { TemplateView::empty() })
}

fn parse_region_binding(spec: &str, handler: RegionHandler) -> CoreResult<RegionBinding> {
    let spec = spec.trim();
    let (kind, selector) = match spec.split_once(char::is_whitespace) {
        Some((kind, selector)) => (kind, Some(Selector::parse(selector)?)),
        None => (spec, None),
    };
    if kind.is_empty() {
        return Err(CoreError::InvalidEventBinding(spec.to_string()));
    }
    Ok(RegionBinding {
        kind: kind.to_string(),
        selector,
        handler,
    })
}

impl ListBinding {
    pub fn builder(records: &RecordSet, region: &Element) -> ListBindingBuilder {
        ListBindingBuilder {
            records: records.clone(),
            region: region.clone(),
            view: None,
            initialize_view: None,
            empty_view: None,
            filter: None,
            offset: 0,
            limit: None,
            region_bindings: Vec::new(),
        }
    }

    fn follow(&self) {
        let weak: Weak<ListInner> = Rc::downgrade(&self.inner);
        let watch = self.inner.records.subscribe(move |event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let binding = ListBinding { inner };
            match event {
                RecordSetEvent::Add { record, .. } => binding.add(record),
                RecordSetEvent::Remove { record, .. } => binding.remove(record),
                RecordSetEvent::Reset => binding.reset(),
                RecordSetEvent::Sort => binding.reorder(),
                RecordSetEvent::Sync => binding.render(),
                RecordSetEvent::Change { .. } | RecordSetEvent::Error(_) => {}
            }
        });
        *self.inner.watch.borrow_mut() = Some(watch);
    }

    fn construct(&self, record: &Record) -> ViewRef {
        let view = (self.inner.construct_view)(record);
        if let Some(hook) = &self.inner.initialize_view {
            hook(&view);
        }
        view.render();
        view
    }

    fn set_position(&self, record: &Record) -> usize {
        self.inner.records.index_of(record).unwrap_or(usize::MAX)
    }

    /// Create and place the child view for a record that joined the set.
    ///
    /// The child element is inserted without a full render; the region is
    /// re-rendered at the next remove, reset, sync or explicit render.
    pub fn add(&self, record: &Record) {
        if self.view_for(record).is_some() {
            return;
        }
        let view = self.construct(record);
        let target = self.set_position(record);
        let position = {
            let children = self.inner.children.borrow();
            let mut position = 0;
            while position < children.len() && self.set_position(&children[position].record) < target {
                position += 1;
            }
            position
        };
        self.inner.children.borrow_mut().insert(
            position,
            Child {
                record: record.clone(),
                view: Rc::clone(&view),
            },
        );
        self.inner.signals.emit(&ListEvent::Add {
            record: record.clone(),
            view,
        });
    }

    /// Tear down the child view of a record that left the set, then render.
    pub fn remove(&self, record: &Record) {
        let removed = {
            let mut children = self.inner.children.borrow_mut();
            children
                .iter()
                .position(|child| child.record.ptr_eq(record))
                .map(|index| children.remove(index))
        };
        let Some(child) = removed else {
            return;
        };
        child.view.teardown();
        self.render();
        self.inner.signals.emit(&ListEvent::Remove {
            record: child.record,
        });
    }

    /// Rebuild every child view from the record set, then render.
    pub fn reset(&self) {
        let previous = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in &previous {
            child.view.teardown();
        }
        let children: Vec<Child> = self
            .inner
            .records
            .records()
            .into_iter()
            .map(|record| {
                let view = self.construct(&record);
                Child { record, view }
            })
            .collect();
        *self.inner.children.borrow_mut() = children;
        self.render();
        self.inner.signals.emit(&ListEvent::Reset);
    }

    fn reorder(&self) {
        let mut children = std::mem::take(&mut *self.inner.children.borrow_mut());
        children.sort_by_key(|child| self.set_position(&child.record));
        *self.inner.children.borrow_mut() = children;
        self.render();
    }

    fn visible_children(&self) -> Vec<Child> {
        let filter = self.inner.filter.borrow().clone();
        let children = self.inner.children.borrow().clone();
        let offset = self.inner.offset.get();
        let limit = self.inner.limit.get().unwrap_or(usize::MAX);
        children
            .into_iter()
            .filter(|child| filter.as_ref().is_none_or(|keep| keep(&child.record)))
            .skip(offset)
            .take(limit)
            .collect()
    }

    /// Lay the visible children (or the empty-state view) out in the region.
    pub fn render(&self) {
        let visible = self.visible_children();
        let region = &self.inner.region;

        if visible.is_empty() {
            let empty = self.empty_state();
            region.empty();
            region.append(empty.el());
        } else {
            let stale = self.inner.empty.borrow_mut().take();
            if let Some(empty) = stale {
                empty.teardown();
            }
            region.empty();
            for child in &visible {
                region.append(child.view.el());
            }
        }
        log::debug!(
            "Rendered {} of {} {} view(s)",
            visible.len(),
            self.len(),
            self.inner.records.kind().name
        );
        self.delegate_visible(&visible);
    }

    fn empty_state(&self) -> ViewRef {
        let cached = self.inner.empty.borrow().clone();
        if let Some(view) = cached {
            return view;
        }
        let view = (self.inner.empty_view)();
        view.render();
        *self.inner.empty.borrow_mut() = Some(Rc::clone(&view));
        view
    }

    /// Re-attach the region's listeners and those of every visible child.
    pub fn delegate_events(&self) {
        let visible = self.visible_children();
        self.delegate_visible(&visible);
    }

    fn delegate_visible(&self, visible: &[Child]) {
        let region = &self.inner.region;
        region.remove_listeners(self.inner.owner);
        for binding in &self.inner.region_bindings {
            let weak = Rc::downgrade(&self.inner);
            let handler = Rc::clone(&binding.handler);
            region.add_listener(
                self.inner.owner,
                &binding.kind,
                binding.selector.clone(),
                Rc::new(move |event: &DomEvent| {
                    if let Some(inner) = weak.upgrade() {
                        handler(&ListBinding { inner }, event);
                    }
                }),
            );
        }
        for child in visible {
            child.view.delegate_events();
        }
        let empty = self.inner.empty.borrow().clone();
        if let Some(empty) = empty {
            empty.delegate_events();
        }
    }

    pub fn set_filter(&self, filter: Option<RecordFilter>) {
        *self.inner.filter.borrow_mut() = filter;
        self.render();
    }

    /// Change the visible window; a negative `limit` is unbounded.
    pub fn set_page(&self, offset: usize, limit: i64) {
        self.inner.offset.set(offset);
        self.inner.limit.set(usize::try_from(limit).ok());
        self.render();
    }

    pub fn offset(&self) -> usize {
        self.inner.offset.get()
    }

    pub fn limit(&self) -> Option<usize> {
        self.inner.limit.get()
    }

    /// Records whose views are currently laid out, in order.
    pub fn visible_records(&self) -> Vec<Record> {
        self.visible_children()
            .into_iter()
            .map(|child| child.record)
            .collect()
    }

    /// Every child view, visible or not, in record order.
    pub fn views(&self) -> Vec<ViewRef> {
        self.inner
            .children
            .borrow()
            .iter()
            .map(|child| Rc::clone(&child.view))
            .collect()
    }

    pub fn view_for(&self, record: &Record) -> Option<ViewRef> {
        self.inner
            .children
            .borrow()
            .iter()
            .find(|child| child.record.ptr_eq(record))
            .map(|child| Rc::clone(&child.view))
    }

    /// The empty-state view, while it is shown.
    pub fn empty_view(&self) -> Option<ViewRef> {
        self.inner.empty.borrow().clone()
    }

    /// Number of child views.
    pub fn len(&self) -> usize {
        self.inner.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.children.borrow().is_empty()
    }

    pub fn records(&self) -> &RecordSet {
        &self.inner.records
    }

    pub fn region(&self) -> &Element {
        &self.inner.region
    }

    pub fn signals(&self) -> &Emitter<ListEvent> {
        &self.inner.signals
    }

    /// Stop following the record set and tear down every child view.
    pub fn teardown(&self) {
        self.inner.watch.borrow_mut().take();
        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in &children {
            child.view.teardown();
        }
        let empty = self.inner.empty.borrow_mut().take();
        if let Some(empty) = empty {
            empty.teardown();
        }
        self.inner.region.remove_listeners(self.inner.owner);
    }
}

impl fmt::Debug for ListBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListBinding")
            .field("records", &self.inner.records)
            .field("children", &self.len())
            .field("offset", &self.inner.offset.get())
            .field("limit", &self.inner.limit.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Comparator;
    use crate::template::Template;
    use crate::test_utils::{ALBUM, MockResourceClient, fields};
    use serde_json::json;

    fn album(id: i64, name: &str) -> Record {
        Record::from_fields(&ALBUM, fields(json!({ "id": id, "name": name })))
    }

    fn sorted_set() -> RecordSet {
        RecordSet::builder(&ALBUM)
            .comparator(Comparator::field("name"))
            .build()
    }

    fn row(record: &Record) -> ViewRef {
        TemplateView::builder()
            .record(record)
            .tag("li")
            .template(Template::parse("<%- name %>").unwrap())
            .build()
    }

    fn bind(set: &RecordSet, region: &Element) -> ListBinding {
        ListBinding::builder(set, region).view(row).build().unwrap()
    }

    fn rendered(region: &Element) -> Vec<String> {
        region.children().iter().map(Element::inner_html).collect()
    }

    fn names(records: &[Record]) -> Vec<String> {
        records.iter().map(|r| r.get_str("name")).collect()
    }

    #[test]
    fn missing_view_factory_is_error() {
        let set = sorted_set();
        let err = ListBinding::builder(&set, &Element::new("ul")).build().unwrap_err();
        assert!(matches!(err, CoreError::MissingViewFactory));
    }

    #[test]
    fn initial_records_render_in_order() {
        let set = sorted_set();
        set.insert(album(1, "B"));
        set.insert(album(2, "A"));
        let region = Element::new("ul");

        let list = bind(&set, &region);

        assert_eq!(list.len(), 2);
        assert_eq!(rendered(&region), vec!["A", "B"]);
    }

    #[test]
    fn sorted_insert_places_view_by_set_position() {
        let set = sorted_set();
        let region = Element::new("ul");
        let list = bind(&set, &region);

        set.insert(album(1, "A"));
        set.insert(album(2, "C"));
        set.insert(album(3, "B"));
        list.render();

        let order: Vec<String> = list
            .views()
            .iter()
            .map(|v| v.record().unwrap().get_str("name"))
            .collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert_eq!(rendered(&region), vec!["A", "B", "C"]);
    }

    #[test]
    fn add_signals_without_full_render() {
        let set = sorted_set();
        let region = Element::new("ul");
        let list = bind(&set, &region);
        let adds = Rc::new(Cell::new(0));
        let a = Rc::clone(&adds);
        let _sub = list.signals().subscribe(move |event| {
            if matches!(event, ListEvent::Add { .. }) {
                a.set(a.get() + 1);
            }
        });

        set.insert(album(1, "A"));

        assert_eq!(adds.get(), 1);
        assert!(list.view_for(&set.at(0).unwrap()).is_some());
        // Laid out at the next render
        assert!(list.empty_view().is_some());
        list.render();
        assert_eq!(rendered(&region), vec!["A"]);
    }

    #[test]
    fn filter_then_paginate() {
        let set = sorted_set();
        for (id, name) in [(1, "X"), (2, "Y"), (3, "Z"), (4, "skip")] {
            set.insert(album(id, name));
        }
        let region = Element::new("ul");
        let list = ListBinding::builder(&set, &region)
            .view(row)
            .filter(|r| r.get_str("name") != "skip")
            .offset(1)
            .limit(1)
            .build()
            .unwrap();

        assert_eq!(names(&list.visible_records()), vec!["Y"]);
        assert_eq!(rendered(&region), vec!["Y"]);

        list.set_page(0, -1);
        assert_eq!(names(&list.visible_records()), vec!["X", "Y", "Z"]);
    }

    #[test]
    fn interleaved_changes_keep_window_in_sync() {
        let set = sorted_set();
        let region = Element::new("ul");
        let keep = |r: &Record| !r.get_str("name").ends_with('3');
        let list = ListBinding::builder(&set, &region)
            .view(row)
            .filter(keep)
            .offset(2)
            .limit(4)
            .build()
            .unwrap();

        let mut seed: u64 = 0x2545_f491;
        let mut next_id = 1;
        for step in 0..300 {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let roll = (seed >> 33) % 10;
            let members = set.records();
            if roll < 6 || members.is_empty() {
                set.insert(album(next_id, &format!("n{:02}", (seed >> 40) % 40)));
                next_id += 1;
            } else if roll < 9 {
                let victim = &members[usize::try_from(seed >> 40).unwrap() % members.len()];
                set.remove(victim);
            } else {
                let survivors: Vec<Record> = members.iter().step_by(2).cloned().collect();
                set.reset(survivors);
            }
            list.render();

            let expected: Vec<String> = names(&set.records())
                .into_iter()
                .filter(|name| !name.ends_with('3'))
                .skip(2)
                .take(4)
                .collect();
            assert_eq!(names(&list.visible_records()), expected, "step {step}");
            assert_eq!(list.len(), set.len(), "step {step}");
            if expected.is_empty() {
                assert!(list.empty_view().is_some(), "step {step}");
                assert_eq!(region.child_count(), 1, "step {step}");
            } else {
                assert_eq!(rendered(&region), expected, "step {step}");
            }
        }
    }

    #[test]
    fn render_is_idempotent() {
        let set = sorted_set();
        set.insert(album(1, "A"));
        set.insert(album(2, "B"));
        let region = Element::new("ul");
        let list = bind(&set, &region);

        list.render();
        let first = region.inner_html();
        list.render();

        assert_eq!(region.inner_html(), first);
        assert_eq!(region.child_count(), 2);
    }

    #[test]
    fn single_empty_view_while_empty() {
        let set = sorted_set();
        let region = Element::new("ul");
        let built = Rc::new(Cell::new(0));
        let b = Rc::clone(&built);
        let list = ListBinding::builder(&set, &region)
            .view(row)
            .empty_view(move || -> ViewRef {
                b.set(b.get() + 1);
                TemplateView::builder()
                    .template(Template::parse("No albums").unwrap())
                    .build()
            })
            .build()
            .unwrap();

        list.render();
        list.render();
        assert_eq!(built.get(), 1);
        assert_eq!(region.inner_html(), "<div>No albums</div>");

        let a = album(1, "A");
        set.insert(a.clone());
        list.render();
        assert!(list.empty_view().is_none());
        assert_eq!(rendered(&region), vec!["A"]);

        set.remove(&a);
        assert_eq!(built.get(), 2);
        assert_eq!(region.child_count(), 1);
    }

    #[test]
    fn filtered_to_nothing_shows_empty_state() {
        let set = sorted_set();
        set.insert(album(1, "A"));
        let region = Element::new("ul");
        let list = ListBinding::builder(&set, &region)
            .view(row)
            .filter(|_| false)
            .build()
            .unwrap();
        assert!(list.empty_view().is_some());
        assert!(list.visible_records().is_empty());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_tears_down_child() {
        let set = sorted_set();
        let a = album(1, "A");
        set.insert(a.clone());
        set.insert(album(2, "B"));
        let region = Element::new("ul");
        let list = bind(&set, &region);
        let view = list.view_for(&a).unwrap();

        set.remove(&a);

        assert!(view.is_torn_down());
        assert!(list.view_for(&a).is_none());
        assert_eq!(rendered(&region), vec!["B"]);
    }

    #[test]
    fn reset_rebuilds_children() {
        let set = sorted_set();
        set.insert(album(1, "A"));
        let region = Element::new("ul");
        let list = bind(&set, &region);
        let old = list.views();

        set.reset(vec![album(5, "Q"), album(6, "P")]);

        assert!(old.iter().all(|v| v.is_torn_down()));
        assert_eq!(rendered(&region), vec!["P", "Q"]);
    }

    #[test]
    fn sort_reorders_children() {
        let set = sorted_set();
        let a = album(1, "A");
        set.insert(a.clone());
        set.insert(album(2, "B"));
        let region = Element::new("ul");
        let _list = bind(&set, &region);

        a.set("name", "Z");
        set.sort();

        assert_eq!(rendered(&region), vec!["B", "Z"]);
    }

    #[test]
    fn render_redelegates_child_events() {
        let set = sorted_set();
        let a = album(1, "A");
        set.insert(a.clone());
        let region = Element::new("ul");
        let clicks = Rc::new(Cell::new(0));
        let c = Rc::clone(&clicks);
        let list = ListBinding::builder(&set, &region)
            .view(move |record| -> ViewRef {
                let c = Rc::clone(&c);
                TemplateView::builder()
                    .record(record)
                    .on(crate::view::EventBinding::parse("click", move |_, _| c.set(c.get() + 1)).unwrap())
                    .build()
            })
            .build()
            .unwrap();

        list.render();
        list.render();
        list.view_for(&a).unwrap().el().click();

        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn region_bindings_survive_render() {
        let set = sorted_set();
        let region = Element::new("div");
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let list = ListBinding::builder(&set, &region)
            .view(row)
            .on("click button[name=more]", move |_, _| h.set(h.get() + 1))
            .build()
            .unwrap();

        list.render();
        region.dispatch(&DomEvent::click_button("more"));

        assert_eq!(hits.get(), 1);
        assert_eq!(region.listener_count(), 1);
    }

    #[test]
    fn teardown_stops_following() {
        let set = sorted_set();
        let region = Element::new("ul");
        let list = bind(&set, &region);
        list.teardown();

        set.insert(album(1, "A"));

        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn sync_rerenders() {
        let client = MockResourceClient::new();
        client
            .seed("/api/album", vec![fields(json!({ "id": 1, "name": "Fetched" }))])
            .await;
        let set = sorted_set();
        let region = Element::new("ul");
        let _list = bind(&set, &region);

        set.fetch(&client).await.unwrap();

        assert_eq!(rendered(&region), vec!["Fetched"]);
    }
}
