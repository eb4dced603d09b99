use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::{ListBinding, RecordFilter, StaticViewFactory, ViewFactory, ViewRef};
use crate::dom::Element;
use crate::error::{CoreError, CoreResult};
use crate::record::{Record, RecordSet};
use crate::signal::Subscription;

struct TableInner {
    root: Element,
    header: ViewRef,
    body: ListBinding,
    empty_view: Option<StaticViewFactory>,
    empty: RefCell<Option<ViewRef>>,
    watch: RefCell<Option<Subscription>>,
}

/// A `table` with a header view and one body row per record.
///
/// The table lays itself out again after every record set notification:
/// the header, then either the empty-state view (for an empty set, when one
/// is configured) or the body.
#[derive(Clone)]
pub struct TableBinding {
    inner: Rc<TableInner>,
}

/// Builder for [`TableBinding`].
pub struct TableBindingBuilder {
    records: RecordSet,
    header: Option<StaticViewFactory>,
    row: Option<ViewFactory>,
    filter: Option<RecordFilter>,
    empty_view: Option<StaticViewFactory>,
}

impl TableBindingBuilder {
    /// Header view (`thead`) factory. Required.
    #[must_use]
    pub fn header(mut self, factory: impl Fn() -> ViewRef + 'static) -> Self {
        self.header = Some(Rc::new(factory));
        self
    }

    /// Row view (`tr`) factory. Required.
    #[must_use]
    pub fn row(mut self, factory: impl Fn(&Record) -> ViewRef + 'static) -> Self {
        self.row = Some(Rc::new(factory));
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: impl Fn(&Record) -> bool + 'static) -> Self {
        self.filter = Some(Rc::new(filter));
        self
    }

    #[must_use]
    pub fn empty_view(mut self, factory: impl Fn() -> ViewRef + 'static) -> Self {
        self.empty_view = Some(Rc::new(factory));
        self
    }

    pub fn build(self) -> CoreResult<TableBinding> {
        let Some(header) = self.header else {
            log::error!("Table over {} built without a header view", self.records.kind().name);
            return Err(CoreError::MissingHeaderView);
        };
        let Some(row) = self.row else {
            log::error!("Table over {} built without a row view", self.records.kind().name);
            return Err(CoreError::MissingViewFactory);
        };

        let header = header();
        header.render();

        // The body subscribes before the table so rows are current when the table lays out
        let mut body = ListBinding::builder(&self.records, &Element::new("tbody"))
            .view(move |record| row(record));
        if let Some(filter) = self.filter {
            body = body.filter(move |record| filter(record));
        }
        let body = body.build()?;

        let table = TableBinding {
            inner: Rc::new(TableInner {
                root: Element::new("table"),
                header,
                body,
                empty_view: self.empty_view,
                empty: RefCell::new(None),
                watch: RefCell::new(None),
            }),
        };

        let weak: Weak<TableInner> = Rc::downgrade(&table.inner);
        let watch = self.records.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                TableBinding { inner }.render();
            }
        });
        *table.inner.watch.borrow_mut() = Some(watch);
        table.render();
        Ok(table)
    }
}

impl TableBinding {
    pub fn builder(records: &RecordSet) -> TableBindingBuilder {
        TableBindingBuilder {
            records: records.clone(),
            header: None,
            row: None,
            filter: None,
            empty_view: None,
        }
    }

    pub fn el(&self) -> &Element {
        &self.inner.root
    }

    pub fn header(&self) -> &ViewRef {
        &self.inner.header
    }

    pub fn body(&self) -> &ListBinding {
        &self.inner.body
    }

    pub fn render(&self) {
        let inner = &self.inner;
        inner.root.empty();
        inner.root.append(inner.header.el());

        if inner.body.records().is_empty() {
            if let Some(empty) = self.empty_state() {
                inner.root.append(empty.el());
                empty.delegate_events();
            }
        } else {
            inner.root.append(inner.body.region());
        }

        inner.header.delegate_events();
        inner.body.delegate_events();
    }

    fn empty_state(&self) -> Option<ViewRef> {
        let factory = self.inner.empty_view.as_ref()?;
        let cached = self.inner.empty.borrow().clone();
        if cached.is_some() {
            return cached;
        }
        let view = factory();
        view.render();
        *self.inner.empty.borrow_mut() = Some(Rc::clone(&view));
        Some(view)
    }

    pub fn teardown(&self) {
        self.inner.watch.borrow_mut().take();
        self.inner.body.teardown();
        self.inner.header.teardown();
        let empty = self.inner.empty.borrow_mut().take();
        if let Some(empty) = empty {
            empty.teardown();
        }
        self.inner.root.remove();
    }
}

impl fmt::Debug for TableBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableBinding")
            .field("root", &self.inner.root)
            .field("body", &self.inner.body)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Comparator;
    use crate::template::Template;
    use crate::test_utils::{ALBUM, fields};
    use crate::view::{EventBinding, TemplateView};
    use serde_json::json;
    use std::cell::Cell;

    fn header() -> ViewRef {
        TemplateView::builder()
            .tag("thead")
            .template(Template::parse("<tr><th>Name</th></tr>").unwrap())
            .build()
    }

    fn row(record: &Record) -> ViewRef {
        TemplateView::builder()
            .record(record)
            .tag("tr")
            .template(Template::parse("<td><%- name %></td>").unwrap())
            .build()
    }

    fn empty() -> ViewRef {
        TemplateView::builder()
            .tag("tbody")
            .template(Template::parse("<tr><td>No albums</td></tr>").unwrap())
            .build()
    }

    fn albums() -> RecordSet {
        RecordSet::builder(&ALBUM)
            .comparator(Comparator::field("name"))
            .build()
    }

    fn tags(table: &TableBinding) -> Vec<String> {
        table.el().children().iter().map(|c| c.tag().to_string()).collect()
    }

    #[test]
    fn header_is_required() {
        let err = TableBinding::builder(&albums()).row(row).build().unwrap_err();
        assert!(matches!(err, CoreError::MissingHeaderView));
    }

    #[test]
    fn row_view_is_required() {
        let err = TableBinding::builder(&albums()).header(header).build().unwrap_err();
        assert!(matches!(err, CoreError::MissingViewFactory));
    }

    #[test]
    fn empty_table_shows_empty_state() {
        let table = TableBinding::builder(&albums())
            .header(header)
            .row(row)
            .empty_view(empty)
            .build()
            .unwrap();
        assert_eq!(tags(&table), vec!["thead", "tbody"]);
        assert!(table.el().inner_html().contains("No albums"));
    }

    #[test]
    fn empty_table_without_empty_view_has_only_header() {
        let table = TableBinding::builder(&albums())
            .header(header)
            .row(row)
            .build()
            .unwrap();
        assert_eq!(tags(&table), vec!["thead"]);
    }

    #[test]
    fn rows_follow_the_set() {
        let set = albums();
        let table = TableBinding::builder(&set)
            .header(header)
            .row(row)
            .empty_view(empty)
            .build()
            .unwrap();

        set.insert(Record::from_fields(&ALBUM, fields(json!({ "id": 1, "name": "B" }))));
        set.insert(Record::from_fields(&ALBUM, fields(json!({ "id": 2, "name": "A" }))));
        table.body().render();

        assert_eq!(
            table.el().outer_html(),
            "<table><thead><tr><th>Name</th></tr></thead>\
             <tbody><tr><td>A</td></tr><tr><td>B</td></tr></tbody></table>"
        );
    }

    #[test]
    fn filter_applies_to_body() {
        let set = albums();
        set.insert(Record::from_fields(&ALBUM, fields(json!({ "id": 1, "name": "Keep" }))));
        set.insert(Record::from_fields(&ALBUM, fields(json!({ "id": 2, "name": "Drop" }))));
        let table = TableBinding::builder(&set)
            .header(header)
            .row(row)
            .filter(|r| r.get_str("name") == "Keep")
            .build()
            .unwrap();
        assert_eq!(table.body().visible_records().len(), 1);
    }

    #[test]
    fn header_listeners_survive_relayout() {
        let set = albums();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let table = TableBinding::builder(&set)
            .header(move || -> ViewRef {
                let h = Rc::clone(&h);
                TemplateView::builder()
                    .tag("thead")
                    .on(EventBinding::parse("click", move |_, _| h.set(h.get() + 1)).unwrap())
                    .build()
            })
            .row(row)
            .build()
            .unwrap();

        set.insert(Record::new(&ALBUM));
        table.header().el().click();

        assert_eq!(hits.get(), 1);
    }
}
