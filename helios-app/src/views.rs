//! Catalog views.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use helios_core::dom::Element;
use helios_core::record::{Record, RecordSet};
use helios_core::signal::Subscription;
use helios_core::view::{EventBinding, ListBinding, TemplateView, View, ViewRef, ViewSignal};
use helios_core::{CoreResult, Template};

const ALBUM_TEMPLATE: &str = r#"<span class="album-name"><%-name%></span>"#;

const THUMBNAIL_TEMPLATE: &str = concat!(
    r#"<a href="/photograph.html#<%-id%>">"#,
    r#"<img src="/photograph/small/<%-id%>" alt="<%-title%>"></img>"#,
    r#"<span class="vertical-align-helper"></span></a>"#,
);

const DETAILS_TEMPLATE: &str = concat!(
    r#"<h1><%-title%></h1>"#,
    r#"<img src="/photograph/medium/<%-id%>" alt="<%-title%>"></img>"#,
    r#"<dl><dt>Date</dt><dd><%-taken%></dd><dt>Location</dt><dd><%-location%></dd></dl>"#,
);

/// Parsed templates of the catalog's views.
#[derive(Clone)]
pub struct CatalogViews {
    album: Template,
    thumbnail: Template,
    details: Template,
    click: EventBinding,
}

impl CatalogViews {
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            album: Template::parse(ALBUM_TEMPLATE)?,
            thumbnail: Template::parse(THUMBNAIL_TEMPLATE)?,
            details: Template::parse(DETAILS_TEMPLATE)?,
            click: EventBinding::parse("click", |view, _| view.trigger(ViewSignal::Click))?,
        })
    }

    /// An album entry. Raises [`ViewSignal::Click`] when clicked.
    pub fn album_view(&self, album: &Record) -> ViewRef {
        TemplateView::builder()
            .record(album)
            .tag("li")
            .class("album")
            .template(self.album.clone())
            .on(self.click.clone())
            .build()
    }

    /// A photograph thumbnail. Raises [`ViewSignal::Click`] when clicked.
    pub fn thumbnail_view(&self, photograph: &Record) -> ViewRef {
        TemplateView::builder()
            .record(photograph)
            .tag("li")
            .class("thumbnail")
            .template(self.thumbnail.clone())
            .on(self.click.clone())
            .build()
    }

    /// Read-only photograph details rendered into `region`.
    pub fn photograph_details(&self, region: &Element, photograph: Option<&Record>) -> ViewRef {
        let mut builder = TemplateView::builder()
            .element(region.clone())
            .class("photograph-details")
            .template(self.details.clone());
        if let Some(photograph) = photograph {
            builder = builder.record(photograph);
        }
        builder.build()
    }
}

/// Bind `records` to `region`, one child per record built by `construct`.
///
/// `on_select` runs with the record whose view raised [`ViewSignal::Click`].
/// A click subscription lives only as long as its child view.
pub fn selectable_list(
    records: &RecordSet,
    region: &Element,
    construct: impl Fn(&Record) -> ViewRef + 'static,
    limit: i64,
    on_select: impl Fn(&Record) + 'static,
) -> CoreResult<ListBinding> {
    let on_select: Rc<dyn Fn(&Record)> = Rc::new(on_select);
    let clicks: RefCell<Vec<(Weak<dyn View>, Subscription)>> = RefCell::new(Vec::new());
    ListBinding::builder(records, region)
        .view(construct)
        .initialize_view(move |view| {
            let Some(record) = view.record() else {
                return;
            };
            let on_select = Rc::clone(&on_select);
            let member = record.downgrade();
            let mut clicks = clicks.borrow_mut();
            clicks.retain(|(owner, _)| {
                owner.upgrade().is_some_and(|owner| !owner.is_torn_down())
            });
            let subscription = view.signals().subscribe(move |signal| {
                if *signal == ViewSignal::Click
                    && let Some(record) = member.upgrade()
                {
                    on_select(&record);
                }
            });
            clicks.push((Rc::downgrade(view), subscription));
        })
        .limit(limit)
        .build()
}
