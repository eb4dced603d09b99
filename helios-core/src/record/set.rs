use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

use super::{Comparator, Record, RecordEvent, RecordKind, SaveOptions};
use crate::error::{CoreError, CoreResult};
use crate::signal::{Emitter, Subscription};
use helios_provider::{Fields, RecordId, ResourceClient, ResourceError};

/// What to do when an inserted record shares its identity with a member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Copy the incoming fields onto the existing member.
    #[default]
    Merge,
    /// Leave the set untouched.
    Reject,
}

/// Result of [`RecordSet::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(usize),
    Merged(usize),
    /// A member with the same identity exists and the set rejects duplicates.
    Rejected,
}

/// How [`RecordSet::fetch_with`] reconciles the server listing with the members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Add new records, update existing ones, drop missing ones.
    #[default]
    Merge,
    /// Replace all members at once.
    Reset,
}

/// Notifications emitted by a [`RecordSet`].
#[derive(Debug, Clone)]
pub enum RecordSetEvent {
    Add { record: Record, index: usize },
    Remove { record: Record, index: usize },
    /// Membership was replaced wholesale.
    Reset,
    /// Members were reordered.
    Sort,
    /// A member's fields changed.
    Change { record: Record },
    /// A remote operation on the set or one of its members completed.
    Sync,
    Error(ResourceError),
}

struct Member {
    record: Record,
    _watch: Subscription,
}

struct SetInner {
    kind: &'static RecordKind,
    url: RefCell<String>,
    comparator: Option<Comparator>,
    duplicates: DuplicatePolicy,
    members: RefCell<Vec<Member>>,
    events: Emitter<RecordSetEvent>,
}

/// An ordered collection of records of one kind.
///
/// Members are unique by identity (see [`Record::same_identity`]) and kept in
/// comparator order; ties keep insertion order. Without a comparator the
/// insertion order is kept.
#[derive(Clone)]
pub struct RecordSet {
    inner: Rc<SetInner>,
}

/// Builder for [`RecordSet`].
#[derive(Debug)]
pub struct RecordSetBuilder {
    kind: &'static RecordKind,
    url: Option<String>,
    comparator: Option<Comparator>,
    duplicates: DuplicatePolicy,
}

impl RecordSetBuilder {
    /// Listing URL, when it differs from the kind's endpoint.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = Some(comparator);
        self
    }

    #[must_use]
    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn build(self) -> RecordSet {
        RecordSet {
            inner: Rc::new(SetInner {
                kind: self.kind,
                url: RefCell::new(self.url.unwrap_or_else(|| self.kind.endpoint.to_string())),
                comparator: self.comparator,
                duplicates: self.duplicates,
                members: RefCell::new(Vec::new()),
                events: Emitter::new(),
            }),
        }
    }
}

impl RecordSet {
    pub fn new(kind: &'static RecordKind) -> Self {
        Self::builder(kind).build()
    }

    pub fn builder(kind: &'static RecordKind) -> RecordSetBuilder {
        RecordSetBuilder {
            kind,
            url: None,
            comparator: None,
            duplicates: DuplicatePolicy::default(),
        }
    }

    pub fn kind(&self) -> &'static RecordKind {
        self.inner.kind
    }

    pub fn url(&self) -> String {
        self.inner.url.borrow().clone()
    }

    pub fn set_url(&self, url: impl Into<String>) {
        *self.inner.url.borrow_mut() = url.into();
    }

    pub fn len(&self) -> usize {
        self.inner.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.members.borrow().is_empty()
    }

    pub fn at(&self, index: usize) -> Option<Record> {
        self.inner
            .members
            .borrow()
            .get(index)
            .map(|member| member.record.clone())
    }

    /// Position of `record`, matched by handle first and identity second.
    pub fn index_of(&self, record: &Record) -> Option<usize> {
        let members = self.inner.members.borrow();
        members
            .iter()
            .position(|member| member.record.ptr_eq(record))
            .or_else(|| {
                members
                    .iter()
                    .position(|member| member.record.same_identity(record))
            })
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.index_of(record).is_some()
    }

    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.inner
            .members
            .borrow()
            .iter()
            .find(|member| member.record.id() == Some(id))
            .map(|member| member.record.clone())
    }

    /// Members in order.
    pub fn records(&self) -> Vec<Record> {
        self.inner
            .members
            .borrow()
            .iter()
            .map(|member| member.record.clone())
            .collect()
    }

    pub fn subscribe(&self, callback: impl Fn(&RecordSetEvent) + 'static) -> Subscription {
        self.inner.events.subscribe(callback)
    }

    /// Add `record` at its comparator position.
    pub fn insert(&self, record: Record) -> InsertOutcome {
        if let Some(index) = self.index_of(&record) {
            return match self.inner.duplicates {
                DuplicatePolicy::Reject => {
                    log::debug!(
                        "Rejected duplicate {} {:?}",
                        self.inner.kind.name,
                        record.id()
                    );
                    InsertOutcome::Rejected
                }
                DuplicatePolicy::Merge => {
                    if let Some(existing) = self.at(index)
                        && !existing.ptr_eq(&record)
                    {
                        existing.set_fields(record.to_json());
                    }
                    InsertOutcome::Merged(index)
                }
            };
        }

        let index = self.insertion_index(&record);
        let watch = self.watch(&record);
        self.inner.members.borrow_mut().insert(
            index,
            Member {
                record: record.clone(),
                _watch: watch,
            },
        );
        self.inner
            .events
            .emit(&RecordSetEvent::Add { record, index });
        InsertOutcome::Inserted(index)
    }

    /// Build a record of the set's kind from `fields` and insert it.
    pub fn insert_fields(&self, fields: Fields) -> (Record, InsertOutcome) {
        let record = Record::from_fields(self.inner.kind, fields);
        let outcome = self.insert(record.clone());
        (record, outcome)
    }

    fn insertion_index(&self, record: &Record) -> usize {
        let members = self.inner.members.borrow();
        match &self.inner.comparator {
            Some(comparator) => members
                .iter()
                .position(|member| comparator.compare(record, &member.record) == Ordering::Less)
                .unwrap_or(members.len()),
            None => members.len(),
        }
    }

    /// Drop `record` from the set. Returns its former position.
    pub fn remove(&self, record: &Record) -> Option<usize> {
        let index = self.index_of(record)?;
        let member = self.inner.members.borrow_mut().remove(index);
        let record = member.record.clone();
        drop(member);
        self.inner
            .events
            .emit(&RecordSetEvent::Remove { record, index });
        Some(index)
    }

    /// Replace every member, keeping the first of any duplicates.
    pub fn reset(&self, records: Vec<Record>) {
        let mut next: Vec<Member> = Vec::with_capacity(records.len());
        for record in records {
            if next.iter().any(|member| member.record.same_identity(&record)) {
                continue;
            }
            let watch = self.watch(&record);
            next.push(Member {
                record,
                _watch: watch,
            });
        }
        if let Some(comparator) = &self.inner.comparator {
            next.sort_by(|a, b| comparator.compare(&a.record, &b.record));
        }
        let previous = std::mem::replace(&mut *self.inner.members.borrow_mut(), next);
        drop(previous);
        self.inner.events.emit(&RecordSetEvent::Reset);
    }

    /// Re-establish comparator order, emitting [`RecordSetEvent::Sort`] when it changed.
    pub fn sort(&self) {
        let Some(comparator) = &self.inner.comparator else {
            return;
        };
        let before = self.records();
        let mut members = std::mem::take(&mut *self.inner.members.borrow_mut());
        members.sort_by(|a, b| comparator.compare(&a.record, &b.record));
        *self.inner.members.borrow_mut() = members;

        let reordered = self
            .records()
            .iter()
            .zip(&before)
            .any(|(now, was)| !now.ptr_eq(was));
        if reordered {
            self.inner.events.emit(&RecordSetEvent::Sort);
        }
    }

    /// Load the listing from the set's URL, merging it into the members.
    pub async fn fetch(&self, client: &dyn ResourceClient) -> CoreResult<()> {
        self.fetch_with(client, FetchMode::Merge).await
    }

    pub async fn fetch_with(&self, client: &dyn ResourceClient, mode: FetchMode) -> CoreResult<()> {
        let url = self.url();
        self.load(client, &url, mode).await
    }

    /// Load the listing from an ad-hoc URL, merging it into the members.
    pub async fn fetch_from(&self, client: &dyn ResourceClient, url: &str) -> CoreResult<()> {
        self.load(client, url, FetchMode::Merge).await
    }

    async fn load(&self, client: &dyn ResourceClient, url: &str, mode: FetchMode) -> CoreResult<()> {
        match client.list(url).await {
            Ok(listing) => {
                if let Some(index) = listing.iter().position(has_malformed_id) {
                    let e = CoreError::InvalidPayload {
                        url: url.to_string(),
                        message: format!("member {index} has an id that is not an integer"),
                    };
                    log::warn!("Fetching {url} failed: {e}");
                    return Err(e);
                }
                log::debug!(
                    "Fetched {} {} record(s) from {url}",
                    listing.len(),
                    self.inner.kind.name
                );
                match mode {
                    FetchMode::Reset => self.reset(
                        listing
                            .into_iter()
                            .map(|fields| Record::from_fields(self.inner.kind, fields))
                            .collect(),
                    ),
                    FetchMode::Merge => self.merge(listing),
                }
                self.inner.events.emit(&RecordSetEvent::Sync);
                Ok(())
            }
            Err(e) => {
                if e.is_expected() {
                    log::warn!("Fetching {url} failed: {e}");
                } else {
                    log::error!("Fetching {url} failed: {e}");
                }
                self.inner.events.emit(&RecordSetEvent::Error(e.clone()));
                Err(e.into())
            }
        }
    }

    fn merge(&self, listing: Vec<Fields>) {
        let mut kept: Vec<Record> = Vec::with_capacity(listing.len());
        for fields in listing {
            let existing = fields
                .get("id")
                .and_then(RecordId::from_value)
                .and_then(|id| self.get(id));
            if let Some(record) = existing {
                record.set_fields(fields);
                kept.push(record);
            } else {
                let (record, outcome) = self.insert_fields(fields);
                if matches!(outcome, InsertOutcome::Inserted(_)) {
                    kept.push(record);
                }
            }
        }

        let stale: Vec<Record> = self
            .records()
            .into_iter()
            .filter(|record| !kept.iter().any(|k| k.ptr_eq(record)))
            .collect();
        for record in &stale {
            self.remove(record);
        }
        self.sort();
    }

    /// Create a record of the set's kind on the server and add it.
    ///
    /// Without `wait` the record joins the set before the request is sent.
    pub async fn create(
        &self,
        client: &dyn ResourceClient,
        fields: Fields,
        options: SaveOptions,
    ) -> CoreResult<Record> {
        let record = Record::new(self.inner.kind);
        if options.wait {
            record.save(client, fields, options).await?;
            self.insert(record.clone());
        } else {
            record.set_fields(fields);
            self.insert(record.clone());
            record.save(client, Fields::new(), options).await?;
        }
        Ok(record)
    }

    fn watch(&self, record: &Record) -> Subscription {
        let set: Weak<SetInner> = Rc::downgrade(&self.inner);
        let member = record.downgrade();
        record.subscribe(move |event| {
            let (Some(inner), Some(record)) = (set.upgrade(), member.upgrade()) else {
                return;
            };
            let set = RecordSet { inner };
            match event {
                RecordEvent::Change { .. } => {
                    set.inner.events.emit(&RecordSetEvent::Change { record });
                }
                RecordEvent::Sync => set.inner.events.emit(&RecordSetEvent::Sync),
                RecordEvent::Error(e) => set.inner.events.emit(&RecordSetEvent::Error(e.clone())),
                RecordEvent::Destroy => {
                    set.remove(&record);
                }
            }
        })
    }
}

impl fmt::Debug for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSet")
            .field("kind", &self.inner.kind.name)
            .field("url", &*self.inner.url.borrow())
            .field("len", &self.len())
            .finish()
    }
}

fn has_malformed_id(fields: &Fields) -> bool {
    fields
        .get("id")
        .is_some_and(|id| !id.is_null() && RecordId::from_value(id).is_none())
}
