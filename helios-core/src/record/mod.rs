//! Records and ordered record sets.
//!
//! A [`Record`] is a field map with an optional server identity and a
//! per-kind table of default values. A [`RecordSet`] keeps records ordered by
//! a [`Comparator`] and re-broadcasts the events of its members.
//!
//! Both are single-threaded shared handles: cloning a `Record` or a
//! `RecordSet` yields another handle to the same state.

mod ordering;
mod set;

pub use ordering::{Comparator, compare_values};
pub use set::{DuplicatePolicy, FetchMode, InsertOutcome, RecordSet, RecordSetBuilder, RecordSetEvent};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::signal::{Emitter, Subscription};
use crate::template::value_to_text;
use helios_provider::{Fields, RecordId, ResourceClient, ResourceError, member_url};

/// A default field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

impl DefaultValue {
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Int(i) => Value::from(i),
            Self::Str(s) => Value::from(s),
        }
    }
}

/// Static description of a record type.
#[derive(Debug)]
pub struct RecordKind {
    pub name: &'static str,
    /// Collection endpoint, e.g. `/api/album`.
    pub endpoint: &'static str,
    pub defaults: &'static [(&'static str, DefaultValue)],
}

impl RecordKind {
    pub fn default_for(&self, field: &str) -> Option<Value> {
        self.defaults
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value.to_value())
    }

    pub fn default_fields(&self) -> Fields {
        self.defaults
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.to_value()))
            .collect()
    }
}

/// Notifications emitted by a [`Record`].
#[derive(Debug, Clone)]
pub enum RecordEvent {
    /// Fields changed; `fields` lists their names.
    Change { fields: Vec<String> },
    /// A remote operation completed.
    Sync,
    /// A remote operation failed.
    Error(ResourceError),
    /// The record is being destroyed; containers drop it.
    Destroy,
}

/// Options for [`Record::save`].
#[derive(Default)]
pub struct SaveOptions {
    /// Apply the changes only after the server confirms them.
    pub wait: bool,
    /// Runs after the server response is applied, before `Sync` is emitted.
    pub success: Option<Box<dyn FnOnce(&Record)>>,
}

impl SaveOptions {
    #[must_use]
    pub fn wait() -> Self {
        Self {
            wait: true,
            success: None,
        }
    }

    #[must_use]
    pub fn on_success(mut self, success: impl FnOnce(&Record) + 'static) -> Self {
        self.success = Some(Box::new(success));
        self
    }
}

impl fmt::Debug for SaveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveOptions")
            .field("wait", &self.wait)
            .field("success", &self.success.is_some())
            .finish()
    }
}

struct RecordInner {
    kind: &'static RecordKind,
    id: Cell<Option<RecordId>>,
    fields: RefCell<Fields>,
    events: Emitter<RecordEvent>,
}

/// A shared handle to one record.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

/// A non-owning reference to a [`Record`].
#[derive(Clone)]
pub struct WeakRecord(Weak<RecordInner>);

impl WeakRecord {
    pub fn upgrade(&self) -> Option<Record> {
        self.0.upgrade().map(|inner| Record { inner })
    }
}

impl fmt::Debug for WeakRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakRecord")
    }
}

impl Record {
    /// A new, never-saved record holding the kind's defaults.
    pub fn new(kind: &'static RecordKind) -> Self {
        Self::from_fields(kind, Fields::new())
    }

    /// A record built from server or caller data; an `id` field becomes its identity.
    pub fn from_fields(kind: &'static RecordKind, mut fields: Fields) -> Self {
        let id = fields.remove("id").as_ref().and_then(RecordId::from_value);
        let mut all = kind.default_fields();
        all.extend(fields);
        Self {
            inner: Rc::new(RecordInner {
                kind,
                id: Cell::new(id),
                fields: RefCell::new(all),
                events: Emitter::new(),
            }),
        }
    }

    pub fn kind(&self) -> &'static RecordKind {
        self.inner.kind
    }

    pub fn id(&self) -> Option<RecordId> {
        self.inner.id.get()
    }

    /// Whether the record has never been saved.
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// Read a field, falling back to the kind's default.
    pub fn get(&self, field: &str) -> Option<Value> {
        if field == "id" {
            return self.id().map(|id| Value::from(id.0));
        }
        self.inner
            .fields
            .borrow()
            .get(field)
            .cloned()
            .or_else(|| self.inner.kind.default_for(field))
    }

    /// Read a field as display text (`""` when absent).
    pub fn get_str(&self, field: &str) -> String {
        self.get(field).as_ref().map(value_to_text).unwrap_or_default()
    }

    /// Set one field. Returns whether the value changed.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> bool {
        let mut fields = Fields::new();
        fields.insert(field.to_string(), value.into());
        !self.set_fields(fields).is_empty()
    }

    /// Set several fields, emitting one [`RecordEvent::Change`] when any changed.
    ///
    /// Returns the names of the changed fields.
    pub fn set_fields(&self, fields: Fields) -> Vec<String> {
        let changed = self.apply(fields);
        if !changed.is_empty() {
            self.inner.events.emit(&RecordEvent::Change {
                fields: changed.clone(),
            });
        }
        changed
    }

    fn apply(&self, fields: Fields) -> Vec<String> {
        let mut changed = Vec::new();
        for (name, value) in fields {
            if name == "id" {
                let id = RecordId::from_value(&value);
                if id != self.id() {
                    self.inner.id.set(id);
                    changed.push(name);
                }
                continue;
            }
            let mut current = self.inner.fields.borrow_mut();
            if current.get(&name) != Some(&value) {
                current.insert(name.clone(), value);
                changed.push(name);
            }
        }
        changed
    }

    /// Own fields, without the identity.
    pub fn fields(&self) -> Fields {
        self.inner.fields.borrow().clone()
    }

    /// Defaults merged with the fields, plus `id` once the record is saved.
    pub fn to_json(&self) -> Fields {
        let mut json = self.inner.kind.default_fields();
        json.extend(self.fields());
        if let Some(id) = self.id() {
            json.insert("id".to_string(), Value::from(id.0));
        }
        json
    }

    /// `<endpoint>` for new records, `<endpoint>/<id>` otherwise.
    pub fn url(&self) -> String {
        match self.id() {
            Some(id) => member_url(self.inner.kind.endpoint, id),
            None => self.inner.kind.endpoint.to_string(),
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&RecordEvent) + 'static) -> Subscription {
        self.inner.events.subscribe(callback)
    }

    pub fn downgrade(&self) -> WeakRecord {
        WeakRecord(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Same handle, or both saved with the same identity.
    pub fn same_identity(&self, other: &Record) -> bool {
        self.ptr_eq(other)
            || matches!((self.id(), other.id()), (Some(a), Some(b)) if a == b)
    }

    /// Persist the record with `changes` applied.
    ///
    /// New records are created in the kind's collection, saved ones replaced
    /// at their member URL. The server's answer (including a new identity) is
    /// applied to the record.
    pub async fn save(
        &self,
        client: &dyn ResourceClient,
        changes: Fields,
        options: SaveOptions,
    ) -> CoreResult<()> {
        let SaveOptions { wait, success } = options;
        let mut body = if wait {
            self.to_json()
        } else {
            self.set_fields(changes.clone());
            self.to_json()
        };
        if wait {
            body.extend(changes.clone());
        }

        let endpoint = self.inner.kind.endpoint;
        let result = match self.id() {
            None => client.create(endpoint, &body).await,
            Some(id) => client.update(&member_url(endpoint, id), &body).await,
        };

        match result {
            Ok(stored) => {
                let mut applied = if wait { changes } else { Fields::new() };
                applied.extend(stored);
                self.set_fields(applied);
                log::debug!("Saved {} {}", self.inner.kind.name, self.url());
                if let Some(success) = success {
                    success(self);
                }
                self.inner.events.emit(&RecordEvent::Sync);
                Ok(())
            }
            Err(e) => Err(self.fail("save", e)),
        }
    }

    /// Reload the record from its member URL.
    pub async fn fetch(&self, client: &dyn ResourceClient) -> CoreResult<()> {
        if self.is_new() {
            return Err(self.fail(
                "fetch",
                ResourceError::UnsavedRecord {
                    operation: "fetch".to_string(),
                },
            ));
        }
        match client.get(&self.url()).await {
            Ok(fields) => {
                self.set_fields(fields);
                self.inner.events.emit(&RecordEvent::Sync);
                Ok(())
            }
            Err(e) => Err(self.fail("fetch", e)),
        }
    }

    /// Destroy the record: containers drop it at once, then the server copy
    /// is deleted if there is one.
    pub async fn destroy(&self, client: &dyn ResourceClient) -> CoreResult<()> {
        self.inner.events.emit(&RecordEvent::Destroy);
        let Some(id) = self.id() else {
            log::debug!("Destroyed unsaved {} locally", self.inner.kind.name);
            return Ok(());
        };
        match client.delete(&member_url(self.inner.kind.endpoint, id)).await {
            Ok(()) => {
                self.inner.events.emit(&RecordEvent::Sync);
                Ok(())
            }
            Err(e) => Err(self.fail("destroy", e)),
        }
    }

    fn fail(&self, operation: &str, error: ResourceError) -> CoreError {
        if error.is_expected() {
            log::warn!("{operation} {} failed: {error}", self.inner.kind.name);
        } else {
            log::error!("{operation} {} failed: {error}", self.inner.kind.name);
        }
        self.inner.events.emit(&RecordEvent::Error(error.clone()));
        error.into()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("kind", &self.inner.kind.name)
            .field("id", &self.id())
            .field("fields", &*self.inner.fields.borrow())
            .finish()
    }
}
