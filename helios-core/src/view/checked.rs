use helios_provider::RecordId;

use super::ListBinding;
use crate::record::{Record, RecordSet};

/// A [`ListBinding`] whose rows can be checked.
///
/// The state of a row is the `checked` property of its view's root element,
/// so it survives re-renders of the list but not a reset.
#[derive(Debug, Clone)]
pub struct CheckedListBinding {
    list: ListBinding,
}

impl CheckedListBinding {
    pub fn new(list: ListBinding) -> Self {
        Self { list }
    }

    pub fn list(&self) -> &ListBinding {
        &self.list
    }

    /// Records whose rows are checked, in list order.
    pub fn checked(&self) -> Vec<Record> {
        self.list
            .views()
            .iter()
            .filter(|view| view.el().is_checked())
            .filter_map(|view| view.record())
            .collect()
    }

    /// Identities of the checked records; unsaved records are skipped.
    pub fn checked_ids(&self) -> Vec<RecordId> {
        self.checked().iter().filter_map(Record::id).collect()
    }

    /// Check exactly the rows whose record identity appears in `records`.
    pub fn set_checked(&self, records: &RecordSet) {
        self.apply(|record| record.id().is_some_and(|id| records.get(id).is_some()));
    }

    /// Check exactly the rows whose record identity appears in `ids`.
    pub fn set_checked_ids(&self, ids: &[RecordId]) {
        self.apply(|record| record.id().is_some_and(|id| ids.contains(&id)));
    }

    pub fn check_all(&self) {
        self.apply(|_| true);
    }

    pub fn check_none(&self) {
        self.apply(|_| false);
    }

    pub fn invert(&self) {
        for view in self.list.views() {
            view.el().set_checked(!view.el().is_checked());
        }
    }

    /// Flip one row.
    pub fn toggle(&self, record: &Record) {
        if let Some(view) = self.list.view_for(record) {
            view.el().set_checked(!view.el().is_checked());
        }
    }

    fn apply(&self, checked: impl Fn(&Record) -> bool) {
        for view in self.list.views() {
            let state = view.record().is_some_and(|record| checked(&record));
            view.el().set_checked(state);
        }
    }
}

impl From<ListBinding> for CheckedListBinding {
    fn from(list: ListBinding) -> Self {
        Self::new(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;
    use crate::template::Template;
    use crate::test_utils::{PHOTO, fields};
    use crate::view::{TemplateView, ViewRef};
    use serde_json::json;

    fn photo(id: i64) -> Record {
        Record::from_fields(&PHOTO, fields(json!({ "id": id, "title": format!("p{id}") })))
    }

    fn checked_list(set: &RecordSet) -> CheckedListBinding {
        ListBinding::builder(set, &Element::new("ul"))
            .view(|record| -> ViewRef {
                TemplateView::builder()
                    .record(record)
                    .tag("li")
                    .template(Template::parse(r#"<input type="checkbox"><%- title %>"#).unwrap())
                    .build()
            })
            .build()
            .unwrap()
            .into()
    }

    fn set_of(ids: &[i64]) -> RecordSet {
        let set = RecordSet::new(&PHOTO);
        for id in ids {
            set.insert(photo(*id));
        }
        set
    }

    #[test]
    fn nothing_checked_initially() {
        let list = checked_list(&set_of(&[1, 2]));
        assert!(list.checked().is_empty());
    }

    #[test]
    fn set_checked_ids_then_invert() {
        let list = checked_list(&set_of(&[1, 2, 3]));

        list.set_checked_ids(&[RecordId(1), RecordId(3)]);
        assert_eq!(list.checked_ids(), vec![RecordId(1), RecordId(3)]);

        list.invert();
        assert_eq!(list.checked_ids(), vec![RecordId(2)]);
    }

    #[test]
    fn set_checked_from_record_set() {
        let list = checked_list(&set_of(&[1, 2, 3]));
        list.set_checked(&set_of(&[2, 9]));
        assert_eq!(list.checked_ids(), vec![RecordId(2)]);
    }

    #[test]
    fn check_all_and_none() {
        let list = checked_list(&set_of(&[1, 2]));
        list.check_all();
        assert_eq!(list.checked().len(), 2);
        list.check_none();
        assert!(list.checked().is_empty());
    }

    #[test]
    fn state_survives_render() {
        let set = set_of(&[1, 2]);
        let list = checked_list(&set);
        list.toggle(&set.at(1).unwrap());
        list.list().render();
        assert_eq!(list.checked_ids(), vec![RecordId(2)]);
    }
}
