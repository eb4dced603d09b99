//! Record kinds served by the catalog.

use helios_core::record::{DefaultValue, RecordKind};

pub static ALBUM: RecordKind = RecordKind {
    name: "album",
    endpoint: "/api/album",
    defaults: &[("name", DefaultValue::Str(""))],
};

/// Photograph collections have no listing URL of their own; they are
/// fetched from album or search endpoints.
pub static PHOTOGRAPH: RecordKind = RecordKind {
    name: "photograph",
    endpoint: "/api/photograph",
    defaults: &[
        ("title", DefaultValue::Str("")),
        ("location", DefaultValue::Str("")),
        ("taken", DefaultValue::Str("")),
    ],
};

pub static TAG: RecordKind = RecordKind {
    name: "tag",
    endpoint: "/api/photograph_tag",
    defaults: &[("tag", DefaultValue::Str(""))],
};

/// Field each kind's collections are ordered by.
pub const ALBUM_ORDER: &str = "name";
pub const PHOTOGRAPH_ORDER: &str = "taken";
pub const TAG_ORDER: &str = "tag";
