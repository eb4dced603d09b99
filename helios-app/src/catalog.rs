//! The catalog's record sets.

use helios_core::record::{Comparator, Record, RecordSet, SaveOptions};
use helios_core::CoreResult;
use helios_provider::{Fields, RecordId, ResourceClient, member_url};
use serde_json::Value;

use crate::kinds::{ALBUM, ALBUM_ORDER, PHOTOGRAPH, PHOTOGRAPH_ORDER, TAG, TAG_ORDER};

const ALBUM_PHOTOGRAPHS: &str = "/api/album_photograph";
const UNCATEGORISED: &str = "uncategorised";

/// Owns the album list and hands out photograph and tag sets for the
/// catalog's listing endpoints.
#[derive(Clone)]
pub struct Catalog {
    albums: RecordSet,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            albums: RecordSet::builder(&ALBUM)
                .comparator(Comparator::field(ALBUM_ORDER))
                .build(),
        }
    }

    /// Every album, ordered by name.
    pub fn albums(&self) -> &RecordSet {
        &self.albums
    }

    /// Photographs of one album, ordered by date taken. Not fetched yet.
    pub fn photographs_in_album(&self, album: RecordId) -> RecordSet {
        photograph_set(member_url(ALBUM_PHOTOGRAPHS, album))
    }

    /// Photographs that belong to no album. Not fetched yet.
    pub fn uncategorised_photographs(&self) -> RecordSet {
        photograph_set(format!("{ALBUM_PHOTOGRAPHS}/{UNCATEGORISED}"))
    }

    /// Tags of one photograph. Not fetched yet.
    pub fn photograph_tags(&self, photograph: RecordId) -> RecordSet {
        RecordSet::builder(&TAG)
            .url(member_url(TAG.endpoint, photograph))
            .comparator(Comparator::field(TAG_ORDER))
            .build()
    }

    /// Merge the server's album listing into [`Catalog::albums`].
    pub async fn refresh_albums(&self, client: &dyn ResourceClient) -> CoreResult<()> {
        self.albums.fetch(client).await
    }

    /// Create an album once the server accepts it, then reload the listing.
    pub async fn create_album(&self, client: &dyn ResourceClient, name: &str) -> CoreResult<Record> {
        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::from(name.trim()));
        let album = self
            .albums
            .create(client, fields, SaveOptions::wait())
            .await?;
        self.refresh_albums(client).await?;
        log::info!("Created album {:?} ({})", name, album.url());
        Ok(album)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

fn photograph_set(url: String) -> RecordSet {
    RecordSet::builder(&PHOTOGRAPH)
        .url(url)
        .comparator(Comparator::field(PHOTOGRAPH_ORDER))
        .build()
}
