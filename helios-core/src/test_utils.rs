//! 测试辅助模块
//!
//! In-memory resource client, record kinds and small helpers shared by the
//! unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::record::{DefaultValue, RecordKind};
use helios_provider::{Fields, ResourceClient, ResourceError, Result};

pub static ALBUM: RecordKind = RecordKind {
    name: "album",
    endpoint: "/api/album",
    defaults: &[("name", DefaultValue::Str(""))],
};

pub static PHOTO: RecordKind = RecordKind {
    name: "photograph",
    endpoint: "/api/photograph",
    defaults: &[
        ("title", DefaultValue::Str("")),
        ("location", DefaultValue::Str("")),
        ("taken", DefaultValue::Str("")),
    ],
};

/// Unwrap a `json!` object literal.
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

// ===== MockResourceClient =====

pub struct MockResourceClient {
    collections: RwLock<HashMap<String, BTreeMap<i64, Fields>>>,
    /// Fixed answers for ad-hoc listing URLs
    listings: RwLock<HashMap<String, Vec<Fields>>>,
    next_id: AtomicI64,
    /// 如果 Some，每个请求都返回此错误
    failure: RwLock<Option<ResourceError>>,
    requests: RwLock<Vec<String>>,
}

impl MockResourceClient {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            listings: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            failure: RwLock::new(None),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Store members; each must carry an integer `id`.
    pub async fn seed(&self, collection: &str, members: Vec<Fields>) {
        let mut store = self.collections.write().await;
        let entries = store.entry(collection.to_string()).or_default();
        for member in members {
            let id = member.get("id").and_then(Value::as_i64).unwrap_or_default();
            self.next_id.fetch_max(id + 1, Ordering::Relaxed);
            entries.insert(id, member);
        }
    }

    pub async fn seed_list(&self, url: &str, members: Vec<Fields>) {
        self.listings.write().await.insert(url.to_string(), members);
    }

    pub async fn fail_with(&self, error: Option<ResourceError>) {
        *self.failure.write().await = error;
    }

    /// `"<METHOD> <url>"` for every request received, in order.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }

    pub async fn stored(&self, collection: &str, id: i64) -> Option<Fields> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|entries| entries.get(&id))
            .cloned()
    }

    async fn begin(&self, method: &str, url: &str) -> Result<()> {
        self.requests.write().await.push(format!("{method} {url}"));
        match self.failure.read().await.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn split_member(url: &str) -> Option<(&str, i64)> {
    let (collection, id) = url.rsplit_once('/')?;
    Some((collection, id.parse().ok()?))
}

fn not_found(url: &str) -> ResourceError {
    ResourceError::NotFound {
        url: url.to_string(),
    }
}

#[async_trait]
impl ResourceClient for MockResourceClient {
    async fn list(&self, url: &str) -> Result<Vec<Fields>> {
        self.begin("GET", url).await?;
        if let Some(listing) = self.listings.read().await.get(url) {
            return Ok(listing.clone());
        }
        Ok(self
            .collections
            .read()
            .await
            .get(url)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, url: &str) -> Result<Fields> {
        self.begin("GET", url).await?;
        let (collection, id) = split_member(url).ok_or_else(|| not_found(url))?;
        self.stored(collection, id).await.ok_or_else(|| not_found(url))
    }

    async fn create(&self, collection_url: &str, fields: &Fields) -> Result<Fields> {
        self.begin("POST", collection_url).await?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut stored = fields.clone();
        stored.insert("id".to_string(), Value::from(id));
        self.collections
            .write()
            .await
            .entry(collection_url.to_string())
            .or_default()
            .insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, member_url: &str, fields: &Fields) -> Result<Fields> {
        self.begin("PUT", member_url).await?;
        let (collection, id) = split_member(member_url).ok_or_else(|| not_found(member_url))?;
        let mut store = self.collections.write().await;
        let entry = store
            .get_mut(collection)
            .and_then(|entries| entries.get_mut(&id))
            .ok_or_else(|| not_found(member_url))?;
        entry.clone_from(fields);
        entry.insert("id".to_string(), Value::from(id));
        Ok(entry.clone())
    }

    async fn delete(&self, member_url: &str) -> Result<()> {
        self.begin("DELETE", member_url).await?;
        let (collection, id) = split_member(member_url).ok_or_else(|| not_found(member_url))?;
        self.collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|entries| entries.remove(&id))
            .map(|_| ())
            .ok_or_else(|| not_found(member_url))
    }
}
