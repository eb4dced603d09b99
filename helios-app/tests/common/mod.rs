//! In-memory catalog server shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use helios_app::{AppConfig, AppState, AppStateBuilder};
use helios_core::dom::Element;
use helios_provider::{Fields, ResourceClient, ResourceError, Result};
use serde_json::Value;
use tokio::sync::RwLock;

pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

#[derive(Default)]
struct Store {
    collections: HashMap<String, BTreeMap<i64, Fields>>,
    listings: HashMap<String, Vec<Fields>>,
    next_id: i64,
    requests: Vec<String>,
    offline: bool,
}

/// Answers the catalog's REST endpoints from memory.
#[derive(Default)]
pub struct CatalogServer {
    store: RwLock<Store>,
}

impl CatalogServer {
    pub async fn with_albums(names: &[&str]) -> Arc<Self> {
        let server = Arc::new(Self::default());
        for name in names {
            server
                .create("/api/album", &fields(serde_json::json!({ "name": name })))
                .await
                .unwrap();
        }
        server.store.write().await.requests.clear();
        server
    }

    pub async fn add(&self, collection: &str, member: Fields) {
        let mut store = self.store.write().await;
        let id = member.get("id").and_then(Value::as_i64).unwrap_or_default();
        store.next_id = store.next_id.max(id);
        store
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, member);
    }

    pub async fn set_listing(&self, url: &str, members: Vec<Fields>) {
        self.store.write().await.listings.insert(url.to_string(), members);
    }

    pub async fn go_offline(&self) {
        self.store.write().await.offline = true;
    }

    pub async fn requests(&self) -> Vec<String> {
        self.store.read().await.requests.clone()
    }

    pub async fn member(&self, collection: &str, id: i64) -> Option<Fields> {
        self.store
            .read()
            .await
            .collections
            .get(collection)
            .and_then(|members| members.get(&id))
            .cloned()
    }

    async fn begin(&self, method: &str, url: &str) -> Result<()> {
        let mut store = self.store.write().await;
        store.requests.push(format!("{method} {url}"));
        if store.offline {
            return Err(ResourceError::NetworkError {
                url: url.to_string(),
                detail: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

fn split_member(url: &str) -> Result<(&str, i64)> {
    url.rsplit_once('/')
        .and_then(|(collection, id)| Some((collection, id.parse().ok()?)))
        .ok_or_else(|| ResourceError::NotFound {
            url: url.to_string(),
        })
}

#[async_trait]
impl ResourceClient for CatalogServer {
    async fn list(&self, url: &str) -> Result<Vec<Fields>> {
        self.begin("GET", url).await?;
        let store = self.store.read().await;
        if let Some(listing) = store.listings.get(url) {
            return Ok(listing.clone());
        }
        Ok(store
            .collections
            .get(url)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, url: &str) -> Result<Fields> {
        self.begin("GET", url).await?;
        let (collection, id) = split_member(url)?;
        self.member(collection, id).await.ok_or_else(|| ResourceError::NotFound {
            url: url.to_string(),
        })
    }

    async fn create(&self, collection_url: &str, fields: &Fields) -> Result<Fields> {
        self.begin("POST", collection_url).await?;
        let mut store = self.store.write().await;
        store.next_id += 1;
        let id = store.next_id;
        let mut stored = fields.clone();
        stored.insert("id".to_string(), Value::from(id));
        store
            .collections
            .entry(collection_url.to_string())
            .or_default()
            .insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, member_url: &str, fields: &Fields) -> Result<Fields> {
        self.begin("PUT", member_url).await?;
        let (collection, id) = split_member(member_url)?;
        let mut stored = fields.clone();
        stored.insert("id".to_string(), Value::from(id));
        self.store
            .write()
            .await
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, member_url: &str) -> Result<()> {
        self.begin("DELETE", member_url).await?;
        let (collection, id) = split_member(member_url)?;
        self.store
            .write()
            .await
            .collections
            .get_mut(collection)
            .and_then(|members| members.remove(&id))
            .map(|_| ())
            .ok_or_else(|| ResourceError::NotFound {
                url: member_url.to_string(),
            })
    }
}

pub fn app(server: &Arc<CatalogServer>) -> AppState {
    app_with_config(server, AppConfig::default())
}

pub fn app_with_config(server: &Arc<CatalogServer>, config: AppConfig) -> AppState {
    let client: Arc<dyn ResourceClient> = server.clone();
    AppStateBuilder::new()
        .config(config)
        .client(client)
        .modal_container(Element::new("div").with_attr("id", "modals"))
        .build()
        .unwrap()
}
