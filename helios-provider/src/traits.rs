use async_trait::async_trait;

use crate::error::Result;
use crate::types::Fields;

/// Remote resource Trait
///
/// Each record kind maps to a collection endpoint:
/// - create = POST `<collection>`
/// - update = PUT `<collection>/<id>`
/// - delete = DELETE `<collection>/<id>`
/// - list = GET `<collection>` (or an ad-hoc URL such as
///   `/api/album_photograph/<album id>`)
///
/// Platform implementation:
/// - HTTP: `HttpResourceClient` (reqwest)
/// - Tests: in-memory mocks
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch a collection as a list of JSON objects
    async fn list(&self, url: &str) -> Result<Vec<Fields>>;

    /// Fetch a single member
    async fn get(&self, url: &str) -> Result<Fields>;

    /// Create a member, returning the stored representation (including its id)
    async fn create(&self, collection_url: &str, fields: &Fields) -> Result<Fields>;

    /// Replace a member, returning the stored representation
    async fn update(&self, member_url: &str, fields: &Fields) -> Result<Fields>;

    /// Delete a member
    async fn delete(&self, member_url: &str) -> Result<()>;
}
