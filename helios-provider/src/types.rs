use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A JSON object as exchanged with the catalog server.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Server-assigned identity of a record.
///
/// The catalog server hands out SQLite row ids, so identities are integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Read an identity out of a JSON value (`3` or `"3"`).
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Self),
            serde_json::Value::String(s) => s.trim().parse().ok().map(Self),
            _ => None,
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection settings for [`HttpResourceClient`](crate::HttpResourceClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin, e.g. `http://localhost:8080`. Resource paths are appended to it.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries for transient failures. `0` disables retrying.
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 0,
        }
    }
}

/// Build the member URL `<collection>/<id>`.
#[must_use]
pub fn member_url(collection: &str, id: RecordId) -> String {
    format!("{}/{id}", collection.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_url_joins_with_single_slash() {
        assert_eq!(member_url("/api/album", RecordId(4)), "/api/album/4");
        assert_eq!(member_url("/api/album/", RecordId(4)), "/api/album/4");
    }

    #[test]
    fn record_id_from_number_and_string() {
        assert_eq!(RecordId::from_value(&json!(12)), Some(RecordId(12)));
        assert_eq!(RecordId::from_value(&json!("12")), Some(RecordId(12)));
        assert_eq!(RecordId::from_value(&json!("twelve")), None);
        assert_eq!(RecordId::from_value(&json!(null)), None);
    }

    #[test]
    fn record_id_serializes_as_bare_integer() {
        assert_eq!(serde_json::to_string(&RecordId(7)).unwrap(), "7");
    }
}
