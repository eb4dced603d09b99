//! # helios-provider
//!
//! The remote resource protocol of the Helios photograph catalog.
//!
//! Every record kind (album, photograph, tag) lives behind a REST-style
//! collection endpoint. This crate knows nothing about records or views; it
//! moves JSON objects between the front-end kernel and the server.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list | `GET <collection>` or an ad-hoc URL |
//! | get | `GET <collection>/<id>` |
//! | create | `POST <collection>` |
//! | update | `PUT <collection>/<id>` |
//! | delete | `DELETE <collection>/<id>` |
//!
//! ## Feature Flags
//!
//! - **`native-tls`** *(default)* — Use the platform's native TLS implementation.
//! - **`rustls`** — Use rustls.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use helios_provider::{ClientConfig, HttpResourceClient, ResourceClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpResourceClient::new(ClientConfig::default())?;
//!
//!     for album in client.list("/api/album").await? {
//!         println!("{:?}", album.get("name"));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, ResourceError>`](ResourceError):
//!
//! - [`ResourceError::NotFound`] — the member does not exist
//! - [`ResourceError::ServerError`] — the server refused the request and said why
//! - [`ResourceError::NetworkError`] / [`ResourceError::Timeout`] — transient
//!
//! Transient errors are only retried when [`ClientConfig::max_retries`] is non-zero.

mod error;
mod http_client;
mod traits;
mod types;
mod utils;

pub use error::{ResourceError, Result};
pub use http_client::{HttpResourceClient, HttpUtils};
pub use traits::ResourceClient;
pub use types::{ClientConfig, Fields, RecordId, member_url};
pub use utils::log_sanitizer;
