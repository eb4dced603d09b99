//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use helios_provider::ResourceError;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// A list or table binding was built without a child view factory
    #[error("List binding requires a view factory")]
    MissingViewFactory,

    /// A modal was opened without a content view constructor
    #[error("Modal requires a content view")]
    MissingContentView,

    /// A table binding was built without a header view
    #[error("Table binding requires a header view")]
    MissingHeaderView,

    /// Malformed template text
    #[error("Template error at byte {position}: {message}")]
    Template { position: usize, message: String },

    /// Malformed event selector
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// Malformed declarative event binding (`"<event> [selector]"`)
    #[error("Invalid event binding '{0}'")]
    InvalidEventBinding(String),

    /// The server answered with JSON of the wrong shape
    #[error("Invalid payload from {url}: {message}")]
    InvalidPayload { url: String, message: String },

    /// Resource error (converting from library)
    #[error("{0}")]
    Resource(#[from] ResourceError),
}

impl CoreError {
    /// Whether it is expected behavior (server refusal, missing member, ...), used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added. **
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Resource(e) => e.is_expected(),
            Self::InvalidPayload { .. } => true,
            Self::MissingViewFactory
            | Self::MissingContentView
            | Self::MissingHeaderView
            | Self::Template { .. }
            | Self::InvalidSelector { .. }
            | Self::InvalidEventBinding(_) => false,
        }
    }

    /// Whether the error is a programming mistake in how a binding was configured.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Resource(_) | Self::InvalidPayload { .. })
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_not_expected() {
        assert!(!CoreError::MissingViewFactory.is_expected());
        assert!(CoreError::MissingContentView.is_configuration_error());
    }

    #[test]
    fn resource_errors_delegate_classification() {
        let err: CoreError = ResourceError::NotFound {
            url: "/api/album/3".to_string(),
        }
        .into();
        assert!(err.is_expected());
        assert!(!err.is_configuration_error());
        assert_eq!(err.to_string(), ResourceError::NotFound { url: "/api/album/3".to_string() }.to_string());
    }

    #[test]
    fn serializes_with_code_tag() {
        let json = serde_json::to_value(CoreError::MissingHeaderView).unwrap();
        assert_eq!(json["code"], "MissingHeaderView");
    }
}
