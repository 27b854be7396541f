//! Error types for rtable.
//!
//! Every failed table operation leaves the table unchanged, so none of
//! these errors is fatal; callers decide whether to retry.

use thiserror::Error;

use crate::types::RouteKey;

/// Result type alias using `RouteError`.
pub type Result<T> = std::result::Result<T, RouteError>;

/// Main error type for all table operations.
#[derive(Debug, Error)]
pub enum RouteError {
    // ═══════════════════════════════════════════════════════════════════════════
    // LOOKUP ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// An entry with the same key is already live.
    #[error("Duplicate route: {0}")]
    DuplicateKey(RouteKey),

    /// No live entry has this key.
    #[error("Route not found: {0}")]
    NotFound(RouteKey),

    // ═══════════════════════════════════════════════════════════════════════════
    // RESOURCE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Entry creation could not be completed (table full, timer refused).
    #[error("Allocation failed: {0}")]
    AllocationFailure(String),

    /// The timer subsystem could not schedule or query a timer.
    #[error("Timer error: {0}")]
    TimerError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Destination, mask, gateway, or interface label is malformed.
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RouteError {
    /// Returns true if retrying the same request may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RouteError::AllocationFailure(_) | RouteError::TimerError(_)
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, RouteError::InvalidRoute(_) | RouteError::ConfigError(_))
    }

    /// Returns true if the error is about key presence or absence.
    pub fn is_lookup_error(&self) -> bool {
        matches!(self, RouteError::DuplicateKey(_) | RouteError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let key = RouteKey::parse("122.1.1.1", 32).unwrap();
        let err = RouteError::NotFound(key);
        assert_eq!(err.to_string(), "Route not found: 122.1.1.1/32");

        let err = RouteError::DuplicateKey(key);
        assert!(err.to_string().contains("122.1.1.1/32"));
    }

    #[test]
    fn test_error_classification() {
        let key = RouteKey::parse("10.0.0.0", 8).unwrap();

        assert!(RouteError::AllocationFailure("full".into()).is_recoverable());
        assert!(RouteError::TimerError("no runtime".into()).is_recoverable());
        assert!(!RouteError::NotFound(key).is_recoverable());

        assert!(RouteError::InvalidRoute("mask".into()).is_validation_error());
        assert!(!RouteError::DuplicateKey(key).is_validation_error());

        assert!(RouteError::DuplicateKey(key).is_lookup_error());
        assert!(RouteError::NotFound(key).is_lookup_error());
        assert!(!RouteError::AllocationFailure("full".into()).is_lookup_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let route_result: Result<serde_json::Value> = json_result.map_err(RouteError::from);
        assert!(matches!(route_result, Err(RouteError::JsonError(_))));
    }
}
