//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Invalid construction parameters
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Key is present and live (insert_if_absent)
    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    /// Key is absent or expired (replace)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Eviction was required but the policy ran out of candidates
    #[error("Cannot make room for key '{key}': eviction policy exhausted ({required} bytes required)")]
    PolicyExhausted { key: String, required: usize },

    /// The policy tracks no keys
    #[error("Eviction policy is empty")]
    PolicyEmpty,
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CacheError::Config("memory limit is required".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: memory limit is required"
        );

        let err = CacheError::PolicyExhausted {
            key: "big".to_string(),
            required: 4096,
        };
        assert!(err.to_string().contains("big"));
        assert!(err.to_string().contains("4096"));

        assert_eq!(CacheError::PolicyEmpty.to_string(), "Eviction policy is empty");
    }
}
