//! Handler configuration.
//!
//! Options are fixed when a [`Handler`](crate::Handler) is built and shared
//! read-only by every dispatch afterwards.
//!
//! # Example
//!
//! ```
//! use lambda_dispatch::HandlerOptions;
//!
//! let options = HandlerOptions::from_json(r#"{"operationKey": "action", "deepCopy": true}"#).unwrap();
//! assert_eq!(options.operation_key, "action");
//! assert_eq!(options.payload_key, "payload");
//! assert!(options.deep_copy);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default event field naming the operation.
pub const DEFAULT_OPERATION_KEY: &str = "operation";

/// Default event field naming the payload.
pub const DEFAULT_PAYLOAD_KEY: &str = "payload";

/// Configuration for a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HandlerOptions {
    /// Event field holding the operation name.
    pub operation_key: String,
    /// Event field holding the endpoint payload.
    pub payload_key: String,
    /// Deep-freeze the invocation context.
    pub deep_copy: bool,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            operation_key: DEFAULT_OPERATION_KEY.to_string(),
            payload_key: DEFAULT_PAYLOAD_KEY.to_string(),
            deep_copy: false,
        }
    }
}

impl HandlerOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or a field has the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the event field holding the operation name.
    pub fn operation_key(mut self, key: impl Into<String>) -> Self {
        self.operation_key = key.into();
        self
    }

    /// Set the event field holding the payload.
    pub fn payload_key(mut self, key: impl Into<String>) -> Self {
        self.payload_key = key.into();
        self
    }

    /// Enable or disable deep freezing of the invocation context.
    pub fn deep_copy(mut self, enabled: bool) -> Self {
        self.deep_copy = enabled;
        self
    }
}
