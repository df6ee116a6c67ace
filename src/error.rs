//! Error types for lambda-dispatch.

use thiserror::Error;

/// Boxed error returned by endpoint bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for every dispatch failure.
///
/// Invalid-input errors (`MissingEvent`, `InvalidType`, `InvalidPayload`),
/// not-found errors (`NotFound`) and execution errors (`Endpoint`, `Panicked`)
/// all surface through the same channel.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The event itself was absent (`null`).
    #[error("event is required")]
    MissingEvent,

    /// A value had the wrong JSON type.
    #[error("invalid {what}: expected {expected}, got {found}")]
    InvalidType {
        /// What was being validated (e.g. "operation").
        what: &'static str,
        /// Expected JSON type.
        expected: &'static str,
        /// Actual JSON type, `"undefined"` when absent.
        found: &'static str,
    },

    /// The payload could not be decoded into the endpoint's input type.
    #[error("invalid payload for operation {operation}: {source}")]
    InvalidPayload {
        /// Operation whose payload failed to decode.
        operation: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// No registered endpoint for the operation.
    ///
    /// Deliberately covers both "no such operation" and "exists but not
    /// registered".
    #[error("operation not found: {operation}")]
    NotFound {
        /// Requested operation name.
        operation: String,
    },

    /// A write was attempted on a deep-frozen invocation context.
    #[error("cannot modify {field}: invocation context is frozen")]
    Frozen {
        /// Field the write targeted.
        field: &'static str,
    },

    /// Error returned by the endpoint body, carried unchanged.
    #[error(transparent)]
    Endpoint(BoxError),

    /// The endpoint panicked while being called or polled.
    #[error("endpoint {operation} panicked: {message}")]
    Panicked {
        /// Operation being executed.
        operation: String,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

impl DispatchError {
    /// Build an `InvalidType` error from the offending value.
    pub(crate) fn invalid_type(
        what: &'static str,
        expected: &'static str,
        found: Option<&serde_json::Value>,
    ) -> Self {
        DispatchError::InvalidType {
            what,
            expected,
            found: json_type_name(found),
        }
    }

    /// Returns the endpoint's original error, if this is an execution error.
    pub fn endpoint_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            DispatchError::Endpoint(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// True for errors caused by the caller's input rather than the endpoint.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            DispatchError::MissingEvent
                | DispatchError::InvalidType { .. }
                | DispatchError::InvalidPayload { .. }
        )
    }
}

/// Name of a JSON value's type, `"undefined"` for a missing value.
pub(crate) fn json_type_name(value: Option<&serde_json::Value>) -> &'static str {
    use serde_json::Value;

    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Result type alias using DispatchError.
pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_type_names_offending_type() {
        let err = DispatchError::invalid_type("operation", "string", Some(&json!(42)));
        assert_eq!(
            err.to_string(),
            "invalid operation: expected string, got number"
        );

        let err = DispatchError::invalid_type("operation", "string", None);
        assert_eq!(
            err.to_string(),
            "invalid operation: expected string, got undefined"
        );
    }

    #[test]
    fn test_endpoint_error_is_transparent() {
        let inner: BoxError = "boom".into();
        let err = DispatchError::Endpoint(inner);

        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.endpoint_error().unwrap().to_string(), "boom");
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn test_invalid_input_classification() {
        assert!(DispatchError::MissingEvent.is_invalid_input());
        assert!(!DispatchError::NotFound {
            operation: "x".into()
        }
        .is_invalid_input());
    }
}
