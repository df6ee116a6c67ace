//! Operation to endpoint resolution.
//!
//! The resolver never reveals whether a name exists on the handler without
//! being registered: anything outside the registry is simply not found.

use std::sync::Arc;

use serde_json::Value;

use super::{Endpoint, EndpointMetadata};
use crate::dispatcher::Handler;
use crate::error::{DispatchError, Result};

/// Resolve an operation value taken from an event.
///
/// `operation` is `None` when the event has no operation field.
///
/// # Errors
///
/// - [`DispatchError::InvalidType`] if the operation is missing or not a string
/// - [`DispatchError::NotFound`] if no endpoint is registered under that name
pub fn resolve<S>(
    handler: &Handler<S>,
    operation: Option<&Value>,
) -> Result<(Arc<dyn Endpoint<S>>, EndpointMetadata)>
where
    S: Send + Sync + 'static,
{
    lookup(handler, operation_name(operation)?)
}

/// Validate the operation field of an event and borrow its name.
pub(crate) fn operation_name(operation: Option<&Value>) -> Result<&str> {
    match operation {
        Some(Value::String(name)) => Ok(name),
        other => Err(DispatchError::invalid_type("operation", "string", other)),
    }
}

/// Find the endpoint registered under `name`.
pub(crate) fn lookup<S>(
    handler: &Handler<S>,
    name: &str,
) -> Result<(Arc<dyn Endpoint<S>>, EndpointMetadata)>
where
    S: Send + Sync + 'static,
{
    handler
        .registry()
        .get(name)
        .map(|(endpoint, metadata)| (endpoint.clone(), metadata.clone()))
        .ok_or_else(|| DispatchError::NotFound {
            operation: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::convert::Infallible;

    struct Calculator;

    impl Calculator {
        #[allow(dead_code)]
        fn internal_helper(&self) -> i32 {
            42
        }
    }

    fn handler() -> Handler<Calculator> {
        Handler::builder(Calculator)
            .operation_with_metadata(
                "add",
                EndpointMetadata::try_from(json!({"pure": true})).unwrap(),
                |_ctx, (a, b): (i64, i64)| async move { Ok::<_, Infallible>(a + b) },
            )
            .build()
    }

    #[test]
    fn test_resolve_registered() {
        let h = handler();
        let (_, metadata) = resolve(&h, Some(&json!("add"))).unwrap();
        assert_eq!(metadata.get("pure"), Some(&json!(true)));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let h = handler();
        let (first, meta1) = resolve(&h, Some(&json!("add"))).unwrap();
        let (second, meta2) = resolve(&h, Some(&json!("add"))).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(meta1, meta2);
    }

    #[test]
    fn test_resolve_missing_operation() {
        let h = handler();

        let err = resolve(&h, None).err().unwrap();
        assert!(matches!(
            err,
            DispatchError::InvalidType {
                what: "operation",
                found: "undefined",
                ..
            }
        ));
    }

    #[test]
    fn test_resolve_non_string_operation() {
        let h = handler();

        for (value, found) in [
            (json!(null), "null"),
            (json!(7), "number"),
            (json!(false), "boolean"),
            (json!(["add"]), "array"),
            (json!({"name": "add"}), "object"),
        ] {
            match resolve(&h, Some(&value)) {
                Err(DispatchError::InvalidType { found: f, .. }) => assert_eq!(f, found),
                other => panic!("expected InvalidType, got {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_unregistered_method_is_not_found() {
        let h = handler();

        // `internal_helper` exists on the state but was never registered.
        let err = resolve(&h, Some(&json!("internal_helper"))).err().unwrap();
        match err {
            DispatchError::NotFound { operation } => assert_eq!(operation, "internal_helper"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_operation_name_borrows_string() {
        let event = json!({"operation": "add"});
        assert_eq!(operation_name(event.get("operation")).unwrap(), "add");
        assert!(matches!(
            operation_name(event.get("missing")),
            Err(DispatchError::InvalidType { found: "undefined", .. })
        ));
    }

    #[test]
    fn test_lookup_by_name() {
        let h = handler();
        let (_, metadata) = lookup(&h, "add").unwrap();
        assert_eq!(metadata.get("pure"), Some(&json!(true)));
        assert!(matches!(lookup(&h, "sub"), Err(DispatchError::NotFound { .. })));
    }
}
