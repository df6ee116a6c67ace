//! Handler and dispatch pipeline.
//!
//! [`HandlerBuilder`] registers operations against a state value and freezes
//! them into a [`Handler`]. Dispatching an event then runs, strictly in order:
//! 1. Reject a `null` event
//! 2. Extract the operation and payload fields
//! 3. Resolve the operation against the registry
//! 4. Build a fresh invocation context
//! 5. Call the endpoint, catching panics during the call and while polling
//! 6. Notify the completion object, then return the outcome
//!
//! # Example
//!
//! ```
//! use lambda_dispatch::{Handler, InvocationContext};
//! use serde_json::json;
//!
//! struct Greeter;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let handler = Handler::builder(Greeter)
//!     .operation("greet", |ctx: InvocationContext<Greeter>, name: String| async move {
//!         Ok::<_, std::convert::Infallible>(format!("{}: hi, {}", ctx.operation(), name))
//!     })
//!     .build();
//!
//! let result = handler
//!     .dispatch(json!({"operation": "greet", "payload": "Bond"}), None)
//!     .await
//!     .unwrap();
//! assert_eq!(result, json!("greet: hi, Bond"));
//! # }
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::codec::EventCodec;
use crate::completion::Completion;
use crate::config::HandlerOptions;
use crate::error::{BoxError, DispatchError, Result};
use crate::handler::resolver::{lookup, operation_name};
use crate::handler::{
    ContextFields, Endpoint, EndpointMetadata, EndpointRegistry, InvocationContext,
    OperationSchema,
};

/// Builder for configuring and creating a [`Handler`].
pub struct HandlerBuilder<S> {
    state: S,
    options: HandlerOptions,
    registry: EndpointRegistry<S>,
}

impl<S: Send + Sync + 'static> HandlerBuilder<S> {
    /// Create a builder around the handler state.
    pub fn new(state: S) -> Self {
        Self {
            state,
            options: HandlerOptions::default(),
            registry: EndpointRegistry::new(),
        }
    }

    /// Set the handler options.
    pub fn options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    /// Register an async operation with empty metadata.
    pub fn operation<F, T, Fut, R, E>(self, name: &str, handler: F) -> Self
    where
        F: Fn(InvocationContext<S>, T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
    {
        self.operation_with_metadata(name, EndpointMetadata::new(), handler)
    }

    /// Register an async operation with metadata.
    pub fn operation_with_metadata<F, T, Fut, R, E>(
        mut self,
        name: &str,
        metadata: EndpointMetadata,
        handler: F,
    ) -> Self
    where
        F: Fn(InvocationContext<S>, T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
    {
        self.registry.register(name, metadata, handler);
        self
    }

    /// Register a synchronous operation with empty metadata.
    pub fn operation_sync<F, T, R, E>(self, name: &str, handler: F) -> Self
    where
        F: Fn(InvocationContext<S>, T) -> std::result::Result<R, E> + Send + Sync + 'static,
        T: DeserializeOwned + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
    {
        self.operation_sync_with_metadata(name, EndpointMetadata::new(), handler)
    }

    /// Register a synchronous operation with metadata.
    pub fn operation_sync_with_metadata<F, T, R, E>(
        mut self,
        name: &str,
        metadata: EndpointMetadata,
        handler: F,
    ) -> Self
    where
        F: Fn(InvocationContext<S>, T) -> std::result::Result<R, E> + Send + Sync + 'static,
        T: DeserializeOwned + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
    {
        self.registry.register_sync(name, metadata, handler);
        self
    }

    /// Register an operation receiving the raw payload and extra arguments.
    pub fn operation_raw<F, Fut, E>(mut self, name: &str, metadata: EndpointMetadata, handler: F) -> Self
    where
        F: Fn(InvocationContext<S>, Value, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.registry.register_raw(name, metadata, handler);
        self
    }

    /// Register a custom [`Endpoint`] implementation.
    pub fn endpoint<P: Endpoint<S>>(mut self, name: &str, metadata: EndpointMetadata, endpoint: P) -> Self {
        self.registry.register_endpoint(name, metadata, endpoint);
        self
    }

    /// Freeze the configuration into a handler.
    pub fn build(self) -> Handler<S> {
        tracing::debug!(
            operations = self.registry.len(),
            operation_key = %self.options.operation_key,
            payload_key = %self.options.payload_key,
            deep_copy = self.options.deep_copy,
            "handler built"
        );
        Handler {
            state: Arc::new(self.state),
            options: Arc::new(self.options),
            registry: Arc::new(self.registry),
        }
    }
}

/// A handler: state, options and the registered operations.
///
/// Cheap to clone; all clones share the same read-only internals, so
/// concurrent dispatches need no locking.
pub struct Handler<S> {
    state: Arc<S>,
    options: Arc<HandlerOptions>,
    registry: Arc<EndpointRegistry<S>>,
}

impl<S> Handler<S> {
    /// The handler state.
    #[inline]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// The handler options.
    #[inline]
    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    /// The registered operations.
    #[inline]
    pub fn registry(&self) -> &EndpointRegistry<S> {
        &self.registry
    }

    pub(crate) fn shared_state(&self) -> Arc<S> {
        self.state.clone()
    }

    pub(crate) fn shared_options(&self) -> Arc<HandlerOptions> {
        self.options.clone()
    }
}

impl<S: Send + Sync + 'static> Handler<S> {
    /// Create a new handler builder.
    pub fn builder(state: S) -> HandlerBuilder<S> {
        HandlerBuilder::new(state)
    }

    /// Describe the registered operations.
    pub fn schema(&self) -> OperationSchema {
        self.registry.schema()
    }

    /// Dispatch an event.
    ///
    /// Resolves with the endpoint's result or rejects with the error that
    /// ended the dispatch. `completion` is notified first, except when the
    /// event is `null`.
    pub async fn dispatch(
        &self,
        event: Value,
        completion: Option<Arc<dyn Completion>>,
    ) -> Result<Value> {
        self.dispatch_with_args(event, completion, Vec::new()).await
    }

    /// Dispatch an event, passing extra arguments after the payload.
    ///
    /// Only endpoints registered with [`HandlerBuilder::operation_raw`] or a
    /// custom [`Endpoint`] see the extra arguments.
    pub async fn dispatch_with_args(
        &self,
        event: Value,
        completion: Option<Arc<dyn Completion>>,
        extra_args: Vec<Value>,
    ) -> Result<Value> {
        if event.is_null() {
            return Err(DispatchError::MissingEvent);
        }

        let outcome = self.invoke(event, completion.clone(), extra_args).await;
        settle(outcome, completion.as_deref())
    }

    /// Decode an event with `codec`, dispatch it and encode the result.
    ///
    /// An undecodable event is rejected without notifying `completion`.
    pub async fn dispatch_encoded(
        &self,
        bytes: &[u8],
        codec: EventCodec,
        completion: Option<Arc<dyn Completion>>,
    ) -> Result<Bytes> {
        let event = codec.decode(bytes)?;
        let value = self.dispatch(event, completion).await?;
        codec.encode(&value)
    }

    async fn invoke(
        &self,
        event: Value,
        completion: Option<Arc<dyn Completion>>,
        extra_args: Vec<Value>,
    ) -> Result<Value> {
        let operation = operation_name(event.get(&self.options.operation_key))?.to_owned();
        let (endpoint, metadata) = lookup(self, &operation)?;

        let payload = event
            .get(&self.options.payload_key)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        tracing::debug!(operation = %operation, "dispatching");

        let ctx = InvocationContext::build(
            self,
            ContextFields {
                operation,
                metadata,
                event,
                context: completion,
            },
        );

        call_protected(endpoint, ctx, payload, extra_args).await
    }
}

impl<S> Clone for Handler<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            options: self.options.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<S> fmt::Debug for Handler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Call an endpoint so that panics, whether raised by the call itself or
/// while polling its future, come back as errors.
async fn call_protected<S: Send + Sync + 'static>(
    endpoint: Arc<dyn Endpoint<S>>,
    ctx: InvocationContext<S>,
    payload: Value,
    extra_args: Vec<Value>,
) -> Result<Value> {
    let operation = ctx.operation().to_string();

    let fut = match panic::catch_unwind(AssertUnwindSafe(|| endpoint.call(ctx, payload, extra_args))) {
        Ok(fut) => fut,
        Err(panic) => return Err(panicked(operation, panic)),
    };

    let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(panicked(operation.clone(), panic)),
    };

    tracing::debug!(operation = %operation, ok = outcome.is_ok(), "endpoint settled");
    outcome
}

fn panicked(operation: String, panic: Box<dyn Any + Send>) -> DispatchError {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    DispatchError::Panicked { operation, message }
}

/// Notify the completion object, then hand the outcome back unchanged.
fn settle(outcome: Result<Value>, completion: Option<&dyn Completion>) -> Result<Value> {
    match outcome {
        Ok(value) => {
            if let Some(c) = completion {
                c.succeed(&value);
            }
            Ok(value)
        }
        Err(err) => {
            if let Some(c) = completion {
                c.fail(&err);
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Callbacks;
    use serde_json::json;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Greeter {
        greeting: &'static str,
    }

    impl Greeter {
        fn salute(&self, name: &str) -> String {
            format!("{}, {}", self.greeting, name)
        }
    }

    fn greeter() -> Handler<Greeter> {
        Handler::builder(Greeter { greeting: "hi" })
            .operation("greet", |ctx: InvocationContext<Greeter>, name: String| async move {
                Ok::<_, Infallible>(format!("{}: {}", ctx.operation(), ctx.state().salute(&name)))
            })
            .operation_sync("sync", |_ctx, n: i64| Ok::<_, Infallible>(n + 1))
            .operation_sync("explode", |_ctx, _: Value| -> std::result::Result<(), Infallible> {
                panic!("kaboom")
            })
            .operation("explode_later", |_ctx, _: Value| async move {
                tokio::task::yield_now().await;
                if true {
                    panic!("later");
                }
                Ok::<(), Infallible>(())
            })
            .build()
    }

    #[test]
    fn test_builder_collects_operations() {
        let h = greeter();
        let names: Vec<_> = h.schema().names().map(str::to_owned).collect();
        assert_eq!(names, vec!["explode", "explode_later", "greet", "sync"]);
        assert_eq!(h.options(), &HandlerOptions::default());
    }

    #[tokio::test]
    async fn test_dispatch_async_endpoint() {
        let h = greeter();
        let result = h
            .dispatch(json!({"operation": "greet", "payload": "Bond"}), None)
            .await
            .unwrap();
        assert_eq!(result, json!("greet: hi, Bond"));
    }

    #[tokio::test]
    async fn test_dispatch_sync_endpoint() {
        let h = greeter();
        let result = h
            .dispatch(json!({"operation": "sync", "payload": 41}), None)
            .await
            .unwrap();
        assert_eq!(result, json!(42));
    }

    #[tokio::test]
    async fn test_null_event_rejected_without_callbacks() {
        let h = greeter();
        let calls = Arc::new(AtomicUsize::new(0));
        let (s, f) = (calls.clone(), calls.clone());
        let completion = Callbacks::new()
            .on_succeed(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            })
            .on_fail(move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .shared();

        let err = h.dispatch(Value::Null, Some(completion)).await.unwrap_err();
        assert!(matches!(err, DispatchError::MissingEvent));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sync_panic_is_captured() {
        let h = greeter();
        let err = h
            .dispatch(json!({"operation": "explode"}), None)
            .await
            .unwrap_err();
        match err {
            DispatchError::Panicked { operation, message } => {
                assert_eq!(operation, "explode");
                assert_eq!(message, "kaboom");
            }
            other => panic!("expected Panicked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_async_panic_is_captured() {
        let h = greeter();
        let err = h
            .dispatch(json!({"operation": "explode_later"}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Panicked { ref message, .. } if message == "later"));
    }

    #[tokio::test]
    async fn test_invalid_payload() {
        let h = greeter();
        let err = h
            .dispatch(json!({"operation": "sync", "payload": "not a number"}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidPayload { ref operation, .. } if operation == "sync"));
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn test_missing_payload_defaults_to_empty_object() {
        let h = Handler::builder(())
            .operation_raw("echo", EndpointMetadata::new(), |_ctx, payload, _extra| async move {
                Ok::<_, Infallible>(payload)
            })
            .build();

        let result = h.dispatch(json!({"operation": "echo"}), None).await.unwrap();
        assert_eq!(result, json!({}));
    }

    #[tokio::test]
    async fn test_extra_args_reach_raw_endpoints() {
        let h = Handler::builder(())
            .operation_raw("collect", EndpointMetadata::new(), |_ctx, payload, extra| async move {
                Ok::<_, Infallible>(json!({"payload": payload, "extra": extra}))
            })
            .build();

        let result = h
            .dispatch_with_args(
                json!({"operation": "collect", "payload": 1}),
                None,
                vec![json!("a"), json!(2)],
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"payload": 1, "extra": ["a", 2]}));
    }

    #[tokio::test]
    async fn test_custom_keys() {
        let h = Handler::builder(())
            .options(HandlerOptions::new().operation_key("action").payload_key("body"))
            .operation_sync("double", |_ctx, n: i64| Ok::<_, Infallible>(n * 2))
            .build();

        let result = h
            .dispatch(json!({"action": "double", "body": 21}), None)
            .await
            .unwrap();
        assert_eq!(result, json!(42));

        let err = h
            .dispatch(json!({"operation": "double", "payload": 21}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidType { found: "undefined", .. }));
    }

    #[tokio::test]
    async fn test_encoded_dispatch_json() {
        let h = greeter();
        let out = h
            .dispatch_encoded(
                br#"{"operation":"greet","payload":"Bond"}"#,
                EventCodec::Json,
                None,
            )
            .await
            .unwrap();
        assert_eq!(&out[..], br#""greet: hi, Bond""#);
    }

    #[tokio::test]
    async fn test_encoded_dispatch_rejects_garbage_without_callbacks() {
        let h = greeter();
        let calls = Arc::new(AtomicUsize::new(0));
        let f = calls.clone();
        let completion = Callbacks::new()
            .on_fail(move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .shared();

        let err = h
            .dispatch_encoded(b"{not json", EventCodec::Json, Some(completion))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Json(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sync_operation_with_metadata() {
        let h = Handler::builder(())
            .operation_sync_with_metadata(
                "negate",
                EndpointMetadata::try_from(json!({"pure": true})).unwrap(),
                |ctx: InvocationContext<()>, n: i64| {
                    assert_eq!(ctx.metadata().get("pure"), Some(&json!(true)));
                    Ok::<_, Infallible>(-n)
                },
            )
            .build();

        assert_eq!(h.schema().get("negate").unwrap().get("pure"), Some(&json!(true)));
        let result = h
            .dispatch(json!({"operation": "negate", "payload": 5}), None)
            .await
            .unwrap();
        assert_eq!(result, json!(-5));
    }

    #[tokio::test]
    async fn test_sync_panic_notifies_fail() {
        let h = greeter();
        let (succeeded, failed) = (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)));
        let (s, f) = (succeeded.clone(), failed.clone());
        let completion = Callbacks::new()
            .on_succeed(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            })
            .on_fail(move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .shared();

        let err = h
            .dispatch(json!({"operation": "explode"}), Some(completion))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Panicked { .. }));
        assert_eq!(failed.load(Ordering::SeqCst), 1);
        assert_eq!(succeeded.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_is_clone_and_shares_state() {
        let h = greeter();
        let h2 = h.clone();
        assert!(std::ptr::eq(h.state(), h2.state()));
        assert!(format!("{:?}", h).starts_with("Handler"));
    }
}
