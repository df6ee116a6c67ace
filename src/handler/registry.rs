//! Endpoint registry: the whitelist of dispatchable operations.
//!
//! Every endpoint is registered explicitly under an operation name together
//! with its [`EndpointMetadata`]. Methods on the handler state that were never
//! registered cannot be reached by dispatch, whatever the incoming operation
//! string says.
//!
//! # Example
//!
//! ```
//! use lambda_dispatch::handler::{EndpointMetadata, EndpointRegistry, InvocationContext};
//! use serde_json::json;
//!
//! struct Greeter;
//!
//! let mut registry = EndpointRegistry::<Greeter>::new();
//! registry.register(
//!     "greet",
//!     EndpointMetadata::try_from(json!({"public": true})).unwrap(),
//!     |_ctx: InvocationContext<Greeter>, name: String| async move {
//!         Ok::<_, std::convert::Infallible>(format!("hi, {name}"))
//!     },
//! );
//!
//! let schema = registry.schema();
//! assert_eq!(schema.get("greet").unwrap().get("public"), Some(&json!(true)));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::InvocationContext;
use crate::error::{BoxError, DispatchError, Result};

/// Boxed future for endpoint results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A dispatchable endpoint.
///
/// Receives the invocation context, the event payload and any extra call
/// arguments, and settles with the JSON result.
pub trait Endpoint<S>: Send + Sync + 'static {
    /// Invoke the endpoint.
    fn call(
        &self,
        ctx: InvocationContext<S>,
        payload: Value,
        extra_args: Vec<Value>,
    ) -> BoxFuture<'static, Result<Value>>;
}

/// Metadata attached to an endpoint at registration.
///
/// Always a JSON object. Cloning is cheap and the content is never mutated
/// after registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EndpointMetadata(Arc<Map<String, Value>>);

impl EndpointMetadata {
    /// Empty metadata: marks an endpoint as dispatchable and nothing else.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a metadata entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Clone the metadata into a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.as_ref().clone())
    }
}

impl From<Map<String, Value>> for EndpointMetadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(Arc::new(map))
    }
}

impl TryFrom<Value> for EndpointMetadata {
    type Error = DispatchError;

    /// Only JSON objects are valid metadata.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(map.into()),
            other => Err(DispatchError::invalid_type(
                "endpoint metadata",
                "object",
                Some(&other),
            )),
        }
    }
}

/// Async endpoint that deserializes its payload and serializes its output.
pub struct TypedEndpoint<F, T, Fut, R, E> {
    handler: F,
    _phantom: PhantomData<fn(T) -> (Fut, R, E)>,
}

impl<F, T, Fut, R, E> TypedEndpoint<F, T, Fut, R, E> {
    /// Wrap an async function.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<S, F, T, Fut, R, E> Endpoint<S> for TypedEndpoint<F, T, Fut, R, E>
where
    S: Send + Sync + 'static,
    F: Fn(InvocationContext<S>, T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    R: Serialize + 'static,
    E: Into<BoxError> + 'static,
{
    fn call(
        &self,
        ctx: InvocationContext<S>,
        payload: Value,
        _extra_args: Vec<Value>,
    ) -> BoxFuture<'static, Result<Value>> {
        let parsed: T = match decode_payload(&ctx, payload) {
            Ok(v) => v,
            Err(e) => return Box::pin(async move { Err(e) }),
        };

        let fut = (self.handler)(ctx, parsed);
        Box::pin(async move {
            let output = fut.await.map_err(|e| DispatchError::Endpoint(e.into()))?;
            Ok(serde_json::to_value(output)?)
        })
    }
}

/// Endpoint whose body runs to completion inside the call itself.
pub struct SyncEndpoint<F, T, R, E> {
    handler: F,
    _phantom: PhantomData<fn(T) -> (R, E)>,
}

impl<F, T, R, E> SyncEndpoint<F, T, R, E> {
    /// Wrap a synchronous function.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<S, F, T, R, E> Endpoint<S> for SyncEndpoint<F, T, R, E>
where
    S: Send + Sync + 'static,
    F: Fn(InvocationContext<S>, T) -> std::result::Result<R, E> + Send + Sync + 'static,
    T: DeserializeOwned + 'static,
    R: Serialize + 'static,
    E: Into<BoxError> + 'static,
{
    fn call(
        &self,
        ctx: InvocationContext<S>,
        payload: Value,
        _extra_args: Vec<Value>,
    ) -> BoxFuture<'static, Result<Value>> {
        let outcome = decode_payload(&ctx, payload).and_then(|parsed: T| {
            let output = (self.handler)(ctx, parsed).map_err(|e| DispatchError::Endpoint(e.into()))?;
            Ok(serde_json::to_value(output)?)
        });
        Box::pin(std::future::ready(outcome))
    }
}

/// Endpoint receiving the raw payload and the extra call arguments.
pub struct RawEndpoint<F, Fut, E> {
    handler: F,
    _phantom: PhantomData<fn() -> (Fut, E)>,
}

impl<F, Fut, E> RawEndpoint<F, Fut, E> {
    /// Wrap an async function over raw JSON values.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<S, F, Fut, E> Endpoint<S> for RawEndpoint<F, Fut, E>
where
    S: Send + Sync + 'static,
    F: Fn(InvocationContext<S>, Value, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn call(
        &self,
        ctx: InvocationContext<S>,
        payload: Value,
        extra_args: Vec<Value>,
    ) -> BoxFuture<'static, Result<Value>> {
        let fut = (self.handler)(ctx, payload, extra_args);
        Box::pin(async move { fut.await.map_err(|e| DispatchError::Endpoint(e.into())) })
    }
}

fn decode_payload<S, T: DeserializeOwned>(ctx: &InvocationContext<S>, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|source| DispatchError::InvalidPayload {
        operation: ctx.operation().to_string(),
        source,
    })
}

/// A registered endpoint together with its metadata.
struct EndpointEntry<S> {
    endpoint: Arc<dyn Endpoint<S>>,
    metadata: EndpointMetadata,
}

/// Registry mapping operation names to endpoints.
pub struct EndpointRegistry<S> {
    endpoints: HashMap<String, EndpointEntry<S>>,
}

impl<S: Send + Sync + 'static> EndpointRegistry<S> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
        }
    }

    /// Register any [`Endpoint`] implementation.
    ///
    /// Registering an existing name replaces the previous endpoint.
    pub fn register_endpoint<P>(&mut self, name: &str, metadata: EndpointMetadata, endpoint: P)
    where
        P: Endpoint<S>,
    {
        let previous = self.endpoints.insert(
            name.to_string(),
            EndpointEntry {
                endpoint: Arc::new(endpoint),
                metadata,
            },
        );
        if previous.is_some() {
            tracing::warn!(operation = name, "endpoint re-registered, replacing previous");
        } else {
            tracing::debug!(operation = name, "endpoint registered");
        }
    }

    /// Register an async endpoint with a typed payload.
    pub fn register<F, T, Fut, R, E>(&mut self, name: &str, metadata: EndpointMetadata, handler: F)
    where
        F: Fn(InvocationContext<S>, T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
    {
        self.register_endpoint(name, metadata, TypedEndpoint::new(handler));
    }

    /// Register a synchronous endpoint with a typed payload.
    pub fn register_sync<F, T, R, E>(&mut self, name: &str, metadata: EndpointMetadata, handler: F)
    where
        F: Fn(InvocationContext<S>, T) -> std::result::Result<R, E> + Send + Sync + 'static,
        T: DeserializeOwned + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
    {
        self.register_endpoint(name, metadata, SyncEndpoint::new(handler));
    }

    /// Register an endpoint over the raw payload and extra arguments.
    pub fn register_raw<F, Fut, E>(&mut self, name: &str, metadata: EndpointMetadata, handler: F)
    where
        F: Fn(InvocationContext<S>, Value, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.register_endpoint(name, metadata, RawEndpoint::new(handler));
    }

    /// Get an endpoint and its metadata by operation name.
    pub fn get(&self, name: &str) -> Option<(&Arc<dyn Endpoint<S>>, &EndpointMetadata)> {
        self.endpoints
            .get(name)
            .map(|e| (&e.endpoint, &e.metadata))
    }

    /// Get the metadata of an operation.
    pub fn metadata(&self, name: &str) -> Option<&EndpointMetadata> {
        self.endpoints.get(name).map(|e| &e.metadata)
    }

    /// Check whether an operation is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// True if no operation is registered.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Build an [`OperationSchema`] describing the registered operations.
    pub fn schema(&self) -> OperationSchema {
        let operations = self
            .endpoints
            .iter()
            .map(|(name, entry)| (name.clone(), entry.metadata.clone()))
            .collect();
        OperationSchema { operations }
    }
}

impl<S: Send + Sync + 'static> Default for EndpointRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable listing of registered operations, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationSchema {
    /// Operation name to metadata.
    pub operations: BTreeMap<String, EndpointMetadata>,
}

impl OperationSchema {
    /// Get the metadata of an operation.
    pub fn get(&self, name: &str) -> Option<&EndpointMetadata> {
        self.operations.get(name)
    }

    /// Iterate over operation names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}
